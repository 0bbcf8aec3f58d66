//! Vector Store - 벡터 검색 트레이트 및 유틸리티
//!
//! 호스팅(Pinecone), 로컬(LanceDB), 인메모리 구현이 같은 트레이트를 공유합니다.
//! 유사도는 코사인 기준이며, 결과는 유사도 내림차순(동점은 삽입 순서)입니다.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::document::{Chunk, ContentType};

/// 벡터 임베딩 차원 (text-embedding-3-small, dimensions=1024)
pub const EMBEDDING_DIMENSION: i32 = 1024;

// ============================================================================
// Types
// ============================================================================

/// 벡터 엔트리 (저장용)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 청크 ID ([`Chunk::id`])
    pub id: String,
    /// 청크 텍스트
    pub text: String,
    /// 출처 URL
    pub source_url: String,
    pub content_type: ContentType,
    /// 문서 내 청크 인덱스 (0-based)
    pub chunk_index: i32,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

impl VectorEntry {
    /// 청크와 임베딩으로 엔트리 생성
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        Self {
            id: chunk.id(),
            text: chunk.text.clone(),
            source_url: chunk.source_url.clone(),
            content_type: chunk.content_type,
            chunk_index: chunk.index as i32,
            embedding,
        }
    }
}

/// 검색 결과
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub id: String,
    /// 청크 텍스트
    pub text: String,
    pub source_url: String,
    pub content_type: ContentType,
    /// 청크 인덱스
    pub chunk_index: i32,
    /// 코사인 유사도 (높을수록 유사)
    pub similarity: f32,
}

// ============================================================================
// VectorStore Trait
// ============================================================================

/// VectorStore 트레이트 (async)
///
/// 벡터 저장소의 공통 인터페이스입니다.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// 벡터 upsert (같은 ID는 덮어씀)
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize>;

    /// 코사인 유사도 기준 상위 k개 검색
    async fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// 벡터 개수 조회
    async fn count(&self) -> Result<usize>;

    /// 저장소 이름
    fn name(&self) -> &str;
}

// ============================================================================
// MemoryVectorStore
// ============================================================================

/// 인메모리 벡터 저장소 (전수 코사인 비교)
///
/// 소규모 데이터와 테스트용입니다.
#[derive(Debug, Default)]
pub struct MemoryVectorStore {
    entries: RwLock<Vec<VectorEntry>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize> {
        let mut stored = self
            .entries
            .write()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        for entry in entries {
            // 기존 위치를 유지해야 동점 시 삽입 순서가 보존됨
            match stored.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => stored.push(entry.clone()),
            }
        }

        Ok(entries.len())
    }

    async fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let stored = self
            .entries
            .read()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let mut results: Vec<SearchResult> = stored
            .iter()
            .map(|e| SearchResult {
                id: e.id.clone(),
                text: e.text.clone(),
                source_url: e.source_url.clone(),
                content_type: e.content_type,
                chunk_index: e.chunk_index,
                similarity: cosine_similarity(query_embedding, &e.embedding),
            })
            .collect();

        rank_results(&mut results);
        results.truncate(k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let stored = self
            .entries
            .read()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;
        Ok(stored.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다.
/// 결과는 -1.0 ~ 1.0 범위입니다.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// 유사도 내림차순 안정 정렬 (동점은 기존 순서 유지)
pub fn rank_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// ============================================================================
// Tests
// ============================================================================
