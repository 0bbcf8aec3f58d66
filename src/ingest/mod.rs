//! 색인 모듈 - 문서 → 청크 → 임베딩 → 벡터 저장소
//!
//! 갱신 주기 한 번(`refresh`)은 콘텐츠 소스에서 문서를 가져와 저장합니다.
//! 소스가 아무 것도 주지 못하면 인덱스를 건드리지 않고 건너뜁니다.
//! 주기적 실행은 외부 스케줄러(cron)가 `derby-rag refresh`로 담당합니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::embedding::EmbeddingProvider;
use crate::error::RagError;
use crate::knowledge::{Chunk, Chunker, SourceDocument, VectorEntry, VectorStore};
use crate::rag::sample_document;
use crate::scraper::ContentSource;

/// 갱신 결과 통계
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub documents: usize,
    pub chunks: usize,
    pub upserted: usize,
    pub vectors_before: usize,
    pub vectors_after: usize,
    pub duration: Duration,
}

/// 갱신 주기 결과
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Completed(RefreshReport),
    /// 콘텐츠 소스 불가 (인덱스 변경 없음)
    Skipped { reason: String },
}

/// 색인기
pub struct Indexer {
    chunker: Box<dyn Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
}

impl Indexer {
    pub fn new(
        chunker: Box<dyn Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            store,
        }
    }

    /// 문서들을 청크로 나눠 임베딩 후 저장
    ///
    /// Returns: (청크 수, upsert된 벡터 수)
    pub async fn index_documents(&self, documents: &[SourceDocument]) -> Result<(usize, usize)> {
        let chunks: Vec<Chunk> = documents
            .iter()
            .flat_map(|doc| self.chunker.split(doc))
            .collect();

        if chunks.is_empty() {
            tracing::warn!("No chunks produced from {} documents", documents.len());
            return Ok((0, 0));
        }

        tracing::info!(
            "Split {} documents into {} chunks ({})",
            documents.len(),
            chunks.len(),
            self.chunker.name()
        );

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .embedder
            .embed_batch(&texts)
            .await
            .context("Failed to embed chunks")?;

        if embeddings.len() != chunks.len() {
            anyhow::bail!(
                "Embedding count mismatch: {} chunks, {} embeddings",
                chunks.len(),
                embeddings.len()
            );
        }

        let entries: Vec<VectorEntry> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| VectorEntry::from_chunk(chunk, embedding))
            .collect();

        let upserted = self
            .store
            .upsert(&entries)
            .await
            .with_context(|| format!("Failed to upsert into '{}'", self.store.name()))?;

        Ok((chunks.len(), upserted))
    }

    /// 갱신 주기 1회 실행
    pub async fn refresh(&self, source: &dyn ContentSource) -> Result<RefreshOutcome> {
        let start = Instant::now();
        tracing::info!("Starting content refresh from '{}'", source.name());

        let documents = match source.fetch().await {
            Ok(documents) => documents,
            Err(RagError::ContentSourceUnavailable(reason)) => {
                tracing::warn!("Content refresh skipped: {}", reason);
                return Ok(RefreshOutcome::Skipped { reason });
            }
            Err(e) => return Err(e.into()),
        };

        let vectors_before = self.store.count().await.context("Failed to count vectors")?;
        let (chunks, upserted) = self.index_documents(&documents).await?;
        let vectors_after = self.store.count().await.context("Failed to count vectors")?;

        let report = RefreshReport {
            documents: documents.len(),
            chunks,
            upserted,
            vectors_before,
            vectors_after,
            duration: start.elapsed(),
        };

        tracing::info!(
            "Refresh completed: {} documents, {} chunks, vectors {} -> {} ({:.1}s)",
            report.documents,
            report.chunks,
            report.vectors_before,
            report.vectors_after,
            report.duration.as_secs_f64()
        );

        Ok(RefreshOutcome::Completed(report))
    }

    /// 인덱스가 비어 있으면 내장 지식으로 초기화
    ///
    /// Returns: 저장된 청크 수 (이미 데이터가 있으면 None)
    pub async fn ensure_seeded(&self) -> Result<Option<usize>> {
        let count = self.store.count().await.context("Failed to count vectors")?;
        if count > 0 {
            tracing::info!("Knowledge base loaded with {} vectors", count);
            return Ok(None);
        }

        tracing::info!("No knowledge base found, creating sample content");
        let (chunks, _) = self.index_documents(&[sample_document()]).await?;
        tracing::info!("Sample knowledge base created with {} chunks", chunks);
        Ok(Some(chunks))
    }
}
