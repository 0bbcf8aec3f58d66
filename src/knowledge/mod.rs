//! Knowledge 모듈 - 더비 지식 저장소
//!
//! - Document: 소스 문서 / 청크 타입
//! - Chunker: 재귀 문자 분할 (500자, 100자 오버랩)
//! - Vector: 저장소 트레이트 + 인메모리 구현
//! - Pinecone: 호스팅 인덱스 (REST)
//! - LanceDB: 로컬 벡터 검색

mod chunker;
mod document;
mod lance;
mod pinecone;
mod vector;

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::{Config, VectorBackend};

// Re-exports
pub use chunker::{default_chunker, ChunkConfig, Chunker, RecursiveChunker, DEFAULT_SEPARATORS};
pub use document::{Chunk, ContentType, SourceDocument};
pub use lance::LanceVectorStore;
pub use pinecone::PineconeVectorStore;
pub use vector::{
    cosine_similarity, rank_results, MemoryVectorStore, SearchResult, VectorEntry, VectorStore,
    EMBEDDING_DIMENSION,
};

/// 설정에 맞는 벡터 저장소 열기
pub async fn open_vector_store(config: &Config) -> Result<Arc<dyn VectorStore>> {
    let store: Arc<dyn VectorStore> = match &config.vector_backend {
        VectorBackend::Pinecone {
            api_key,
            index_host,
            namespace,
        } => {
            tracing::info!("Using Pinecone index at {}", index_host);
            Arc::new(PineconeVectorStore::new(
                api_key.clone(),
                index_host.clone(),
                namespace.clone(),
            )?)
        }
        VectorBackend::Lance { path } => {
            tracing::info!("Using local LanceDB at {:?}", path);
            let dimension = i32::try_from(config.embedding_dimension)
                .context("Embedding dimension out of range")?;
            Arc::new(LanceVectorStore::open_with_dimension(path, dimension).await?)
        }
    };
    Ok(store)
}
