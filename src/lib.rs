//! derby-rag - 올림피아코스-파나티나이코스 더비 RAG 챗봇
//!
//! 뉴스 페이지를 청크로 나눠 벡터 인덱스(Pinecone 또는 LanceDB)에 저장하고,
//! 그리스어 질문에 검색 결과와 최근 대화를 붙여 LLM으로 답변합니다.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod knowledge;
pub mod llm;
pub mod rag;
pub mod scraper;

#[cfg(test)]
mod testing;

// Re-exports
pub use config::{get_data_dir, Config, VectorBackend};
pub use embedding::{EmbeddingProvider, OpenAIEmbedding};
pub use error::RagError;
pub use ingest::{Indexer, RefreshOutcome, RefreshReport};
pub use knowledge::{
    default_chunker, open_vector_store, Chunk, ChunkConfig, Chunker, ContentType,
    LanceVectorStore, MemoryVectorStore, PineconeVectorStore, RecursiveChunker, SearchResult,
    SourceDocument, VectorEntry, VectorStore,
};
pub use llm::{ChatMessage, LanguageModel, LlmError, OpenAIChat, Role};
pub use rag::{
    AnswerResult, ChatService, ConversationMemory, FallbackReason, MemoryStats, PipelineConfig,
    RagPipeline, Retrieval, Turn,
};
pub use scraper::{ContentSource, WebScraper};
