//! RAG 모듈 - 질문 답변 파이프라인과 대화 메모리
//!
//! - Pipeline: 검색 → 프롬프트 → LLM → 메모리
//! - Memory: 대화 턴 기록, 통계, 내보내기
//! - Service: 대화 하나를 잠금으로 감싼 진입점

mod memory;
mod pipeline;
mod prompt;
mod sample;
mod service;

pub use memory::{ConversationExport, ConversationMemory, MemoryStats, Turn};
pub use pipeline::{AnswerResult, FallbackReason, PipelineConfig, RagPipeline, Retrieval};
pub use prompt::{build_messages, format_context, SYSTEM_INSTRUCTION};
pub use sample::{
    sample_document, sample_questions, FALLBACK_KNOWLEDGE, SAMPLE_QUESTIONS, SAMPLE_SOURCE,
};
pub use service::ChatService;
