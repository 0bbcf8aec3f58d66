//! 채팅 서비스 - 파이프라인 하나와 대화 메모리 하나를 소유
//!
//! `ask`는 답변이 끝날 때까지 메모리 잠금을 유지하므로
//! 같은 대화에 대한 동시 요청은 순서대로 처리됩니다.

use std::path::PathBuf;

use anyhow::Result;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::RagError;

use super::memory::{ConversationMemory, MemoryStats, Turn};
use super::pipeline::{AnswerResult, RagPipeline};
use super::sample::sample_questions;

pub struct ChatService {
    pipeline: RagPipeline,
    memory: Mutex<ConversationMemory>,
    export_dir: PathBuf,
}

impl ChatService {
    pub fn new(pipeline: RagPipeline, export_dir: PathBuf) -> Self {
        Self {
            pipeline,
            memory: Mutex::new(ConversationMemory::new()),
            export_dir,
        }
    }

    /// 질문에 답변
    pub async fn ask(&self, question: &str) -> Result<AnswerResult, RagError> {
        let mut memory = self.memory.lock().await;
        self.pipeline.answer(question, &mut memory).await
    }

    /// 전체 대화 기록
    pub async fn history(&self) -> Vec<Turn> {
        self.memory.lock().await.history().to_vec()
    }

    pub async fn stats(&self) -> MemoryStats {
        self.memory.lock().await.stats()
    }

    pub async fn summary(&self) -> String {
        self.memory.lock().await.summary()
    }

    /// 대화 메모리 삭제
    pub async fn clear(&self) {
        self.memory.lock().await.clear();
        tracing::info!("Conversation memory cleared");
    }

    /// JSON 파일로 내보내기
    pub async fn export(&self) -> Result<PathBuf> {
        self.memory.lock().await.export_to_file(&self.export_dir)
    }

    pub async fn conversation_id(&self) -> Uuid {
        self.memory.lock().await.id()
    }

    pub fn sample_questions(&self) -> Vec<String> {
        sample_questions()
    }
}
