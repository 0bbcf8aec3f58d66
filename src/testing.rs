//! 테스트용 스텁 구현 (임베딩, 저장소, LLM, 콘텐츠 소스)

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::EmbeddingProvider;
use crate::error::RagError;
use crate::knowledge::{SearchResult, SourceDocument, VectorEntry, VectorStore};
use crate::llm::{ChatMessage, LanguageModel, LlmError};
use crate::scraper::ContentSource;

/// 항상 같은 벡터를 돌려주는 임베딩
pub struct StubEmbedder {
    vector: Vec<f32>,
    fail: bool,
}

impl StubEmbedder {
    pub fn new(vector: Vec<f32>) -> Self {
        Self {
            vector,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            vector: vec![],
            fail: true,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        if self.fail {
            anyhow::bail!("embedding service unreachable");
        }
        Ok(self.vector.clone())
    }

    fn dimension(&self) -> usize {
        self.vector.len()
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// 모든 호출이 실패하는 저장소
pub struct FailingStore;

#[async_trait]
impl VectorStore for FailingStore {
    async fn upsert(&self, _entries: &[VectorEntry]) -> Result<usize> {
        anyhow::bail!("vector store unreachable")
    }

    async fn query(&self, _query_embedding: &[f32], _k: usize) -> Result<Vec<SearchResult>> {
        anyhow::bail!("vector store unreachable")
    }

    async fn count(&self) -> Result<usize> {
        anyhow::bail!("vector store unreachable")
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// 받은 메시지를 기록하는 LLM
pub struct RecordingLlm {
    reply: Option<String>,
    calls: Mutex<Vec<Vec<ChatMessage>>>,
}

impl RecordingLlm {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for RecordingLlm {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(LlmError::Api {
                status: 401,
                message: "invalid api key".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// 고정 문서 또는 실패를 돌려주는 콘텐츠 소스
pub struct StaticSource {
    documents: Vec<SourceDocument>,
}

impl StaticSource {
    pub fn new(documents: Vec<SourceDocument>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<SourceDocument>, RagError> {
        if self.documents.is_empty() {
            return Err(RagError::ContentSourceUnavailable(
                "all pages failed".to_string(),
            ));
        }
        Ok(self.documents.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
