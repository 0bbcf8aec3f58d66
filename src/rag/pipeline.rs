//! RAG 답변 파이프라인
//!
//! 질문 임베딩 → 벡터 검색 (실패 시 내장 지식으로 폴백) → 프롬프트 구성
//! → LLM 호출 → 메모리에 턴 추가.
//! 메모리는 `&mut`로 받기 때문에 한 대화에 동시에 두 답변이 쓰일 수 없습니다.

use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, DEFAULT_HISTORY_WINDOW, DEFAULT_TOP_K};
use crate::embedding::EmbeddingProvider;
use crate::error::RagError;
use crate::knowledge::{rank_results, SearchResult, VectorStore};
use crate::llm::LanguageModel;

use super::memory::{ConversationMemory, Turn};
use super::prompt::build_messages;
use super::sample::{FALLBACK_KNOWLEDGE, SAMPLE_SOURCE};

// ============================================================================
// Types
// ============================================================================

/// 폴백 사유
#[derive(Debug, Clone, PartialEq)]
pub enum FallbackReason {
    /// 임베딩 또는 검색 호출 실패
    StoreUnavailable(String),
    /// 검색 결과 없음 (빈 인덱스)
    NoMatches,
}

/// 검색 단계 결과
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// 유사도 내림차순 청크 (최대 k개)
    Found { chunks: Vec<SearchResult> },
    /// 내장 지식 텍스트로 대체
    Fallback { text: String, reason: FallbackReason },
}

impl Retrieval {
    fn fallback(reason: FallbackReason) -> Self {
        Retrieval::Fallback {
            text: FALLBACK_KNOWLEDGE.to_string(),
            reason,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Retrieval::Fallback { .. })
    }

    pub fn chunks(&self) -> &[SearchResult] {
        match self {
            Retrieval::Found { chunks } => chunks,
            Retrieval::Fallback { .. } => &[],
        }
    }

    /// 사용된 출처 (중복 제거, 등장 순)
    pub fn sources(&self) -> Vec<String> {
        match self {
            Retrieval::Found { chunks } => {
                let mut sources: Vec<String> = Vec::new();
                for chunk in chunks {
                    if !sources.contains(&chunk.source_url) {
                        sources.push(chunk.source_url.clone());
                    }
                }
                sources
            }
            Retrieval::Fallback { .. } => vec![SAMPLE_SOURCE.to_string()],
        }
    }
}

/// 답변 결과
#[derive(Debug, Clone)]
pub struct AnswerResult {
    pub answer: String,
    pub context: Retrieval,
    /// 메모리에 추가된 턴
    pub turn: Turn,
}

/// 파이프라인 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 검색할 청크 수
    pub top_k: usize,
    /// 프롬프트에 넣을 최근 턴 수
    pub history_window: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.top_k,
            history_window: config.history_window,
        }
    }
}

// ============================================================================
// RagPipeline
// ============================================================================

pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LanguageModel>,
    config: PipelineConfig,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LanguageModel>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            config,
        }
    }

    pub fn config(&self) -> PipelineConfig {
        self.config
    }

    /// 질문과 관련된 청크 검색
    ///
    /// 실패는 에러가 아니라 [`Retrieval::Fallback`]으로 돌려줍니다.
    pub async fn retrieve(&self, question: &str) -> Retrieval {
        let embedding = match self.embedder.embed(question).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!("Question embedding failed, using fallback knowledge: {:#}", e);
                return Retrieval::fallback(FallbackReason::StoreUnavailable(e.to_string()));
            }
        };

        let mut chunks = match self.store.query(&embedding, self.config.top_k).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    "Vector store '{}' query failed, using fallback knowledge: {:#}",
                    self.store.name(),
                    e
                );
                return Retrieval::fallback(FallbackReason::StoreUnavailable(e.to_string()));
            }
        };

        chunks.retain(|c| !c.text.trim().is_empty());
        if chunks.is_empty() {
            tracing::warn!("No matching chunks, using fallback knowledge");
            return Retrieval::fallback(FallbackReason::NoMatches);
        }

        rank_results(&mut chunks);
        chunks.truncate(self.config.top_k);
        Retrieval::Found { chunks }
    }

    /// 질문에 답하고 턴을 메모리에 추가
    ///
    /// LLM 실패 시 [`RagError::GenerationFailed`]를 반환하며 메모리는 그대로입니다.
    pub async fn answer(
        &self,
        question: &str,
        memory: &mut ConversationMemory,
    ) -> Result<AnswerResult, RagError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(RagError::InvalidInput(
                "question must not be empty".to_string(),
            ));
        }

        let start = Instant::now();
        let context = self.retrieve(question).await;
        let messages = build_messages(
            &context,
            memory.recent(self.config.history_window),
            question,
        );

        let answer = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| RagError::GenerationFailed(e.to_string()))?;
        let answer = answer.trim().to_string();

        let turn = Turn::new(question, answer.clone(), context.sources());
        memory.append(turn.clone());

        tracing::info!(
            chunks = context.chunks().len(),
            fallback = context.is_fallback(),
            history = memory.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answered question"
        );

        Ok(AnswerResult {
            answer,
            context,
            turn,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{Chunk, ContentType, MemoryVectorStore, VectorEntry};
    use crate::llm::Role;
    use crate::testing::{FailingStore, RecordingLlm, StubEmbedder};

    const QUESTION: &str = "Ποια είναι η ιστορία του ντέρμπι;";

    fn entry(text: &str, source: &str, index: usize, embedding: Vec<f32>) -> VectorEntry {
        let chunk = Chunk {
            text: text.to_string(),
            source_url: source.to_string(),
            content_type: ContentType::from_url(source),
            index,
        };
        VectorEntry::from_chunk(&chunk, embedding)
    }

    async fn history_store() -> Arc<MemoryVectorStore> {
        let store = Arc::new(MemoryVectorStore::new());
        store
            .upsert(&[
                entry(
                    "Γήπεδα: Γεώργιος Καραϊσκάκης και Απόστολος Νικολαΐδης.",
                    "https://www.gazzetta.gr/football/superleague",
                    0,
                    vec![0.2, 1.0],
                ),
                entry(
                    "Το πρώτο επίσημο ματς μεταξύ των δύο ομάδων έγινε το 1925.",
                    "https://www.gazzetta.gr/football/superleague/olympiakos",
                    1,
                    vec![1.0, 0.0],
                ),
            ])
            .await
            .unwrap();
        store
    }

    fn pipeline(
        store: Arc<dyn VectorStore>,
        embedder: StubEmbedder,
        llm: Arc<RecordingLlm>,
    ) -> RagPipeline {
        RagPipeline::new(Arc::new(embedder), store, llm, PipelineConfig::default())
    }

    #[tokio::test]
    async fn test_empty_question_rejected_before_calls() {
        let llm = RecordingLlm::replying("δεν πρέπει να κληθεί");
        let p = pipeline(Arc::new(FailingStore), StubEmbedder::failing(), llm.clone());
        let mut memory = ConversationMemory::new();

        for question in ["", "   ", "\n\t"] {
            let result = p.answer(question, &mut memory).await;
            assert!(matches!(result, Err(RagError::InvalidInput(_))));
        }
        assert!(llm.calls().is_empty());
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn test_derby_history_end_to_end() {
        let llm = RecordingLlm::replying("Το πρώτο επίσημο ντέρμπι έγινε το 1925.");
        let store = history_store().await;
        let p = pipeline(store, StubEmbedder::new(vec![1.0, 0.0]), llm.clone());
        let mut memory = ConversationMemory::new();

        let result = p.answer(QUESTION, &mut memory).await.unwrap();

        assert!(result.answer.contains("1925"));
        assert_eq!(memory.len(), 1);
        assert_eq!(memory.history()[0], result.turn);
        assert_eq!(result.turn.question, QUESTION);

        match &result.context {
            Retrieval::Found { chunks } => {
                assert_eq!(chunks.len(), 2);
                assert!(chunks[0].text.contains("1925"));
                assert!(chunks[0].similarity >= chunks[1].similarity);
            }
            other => panic!("expected chunks, got {:?}", other),
        }

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        let system = &calls[0][0].content;
        let first = system
            .find("[Πηγή: https://www.gazzetta.gr/football/superleague/olympiakos]")
            .unwrap();
        let second = system
            .find("[Πηγή: https://www.gazzetta.gr/football/superleague]")
            .unwrap();
        assert!(first < second);
        assert_eq!(
            result.turn.sources,
            vec![
                "https://www.gazzetta.gr/football/superleague/olympiakos".to_string(),
                "https://www.gazzetta.gr/football/superleague".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_store_failure_uses_fallback() {
        let llm = RecordingLlm::replying("Ο Ολυμπιακός έχει περισσότερες νίκες.");
        let p = pipeline(
            Arc::new(FailingStore),
            StubEmbedder::new(vec![1.0, 0.0]),
            llm.clone(),
        );
        let mut memory = ConversationMemory::new();

        let result = p
            .answer("Ποιος έχει κερδίσει περισσότερες φορές;", &mut memory)
            .await
            .unwrap();

        assert!(matches!(
            result.context,
            Retrieval::Fallback {
                reason: FallbackReason::StoreUnavailable(_),
                ..
            }
        ));
        assert_eq!(result.turn.sources, vec![SAMPLE_SOURCE.to_string()]);
        assert_eq!(memory.len(), 1);
        assert!(llm.calls()[0][0].content.contains("Το πρώτο επίσημο ματς"));
    }

    #[tokio::test]
    async fn test_embedding_failure_uses_fallback() {
        let llm = RecordingLlm::replying("απάντηση");
        let store = history_store().await;
        let p = pipeline(store, StubEmbedder::failing(), llm);
        let mut memory = ConversationMemory::new();

        let result = p.answer(QUESTION, &mut memory).await.unwrap();
        assert!(result.context.is_fallback());
    }

    #[tokio::test]
    async fn test_empty_store_uses_fallback() {
        let llm = RecordingLlm::replying("απάντηση");
        let p = pipeline(
            Arc::new(MemoryVectorStore::new()),
            StubEmbedder::new(vec![1.0, 0.0]),
            llm,
        );
        let mut memory = ConversationMemory::new();

        let result = p.answer(QUESTION, &mut memory).await.unwrap();
        assert_eq!(
            result.context,
            Retrieval::Fallback {
                text: FALLBACK_KNOWLEDGE.to_string(),
                reason: FallbackReason::NoMatches,
            }
        );
    }

    #[tokio::test]
    async fn test_generation_failure_leaves_memory_unchanged() {
        let llm = RecordingLlm::failing();
        let store = history_store().await;
        let p = pipeline(store, StubEmbedder::new(vec![1.0, 0.0]), llm);

        let mut memory = ConversationMemory::new();
        memory.append(Turn::new("Που γίνεται το ντέρμπι;", "Στον Πειραιά.", vec![]));
        let before = memory.history().to_vec();

        let result = p.answer(QUESTION, &mut memory).await;

        match result {
            Err(RagError::GenerationFailed(detail)) => assert!(detail.contains("401")),
            other => panic!("expected GenerationFailed, got {:?}", other.map(|r| r.answer)),
        }
        assert_eq!(memory.history(), before.as_slice());
    }

    #[tokio::test]
    async fn test_two_sequential_answers() {
        let llm = RecordingLlm::replying("απάντηση");
        let store = history_store().await;
        let p = pipeline(store, StubEmbedder::new(vec![1.0, 0.0]), llm.clone());
        let mut memory = ConversationMemory::new();

        p.answer("Ποια είναι τα γήπεδα;", &mut memory).await.unwrap();
        p.answer("Ποιοι είναι οι κορυφαίοι παίκτες;", &mut memory)
            .await
            .unwrap();

        let questions: Vec<&str> = memory.history().iter().map(|t| t.question.as_str()).collect();
        assert_eq!(
            questions,
            vec!["Ποια είναι τα γήπεδα;", "Ποιοι είναι οι κορυφαίοι παίκτες;"]
        );
        assert_eq!(memory.stats().count, 2);

        // 두 번째 호출에는 첫 턴이 대화 기록으로 들어감
        let second = &llm.calls()[1];
        assert_eq!(second.len(), 4);
        assert_eq!(second[1].role, Role::User);
        assert_eq!(second[1].content, "Ποια είναι τα γήπεδα;");
        assert_eq!(second[2].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_history_window_limits_prompt() {
        let llm = RecordingLlm::replying("απάντηση");
        let store = history_store().await;
        let p = RagPipeline::new(
            Arc::new(StubEmbedder::new(vec![1.0, 0.0])),
            store,
            llm.clone(),
            PipelineConfig {
                top_k: 1,
                history_window: 1,
            },
        );

        let mut memory = ConversationMemory::new();
        memory.append(Turn::new("παλιό", "παλιά απάντηση", vec![]));
        memory.append(Turn::new("πρόσφατο", "πρόσφατη απάντηση", vec![]));

        let result = p.answer(QUESTION, &mut memory).await.unwrap();
        assert_eq!(result.context.chunks().len(), 1);

        let messages = &llm.calls()[0];
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[1].content, "πρόσφατο");
        assert_eq!(memory.len(), 3);
    }

    #[tokio::test]
    async fn test_question_is_trimmed() {
        let llm = RecordingLlm::replying("  απάντηση \n");
        let store = history_store().await;
        let p = pipeline(store, StubEmbedder::new(vec![1.0, 0.0]), llm);
        let mut memory = ConversationMemory::new();

        let result = p.answer("  Ποια είναι τα γήπεδα;  ", &mut memory).await.unwrap();
        assert_eq!(result.turn.question, "Ποια είναι τα γήπεδα;");
        assert_eq!(result.answer, "απάντηση");
    }
}
