//! LLM 모듈 - 채팅 완성 API 클라이언트
//!
//! 파이프라인은 [`LanguageModel`] 트레이트만 알고, 실제 호출은
//! OpenAI 호환 `/chat/completions` 엔드포인트로 보냅니다.
//! 답변 생성은 한 번만 시도합니다 (재시도 없음).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;

// ============================================================================
// Types
// ============================================================================

/// 메시지 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// 채팅 메시지
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// LLM 클라이언트 에러
#[derive(Debug, Error)]
pub enum LlmError {
    /// 설정 오류 (API 키 없음 등)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 네트워크 오류 (연결 실패, 타임아웃)
    #[error("Network error: {0}")]
    Network(String),

    /// API 오류 (2xx 이외 응답)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// 응답 파싱 실패
    #[error("Parse error: {0}")]
    Parse(String),

    /// 선택지/내용이 비어 있음
    #[error("Empty response from model")]
    EmptyResponse,
}

// ============================================================================
// LanguageModel Trait
// ============================================================================

/// 언어 모델 트레이트
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// 메시지 목록으로 답변 생성
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// 모델 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAIChat
// ============================================================================

/// OpenAI 채팅 완성 클라이언트
///
/// ref: https://platform.openai.com/docs/api-reference/chat
pub struct OpenAIChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChat {
    pub fn new(api_key: String, base_url: String, model: String) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Config("OpenAI API key is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    /// 설정에서 생성
    pub fn from_config(config: &Config) -> Result<Self, LlmError> {
        Self::new(
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.chat_model.clone(),
        )
    }
}

/// 첫 번째 선택지의 내용 추출
fn first_choice_content(response: ChatResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[async_trait]
impl LanguageModel for OpenAIChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let start = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Chat completion request failed");
                LlmError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, error = %message, "Chat completion API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let content = first_choice_content(parsed)?;
        tracing::debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat completion"
        );
        Ok(content)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
