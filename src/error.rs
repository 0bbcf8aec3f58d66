//! 도메인 에러 분류
//!
//! 파이프라인과 콘텐츠 갱신에서 호출자에게 의미가 있는 실패만 정의합니다.
//! 검색 실패(retrieval unavailable)는 에러가 아니라
//! [`Retrieval::Fallback`](crate::rag::Retrieval)으로 표현됩니다.

use thiserror::Error;

/// RAG 도메인 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 빈 질문 등 잘못된 입력 (네트워크 호출 전에 거부)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// LLM 호출 실패 (재시도 없음, 메모리는 변경되지 않음)
    #[error("Answer generation failed: {0}")]
    GenerationFailed(String),

    /// 설정된 페이지를 하나도 가져오지 못함 (갱신 주기 건너뜀)
    #[error("Content source unavailable: {0}")]
    ContentSourceUnavailable(String),
}

impl RagError {
    /// 사용자에게 보여줄 그리스어 메시지
    pub fn user_message(&self) -> String {
        match self {
            RagError::InvalidInput(_) => "Παρακαλώ εισάγετε μια ερώτηση ή εντολή.".to_string(),
            RagError::GenerationFailed(detail) => format!("Σφάλμα: {}", detail),
            RagError::ContentSourceUnavailable(detail) => {
                format!("Η ενημέρωση περιεχομένου παραλείφθηκε: {}", detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_invalid_input() {
        let err = RagError::InvalidInput("question must not be empty".to_string());
        assert_eq!(err.user_message(), "Παρακαλώ εισάγετε μια ερώτηση ή εντολή.");
    }

    #[test]
    fn test_user_message_generation_failed_keeps_detail() {
        let err = RagError::GenerationFailed("quota exceeded".to_string());
        assert!(err.user_message().starts_with("Σφάλμα:"));
        assert!(err.user_message().contains("quota exceeded"));
    }

    #[test]
    fn test_display() {
        let err = RagError::ContentSourceUnavailable("all 4 urls failed".to_string());
        assert_eq!(err.to_string(), "Content source unavailable: all 4 urls failed");
    }
}
