//! 문서 및 청크 타입
//!
//! 콘텐츠 소스가 만든 [`SourceDocument`]는 청커를 거쳐 [`Chunk`]가 되고,
//! 청크는 임베딩과 함께 벡터 저장소에 저장됩니다.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// ContentType
// ============================================================================

/// 콘텐츠 분류 (출처 URL 경로로 결정)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Olympiakos,
    Panathinaikos,
    Superleague,
    General,
}

impl ContentType {
    /// URL에서 콘텐츠 타입 결정
    ///
    /// 더 구체적인 팀 경로가 리그 경로보다 우선합니다.
    pub fn from_url(source_url: &str) -> Self {
        let path = url::Url::parse(source_url)
            .map(|u| u.path().to_lowercase())
            .unwrap_or_else(|_| source_url.to_lowercase());

        if path.contains("olympiakos") {
            ContentType::Olympiakos
        } else if path.contains("panathinaikos") {
            ContentType::Panathinaikos
        } else if path.contains("superleague") {
            ContentType::Superleague
        } else {
            ContentType::General
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Olympiakos => "olympiakos",
            ContentType::Panathinaikos => "panathinaikos",
            ContentType::Superleague => "superleague",
            ContentType::General => "general",
        }
    }

    /// 저장소 메타데이터 문자열에서 복원 (알 수 없는 값은 General)
    pub fn parse(value: &str) -> Self {
        match value {
            "olympiakos" => ContentType::Olympiakos,
            "panathinaikos" => ContentType::Panathinaikos,
            "superleague" => ContentType::Superleague,
            _ => ContentType::General,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SourceDocument / Chunk
// ============================================================================

/// 청킹 전 원본 문서
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub text: String,
    pub source_url: String,
    pub content_type: ContentType,
}

impl SourceDocument {
    /// URL로부터 콘텐츠 타입을 추론하여 생성
    pub fn new(text: impl Into<String>, source_url: impl Into<String>) -> Self {
        let source_url = source_url.into();
        Self {
            text: text.into(),
            content_type: ContentType::from_url(&source_url),
            source_url,
        }
    }
}

/// 출처 메타데이터를 유지하는 텍스트 조각
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_url: String,
    pub content_type: ContentType,
    /// 문서 내 청크 순번 (0-based)
    pub index: usize,
}

impl Chunk {
    /// 저장소 ID (source_url, index, text의 SHA-256 앞 32자)
    ///
    /// 같은 콘텐츠를 다시 upsert해도 같은 ID가 되어 중복이 생기지 않습니다.
    pub fn id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.source_url.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.index.to_le_bytes());
        hasher.update([0u8]);
        hasher.update(self.text.as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        digest[..32].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_url() {
        assert_eq!(
            ContentType::from_url("https://www.gazzetta.gr/football/superleague/olympiakos"),
            ContentType::Olympiakos
        );
        assert_eq!(
            ContentType::from_url("https://www.gazzetta.gr/football/superleague/panathinaikos"),
            ContentType::Panathinaikos
        );
        assert_eq!(
            ContentType::from_url("https://www.gazzetta.gr/football/superleague"),
            ContentType::Superleague
        );
        assert_eq!(
            ContentType::from_url("https://www.gazzetta.gr"),
            ContentType::General
        );
        assert_eq!(ContentType::from_url("sample_content"), ContentType::General);
    }

    #[test]
    fn test_content_type_round_trip_str() {
        for ct in [
            ContentType::Olympiakos,
            ContentType::Panathinaikos,
            ContentType::Superleague,
            ContentType::General,
        ] {
            assert_eq!(ContentType::parse(ct.as_str()), ct);
        }
        assert_eq!(ContentType::parse("unknown"), ContentType::General);
    }

    #[test]
    fn test_chunk_id_is_deterministic() {
        let chunk = Chunk {
            text: "Το ντέρμπι των αιωνίων".to_string(),
            source_url: "https://www.gazzetta.gr".to_string(),
            content_type: ContentType::General,
            index: 0,
        };
        let same = chunk.clone();
        let mut other = chunk.clone();
        other.index = 1;

        assert_eq!(chunk.id(), same.id());
        assert_ne!(chunk.id(), other.id());
        assert_eq!(chunk.id().len(), 32);
    }
}
