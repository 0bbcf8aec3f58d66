//! 설정 모듈 - 환경변수 기반 설정 로드
//!
//! `.env` 파일이 있으면 먼저 읽고(dotenvy), 이후 환경변수에서 값을 가져옵니다.
//! 벡터 저장소는 Pinecone 자격 증명이 있으면 Pinecone, 없으면 로컬 LanceDB를 사용합니다.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

// ============================================================================
// Defaults
// ============================================================================

/// 기본 스크래핑 대상 (gazzetta.gr)
pub const DEFAULT_SOURCE_URLS: [&str; 4] = [
    "https://www.gazzetta.gr/football/superleague/olympiakos",
    "https://www.gazzetta.gr/football/superleague/panathinaikos",
    "https://www.gazzetta.gr/football/superleague",
    "https://www.gazzetta.gr",
];

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// 임베딩 차원 (Pinecone 인덱스와 일치해야 함)
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1024;

pub const DEFAULT_TOP_K: usize = 4;
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 2000;

/// 데이터 디렉토리 경로 (~/.derby-rag/)
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".derby-rag")
}

// ============================================================================
// Types
// ============================================================================

/// 벡터 저장소 백엔드 선택
#[derive(Debug, Clone, PartialEq)]
pub enum VectorBackend {
    /// 호스팅 Pinecone 인덱스
    Pinecone {
        api_key: String,
        index_host: String,
        namespace: String,
    },
    /// 로컬 LanceDB 디렉토리
    Lance { path: PathBuf },
}

/// 애플리케이션 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub vector_backend: VectorBackend,
    pub data_dir: PathBuf,
    pub source_urls: Vec<String>,
    /// 질문당 검색할 청크 수
    pub top_k: usize,
    /// 프롬프트에 포함할 최근 대화 턴 수
    pub history_window: usize,
    /// 스크래핑 요청 간 딜레이
    pub request_delay: Duration,
}

impl Config {
    /// `.env`를 읽은 뒤 환경변수에서 설정 로드
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Failed to read .env file: {}", e),
        }
        Self::from_env()
    }

    /// 프로세스 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 조회 함수로 설정 로드 (테스트에서 환경변수를 건드리지 않기 위함)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY").ok_or_else(|| {
            anyhow::anyhow!(
                "OPENAI_API_KEY not set.\n\
                 Set: export OPENAI_API_KEY=your-api-key (or add it to .env)"
            )
        })?;

        let data_dir = get("DERBY_RAG_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(get_data_dir);

        let vector_backend = match (get("PINECONE_API_KEY"), get("PINECONE_INDEX_HOST")) {
            (Some(api_key), Some(host)) => VectorBackend::Pinecone {
                api_key,
                index_host: normalize_host(&host),
                namespace: get("PINECONE_NAMESPACE").unwrap_or_default(),
            },
            (Some(_), None) => {
                bail!("PINECONE_API_KEY is set but PINECONE_INDEX_HOST is missing")
            }
            _ => VectorBackend::Lance {
                path: data_dir.join("vectors.lance"),
            },
        };

        let source_urls = match get("DERBY_SOURCE_URLS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_SOURCE_URLS.iter().map(|s| s.to_string()).collect(),
        };
        validate_urls(&source_urls)?;

        let top_k = parse_or(get("DERBY_TOP_K"), DEFAULT_TOP_K, "DERBY_TOP_K")?;
        if top_k == 0 {
            bail!("DERBY_TOP_K must be at least 1");
        }

        Ok(Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            chat_model: get("DERBY_CHAT_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            embedding_model: get("DERBY_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            vector_backend,
            data_dir,
            source_urls,
            top_k,
            history_window: parse_or(
                get("DERBY_HISTORY_WINDOW"),
                DEFAULT_HISTORY_WINDOW,
                "DERBY_HISTORY_WINDOW",
            )?,
            request_delay: Duration::from_millis(parse_or(
                get("DERBY_REQUEST_DELAY_MS"),
                DEFAULT_REQUEST_DELAY_MS,
                "DERBY_REQUEST_DELAY_MS",
            )?),
        })
    }

    /// 대화 내보내기 디렉토리
    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn parse_or<T>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        bail!("At least one source URL is required");
    }
    for raw in urls {
        let parsed = url::Url::parse(raw).with_context(|| format!("Invalid source URL: {}", raw))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("Unsupported URL scheme for {}: {}", raw, parsed.scheme());
        }
    }
    Ok(())
}

/// Pinecone 호스트에 스킴이 없으면 https 추가
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

// ============================================================================
// Tests
// ============================================================================
