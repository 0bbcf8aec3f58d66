//! 웹 스크래퍼 모듈 - 뉴스 페이지 콘텐츠 추출
//!
//! 설정된 URL 목록을 순서대로 가져와 본문 텍스트를 [`SourceDocument`]로 만듭니다.
//! 본문 클래스 셀렉터 → 시맨틱 컨테이너 → body 순으로 폴백합니다.
//! 한 URL의 실패는 다른 URL에 영향을 주지 않습니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::config::Config;
use crate::error::RagError;
use crate::knowledge::SourceDocument;

/// 기사 본문에 흔히 쓰이는 클래스 (우선 추출 대상)
const CONTENT_CLASSES: [&str; 15] = [
    "article-content",
    "article-title",
    "article-body",
    "content",
    "post-content",
    "entry-content",
    "post-body",
    "article-text",
    "main-content",
    "story-content",
    "article",
    "post",
    "content-area",
    "main",
    "body",
];

/// 클래스 추출 결과가 이보다 짧으면 폴백
const MIN_SELECTED_CHARS: usize = 100;

/// 이 길이 이하의 문서는 버림
const MIN_DOCUMENT_CHARS: usize = 50;

/// 연속 공백
static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

// ============================================================================
// ContentSource Trait
// ============================================================================

/// 콘텐츠 소스 트레이트
///
/// 갱신 주기마다 한 번 호출됩니다. 문서를 하나도 얻지 못하면
/// [`RagError::ContentSourceUnavailable`]을 반환합니다.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<SourceDocument>, RagError>;

    fn name(&self) -> &str;
}

// ============================================================================
// WebScraper
// ============================================================================

/// 웹 스크래퍼
pub struct WebScraper {
    client: reqwest::Client,
    urls: Vec<String>,
    request_delay: Duration,
}

impl WebScraper {
    /// 새 스크래퍼 생성
    pub fn new(urls: Vec<String>, request_delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            urls,
            request_delay,
        })
    }

    /// 설정의 소스 URL과 딜레이로 생성
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.source_urls.clone(), config.request_delay)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    /// URL에서 HTML 가져오기
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("HTTP {} from {}", status, url);
        }

        response.text().await.context("Failed to read response body")
    }

    /// HTML에서 문서 추출 (너무 짧으면 None)
    fn parse_page(&self, html: &str, url: &str) -> Option<SourceDocument> {
        let document = Html::parse_document(html);

        if let Some(title) = self.extract_title(&document) {
            tracing::debug!("Page title: {}", title);
        }

        let mut content = self.extract_by_classes(&document);
        if content.chars().count() < MIN_SELECTED_CHARS {
            tracing::info!("No content found with selectors, trying without filtering: {}", url);
            content = self.extract_content(&document);
        }

        if content.trim().chars().count() <= MIN_DOCUMENT_CHARS {
            return None;
        }

        Some(SourceDocument::new(content, url))
    }

    /// 제목 추출
    fn extract_title(&self, document: &Html) -> Option<String> {
        for tag in ["title", "h1"] {
            if let Ok(selector) = Selector::parse(tag) {
                if let Some(element) = document.select(&selector).next() {
                    let title = element.text().collect::<String>().trim().to_string();
                    if !title.is_empty() {
                        return Some(title);
                    }
                }
            }
        }
        None
    }

    /// 본문 클래스를 가진 최상위 요소들의 텍스트
    fn extract_by_classes(&self, document: &Html) -> String {
        let selector_str = CONTENT_CLASSES
            .iter()
            .map(|class| format!(".{}", class))
            .collect::<Vec<_>>()
            .join(", ");
        let Ok(selector) = Selector::parse(&selector_str) else {
            return String::new();
        };

        let mut parts = Vec::new();
        for element in document.select(&selector) {
            // 이미 선택된 조상 안에 있으면 중복
            let nested = element
                .ancestors()
                .filter_map(ElementRef::wrap)
                .any(|ancestor| selector.matches(&ancestor));
            if nested {
                continue;
            }

            let text = visible_text(&element);
            if !text.is_empty() {
                parts.push(text);
            }
        }

        parts.join("\n\n")
    }

    /// 필터 없는 본문 추출 (article > main > body)
    fn extract_content(&self, document: &Html) -> String {
        let selectors = ["article", "main", "[role=main]", "#content"];

        for selector_str in selectors {
            if let Ok(selector) = Selector::parse(selector_str) {
                if let Some(element) = document.select(&selector).next() {
                    let text = visible_text(&element);
                    if text.chars().count() >= MIN_SELECTED_CHARS {
                        return text;
                    }
                }
            }
        }

        // 폴백: 전체 body 텍스트
        if let Ok(selector) = Selector::parse("body") {
            if let Some(element) = document.select(&selector).next() {
                return visible_text(&element);
            }
        }

        String::new()
    }
}

#[async_trait]
impl ContentSource for WebScraper {
    async fn fetch(&self) -> Result<Vec<SourceDocument>, RagError> {
        let mut documents = Vec::new();
        let mut failed = 0;

        for (i, url) in self.urls.iter().enumerate() {
            if i > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            tracing::info!("Loading: {}", url);
            match self.fetch_page(url).await {
                Ok(html) => match self.parse_page(&html, url) {
                    Some(doc) => {
                        tracing::info!(
                            "Found {} chars ({}) from {}",
                            doc.text.chars().count(),
                            doc.content_type,
                            url
                        );
                        documents.push(doc);
                    }
                    None => tracing::warn!("No valid content found from {}", url),
                },
                Err(e) => {
                    failed += 1;
                    tracing::error!("Error loading {}: {:#}", url, e);
                }
            }
        }

        if documents.is_empty() {
            return Err(RagError::ContentSourceUnavailable(format!(
                "no content from {} url(s) ({} failed)",
                self.urls.len(),
                failed
            )));
        }

        tracing::info!(
            "Loaded {} documents from {} URLs",
            documents.len(),
            self.urls.len()
        );
        Ok(documents)
    }

    fn name(&self) -> &str {
        "web"
    }
}

/// 요소의 보이는 텍스트 (script/style 제외, 노드별 줄바꿈)
fn visible_text(element: &ElementRef) -> String {
    let mut lines = Vec::new();

    for node in element.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };

        let hidden = node
            .parent()
            .and_then(|p| {
                p.value()
                    .as_element()
                    .map(|e| matches!(e.name(), "script" | "style" | "noscript"))
            })
            .unwrap_or(false);
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            continue;
        }

        lines.push(WHITESPACE.replace_all(trimmed, " ").into_owned());
    }

    lines.join("\n")
}
