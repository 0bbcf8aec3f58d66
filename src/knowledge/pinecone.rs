//! Pinecone Vector Store - 호스팅 벡터 인덱스 (REST)
//!
//! 인덱스는 cosine metric, 1024 차원으로 생성되어 있어야 합니다.
//! 메타데이터 키(`text`, `source`)는 기존 인덱스 데이터와 호환됩니다.
//! ref: https://docs.pinecone.io/reference/api/data-plane

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::document::ContentType;
use super::vector::{rank_results, SearchResult, VectorEntry, VectorStore};

/// 한 번의 upsert 요청에 담을 최대 벡터 수
const UPSERT_BATCH_SIZE: usize = 100;

const API_VERSION: &str = "2024-07";

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
struct PineconeMetadata {
    #[serde(default)]
    text: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    chunk_index: Option<f64>,
}

#[derive(Debug, Serialize)]
struct PineconeVector<'a> {
    id: &'a str,
    values: &'a [f32],
    metadata: PineconeMetadata,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<PineconeVector<'a>>,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "str::is_empty")]
    namespace: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<PineconeMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexStats {
    #[serde(default)]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NamespaceStats {
    #[serde(default)]
    vector_count: usize,
}

impl From<QueryMatch> for SearchResult {
    fn from(m: QueryMatch) -> Self {
        let metadata = m.metadata.unwrap_or_default();
        let content_type = metadata
            .content_type
            .as_deref()
            .map(ContentType::parse)
            .unwrap_or_else(|| ContentType::from_url(&metadata.source));

        SearchResult {
            id: m.id,
            text: metadata.text,
            source_url: metadata.source,
            content_type,
            chunk_index: metadata.chunk_index.map(|i| i as i32).unwrap_or(0),
            similarity: m.score,
        }
    }
}

// ============================================================================
// PineconeVectorStore
// ============================================================================

/// Pinecone 데이터 플레인 REST 클라이언트
pub struct PineconeVectorStore {
    client: reqwest::Client,
    api_key: String,
    index_host: String,
    namespace: String,
}

impl PineconeVectorStore {
    /// 새 Pinecone 저장소 생성
    ///
    /// # Arguments
    /// * `api_key` - Pinecone API 키
    /// * `index_host` - 인덱스 호스트 (`https://<index>-<project>.svc.<env>.pinecone.io`)
    /// * `namespace` - 네임스페이스 (빈 문자열이면 기본)
    pub fn new(api_key: String, index_host: String, namespace: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key,
            index_host: index_host.trim_end_matches('/').to_string(),
            namespace,
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<String> {
        let response = self
            .client
            .post(format!("{}{}", self.index_host, path))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send Pinecone request: {}", path))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read Pinecone response body")?;

        if !status.is_success() {
            anyhow::bail!("Pinecone API error ({}) on {}: {}", status, path, text);
        }

        Ok(text)
    }
}

fn to_wire(entry: &VectorEntry) -> PineconeVector<'_> {
    PineconeVector {
        id: &entry.id,
        values: &entry.embedding,
        metadata: PineconeMetadata {
            text: entry.text.clone(),
            source: entry.source_url.clone(),
            content_type: Some(entry.content_type.as_str().to_string()),
            chunk_index: Some(entry.chunk_index as f64),
        },
    }
}

#[async_trait]
impl VectorStore for PineconeVectorStore {
    async fn upsert(&self, entries: &[VectorEntry]) -> Result<usize> {
        let mut upserted = 0;

        for batch in entries.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertRequest {
                vectors: batch.iter().map(to_wire).collect(),
                namespace: &self.namespace,
            };

            let body = self.post("/vectors/upsert", &request).await?;
            let response: UpsertResponse =
                serde_json::from_str(&body).context("Failed to parse upsert response")?;
            upserted += response.upserted_count;
        }

        tracing::debug!("Upserted {} vectors into Pinecone", upserted);
        Ok(upserted)
    }

    async fn query(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let request = QueryRequest {
            vector: query_embedding,
            top_k: k,
            include_metadata: true,
            include_values: false,
            namespace: &self.namespace,
        };

        let body = self.post("/query", &request).await?;
        let response: QueryResponse =
            serde_json::from_str(&body).context("Failed to parse query response")?;

        let mut results: Vec<SearchResult> =
            response.matches.into_iter().map(SearchResult::from).collect();
        rank_results(&mut results);
        results.truncate(k);
        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let body = self
            .post("/describe_index_stats", &serde_json::json!({}))
            .await?;
        let stats: IndexStats =
            serde_json::from_str(&body).context("Failed to parse index stats")?;

        if self.namespace.is_empty() {
            return Ok(stats.total_vector_count);
        }
        Ok(stats
            .namespaces
            .get(&self.namespace)
            .map(|ns| ns.vector_count)
            .unwrap_or(0))
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

// ============================================================================
// Tests
// ============================================================================
