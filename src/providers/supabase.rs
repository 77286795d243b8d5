//! Supabase Client - curated token directories
//!
//! Reads the suspicious and safe token tables through PostgREST:
//! `{url}/rest/v1/{table}?select=*&blockchain=eq.{chain}`
//! paginated with `offset`/`limit` until a short page comes back.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, info};

use super::retry::{classify_status, transport_error, RetryPolicy};
use super::TokenDirectory;
use crate::models::{
    AppError, AppResult, Blockchain, DirectoryKind, ErrorCode, ExplorerConfig, TokenListing,
};
use crate::utils::constants::{DIRECTORY_PAGE_SIZE, USER_AGENT as USER_AGENT_CONST};

/// Raw PostgREST row. Columns besides these are ignored.
#[derive(Debug, Deserialize)]
struct DirectoryRow {
    contract_address: Option<String>,
    #[serde(default)]
    blockchain: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    tag_1: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    created_blocktime_stamp: Option<serde_json::Value>,
}

/// Supabase PostgREST client
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    rest_url: String,
    page_size: usize,
    retry: RetryPolicy,
}

impl SupabaseClient {
    /// Build a client from config. Fails when SUPABASE_URL or SUPABASE_KEY is absent.
    pub fn new(config: &ExplorerConfig) -> AppResult<Self> {
        let (url, key) = config.require_supabase()?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        let mut api_key = HeaderValue::from_str(key)
            .map_err(|_| AppError::invalid_config("SUPABASE_KEY", "<hidden>"))?;
        api_key.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key))
            .map_err(|_| AppError::invalid_config("SUPABASE_KEY", "<hidden>"))?;
        bearer.set_sensitive(true);
        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorCode::Unknown, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", url),
            page_size: DIRECTORY_PAGE_SIZE,
            retry: RetryPolicy::default(),
        })
    }

    async fn fetch_page(
        &self,
        table: &str,
        blockchain: Blockchain,
        offset: usize,
    ) -> AppResult<Vec<DirectoryRow>> {
        let url = format!("{}/{}", self.rest_url, table);
        let offset = offset.to_string();
        let limit = self.page_size.to_string();
        let chain_filter = format!("eq.{}", blockchain.id());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("select", "*"),
                ("blockchain", chain_filter.as_str()),
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| transport_error(e, ErrorCode::SupabaseError, table))?;

        let status = response.status();
        if !status.is_success() {
            let code = classify_status(
                status,
                ErrorCode::SupabaseRateLimited,
                ErrorCode::SupabaseError,
                ErrorCode::SupabaseInvalidResponse,
            );
            return Err(AppError::new(
                code,
                format!("Supabase {} returned HTTP {}", table, status),
            ));
        }

        response.json::<Vec<DirectoryRow>>().await.map_err(|e| {
            AppError::with_source(
                ErrorCode::SupabaseInvalidResponse,
                format!("Supabase {} returned an unexpected body", table),
                e,
            )
        })
    }
}

#[async_trait]
impl TokenDirectory for SupabaseClient {
    async fn load(
        &self,
        kind: DirectoryKind,
        blockchain: Blockchain,
    ) -> AppResult<Vec<TokenListing>> {
        let table = kind.table();
        let mut rows = Vec::new();
        let mut offset = 0usize;

        loop {
            let what = format!("supabase:{}", table);
            let page = self
                .retry
                .run(&what, || self.fetch_page(table, blockchain, offset))
                .await?;
            let fetched = page.len();
            debug!("📄 {} page at offset {}: {} rows", table, offset, fetched);
            rows.extend(page);

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        let listings = into_listings(rows, kind);
        info!(
            "📚 Loaded {} {} listings for {}",
            listings.len(),
            kind,
            blockchain
        );
        Ok(listings)
    }
}

/// Rows without a contract address are dropped; missing details get the kind's default
fn into_listings(rows: Vec<DirectoryRow>, kind: DirectoryKind) -> Vec<TokenListing> {
    rows.into_iter()
        .filter_map(|row| {
            let contract_address = row.contract_address?.trim().to_lowercase();
            if contract_address.is_empty() {
                return None;
            }
            Some(TokenListing {
                contract_address,
                blockchain: row.blockchain.unwrap_or_default(),
                tag: row.tag.filter(|t| !t.is_empty()).unwrap_or_default(),
                tag_1: row
                    .tag_1
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| kind.default_detail().to_string()),
                name: row.name,
                created_blocktime_stamp: row.created_blocktime_stamp.and_then(|v| match v {
                    serde_json::Value::Null => None,
                    serde_json::Value::String(s) => Some(s),
                    other => Some(other.to_string()),
                }),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::{routing::get, Json, Router};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn rows(raw: &str) -> Vec<DirectoryRow> {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_missing_detail_defaults_per_kind() {
        let raw = r#"[
            {"contract_address": "0xAAA", "blockchain": "ethereum", "tag": "High_Risk", "tag_1": null},
            {"contract_address": "0xbbb", "blockchain": "ethereum", "tag": "High_Risk", "tag_1": "Phishing"}
        ]"#;

        let suspicious = into_listings(rows(raw), DirectoryKind::Suspicious);
        assert_eq!(suspicious[0].tag_1, "Unknown");
        assert_eq!(suspicious[0].contract_address, "0xaaa");
        assert_eq!(suspicious[1].tag_1, "Phishing");

        let safe = into_listings(rows(raw), DirectoryKind::Safe);
        assert_eq!(safe[0].tag_1, "No Detail");
    }

    #[test]
    fn test_rows_without_contract_are_dropped() {
        let raw = r#"[
            {"contract_address": null, "tag": "Safe"},
            {"contract_address": "  ", "tag": "Safe"},
            {"contract_address": "0xccc", "tag": "Safe", "created_blocktime_stamp": "2023-11-01T00:00:00"}
        ]"#;
        let listings = into_listings(rows(raw), DirectoryKind::Safe);
        assert_eq!(listings.len(), 1);
        assert_eq!(
            listings[0].created_blocktime_stamp.as_deref(),
            Some("2023-11-01T00:00:00")
        );
    }

    #[test]
    fn test_extra_columns_ignored() {
        let raw = r#"[{"id": 42, "contract_address": "0xddd", "tag": "Caution", "tag_1": "Fake_Native", "symbol": "ETH"}]"#;
        let listings = into_listings(rows(raw), DirectoryKind::Suspicious);
        assert_eq!(listings[0].tag, "Caution");
        assert_eq!(listings[0].tag_1, "Fake_Native");
    }

    // ============================================
    // PostgREST paging against a local server
    // ============================================

    struct FakeRest {
        /// Row count per table; every row lives on ethereum
        tables: HashMap<&'static str, usize>,
        fail_with: Option<StatusCode>,
        requests: AtomicUsize,
        offsets: Mutex<Vec<usize>>,
    }

    async fn fake_table(
        State(rest): State<Arc<FakeRest>>,
        Path(table): Path<String>,
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Response {
        rest.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = rest.fail_with {
            return status.into_response();
        }
        let authorized = headers.get("apikey").and_then(|v| v.to_str().ok()) == Some("sb-test-key")
            && headers.get("authorization").and_then(|v| v.to_str().ok())
                == Some("Bearer sb-test-key");
        if !authorized {
            return StatusCode::UNAUTHORIZED.into_response();
        }
        assert_eq!(params.get("select").map(String::as_str), Some("*"));

        let total = if params.get("blockchain").map(String::as_str) == Some("eq.ethereum") {
            rest.tables.get(table.as_str()).copied().unwrap_or(0)
        } else {
            0
        };
        let offset: usize = params["offset"].parse().unwrap();
        let limit: usize = params["limit"].parse().unwrap();
        rest.offsets.lock().unwrap().push(offset);

        let rows: Vec<serde_json::Value> = (offset..total.min(offset + limit))
            .map(|i| {
                let detail = if i % 2 == 0 { None } else { Some("Phishing") };
                serde_json::json!({
                    "contract_address": format!("0x{:040X}", i),
                    "blockchain": "ethereum",
                    "tag": "High_Risk",
                    "tag_1": detail,
                })
            })
            .collect();
        Json(rows).into_response()
    }

    async fn fake_client(
        tables: &[(&'static str, usize)],
        fail_with: Option<StatusCode>,
    ) -> (SupabaseClient, Arc<FakeRest>) {
        let rest = Arc::new(FakeRest {
            tables: tables.iter().copied().collect(),
            fail_with,
            requests: AtomicUsize::new(0),
            offsets: Mutex::new(Vec::new()),
        });
        let router = Router::new()
            .route("/rest/v1/:table", get(fake_table))
            .with_state(rest.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let mut config = ExplorerConfig::default();
        config.supabase.url = Some(format!("http://{}", addr));
        config.supabase.key = Some("sb-test-key".to_string());

        let client = SupabaseClient {
            retry: RetryPolicy::immediate(1),
            ..SupabaseClient::new(&config).unwrap()
        };
        (client, rest)
    }

    #[tokio::test]
    async fn test_pages_until_short_page() {
        let (client, rest) = fake_client(&[("suspicious_tokens_directory", 1003)], None).await;

        let listings = client
            .load(DirectoryKind::Suspicious, Blockchain::Ethereum)
            .await
            .unwrap();

        assert_eq!(listings.len(), 1003);
        assert_eq!(*rest.offsets.lock().unwrap(), vec![0, 1000]);
        assert_eq!(listings[1002].contract_address, format!("0x{:040x}", 1002));
        assert_eq!(listings[0].tag_1, "Unknown");
        assert_eq!(listings[1].tag_1, "Phishing");
    }

    #[tokio::test]
    async fn test_full_last_page_ends_on_empty_page() {
        let (client, rest) = fake_client(&[("safe_tokens", 1000)], None).await;

        let listings = client.load(DirectoryKind::Safe, Blockchain::Ethereum).await.unwrap();

        assert_eq!(listings.len(), 1000);
        assert_eq!(*rest.offsets.lock().unwrap(), vec![0, 1000]);
        assert_eq!(listings[0].tag_1, "No Detail");
    }

    #[tokio::test]
    async fn test_other_chain_and_empty_table() {
        let (client, rest) = fake_client(&[("safe_tokens", 5)], None).await;

        let listings = client.load(DirectoryKind::Safe, Blockchain::Base).await.unwrap();
        assert!(listings.is_empty());

        let listings = client
            .load(DirectoryKind::Suspicious, Blockchain::Ethereum)
            .await
            .unwrap();
        assert!(listings.is_empty());
        assert_eq!(rest.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_http_failures_use_directory_codes() {
        let (client, _) = fake_client(&[], Some(StatusCode::TOO_MANY_REQUESTS)).await;
        let err = client.load(DirectoryKind::Safe, Blockchain::Ethereum).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SupabaseRateLimited);

        let (client, _) = fake_client(&[], Some(StatusCode::SERVICE_UNAVAILABLE)).await;
        let err = client.load(DirectoryKind::Safe, Blockchain::Ethereum).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SupabaseError);

        let (client, _) = fake_client(&[], Some(StatusCode::NOT_FOUND)).await;
        let err = client.load(DirectoryKind::Safe, Blockchain::Ethereum).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SupabaseInvalidResponse);
    }

    #[tokio::test]
    async fn test_retries_transient_directory_failures() {
        let (client, rest) = fake_client(&[], Some(StatusCode::BAD_GATEWAY)).await;
        let client = SupabaseClient {
            retry: RetryPolicy::immediate(3),
            ..client
        };

        let err = client.load(DirectoryKind::Safe, Blockchain::Ethereum).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SupabaseError);
        assert_eq!(rest.requests.load(Ordering::SeqCst), 3);
    }
}
