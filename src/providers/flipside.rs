//! Flipside Query Client - token transfer source
//!
//! Runs SQL against Flipside's indexed chain tables through the v2
//! JSON-RPC API:
//!
//! 1. `createQueryRun`      submit the SQL
//! 2. `getQueryRun`         poll until the run reaches a terminal state
//! 3. `getQueryRunResults`  page through the rows
//!
//! API: https://api-v2.flipsidecrypto.xyz/json-rpc (header `x-api-key`)

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_TYPE, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::retry::{classify_status, transport_error, RetryPolicy};
use super::TransferSource;
use crate::models::{
    AppError, AppResult, Blockchain, ErrorCode, ExplorerConfig, TokenTransfer, TransferType,
};
use crate::utils::constants::{
    QUERY_POLL_INTERVAL_MS, QUERY_RESULTS_PAGE_SIZE, USER_AGENT as USER_AGENT_CONST,
};

// ============================================
// QUERY RUN STATES
// ============================================

pub const QUERY_STATE_SUCCESS: &str = "QUERY_STATE_SUCCESS";
pub const QUERY_STATE_FAILED: &str = "QUERY_STATE_FAILED";
pub const QUERY_STATE_CANCELED: &str = "QUERY_STATE_CANCELED";

/// JSON-RPC envelope
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// The part of a query run we care about
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRun {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRunEnvelope {
    query_run: QueryRun,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResultsPage {
    current_page_number: u32,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResultsPayload {
    #[serde(default)]
    column_names: Vec<String>,
    #[serde(default)]
    rows: Vec<Value>,
    page: Option<ResultsPage>,
}

/// Column names plus rows, as returned by Flipside
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Value>,
}

/// Flipside API client
#[derive(Clone)]
pub struct FlipsideClient {
    client: reqwest::Client,
    rpc_url: String,
    query_timeout: Duration,
    poll_interval: Duration,
    retry: RetryPolicy,
}

impl FlipsideClient {
    /// Build a client from config. Fails when FLIPSIDE_API_KEY is absent.
    pub fn new(config: &ExplorerConfig) -> AppResult<Self> {
        let api_key = config.require_flipside_key()?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        let mut key_value = HeaderValue::from_str(api_key)
            .map_err(|_| AppError::invalid_config("FLIPSIDE_API_KEY", "<hidden>"))?;
        key_value.set_sensitive(true);
        headers.insert("x-api-key", key_value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.http_timeout)
            .gzip(true)
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorCode::Unknown, "Failed to build HTTP client", e)
            })?;

        Ok(Self {
            client,
            rpc_url: format!("{}/json-rpc", config.flipside.base_url),
            query_timeout: config.flipside.query_timeout,
            poll_interval: Duration::from_millis(QUERY_POLL_INTERVAL_MS),
            retry: RetryPolicy::default(),
        })
    }

    /// SQL for the inbound/outbound transfer union of one address
    ///
    /// `address` must already be validated as hex; it is embedded verbatim.
    pub fn build_transfers_sql(
        address: &str,
        blockchain: Blockchain,
        lookback_days: u32,
        limit: u32,
    ) -> String {
        let addr = address.to_lowercase();
        let chain = blockchain.id();
        format!(
            r#"
SELECT * FROM (
    SELECT
        tx_hash,
        block_timestamp,
        from_address AS address,
        '{chain}' AS blockchain,
        contract_address,
        symbol,
        to_address AS target,
        'transfer_in' AS type
    FROM
        {chain}.core.ez_token_transfers
    WHERE
        to_address IN ('{addr}')
        AND from_address NOT IN ('{addr}')
        AND block_timestamp >= CURRENT_DATE - {days}

    UNION

    SELECT
        tx_hash,
        block_timestamp,
        to_address AS address,
        '{chain}' AS blockchain,
        contract_address,
        symbol,
        from_address AS target,
        'transfer_out' AS type
    FROM
        {chain}.core.ez_token_transfers
    WHERE
        from_address IN ('{addr}')
        AND to_address NOT IN ('{addr}')
        AND block_timestamp >= CURRENT_DATE - {days}
) LIMIT {limit}
"#,
            chain = chain,
            addr = addr,
            days = lookback_days,
            limit = limit,
        )
    }

    /// Submit SQL and wait for every result row
    pub async fn run_query(&self, sql: &str) -> AppResult<QueryResult> {
        let created: QueryRunEnvelope = self
            .rpc(
                "createQueryRun",
                json!([{
                    "resultTTLHours": 1,
                    "maxAgeMinutes": 0,
                    "sql": sql,
                    "tags": { "source": "fraud-explorer" },
                    "dataSource": "snowflake-default",
                    "dataProvider": "flipside",
                }]),
            )
            .await?;

        let run_id = created.query_run.id.clone();
        info!("🧾 Flipside query run created: {}", run_id);

        self.wait_for_run(created.query_run).await?;
        self.fetch_all_results(&run_id).await
    }

    async fn wait_for_run(&self, mut run: QueryRun) -> AppResult<()> {
        let deadline = Instant::now() + self.query_timeout;

        loop {
            match run.state.as_str() {
                QUERY_STATE_SUCCESS => return Ok(()),
                QUERY_STATE_FAILED | QUERY_STATE_CANCELED => {
                    return Err(AppError::query_failed(format!(
                        "Query run {} ended in {}: {}",
                        run.id,
                        run.state,
                        run.error_message.as_deref().unwrap_or("no error message")
                    )));
                }
                other => debug!("⏳ Query run {} is {}", run.id, other),
            }

            if Instant::now() >= deadline {
                return Err(AppError::new(
                    ErrorCode::FlipsideTimeout,
                    format!(
                        "Query run {} did not finish within {}s",
                        run.id,
                        self.query_timeout.as_secs()
                    ),
                ));
            }

            tokio::time::sleep(self.poll_interval).await;
            let polled: QueryRunEnvelope = self
                .rpc("getQueryRun", json!([{ "queryRunId": run.id }]))
                .await?;
            run = polled.query_run;
        }
    }

    async fn fetch_all_results(&self, run_id: &str) -> AppResult<QueryResult> {
        let mut result = QueryResult::default();
        let mut page_number = 1u32;

        loop {
            let payload: QueryResultsPayload = self
                .rpc(
                    "getQueryRunResults",
                    json!([{
                        "query": { "queryRunId": run_id },
                        "format": "json",
                        "page": { "number": page_number, "size": QUERY_RESULTS_PAGE_SIZE },
                    }]),
                )
                .await?;

            if result.columns.is_empty() {
                result.columns = payload.column_names;
            }
            let fetched = payload.rows.len();
            result.rows.extend(payload.rows);

            let more = payload
                .page
                .map(|p| p.current_page_number < p.total_pages)
                .unwrap_or(false);
            if !more || fetched == 0 {
                break;
            }
            page_number += 1;
        }

        debug!("📊 Query run {} returned {} rows", run_id, result.rows.len());
        Ok(result)
    }

    /// One JSON-RPC call, retried on transient failures
    async fn rpc<T: DeserializeOwned>(&self, method: &str, params: Value) -> AppResult<T> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        self.retry
            .run(method, || self.execute_rpc::<T>(method, &payload))
            .await
    }

    async fn execute_rpc<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
    ) -> AppResult<T> {
        let response = self
            .client
            .post(&self.rpc_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| transport_error(e, ErrorCode::FlipsideConnectionFailed, method))?;

        let status = response.status();
        if !status.is_success() {
            let code = classify_status(
                status,
                ErrorCode::FlipsideRateLimited,
                ErrorCode::FlipsideConnectionFailed,
                ErrorCode::FlipsideQueryFailed,
            );
            return Err(AppError::new(code, format!("{} returned HTTP {}", method, status)));
        }

        let body: RpcResponse<T> = response.json().await.map_err(|e| {
            AppError::with_source(
                ErrorCode::FlipsideInvalidResponse,
                format!("{} returned an unexpected body", method),
                e,
            )
        })?;
        if let Some(error) = body.error {
            return Err(AppError::query_failed(format!(
                "{} error: {} (code: {})",
                method, error.message, error.code
            )));
        }

        body.result
            .ok_or_else(|| {
                AppError::invalid_query_response(format!("{} returned no result", method))
            })
    }
}

#[async_trait]
impl TransferSource for FlipsideClient {
    async fn fetch_transfers(
        &self,
        address: &str,
        blockchain: Blockchain,
        lookback_days: u32,
        limit: u32,
    ) -> AppResult<Vec<TokenTransfer>> {
        let sql = Self::build_transfers_sql(address, blockchain, lookback_days, limit);
        info!(
            "🔍 Flipside: fetching {}-day transfers for {} on {}",
            lookback_days, address, blockchain
        );
        let result = self.run_query(&sql).await?;
        let transfers = decode_transfers(&result, blockchain);
        info!("📦 Flipside: {} transfers decoded", transfers.len());
        Ok(transfers)
    }
}

// ============================================
// Row decoding
// ============================================

/// Turn raw result rows into transfers, skipping malformed rows
pub fn decode_transfers(result: &QueryResult, blockchain: Blockchain) -> Vec<TokenTransfer> {
    let index: HashMap<String, usize> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_lowercase(), i))
        .collect();

    let mut transfers = Vec::with_capacity(result.rows.len());
    let mut skipped = 0usize;

    for row in &result.rows {
        match decode_row(row, &index, blockchain) {
            Some(transfer) => transfers.push(transfer),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("⚠️ Skipped {} malformed transfer rows", skipped);
    }
    transfers
}

fn decode_row(
    row: &Value,
    index: &HashMap<String, usize>,
    blockchain: Blockchain,
) -> Option<TokenTransfer> {
    let field = |name: &str| -> Option<String> {
        let value = match row {
            Value::Array(cells) => index.get(name).and_then(|&i| cells.get(i)),
            Value::Object(map) => map
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v),
            _ => None,
        }?;
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    };

    let transfer_type = TransferType::parse(&field("type")?)?;
    let block_timestamp = parse_timestamp(&field("block_timestamp")?)?;

    Some(TokenTransfer {
        tx_hash: field("tx_hash")?,
        block_timestamp,
        counterparty: field("address").unwrap_or_default(),
        blockchain,
        contract_address: field("contract_address")?.to_lowercase(),
        symbol: field("symbol").filter(|s| !s.is_empty()),
        target: field("target").unwrap_or_default(),
        transfer_type,
    })
}

/// Accepts RFC 3339 and `YYYY-MM-DD HH:MM:SS[.fff]` (assumed UTC)
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
