//! Integration tests for Fraud Explorer
//!
//! The explorer and the REST API run against in-memory transfer sources
//! and token directories; no network access.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::{TimeZone, Utc};
use fraud_explorer::api::{create_router, AppState};
use fraud_explorer::{
    AppError, AppResult, Blockchain, DirectoryKind, ErrorCode, ExplorerConfig, FraudExplorer,
    SearchHistory, ServerConfig, TelemetryCollector, TokenDirectory, TokenListing, TokenTransfer,
    TransferSource, TransferType,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const TARGET: &str = "0x1111111111111111111111111111111111111111";
const QUIET: &str = "0x2222222222222222222222222222222222222222";
const SCAM_TOKEN: &str = "0xaaaa00000000000000000000000000000000aaaa";
const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

// ============================================
// In-memory sources
// ============================================

#[derive(Default)]
struct StaticTransfers {
    by_address: HashMap<String, Vec<TokenTransfer>>,
    calls: AtomicUsize,
}

#[async_trait]
impl TransferSource for StaticTransfers {
    async fn fetch_transfers(
        &self,
        address: &str,
        _blockchain: Blockchain,
        _lookback_days: u32,
        _limit: u32,
    ) -> AppResult<Vec<TokenTransfer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.by_address.get(address).cloned().unwrap_or_default())
    }
}

struct FailingTransfers;

#[async_trait]
impl TransferSource for FailingTransfers {
    async fn fetch_transfers(
        &self,
        _address: &str,
        _blockchain: Blockchain,
        _lookback_days: u32,
        _limit: u32,
    ) -> AppResult<Vec<TokenTransfer>> {
        Err(AppError::query_failed("warehouse unavailable"))
    }
}

struct StaticDirectory {
    fail_safe: bool,
}

#[async_trait]
impl TokenDirectory for StaticDirectory {
    async fn load(
        &self,
        kind: DirectoryKind,
        blockchain: Blockchain,
    ) -> AppResult<Vec<TokenListing>> {
        match kind {
            DirectoryKind::Suspicious => {
                Ok(vec![listing(SCAM_TOKEN, blockchain, "spam", "Phishing")])
            }
            DirectoryKind::Safe if self.fail_safe => {
                Err(AppError::directory_error("HTTP 500 from directory"))
            }
            DirectoryKind::Safe => Ok(vec![listing(USDC, blockchain, "safe", "Stablecoin")]),
        }
    }
}

fn listing(contract: &str, blockchain: Blockchain, tag: &str, detail: &str) -> TokenListing {
    TokenListing {
        contract_address: contract.to_string(),
        blockchain: blockchain.id().to_string(),
        tag: tag.to_string(),
        tag_1: detail.to_string(),
        name: None,
        created_blocktime_stamp: None,
    }
}

fn transfer(n: u32, contract: &str, symbol: &str, transfer_type: TransferType) -> TokenTransfer {
    TokenTransfer {
        tx_hash: format!("0x{:064x}", n),
        block_timestamp: Utc.with_ymd_and_hms(2024, 3, 1 + n % 3, 12, 0, n).unwrap(),
        counterparty: format!("0x{:040x}", 0xbeef + n),
        blockchain: Blockchain::Ethereum,
        contract_address: contract.to_string(),
        symbol: Some(symbol.to_string()),
        target: TARGET.to_string(),
        transfer_type,
    }
}

fn target_transfers() -> Vec<TokenTransfer> {
    vec![
        transfer(1, SCAM_TOKEN, "FREE", TransferType::TransferIn),
        transfer(2, SCAM_TOKEN, "FREE", TransferType::TransferIn),
        transfer(3, USDC, "USDC", TransferType::TransferOut),
        transfer(4, "0xbbbb00000000000000000000000000000000bbbb", "MEME", TransferType::TransferIn),
    ]
}

fn static_source() -> Arc<StaticTransfers> {
    let mut by_address = HashMap::new();
    by_address.insert(TARGET.to_string(), target_transfers());
    Arc::new(StaticTransfers {
        by_address,
        calls: AtomicUsize::new(0),
    })
}

fn explorer_with(source: Arc<dyn TransferSource>, fail_safe: bool) -> FraudExplorer {
    FraudExplorer::new(
        source,
        Arc::new(StaticDirectory { fail_safe }),
        Arc::new(SearchHistory::in_memory()),
        Arc::new(TelemetryCollector::new()),
        &ExplorerConfig::default(),
    )
}

// ============================================
// Explorer
// ============================================

#[tokio::test]
async fn test_assess_counts_suspicious_and_safe() {
    let explorer = explorer_with(static_source(), false);

    let report = explorer.assess(TARGET, Blockchain::Ethereum).await.unwrap();
    let summary = &report.analysis.summary;

    assert_eq!(summary.total_transfers, 4);
    assert_eq!(summary.transfers_in, 3);
    assert_eq!(summary.transfers_out, 1);
    assert_eq!(summary.unique_tokens, 3);
    assert_eq!(summary.suspicious_count, 2);
    assert_eq!(summary.suspicious_tokens, 1);
    assert_eq!(summary.safe_count, 1);
    assert_eq!(summary.suspicious_percent, 50.0);
    assert!(report.has_suspicious_activity());
    assert!(report.warnings.is_empty());
    assert!(!report.example);

    let tags = &report.analysis.suspicious_tags;
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].detail, "Phishing");
    assert_eq!(tags[0].percent, 100.0);
}

#[tokio::test]
async fn test_assess_normalizes_address() {
    let explorer = explorer_with(static_source(), false);

    let report = explorer
        .assess("  0x1111111111111111111111111111111111111111  ", Blockchain::Ethereum)
        .await
        .unwrap();
    assert_eq!(report.address, TARGET);
}

#[tokio::test]
async fn test_assess_rejects_bad_addresses() {
    let explorer = explorer_with(static_source(), false);

    let err = explorer.assess("", Blockchain::Ethereum).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AddressMissing);

    let err = explorer.assess("not-an-address", Blockchain::Ethereum).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::AddressInvalid);

    // Rejected input is never remembered
    assert!(explorer.history().is_empty());
}

#[tokio::test]
async fn test_assess_without_transfers() {
    let explorer = explorer_with(static_source(), false);

    let err = explorer.assess(QUIET, Blockchain::Polygon).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NoTransfers);
    assert_eq!(err.code.http_status(), 404);
    assert!(err.message.contains(QUIET));
    assert!(err.message.contains(" on polygon."));

    // The search itself is still recorded
    let entries = explorer.history().list();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].blockchain, Blockchain::Polygon);
    assert_eq!(explorer.telemetry().stats().failed_assessments, 1);
}

#[tokio::test]
async fn test_transfer_source_error_propagates() {
    let explorer = explorer_with(Arc::new(FailingTransfers), false);

    let err = explorer.assess(TARGET, Blockchain::Ethereum).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::FlipsideQueryFailed);
    assert_eq!(explorer.telemetry().stats().failed_assessments, 1);
}

#[tokio::test]
async fn test_directory_failure_becomes_warning() {
    let explorer = explorer_with(static_source(), true);

    let report = explorer.assess(TARGET, Blockchain::Ethereum).await.unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("safe"));
    assert_eq!(report.analysis.summary.safe_count, 0);
    assert_eq!(report.analysis.summary.suspicious_count, 2);
}

#[tokio::test]
async fn test_transfers_are_cached() {
    let source = static_source();
    let explorer = explorer_with(source.clone(), false);

    explorer.assess(TARGET, Blockchain::Ethereum).await.unwrap();
    explorer.assess(TARGET, Blockchain::Ethereum).await.unwrap();

    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(explorer.history().len(), 2);

    let stats = explorer.cache_stats();
    assert_eq!(stats.transfers.entries, 1);
    assert_eq!(stats.directories.entries, 2);
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let explorer = explorer_with(static_source(), false);
    let addresses = vec![TARGET.to_string(), "bogus".to_string(), QUIET.to_string()];

    let results = explorer
        .assess_batch(&addresses, Blockchain::Ethereum, 50)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert_eq!(results[1].error_code.as_deref(), Some("ADDR_INVALID"));
    assert_eq!(results[2].error_code.as_deref(), Some("ASSESS_NO_TRANSFERS"));
    assert_eq!(results[1].address, "bogus");
}

#[tokio::test]
async fn test_batch_limits() {
    let explorer = explorer_with(static_source(), false);

    let err = explorer.assess_batch(&[], Blockchain::Ethereum, 5).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ApiBadRequest);

    let many: Vec<String> = (0..21).map(|_| TARGET.to_string()).collect();
    let err = explorer.assess_batch(&many, Blockchain::Ethereum, 5).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ApiBadRequest);
}

#[test]
fn test_example_report_is_not_recorded() {
    let explorer = explorer_with(static_source(), false);

    let report = explorer.example().unwrap();
    assert!(report.example);
    assert_eq!(report.analysis.summary.total_transfers, 14);
    assert_eq!(report.analysis.summary.suspicious_count, 11);
    assert!(explorer.history().is_empty());
    assert_eq!(explorer.telemetry().stats().total_assessments, 0);
}

// ============================================
// REST API
// ============================================

fn app(api_keys: Vec<String>) -> axum::Router {
    let explorer = Arc::new(explorer_with(static_source(), false));
    let server = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        api_keys,
    };
    create_router(Arc::new(AppState::new(explorer, &server)))
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_api_health() {
    let (status, body) = send(app(vec![]), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_api_chains() {
    let (status, body) = send(app(vec![]), get("/v1/chains")).await;
    assert_eq!(status, StatusCode::OK);
    let chains = body["data"].as_array().unwrap();
    assert_eq!(chains.len(), Blockchain::ALL.len());
    assert!(chains.iter().any(|c| c["id"] == "ethereum"));
}

#[tokio::test]
async fn test_api_example_paginates() {
    let (status, body) = send(app(vec![]), get("/v1/example?page=2&per_page=5")).await;
    assert_eq!(status, StatusCode::OK);

    let data = &body["data"];
    assert_eq!(data["report"]["example"], true);
    assert_eq!(data["recent_transfers_page"]["page"], 2);
    assert_eq!(data["recent_transfers_page"]["total"], 14);
    assert_eq!(data["recent_transfers_page"]["total_pages"], 3);
    assert_eq!(data["recent_transfers_page"]["items"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_api_analyze() {
    let (status, body) = send(
        app(vec![]),
        post_json("/v1/analyze", serde_json::json!({ "address": TARGET })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["report"]["analysis"]["summary"]["suspicious_count"], 2);
}

#[tokio::test]
async fn test_api_analyze_errors() {
    let (status, body) = send(
        app(vec![]),
        post_json("/v1/analyze", serde_json::json!({ "address": "0x12" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "ADDR_INVALID");

    let (status, body) = send(
        app(vec![]),
        post_json("/v1/analyze", serde_json::json!({ "address": QUIET })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "ASSESS_NO_TRANSFERS");

    let (status, body) = send(
        app(vec![]),
        post_json(
            "/v1/analyze",
            serde_json::json!({ "address": TARGET, "blockchain": "solana" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CFG_UNSUPPORTED_CHAIN");
}

#[tokio::test]
async fn test_api_auth_when_keys_configured() {
    let keys = vec!["secret".to_string()];

    let (status, body) = send(app(keys.clone()), get("/v1/chains")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "API_UNAUTHORIZED");

    // Health stays open
    let (status, _) = send(app(keys.clone()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .uri("/v1/chains")
        .header("x-api-key", "secret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(keys), request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_api_history_roundtrip() {
    let router = app(vec![]);

    let (status, _) = send(
        router.clone(),
        post_json("/v1/analyze", serde_json::json!({ "address": TARGET })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(router.clone(), get("/v1/history")).await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["entries"][0]["address"], TARGET);

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/history")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router.clone(), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cleared"], 1);

    let (_, body) = send(router, get("/v1/history")).await;
    assert_eq!(body["data"]["total"], 0);
}
