//! API Request Handlers

use axum::{
    extract::{Json, Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::types::*;
use crate::core::explorer::FraudExplorer;
use crate::core::report::{paginate, AssessmentReport};
use crate::models::{AppError, Blockchain, ServerConfig};
use crate::utils::constants::{get_explorer_url, get_native_symbol, APP_VERSION};

/// Shared application state
pub struct AppState {
    pub explorer: Arc<FraudExplorer>,
    /// Accepted `X-API-Key` values; empty leaves the API open
    pub api_keys: Vec<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(explorer: Arc<FraudExplorer>, server: &ServerConfig) -> Self {
        Self {
            explorer,
            api_keys: server.api_keys.clone(),
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Map an application error onto its HTTP status and the error envelope
pub fn failure(err: &AppError, start: Instant) -> ApiFailure {
    let status = StatusCode::from_u16(err.code.http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!("❌ {}", err);
    }
    (
        status,
        Json(ApiResponse::error(ApiError::from(err), elapsed_ms(start))),
    )
}

fn parse_chain(raw: &str, start: Instant) -> Result<Blockchain, ApiFailure> {
    raw.parse::<Blockchain>().map_err(|e| failure(&e, start))
}

fn paged(report: AssessmentReport, page: Option<usize>, per_page: Option<usize>) -> AnalyzeData {
    let (page, per_page) = PageQuery::resolve(page, per_page);
    AnalyzeData {
        recent_transfers_page: paginate(&report.analysis.recent_transfers, page, per_page),
        suspicious_transfers_page: paginate(&report.analysis.suspicious_transfers, page, per_page),
        report,
    }
}

// ============================================
// Health Check
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}

// ============================================
// Chains
// ============================================

pub async fn list_chains() -> Json<ApiResponse<Vec<ChainInfo>>> {
    let start = Instant::now();

    let chains = Blockchain::ALL
        .iter()
        .map(|chain| ChainInfo {
            id: chain.id().to_string(),
            label: chain.label().to_string(),
            chain_id: chain.chain_id(),
            explorer_url: get_explorer_url(chain.chain_id()).to_string(),
            native_symbol: get_native_symbol(chain.chain_id()).to_string(),
        })
        .collect();

    Json(ApiResponse::success(chains, elapsed_ms(start)))
}

// ============================================
// Address Analysis
// ============================================

pub async fn analyze_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalyzeData>>, ApiFailure> {
    let start = Instant::now();
    let blockchain = parse_chain(&req.blockchain, start)?;

    let report = state
        .explorer
        .assess(&req.address, blockchain)
        .await
        .map_err(|e| failure(&e, start))?;

    Ok(Json(ApiResponse::success(
        paged(report, req.page, req.per_page),
        elapsed_ms(start),
    )))
}

pub async fn example_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ApiResponse<AnalyzeData>>, ApiFailure> {
    let start = Instant::now();
    let report = state.explorer.example().map_err(|e| failure(&e, start))?;

    Ok(Json(ApiResponse::success(
        paged(report, query.page, query.per_page),
        elapsed_ms(start),
    )))
}

// ============================================
// Batch Analysis
// ============================================

pub async fn batch_analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchAnalyzeRequest>,
) -> Result<Json<ApiResponse<BatchAnalyzeData>>, ApiFailure> {
    let start = Instant::now();
    let blockchain = parse_chain(&req.blockchain, start)?;

    let results = state
        .explorer
        .assess_batch(&req.addresses, blockchain, req.concurrency)
        .await
        .map_err(|e| failure(&e, start))?;

    let total_succeeded = results.iter().filter(|r| r.success).count();
    let total_flagged = results
        .iter()
        .filter(|r| r.report.as_ref().map(|rep| rep.has_suspicious_activity()).unwrap_or(false))
        .count();

    info!(
        "📦 Batch done: {}/{} succeeded, {} flagged",
        total_succeeded,
        results.len(),
        total_flagged
    );

    let data = BatchAnalyzeData {
        total_requested: req.addresses.len(),
        total_succeeded,
        total_flagged,
        results,
        processing_time_ms: elapsed_ms(start),
    };

    Ok(Json(ApiResponse::success(data, elapsed_ms(start))))
}

// ============================================
// Search History
// ============================================

pub async fn get_history(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HistoryData>> {
    let start = Instant::now();
    let entries = state.explorer.history().list();

    Json(ApiResponse::success(
        HistoryData {
            total: entries.len(),
            entries,
        },
        elapsed_ms(start),
    ))
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<ClearHistoryData>> {
    let start = Instant::now();
    let history = state.explorer.history();
    let cleared = history.len();
    let persisted = history.clear().await;
    info!("🗑️ Search history cleared ({} entries)", cleared);

    Json(ApiResponse::success(
        ClearHistoryData { cleared, persisted },
        elapsed_ms(start),
    ))
}

// ============================================
// Stats
// ============================================

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();
    let caches = state.explorer.cache_stats();

    info!(
        "📊 Cache Stats: transfers {} entries ({:.1}% hit), directories {} entries ({:.1}% hit)",
        caches.transfers.entries,
        caches.transfers.hit_rate,
        caches.directories.entries,
        caches.directories.hit_rate
    );

    let data = StatsData {
        telemetry: state.explorer.telemetry().stats(),
        caches,
        uptime_seconds: state.uptime_seconds(),
        api_version: APP_VERSION.to_string(),
    };

    Json(ApiResponse::success(data, elapsed_ms(start)))
}
