//! API Request/Response Types

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::core::analyzer::{MatchedTransfer, RecentTransfer};
use crate::core::explorer::{BatchOutcome, ExplorerCacheStats};
use crate::core::report::{AssessmentReport, Page};
use crate::models::{AppError, SearchEntry};
use crate::utils::constants::DEFAULT_PAGE_SIZE;
use crate::utils::telemetry::TelemetryStats;

/// API Response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Error half of every handler result
pub type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

/// API Error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self {
            code: "API_UNAUTHORIZED".to_string(),
            message: "Invalid or missing API key".to_string(),
            details: None,
        }
    }

    pub fn rate_limited(retry_after: u64) -> Self {
        Self {
            code: "API_RATE_LIMITED".to_string(),
            message: format!("Rate limit exceeded. Retry after {} seconds", retry_after),
            details: Some(format!("retry_after: {}", retry_after)),
        }
    }
}

impl From<&AppError> for ApiError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code_str().to_string(),
            message: err.message.clone(),
            details: None,
        }
    }
}

// ============================================
// Analysis
// ============================================

fn default_blockchain() -> String {
    "ethereum".to_string()
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub address: String,
    #[serde(default = "default_blockchain")]
    pub blockchain: String,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub per_page: Option<usize>,
}

/// Query string for paginated GET endpoints
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl PageQuery {
    pub fn resolve(page: Option<usize>, per_page: Option<usize>) -> (usize, usize) {
        (
            page.unwrap_or(1).max(1),
            per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalyzeData {
    pub report: AssessmentReport,
    /// The requested page of `report.analysis.recent_transfers`
    pub recent_transfers_page: Page<RecentTransfer>,
    /// The requested page of `report.analysis.suspicious_transfers`
    pub suspicious_transfers_page: Page<MatchedTransfer>,
}

// ============================================
// Batch Analysis
// ============================================

fn default_concurrency() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct BatchAnalyzeRequest {
    pub addresses: Vec<String>,
    #[serde(default = "default_blockchain")]
    pub blockchain: String,
    /// Max concurrent assessments (default: 5, max: 10)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchAnalyzeData {
    pub total_requested: usize,
    pub total_succeeded: usize,
    pub total_flagged: usize,
    pub results: Vec<BatchOutcome>,
    pub processing_time_ms: f64,
}

// ============================================
// Chains / History / Stats / Health
// ============================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ChainInfo {
    pub id: String,
    pub label: String,
    pub chain_id: u64,
    pub explorer_url: String,
    pub native_symbol: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryData {
    pub total: usize,
    pub entries: Vec<SearchEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearHistoryData {
    pub cleared: usize,
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct StatsData {
    pub telemetry: TelemetryStats,
    pub caches: ExplorerCacheStats,
    pub uptime_seconds: u64,
    pub api_version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}
