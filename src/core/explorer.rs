//! Fraud Explorer - the assessment pipeline
//!
//! address + chain -> validate -> history -> transfers (cached) ->
//! directories (cached, concurrent) -> analysis -> report

use alloy_primitives::Address;
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use super::analyzer::analyze_transfers;
use super::example::{example_data, EXAMPLE_ADDRESS, EXAMPLE_BLOCKCHAIN};
use super::history::SearchHistory;
use super::report::{no_transfers_message, AssessmentReport};
use crate::models::{
    AppError, AppResult, Blockchain, DirectoryKind, ExplorerConfig, TokenListing, TokenTransfer,
};
use crate::providers::{FlipsideClient, SupabaseClient, TokenDirectory, TransferSource};
use crate::utils::cache::{CacheStats, TtlCache};
use crate::utils::constants::{MAX_BATCH_ADDRESSES, MAX_BATCH_CONCURRENCY};
use crate::utils::telemetry::TelemetryCollector;

/// Per-address result of a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub address: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<AssessmentReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cache sizes and hit rates
#[derive(Debug, Clone, Serialize)]
pub struct ExplorerCacheStats {
    pub transfers: CacheStats,
    pub directories: CacheStats,
}

pub struct FraudExplorer {
    transfers: Arc<dyn TransferSource>,
    directory: Arc<dyn TokenDirectory>,
    history: Arc<SearchHistory>,
    telemetry: Arc<TelemetryCollector>,
    transfer_cache: TtlCache<Vec<TokenTransfer>>,
    directory_cache: TtlCache<Vec<TokenListing>>,
    lookback_days: u32,
    transfer_limit: u32,
}

impl FraudExplorer {
    pub fn new(
        transfers: Arc<dyn TransferSource>,
        directory: Arc<dyn TokenDirectory>,
        history: Arc<SearchHistory>,
        telemetry: Arc<TelemetryCollector>,
        config: &ExplorerConfig,
    ) -> Self {
        Self {
            transfers,
            directory,
            history,
            telemetry,
            transfer_cache: TtlCache::new("TRANSFERS", config.transfer_cache_ttl),
            directory_cache: TtlCache::new("DIRECTORY", config.directory_cache_ttl),
            lookback_days: config.lookback_days,
            transfer_limit: config.transfer_limit,
        }
    }

    /// Wire up the live Flipside and Supabase clients
    pub fn from_config(
        config: &ExplorerConfig,
        telemetry: Arc<TelemetryCollector>,
    ) -> AppResult<Self> {
        let flipside = FlipsideClient::new(config)?;
        let supabase = SupabaseClient::new(config)?;
        let history = SearchHistory::open(&config.history_path);

        info!(
            "🔧 Explorer ready: {}-day window, {} transfer limit, history at {}",
            config.lookback_days,
            config.transfer_limit,
            config.history_path.display()
        );

        Ok(Self::new(
            Arc::new(flipside),
            Arc::new(supabase),
            Arc::new(history),
            telemetry,
            config,
        ))
    }

    /// Trimmed, lowercased address, or why it is not one
    pub fn validate_address(address: &str) -> AppResult<String> {
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(AppError::missing_address());
        }
        let lowered = trimmed.to_lowercase();
        if !lowered.starts_with("0x") {
            return Err(AppError::invalid_address(format!(
                "Address must start with 0x: {}",
                trimmed
            )));
        }
        Address::from_str(&lowered).map_err(|_| {
            AppError::invalid_address(format!(
                "Not a 20-byte hex address (0x + 40 hex characters): {}",
                trimmed
            ))
        })?;
        Ok(lowered)
    }

    /// Assess one address on one network
    pub async fn assess(
        &self,
        address: &str,
        blockchain: Blockchain,
    ) -> AppResult<AssessmentReport> {
        let start = Instant::now();
        let normalized = Self::validate_address(address)?;

        self.history.add(address.trim(), blockchain).await;

        let transfers = match self.load_transfers(&normalized, blockchain).await {
            Ok(transfers) => transfers,
            Err(e) => {
                self.telemetry.record_failure();
                return Err(e);
            }
        };

        if transfers.is_empty() {
            info!("📭 No transfers for {} on {}", normalized, blockchain);
            self.telemetry.record_failure();
            return Err(AppError::no_transfers(no_transfers_message(
                &normalized,
                blockchain,
                self.lookback_days,
            )));
        }

        let (suspicious, safe) = tokio::join!(
            self.load_directory(DirectoryKind::Suspicious, blockchain),
            self.load_directory(DirectoryKind::Safe, blockchain),
        );

        let mut warnings = Vec::new();
        let suspicious = degrade(suspicious, DirectoryKind::Suspicious, &mut warnings);
        let safe = degrade(safe, DirectoryKind::Safe, &mut warnings);

        let analysis = analyze_transfers(&transfers, &suspicious, &safe).ok_or_else(|| {
            let message = no_transfers_message(&normalized, blockchain, self.lookback_days);
            AppError::no_transfers(message)
        })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        self.telemetry.record_assessment(&analysis, latency_ms);

        info!(
            "✅ {} on {}: {} transfers, {} suspicious ({:.1}%) in {}ms",
            normalized,
            blockchain,
            analysis.summary.total_transfers,
            analysis.summary.suspicious_count,
            analysis.summary.suspicious_percent,
            latency_ms
        );

        Ok(AssessmentReport {
            address: normalized,
            blockchain,
            generated_at: chrono::Utc::now(),
            lookback_days: self.lookback_days,
            example: false,
            analysis,
            warnings,
        })
    }

    /// Report over the built-in example data. Not recorded in history.
    pub fn example(&self) -> AppResult<AssessmentReport> {
        Self::example_report(self.lookback_days)
    }

    /// Same as `example`, for callers without live sources configured
    pub fn example_report(lookback_days: u32) -> AppResult<AssessmentReport> {
        let data = example_data();
        let analysis = analyze_transfers(
            &data.transfers,
            &data.suspicious_directory,
            &data.safe_directory,
        )
        .ok_or_else(|| AppError::internal("Example data set is empty"))?;

        Ok(AssessmentReport {
            address: EXAMPLE_ADDRESS.to_string(),
            blockchain: EXAMPLE_BLOCKCHAIN,
            generated_at: chrono::Utc::now(),
            lookback_days,
            example: true,
            analysis,
            warnings: Vec::new(),
        })
    }

    /// Assess several addresses with bounded concurrency, preserving order
    pub async fn assess_batch(
        &self,
        addresses: &[String],
        blockchain: Blockchain,
        concurrency: usize,
    ) -> AppResult<Vec<BatchOutcome>> {
        if addresses.is_empty() {
            return Err(AppError::bad_request("At least one address is required"));
        }
        if addresses.len() > MAX_BATCH_ADDRESSES {
            return Err(AppError::bad_request(format!(
                "At most {} addresses per batch, got {}",
                MAX_BATCH_ADDRESSES,
                addresses.len()
            )));
        }

        let concurrency = concurrency.clamp(1, MAX_BATCH_CONCURRENCY);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        info!(
            "📦 Batch of {} addresses on {} (concurrency {})",
            addresses.len(),
            blockchain,
            concurrency
        );

        let tasks = addresses.iter().map(|address| {
            let semaphore = semaphore.clone();
            async move {
                let result = match semaphore.acquire().await {
                    Ok(_permit) => self.assess(address, blockchain).await,
                    Err(_) => Err(AppError::internal("Batch semaphore closed")),
                };
                match result {
                    Ok(report) => BatchOutcome {
                        address: address.clone(),
                        success: true,
                        report: Some(report),
                        error_code: None,
                        error: None,
                    },
                    Err(e) => BatchOutcome {
                        address: address.clone(),
                        success: false,
                        report: None,
                        error_code: Some(e.code_str().to_string()),
                        error: Some(e.message),
                    },
                }
            }
        });

        Ok(join_all(tasks).await)
    }

    pub fn history(&self) -> &SearchHistory {
        &self.history
    }

    pub fn telemetry(&self) -> &Arc<TelemetryCollector> {
        &self.telemetry
    }

    pub fn lookback_days(&self) -> u32 {
        self.lookback_days
    }

    pub fn cache_stats(&self) -> ExplorerCacheStats {
        ExplorerCacheStats {
            transfers: self.transfer_cache.stats(),
            directories: self.directory_cache.stats(),
        }
    }

    /// Sweep expired cache entries, returning how many were dropped
    pub fn cleanup_caches(&self) -> usize {
        self.transfer_cache.cleanup_expired() + self.directory_cache.cleanup_expired()
    }

    async fn load_transfers(
        &self,
        address: &str,
        blockchain: Blockchain,
    ) -> AppResult<Vec<TokenTransfer>> {
        let key = format!("{}:{}", blockchain.id(), address);
        if let Some(cached) = self.transfer_cache.get(&key) {
            return Ok(cached);
        }

        let transfers = self
            .transfers
            .fetch_transfers(address, blockchain, self.lookback_days, self.transfer_limit)
            .await?;
        self.transfer_cache.set(&key, transfers.clone());
        Ok(transfers)
    }

    async fn load_directory(
        &self,
        kind: DirectoryKind,
        blockchain: Blockchain,
    ) -> AppResult<Vec<TokenListing>> {
        let key = format!("{}:{}", kind, blockchain.id());
        if let Some(cached) = self.directory_cache.get(&key) {
            return Ok(cached);
        }

        let listings = self.directory.load(kind, blockchain).await?;
        debug!("📚 {} directory for {}: {} listings", kind, blockchain, listings.len());
        self.directory_cache.set(&key, listings.clone());
        Ok(listings)
    }
}

/// A failed directory load becomes an empty directory plus a warning
fn degrade(
    result: AppResult<Vec<TokenListing>>,
    kind: DirectoryKind,
    warnings: &mut Vec<String>,
) -> Vec<TokenListing> {
    match result {
        Ok(listings) => listings,
        Err(e) => {
            warn!("⚠️ {} token directory unavailable: {}", kind, e);
            warnings.push(format!(
                "Could not load the {} token directory ({}); results exclude it",
                kind,
                e.code_str()
            ));
            Vec::new()
        }
    }
}
