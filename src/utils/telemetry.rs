//! Telemetry Module
//!
//! Anonymous scan statistics: how many addresses were assessed, how much
//! suspicious activity turned up and which fraud types dominate.
//!
//! Privacy-first: no addresses or transaction hashes are stored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::core::analyzer::TransferAnalysis;

/// Aggregated statistics for reporting
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetryStats {
    /// Completed assessments
    pub total_assessments: u64,
    /// Assessments that found at least one suspicious transfer
    pub flagged_assessments: u64,
    /// Assessments that ended without transfers or with an error
    pub failed_assessments: u64,
    pub transfers_scanned: u64,
    pub suspicious_transfers: u64,
    /// Distinct suspicious tokens per fraud type, summed over assessments
    pub fraud_types: HashMap<String, u64>,
    pub avg_latency_ms: f64,
    pub period_start: u64,
    pub period_end: u64,
}

impl TelemetryStats {
    /// Share of assessments with suspicious activity
    pub fn flagged_rate(&self) -> f64 {
        if self.total_assessments == 0 {
            0.0
        } else {
            self.flagged_assessments as f64 / self.total_assessments as f64 * 100.0
        }
    }

    pub fn summary(&self) -> String {
        let period_minutes = self.period_end.saturating_sub(self.period_start) / 60;

        let mut types: Vec<(&String, &u64)> = self.fraud_types.iter().collect();
        types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        let types_line = if types.is_empty() {
            "none".to_string()
        } else {
            types
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            r#"
╔══════════════════════════════════════════════════════════════════╗
║           🔎 FRAUD EXPLORER - SESSION REPORT                     ║
╠══════════════════════════════════════════════════════════════════╣
   📊 Period:                   {} minutes
   🔍 Addresses Assessed:       {:>10}
   🚨 With Suspicious Activity: {:>10} ({:.1}%)
   ❌ Failed / Empty:           {:>10}
   📦 Transfers Scanned:        {:>10}
   ☠️  Suspicious Transfers:     {:>10}
   🏷️  Fraud Types:              {}
   ⚡ Avg Assessment Latency:   {:>10.2}ms
╚══════════════════════════════════════════════════════════════════╝
"#,
            period_minutes,
            self.total_assessments,
            self.flagged_assessments,
            self.flagged_rate(),
            self.failed_assessments,
            self.transfers_scanned,
            self.suspicious_transfers,
            types_line,
            self.avg_latency_ms,
        )
    }

    /// Export as JSON for API
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Main telemetry collector
pub struct TelemetryCollector {
    total_assessments: AtomicU64,
    flagged_assessments: AtomicU64,
    failed_assessments: AtomicU64,
    transfers_scanned: AtomicU64,
    suspicious_transfers: AtomicU64,
    total_latency_ms: AtomicU64,
    fraud_types: RwLock<HashMap<String, u64>>,
    session_start: u64,
}

impl TelemetryCollector {
    pub fn new() -> Self {
        Self {
            total_assessments: AtomicU64::new(0),
            flagged_assessments: AtomicU64::new(0),
            failed_assessments: AtomicU64::new(0),
            transfers_scanned: AtomicU64::new(0),
            suspicious_transfers: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            fraud_types: RwLock::new(HashMap::new()),
            session_start: current_timestamp(),
        }
    }

    /// Record a completed assessment
    pub fn record_assessment(&self, analysis: &TransferAnalysis, latency_ms: u64) {
        self.total_assessments.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
        self.transfers_scanned
            .fetch_add(analysis.summary.total_transfers as u64, Ordering::Relaxed);
        self.suspicious_transfers
            .fetch_add(analysis.summary.suspicious_count as u64, Ordering::Relaxed);

        if analysis.has_suspicious_activity() {
            self.flagged_assessments.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut counts) = self.fraud_types.write() {
            for tag in &analysis.suspicious_tags {
                *counts.entry(tag.detail.clone()).or_insert(0) += tag.count as u64;
            }
        }
    }

    /// Record an assessment that produced no report
    pub fn record_failure(&self) {
        self.failed_assessments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> TelemetryStats {
        let total = self.total_assessments.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        let avg_latency_ms = if total > 0 {
            total_latency as f64 / total as f64
        } else {
            0.0
        };

        TelemetryStats {
            total_assessments: total,
            flagged_assessments: self.flagged_assessments.load(Ordering::Relaxed),
            failed_assessments: self.failed_assessments.load(Ordering::Relaxed),
            transfers_scanned: self.transfers_scanned.load(Ordering::Relaxed),
            suspicious_transfers: self.suspicious_transfers.load(Ordering::Relaxed),
            fraud_types: self
                .fraud_types
                .read()
                .map(|counts| counts.clone())
                .unwrap_or_default(),
            avg_latency_ms,
            period_start: self.session_start,
            period_end: current_timestamp(),
        }
    }
}

impl Default for TelemetryCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
