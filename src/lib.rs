//! Fraud Explorer Library
//!
//! Fraud diagnostics for blockchain addresses (EOAs and contracts):
//! - Token transfers of the last days via Flipside SQL
//! - Matching against curated suspicious and safe token directories (Supabase)
//! - Counts, timelines and fraud-type breakdowns for the CLI and REST API

pub mod api;
pub mod core;
pub mod models;
pub mod providers;
pub mod utils;

pub use crate::core::{
    analyze_transfers, AssessmentReport, BatchOutcome, FraudExplorer, SearchHistory,
    TransferAnalysis,
};
pub use models::{
    AppError, AppResult, Blockchain, DirectoryKind, ErrorCode, ExplorerConfig, ServerConfig,
    TokenListing, TokenTransfer, TransferType,
};
pub use providers::{FlipsideClient, SupabaseClient, TokenDirectory, TransferSource};
pub use utils::{TelemetryCollector, TelemetryStats};
