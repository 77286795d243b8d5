//! Providers Module - External Data Sources
//!
//! Flipside supplies token transfers, Supabase supplies the curated
//! token directories. Both sit behind traits so the explorer can be
//! driven by in-memory sources in tests.

pub mod flipside;
pub mod retry;
pub mod supabase;

use async_trait::async_trait;

use crate::models::{AppResult, Blockchain, DirectoryKind, TokenListing, TokenTransfer};

pub use flipside::FlipsideClient;
pub use retry::RetryPolicy;
pub use supabase::SupabaseClient;

/// Anything that can list recent token transfers of an address
#[async_trait]
pub trait TransferSource: Send + Sync {
    async fn fetch_transfers(
        &self,
        address: &str,
        blockchain: Blockchain,
        lookback_days: u32,
        limit: u32,
    ) -> AppResult<Vec<TokenTransfer>>;
}

/// Anything that can list the suspicious or safe tokens of a network
#[async_trait]
pub trait TokenDirectory: Send + Sync {
    async fn load(
        &self,
        kind: DirectoryKind,
        blockchain: Blockchain,
    ) -> AppResult<Vec<TokenListing>>;
}
