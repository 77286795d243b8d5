//! Constants Module - Single Source of Truth
//!
//! Defaults, table names and per-network metadata used across the
//! explorer. Other modules import from here instead of hardcoding values.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound HTTP requests
pub const USER_AGENT: &str = concat!("FraudExplorer/", env!("CARGO_PKG_VERSION"));

// ============================================
// ASSESSMENT DEFAULTS
// ============================================

/// Transfers older than this many days are ignored
pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;

/// Maximum transfers pulled per assessment
pub const DEFAULT_TRANSFER_LIMIT: u32 = 100;

/// Rows shown per page in transfer and token tables
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Number of entries in the top-tokens list
pub const TOP_TOKENS_LIMIT: usize = 5;

/// Search history cap
pub const MAX_HISTORY_ENTRIES: usize = 100;

/// Maximum addresses in one batch request
pub const MAX_BATCH_ADDRESSES: usize = 20;

/// Upper bound on batch workers
pub const MAX_BATCH_CONCURRENCY: usize = 10;

// ============================================
// CACHE TTLs
// ============================================

/// Transfer lookups are reused for 30 minutes
pub const TRANSFER_CACHE_TTL_SECS: u64 = 30 * 60;

/// Token directories are reused for one hour
pub const DIRECTORY_CACHE_TTL_SECS: u64 = 60 * 60;

// ============================================
// FLIPSIDE
// ============================================

/// Default Flipside API endpoint
pub const DEFAULT_FLIPSIDE_BASE_URL: &str = "https://api-v2.flipsidecrypto.xyz";

/// Default time to wait for a query run to finish
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 120;

/// Delay between `getQueryRun` polls
pub const QUERY_POLL_INTERVAL_MS: u64 = 1_000;

/// Rows fetched per `getQueryRunResults` page
pub const QUERY_RESULTS_PAGE_SIZE: u32 = 1_000;

/// Timeout for a single HTTP request
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================
// SUPABASE DIRECTORIES
// ============================================

/// Table listing known suspicious token contracts
pub const SUSPICIOUS_TOKENS_TABLE: &str = "suspicious_tokens_directory";

/// Table listing known safe token contracts
pub const SAFE_TOKENS_TABLE: &str = "safe_tokens";

/// Rows fetched per directory page
pub const DIRECTORY_PAGE_SIZE: usize = 1_000;

/// Detail used when a suspicious listing has no `tag_1`
pub const SUSPICIOUS_DEFAULT_DETAIL: &str = "Unknown";

/// Detail used when a safe listing or an unmatched transfer has no `tag_1`
pub const NO_DETAIL: &str = "No Detail";

/// Status used for transfers without a directory match
pub const CAUTION_TAG: &str = "Caution";

/// Detail values rendered as confirmed fraud types
pub const KNOWN_FRAUD_TYPES: [&str; 3] = ["Phishing", "Fake_Native", "Fake_Stablecoin"];

// ============================================
// CHAIN IDS
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// Polygon
pub const CHAIN_ID_POLYGON: u64 = 137;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Optimism
pub const CHAIN_ID_OPTIMISM: u64 = 10;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;
/// Avalanche C-Chain
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
/// Blast
pub const CHAIN_ID_BLAST: u64 = 81457;

// ============================================
// CHAIN METADATA
// ============================================

/// Get block explorer URL
pub fn get_explorer_url(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "https://etherscan.io",
        CHAIN_ID_BSC => "https://bscscan.com",
        CHAIN_ID_POLYGON => "https://polygonscan.com",
        CHAIN_ID_ARBITRUM => "https://arbiscan.io",
        CHAIN_ID_OPTIMISM => "https://optimistic.etherscan.io",
        CHAIN_ID_BASE => "https://basescan.org",
        CHAIN_ID_AVALANCHE => "https://snowtrace.io",
        CHAIN_ID_BLAST => "https://blastscan.io",
        _ => "https://etherscan.io",
    }
}

/// Get native token symbol
pub fn get_native_symbol(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_BSC => "BNB",
        CHAIN_ID_POLYGON => "MATIC",
        CHAIN_ID_AVALANCHE => "AVAX",
        _ => "ETH",
    }
}

/// Is this detail one of the confirmed fraud types?
#[inline]
pub fn is_known_fraud_type(detail: &str) -> bool {
    KNOWN_FRAUD_TYPES.contains(&detail)
}
