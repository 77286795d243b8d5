//! Centralized Error Handling Module
//!
//! Every failure carries a unique error code so logs and API clients can
//! tell a missing Flipside key apart from an empty transfer history.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - CFG_xxx: Configuration errors
//! - ADDR_xxx: Address validation errors
//! - FLIPSIDE_xxx: Transfer source errors
//! - SUPABASE_xxx: Token directory errors
//! - API_xxx: API errors
//! - ASSESS_xxx: Assessment outcome errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Configuration Errors
    // ============================================
    /// Missing environment variable
    ConfigMissingEnv,
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Unsupported blockchain
    ConfigUnsupportedChain,
    /// Missing API key
    ConfigMissingApiKey,

    // ============================================
    // Address Errors
    // ============================================
    /// Address was empty
    AddressMissing,
    /// Address is not a 20-byte hex address
    AddressInvalid,

    // ============================================
    // Transfer Source (Flipside) Errors
    // ============================================
    /// Could not reach the query API
    FlipsideConnectionFailed,
    /// Query run ended in a failed/canceled state
    FlipsideQueryFailed,
    /// Query did not finish before the deadline
    FlipsideTimeout,
    /// Query API rate limited (HTTP 429)
    FlipsideRateLimited,
    /// Unexpected payload
    FlipsideInvalidResponse,

    // ============================================
    // Token Directory (Supabase) Errors
    // ============================================
    /// Directory request failed
    SupabaseError,
    /// Directory rate limited (HTTP 429)
    SupabaseRateLimited,
    /// Directory returned rows we could not decode
    SupabaseInvalidResponse,

    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Unauthorized (invalid API key)
    ApiUnauthorized,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Assessment Errors
    // ============================================
    /// Address had no transfers in the lookback window
    NoTransfers,

    // ============================================
    // Generic Errors
    // ============================================
    /// External service timeout
    ExternalTimeout,
    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigMissingEnv => "CFG_MISSING_ENV",
            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigUnsupportedChain => "CFG_UNSUPPORTED_CHAIN",
            Self::ConfigMissingApiKey => "CFG_MISSING_API_KEY",

            Self::AddressMissing => "ADDR_MISSING",
            Self::AddressInvalid => "ADDR_INVALID",

            Self::FlipsideConnectionFailed => "FLIPSIDE_CONNECTION_FAILED",
            Self::FlipsideQueryFailed => "FLIPSIDE_QUERY_FAILED",
            Self::FlipsideTimeout => "FLIPSIDE_TIMEOUT",
            Self::FlipsideRateLimited => "FLIPSIDE_RATE_LIMITED",
            Self::FlipsideInvalidResponse => "FLIPSIDE_INVALID_RESPONSE",

            Self::SupabaseError => "SUPABASE_ERROR",
            Self::SupabaseRateLimited => "SUPABASE_RATE_LIMITED",
            Self::SupabaseInvalidResponse => "SUPABASE_INVALID_RESPONSE",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::NoTransfers => "ASSESS_NO_TRANSFERS",

            Self::ExternalTimeout => "EXTERNAL_TIMEOUT",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest
            | Self::AddressMissing
            | Self::AddressInvalid
            | Self::ConfigUnsupportedChain => 400,
            Self::ApiUnauthorized => 401,
            Self::NoTransfers => 404,
            Self::ApiRateLimited => 429,
            Self::FlipsideConnectionFailed
            | Self::FlipsideQueryFailed
            | Self::FlipsideRateLimited
            | Self::FlipsideInvalidResponse
            | Self::SupabaseError
            | Self::SupabaseRateLimited
            | Self::SupabaseInvalidResponse => 502,
            Self::FlipsideTimeout | Self::ExternalTimeout => 504,
            Self::ConfigMissingApiKey | Self::ConfigMissingEnv => 503,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::FlipsideConnectionFailed
                | Self::FlipsideRateLimited
                | Self::FlipsideTimeout
                | Self::ExternalTimeout
                | Self::SupabaseError
                | Self::SupabaseRateLimited
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Address was empty
    pub fn missing_address() -> Self {
        Self::new(
            ErrorCode::AddressMissing,
            "Please enter an address and select a blockchain.",
        )
    }

    /// Invalid address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::AddressInvalid, msg)
    }

    /// Unsupported blockchain name
    pub fn unsupported_chain(name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigUnsupportedChain,
            format!("Unsupported blockchain: {}", name),
        )
    }

    /// Missing API key
    pub fn missing_api_key(key_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingApiKey,
            format!("Missing API key: {}", key_name),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(key_name: &str, value: &str) -> Self {
        Self::new(
            ErrorCode::ConfigInvalidValue,
            format!("Invalid value for {}: {:?}", key_name, value),
        )
    }

    /// Flipside query failed
    pub fn query_failed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FlipsideQueryFailed, msg)
    }

    /// Flipside returned something unexpected
    pub fn invalid_query_response(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::FlipsideInvalidResponse, msg)
    }

    /// Supabase error
    pub fn directory_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::SupabaseError, msg)
    }

    /// No transfers in the lookback window
    pub fn no_transfers(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::NoTransfers, msg)
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

// Provider-neutral. The Flipside and Supabase clients map their own
// transport failures (see `providers::retry::transport_error`).
impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::with_source(ErrorCode::ExternalTimeout, "Request timeout", err)
        } else {
            Self::with_source(ErrorCode::Unknown, "HTTP request failed", err)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "JSON error", err)
    }
}
