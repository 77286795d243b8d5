//! Type definitions for Fraud Explorer
//! Core data structures shared by providers, the analyzer and the API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::errors::AppError;
use crate::utils::constants::{
    CAUTION_TAG, CHAIN_ID_ARBITRUM, CHAIN_ID_AVALANCHE, CHAIN_ID_BASE, CHAIN_ID_BLAST,
    CHAIN_ID_BSC, CHAIN_ID_ETHEREUM, CHAIN_ID_OPTIMISM, CHAIN_ID_POLYGON, NO_DETAIL,
    SAFE_TOKENS_TABLE, SUSPICIOUS_DEFAULT_DETAIL, SUSPICIOUS_TOKENS_TABLE,
};

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Blockchain {
    Ethereum,
    Bsc,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Avalanche,
    Blast,
}

impl Blockchain {
    /// Every supported network, in menu order
    pub const ALL: [Blockchain; 8] = [
        Blockchain::Ethereum,
        Blockchain::Bsc,
        Blockchain::Polygon,
        Blockchain::Arbitrum,
        Blockchain::Optimism,
        Blockchain::Base,
        Blockchain::Avalanche,
        Blockchain::Blast,
    ];

    /// Lowercase id. Doubles as the Flipside schema and the directory key.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Ethereum => "ethereum",
            Self::Bsc => "bsc",
            Self::Polygon => "polygon",
            Self::Arbitrum => "arbitrum",
            Self::Optimism => "optimism",
            Self::Base => "base",
            Self::Avalanche => "avalanche",
            Self::Blast => "blast",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ethereum => "Ethereum (ETH)",
            Self::Bsc => "BNB Chain",
            Self::Polygon => "Polygon (MATIC)",
            Self::Arbitrum => "Arbitrum (ARBI)",
            Self::Optimism => "Optimism (OP)",
            Self::Base => "Base (BASE)",
            Self::Avalanche => "Avalanche (AVAX)",
            Self::Blast => "Blast (BLAST)",
        }
    }

    /// Numeric EVM chain id
    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Ethereum => CHAIN_ID_ETHEREUM,
            Self::Bsc => CHAIN_ID_BSC,
            Self::Polygon => CHAIN_ID_POLYGON,
            Self::Arbitrum => CHAIN_ID_ARBITRUM,
            Self::Optimism => CHAIN_ID_OPTIMISM,
            Self::Base => CHAIN_ID_BASE,
            Self::Avalanche => CHAIN_ID_AVALANCHE,
            Self::Blast => CHAIN_ID_BLAST,
        }
    }
}

impl fmt::Display for Blockchain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Blockchain {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|chain| chain.id() == wanted)
            .ok_or_else(|| AppError::unsupported_chain(s))
    }
}

/// Direction of a transfer relative to the searched address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferType {
    TransferIn,
    TransferOut,
}

impl TransferType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TransferIn => "transfer_in",
            Self::TransferOut => "transfer_out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "transfer_in" => Some(Self::TransferIn),
            "transfer_out" => Some(Self::TransferOut),
            _ => None,
        }
    }
}

/// One token transfer touching the searched address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTransfer {
    pub tx_hash: String,
    pub block_timestamp: DateTime<Utc>,
    /// Sender for inbound transfers, recipient for outbound ones
    pub counterparty: String,
    pub blockchain: Blockchain,
    pub contract_address: String,
    pub symbol: Option<String>,
    /// The searched address
    pub target: String,
    pub transfer_type: TransferType,
}

/// Which curated directory a listing comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    Suspicious,
    Safe,
}

impl DirectoryKind {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Suspicious => SUSPICIOUS_TOKENS_TABLE,
            Self::Safe => SAFE_TOKENS_TABLE,
        }
    }

    /// Detail used when a listing has no `tag_1`
    pub fn default_detail(&self) -> &'static str {
        match self {
            Self::Suspicious => SUSPICIOUS_DEFAULT_DETAIL,
            Self::Safe => NO_DETAIL,
        }
    }
}

impl fmt::Display for DirectoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suspicious => f.write_str("suspicious"),
            Self::Safe => f.write_str("safe"),
        }
    }
}

/// A row from a token directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenListing {
    pub contract_address: String,
    pub blockchain: String,
    pub tag: String,
    /// Fraud type / detail
    pub tag_1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_blocktime_stamp: Option<String>,
}

/// Badge shown next to a transfer or token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBadge {
    Flagged,
    Safe,
    Caution,
}

impl StatusBadge {
    /// Safe matches win, then any tag other than "Caution" is flagged
    pub fn classify(tag: Option<&str>, safe: bool) -> Self {
        if safe {
            return Self::Safe;
        }
        match tag {
            Some(t) if !t.is_empty() && t != CAUTION_TAG => Self::Flagged,
            _ => Self::Caution,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Flagged => "🔴",
            Self::Safe => "🟢",
            Self::Caution => "🟡",
        }
    }
}

/// One remembered search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    /// ISO-8601 local timestamp
    pub timestamp: String,
    pub address: String,
    pub blockchain: Blockchain,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blockchain_parse_case_insensitive() {
        assert_eq!("Ethereum".parse::<Blockchain>().unwrap(), Blockchain::Ethereum);
        assert_eq!(" BSC ".parse::<Blockchain>().unwrap(), Blockchain::Bsc);
        assert!("solana".parse::<Blockchain>().is_err());
    }

    #[test]
    fn test_blockchain_serde_uses_id() {
        let json = serde_json::to_string(&Blockchain::Avalanche).unwrap();
        assert_eq!(json, "\"avalanche\"");
        let back: Blockchain = serde_json::from_str("\"blast\"").unwrap();
        assert_eq!(back, Blockchain::Blast);
    }

    #[test]
    fn test_transfer_type_round_trip_names() {
        assert_eq!(TransferType::parse("transfer_in"), Some(TransferType::TransferIn));
        assert_eq!(TransferType::TransferOut.as_str(), "transfer_out");
        assert_eq!(TransferType::parse("mint"), None);
    }

    #[test]
    fn test_status_badge_classification() {
        assert_eq!(StatusBadge::classify(Some("High_Risk"), false), StatusBadge::Flagged);
        assert_eq!(StatusBadge::classify(Some("Safe"), true), StatusBadge::Safe);
        assert_eq!(StatusBadge::classify(Some("Caution"), false), StatusBadge::Caution);
        assert_eq!(StatusBadge::classify(None, false), StatusBadge::Caution);
    }

    #[test]
    fn test_directory_defaults() {
        assert_eq!(DirectoryKind::Suspicious.default_detail(), "Unknown");
        assert_eq!(DirectoryKind::Safe.default_detail(), "No Detail");
        assert_eq!(DirectoryKind::Safe.table(), "safe_tokens");
    }
}
