//! Example data set for "Try Example"
//!
//! An Ethereum address that received six suspicious tokens (Phishing,
//! Fake_Native and Fake_Stablecoin) over four days, plus three transfers
//! of well-known safe tokens. Runs through the regular analyzer.

use chrono::{TimeZone, Utc};

use crate::models::{Blockchain, TokenListing, TokenTransfer, TransferType};

/// The address the example pretends to have searched
pub const EXAMPLE_ADDRESS: &str = "0xdef4a9c1e33b7d0f4a1c8e2b5d6f7a8b9c0d5678";

pub const EXAMPLE_BLOCKCHAIN: Blockchain = Blockchain::Ethereum;

pub struct ExampleData {
    pub transfers: Vec<TokenTransfer>,
    pub suspicious_directory: Vec<TokenListing>,
    pub safe_directory: Vec<TokenListing>,
}

// (contract, symbol, name, tag, detail)
const SUSPICIOUS_TOKENS: [(&str, &str, &str, &str, &str); 6] = [
    (
        "0xc1230000000000000000000000000000000a4567",
        "ETH",
        "Fake USDT Token",
        "High_Risk",
        "Phishing",
    ),
    (
        "0xc7890000000000000000000000000000000b0123",
        "SCAM",
        "Scam ETH Clone",
        "High_Risk",
        "Fake_Native",
    ),
    (
        "0xc4560000000000000000000000000000000c7890",
        "FAKE",
        "Phishing Token",
        "High_Risk",
        "Fake_Stablecoin",
    ),
    (
        "0xc2220000000000000000000000000000000d3333",
        "BUSD",
        "Fake BUSD",
        "High_Risk",
        "Fake_Native",
    ),
    (
        "0xc3330000000000000000000000000000000e4444",
        "MATIC",
        "Phishing MATIC",
        "Phishing",
        "Phishing",
    ),
    (
        "0xc4440000000000000000000000000000000f5555",
        "ARBSCAM",
        "Arbitrum Scam",
        "Fake",
        "Fake_Stablecoin",
    ),
];

// (contract, symbol, name)
const SAFE_TOKENS: [(&str, &str, &str); 3] = [
    ("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "USDC", "USD Coin"),
    ("0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2", "WETH", "Wrapped Ether"),
    ("0x514910771af9ca656af840dff83e8264ecf986ca", "LINK", "ChainLink Token"),
];

// (token index, day, hour, minute, second, counterparty)
const SUSPICIOUS_TRANSFERS: [(usize, u32, u32, u32, u32, &str); 11] = [
    (0, 28, 14, 25, 16, "0x5e1d000000000000000000000000000000001234"),
    (0, 27, 10, 15, 30, "0x5e1d000000000000000000000000000000001234"),
    (0, 26, 8, 45, 22, "0x5e1d000000000000000000000000000000001234"),
    (1, 28, 13, 0, 0, "0x5e1d000000000000000000000000000000005678"),
    (1, 27, 11, 0, 0, "0x5e1d000000000000000000000000000000005678"),
    (2, 28, 12, 0, 0, "0x5e1d00000000000000000000000000000000abcd"),
    (2, 27, 12, 0, 0, "0x5e1d00000000000000000000000000000000abcd"),
    (3, 25, 15, 0, 0, "0x5e1d00000000000000000000000000000000ef01"),
    (4, 28, 11, 0, 0, "0x5e1d00000000000000000000000000000000a2b3"),
    (4, 27, 13, 0, 0, "0x5e1d00000000000000000000000000000000a2b3"),
    (5, 28, 10, 0, 0, "0x5e1d00000000000000000000000000000000c4d5"),
];

// (token index, day, hour, minute, second, counterparty, type)
const SAFE_TRANSFERS: [(usize, u32, u32, u32, u32, &str, TransferType); 3] = [
    (0, 27, 10, 15, 30, "0xabc1000000000000000000000000000000002345", TransferType::TransferOut),
    (1, 26, 8, 45, 22, "0x789000000000000000000000000000000000cdef", TransferType::TransferIn),
    (2, 25, 16, 30, 45, "0x1234000000000000000000000000000000005678", TransferType::TransferOut),
];

fn tx_hash(seed: usize) -> String {
    format!("0x{:064x}", 0xf00d_0000_u64 + seed as u64)
}

/// Build the example transfers and the directory rows they match
pub fn example_data() -> ExampleData {
    let mut transfers = Vec::with_capacity(SUSPICIOUS_TRANSFERS.len() + SAFE_TRANSFERS.len());

    for (i, &(token, day, h, m, s, from)) in SUSPICIOUS_TRANSFERS.iter().enumerate() {
        let (contract, symbol, ..) = SUSPICIOUS_TOKENS[token];
        if let Some(ts) = Utc.with_ymd_and_hms(2023, 11, day, h, m, s).single() {
            transfers.push(TokenTransfer {
                tx_hash: tx_hash(i),
                block_timestamp: ts,
                counterparty: from.to_string(),
                blockchain: EXAMPLE_BLOCKCHAIN,
                contract_address: contract.to_string(),
                symbol: Some(symbol.to_string()),
                target: EXAMPLE_ADDRESS.to_string(),
                transfer_type: TransferType::TransferIn,
            });
        }
    }

    for (i, &(token, day, h, m, s, other, kind)) in SAFE_TRANSFERS.iter().enumerate() {
        let (contract, symbol, _) = SAFE_TOKENS[token];
        if let Some(ts) = Utc.with_ymd_and_hms(2023, 11, day, h, m, s).single() {
            transfers.push(TokenTransfer {
                tx_hash: tx_hash(100 + i),
                block_timestamp: ts,
                counterparty: other.to_string(),
                blockchain: EXAMPLE_BLOCKCHAIN,
                contract_address: contract.to_string(),
                symbol: Some(symbol.to_string()),
                target: EXAMPLE_ADDRESS.to_string(),
                transfer_type: kind,
            });
        }
    }

    let suspicious_directory = SUSPICIOUS_TOKENS
        .iter()
        .map(|&(contract, _, name, tag, detail)| TokenListing {
            contract_address: contract.to_string(),
            blockchain: EXAMPLE_BLOCKCHAIN.id().to_string(),
            tag: tag.to_string(),
            tag_1: detail.to_string(),
            name: Some(name.to_string()),
            created_blocktime_stamp: None,
        })
        .collect();

    let safe_directory = SAFE_TOKENS
        .iter()
        .map(|&(contract, _, name)| TokenListing {
            contract_address: contract.to_string(),
            blockchain: EXAMPLE_BLOCKCHAIN.id().to_string(),
            tag: "Safe".to_string(),
            tag_1: "No Detail".to_string(),
            name: Some(name.to_string()),
            created_blocktime_stamp: None,
        })
        .collect();

    ExampleData {
        transfers,
        suspicious_directory,
        safe_directory,
    }
}
