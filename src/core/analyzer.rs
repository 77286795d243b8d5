//! Transfer Analysis
//!
//! Joins the transfers of one address against the suspicious and safe
//! token directories and summarises the result: counts, top tokens,
//! per-day timelines, fraud-type breakdowns and the recent transfer list.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::models::{StatusBadge, TokenListing, TokenTransfer, TransferType};
use crate::utils::constants::{CAUTION_TAG, NO_DETAIL, TOP_TOKENS_LIMIT};

/// Headline numbers for one address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransferSummary {
    pub total_transfers: usize,
    pub transfers_in: usize,
    pub transfers_out: usize,
    pub unique_tokens: usize,
    pub suspicious_count: usize,
    pub suspicious_tokens: usize,
    pub suspicious_senders: usize,
    pub safe_count: usize,
    pub safe_tokens: usize,
    pub safe_senders: usize,
    /// Share of transfers touching a suspicious token
    pub suspicious_percent: f64,
    /// Share of distinct tokens that are suspicious
    pub suspicious_tokens_percent: f64,
}

/// Most transferred tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenCount {
    pub contract_address: String,
    pub symbol: Option<String>,
    pub transfers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityPoint {
    pub date: NaiveDate,
    pub all_transfers: usize,
    pub suspicious_transfers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokensPoint {
    pub date: NaiveDate,
    pub all_tokens: usize,
    pub suspicious_tokens: usize,
}

/// One row of the recent transfers table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentTransfer {
    pub tx_hash: String,
    #[serde(rename = "type")]
    pub transfer_type: TransferType,
    pub contract_address: String,
    pub symbol: String,
    pub counterparty: String,
    /// `%Y-%m-%d %H:%M:%S`, UTC
    pub time: String,
    pub suspicious: bool,
    pub safe: bool,
    pub tag: String,
    pub tag_1: String,
    pub status: StatusBadge,
}

/// Distinct tokens per fraud type (or safe detail)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagBreakdown {
    pub detail: String,
    pub count: usize,
    pub percent: f64,
}

/// A transfer together with the directory listing it matched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedTransfer {
    #[serde(flatten)]
    pub transfer: TokenTransfer,
    pub tag: String,
    pub tag_1: String,
    pub name: Option<String>,
    /// Listing creation time, or the transfer time when the listing has none
    pub created: String,
}

/// Everything derived from one address's transfers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferAnalysis {
    pub summary: TransferSummary,
    pub top_tokens: Vec<TokenCount>,
    pub activity_timeline: Vec<ActivityPoint>,
    pub tokens_timeline: Vec<TokensPoint>,
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub recent_transfers: Vec<RecentTransfer>,
    pub suspicious_tags: Vec<TagBreakdown>,
    pub safe_tags: Vec<TagBreakdown>,
    pub suspicious_transfers: Vec<MatchedTransfer>,
    pub safe_transfers: Vec<MatchedTransfer>,
}

impl TransferAnalysis {
    pub fn has_suspicious_activity(&self) -> bool {
        self.summary.suspicious_count > 0
    }
}

/// Analyse a transfer set. Returns `None` when there is nothing to analyse.
pub fn analyze_transfers(
    transfers: &[TokenTransfer],
    suspicious_directory: &[TokenListing],
    safe_directory: &[TokenListing],
) -> Option<TransferAnalysis> {
    let first_activity = transfers.iter().map(|t| t.block_timestamp).min()?;
    let last_activity = transfers.iter().map(|t| t.block_timestamp).max()?;

    let suspicious_index = index_directory(suspicious_directory);
    let safe_index = index_directory(safe_directory);

    let suspicious_transfers = match_transfers(transfers, &suspicious_index);
    let safe_transfers = match_transfers(transfers, &safe_index);

    let summary = summarize(transfers, &suspicious_transfers, &safe_transfers);
    let (activity_timeline, tokens_timeline) = build_timelines(transfers, &suspicious_transfers);

    Some(TransferAnalysis {
        top_tokens: top_tokens(transfers),
        recent_transfers: recent_transfers(transfers, &suspicious_index, &safe_index),
        suspicious_tags: tag_breakdown(&suspicious_transfers),
        safe_tags: tag_breakdown(&safe_transfers),
        summary,
        activity_timeline,
        tokens_timeline,
        first_activity,
        last_activity,
        suspicious_transfers,
        safe_transfers,
    })
}

/// Lowercase contract -> listing. Duplicate rows collapse onto the first one.
fn index_directory(directory: &[TokenListing]) -> HashMap<String, &TokenListing> {
    let mut index = HashMap::with_capacity(directory.len());
    for listing in directory {
        index
            .entry(listing.contract_address.to_lowercase())
            .or_insert(listing);
    }
    index
}

fn match_transfers(
    transfers: &[TokenTransfer],
    index: &HashMap<String, &TokenListing>,
) -> Vec<MatchedTransfer> {
    transfers
        .iter()
        .filter_map(|transfer| {
            let listing = index.get(&transfer.contract_address.to_lowercase())?;
            Some(MatchedTransfer {
                transfer: transfer.clone(),
                tag: listing.tag.clone(),
                tag_1: listing.tag_1.clone(),
                name: listing.name.clone(),
                created: listing
                    .created_blocktime_stamp
                    .clone()
                    .unwrap_or_else(|| format_time(&transfer.block_timestamp)),
            })
        })
        .collect()
}

fn summarize(
    transfers: &[TokenTransfer],
    suspicious: &[MatchedTransfer],
    safe: &[MatchedTransfer],
) -> TransferSummary {
    let total_transfers = transfers.len();
    let transfers_in = transfers
        .iter()
        .filter(|t| t.transfer_type == TransferType::TransferIn)
        .count();
    let unique_tokens = distinct(transfers.iter().map(|t| t.contract_address.to_lowercase()));

    let suspicious_tokens = distinct(
        suspicious
            .iter()
            .map(|m| m.transfer.contract_address.to_lowercase()),
    );
    let safe_tokens = distinct(safe.iter().map(|m| m.transfer.contract_address.to_lowercase()));

    TransferSummary {
        total_transfers,
        transfers_in,
        transfers_out: total_transfers - transfers_in,
        unique_tokens,
        suspicious_count: suspicious.len(),
        suspicious_tokens,
        suspicious_senders: distinct(suspicious.iter().map(|m| m.transfer.counterparty.clone())),
        safe_count: safe.len(),
        safe_tokens,
        safe_senders: distinct(safe.iter().map(|m| m.transfer.counterparty.clone())),
        suspicious_percent: percent(suspicious.len(), total_transfers),
        suspicious_tokens_percent: percent(suspicious_tokens, unique_tokens),
    }
}

fn top_tokens(transfers: &[TokenTransfer]) -> Vec<TokenCount> {
    let mut counts: HashMap<String, TokenCount> = HashMap::new();
    for transfer in transfers {
        let entry = counts
            .entry(transfer.contract_address.to_lowercase())
            .or_insert_with(|| TokenCount {
                contract_address: transfer.contract_address.to_lowercase(),
                symbol: None,
                transfers: 0,
            });
        entry.transfers += 1;
        if entry.symbol.is_none() {
            entry.symbol = transfer.symbol.clone();
        }
    }

    let mut tokens: Vec<TokenCount> = counts.into_values().collect();
    tokens.sort_by(|a, b| {
        b.transfers
            .cmp(&a.transfers)
            .then_with(|| a.contract_address.cmp(&b.contract_address))
    });
    tokens.truncate(TOP_TOKENS_LIMIT);
    tokens
}

fn build_timelines(
    transfers: &[TokenTransfer],
    suspicious: &[MatchedTransfer],
) -> (Vec<ActivityPoint>, Vec<TokensPoint>) {
    #[derive(Default)]
    struct Day {
        all: usize,
        suspicious: usize,
        tokens: BTreeSet<String>,
        suspicious_tokens: BTreeSet<String>,
    }

    let mut days: BTreeMap<NaiveDate, Day> = BTreeMap::new();
    for transfer in transfers {
        let day = days.entry(transfer.block_timestamp.date_naive()).or_default();
        day.all += 1;
        day.tokens.insert(transfer.contract_address.to_lowercase());
    }
    for matched in suspicious {
        let day = days
            .entry(matched.transfer.block_timestamp.date_naive())
            .or_default();
        day.suspicious += 1;
        day.suspicious_tokens
            .insert(matched.transfer.contract_address.to_lowercase());
    }

    days.into_iter()
        .map(|(date, day)| {
            (
                ActivityPoint {
                    date,
                    all_transfers: day.all,
                    suspicious_transfers: day.suspicious,
                },
                TokensPoint {
                    date,
                    all_tokens: day.tokens.len(),
                    suspicious_tokens: day.suspicious_tokens.len(),
                },
            )
        })
        .unzip()
}

fn recent_transfers(
    transfers: &[TokenTransfer],
    suspicious_index: &HashMap<String, &TokenListing>,
    safe_index: &HashMap<String, &TokenListing>,
) -> Vec<RecentTransfer> {
    let mut ordered: Vec<&TokenTransfer> = transfers.iter().collect();
    ordered.sort_by(|a, b| b.block_timestamp.cmp(&a.block_timestamp));

    ordered
        .into_iter()
        .map(|transfer| {
            let contract = transfer.contract_address.to_lowercase();
            // suspicious wins over safe
            let suspicious = suspicious_index.get(&contract);
            let safe = if suspicious.is_some() {
                None
            } else {
                safe_index.get(&contract)
            };
            let listing = suspicious.or(safe);

            let tag = listing
                .map(|l| l.tag.clone())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| CAUTION_TAG.to_string());
            let tag_1 = listing
                .map(|l| l.tag_1.clone())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| NO_DETAIL.to_string());
            let counterparty = if transfer.counterparty.is_empty() {
                "Unknown".to_string()
            } else {
                transfer.counterparty.clone()
            };

            RecentTransfer {
                tx_hash: transfer.tx_hash.clone(),
                transfer_type: transfer.transfer_type,
                contract_address: transfer.contract_address.clone(),
                symbol: transfer
                    .symbol
                    .clone()
                    .unwrap_or_else(|| "Unknown".to_string()),
                counterparty,
                time: format_time(&transfer.block_timestamp),
                suspicious: suspicious.is_some(),
                safe: safe.is_some(),
                status: StatusBadge::classify(Some(tag.as_str()), safe.is_some()),
                tag,
                tag_1,
            }
        })
        .collect()
}

/// Distinct contracts per detail, percent of all distinct matched contracts
fn tag_breakdown(matched: &[MatchedTransfer]) -> Vec<TagBreakdown> {
    let mut by_detail: BTreeMap<&str, HashSet<String>> = BTreeMap::new();
    for m in matched {
        by_detail
            .entry(m.tag_1.as_str())
            .or_default()
            .insert(m.transfer.contract_address.to_lowercase());
    }

    let total = distinct(matched.iter().map(|m| m.transfer.contract_address.to_lowercase()));

    by_detail
        .into_iter()
        .map(|(detail, contracts)| TagBreakdown {
            detail: detail.to_string(),
            count: contracts.len(),
            percent: round1(percent(contracts.len(), total)),
        })
        .collect()
}

fn distinct<I: Iterator<Item = String>>(values: I) -> usize {
    values.collect::<HashSet<_>>().len()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub(crate) fn format_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}
