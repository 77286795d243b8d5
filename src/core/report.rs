//! Assessment Report & Terminal Rendering
//!
//! Wraps a `TransferAnalysis` with the request context and renders it for
//! the CLI. The API serialises the same struct as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use super::analyzer::TransferAnalysis;
use crate::models::Blockchain;
use crate::utils::constants::{get_explorer_url, is_known_fraud_type, DEFAULT_PAGE_SIZE};

/// Result of assessing one address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub address: String,
    pub blockchain: Blockchain,
    pub generated_at: DateTime<Utc>,
    pub lookback_days: u32,
    /// Built from the example data set rather than live sources
    pub example: bool,
    pub analysis: TransferAnalysis,
    /// Degraded sources (e.g. a directory that failed to load)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl AssessmentReport {
    pub fn has_suspicious_activity(&self) -> bool {
        self.analysis.has_suspicious_activity()
    }
}

/// One page of a list, 1-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
    /// Zero-based index of the first item on this page
    pub start: usize,
    /// Exclusive end index
    pub end: usize,
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn footer(&self) -> String {
        if self.total == 0 {
            return "Showing transfers 0-0 of 0".to_string();
        }
        format!(
            "Showing transfers {}-{} of {}",
            self.start + 1,
            self.end,
            self.total
        )
    }
}

/// Slice `items` into the requested page. Out-of-range pages are clamped.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = ((page - 1) * per_page).min(total);
    let end = (start + per_page).min(total);

    Page {
        page,
        per_page,
        total_pages,
        start,
        end,
        total,
        items: items[start..end].to_vec(),
    }
}

/// Uppercase the first letter of every alphabetic run, lowercase the rest
///
/// `"fake_native"` -> `"Fake_Native"`, `"NO DETAIL"` -> `"No Detail"`
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Guidance shown when an address has no transfers in the window
pub fn no_transfers_message(address: &str, blockchain: Blockchain, lookback_days: u32) -> String {
    format!(
        "No transactions found for address {} on {}. This could be because:\n\
         - The address has no token transfers in the last {} days\n\
         - The address doesn't exist\n\
         - The address is on a different network",
        address,
        blockchain.id(),
        lookback_days
    )
}

/// Render a report for the terminal
pub fn render_text(report: &AssessmentReport, page: usize) -> String {
    let a = &report.analysis;
    let s = &a.summary;
    let explorer = get_explorer_url(report.blockchain.chain_id());
    let mut out = String::new();

    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let title_suffix = if report.example { " (example data)" } else { "" };
    let _ = writeln!(out, "  🔎 FRAUD RISK ASSESSMENT{}", title_suffix);
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "  Address:    {}", report.address);
    let _ = writeln!(out, "  Blockchain: {}", report.blockchain.label());
    let _ = writeln!(
        out,
        "  Window:     last {} days ({} → {})",
        report.lookback_days,
        a.first_activity.format("%Y-%m-%d %H:%M"),
        a.last_activity.format("%Y-%m-%d %H:%M")
    );
    for warning in &report.warnings {
        let _ = writeln!(out, "  ⚠️  {}", warning);
    }
    let _ = writeln!(out);

    let verdict = if report.has_suspicious_activity() {
        "🔴 Suspicious token activity detected"
    } else {
        "🟢 No suspicious token activity detected"
    };
    let _ = writeln!(out, "  {}", verdict);
    let _ = writeln!(out);

    let _ = writeln!(out, "── Metrics ────────────────────────────────────────────────");
    let _ = writeln!(
        out,
        "  Total transfers:     {} ({} in / {} out)",
        s.total_transfers, s.transfers_in, s.transfers_out
    );
    let _ = writeln!(out, "  Unique tokens:       {}", s.unique_tokens);
    let _ = writeln!(
        out,
        "  Suspicious:          {} transfers ({:.1}%), {} tokens ({:.1}%), {} counterparties",
        s.suspicious_count,
        s.suspicious_percent,
        s.suspicious_tokens,
        s.suspicious_tokens_percent,
        s.suspicious_senders
    );
    let _ = writeln!(
        out,
        "  Safe:                {} transfers, {} tokens, {} counterparties",
        s.safe_count, s.safe_tokens, s.safe_senders
    );
    let _ = writeln!(out);

    if !a.suspicious_tags.is_empty() {
        let _ = writeln!(out, "── Tokens by Fraud Type ───────────────────────────────────");
        for tag in &a.suspicious_tags {
            let marker = if is_known_fraud_type(&tag.detail) { "🚨" } else { "• " };
            let _ = writeln!(
                out,
                "  {} {:<20} {:>3} tokens  {:>5.1}%",
                marker,
                title_case(&tag.detail),
                tag.count,
                tag.percent
            );
        }
        let _ = writeln!(out);
    }

    if !a.safe_tags.is_empty() {
        let _ = writeln!(out, "── Safe Tokens ────────────────────────────────────────────");
        for tag in &a.safe_tags {
            let _ = writeln!(
                out,
                "  🟢 {:<20} {:>3} tokens  {:>5.1}%",
                title_case(&tag.detail),
                tag.count,
                tag.percent
            );
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "── Top Tokens ─────────────────────────────────────────────");
    for token in &a.top_tokens {
        let _ = writeln!(
            out,
            "  {:<10} {}  {} transfers",
            token.symbol.as_deref().unwrap_or("Unknown"),
            token.contract_address,
            token.transfers
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "── Activity Timeline ──────────────────────────────────────");
    let _ = writeln!(
        out,
        "  {:<12} {:>9} {:>11} {:>7} {:>11}",
        "Date", "Transfers", "Suspicious", "Tokens", "Susp.Tokens"
    );
    for (activity, tokens) in a.activity_timeline.iter().zip(&a.tokens_timeline) {
        let _ = writeln!(
            out,
            "  {:<12} {:>9} {:>11} {:>7} {:>11}",
            activity.date.to_string(),
            activity.all_transfers,
            activity.suspicious_transfers,
            tokens.all_tokens,
            tokens.suspicious_tokens
        );
    }
    let _ = writeln!(out);

    let recent = paginate(&a.recent_transfers, page, DEFAULT_PAGE_SIZE);
    let _ = writeln!(
        out,
        "── Recent Transfers (page {}/{}) ───────────────────────────",
        recent.page, recent.total_pages
    );
    for row in &recent.items {
        let _ = writeln!(
            out,
            "  {} {}  {:<12} {:<10} {}",
            row.status.emoji(),
            row.time,
            row.transfer_type.as_str(),
            row.symbol,
            title_case(&row.tag_1)
        );
        let _ = writeln!(out, "     tx:           {}/tx/{}", explorer, row.tx_hash);
        let _ = writeln!(out, "     token:        {}", row.contract_address);
        let _ = writeln!(out, "     counterparty: {}", row.counterparty);
    }
    let _ = writeln!(out, "  {}", recent.footer());

    if !a.suspicious_transfers.is_empty() {
        let suspicious = paginate(&a.suspicious_transfers, page, DEFAULT_PAGE_SIZE);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "── Suspicious Tokens (page {}/{}) ──────────────────────────",
            suspicious.page, suspicious.total_pages
        );
        for m in &suspicious.items {
            let _ = writeln!(
                out,
                "  🔴 {:<10} {:<18} {}  created {}",
                m.transfer.symbol.as_deref().unwrap_or("Unknown"),
                title_case(&m.tag_1),
                m.transfer.contract_address,
                m.created
            );
        }
        let _ = writeln!(out, "  {}", suspicious.footer());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_case_matches_word_boundaries() {
        assert_eq!(title_case("fake_native"), "Fake_Native");
        assert_eq!(title_case("FAKE_STABLECOIN"), "Fake_Stablecoin");
        assert_eq!(title_case("no detail"), "No Detail");
        assert_eq!(title_case("ethereum"), "Ethereum");
        assert_eq!(title_case("x2y"), "X2Y");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_paginate_middle_and_last_page() {
        let items: Vec<u32> = (0..12).collect();

        let first = paginate(&items, 1, 5);
        assert_eq!(first.items, vec![0, 1, 2, 3, 4]);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.footer(), "Showing transfers 1-5 of 12");

        let last = paginate(&items, 3, 5);
        assert_eq!(last.items, vec![10, 11]);
        assert_eq!(last.footer(), "Showing transfers 11-12 of 12");
    }

    #[test]
    fn test_paginate_clamps_out_of_range() {
        let items: Vec<u32> = (0..7).collect();
        assert_eq!(paginate(&items, 0, 5).page, 1);
        assert_eq!(paginate(&items, 99, 5).page, 2);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, 4, 5);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
        assert_eq!(page.footer(), "Showing transfers 0-0 of 0");
    }

    #[test]
    fn test_no_transfers_message() {
        let msg = no_transfers_message("0xabc", Blockchain::Polygon, 7);
        assert!(msg.starts_with("No transactions found for address 0xabc on polygon."));
        assert!(msg.contains("last 7 days"));
        assert!(msg.contains("on a different network"));
    }
}
