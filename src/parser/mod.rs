// 🏗️ Parser Framework
// One parser per disclosure dialect behind a single trait.
//
// Parsers never return Err: every document yields a ParseResult so a batch
// run can record the outcome and keep going.

pub mod annual;
mod html;
pub mod thirteen_f;
pub mod transactions;

pub use annual::AnnualDisclosureParser;
pub use thirteen_f::HoldingsParser;
pub use transactions::TransactionReportParser;

use crate::diagnostics::ParseResult;
use crate::disclosure::{AnnualDisclosure, TransactionReport};
use crate::filing::{Filing, FilingMeta};
use crate::resolver::IdentityResolver;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Quarterly institutional holdings information table (XML)
    Holdings13F,

    /// Periodic transaction report (HTML)
    TransactionReport,

    /// Annual financial disclosure (HTML)
    AnnualDisclosure,
}

impl DocumentKind {
    pub fn name(&self) -> &str {
        match self {
            DocumentKind::Holdings13F => "13F Information Table",
            DocumentKind::TransactionReport => "Periodic Transaction Report",
            DocumentKind::AnnualDisclosure => "Annual Financial Disclosure",
        }
    }

    /// Short code for job names and logs
    pub fn code(&self) -> &str {
        match self {
            DocumentKind::Holdings13F => "13f",
            DocumentKind::TransactionReport => "ptr",
            DocumentKind::AnnualDisclosure => "afd",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDocument {
    Holdings(Filing),
    Transactions(TransactionReport),
    Annual(AnnualDisclosure),
}

impl ParsedDocument {
    /// Records produced: holdings, transactions, or disclosure lines
    pub fn record_count(&self) -> usize {
        match self {
            ParsedDocument::Holdings(f) => f.holdings.len(),
            ParsedDocument::Transactions(r) => r.transactions.len(),
            ParsedDocument::Annual(d) => {
                d.assets.len() + d.liabilities.len() + d.income_sources.len()
            }
        }
    }
}

/// DisclosureParser - Core trait
pub trait DisclosureParser: Send + Sync {
    /// Parse one raw document
    fn parse(&self, raw: &str, meta: &FilingMeta) -> ParseResult<ParsedDocument>;

    /// Dialect this parser handles
    fn kind(&self) -> DocumentKind;

    /// Parser version (for provenance tracking)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Guess the dialect from content. `None` when nothing looks familiar.
pub fn detect_kind(raw: &str) -> Option<DocumentKind> {
    let lower = raw.to_lowercase();

    if lower.contains("infotable") || lower.contains("informationtable") {
        return Some(DocumentKind::Holdings13F);
    }

    if !lower.contains("<table") {
        return None;
    }

    if lower.contains("periodic transaction") || lower.contains("transaction type") {
        return Some(DocumentKind::TransactionReport);
    }

    if lower.contains("liabilit") || lower.contains("annual report") || lower.contains("financial disclosure") {
        return Some(DocumentKind::AnnualDisclosure);
    }

    if lower.contains("transaction") && lower.contains("amount") {
        return Some(DocumentKind::TransactionReport);
    }

    if lower.contains("asset") {
        return Some(DocumentKind::AnnualDisclosure);
    }

    None
}

/// Parser for a dialect. Holdings parsing resolves identities through the
/// shared resolver.
pub fn get_parser(kind: DocumentKind, resolver: Arc<IdentityResolver>) -> Box<dyn DisclosureParser> {
    match kind {
        DocumentKind::Holdings13F => Box::new(HoldingsParser::new(resolver)),
        DocumentKind::TransactionReport => Box::new(TransactionReportParser::new()),
        DocumentKind::AnnualDisclosure => Box::new(AnnualDisclosureParser::new()),
    }
}

/// Parse with the parser for `kind`
pub fn parse(
    raw: &str,
    kind: DocumentKind,
    meta: &FilingMeta,
    resolver: Arc<IdentityResolver>,
) -> ParseResult<ParsedDocument> {
    let result = get_parser(kind, resolver).parse(raw, meta);

    match &result {
        ParseResult::Parsed { value, warnings } => tracing::info!(
            kind = kind.code(),
            filing_id = %meta.filing_id,
            records = value.record_count(),
            warnings = warnings.len(),
            "parsed document"
        ),
        ParseResult::NoHoldings { .. } => tracing::info!(
            kind = kind.code(),
            filing_id = %meta.filing_id,
            "0 holdings parsed"
        ),
        ParseResult::Malformed { reason } => tracing::warn!(
            kind = kind.code(),
            filing_id = %meta.filing_id,
            reason = %reason,
            "malformed document"
        ),
    }

    result
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%m-%d-%Y",
    "%m/%d/%y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// Dates as they appear on filings: "03/15/2024", "2024-03-15", "03-31-2024"
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Documents without a single tag cannot be tokenized as markup
fn has_markup(raw: &str) -> bool {
    raw.contains('<') && raw.contains('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("03/15/2024"), Some(expected));
        assert_eq!(parse_date(" 2024-03-15 "), Some(expected));
        assert_eq!(parse_date("03-15-2024"), Some(expected));
        assert_eq!(parse_date("March 15, 2024"), Some(expected));
        assert_eq!(parse_date("Mar 15, 2024"), Some(expected));
        assert_eq!(parse_date("15.03.2024"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(
            detect_kind("<informationTable><infoTable/></informationTable>"),
            Some(DocumentKind::Holdings13F)
        );
        assert_eq!(
            detect_kind("<h1>Periodic Transaction Report</h1><table></table>"),
            Some(DocumentKind::TransactionReport)
        );
        assert_eq!(
            detect_kind("<table><tr><th>Creditor</th><th>Liability</th></tr></table>"),
            Some(DocumentKind::AnnualDisclosure)
        );
        assert_eq!(
            detect_kind("<table><tr><th>Asset</th><th>Value</th></tr></table>"),
            Some(DocumentKind::AnnualDisclosure)
        );
        assert_eq!(detect_kind("plain text"), None);
    }

    #[test]
    fn test_factory_returns_matching_parser() {
        let resolver = Arc::new(IdentityResolver::new());
        for kind in [
            DocumentKind::Holdings13F,
            DocumentKind::TransactionReport,
            DocumentKind::AnnualDisclosure,
        ] {
            assert_eq!(get_parser(kind, Arc::clone(&resolver)).kind(), kind);
        }
    }

    #[test]
    fn test_plain_text_is_malformed_for_every_kind() {
        let resolver = Arc::new(IdentityResolver::new());
        let meta = FilingMeta::new("x", "y", NaiveDate::from_ymd_opt(2024, 5, 15).unwrap());
        for kind in [
            DocumentKind::Holdings13F,
            DocumentKind::TransactionReport,
            DocumentKind::AnnualDisclosure,
        ] {
            let result = parse("no markup here", kind, &meta, Arc::clone(&resolver));
            assert!(
                matches!(result, ParseResult::Malformed { .. }),
                "{:?} should be malformed",
                kind
            );
        }
    }
}
