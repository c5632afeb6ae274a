// 📄 Filing Model - Quarterly institutional holdings
// A Filing is an immutable snapshot for one reporting entity; its holdings
// never change after parsing. Successive filings are compared in `temporal`.

use crate::resolver::ResolutionSource;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// FILING METADATA (supplied by the caller)
// ============================================================================

/// What the caller knows about a document before parsing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingMeta {
    /// Unique filing identifier (accession number for 13F)
    pub filing_id: String,

    /// Reporting entity (CIK, member id, ...)
    pub entity_id: String,

    /// Date the document was filed
    pub filing_date: NaiveDate,

    /// Period the document reports on, when known up front
    pub report_date: Option<NaiveDate>,
}

impl FilingMeta {
    pub fn new(filing_id: &str, entity_id: &str, filing_date: NaiveDate) -> Self {
        FilingMeta {
            filing_id: filing_id.to_string(),
            entity_id: entity_id.to_string(),
            filing_date,
            report_date: None,
        }
    }

    pub fn with_report_date(mut self, report_date: NaiveDate) -> Self {
        self.report_date = Some(report_date);
        self
    }
}

// ============================================================================
// HOLDING RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantityType {
    /// Share count
    Shares,
    /// Principal amount (bonds)
    Principal,
}

impl QuantityType {
    /// "SH" / "PRN" as reported; anything unknown counts as shares
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("PRN") {
            QuantityType::Principal
        } else {
            QuantityType::Shares
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            QuantityType::Shares => "SH",
            QuantityType::Principal => "PRN",
        }
    }
}

/// Option qualifier on a reported position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Derivative {
    Put,
    Call,
}

impl Derivative {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "put" => Some(Derivative::Put),
            "call" => Some(Derivative::Call),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Derivative::Put => "PUT",
            Derivative::Call => "CALL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VotingAuthority {
    pub sole: i64,
    pub shared: i64,
    pub none: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    /// Filing this record belongs to
    pub filing_id: String,

    // ========================================================================
    // IDENTITY
    // ========================================================================
    /// Security identity code (CUSIP), uppercased
    pub code: String,

    /// Trading symbol, or the 6-character code prefix when unresolved
    pub symbol: String,

    /// Where `symbol` came from
    pub resolution: ResolutionSource,

    pub issuer_name: String,

    /// Issuer name with the derivative qualifier appended: "APPLE INC (PUT)"
    pub display_name: String,

    pub class_title: String,

    // ========================================================================
    // POSITION
    // ========================================================================
    pub quantity: i64,
    pub quantity_type: QuantityType,

    /// Reported market value (always >= 0)
    pub value: i64,

    /// Share of the filing's total value, 0-100
    pub pct_portfolio: f64,

    pub derivative: Option<Derivative>,

    // ========================================================================
    // AS REPORTED
    // ========================================================================
    pub investment_discretion: String,
    pub voting: VotingAuthority,
}

impl HoldingRecord {
    /// Placeholder symbols are not real identities
    pub fn is_resolved(&self) -> bool {
        self.resolution != ResolutionSource::Placeholder
    }

    /// Zero-quantity copy carrying this record's identity into another
    /// filing; used to make a fully exited position explicit
    pub fn closed_in(&self, filing_id: &str) -> HoldingRecord {
        HoldingRecord {
            filing_id: filing_id.to_string(),
            quantity: 0,
            value: 0,
            pct_portfolio: 0.0,
            voting: VotingAuthority::default(),
            ..self.clone()
        }
    }
}

/// "APPLE INC" + Put → "APPLE INC (PUT)"
pub fn display_name(issuer_name: &str, derivative: Option<Derivative>) -> String {
    match derivative {
        Some(d) => format!("{} ({})", issuer_name.trim(), d.label()),
        None => issuer_name.trim().to_string(),
    }
}

// ============================================================================
// FILING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    pub filing_id: String,
    pub entity_id: String,
    pub filing_date: NaiveDate,
    pub report_date: NaiveDate,

    /// Σ holding values
    pub total_value: i64,

    pub position_count: usize,

    /// Sorted by value descending, ties in document order
    pub holdings: Vec<HoldingRecord>,

    /// SHA-256 of the raw document, for spotting re-submitted copies
    pub document_digest: String,
}

impl Filing {
    /// Assemble a filing: totals, weights and ordering are derived here so
    /// every Filing upholds the same invariants.
    pub fn assemble(
        meta: &FilingMeta,
        report_date: NaiveDate,
        mut holdings: Vec<HoldingRecord>,
        document_digest: String,
    ) -> Filing {
        let total_value = holdings
            .iter()
            .fold(0i64, |acc, h| acc.saturating_add(h.value));

        for h in holdings.iter_mut() {
            h.filing_id = meta.filing_id.clone();
            h.pct_portfolio = if total_value > 0 {
                h.value as f64 / total_value as f64 * 100.0
            } else {
                0.0
            };
        }

        // sort_by is stable: equal values keep document order
        holdings.sort_by(|a, b| b.value.cmp(&a.value));

        Filing {
            filing_id: meta.filing_id.clone(),
            entity_id: meta.entity_id.clone(),
            filing_date: meta.filing_date,
            report_date,
            total_value,
            position_count: holdings.len(),
            holdings,
            document_digest,
        }
    }

    pub fn top(&self, n: usize) -> &[HoldingRecord] {
        &self.holdings[..n.min(self.holdings.len())]
    }

    pub fn find_symbol(&self, symbol: &str) -> Option<&HoldingRecord> {
        self.holdings.iter().find(|h| h.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Hex SHA-256 of a raw document
pub fn document_digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn holding(symbol: &str, code: &str, quantity: i64, value: i64) -> HoldingRecord {
        HoldingRecord {
            filing_id: String::new(),
            code: code.to_string(),
            symbol: symbol.to_string(),
            resolution: ResolutionSource::StaticTable,
            issuer_name: format!("{} INC", symbol),
            display_name: format!("{} INC", symbol),
            class_title: "COM".to_string(),
            quantity,
            quantity_type: QuantityType::Shares,
            value,
            pct_portfolio: 0.0,
            derivative: None,
            investment_discretion: "SOLE".to_string(),
            voting: VotingAuthority::default(),
        }
    }

    pub(crate) fn filing(id: &str, date: NaiveDate, holdings: Vec<HoldingRecord>) -> Filing {
        let meta = FilingMeta::new(id, "1067983", date);
        Filing::assemble(&meta, date, holdings, document_digest(id))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_assemble_totals_weights_and_order() {
        let f = filing(
            "acc-1",
            date(2024, 5, 15),
            vec![
                holding("KO", "191216100", 10, 100),
                holding("AAPL", "037833100", 10, 300),
                holding("BAC", "060505104", 10, 100),
            ],
        );

        assert_eq!(f.total_value, 500);
        assert_eq!(f.position_count, 3);
        assert_eq!(f.holdings[0].symbol, "AAPL");
        // tie between KO and BAC keeps document order
        assert_eq!(f.holdings[1].symbol, "KO");
        assert_eq!(f.holdings[2].symbol, "BAC");
        assert!((f.holdings[0].pct_portfolio - 60.0).abs() < 1e-9);
        assert!(f.holdings.iter().all(|h| h.filing_id == "acc-1"));

        let pct_sum: f64 = f.holdings.iter().map(|h| h.pct_portfolio).sum();
        assert!(pct_sum <= 100.0 + 1e-9);
    }

    #[test]
    fn test_zero_total_gives_zero_weights() {
        let f = filing(
            "acc-0",
            date(2024, 5, 15),
            vec![holding("KO", "191216100", 10, 0), holding("BAC", "060505104", 5, 0)],
        );
        assert_eq!(f.total_value, 0);
        assert!(f.holdings.iter().all(|h| h.pct_portfolio == 0.0));
    }

    #[test]
    fn test_total_value_saturates() {
        let f = filing(
            "acc-big",
            date(2024, 5, 15),
            vec![holding("KO", "191216100", 1, i64::MAX), holding("BAC", "060505104", 1, i64::MAX)],
        );
        assert_eq!(f.total_value, i64::MAX);
        assert!(f.holdings.iter().all(|h| h.pct_portfolio <= 100.0));
    }

    #[test]
    fn test_closed_in_keeps_identity() {
        let h = holding("MSFT", "594918104", 10, 500);
        let closed = h.closed_in("acc-2");
        assert_eq!(closed.symbol, "MSFT");
        assert_eq!(closed.code, "594918104");
        assert_eq!(closed.quantity, 0);
        assert_eq!(closed.value, 0);
        assert_eq!(closed.filing_id, "acc-2");
    }

    #[test]
    fn test_display_name_and_codes() {
        assert_eq!(display_name("APPLE INC ", Some(Derivative::Put)), "APPLE INC (PUT)");
        assert_eq!(display_name("APPLE INC", None), "APPLE INC");
        assert_eq!(Derivative::parse(" Call "), Some(Derivative::Call));
        assert_eq!(Derivative::parse("none"), None);
        assert_eq!(QuantityType::from_code("prn"), QuantityType::Principal);
        assert_eq!(QuantityType::from_code(""), QuantityType::Shares);
    }

    #[test]
    fn test_document_digest_is_stable() {
        assert_eq!(document_digest("<a/>"), document_digest("<a/>"));
        assert_ne!(document_digest("<a/>"), document_digest("<b/>"));
        assert_eq!(document_digest("").len(), 64);
    }
}
