// 🏛️ Legislator Disclosures - Transaction reports and annual wealth filings
// Amounts on these forms are brackets, so every value is a RangeValue.

use crate::amount::RangeValue;
use crate::rules::AssetCategory;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// PERIODIC TRANSACTION REPORTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Purchase,
    SalePartial,
    SaleFull,
    Sale,
    Exchange,
    /// Anything else, kept verbatim
    Other(String),
}

impl TransactionType {
    /// "P", "Purchase", "S (partial)", "Sale (Full)", "Exchange", ...
    pub fn normalize(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();

        if lower.contains("purchase") || lower.contains("buy") || lower == "p" {
            TransactionType::Purchase
        } else if lower.contains("sale") || lower.contains("sell") || lower.starts_with("s ") || lower == "s" {
            if lower.contains("partial") {
                TransactionType::SalePartial
            } else if lower.contains("full") {
                TransactionType::SaleFull
            } else {
                TransactionType::Sale
            }
        } else if lower.contains("exchange") || lower == "e" {
            TransactionType::Exchange
        } else {
            TransactionType::Other(raw.trim().to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TransactionType::Purchase => "Purchase",
            TransactionType::SalePartial => "Sale (Partial)",
            TransactionType::SaleFull => "Sale (Full)",
            TransactionType::Sale => "Sale",
            TransactionType::Exchange => "Exchange",
            TransactionType::Other(raw) => raw,
        }
    }

    pub fn is_sale(&self) -> bool {
        matches!(
            self,
            TransactionType::Sale | TransactionType::SalePartial | TransactionType::SaleFull
        )
    }
}

/// One disclosed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockTransaction {
    /// Self, Spouse, Joint, Dependent Child; "Self" when not reported
    pub owner: String,

    pub transaction_date: Option<NaiveDate>,

    /// From a ticker column, "(TICK)" in the asset name, or a known company name
    pub ticker: Option<String>,

    pub asset_name: String,

    /// "Stock", "Stock Option", ... as printed
    pub asset_type: String,

    pub transaction_type: TransactionType,

    /// Amount exactly as printed
    pub amount_text: String,

    pub amount: RangeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReport {
    pub filing_id: String,
    pub entity_id: String,
    pub filing_date: NaiveDate,
    pub transactions: Vec<StockTransaction>,
}

impl TransactionReport {
    /// Sum of all disclosed amount ranges
    pub fn total_amount(&self) -> RangeValue {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    pub fn for_ticker<'a>(&'a self, ticker: &'a str) -> impl Iterator<Item = &'a StockTransaction> {
        self.transactions
            .iter()
            .filter(move |t| t.ticker.as_deref().map_or(false, |s| s.eq_ignore_ascii_case(ticker)))
    }
}

// ============================================================================
// ANNUAL FINANCIAL DISCLOSURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLine {
    pub category: AssetCategory,
    pub description: String,
    pub value: RangeValue,
    pub income: Option<RangeValue>,

    /// "Dividends", "Rent", ... when a type column exists
    pub income_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiabilityLine {
    pub description: String,
    pub creditor: Option<String>,
    pub value: RangeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeSource {
    pub source: String,
    pub income_type: Option<String>,
    pub amount: RangeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualDisclosure {
    pub filing_id: String,
    pub entity_id: String,
    pub filing_date: NaiveDate,

    /// Calendar year covered; defaults to the year before filing
    pub year: i32,

    pub assets: Vec<AssetLine>,
    pub liabilities: Vec<LiabilityLine>,
    pub income_sources: Vec<IncomeSource>,
    pub spouse_name: Option<String>,
}

impl AnnualDisclosure {
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty() && self.liabilities.is_empty() && self.income_sources.is_empty()
    }

    pub fn total_income(&self) -> RangeValue {
        self.income_sources.iter().map(|s| s.amount).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_normalization() {
        assert_eq!(TransactionType::normalize("Purchase"), TransactionType::Purchase);
        assert_eq!(TransactionType::normalize("P"), TransactionType::Purchase);
        assert_eq!(TransactionType::normalize("Sale (Partial)"), TransactionType::SalePartial);
        assert_eq!(TransactionType::normalize("S (partial)"), TransactionType::SalePartial);
        assert_eq!(TransactionType::normalize("sale (full)"), TransactionType::SaleFull);
        assert_eq!(TransactionType::normalize("Sell"), TransactionType::Sale);
        assert_eq!(TransactionType::normalize("Exchange"), TransactionType::Exchange);
        assert_eq!(
            TransactionType::normalize(" Gift "),
            TransactionType::Other("Gift".to_string())
        );
        assert_eq!(TransactionType::normalize("Gift").label(), "Gift");
        assert!(TransactionType::SaleFull.is_sale());
        assert!(!TransactionType::Purchase.is_sale());
    }

    #[test]
    fn test_report_totals_and_ticker_filter() {
        let tx = |ticker: Option<&str>, min, max| StockTransaction {
            owner: "Spouse".to_string(),
            transaction_date: None,
            ticker: ticker.map(|s| s.to_string()),
            asset_name: "x".to_string(),
            asset_type: "Stock".to_string(),
            transaction_type: TransactionType::Purchase,
            amount_text: String::new(),
            amount: RangeValue::new(min, max),
        };
        let report = TransactionReport {
            filing_id: "20024567".to_string(),
            entity_id: "P000197".to_string(),
            filing_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            transactions: vec![
                tx(Some("NVDA"), 1_001, 15_000),
                tx(Some("nvda"), 15_001, 50_000),
                tx(None, 1, 1_000),
            ],
        };

        assert_eq!(report.total_amount(), RangeValue::new(16_003, 66_000));
        assert_eq!(report.for_ticker("NVDA").count(), 2);
    }
}
