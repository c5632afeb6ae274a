// 🧾 Periodic Transaction Report Parser
// Legislator trade disclosures published as HTML tables. Columns are found
// by header keywords; tables without usable headers fall back to the
// fixed layout [id, asset, type, date, amount].

use super::html::{extract_tables, HtmlTable};
use super::{has_markup, parse_date, DisclosureParser, DocumentKind, ParsedDocument};
use crate::amount::normalize_into;
use crate::diagnostics::{ParseResult, ParseWarning, WarningKind};
use crate::disclosure::{StockTransaction, TransactionReport, TransactionType};
use crate::filing::FilingMeta;
use crate::resolver::CompanyNameTable;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static TICKER_IN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(([A-Z]{1,5})\)").expect("valid ticker regex"));

/// Column positions for one table
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    owner: Option<usize>,
    asset: usize,
    ticker: Option<usize>,
    asset_type: Option<usize>,
    tx_type: Option<usize>,
    date: Option<usize>,
    amount: usize,
}

impl Layout {
    /// cols[1] asset, [2] type, [3] date, [4] amount; rows need 5 cells
    const POSITIONAL: Layout = Layout {
        owner: None,
        asset: 1,
        ticker: None,
        asset_type: None,
        tx_type: Some(2),
        date: Some(3),
        amount: 4,
    };

    fn from_headers(table: &HtmlTable) -> Option<Layout> {
        let asset = table.column(&["asset", "security", "description"], &["type"])?;
        let amount = table.column(&["amount"], &[])?;

        Some(Layout {
            owner: table.column(&["owner"], &[]),
            asset,
            ticker: table.column(&["ticker", "symbol"], &[]),
            asset_type: table.column(&["asset type"], &[]),
            tx_type: table.column(&["type"], &["asset"]),
            date: table
                .column(&["transaction date"], &[])
                .or_else(|| table.column(&["date"], &["notification", "filed"])),
            amount,
        })
    }

    /// Fewest cells a data row needs
    fn min_cells(&self) -> usize {
        if *self == Layout::POSITIONAL {
            return 5;
        }
        [
            Some(self.asset),
            Some(self.amount),
            self.owner,
            self.ticker,
            self.asset_type,
            self.tx_type,
            self.date,
        ]
        .into_iter()
        .flatten()
        .max()
        .map_or(0, |m| m + 1)
    }
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
}

fn normalize_owner(raw: &str) -> String {
    match raw.trim().to_uppercase().as_str() {
        "" | "SELF" => "Self".to_string(),
        "SP" | "SPOUSE" => "Spouse".to_string(),
        "JT" | "JOINT" => "Joint".to_string(),
        "DC" | "DEPENDENT" | "DEPENDENT CHILD" => "Dependent Child".to_string(),
        _ => raw.trim().to_string(),
    }
}

/// "(NVDA)" inside the asset name
pub fn extract_ticker(asset_name: &str) -> Option<String> {
    TICKER_IN_NAME
        .captures(asset_name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn ticker_from_column(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() || t == "--" || t.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(t.to_uppercase())
    }
}

pub struct TransactionReportParser {
    company_names: CompanyNameTable,
}

impl TransactionReportParser {
    pub fn new() -> Self {
        TransactionReportParser {
            company_names: CompanyNameTable::default(),
        }
    }

    /// Replace the name table consulted when an asset name has no "(TICK)"
    pub fn with_company_names(mut self, company_names: CompanyNameTable) -> Self {
        self.company_names = company_names;
        self
    }

    pub fn parse_report(&self, raw: &str, meta: &FilingMeta) -> ParseResult<TransactionReport> {
        if !has_markup(raw) {
            return ParseResult::Malformed {
                reason: "document contains no markup".to_string(),
            };
        }

        let document = Html::parse_document(raw);
        let mut warnings = Vec::new();
        let mut transactions = Vec::new();

        for table in extract_tables(&document) {
            if !table.header_mentions(&["asset", "transaction", "amount"]) {
                continue;
            }

            let layout = Layout::from_headers(&table).unwrap_or(Layout::POSITIONAL);
            let min_cells = layout.min_cells();

            for row in &table.rows {
                if row.len() < min_cells {
                    continue;
                }
                if let Some(tx) = self.parse_row(row, &layout, &mut warnings) {
                    transactions.push(tx);
                }
            }
        }

        if transactions.is_empty() {
            return ParseResult::NoHoldings { warnings };
        }

        tracing::debug!(filing_id = %meta.filing_id, count = transactions.len(), "parsed transactions");

        ParseResult::Parsed {
            value: TransactionReport {
                filing_id: meta.filing_id.clone(),
                entity_id: meta.entity_id.clone(),
                filing_date: meta.filing_date,
                transactions,
            },
            warnings,
        }
    }

    fn parse_row(
        &self,
        row: &[String],
        layout: &Layout,
        warnings: &mut Vec<ParseWarning>,
    ) -> Option<StockTransaction> {
        let asset_name = cell(row, Some(layout.asset));
        if asset_name.is_empty() {
            return None;
        }

        let ticker = ticker_from_column(cell(row, layout.ticker))
            .or_else(|| extract_ticker(asset_name))
            .or_else(|| self.company_names.find(asset_name).map(str::to_string));

        let date_text = cell(row, layout.date);
        let transaction_date = parse_date(date_text);
        if transaction_date.is_none() && !date_text.is_empty() {
            warnings.push(ParseWarning::new(WarningKind::InvalidDate, "transaction_date", date_text));
        }

        let amount_text = cell(row, Some(layout.amount));
        let amount = normalize_into(amount_text, "amount", warnings);

        let asset_type = match cell(row, layout.asset_type) {
            "" => "Stock".to_string(),
            t => t.to_string(),
        };

        Some(StockTransaction {
            owner: normalize_owner(cell(row, layout.owner)),
            transaction_date,
            ticker,
            asset_name: asset_name.to_string(),
            asset_type,
            transaction_type: TransactionType::normalize(cell(row, layout.tx_type)),
            amount_text: amount_text.to_string(),
            amount,
        })
    }
}

impl Default for TransactionReportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DisclosureParser for TransactionReportParser {
    fn parse(&self, raw: &str, meta: &FilingMeta) -> ParseResult<ParsedDocument> {
        self.parse_report(raw, meta).map(ParsedDocument::Transactions)
    }

    fn kind(&self) -> DocumentKind {
        DocumentKind::TransactionReport
    }
}
