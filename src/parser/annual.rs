// 🏛️ Annual Financial Disclosure Parser
// Assets, liabilities and income sources from the HTML tables of an annual
// wealth filing, plus the spouse's name when the filing names one.

use super::html::{extract_tables, HtmlTable};
use super::{has_markup, DisclosureParser, DocumentKind, ParsedDocument};
use crate::amount::{normalize_into, RangeValue};
use crate::diagnostics::{ParseResult, ParseWarning};
use crate::disclosure::{AnnualDisclosure, AssetLine, IncomeSource, LiabilityLine};
use crate::filing::FilingMeta;
use crate::rules::AssetClassifier;
use chrono::Datelike;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;

static SPOUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Spouse:?\s*([A-Za-z\s]+)").expect("valid spouse regex"));

#[derive(Debug, Clone, Copy, PartialEq)]
enum TableKind {
    Assets,
    Liabilities,
    Income,
}

fn table_kind(table: &HtmlTable) -> Option<TableKind> {
    if table.header_mentions(&["liabilit", "creditor"]) {
        Some(TableKind::Liabilities)
    } else if table.header_mentions(&["source", "earned"]) {
        Some(TableKind::Income)
    } else if table.header_mentions(&["asset", "value"]) {
        Some(TableKind::Assets)
    } else if table.header_mentions(&["income"]) {
        Some(TableKind::Income)
    } else {
        None
    }
}

fn cell(row: &[String], idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
}

/// Header-located column, or the fixed position used by untitled tables
fn column_or(table: &HtmlTable, include: &[&str], exclude: &[&str], fallback: usize) -> usize {
    table.column(include, exclude).unwrap_or(fallback)
}

/// Spouse name from the first text node mentioning one. The label and the
/// name may sit in adjacent nodes ("<b>Spouse:</b> Jane Doe").
fn find_spouse(document: &Html) -> Option<String> {
    let nodes: Vec<&str> = document
        .root_element()
        .text()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    for (i, &node) in nodes.iter().enumerate() {
        if !node.contains("Spouse") {
            continue;
        }
        let joined;
        let candidates: [&str; 2] = match nodes.get(i + 1) {
            Some(next) => {
                joined = format!("{} {}", node, next);
                [node, joined.as_str()]
            }
            None => [node, node],
        };
        for text in candidates {
            let name = SPOUSE
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "));
            if let Some(name) = name.filter(|n| !n.is_empty()) {
                return Some(name);
            }
        }
    }
    None
}

pub struct AnnualDisclosureParser {
    classifier: AssetClassifier,
}

impl AnnualDisclosureParser {
    pub fn new() -> Self {
        AnnualDisclosureParser {
            classifier: AssetClassifier::default(),
        }
    }

    pub fn with_classifier(classifier: AssetClassifier) -> Self {
        AnnualDisclosureParser { classifier }
    }

    pub fn parse_disclosure(&self, raw: &str, meta: &FilingMeta) -> ParseResult<AnnualDisclosure> {
        if !has_markup(raw) {
            return ParseResult::Malformed {
                reason: "document contains no markup".to_string(),
            };
        }

        let document = Html::parse_document(raw);
        let mut warnings = Vec::new();
        let mut disclosure = AnnualDisclosure {
            filing_id: meta.filing_id.clone(),
            entity_id: meta.entity_id.clone(),
            filing_date: meta.filing_date,
            year: meta
                .report_date
                .map(|d| d.year())
                .unwrap_or(meta.filing_date.year() - 1),
            assets: Vec::new(),
            liabilities: Vec::new(),
            income_sources: Vec::new(),
            spouse_name: find_spouse(&document),
        };

        for table in extract_tables(&document) {
            match table_kind(&table) {
                Some(TableKind::Assets) => self.parse_assets(&table, &mut disclosure, &mut warnings),
                Some(TableKind::Liabilities) => parse_liabilities(&table, &mut disclosure, &mut warnings),
                Some(TableKind::Income) => parse_income(&table, &mut disclosure, &mut warnings),
                None => {}
            }
        }

        if disclosure.is_empty() {
            return ParseResult::NoHoldings { warnings };
        }

        tracing::debug!(
            filing_id = %meta.filing_id,
            assets = disclosure.assets.len(),
            liabilities = disclosure.liabilities.len(),
            income_sources = disclosure.income_sources.len(),
            "parsed annual disclosure"
        );

        ParseResult::Parsed {
            value: disclosure,
            warnings,
        }
    }

    // ========================================================================
    // ASSETS: description, value, income
    // ========================================================================

    fn parse_assets(&self, table: &HtmlTable, out: &mut AnnualDisclosure, warnings: &mut Vec<ParseWarning>) {
        let desc = column_or(table, &["asset", "description"], &["type", "value", "income"], 0);
        let value = column_or(table, &["value"], &[], 1);
        let income = column_or(table, &["income"], &["type"], 2);
        let income_type = table.column(&["income type", "type of income"], &[]);

        for row in &table.rows {
            if row.len() < 2 {
                continue;
            }
            let description = cell(row, Some(desc));
            if description.is_empty() {
                continue;
            }

            let range = normalize_into(cell(row, Some(value)), "value", warnings);
            if range.is_zero() {
                continue;
            }

            let income_text = cell(row, Some(income));
            let income_range = if income_text.is_empty() {
                None
            } else {
                Some(normalize_into(income_text, "income", warnings)).filter(|r: &RangeValue| !r.is_zero())
            };

            out.assets.push(AssetLine {
                category: self.classifier.classify(description),
                description: description.to_string(),
                value: range,
                income: income_range,
                income_type: Some(cell(row, income_type).to_string()).filter(|s| !s.is_empty()),
            });
        }
    }
}

impl Default for AnnualDisclosureParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// LIABILITIES: creditor, description, amount
// ============================================================================

fn parse_liabilities(table: &HtmlTable, out: &mut AnnualDisclosure, warnings: &mut Vec<ParseWarning>) {
    let creditor_col = column_or(table, &["creditor"], &[], 0);
    let desc_col = column_or(table, &["liabilit", "description", "type"], &["creditor", "amount", "value"], 1);
    let amount_col = column_or(table, &["amount", "value"], &[], 2);

    for row in &table.rows {
        if row.len() < 2 {
            continue;
        }
        let creditor = cell(row, Some(creditor_col));
        let description = match cell(row, Some(desc_col)) {
            "" => creditor,
            d => d,
        };

        let value = normalize_into(cell(row, Some(amount_col)), "amount", warnings);
        if value.is_zero() {
            continue;
        }

        out.liabilities.push(LiabilityLine {
            description: description.to_string(),
            creditor: Some(creditor.to_string()).filter(|c| !c.is_empty()),
            value,
        });
    }
}

// ============================================================================
// INCOME SOURCES
// ============================================================================

fn parse_income(table: &HtmlTable, out: &mut AnnualDisclosure, warnings: &mut Vec<ParseWarning>) {
    let source_col = column_or(table, &["source", "payer", "name"], &[], 0);
    let type_col = table.column(&["type"], &[]);
    let amount_col = table.column(&["amount", "income", "earned"], &["type", "source"]);

    let mut seen: HashSet<String> = out.income_sources.iter().map(|s| s.source.clone()).collect();

    for row in &table.rows {
        let source = cell(row, Some(source_col));
        if source.is_empty() || !seen.insert(source.to_string()) {
            continue;
        }

        let amount_text = cell(row, amount_col);
        let amount = if amount_text.is_empty() {
            RangeValue::ZERO
        } else {
            normalize_into(amount_text, "income", warnings)
        };

        out.income_sources.push(IncomeSource {
            source: source.to_string(),
            income_type: Some(cell(row, type_col).to_string()).filter(|s| !s.is_empty()),
            amount,
        });
    }
}

impl DisclosureParser for AnnualDisclosureParser {
    fn parse(&self, raw: &str, meta: &FilingMeta) -> ParseResult<ParsedDocument> {
        self.parse_disclosure(raw, meta).map(ParsedDocument::Annual)
    }

    fn kind(&self) -> DocumentKind {
        DocumentKind::AnnualDisclosure
    }
}
