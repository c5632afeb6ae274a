// 📈 13F Information Table Parser
//
// Streams the XML once, collecting each <infoTable> into a flat map of
// relative path → text. Tag matching is case-insensitive and ignores
// namespace prefixes, so `ns1:infoTable`, `infoTable` and `INFOTABLE` all
// count. Identity resolution happens once per document, after the scan.

use super::{has_markup, parse_date, DisclosureParser, DocumentKind, ParsedDocument};
use crate::diagnostics::{ParseResult, ParseWarning, WarningKind};
use crate::filing::{
    display_name, document_digest, Derivative, Filing, FilingMeta, HoldingRecord, QuantityType,
    VotingAuthority,
};
use crate::resolver::{normalize_code, IdentityResolver, ResolutionSource};
use crate::schedule::quarter_end_for_filing_date;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Largest value or share count accepted from a single record
const MAX_REPORTED_AMOUNT: i64 = 1_000_000_000_000_000;

static TRAILING_DERIVATIVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*\((put|call)\)\s*$").expect("valid derivative regex"));

// ============================================================================
// RAW RECORD
// ============================================================================

/// One <infoTable> as path → text, paths relative to the record and
/// lowercased ("shrsorprnamt/sshprnamt")
#[derive(Debug, Default)]
struct RawRecord {
    fields: HashMap<String, String>,
}

impl RawRecord {
    /// First non-empty value along a fallback chain of paths
    fn field(&self, paths: &[&str]) -> Option<&str> {
        paths
            .iter()
            .filter_map(|p| self.fields.get(*p))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }
}

/// Everything the scan pulls out of one document
#[derive(Debug, Default)]
struct ScannedDocument {
    records: Vec<RawRecord>,
    period_of_report: Option<String>,
    element_count: usize,
}

fn local_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_lowercase()
}

fn scan(raw: &str) -> Result<ScannedDocument, String> {
    let mut reader = Reader::from_str(raw);
    reader.config_mut().trim_text(true);

    let mut doc = ScannedDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut current: Option<(RawRecord, usize)> = None;

    loop {
        let text = match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(e.local_name().as_ref());
                doc.element_count += 1;
                if name == "infotable" && current.is_none() {
                    current = Some((RawRecord::default(), stack.len() + 1));
                }
                stack.push(name);
                continue;
            }
            Ok(Event::Empty(e)) => {
                doc.element_count += 1;
                if local_name(e.local_name().as_ref()) == "infotable" && current.is_none() {
                    // <infoTable/> carries nothing; recorded so it can be dropped like any
                    // record without an identity code
                    doc.records.push(RawRecord::default());
                }
                continue;
            }
            Ok(Event::End(_)) => {
                let closes_record = matches!(&current, Some((_, depth)) if stack.len() == *depth);
                if closes_record {
                    if let Some((record, _)) = current.take() {
                        doc.records.push(record);
                    }
                }
                stack.pop();
                continue;
            }
            Ok(Event::Text(t)) => t
                .unescape()
                .map(|c| c.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned()),
            Ok(Event::CData(c)) => String::from_utf8_lossy(&c.into_inner()).into_owned(),
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(e) => return Err(format!("XML syntax error: {}", e)),
        };

        match &mut current {
            Some((record, depth)) => {
                let path = stack[*depth..].join("/");
                if !path.is_empty() {
                    record.fields.entry(path).or_default().push_str(&text);
                }
            }
            None => {
                if let Some(tag) = stack.last() {
                    if (tag == "periodofreport" || tag == "reportcalendarorquarter")
                        && doc.period_of_report.is_none()
                    {
                        doc.period_of_report = Some(text);
                    }
                }
            }
        }
    }

    if let Some((record, _)) = current.take() {
        // Document ended inside a record; keep what was read
        doc.records.push(record);
    }

    Ok(doc)
}

// ============================================================================
// FIELD CONVERSION
// ============================================================================

/// Whole number from a reported field; malformed or above
/// `MAX_REPORTED_AMOUNT` → 0 with a warning, negative → clamped to 0 with a
/// warning
fn parse_amount_field(raw: Option<&str>, field: &str, warnings: &mut Vec<ParseWarning>) -> i64 {
    let Some(raw) = raw else {
        warnings.push(ParseWarning::new(WarningKind::InvalidNumber, field, ""));
        return 0;
    };

    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '$')
        .collect();

    let parsed = cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64));

    match parsed {
        Some(n) if n < 0 => {
            warnings.push(ParseWarning::new(WarningKind::NegativeValue, field, raw));
            0
        }
        Some(n) if n <= MAX_REPORTED_AMOUNT => n,
        _ => {
            warnings.push(ParseWarning::new(WarningKind::InvalidNumber, field, raw));
            0
        }
    }
}

/// Optional numeric field: absent is 0 without complaint
fn parse_optional_field(raw: Option<&str>, field: &str, warnings: &mut Vec<ParseWarning>) -> i64 {
    match raw {
        Some(_) => parse_amount_field(raw, field, warnings),
        None => 0,
    }
}

/// Issuer name with any trailing "(Put)"/"(Call)" split off
fn split_derivative(issuer: &str) -> (String, Option<Derivative>) {
    match TRAILING_DERIVATIVE.captures(issuer) {
        Some(caps) => {
            let derivative = caps.get(1).and_then(|m| Derivative::parse(m.as_str()));
            let name = TRAILING_DERIVATIVE.replace(issuer, "").trim().to_string();
            (name, derivative)
        }
        None => (issuer.trim().to_string(), None),
    }
}

/// Build a holding from one raw record. `None` when it has no identity code.
fn build_holding(record: &RawRecord, warnings: &mut Vec<ParseWarning>) -> Option<HoldingRecord> {
    let code = normalize_code(record.field(&["cusip"])?);
    if code.is_empty() {
        return None;
    }

    let (issuer_name, trailing) = split_derivative(record.field(&["nameofissuer"]).unwrap_or(""));
    let derivative = record
        .field(&["putcall"])
        .and_then(Derivative::parse)
        .or(trailing);

    let value = parse_amount_field(record.field(&["value"]), "value", warnings);
    let quantity = parse_amount_field(
        record.field(&["sshprnamt", "shrsorprnamt/sshprnamt"]),
        "sshPrnamt",
        warnings,
    );
    let quantity_type = QuantityType::from_code(
        record
            .field(&["sshprnamttype", "shrsorprnamt/sshprnamttype"])
            .unwrap_or("SH"),
    );

    let voting = VotingAuthority {
        sole: parse_optional_field(record.field(&["votingauthority/sole", "sole"]), "votingAuthority/Sole", warnings),
        shared: parse_optional_field(
            record.field(&["votingauthority/shared", "shared"]),
            "votingAuthority/Shared",
            warnings,
        ),
        none: parse_optional_field(record.field(&["votingauthority/none", "none"]), "votingAuthority/None", warnings),
    };

    Some(HoldingRecord {
        filing_id: String::new(),
        symbol: String::new(),
        resolution: ResolutionSource::Placeholder,
        display_name: display_name(&issuer_name, derivative),
        issuer_name,
        class_title: record.field(&["titleofclass"]).unwrap_or("").to_string(),
        code,
        quantity,
        quantity_type,
        value,
        pct_portfolio: 0.0,
        derivative,
        investment_discretion: record.field(&["investmentdiscretion"]).unwrap_or("").to_string(),
        voting,
    })
}

// ============================================================================
// PARSER
// ============================================================================

pub struct HoldingsParser {
    resolver: Arc<IdentityResolver>,
}

impl HoldingsParser {
    pub fn new(resolver: Arc<IdentityResolver>) -> Self {
        HoldingsParser { resolver }
    }

    /// Parse an information table into a Filing
    pub fn parse_filing(&self, raw: &str, meta: &FilingMeta) -> ParseResult<Filing> {
        if !has_markup(raw) {
            return ParseResult::Malformed {
                reason: "document contains no markup".to_string(),
            };
        }

        let doc = match scan(raw) {
            Ok(doc) => doc,
            Err(reason) => return ParseResult::Malformed { reason },
        };

        if doc.element_count == 0 {
            return ParseResult::Malformed {
                reason: "document contains no elements".to_string(),
            };
        }

        let mut warnings = Vec::new();
        let record_count = doc.records.len();
        let mut holdings: Vec<HoldingRecord> = doc
            .records
            .iter()
            .filter_map(|r| build_holding(r, &mut warnings))
            .collect();

        let dropped = record_count - holdings.len();
        if dropped > 0 {
            tracing::debug!(dropped, filing_id = %meta.filing_id, "dropped records without cusip");
        }

        if holdings.is_empty() {
            return ParseResult::NoHoldings { warnings };
        }

        // One resolver round trip for the whole document
        let codes: Vec<&str> = holdings.iter().map(|h| h.code.as_str()).collect();
        let batch = self.resolver.resolve_batch(&codes);
        if !batch.unavailable.is_empty() {
            tracing::warn!(
                filing_id = %meta.filing_id,
                unavailable = batch.unavailable.len(),
                "some identities left as placeholders"
            );
        }
        for h in holdings.iter_mut() {
            let resolved = batch.resolution_for(&h.code);
            h.symbol = resolved.symbol;
            h.resolution = resolved.source;
        }

        let report_date = meta
            .report_date
            .or_else(|| {
                let text = doc.period_of_report.as_deref()?;
                let parsed = parse_date(text);
                if parsed.is_none() {
                    warnings.push(ParseWarning::new(WarningKind::InvalidDate, "periodOfReport", text));
                }
                parsed
            })
            .unwrap_or_else(|| quarter_end_for_filing_date(meta.filing_date));

        let filing = Filing::assemble(meta, report_date, holdings, document_digest(raw));

        ParseResult::Parsed {
            value: filing,
            warnings,
        }
    }
}

impl DisclosureParser for HoldingsParser {
    fn parse(&self, raw: &str, meta: &FilingMeta) -> ParseResult<ParsedDocument> {
        self.parse_filing(raw, meta).map(ParsedDocument::Holdings)
    }

    fn kind(&self) -> DocumentKind {
        DocumentKind::Holdings13F
    }
}

// ============================================================================
// TESTS
// ============================================================================
