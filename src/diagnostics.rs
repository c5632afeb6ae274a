// 🩺 Diagnostics - Structured, non-fatal parse outcomes
// Everything a batch run needs to record per document without aborting:
// field-level warnings, "no holdings" / "malformed" results, and run counters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// PARSE WARNING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Amount text had no numbers and matched no bracket
    UnrecognizedAmount,

    /// Two bounds were given high-to-low and were swapped
    InvertedRange,

    /// A numeric field could not be read as a number
    InvalidNumber,

    /// A negative value was reported where only >= 0 is meaningful
    NegativeValue,

    /// A date field could not be read
    InvalidDate,
}

impl WarningKind {
    pub fn message(&self) -> &'static str {
        match self {
            WarningKind::UnrecognizedAmount => "unrecognized amount format",
            WarningKind::InvertedRange => "inverted amount range",
            WarningKind::InvalidNumber => "invalid number",
            WarningKind::NegativeValue => "negative value clamped to zero",
            WarningKind::InvalidDate => "unrecognized date format",
        }
    }
}

/// A malformed or unrecognized field in an otherwise usable document.
/// Parsing continues with a best-effort fallback (usually 0 or absent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub kind: WarningKind,

    /// Field name the value came from ("value", "amount", ...)
    pub field: String,

    /// The offending raw text
    pub raw: String,
}

impl ParseWarning {
    pub fn new(kind: WarningKind, field: &str, raw: &str) -> Self {
        ParseWarning {
            kind,
            field: field.to_string(),
            raw: raw.to_string(),
        }
    }

    /// Same warning, re-attributed to another field
    pub fn for_field(mut self, field: &str) -> Self {
        self.field = field.to_string();
        self
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in '{}': {:?}", self.kind.message(), self.field, self.raw)
    }
}

// ============================================================================
// PARSE RESULT
// ============================================================================

/// Outcome of parsing one document. None of the variants is an error that
/// should stop a batch: callers record it and move to the next entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseResult<T> {
    /// At least one record was extracted
    Parsed { value: T, warnings: Vec<ParseWarning> },

    /// The document tokenized fine but yielded zero records
    NoHoldings { warnings: Vec<ParseWarning> },

    /// The document could not be tokenized at all
    Malformed { reason: String },
}

impl<T> ParseResult<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseResult::Parsed { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            ParseResult::Parsed { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            ParseResult::Parsed { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        match self {
            ParseResult::Parsed { warnings, .. } | ParseResult::NoHoldings { warnings } => warnings,
            ParseResult::Malformed { .. } => &[],
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> ParseResult<U> {
        match self {
            ParseResult::Parsed { value, warnings } => ParseResult::Parsed {
                value: f(value),
                warnings,
            },
            ParseResult::NoHoldings { warnings } => ParseResult::NoHoldings { warnings },
            ParseResult::Malformed { reason } => ParseResult::Malformed { reason },
        }
    }
}

// ============================================================================
// RUN REPORT (job tracking)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityOutcome {
    /// A new filing was parsed; `records` holdings/rows were produced
    Created { records: usize },

    /// Filing already known (same filing id or identical document)
    AlreadyKnown,

    /// Parsed but empty, reported as "0 holdings parsed"
    NoHoldings,

    /// Could not parse or could not be ordered into history
    Failed { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: String,
    pub filing_id: Option<String>,
    pub outcome: EntityOutcome,
    pub warning_count: usize,
}

/// Processed / created / failed counters for one batch run, consumed by a
/// job-tracking collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub job_type: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub processed: usize,
    pub created: usize,
    pub failed: usize,
    pub entities: Vec<EntityRecord>,
}

impl RunReport {
    pub fn start(job_type: &str) -> Self {
        RunReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            processed: 0,
            created: 0,
            failed: 0,
            entities: Vec::new(),
        }
    }

    /// Record one entity's outcome and bump the matching counters
    pub fn record(
        &mut self,
        entity_id: &str,
        filing_id: Option<&str>,
        outcome: EntityOutcome,
        warning_count: usize,
    ) {
        self.processed += 1;
        match &outcome {
            EntityOutcome::Created { .. } => self.created += 1,
            EntityOutcome::Failed { .. } => self.failed += 1,
            EntityOutcome::AlreadyKnown | EntityOutcome::NoHoldings => {}
        }

        self.entities.push(EntityRecord {
            entity_id: entity_id.to_string(),
            filing_id: filing_id.map(|s| s.to_string()),
            outcome,
            warning_count,
        });
    }

    /// Record a parse result directly
    pub fn record_parse<T>(
        &mut self,
        entity_id: &str,
        filing_id: Option<&str>,
        result: &ParseResult<T>,
        records: impl FnOnce(&T) -> usize,
    ) {
        let outcome = match result {
            ParseResult::Parsed { value, .. } => EntityOutcome::Created {
                records: records(value),
            },
            ParseResult::NoHoldings { .. } => EntityOutcome::NoHoldings,
            ParseResult::Malformed { reason } => EntityOutcome::Failed {
                reason: reason.clone(),
            },
        };
        self.record(entity_id, filing_id, outcome, result.warnings().len());
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn summary(&self) -> String {
        format!(
            "Run {} ({}): {} processed, {} created, {} failed",
            self.run_id, self.job_type, self.processed, self.created, self.failed
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let w = ParseWarning::new(WarningKind::UnrecognizedAmount, "amount", "N/A");
        assert_eq!(w.to_string(), "unrecognized amount format in 'amount': \"N/A\"");
    }

    #[test]
    fn test_parse_result_accessors() {
        let parsed: ParseResult<u32> = ParseResult::Parsed {
            value: 7,
            warnings: vec![ParseWarning::new(WarningKind::InvalidNumber, "value", "x")],
        };
        assert!(parsed.is_parsed());
        assert_eq!(parsed.value(), Some(&7));
        assert_eq!(parsed.warnings().len(), 1);

        let mapped = parsed.map(|v| v * 2);
        assert_eq!(mapped.into_value(), Some(14));

        let malformed: ParseResult<u32> = ParseResult::Malformed {
            reason: "bad".to_string(),
        };
        assert!(!malformed.is_parsed());
        assert!(malformed.warnings().is_empty());
    }

    #[test]
    fn test_run_report_counts() {
        let mut report = RunReport::start("sec_13f");

        report.record("1067983", Some("0000950123-24-001"), EntityOutcome::Created { records: 42 }, 0);
        report.record("1649339", None, EntityOutcome::NoHoldings, 1);
        report.record(
            "1336528",
            None,
            EntityOutcome::Failed {
                reason: "unexpected end of document".to_string(),
            },
            0,
        );

        let malformed: ParseResult<Vec<u8>> = ParseResult::Malformed {
            reason: "no markup".to_string(),
        };
        report.record_parse("921669", None, &malformed, |v| v.len());
        report.finish();

        assert_eq!(report.processed, 4);
        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.entities.len(), 4);
        assert!(report.finished_at.is_some());
        assert!(report.summary().contains("4 processed, 1 created, 2 failed"));
    }
}
