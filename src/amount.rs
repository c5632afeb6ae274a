// 💵 Amount-Range Normalizer
// Disclosures report most amounts as one of a small set of regulatory
// brackets ("$1,001 - $15,000"). This turns free text into a closed
// [min, max] interval of whole dollars.

use crate::diagnostics::{ParseWarning, WarningKind};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

// ============================================================================
// RANGE VALUE
// ============================================================================

/// Closed interval [min, max] for an imprecisely disclosed amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RangeValue {
    pub min: i64,
    pub max: i64,
}

impl RangeValue {
    pub const ZERO: RangeValue = RangeValue { min: 0, max: 0 };

    pub fn new(min: i64, max: i64) -> Self {
        RangeValue { min, max }
    }

    pub fn exact(value: i64) -> Self {
        RangeValue { min: value, max: value }
    }

    pub fn is_zero(&self) -> bool {
        self.min == 0 && self.max == 0
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    pub fn midpoint(&self) -> i64 {
        self.min.saturating_add(self.width() / 2)
    }

    pub fn width(&self) -> i64 {
        self.max.saturating_sub(self.min)
    }
}

impl Add for RangeValue {
    type Output = RangeValue;

    /// Saturates at the i64 bounds
    fn add(self, other: RangeValue) -> RangeValue {
        RangeValue {
            min: self.min.saturating_add(other.min),
            max: self.max.saturating_add(other.max),
        }
    }
}

impl std::iter::Sum for RangeValue {
    fn sum<I: Iterator<Item = RangeValue>>(iter: I) -> RangeValue {
        iter.fold(RangeValue::ZERO, |acc, r| acc + r)
    }
}

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "${}", self.min)
        } else {
            write!(f, "${} - ${}", self.min, self.max)
        }
    }
}

// ============================================================================
// BRACKET TABLE
// ============================================================================

/// Canonical bracket text as printed on disclosure forms → bounds
pub const BRACKETS: &[(&str, RangeValue)] = &[
    ("None (or less than $1,001)", RangeValue { min: 0, max: 1_000 }),
    ("$1 - $1,000", RangeValue { min: 1, max: 1_000 }),
    ("$1,001 - $15,000", RangeValue { min: 1_001, max: 15_000 }),
    ("$15,001 - $50,000", RangeValue { min: 15_001, max: 50_000 }),
    ("$50,001 - $100,000", RangeValue { min: 50_001, max: 100_000 }),
    ("$100,001 - $250,000", RangeValue { min: 100_001, max: 250_000 }),
    ("$250,001 - $500,000", RangeValue { min: 250_001, max: 500_000 }),
    ("$500,001 - $1,000,000", RangeValue { min: 500_001, max: 1_000_000 }),
    ("$1,000,001 - $5,000,000", RangeValue { min: 1_000_001, max: 5_000_000 }),
    ("$5,000,001 - $25,000,000", RangeValue { min: 5_000_001, max: 25_000_000 }),
    ("$25,000,001 - $50,000,000", RangeValue { min: 25_000_001, max: 50_000_000 }),
    // Open-ended top bracket, capped at 2x
    ("Over $50,000,000", RangeValue { min: 50_000_000, max: 100_000_000 }),
    // Spouse/dependent-child assets above $1M
    ("Over $1,000,000", RangeValue { min: 1_000_001, max: 5_000_000 }),
];

/// Comparison key: lowercase, no "$", ",", whitespace; dashes unified
fn bracket_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
        .map(|c| match c {
            '\u{2013}' | '\u{2014}' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

static BRACKET_KEYS: Lazy<Vec<(String, RangeValue)>> = Lazy::new(|| {
    BRACKETS
        .iter()
        .map(|(text, range)| (bracket_key(text), *range))
        .collect()
});

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?").expect("valid amount regex")
});

/// Look up a bracket by exact (normalized) text
pub fn match_bracket(text: &str) -> Option<RangeValue> {
    let key = bracket_key(text);
    BRACKET_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, range)| *range)
}

// ============================================================================
// NORMALIZER
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAmount {
    pub range: RangeValue,
    pub warning: Option<ParseWarning>,
}

/// Extract every number from free text, ignoring thousands separators and
/// truncating decimals ("$1,234.56" → 1234)
fn extract_numbers(text: &str) -> Vec<i64> {
    NUMBER
        .find_iter(text)
        .filter_map(|m| {
            let digits: String = m.as_str().chars().filter(|c| *c != ',').collect();
            let whole = digits.split('.').next().unwrap_or("");
            whole.parse::<i64>().ok()
        })
        .collect()
}

/// Normalize a free-text amount into a RangeValue.
///
/// 1. Exact bracket match → bracket bounds
/// 2. Two or more numbers → [first, second]
/// 3. One number → [n, n]
/// 4. Nothing → [0, 0] plus an "unrecognized amount format" warning
///
/// Example:
/// ```
/// use disclosure_tracker::amount::{normalize_amount, RangeValue};
///
/// assert_eq!(normalize_amount("$1,001 - $15,000").range, RangeValue::new(1001, 15000));
/// assert_eq!(normalize_amount("$250,000").range, RangeValue::exact(250000));
/// assert!(normalize_amount("N/A").warning.is_some());
/// ```
pub fn normalize_amount(text: &str) -> NormalizedAmount {
    if let Some(range) = match_bracket(text) {
        return NormalizedAmount { range, warning: None };
    }

    let numbers = extract_numbers(text);

    match numbers.as_slice() {
        [first, second, ..] if first <= second => NormalizedAmount {
            range: RangeValue::new(*first, *second),
            warning: None,
        },
        [first, second, ..] => NormalizedAmount {
            range: RangeValue::new(*second, *first),
            warning: Some(ParseWarning::new(WarningKind::InvertedRange, "amount", text)),
        },
        [only] => NormalizedAmount {
            range: RangeValue::exact(*only),
            warning: None,
        },
        [] => NormalizedAmount {
            range: RangeValue::ZERO,
            warning: Some(ParseWarning::new(
                WarningKind::UnrecognizedAmount,
                "amount",
                text.trim(),
            )),
        },
    }
}

/// Normalize and push any warning, attributed to `field`, onto `warnings`
pub fn normalize_into(text: &str, field: &str, warnings: &mut Vec<ParseWarning>) -> RangeValue {
    let normalized = normalize_amount(text);
    if let Some(w) = normalized.warning {
        warnings.push(w.for_field(field));
    }
    normalized.range
}

// ============================================================================
// TESTS
// ============================================================================
