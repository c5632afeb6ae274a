// 🏷️ Company Names - curated issuer name → ticker mappings
//
// Used when a free-text asset description carries no "(TICK)" marker.
// Names match as whole words, case-insensitively, so "meta" does not fire
// inside "metals". Longer names are tried first.

use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::path::Path;

const BUILTIN: &[(&str, &str)] = &[
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("google", "GOOGL"),
    ("alphabet", "GOOGL"),
    ("amazon", "AMZN"),
    ("meta", "META"),
    ("facebook", "META"),
    ("nvidia", "NVDA"),
    ("tesla", "TSLA"),
    ("jpmorgan", "JPM"),
    ("berkshire", "BRK.B"),
    ("johnson & johnson", "JNJ"),
    ("procter", "PG"),
    ("visa", "V"),
    ("mastercard", "MA"),
    ("disney", "DIS"),
    ("netflix", "NFLX"),
    ("boeing", "BA"),
    ("lockheed", "LMT"),
    ("raytheon", "RTX"),
    ("northrop", "NOC"),
    ("general dynamics", "GD"),
    ("exxon", "XOM"),
    ("chevron", "CVX"),
    ("pfizer", "PFE"),
    ("merck", "MRK"),
];

#[derive(Debug, Deserialize)]
struct NameRow {
    name: String,
    ticker: String,
}

#[derive(Debug, Clone)]
pub struct CompanyNameTable {
    /// (lowercase name, ticker), longest name first
    entries: Vec<(String, String)>,
}

impl CompanyNameTable {
    pub fn empty() -> Self {
        CompanyNameTable { entries: Vec::new() }
    }

    /// Load a `name,ticker` CSV with a header row
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open company name table: {:?}", path))?;

        let mut table = CompanyNameTable::empty();
        for result in rdr.deserialize() {
            let row: NameRow = result.context("Failed to deserialize company name row")?;
            table.insert(&row.name, &row.ticker);
        }

        tracing::debug!(entries = table.len(), ?path, "loaded company name table");
        Ok(table)
    }

    pub fn insert(&mut self, name: &str, ticker: &str) {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return;
        }
        let ticker = ticker.trim().to_uppercase();

        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = ticker,
            None => self.entries.push((name, ticker)),
        }
        // stable: equal lengths keep insertion order
        self.entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    }

    /// Ticker of the first known company named in `description`
    pub fn find(&self, description: &str) -> Option<&str> {
        let haystack = description.to_lowercase();
        self.entries
            .iter()
            .find(|(name, _)| contains_word(&haystack, name))
            .map(|(_, ticker)| ticker.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CompanyNameTable {
    fn default() -> Self {
        let mut table = CompanyNameTable::empty();
        for (name, ticker) in BUILTIN {
            table.insert(name, ticker);
        }
        table
    }
}

/// `needle` occurs in `haystack` with no letter or digit on either side
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.map_or(false, char::is_alphanumeric) && !after.map_or(false, char::is_alphanumeric)
    })
}
