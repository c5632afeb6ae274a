// 📚 Static Table - curated issuer prefix → symbol mappings

use super::cache::{issuer_prefix, normalize_code};
use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Curated mega-cap issuers, keyed by the 6-character prefix
const BUILTIN: &[(&str, &str)] = &[
    ("037833", "AAPL"),
    ("02079K", "GOOGL"),
    ("02079L", "GOOG"),
    ("594918", "MSFT"),
    ("023135", "AMZN"),
    ("30303M", "META"),
    ("67066G", "NVDA"),
    ("88160R", "TSLA"),
    ("084670", "BRK.B"),
    ("060505", "BAC"),
    ("46625H", "JPM"),
    ("92826C", "V"),
    ("478160", "JNJ"),
    ("931142", "WMT"),
    ("742718", "PG"),
    ("88579Y", "MA"),
    ("172967", "C"),
    ("254687", "DIS"),
    ("459200", "IBM"),
    ("713448", "PEP"),
    ("191216", "KO"),
    ("166764", "CVX"),
    ("30231G", "XOM"),
];

#[derive(Debug, Deserialize)]
struct TableRow {
    prefix: String,
    symbol: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StaticEntry {
    pub symbol: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StaticTable {
    entries: HashMap<String, StaticEntry>,
}

impl StaticTable {
    pub fn empty() -> Self {
        StaticTable {
            entries: HashMap::new(),
        }
    }

    /// Load a `prefix,symbol[,name]` CSV with a header row
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .with_context(|| format!("Failed to open static symbol table: {:?}", path))?;

        let mut table = StaticTable::empty();
        for result in rdr.deserialize() {
            let row: TableRow = result.context("Failed to deserialize static table row")?;
            table.insert(&row.prefix, &row.symbol, row.name);
        }

        tracing::debug!(entries = table.len(), ?path, "loaded static symbol table");
        Ok(table)
    }

    pub fn insert(&mut self, prefix: &str, symbol: &str, name: Option<String>) {
        let prefix = normalize_code(prefix);
        self.entries.insert(
            issuer_prefix(&prefix).to_string(),
            StaticEntry {
                symbol: symbol.trim().to_string(),
                name,
            },
        );
    }

    /// Look up by a full code or a bare prefix
    pub fn lookup(&self, code: &str) -> Option<&StaticEntry> {
        self.entries.get(issuer_prefix(code))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StaticTable {
    fn default() -> Self {
        let mut table = StaticTable::empty();
        for (prefix, symbol) in BUILTIN {
            table.insert(prefix, symbol, None);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_builtin_table() {
        let table = StaticTable::default();
        assert_eq!(table.len(), 23);
        assert_eq!(table.lookup("037833100").map(|e| e.symbol.as_str()), Some("AAPL"));
        assert_eq!(table.lookup("084670702").map(|e| e.symbol.as_str()), Some("BRK.B"));
        assert!(table.lookup("999999999").is_none());
    }

    #[test]
    fn test_csv_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("symbols.csv");
        fs::write(
            &path,
            "prefix,symbol,name\n11135f,AVGO,Broadcom Inc\nH1467J, CB\n",
        )
        .unwrap();

        let table = StaticTable::from_csv_path(&path).unwrap();
        assert_eq!(table.len(), 2);

        let avgo = table.lookup("11135F101").unwrap();
        assert_eq!(avgo.symbol, "AVGO");
        assert_eq!(avgo.name.as_deref(), Some("Broadcom Inc"));
        assert_eq!(table.lookup("H1467J104").unwrap().symbol, "CB");
    }

    #[test]
    fn test_missing_csv_is_an_error() {
        assert!(StaticTable::from_csv_path(Path::new("/nonexistent/symbols.csv")).is_err());
    }
}
