// 🗂️ Symbol Cache - code → symbol mappings learned from batch lookups
// Two indexes over the same mappings: the full identity code and its
// 6-character issuer prefix.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Length of the issuer prefix of an identity code
pub const PREFIX_LEN: usize = 6;

/// First 6 characters of a normalized code (the whole code when shorter)
pub fn issuer_prefix(code: &str) -> &str {
    match code.char_indices().nth(PREFIX_LEN) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

/// Trim + uppercase
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSymbol {
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolCache {
    #[serde(default)]
    exact: HashMap<String, CachedSymbol>,
    #[serde(default)]
    prefix: HashMap<String, CachedSymbol>,
}

impl SymbolCache {
    pub fn new() -> Self {
        SymbolCache::default()
    }

    pub fn get_exact(&self, code: &str) -> Option<&CachedSymbol> {
        self.exact.get(code)
    }

    pub fn get_prefix(&self, code: &str) -> Option<&CachedSymbol> {
        self.prefix.get(issuer_prefix(code))
    }

    /// Insert one confirmed mapping into both indexes
    pub fn insert(&mut self, code: &str, entry: CachedSymbol) {
        let code = normalize_code(code);
        self.prefix
            .insert(issuer_prefix(&code).to_string(), entry.clone());
        self.exact.insert(code, entry);
    }

    /// Merge a whole batch; callers hold the write lock once for all of it
    pub fn merge<I>(&mut self, mappings: I) -> usize
    where
        I: IntoIterator<Item = (String, CachedSymbol)>,
    {
        let mut merged = 0;
        for (code, entry) in mappings {
            self.insert(&code, entry);
            merged += 1;
        }
        merged
    }

    /// Exact-code entries, for stores that persist rows
    pub fn entries(&self) -> impl Iterator<Item = (&String, &CachedSymbol)> {
        self.exact.iter()
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str) -> CachedSymbol {
        CachedSymbol {
            symbol: symbol.to_string(),
            name: None,
        }
    }

    #[test]
    fn test_prefix_and_normalization() {
        assert_eq!(issuer_prefix("037833100"), "037833");
        assert_eq!(issuer_prefix("0378"), "0378");
        assert_eq!(normalize_code("  02079k305 "), "02079K305");
    }

    #[test]
    fn test_insert_populates_both_indexes() {
        let mut cache = SymbolCache::new();
        cache.insert("g5960l103", entry("MDT"));

        assert_eq!(cache.get_exact("G5960L103").map(|e| e.symbol.as_str()), Some("MDT"));
        // another share class of the same issuer hits the prefix index
        assert_eq!(cache.get_prefix("G5960L999").map(|e| e.symbol.as_str()), Some("MDT"));
        assert!(cache.get_exact("G5960L999").is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_merge_counts() {
        let mut cache = SymbolCache::new();
        let merged = cache.merge(vec![
            ("11135F101".to_string(), entry("AVGO")),
            ("H1467J104".to_string(), entry("CB")),
        ]);
        assert_eq!(merged, 2);
        assert_eq!(cache.entries().count(), 2);
    }
}
