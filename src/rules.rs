// 🏷️ Asset Classification Rules - Rules as Data
// Keyword rules that file each disclosed asset under a fixed taxonomy.
// Rules are tried in priority order; the first match wins.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// TAXONOMY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetCategory {
    RealEstate,
    Stocks,
    BusinessInterest,
    Retirement,
    Cash,
    Bonds,
    MutualFunds,
    Other,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 8] = [
        AssetCategory::RealEstate,
        AssetCategory::Stocks,
        AssetCategory::BusinessInterest,
        AssetCategory::Retirement,
        AssetCategory::Cash,
        AssetCategory::Bonds,
        AssetCategory::MutualFunds,
        AssetCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::RealEstate => "Real Estate",
            AssetCategory::Stocks => "Stocks",
            AssetCategory::BusinessInterest => "Business Interest",
            AssetCategory::Retirement => "Retirement",
            AssetCategory::Cash => "Cash",
            AssetCategory::Bonds => "Bonds",
            AssetCategory::MutualFunds => "Mutual Funds",
            AssetCategory::Other => "Other",
        }
    }
}

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    /// Rule ID for tracking
    pub id: String,

    /// Category assigned when any keyword matches
    pub category: AssetCategory,

    /// Case-insensitive substrings; trailing spaces are significant ("cd ")
    pub keywords: Vec<String>,

    /// Priority (higher = tried first)
    #[serde(default)]
    pub priority: i32,
}

impl CategoryRule {
    pub fn new(id: &str, category: AssetCategory, keywords: &[&str], priority: i32) -> Self {
        CategoryRule {
            id: id.to_string(),
            category,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            priority,
        }
    }

    /// `text` must already be lowercase
    fn matches_lower(&self, text: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && text.contains(k.to_lowercase().as_str()))
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matches_lower(&text.to_lowercase())
    }
}

// ============================================================================
// CLASSIFIER
// ============================================================================

pub struct AssetClassifier {
    rules: Vec<CategoryRule>,
}

impl AssetClassifier {
    /// Load rules from a JSON array of `CategoryRule`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read category rules: {:?}", path.as_ref()))?;

        let rules: Vec<CategoryRule> =
            serde_json::from_str(&content).context("Failed to parse category rules JSON")?;

        Ok(AssetClassifier::from_rules(rules))
    }

    /// Sort by priority (higher first); equal priorities keep list order
    pub fn from_rules(mut rules: Vec<CategoryRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        AssetClassifier { rules }
    }

    /// Categorize an asset description. Pure: same text, same answer.
    pub fn classify(&self, description: &str) -> AssetCategory {
        let text = description.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches_lower(&text))
            .map(|rule| rule.category)
            .unwrap_or(AssetCategory::Other)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for AssetClassifier {
    /// Built-in keyword list used for annual disclosures
    fn default() -> Self {
        AssetClassifier::from_rules(vec![
            CategoryRule::new(
                "real_estate",
                AssetCategory::RealEstate,
                &["real estate", "property", "residence", "home", "land", "house", "condo", "farm"],
                70,
            ),
            CategoryRule::new(
                "stocks",
                AssetCategory::Stocks,
                &["stock", "common", "share", "equity", "corp", "inc", "ltd", "llc"],
                60,
            ),
            CategoryRule::new(
                "business",
                AssetCategory::BusinessInterest,
                &["business", "partnership", "llc member", "ownership", "venture", "capital"],
                50,
            ),
            CategoryRule::new(
                "retirement",
                AssetCategory::Retirement,
                &["401k", "ira", "pension", "retirement", "tsp", "thrift"],
                40,
            ),
            CategoryRule::new(
                "cash",
                AssetCategory::Cash,
                &["bank", "cash", "money market", "checking", "savings", "cd ", "certificate"],
                30,
            ),
            CategoryRule::new(
                "bonds",
                AssetCategory::Bonds,
                &["bond", "treasury", "municipal", "note"],
                20,
            ),
            CategoryRule::new(
                "mutual_funds",
                AssetCategory::MutualFunds,
                &["fund", "mutual", "etf", "index"],
                10,
            ),
        ])
    }
}

// ============================================================================
// TESTS
// ============================================================================
