// ⚖️ Net-Worth Reconciliation - Conservative ranges from bracketed lines
//
// Every asset and liability is disclosed as a bracket, so net worth is a
// range too:
//   net_worth.min = Σ asset.min − Σ liability.max
//   net_worth.max = Σ asset.max − Σ liability.min
//
// The widest honest answer: nothing inside the brackets is assumed.

use crate::amount::RangeValue;
use crate::disclosure::{AnnualDisclosure, AssetLine, LiabilityLine};
use crate::rules::{AssetCategory, AssetClassifier};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetWorthSnapshot {
    pub entity_id: String,
    pub year: i32,
    pub total_assets: RangeValue,
    pub total_liabilities: RangeValue,
    pub net_worth: RangeValue,

    /// Asset totals per category; categories without assets are absent
    pub by_category: BTreeMap<AssetCategory, RangeValue>,
}

impl NetWorthSnapshot {
    /// Liabilities may exceed assets even in the best case
    pub fn is_underwater(&self) -> bool {
        self.net_worth.max < 0
    }

    pub fn category_total(&self, category: AssetCategory) -> RangeValue {
        self.by_category.get(&category).copied().unwrap_or(RangeValue::ZERO)
    }

    pub fn summary(&self) -> String {
        format!(
            "{} ({}): assets {}, liabilities {}, net worth {}",
            self.entity_id, self.year, self.total_assets, self.total_liabilities, self.net_worth
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct NetWorthReconciler {
    classifier: AssetClassifier,
}

impl NetWorthReconciler {
    pub fn new() -> Self {
        NetWorthReconciler {
            classifier: AssetClassifier::default(),
        }
    }

    pub fn with_classifier(classifier: AssetClassifier) -> Self {
        NetWorthReconciler { classifier }
    }

    /// Aggregate itemized ranges into one snapshot.
    ///
    /// Assets are categorized from their descriptions by this reconciler's
    /// rules. `AssetLine::category` is ignored here, so a custom classifier
    /// recategorizes lines a parser already labelled.
    pub fn reconcile(
        &self,
        entity_id: &str,
        year: i32,
        assets: &[AssetLine],
        liabilities: &[LiabilityLine],
    ) -> NetWorthSnapshot {
        let total_assets: RangeValue = assets.iter().map(|a| a.value).sum();
        let total_liabilities: RangeValue = liabilities.iter().map(|l| l.value).sum();

        let mut by_category: BTreeMap<AssetCategory, RangeValue> = BTreeMap::new();
        for asset in assets {
            let category = self.classifier.classify(&asset.description);
            let slot = by_category.entry(category).or_insert(RangeValue::ZERO);
            *slot = *slot + asset.value;
        }

        let net_worth = RangeValue::new(
            total_assets.min.saturating_sub(total_liabilities.max),
            total_assets.max.saturating_sub(total_liabilities.min),
        );

        tracing::debug!(
            entity_id,
            year,
            assets = assets.len(),
            liabilities = liabilities.len(),
            net_min = net_worth.min,
            net_max = net_worth.max,
            "reconciled net worth"
        );

        NetWorthSnapshot {
            entity_id: entity_id.to_string(),
            year,
            total_assets,
            total_liabilities,
            net_worth,
            by_category,
        }
    }

    pub fn reconcile_disclosure(&self, disclosure: &AnnualDisclosure) -> NetWorthSnapshot {
        self.reconcile(
            &disclosure.entity_id,
            disclosure.year,
            &disclosure.assets,
            &disclosure.liabilities,
        )
    }
}

impl Default for NetWorthReconciler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::CategoryRule;

    fn asset(description: &str, min: i64, max: i64) -> AssetLine {
        AssetLine {
            category: AssetCategory::Other,
            description: description.to_string(),
            value: RangeValue::new(min, max),
            income: None,
            income_type: None,
        }
    }

    fn liability(description: &str, min: i64, max: i64) -> LiabilityLine {
        LiabilityLine {
            description: description.to_string(),
            creditor: None,
            value: RangeValue::new(min, max),
        }
    }

    #[test]
    fn test_bracket_scenario() {
        let reconciler = NetWorthReconciler::new();
        let assets = vec![
            asset("Vanguard index fund", 100_001, 250_000),
            asset("Primary residence", 500_001, 1_000_000),
        ];
        let liabilities = vec![liability("Mortgage", 250_001, 500_000)];

        let snapshot = reconciler.reconcile("P000197", 2023, &assets, &liabilities);

        assert_eq!(snapshot.total_assets, RangeValue::new(600_002, 1_250_000));
        assert_eq!(snapshot.total_liabilities, RangeValue::new(250_001, 500_000));
        assert_eq!(snapshot.net_worth, RangeValue::new(100_002, 999_999));
        assert!(snapshot.net_worth.is_valid());
        println!("✅ {}", snapshot.summary());
    }

    #[test]
    fn test_round_number_scenario() {
        let reconciler = NetWorthReconciler::new();
        let snapshot = reconciler.reconcile(
            "P000197",
            2023,
            &[asset("Brokerage account", 100_000, 250_000), asset("Home", 500_000, 1_000_000)],
            &[liability("Mortgage", 250_000, 500_000)],
        );
        assert_eq!(snapshot.total_assets, RangeValue::new(600_000, 1_250_000));
        assert_eq!(snapshot.net_worth, RangeValue::new(100_000, 1_000_000));
    }

    #[test]
    fn test_negative_net_worth() {
        let snapshot = NetWorthReconciler::new().reconcile(
            "X",
            2023,
            &[asset("Checking", 1_001, 15_000)],
            &[liability("Student loan", 50_001, 100_000)],
        );
        assert_eq!(snapshot.net_worth, RangeValue::new(1_001 - 100_000, 15_000 - 50_001));
        assert!(snapshot.is_underwater());
        assert!(snapshot.net_worth.min <= snapshot.net_worth.max);
    }

    #[test]
    fn test_empty_inputs() {
        let snapshot = NetWorthReconciler::new().reconcile("X", 2023, &[], &[]);
        assert_eq!(snapshot.net_worth, RangeValue::ZERO);
        assert!(snapshot.by_category.is_empty());
    }

    #[test]
    fn test_category_totals() {
        let snapshot = NetWorthReconciler::new().reconcile(
            "X",
            2023,
            &[
                asset("Rental house", 100, 200),
                asset("Vacation condo", 300, 400),
                asset("Thrift Savings Plan", 10, 20),
                asset("Antique car", 1, 2),
            ],
            &[],
        );
        assert_eq!(snapshot.category_total(AssetCategory::RealEstate), RangeValue::new(400, 600));
        assert_eq!(snapshot.category_total(AssetCategory::Retirement), RangeValue::new(10, 20));
        assert_eq!(snapshot.category_total(AssetCategory::Other), RangeValue::new(1, 2));
        assert_eq!(snapshot.category_total(AssetCategory::Bonds), RangeValue::ZERO);

        let summed: RangeValue = snapshot.by_category.values().copied().sum();
        assert_eq!(summed, snapshot.total_assets);
    }

    #[test]
    fn test_custom_classifier() {
        let reconciler = NetWorthReconciler::with_classifier(AssetClassifier::from_rules(vec![
            CategoryRule::new("crypto", AssetCategory::Other, &["bitcoin"], 10),
            CategoryRule::new("cash", AssetCategory::Cash, &["wallet"], 5),
        ]));
        let snapshot = reconciler.reconcile("X", 2023, &[asset("Bitcoin wallet", 5, 10)], &[]);
        assert_eq!(snapshot.category_total(AssetCategory::Other), RangeValue::new(5, 10));
    }

    #[test]
    fn test_reconciler_rules_override_line_category() {
        let mut fund = asset("Acme Growth Fund", 1_001, 15_000);
        fund.category = AssetCategory::Stocks;

        let default_snapshot = NetWorthReconciler::new().reconcile("X", 2023, &[fund.clone()], &[]);
        assert_eq!(default_snapshot.category_total(AssetCategory::Stocks), RangeValue::ZERO);
        assert_eq!(default_snapshot.by_category.len(), 1);

        let reconciler = NetWorthReconciler::with_classifier(AssetClassifier::from_rules(vec![
            CategoryRule::new("funds", AssetCategory::MutualFunds, &["fund"], 10),
        ]));
        let snapshot = reconciler.reconcile("X", 2023, &[fund], &[]);
        assert_eq!(snapshot.category_total(AssetCategory::MutualFunds), RangeValue::new(1_001, 15_000));
        assert_eq!(snapshot.category_total(AssetCategory::Stocks), RangeValue::ZERO);
    }

    #[test]
    fn test_reconcile_disclosure() {
        let disclosure = AnnualDisclosure {
            filing_id: "10056789".to_string(),
            entity_id: "P000197".to_string(),
            filing_date: chrono::NaiveDate::from_ymd_opt(2024, 5, 15).unwrap(),
            year: 2023,
            assets: vec![asset("Land", 15_001, 50_000)],
            liabilities: vec![],
            income_sources: vec![],
            spouse_name: None,
        };
        let snapshot = NetWorthReconciler::new().reconcile_disclosure(&disclosure);
        assert_eq!(snapshot.entity_id, "P000197");
        assert_eq!(snapshot.year, 2023);
        assert_eq!(snapshot.net_worth, RangeValue::new(15_001, 50_000));
    }
}
