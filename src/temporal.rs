// ⏰ Temporal Diff Engine
// "What changed since last period": each Filing is an immutable snapshot of
// an entity at one point in time; comparing consecutive snapshots yields one
// ChangeRecord per holding identity.
//
// Identity = resolved symbol (or the raw code while the symbol is only a
// placeholder) + derivative qualifier, so a PUT on AAPL never cancels out a
// long AAPL position.

use crate::filing::{Derivative, Filing, HoldingRecord};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

// ============================================================================
// CHANGE RECORD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    New,
    Closed,
    Increased,
    Decreased,
    Unchanged,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::New => "NEW",
            ChangeKind::Closed => "CLOSED",
            ChangeKind::Increased => "INCREASED",
            ChangeKind::Decreased => "DECREASED",
            ChangeKind::Unchanged => "UNCHANGED",
        }
    }

    /// Total over (present now, present before, quantity delta)
    pub fn classify(in_current: bool, in_previous: bool, delta: i64) -> Option<ChangeKind> {
        match (in_current, in_previous) {
            (true, false) => Some(ChangeKind::New),
            (false, true) => Some(ChangeKind::Closed),
            (true, true) if delta > 0 => Some(ChangeKind::Increased),
            (true, true) if delta < 0 => Some(ChangeKind::Decreased),
            (true, true) => Some(ChangeKind::Unchanged),
            (false, false) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HoldingKey {
    /// Symbol, or identity code when the symbol is a placeholder
    pub identity: String,
    pub derivative: Option<Derivative>,
}

impl HoldingKey {
    pub fn of(holding: &HoldingRecord) -> Self {
        let identity = if holding.is_resolved() {
            holding.symbol.clone()
        } else {
            holding.code.clone()
        };
        HoldingKey {
            identity,
            derivative: holding.derivative,
        }
    }

    fn by_code(holding: &HoldingRecord) -> (String, Option<Derivative>) {
        (holding.code.clone(), holding.derivative)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub kind: ChangeKind,
    pub key: HoldingKey,

    /// now − previous
    pub quantity_delta: i64,

    /// delta / previous × 100; `None` when previous quantity was 0
    pub pct_change: Option<f64>,

    pub previous_quantity: i64,
    pub previous_value: i64,

    /// Current holding; for Closed a zero-quantity stand-in carrying the
    /// prior identity and the current filing id
    pub holding: HoldingRecord,
}

// ============================================================================
// AGGREGATION
// ============================================================================

/// Rows of one filing merged per key, in first-seen order
struct Positions {
    rows: Vec<(HoldingKey, HoldingRecord)>,
    index: HashMap<HoldingKey, usize>,
}

impl Positions {
    fn from_holdings(holdings: &[HoldingRecord]) -> Self {
        let mut positions = Positions {
            rows: Vec::with_capacity(holdings.len()),
            index: HashMap::with_capacity(holdings.len()),
        };

        for h in holdings {
            let key = HoldingKey::of(h);
            match positions.index.get(&key) {
                Some(&i) => {
                    let merged = &mut positions.rows[i].1;
                    merged.quantity = merged.quantity.saturating_add(h.quantity);
                    merged.value = merged.value.saturating_add(h.value);
                    merged.pct_portfolio += h.pct_portfolio;
                }
                None => {
                    positions.index.insert(key.clone(), positions.rows.len());
                    positions.rows.push((key, h.clone()));
                }
            }
        }
        positions
    }
}

fn pct(delta: i64, previous: i64) -> Option<f64> {
    if previous > 0 {
        Some(delta as f64 / previous as f64 * 100.0)
    } else {
        None
    }
}

fn matched(key: HoldingKey, now: &HoldingRecord, before: &HoldingRecord) -> ChangeRecord {
    let delta = now.quantity.saturating_sub(before.quantity);
    let kind = ChangeKind::classify(true, true, delta).unwrap_or(ChangeKind::Unchanged);

    ChangeRecord {
        kind,
        key,
        quantity_delta: delta,
        pct_change: if delta == 0 { Some(0.0) } else { pct(delta, before.quantity) },
        previous_quantity: before.quantity,
        previous_value: before.value,
        holding: now.clone(),
    }
}

// ============================================================================
// DIFF
// ============================================================================

/// Compare `current` against the prior filing of the same entity.
///
/// Hash join on HoldingKey, O(n + m). Rows left unmatched on both sides are
/// re-joined on identity code, so a position whose code resolved to a real
/// symbol only this period still pairs with its placeholder-keyed past.
pub fn diff(current: &Filing, previous: Option<&Filing>) -> Vec<ChangeRecord> {
    let now = Positions::from_holdings(&current.holdings);

    let Some(previous) = previous else {
        return now
            .rows
            .into_iter()
            .map(|(key, h)| ChangeRecord {
                kind: ChangeKind::New,
                key,
                quantity_delta: h.quantity,
                pct_change: Some(100.0),
                previous_quantity: 0,
                previous_value: 0,
                holding: h,
            })
            .collect();
    };

    let before = Positions::from_holdings(&previous.holdings);

    let mut changes = Vec::with_capacity(now.rows.len() + before.rows.len());
    let mut claimed = vec![false; before.rows.len()];
    let mut unmatched_now: Vec<usize> = Vec::new();

    // Primary join on key
    for (i, (key, h)) in now.rows.iter().enumerate() {
        match before.index.get(key) {
            Some(&j) => {
                claimed[j] = true;
                changes.push((i, matched(key.clone(), h, &before.rows[j].1)));
            }
            None => unmatched_now.push(i),
        }
    }

    // Secondary join on identity code among leftovers
    let mut by_code: HashMap<(String, Option<Derivative>), usize> = HashMap::new();
    for (j, (_, h)) in before.rows.iter().enumerate() {
        if !claimed[j] {
            by_code.entry(HoldingKey::by_code(h)).or_insert(j);
        }
    }

    let mut drifted: HashSet<usize> = HashSet::new();
    for &i in &unmatched_now {
        let (key, h) = &now.rows[i];
        let record = match by_code.remove(&HoldingKey::by_code(h)) {
            Some(j) => {
                claimed[j] = true;
                drifted.insert(i);
                matched(key.clone(), h, &before.rows[j].1)
            }
            None => ChangeRecord {
                kind: ChangeKind::New,
                key: key.clone(),
                quantity_delta: h.quantity,
                pct_change: Some(100.0),
                previous_quantity: 0,
                previous_value: 0,
                holding: h.clone(),
            },
        };
        changes.push((i, record));
    }

    if !drifted.is_empty() {
        tracing::debug!(
            filing_id = %current.filing_id,
            count = drifted.len(),
            "matched holdings across identity drift"
        );
    }

    // Current rows in filing order, then exits in prior filing order
    changes.sort_by_key(|(i, _)| *i);
    let mut out: Vec<ChangeRecord> = changes.into_iter().map(|(_, c)| c).collect();

    for (j, (key, h)) in before.rows.iter().enumerate() {
        if claimed[j] {
            continue;
        }
        out.push(ChangeRecord {
            kind: ChangeKind::Closed,
            key: key.clone(),
            quantity_delta: 0i64.saturating_sub(h.quantity),
            pct_change: Some(-100.0),
            previous_quantity: h.quantity,
            previous_value: h.value,
            holding: h.closed_in(&current.filing_id),
        });
    }

    out
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    pub new: usize,
    pub closed: usize,
    pub increased: usize,
    pub decreased: usize,
    pub unchanged: usize,
}

impl ChangeSummary {
    pub fn from_changes(changes: &[ChangeRecord]) -> Self {
        let mut s = ChangeSummary::default();
        for c in changes {
            match c.kind {
                ChangeKind::New => s.new += 1,
                ChangeKind::Closed => s.closed += 1,
                ChangeKind::Increased => s.increased += 1,
                ChangeKind::Decreased => s.decreased += 1,
                ChangeKind::Unchanged => s.unchanged += 1,
            }
        }
        s
    }

    pub fn total(&self) -> usize {
        self.new + self.closed + self.increased + self.decreased + self.unchanged
    }
}

// ============================================================================
// FILING HISTORY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HistoryError {
    #[error("filing {filing_id} belongs to entity {found}, history is for {expected}")]
    EntityMismatch {
        filing_id: String,
        expected: String,
        found: String,
    },

    #[error("filing {0} is already in the history")]
    DuplicateFiling(String),

    #[error("filing {filing_id} repeats the document of filing {existing}")]
    DuplicateDocument { filing_id: String, existing: String },

    #[error("filing {filing_id} dated {filing_date} is not after the latest filing ({latest})")]
    OutOfOrder {
        filing_id: String,
        filing_date: NaiveDate,
        latest: NaiveDate,
    },
}

/// The strictly time-ordered filings of one entity. Each pushed filing is
/// diffed against the one before it.
#[derive(Debug, Clone)]
pub struct FilingHistory {
    entity_id: String,
    filings: Vec<Filing>,
}

impl FilingHistory {
    pub fn new(entity_id: &str) -> Self {
        FilingHistory {
            entity_id: entity_id.to_string(),
            filings: Vec::new(),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn latest(&self) -> Option<&Filing> {
        self.filings.last()
    }

    pub fn len(&self) -> usize {
        self.filings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filings.is_empty()
    }

    pub fn filings(&self) -> &[Filing] {
        &self.filings
    }

    pub fn contains(&self, filing_id: &str) -> bool {
        self.filings.iter().any(|f| f.filing_id == filing_id)
    }

    /// Append a filing and return its changes against the previous one
    pub fn push(&mut self, filing: Filing) -> Result<Vec<ChangeRecord>, HistoryError> {
        if filing.entity_id != self.entity_id {
            return Err(HistoryError::EntityMismatch {
                filing_id: filing.filing_id,
                expected: self.entity_id.clone(),
                found: filing.entity_id,
            });
        }

        if self.contains(&filing.filing_id) {
            return Err(HistoryError::DuplicateFiling(filing.filing_id));
        }

        if let Some(existing) = self
            .filings
            .iter()
            .find(|f| f.document_digest == filing.document_digest)
        {
            return Err(HistoryError::DuplicateDocument {
                filing_id: filing.filing_id,
                existing: existing.filing_id.clone(),
            });
        }

        if let Some(latest) = self.latest() {
            if filing.filing_date <= latest.filing_date {
                return Err(HistoryError::OutOfOrder {
                    filing_id: filing.filing_id,
                    filing_date: filing.filing_date,
                    latest: latest.filing_date,
                });
            }
        }

        let changes = diff(&filing, self.latest());
        tracing::info!(
            entity_id = %self.entity_id,
            filing_id = %filing.filing_id,
            changes = changes.len(),
            "filing added to history"
        );
        self.filings.push(filing);
        Ok(changes)
    }

    /// Changes of the filing `filing_id` against its predecessor
    pub fn changes_for(&self, filing_id: &str) -> Option<Vec<ChangeRecord>> {
        let idx = self.filings.iter().position(|f| f.filing_id == filing_id)?;
        let previous = idx.checked_sub(1).map(|p| &self.filings[p]);
        Some(diff(&self.filings[idx], previous))
    }
}

// ============================================================================
// TESTS
// ============================================================================
