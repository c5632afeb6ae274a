// 🌐 Batch Lookup - external code → symbol mapping service seam

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Most codes accepted by one lookup call
pub const MAX_BATCH_SIZE: usize = 100;

/// One confirmed mapping returned by a lookup service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupMapping {
    pub symbol: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// Provider asked us to slow down (HTTP 429 or equivalent)
    #[error("lookup throttled by provider")]
    Throttled { retry_after: Option<Duration> },

    /// Network failure, bad response, anything not worth retrying
    #[error("lookup unavailable: {0}")]
    Unavailable(String),
}

impl LookupError {
    pub fn is_throttled(&self) -> bool {
        matches!(self, LookupError::Throttled { .. })
    }
}

/// External batch mapping service. Receives at most `MAX_BATCH_SIZE`
/// normalized codes and returns the ones it could map; codes missing from
/// the result are simply unknown to the provider.
pub trait BatchLookup: Send + Sync {
    fn lookup(&self, codes: &[String]) -> Result<HashMap<String, LookupMapping>, LookupError>;

    /// Provider name for logs
    fn name(&self) -> &str {
        "batch-lookup"
    }
}
