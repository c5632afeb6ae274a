// Disclosure Tracker - Core Library
// Regulatory disclosures in, normalized holdings, period diffs and
// net-worth ranges out.

pub mod amount;          // Bracketed amount strings → numeric ranges
pub mod diagnostics;     // Warnings, parse outcomes, run reports
pub mod disclosure;      // Legislator PTR + annual disclosure records
pub mod filing;          // 13F filings and holdings
pub mod logging;
pub mod parser;          // 13F XML, PTR HTML, annual disclosure HTML
pub mod reconciliation;  // Net-worth ranges
pub mod resolver;        // Identity code → trading symbol
pub mod rules;           // Asset category keyword rules
pub mod schedule;        // 13F filing calendar
pub mod temporal;        // Period-over-period diffs

// Re-export commonly used types
pub use amount::{normalize_amount, NormalizedAmount, RangeValue};
pub use diagnostics::{
    EntityOutcome, EntityRecord, ParseResult, ParseWarning, RunReport, WarningKind,
};
pub use disclosure::{
    AnnualDisclosure, AssetLine, IncomeSource, LiabilityLine, StockTransaction,
    TransactionReport, TransactionType,
};
pub use filing::{Derivative, Filing, FilingMeta, HoldingRecord, QuantityType, VotingAuthority};
pub use parser::{
    detect_kind, get_parser, parse, AnnualDisclosureParser, DisclosureParser, DocumentKind,
    HoldingsParser, ParsedDocument, TransactionReportParser,
};
pub use reconciliation::{NetWorthReconciler, NetWorthSnapshot};
pub use resolver::{
    BatchLookup, BatchResolution, CompanyNameTable, IdentityResolver, LookupError, Resolved, ResolutionSource,
    ResolverConfig, RetryPolicy, Throttle,
};
pub use rules::{AssetCategory, AssetClassifier, CategoryRule};
pub use temporal::{diff, ChangeKind, ChangeRecord, ChangeSummary, FilingHistory, HistoryError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
