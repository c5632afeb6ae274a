// 📅 Filing Calendar - when quarterly holdings filings show up
// Holdings reports are due 45 days after quarter end, so they cluster in
// February, May, August and November.

use chrono::{Datelike, NaiveDate};

/// True inside the months quarterly holdings filings are due
pub fn is_13f_filing_window(date: NaiveDate) -> bool {
    matches!(date.month(), 2 | 5 | 8 | 11)
}

/// Estimate the quarter a filing reports on from its filing date.
///
/// Jan-Feb → Dec 31 of the prior year, Mar-May → Mar 31, Jun-Aug → Jun 30,
/// Sep-Nov → Sep 30, Dec → Dec 31.
pub fn quarter_end_for_filing_date(filing_date: NaiveDate) -> NaiveDate {
    let year = filing_date.year();
    let (y, m, d) = match filing_date.month() {
        1 | 2 => (year - 1, 12, 31),
        3..=5 => (year, 3, 31),
        6..=8 => (year, 6, 30),
        9..=11 => (year, 9, 30),
        _ => (year, 12, 31),
    };
    // Every (month, day) above is a valid calendar date
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(filing_date)
}
