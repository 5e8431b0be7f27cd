//! Timestamp utilities

use chrono::{DateTime, SubsecRound, Utc};

/// Current UTC timestamp at millisecond precision
///
/// Stored timestamps round-trip through SQLite text exactly at this precision.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
