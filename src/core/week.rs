//! ISO week keys for attendance tracking
//!
//! Two dates map to the same key iff they fall in the same ISO week, which is
//! how attendance is tested without storing raw timestamps.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, Utc};

/// An ISO (year, week) pair identifying a 7-day reporting window.
///
/// Serialized as "YYYY-Www" (e.g. "2026-W35") in the attendance table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    /// The ISO week containing the given instant.
    pub fn for_date(dt: DateTime<Utc>) -> Self {
        let iso = dt.iso_week();
        WeekKey {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// The ISO week containing "now minus seven days". Used by the weekly
    /// tick, which always finalizes the week that has just ended.
    pub fn previous(now: DateTime<Utc>) -> Self {
        Self::for_date(now - Duration::days(7))
    }

    /// The ISO week containing the current instant.
    pub fn current() -> Self {
        Self::for_date(Utc::now())
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}
