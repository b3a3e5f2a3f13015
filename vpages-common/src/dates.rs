//! Date parsing and open-ended intervals
//!
//! Dates arrive from three places with different shapes: CSV cells (`2015-06-01`, `2015`),
//! SPARQL bindings (`2015-06-01T00:00:00Z`) and Wikibase time values
//! (`+2015-06-01T00:00:00Z`). Reduced-precision dates resolve to their first day.

use chrono::NaiveDate;

/// Parse any of the accepted date shapes
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);
    let date_part = trimmed.split('T').next().unwrap_or(trimmed);

    let mut parts = date_part.splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(d) => d.parse().ok()?,
        None => 1,
    };

    // Wikibase encodes unknown month/day as 00
    NaiveDate::from_ymd_opt(year, month.max(1), day.max(1))
}

/// Parse an optional date cell, treating blanks as absent
pub fn parse_optional_date(value: Option<&str>) -> Option<NaiveDate> {
    value.filter(|v| !v.trim().is_empty()).and_then(parse_date)
}

/// Closed interval with optionally open ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interval {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Interval {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// True when the two intervals share at least one day; open ends extend forever
    pub fn overlaps(&self, other: &Interval) -> bool {
        let starts_before_other_ends = match (self.start, other.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        };
        let ends_after_other_starts = match (self.end, other.start) {
            (Some(e), Some(s)) => e >= s,
            _ => true,
        };
        starts_before_other_ends && ends_after_other_starts
    }
}
