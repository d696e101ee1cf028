// File: ./src/calendar.rs
//! Church-year resolution: maps a civil date onto the name(s) of its
//! observance(s).
//!
//! Dates are resolved against three tables (fixed feasts, Easter offsets,
//! Advent/Christ-the-King weeks before Christmas); the long stretches the
//! tables do not cover get a counted season name ("Epiphany N" before Lent,
//! "Trinity N" after Pentecost).

use crate::easter;
use crate::tables;
use chrono::{Datelike, Duration, NaiveDate};

/// Outcome of resolving a single date against the season tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A named day or Sunday of the church year.
    Name(String),
    /// A weekday no table entry covers. Callers wanting the governing
    /// Sunday's name must resolve that Sunday instead.
    Unresolved(NaiveDate),
}

impl Resolution {
    pub fn name(&self) -> Option<&str> {
        match self {
            Resolution::Name(n) => Some(n),
            Resolution::Unresolved(_) => None,
        }
    }
}

/// One applicable observance for a date. `special` marks exact-day names
/// (fixed feasts, named weekdays); Sunday propers carry `special == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observance {
    pub name: String,
    pub special: bool,
}

/// Signed days from Easter Sunday of `d`'s civil year to `d`.
pub fn easter_offset(d: NaiveDate) -> i64 {
    (d - easter::easter_sunday(d.year())).num_days()
}

/// Shifts `d` back to the most recent Sunday (identity if already Sunday).
pub fn previous_sunday(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.weekday().num_days_from_sunday() as i64)
}

/// Resolves `d` to its primary name in the church year.
///
/// With `include_fixed_feasts`, a fixed feast on the exact (month, day)
/// wins outright. Otherwise the date is placed relative to Easter; offsets
/// within [-63, 56] come straight from the table, everything outside is
/// reconciled against Epiphany or the upcoming Christmas. No Sunday
/// normalisation happens here; see [`names_for`].
pub fn resolve(d: NaiveDate, include_fixed_feasts: bool) -> Resolution {
    if include_fixed_feasts
        && let Some(feast) = tables::fixed_feast(d.month(), d.day())
    {
        return Resolution::Name(feast.to_string());
    }

    let days = easter_offset(d);
    log::debug!("{} is {} days from Easter", d, days);

    if days < -63 {
        // Between Christmas season and Septuagesima: count from Epiphany.
        let epiphany = NaiveDate::from_ymd_opt(d.year(), 1, 6).unwrap();
        if d < epiphany {
            return Resolution::Name("Christmas 2".to_string());
        }
        let week = 1 + (d - epiphany).num_days() / 7;
        return Resolution::Name(format!("Epiphany {week}"));
    }

    if days > 56 {
        // After Trinity Sunday: reconcile against the upcoming Christmas.
        let christmas = NaiveDate::from_ymd_opt(d.year(), 12, 25).unwrap();
        if christmas < d {
            return Resolution::Name("Christmas 1".to_string());
        }
        // Ceiling division, clamped so Christmas Day itself counts as the
        // fourth Advent week rather than underflowing the table.
        let weeks_before_christmas = (((christmas - d).num_days() + 6) / 7).max(1);
        if weeks_before_christmas < 6 {
            let name = tables::CHRISTMAS_RELATIVE[(weeks_before_christmas - 1) as usize];
            return Resolution::Name(name.to_string());
        }
        return Resolution::Name(format!("Trinity {}", (days - 56) / 7));
    }

    match tables::easter_offset_name(days) {
        Some(name) => Resolution::Name(name.to_string()),
        None => Resolution::Unresolved(d),
    }
}

/// Every observance applicable to `d`, exact-day names first.
///
/// The exact date is resolved with fixed feasts honoured; if that yields an
/// exact-day name (a feast or a named weekday such as Good Friday) it leads
/// the result. The governing Sunday is then resolved against the season
/// tables only and appended unless it duplicates the first entry. A date
/// can therefore carry two names, e.g. Boxing Day alongside the propers of
/// the Sunday it falls on.
///
/// Never empty: the offset table is total over Sunday offsets in its
/// domain and the season counters cover everything outside it.
pub fn names_for(d: NaiveDate) -> Vec<Observance> {
    let mut out = Vec::new();

    if let Resolution::Name(name) = resolve(d, true)
        && tables::is_special_day(&name)
    {
        out.push(Observance { name, special: true });
    }

    if let Resolution::Name(name) = resolve(previous_sunday(d), false)
        && !out.iter().any(|o| o.name == name)
    {
        out.push(Observance { name, special: false });
    }

    out
}
