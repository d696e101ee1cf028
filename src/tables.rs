// File: ./src/tables.rs
//! The three static lookup tables behind the church-year resolver.
//!
//! All three are process-wide constants, built once and never mutated, so
//! they can be read from any thread without locking.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Fixed feasts keyed by civil (month, day). At most one name per key; a
/// feast here wins over the season computation for that exact date.
pub static FIXED_FEASTS: Lazy<HashMap<(u32, u32), &'static str>> = Lazy::new(|| {
    HashMap::from([
        ((1, 1), "New Year's Day"),
        ((1, 6), "Epiphany"),
        ((1, 25), "Conversion of St Paul"),
        ((2, 2), "Presentation of Christ"),
        ((2, 24), "St Matthias"),
        ((3, 25), "Annunciation"),
        ((4, 25), "St Mark"),
        ((5, 1), "St Philip and St James"),
        ((6, 11), "St Barnabas"),
        ((6, 24), "St John the Baptist"),
        ((6, 29), "St Peter"),
        ((7, 22), "St Mary Magdalene"),
        ((7, 25), "St James"),
        ((8, 6), "Transfiguration"),
        ((8, 24), "St Bartholomew"),
        ((9, 21), "St Matthew"),
        ((9, 29), "St Michael and All Angels"),
        ((10, 18), "St Luke"),
        ((10, 28), "St Simon and St Jude"),
        ((10, 31), "Reformation Day"),
        ((11, 1), "All Saints"),
        ((11, 30), "St Andrew"),
        ((12, 21), "St Thomas"),
        ((12, 24), "Christmas Eve"),
        ((12, 25), "Christmas Day"),
        ((12, 26), "Boxing Day"),
        ((12, 27), "St John the Evangelist"),
        ((12, 28), "Holy Innocents"),
    ])
});

/// Names keyed by signed day offset from Easter Sunday. Domain [-63, 56];
/// anything outside falls through to the season counters. Offsets that are
/// multiples of 7 name Sundays, the rest name weekdays of Holy Week,
/// Ash Wednesday and Ascension Day.
pub static EASTER_OFFSETS: Lazy<HashMap<i64, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (-63, "Septuagesima"),
        (-56, "Sexagesima"),
        (-49, "Quinquagesima"),
        (-46, "Ash Wednesday"),
        (-42, "Lent 1"),
        (-35, "Lent 2"),
        (-28, "Lent 3"),
        (-21, "Lent 4"),
        (-14, "Lent 5"),
        (-7, "Palm Sunday"),
        (-3, "Maundy Thursday"),
        (-2, "Good Friday"),
        (-1, "Easter Eve"),
        (0, "Easter Day"),
        (7, "Easter 1"),
        (14, "Easter 2"),
        (21, "Easter 3"),
        (28, "Easter 4"),
        (35, "Easter 5"),
        (40, "Ascension Day"),
        (42, "Ascension 1"),
        (49, "Pentecost"),
        (56, "Trinity"),
    ])
});

/// The church year starts five weeks before Christmas. Indexed by whole
/// weeks before Christmas Day minus one (week 1 = Advent 4).
pub static CHRISTMAS_RELATIVE: [&str; 5] = [
    "Advent 4",
    "Advent 3",
    "Advent 2",
    "Advent 1",
    "Christ the King",
];

pub fn fixed_feast(month: u32, day: u32) -> Option<&'static str> {
    FIXED_FEASTS.get(&(month, day)).copied()
}

pub fn easter_offset_name(days: i64) -> Option<&'static str> {
    EASTER_OFFSETS.get(&days).copied()
}

/// True if `name` denotes an exact-day observance (a fixed feast or a
/// named weekday such as Good Friday) rather than a Sunday or week.
pub fn is_special_day(name: &str) -> bool {
    if FIXED_FEASTS.values().any(|&v| v == name) {
        return true;
    }
    EASTER_OFFSETS
        .iter()
        .any(|(&off, &n)| n == name && off.rem_euclid(7) != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_stay_in_domain() {
        for &off in EASTER_OFFSETS.keys() {
            assert!((-63..=56).contains(&off), "offset {off} outside table domain");
        }
    }

    #[test]
    fn every_sunday_offset_is_covered() {
        // The resolver relies on the table being total over Sunday offsets
        // within its domain, so the governing-Sunday path never misses.
        let mut off = -63;
        while off <= 56 {
            assert!(
                easter_offset_name(off).is_some(),
                "no name for Sunday offset {off}"
            );
            off += 7;
        }
    }

    #[test]
    fn weekday_entries_are_special() {
        for name in ["Ash Wednesday", "Maundy Thursday", "Good Friday", "Easter Eve", "Ascension Day"] {
            assert!(is_special_day(name), "{name} should be special");
        }
        for name in ["Palm Sunday", "Easter Day", "Pentecost", "Trinity", "Septuagesima"] {
            assert!(!is_special_day(name), "{name} should not be special");
        }
    }

    #[test]
    fn fixed_feasts_are_valid_dates() {
        for &(month, day) in FIXED_FEASTS.keys() {
            assert!((1..=12).contains(&month));
            assert!(chrono::NaiveDate::from_ymd_opt(2000, month, day).is_some());
        }
    }
}
