//! Calendar helpers shared by attendance, leave, payroll and birthdays.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};

/// Formats tried, in order, when reading a date typed into a free-text field.
/// Day-first shapes win over month-first ones when both would parse.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%d.%m.%Y",
    "%m/%d/%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

/// Parses a stored date string in any of the shapes employees' records use.
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S"))
        .map(|dt| dt.date())
        .ok()
}

/// The date a birthday (month/day of `birth`) is observed in `year`.
/// Feb 29 falls back to Feb 28 in non-leap years.
pub fn anniversary_in(birth: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth.month(), birth.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, birth.month(), birth.day() - 1))
}

/// Days from `today` until the next observed birthday; 0 when it is today.
pub fn days_until_birthday(birth: NaiveDate, today: NaiveDate) -> Option<i64> {
    let this_year = anniversary_in(birth, today.year())?;
    let next = if this_year >= today {
        this_year
    } else {
        anniversary_in(birth, today.year() + 1)?
    };
    Some((next - today).num_days())
}

/// Number of calendar days in `start..=end`; zero when the range is inverted.
pub fn inclusive_days(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        0
    } else {
        (end - start).num_days() + 1
    }
}

pub fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

pub fn last_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (ny, nm) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(ny, nm, 1).map(|d| d - Duration::days(1))
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    last_of_month(year, month).map(|d| d.day())
}

/// Number of days of `start..=end` that fall inside `from..=to`.
pub fn overlap_days(start: NaiveDate, end: NaiveDate, from: NaiveDate, to: NaiveDate) -> i64 {
    inclusive_days(start.max(from), end.min(to))
}

/// True when both timestamps fall in the same calendar month.
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Local `YYYY-MM-DD` key used for calendar maps.
pub fn day_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_common_shapes() {
        let expected = d(1990, 7, 14);
        for raw in [
            "1990-07-14",
            "1990/07/14",
            "14-07-1990",
            "14/07/1990",
            "14.07.1990",
            "14 Jul 1990",
            "14 July 1990",
            "Jul 14, 1990",
            "July 14, 1990",
            "1990-07-14T00:00:00Z",
            "1990-07-14T08:30:00",
        ] {
            assert_eq!(parse_flexible_date(raw), Some(expected), "{raw}");
        }
    }

    #[test]
    fn month_first_used_only_when_day_first_fails() {
        // 07/25 cannot be day/month, so it is read as July 25.
        assert_eq!(parse_flexible_date("07/25/1990"), Some(d(1990, 7, 25)));
        // 05/06 is ambiguous and read day-first.
        assert_eq!(parse_flexible_date("05/06/1990"), Some(d(1990, 6, 5)));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_flexible_date(""), None);
        assert_eq!(parse_flexible_date("not a date"), None);
    }

    #[test]
    fn birthday_today_is_zero() {
        assert_eq!(days_until_birthday(d(1990, 10, 16), d(2026, 10, 16)), Some(0));
    }

    #[test]
    fn birthday_already_passed_wraps_to_next_year() {
        assert_eq!(days_until_birthday(d(1990, 10, 15), d(2026, 10, 16)), Some(364));
    }

    #[test]
    fn birthday_across_new_year() {
        assert_eq!(days_until_birthday(d(1985, 1, 2), d(2026, 12, 30)), Some(3));
    }

    #[test]
    fn leap_day_birthday_observed_on_feb_28() {
        assert_eq!(days_until_birthday(d(2000, 2, 29), d(2027, 2, 26)), Some(2));
        assert_eq!(days_until_birthday(d(2000, 2, 29), d(2028, 2, 26)), Some(3));
    }

    #[test]
    fn month_bounds() {
        assert_eq!(last_of_month(2028, 2), Some(d(2028, 2, 29)));
        assert_eq!(last_of_month(2026, 12), Some(d(2026, 12, 31)));
        assert_eq!(days_in_month(2026, 4), Some(30));
    }

    #[test]
    fn overlap_counts_shared_days() {
        let from = d(2026, 3, 1);
        let to = d(2026, 3, 31);
        assert_eq!(overlap_days(d(2026, 2, 27), d(2026, 3, 2), from, to), 2);
        assert_eq!(overlap_days(d(2026, 4, 1), d(2026, 4, 2), from, to), 0);
        assert_eq!(inclusive_days(d(2026, 3, 5), d(2026, 3, 5)), 1);
    }
}
