use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "09:05:00")]
    pub punch_in: NaiveTime,
    pub punch_in_lat: Option<f64>,
    pub punch_in_lng: Option<f64>,
    pub punch_in_address: Option<String>,
    #[schema(value_type = Option<String>, example = "18:10:00")]
    pub punch_out: Option<NaiveTime>,
    pub punch_out_lat: Option<f64>,
    pub punch_out_lng: Option<f64>,
    pub punch_out_address: Option<String>,
    pub worked_minutes: Option<i64>,
    /// `open` until punch-out, then `present` or `half_day`.
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Open,
    Present,
    HalfDay,
}

/// What the self-service screen should offer next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PunchAction {
    PunchIn,
    PunchOut,
    Completed,
}

impl PunchAction {
    pub fn for_today(record: Option<&Attendance>) -> Self {
        match record {
            None => PunchAction::PunchIn,
            Some(r) if r.punch_out.is_none() => PunchAction::PunchOut,
            Some(_) => PunchAction::Completed,
        }
    }
}

/// Minutes between punch-in and punch-out, or `None` when punch-out is earlier.
pub fn worked_minutes(punch_in: NaiveTime, punch_out: NaiveTime) -> Option<i64> {
    let minutes = (punch_out - punch_in).num_minutes();
    (minutes >= 0).then_some(minutes)
}

pub fn status_for_minutes(minutes: i64, full_day_hours: f64) -> AttendanceStatus {
    if minutes as f64 >= full_day_hours * 60.0 {
        AttendanceStatus::Present
    } else {
        AttendanceStatus::HalfDay
    }
}

/// Hours rounded to two decimals for display.
pub fn minutes_to_hours(minutes: i64) -> f64 {
    (minutes as f64 / 60.0 * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DayStatus {
    Present,
    HalfDay,
    Absent,
    Holiday,
    Weekend,
    Upcoming,
}

/// Classifies a calendar day. Holidays outrank weekends, and a worked day
/// always shows as worked even when it is a holiday.
pub fn classify_day(
    date: NaiveDate,
    today: NaiveDate,
    record: Option<&Attendance>,
    is_holiday: bool,
) -> DayStatus {
    if let Some(r) = record {
        return match r.status.parse::<AttendanceStatus>() {
            Ok(AttendanceStatus::HalfDay) => DayStatus::HalfDay,
            _ => DayStatus::Present,
        };
    }
    if date > today {
        return if is_holiday { DayStatus::Holiday } else { DayStatus::Upcoming };
    }
    if is_holiday {
        return DayStatus::Holiday;
    }
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return DayStatus::Weekend;
    }
    DayStatus::Absent
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEditRequest {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = String)]
    pub punch_in: NaiveTime,
    #[schema(value_type = String)]
    pub punch_out: NaiveTime,
    pub reason: String,
    pub status: String,
    pub reviewed_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn record(status: &str, punch_out: Option<NaiveTime>) -> Attendance {
        Attendance {
            id: 1,
            employee_id: 7,
            date: d(2026, 10, 14),
            punch_in: t(9, 0),
            punch_in_lat: None,
            punch_in_lng: None,
            punch_in_address: None,
            punch_out,
            punch_out_lat: None,
            punch_out_lng: None,
            punch_out_address: None,
            worked_minutes: None,
            status: status.to_string(),
        }
    }

    #[test]
    fn no_record_today_offers_punch_in() {
        assert_eq!(PunchAction::for_today(None), PunchAction::PunchIn);
    }

    #[test]
    fn open_record_offers_punch_out() {
        let open = record("open", None);
        assert_eq!(PunchAction::for_today(Some(&open)), PunchAction::PunchOut);

        let done = record("present", Some(t(18, 0)));
        assert_eq!(PunchAction::for_today(Some(&done)), PunchAction::Completed);
    }

    #[test]
    fn worked_minutes_rejects_inverted_times() {
        assert_eq!(worked_minutes(t(9, 15), t(17, 45)), Some(510));
        assert_eq!(worked_minutes(t(9, 0), t(9, 0)), Some(0));
        assert_eq!(worked_minutes(t(18, 0), t(9, 0)), None);
    }

    #[test]
    fn status_depends_on_full_day_threshold() {
        assert_eq!(status_for_minutes(480, 8.0), AttendanceStatus::Present);
        assert_eq!(status_for_minutes(479, 8.0), AttendanceStatus::HalfDay);
        assert_eq!(minutes_to_hours(510), 8.5);
    }

    #[test]
    fn classify_calendar_days() {
        let today = d(2026, 10, 16); // Friday
        let half = record("half_day", Some(t(12, 0)));
        let full = record("present", Some(t(18, 0)));

        assert_eq!(classify_day(d(2026, 10, 14), today, Some(&full), false), DayStatus::Present);
        assert_eq!(classify_day(d(2026, 10, 14), today, Some(&half), true), DayStatus::HalfDay);
        assert_eq!(classify_day(d(2026, 10, 15), today, None, false), DayStatus::Absent);
        assert_eq!(classify_day(d(2026, 10, 11), today, None, false), DayStatus::Weekend);
        assert_eq!(classify_day(d(2026, 10, 2), today, None, true), DayStatus::Holiday);
        assert_eq!(classify_day(d(2026, 10, 20), today, None, false), DayStatus::Upcoming);
        assert_eq!(classify_day(d(2026, 10, 20), today, None, true), DayStatus::Holiday);
    }
}
