use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::utils::dates::inclusive_days;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum LeaveType {
    Casual,
    Sick,
    Earned,
    Compensatory,
    Maternity,
    Paternity,
    /// Leave without pay; never touches a balance, deducted in payroll instead.
    Lwp,
    Vacation,
}

impl LeaveType {
    /// Types whose approval does not debit a balance counter.
    pub fn is_unbalanced(self) -> bool {
        matches!(self, LeaveType::Lwp | LeaveType::Vacation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "CASUAL")]
    pub leave_type: String,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub half_day: bool,
    /// Days requested; 0.5 for a half day.
    pub duration: f64,
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    pub reviewed_by: Option<u64>,
    pub review_note: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum DurationError {
    EndBeforeStart,
    HalfDaySpansDays,
}

impl std::fmt::Display for DurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DurationError::EndBeforeStart => f.write_str("start_date cannot be after end_date"),
            DurationError::HalfDaySpansDays => {
                f.write_str("half day leave must start and end on the same date")
            }
        }
    }
}

/// Inclusive calendar-day duration of a request.
pub fn leave_duration(start: NaiveDate, end: NaiveDate, half_day: bool) -> Result<f64, DurationError> {
    if start > end {
        return Err(DurationError::EndBeforeStart);
    }
    if half_day {
        if start != end {
            return Err(DurationError::HalfDaySpansDays);
        }
        return Ok(0.5);
    }
    Ok(inclusive_days(start, end) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_leave_type_case_insensitively() {
        assert_eq!("casual".parse::<LeaveType>().unwrap(), LeaveType::Casual);
        assert_eq!("LWP".parse::<LeaveType>().unwrap(), LeaveType::Lwp);
        assert_eq!(LeaveType::Compensatory.as_ref(), "COMPENSATORY");
        assert!("holiday".parse::<LeaveType>().is_err());
    }

    #[test]
    fn unbalanced_types() {
        assert!(LeaveType::Lwp.is_unbalanced());
        assert!(LeaveType::Vacation.is_unbalanced());
        assert!(!LeaveType::Sick.is_unbalanced());
    }

    #[test]
    fn duration_counts_inclusive_days() {
        assert_eq!(leave_duration(d(2026, 3, 2), d(2026, 3, 4), false), Ok(3.0));
        assert_eq!(leave_duration(d(2026, 3, 2), d(2026, 3, 2), false), Ok(1.0));
        assert_eq!(leave_duration(d(2026, 3, 2), d(2026, 3, 2), true), Ok(0.5));
    }

    #[test]
    fn duration_rejects_bad_ranges() {
        assert_eq!(
            leave_duration(d(2026, 3, 4), d(2026, 3, 2), false),
            Err(DurationError::EndBeforeStart)
        );
        assert_eq!(
            leave_duration(d(2026, 3, 2), d(2026, 3, 3), true),
            Err(DurationError::HalfDaySpansDays)
        );
    }
}
