use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::AccrualPolicy;
use crate::model::leave_request::LeaveType;
use crate::utils::dates::same_month;

/// Key in `system_settings` holding the last monthly allocation timestamp.
pub const LAST_ALLOCATION_KEY: &str = "last_leave_allocation";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveBalance {
    pub employee_id: u64,
    pub casual: f64,
    pub sick: f64,
    pub earned: f64,
    pub compensatory: f64,
    pub maternity: f64,
    pub paternity: f64,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_allocated_at: Option<DateTime<Utc>>,
}

impl LeaveBalance {
    pub fn empty(employee_id: u64) -> Self {
        Self { employee_id, ..Default::default() }
    }

    /// Counter backing a leave type. LWP and VACATION have none.
    pub fn available(&self, leave_type: LeaveType) -> Option<f64> {
        match leave_type {
            LeaveType::Casual => Some(self.casual),
            LeaveType::Sick => Some(self.sick),
            LeaveType::Earned => Some(self.earned),
            LeaveType::Compensatory => Some(self.compensatory),
            LeaveType::Maternity => Some(self.maternity),
            LeaveType::Paternity => Some(self.paternity),
            LeaveType::Lwp | LeaveType::Vacation => None,
        }
    }

    fn counter_mut(&mut self, leave_type: LeaveType) -> Option<&mut f64> {
        match leave_type {
            LeaveType::Casual => Some(&mut self.casual),
            LeaveType::Sick => Some(&mut self.sick),
            LeaveType::Earned => Some(&mut self.earned),
            LeaveType::Compensatory => Some(&mut self.compensatory),
            LeaveType::Maternity => Some(&mut self.maternity),
            LeaveType::Paternity => Some(&mut self.paternity),
            LeaveType::Lwp | LeaveType::Vacation => None,
        }
    }

    /// Subtracts `days` from the matching counter, clamped at zero.
    /// Returns false for types that carry no balance.
    pub fn debit(&mut self, leave_type: LeaveType, days: f64) -> bool {
        match self.counter_mut(leave_type) {
            Some(counter) => {
                *counter = (*counter - days).max(0.0);
                true
            }
            None => false,
        }
    }

    /// Adds one month of accrual, each counter capped by the policy.
    /// A counter already above its cap keeps its value.
    pub fn accrue(&mut self, policy: &AccrualPolicy, at: DateTime<Utc>) {
        self.casual = accrue_counter(self.casual, policy.casual_per_month, policy.casual_cap);
        self.sick = accrue_counter(self.sick, policy.sick_per_month, policy.sick_cap);
        self.earned = accrue_counter(self.earned, policy.earned_per_month, policy.earned_cap);
        self.last_allocated_at = Some(at);
    }
}

fn accrue_counter(counter: f64, amount: f64, cap: f64) -> f64 {
    if counter < cap { (counter + amount).min(cap) } else { counter }
}

/// Monthly allocation runs at most once per calendar month, judged in the
/// time zone of `now`.
pub fn allocation_allowed<Tz: TimeZone>(last: Option<DateTime<Utc>>, now: &DateTime<Tz>) -> bool {
    match last {
        Some(last) => !same_month(last.with_timezone(&now.timezone()).date_naive(), now.date_naive()),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
    }

    #[test]
    fn debit_subtracts_requested_duration() {
        let mut balance = LeaveBalance { casual: 5.0, ..LeaveBalance::empty(3) };
        assert!(balance.debit(LeaveType::Casual, 2.5));
        assert_eq!(balance.casual, 2.5);
    }

    #[test]
    fn debit_clamps_at_zero() {
        let mut balance = LeaveBalance { sick: 1.0, ..LeaveBalance::empty(3) };
        assert!(balance.debit(LeaveType::Sick, 4.0));
        assert_eq!(balance.sick, 0.0);
    }

    #[test]
    fn lwp_and_vacation_leave_balance_untouched() {
        let mut balance = LeaveBalance { casual: 2.0, earned: 3.0, ..LeaveBalance::empty(3) };
        let before = balance.clone();
        assert!(!balance.debit(LeaveType::Lwp, 2.0));
        assert!(!balance.debit(LeaveType::Vacation, 2.0));
        assert_eq!(balance, before);
    }

    #[test]
    fn accrual_respects_caps() {
        let policy = AccrualPolicy::default();
        let mut balance = LeaveBalance { casual: 11.5, earned: 10.0, ..LeaveBalance::empty(3) };
        balance.accrue(&policy, at(2026, 10, 1));
        assert_eq!(balance.casual, 12.0);
        assert_eq!(balance.sick, 1.0);
        assert_eq!(balance.earned, 11.5);
        assert_eq!(balance.last_allocated_at, Some(at(2026, 10, 1)));
    }

    #[test]
    fn allocation_disabled_within_same_calendar_month() {
        let now = at(2026, 10, 16);
        assert!(!allocation_allowed(Some(at(2026, 10, 1)), &now));
        assert!(allocation_allowed(Some(at(2026, 9, 30)), &now));
        assert!(allocation_allowed(Some(at(2025, 10, 16)), &now));
        assert!(allocation_allowed(None, &now));
    }

    #[test]
    fn allocation_month_follows_local_calendar() {
        let local = FixedOffset::west_opt(5 * 3600).unwrap();
        // 22:00 local on Oct 31 is already Nov 1 in UTC.
        let last = local.with_ymd_and_hms(2026, 10, 31, 22, 0, 0).unwrap().with_timezone(&Utc);
        let now = local.with_ymd_and_hms(2026, 11, 15, 10, 0, 0).unwrap();
        assert!(allocation_allowed(Some(last), &now));

        let earlier_today = local.with_ymd_and_hms(2026, 11, 15, 8, 0, 0).unwrap().with_timezone(&Utc);
        assert!(!allocation_allowed(Some(earlier_today), &now));
    }

    #[test]
    fn accrual_keeps_counters_already_above_cap() {
        let policy = AccrualPolicy { casual_cap: 10.0, ..AccrualPolicy::default() };
        let mut balance = LeaveBalance { casual: 14.0, sick: 2.0, ..LeaveBalance::empty(3) };
        balance.accrue(&policy, at(2026, 11, 1));
        assert_eq!(balance.casual, 14.0);
        assert_eq!(balance.sick, 3.0);
    }
}
