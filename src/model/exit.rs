use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResignationStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
    Completed,
}

impl ResignationStatus {
    /// A resignation in one of these states blocks a new submission.
    pub fn is_active(self) -> bool {
        matches!(self, ResignationStatus::Pending | ResignationStatus::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClearanceStatus {
    Pending,
    Cleared,
    OnHold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    InProgress,
    Completed,
}

impl TransferStatus {
    /// Knowledge transfer only moves forward.
    pub fn can_move_to(self, next: TransferStatus) -> bool {
        next > self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InterviewStatus {
    Scheduled,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Resignation {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub submitted_on: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub last_working_day: NaiveDate,
    pub reason: String,
    #[schema(example = "pending")]
    pub status: String,
    pub reviewed_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Clearance {
    pub id: u64,
    pub resignation_id: u64,
    #[schema(example = "IT")]
    pub department: String,
    #[schema(example = "pending")]
    pub status: String,
    pub remarks: Option<String>,
    pub cleared_by: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct KnowledgeTransfer {
    pub id: u64,
    pub resignation_id: u64,
    pub assignee_id: Option<u64>,
    pub topic: String,
    #[schema(example = "in_progress")]
    pub status: String,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ExitInterview {
    pub id: u64,
    pub resignation_id: u64,
    #[schema(value_type = String, format = "date")]
    pub scheduled_on: NaiveDate,
    pub interviewer_id: Option<u64>,
    pub feedback: Option<String>,
    pub rating: Option<u8>,
    #[schema(example = "scheduled")]
    pub status: String,
}

/// Last working day: the later of the requested date and the notice end.
pub fn last_working_day(submitted_on: NaiveDate, notice_days: i64, requested: Option<NaiveDate>) -> NaiveDate {
    let notice_end = submitted_on + Duration::days(notice_days.max(0));
    match requested {
        Some(r) if r > notice_end => r,
        _ => notice_end,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ExitProgress {
    pub resignation_id: u64,
    pub resignation_status: String,
    pub clearances_total: usize,
    pub clearances_cleared: usize,
    pub transfers_total: usize,
    pub transfers_completed: usize,
    pub interview_status: Option<String>,
    pub ready_for_offboarding: bool,
}

impl ExitProgress {
    pub fn summarize(
        resignation: &Resignation,
        clearances: &[Clearance],
        transfers: &[KnowledgeTransfer],
        interview: Option<&ExitInterview>,
    ) -> Self {
        let clearances_cleared = clearances
            .iter()
            .filter(|c| c.status == ClearanceStatus::Cleared.as_ref())
            .count();
        let transfers_completed = transfers
            .iter()
            .filter(|t| t.status == TransferStatus::Completed.as_ref())
            .count();
        let interview_done = interview
            .map(|i| i.status == InterviewStatus::Completed.as_ref())
            .unwrap_or(false);

        let ready = resignation.status == ResignationStatus::Accepted.as_ref()
            && clearances_cleared == clearances.len()
            && transfers_completed == transfers.len()
            && interview_done;

        Self {
            resignation_id: resignation.id,
            resignation_status: resignation.status.clone(),
            clearances_total: clearances.len(),
            clearances_cleared,
            transfers_total: transfers.len(),
            transfers_completed,
            interview_status: interview.map(|i| i.status.clone()),
            ready_for_offboarding: ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn resignation(status: &str) -> Resignation {
        Resignation {
            id: 9,
            employee_id: 4,
            submitted_on: d(2026, 9, 1),
            last_working_day: d(2026, 10, 1),
            reason: "relocating".into(),
            status: status.into(),
            reviewed_by: Some(1),
            created_at: Utc::now(),
        }
    }

    fn clearance(department: &str, status: &str) -> Clearance {
        Clearance {
            id: 1,
            resignation_id: 9,
            department: department.into(),
            status: status.into(),
            remarks: None,
            cleared_by: None,
            updated_at: Utc::now(),
        }
    }

    fn transfer(status: &str) -> KnowledgeTransfer {
        KnowledgeTransfer {
            id: 1,
            resignation_id: 9,
            assignee_id: Some(5),
            topic: "payroll runbook".into(),
            status: status.into(),
            updated_at: Utc::now(),
        }
    }

    fn interview(status: &str) -> ExitInterview {
        ExitInterview {
            id: 1,
            resignation_id: 9,
            scheduled_on: d(2026, 9, 28),
            interviewer_id: Some(2),
            feedback: None,
            rating: None,
            status: status.into(),
        }
    }

    #[test]
    fn notice_period_sets_minimum_last_day() {
        assert_eq!(last_working_day(d(2026, 9, 1), 30, None), d(2026, 10, 1));
        assert_eq!(last_working_day(d(2026, 9, 1), 30, Some(d(2026, 9, 15))), d(2026, 10, 1));
        assert_eq!(last_working_day(d(2026, 9, 1), 30, Some(d(2026, 10, 20))), d(2026, 10, 20));
    }

    #[test]
    fn transfer_only_moves_forward() {
        assert!(TransferStatus::Pending.can_move_to(TransferStatus::InProgress));
        assert!(TransferStatus::Pending.can_move_to(TransferStatus::Completed));
        assert!(!TransferStatus::Completed.can_move_to(TransferStatus::InProgress));
        assert!(!TransferStatus::InProgress.can_move_to(TransferStatus::InProgress));
    }

    #[test]
    fn ready_when_every_stage_done() {
        let progress = ExitProgress::summarize(
            &resignation("accepted"),
            &[clearance("IT", "cleared"), clearance("Finance", "cleared")],
            &[transfer("completed")],
            Some(&interview("completed")),
        );
        assert!(progress.ready_for_offboarding);
        assert_eq!(progress.clearances_cleared, 2);
    }

    #[test]
    fn held_clearance_blocks_offboarding() {
        let progress = ExitProgress::summarize(
            &resignation("accepted"),
            &[clearance("IT", "cleared"), clearance("Finance", "on_hold")],
            &[transfer("completed")],
            Some(&interview("completed")),
        );
        assert!(!progress.ready_for_offboarding);
        assert_eq!(progress.clearances_cleared, 1);
    }

    #[test]
    fn missing_interview_blocks_offboarding() {
        let progress = ExitProgress::summarize(&resignation("accepted"), &[], &[], None);
        assert!(!progress.ready_for_offboarding);
        assert_eq!(progress.interview_status, None);
    }

    #[test]
    fn active_statuses() {
        assert!(ResignationStatus::Pending.is_active());
        assert!(ResignationStatus::Accepted.is_active());
        assert!(!ResignationStatus::Withdrawn.is_active());
    }
}
