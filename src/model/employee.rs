use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EmployeeStatus {
    Active,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "address": "Dhaka",
        "department_id": 10,
        "designation": "Engineer",
        "date_of_birth": "14/07/1990",
        "joining_date": "2024-01-01",
        "monthly_salary": 50000.0,
        "pan": "ABCDE1234F",
        "qualification": "B.Sc",
        "bank_account": "0012345678",
        "status": "active",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    pub id: u64,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub department_id: Option<u64>,
    pub designation: Option<String>,

    /// Stored as entered; see `utils::dates::parse_flexible_date`.
    pub date_of_birth: Option<String>,

    #[schema(value_type = String, format = "date")]
    pub joining_date: NaiveDate,

    pub monthly_salary: f64,
    pub pan: Option<String>,
    pub qualification: Option<String>,
    pub bank_account: Option<String>,
    pub status: String,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        display_name(&self.first_name, self.last_name.as_deref())
    }
}

pub fn display_name(first: &str, last: Option<&str>) -> String {
    match last.map(str::trim).filter(|l| !l.is_empty()) {
        Some(last) => format!("{} {}", first.trim(), last),
        None => first.trim().to_string(),
    }
}

/// Columns HR/Admin may change through a partial update.
pub const ADMIN_EDITABLE_COLUMNS: &[&str] = &[
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "phone",
    "address",
    "department_id",
    "designation",
    "date_of_birth",
    "joining_date",
    "monthly_salary",
    "pan",
    "qualification",
    "bank_account",
];

/// Columns an employee may change on their own profile.
pub const SELF_EDITABLE_COLUMNS: &[&str] = &["phone", "address", "qualification", "pan", "bank_account"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_skips_blank_last_name() {
        assert_eq!(display_name("Asha", Some("  ")), "Asha");
        assert_eq!(display_name("Asha", Some("Rao")), "Asha Rao");
        assert_eq!(display_name(" Asha ", None), "Asha");
    }

    #[test]
    fn self_service_cannot_touch_compensation() {
        assert!(!SELF_EDITABLE_COLUMNS.contains(&"monthly_salary"));
        assert!(SELF_EDITABLE_COLUMNS.iter().all(|c| ADMIN_EDITABLE_COLUMNS.contains(c)));
    }

    #[test]
    fn status_strings() {
        assert_eq!(EmployeeStatus::Blocked.to_string(), "blocked");
        assert_eq!("active".parse::<EmployeeStatus>().unwrap(), EmployeeStatus::Active);
    }
}
