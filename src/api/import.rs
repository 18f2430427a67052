//! Bulk employee import from spreadsheet rows.
//!
//! The client parses the uploaded sheet and posts each data row as a
//! header → cell object. Headers are matched loosely so exports from
//! different HR tools load without manual renaming.

use crate::{
    api::employee::{CreateEmployee, insert_employee},
    auth::auth::AuthUser,
    error::ApiError,
    utils::dates::{day_key, parse_flexible_date},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{info, warn};
use utoipa::ToSchema;

pub const MAX_IMPORT_ROWS: usize = 1000;

/// Header aliases, keyed by their normalised form.
const HEADER_ALIASES: &[(&str, &str)] = &[
    ("employee_code", "employee_code"),
    ("emp_code", "employee_code"),
    ("emp_id", "employee_code"),
    ("employee_id", "employee_code"),
    ("code", "employee_code"),
    ("first_name", "first_name"),
    ("firstname", "first_name"),
    ("given_name", "first_name"),
    ("last_name", "last_name"),
    ("lastname", "last_name"),
    ("surname", "last_name"),
    ("name", "full_name"),
    ("full_name", "full_name"),
    ("employee_name", "full_name"),
    ("email", "email"),
    ("email_id", "email"),
    ("email_address", "email"),
    ("mail", "email"),
    ("phone", "phone"),
    ("mobile", "phone"),
    ("mobile_no", "phone"),
    ("phone_number", "phone"),
    ("contact", "phone"),
    ("address", "address"),
    ("department", "department"),
    ("dept", "department"),
    ("department_name", "department"),
    ("designation", "designation"),
    ("title", "designation"),
    ("job_title", "designation"),
    ("dob", "date_of_birth"),
    ("date_of_birth", "date_of_birth"),
    ("birth_date", "date_of_birth"),
    ("birthday", "date_of_birth"),
    ("doj", "joining_date"),
    ("date_of_joining", "joining_date"),
    ("joining_date", "joining_date"),
    ("join_date", "joining_date"),
    ("salary", "monthly_salary"),
    ("monthly_salary", "monthly_salary"),
    ("gross_salary", "monthly_salary"),
    ("ctc", "monthly_salary"),
    ("pan", "pan"),
    ("pan_no", "pan"),
    ("pan_number", "pan"),
    ("qualification", "qualification"),
    ("education", "qualification"),
    ("bank_account", "bank_account"),
    ("account_no", "bank_account"),
    ("bank_account_no", "bank_account"),
    ("account_number", "bank_account"),
];

/// Lowercases and collapses every run of non-alphanumerics into `_`.
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

pub fn canonical_field(header: &str) -> Option<&'static str> {
    let key = normalize_header(header);
    HEADER_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, field)| *field)
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Some(i.to_string()),
            (None, Some(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Spreadsheet serial day numbers count from 1899-12-30.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30).map(|epoch| epoch + Duration::days(serial.trunc() as i64))
}

fn cell_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Number(n) => n.as_f64().and_then(serial_to_date),
        other => cell_text(other).and_then(|s| parse_flexible_date(&s)),
    }
}

fn cell_amount(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| format!("invalid amount: {n}")),
        other => match cell_text(other) {
            None => Ok(0.0),
            Some(s) => s
                .replace(',', "")
                .parse::<f64>()
                .map_err(|_| format!("invalid amount: {s}")),
        },
    }
}

/// Maps one sheet row onto an employee. `departments` is keyed by lowercase name.
pub fn row_to_employee(
    row: &Map<String, Value>,
    departments: &HashMap<String, u64>,
) -> Result<CreateEmployee, String> {
    let mut fields: HashMap<&'static str, &Value> = HashMap::new();
    for (header, value) in row {
        match canonical_field(header) {
            Some(field) => {
                fields.entry(field).or_insert(value);
            }
            None => {
                // Extra columns are common in HR exports.
                tracing::trace!(header = %header, "Ignoring unknown import column");
            }
        }
    }

    let text = |field: &str| fields.get(field).and_then(|v| cell_text(v));

    let (first_name, last_name) = match text("first_name") {
        Some(first) => (first, text("last_name")),
        None => match text("full_name") {
            Some(full) => match full.split_once(char::is_whitespace) {
                Some((first, rest)) => (first.to_string(), Some(rest.trim().to_string())),
                None => (full, None),
            },
            None => return Err("first_name is required".into()),
        },
    };

    let joining_date = match fields.get("joining_date") {
        Some(v) => cell_date(v).ok_or_else(|| format!("unreadable joining date: {}", cell_text(v).unwrap_or_default()))?,
        None => return Err("joining_date is required".into()),
    };

    // Stored as text; normalised when the cell is readable.
    let date_of_birth = fields
        .get("date_of_birth")
        .and_then(|v| cell_date(v).map(day_key).or_else(|| cell_text(v)));

    let department_id = match text("department") {
        None => None,
        Some(name) => match name.parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => Some(
                *departments
                    .get(&name.to_lowercase())
                    .ok_or_else(|| format!("unknown department: {name}"))?,
            ),
        },
    };

    let monthly_salary = match fields.get("monthly_salary") {
        Some(v) => cell_amount(v)?,
        None => 0.0,
    };

    let employee = CreateEmployee {
        employee_code: text("employee_code").ok_or("employee_code is required")?,
        first_name,
        last_name,
        email: text("email").ok_or("email is required")?,
        phone: text("phone"),
        address: text("address"),
        department_id,
        designation: text("designation"),
        date_of_birth,
        joining_date,
        monthly_salary,
        pan: text("pan"),
        qualification: text("qualification"),
        bank_account: text("bank_account"),
    };

    employee.validate()?;
    Ok(employee)
}

#[derive(Deserialize, ToSchema)]
pub struct ImportReq {
    /// One object per sheet row, keyed by column header
    #[schema(value_type = Vec<Object>, example = json!([{
        "Emp Code": "EMP-101",
        "Name": "Asha Rahman",
        "Email": "asha@example.com",
        "DOB": "14/07/1990",
        "Date of Joining": "2024-03-01",
        "Department": "Engineering",
        "Salary": "65,000"
    }]))]
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportedRow {
    /// Sheet row number; the header is row 1
    pub row: usize,
    pub id: u64,
    pub employee_code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RowError {
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImportReport {
    pub total: usize,
    pub created: Vec<ImportedRow>,
    pub errors: Vec<RowError>,
}

#[utoipa::path(
    post,
    path = "/api/employees/import",
    request_body = ImportReq,
    responses(
        (status = 200, description = "Per-row outcome; bad rows never abort the batch", body = ImportReport),
        (status = 400, description = "Empty or oversized batch")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn import_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<ImportReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let rows = &payload.rows;
    if rows.is_empty() {
        return Err(ApiError::bad_request("No rows to import").into());
    }
    if rows.len() > MAX_IMPORT_ROWS {
        return Err(ApiError::bad_request(format!("At most {MAX_IMPORT_ROWS} rows per import")).into());
    }

    let departments: HashMap<String, u64> =
        sqlx::query_as::<_, (u64, String)>("SELECT id, name FROM departments")
            .fetch_all(pool.get_ref())
            .await
            .map_err(ApiError::from)?
            .into_iter()
            .map(|(id, name)| (name.to_lowercase(), id))
            .collect();

    let mut report = ImportReport {
        total: rows.len(),
        created: Vec::new(),
        errors: Vec::new(),
    };

    for (index, row) in rows.iter().enumerate() {
        let row_no = index + 2;

        let employee = match row_to_employee(row, &departments) {
            Ok(e) => e,
            Err(message) => {
                report.errors.push(RowError { row: row_no, message });
                continue;
            }
        };

        match insert_employee(pool.get_ref(), &employee).await {
            Ok(id) => report.created.push(ImportedRow {
                row: row_no,
                id,
                employee_code: employee.employee_code,
            }),
            Err(ApiError::Database(e)) => {
                warn!(error = %e, row = row_no, "Import row failed");
                report.errors.push(RowError {
                    row: row_no,
                    message: "database error".into(),
                });
            }
            Err(e) => report.errors.push(RowError {
                row: row_no,
                message: e.to_string(),
            }),
        }
    }

    info!(
        total = report.total,
        created = report.created.len(),
        failed = report.errors.len(),
        by = auth.user_id,
        "Employee import finished"
    );

    Ok(HttpResponse::Ok().json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    fn departments() -> HashMap<String, u64> {
        HashMap::from([("engineering".to_string(), 3)])
    }

    #[test]
    fn headers_are_normalised() {
        assert_eq!(normalize_header("  Emp. Code "), "emp_code");
        assert_eq!(normalize_header("Date of Joining"), "date_of_joining");
        assert_eq!(normalize_header("E-mail__Address"), "e_mail_address");
        assert_eq!(canonical_field("DOB"), Some("date_of_birth"));
        assert_eq!(canonical_field("Emp Code"), Some("employee_code"));
        assert_eq!(canonical_field("Date Of Joining"), Some("joining_date"));
        assert_eq!(canonical_field("Favourite colour"), None);
    }

    #[test]
    fn maps_a_typical_export_row() {
        let employee = row_to_employee(
            &row(json!({
                "Emp Code": "EMP-101",
                "Name": "Asha Rahman Chowdhury",
                "Email ID": "asha@example.com",
                "DOB": "14/07/1990",
                "Date of Joining": "2024-03-01",
                "Department": "Engineering",
                "Salary": "65,000",
                "Blood group": "O+"
            })),
            &departments(),
        )
        .unwrap();

        assert_eq!(employee.employee_code, "EMP-101");
        assert_eq!(employee.first_name, "Asha");
        assert_eq!(employee.last_name.as_deref(), Some("Rahman Chowdhury"));
        assert_eq!(employee.date_of_birth.as_deref(), Some("1990-07-14"));
        assert_eq!(employee.joining_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(employee.department_id, Some(3));
        assert_eq!(employee.monthly_salary, 65_000.0);
    }

    #[test]
    fn numeric_cells_are_read_as_serial_dates_and_codes() {
        let employee = row_to_employee(
            &row(json!({
                "Employee Code": 1042,
                "First Name": "Ravi",
                "Email": "ravi@example.com",
                "DOJ": 45292
            })),
            &departments(),
        )
        .unwrap();

        assert_eq!(employee.employee_code, "1042");
        assert_eq!(employee.joining_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(employee.monthly_salary, 0.0);
    }

    #[test]
    fn reports_missing_and_invalid_fields() {
        let no_code = row_to_employee(
            &row(json!({"Name": "X", "Email": "x@example.com", "DOJ": "2024-01-01"})),
            &departments(),
        );
        assert_eq!(no_code.unwrap_err(), "employee_code is required");

        let bad_dept = row_to_employee(
            &row(json!({
                "Emp Code": "E1", "Name": "X", "Email": "x@example.com",
                "DOJ": "2024-01-01", "Dept": "Marketing"
            })),
            &departments(),
        );
        assert_eq!(bad_dept.unwrap_err(), "unknown department: Marketing");

        let bad_email = row_to_employee(
            &row(json!({"Emp Code": "E1", "Name": "X", "Email": "nope", "DOJ": "2024-01-01"})),
            &departments(),
        );
        assert!(bad_email.unwrap_err().starts_with("invalid email"));
    }
}
