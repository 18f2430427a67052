use crate::{
    auth::{auth::AuthUser, handlers::create_account},
    error::{ApiError, is_duplicate_key},
    model::employee::{ADMIN_EDITABLE_COLUMNS, Employee, EmployeeStatus, SELF_EDITABLE_COLUMNS},
    models::AccountReq,
    utils::{
        cache,
        db_utils::{build_update_sql, execute_update, paginate},
        username_filter,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error, info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-3000")]
    pub employee_code: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: Option<String>,
    #[schema(example = "john@email.com", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[schema(example = 1)]
    pub department_id: Option<u64>,
    #[schema(example = "Engineer")]
    pub designation: Option<String>,
    #[schema(example = "14/07/1990")]
    pub date_of_birth: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub joining_date: NaiveDate,
    #[serde(default)]
    #[schema(example = 50000.0)]
    pub monthly_salary: f64,
    pub pan: Option<String>,
    pub qualification: Option<String>,
    pub bank_account: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEmployeeReq {
    #[serde(flatten)]
    pub employee: CreateEmployee,
    /// Optional login account created alongside the record.
    pub account: Option<AccountReq>,
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub department_id: Option<u64>,
    /// `active` or `blocked`
    pub status: Option<String>,
    /// Matches name, email or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 10)]
    pub total: i64,
}

impl CreateEmployee {
    /// Field checks shared by the form and the spreadsheet import.
    pub fn validate(&self) -> Result<(), String> {
        if self.employee_code.trim().is_empty() {
            return Err("employee_code is required".into());
        }
        if self.first_name.trim().is_empty() {
            return Err("first_name is required".into());
        }
        let email = self.email.trim();
        if !is_valid_email(email) {
            return Err(format!("invalid email: {email}"));
        }
        if self.monthly_salary < 0.0 {
            return Err("monthly_salary cannot be negative".into());
        }
        Ok(())
    }
}

fn is_valid_email(email: &str) -> bool {
    matches!(email.split_once('@'), Some((user, domain)) if !user.is_empty() && domain.contains('.'))
}

/// Runs the create-time field rules over a partial update and returns the
/// body with those fields normalised. Keys without a rule pass through.
pub fn check_update(body: &Value) -> Result<Value, String> {
    let Some(fields) = body.as_object() else {
        return Err("Request body must be a JSON object".into());
    };

    let mut checked = fields.clone();
    for (key, value) in checked.iter_mut() {
        match key.as_str() {
            "employee_code" | "first_name" => {
                let text = value.as_str().map(str::trim).unwrap_or_default().to_string();
                if text.is_empty() {
                    return Err(format!("{key} is required"));
                }
                *value = Value::String(text);
            }
            "email" => {
                let email = value.as_str().map(|s| s.trim().to_lowercase()).unwrap_or_default();
                if !is_valid_email(&email) {
                    return Err(format!("invalid email: {email}"));
                }
                *value = Value::String(email);
            }
            "monthly_salary" => match value.as_f64() {
                Some(salary) if salary >= 0.0 => {}
                _ => return Err("monthly_salary must be a non-negative number".into()),
            },
            "joining_date" => {
                let date = value
                    .as_str()
                    .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                    .ok_or("joining_date must be a YYYY-MM-DD date")?;
                *value = Value::String(date.format("%Y-%m-%d").to_string());
            }
            _ => {}
        }
    }

    Ok(Value::Object(checked))
}

/// Inserts an employee and an empty leave balance row; returns the new id.
pub async fn insert_employee(pool: &MySqlPool, emp: &CreateEmployee) -> Result<u64, ApiError> {
    emp.validate().map_err(ApiError::BadRequest)?;

    let result = sqlx::query(
        r#"
        INSERT INTO employees
            (employee_code, first_name, last_name, email, phone, address, department_id,
             designation, date_of_birth, joining_date, monthly_salary, pan, qualification, bank_account)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(emp.employee_code.trim())
    .bind(emp.first_name.trim())
    .bind(emp.last_name.as_deref())
    .bind(emp.email.trim().to_lowercase())
    .bind(emp.phone.as_deref())
    .bind(emp.address.as_deref())
    .bind(emp.department_id)
    .bind(emp.designation.as_deref())
    .bind(emp.date_of_birth.as_deref())
    .bind(emp.joining_date)
    .bind(emp.monthly_salary)
    .bind(emp.pan.as_deref())
    .bind(emp.qualification.as_deref())
    .bind(emp.bank_account.as_deref())
    .execute(pool)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("Employee code or email already exists")
        } else {
            ApiError::from(e)
        }
    })?;

    let employee_id = result.last_insert_id();

    sqlx::query("INSERT IGNORE INTO leave_balances (employee_id) VALUES (?)")
        .bind(employee_id)
        .execute(pool)
        .await?;

    Ok(employee_id)
}

pub async fn fetch_employee(pool: &MySqlPool, employee_id: u64) -> Result<Employee, ApiError> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployeeReq,
    responses(
        (status = 201, description = "Employee created", body = Object, example = json!({
            "message": "Employee created",
            "id": 12,
            "account": {"created": true}
        })),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Duplicate employee code or email")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployeeReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let payload = payload.into_inner();

    let employee_id = insert_employee(pool.get_ref(), &payload.employee).await?;
    info!(employee_id, created_by = auth.user_id, "Employee created");

    // The record is kept even when the account cannot be created.
    let account = match payload.account {
        None => json!({ "created": false }),
        Some(account) => match create_account(pool.get_ref(), employee_id, &account).await {
            Ok(user_id) => json!({ "created": true, "user_id": user_id }),
            Err(e) => {
                warn!(employee_id, error = %e, "Employee saved but account creation failed");
                json!({ "created": false, "error": e.to_string() })
            }
        },
    };

    Ok(HttpResponse::Created().json(json!({
        "message": "Employee created",
        "id": employee_id,
        "account": account
    })))
}

enum FilterValue {
    U64(u64),
    Str(String),
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse)
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EmployeeQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 20);

    let mut conditions = Vec::new();
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(department_id) = query.department_id {
        conditions.push("department_id = ?");
        args.push(FilterValue::U64(department_id));
    }

    if let Some(status) = &query.status {
        conditions.push("status = ?");
        args.push(FilterValue::Str(status.clone()));
    }

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        conditions.push("(first_name LIKE ? OR last_name LIKE ? OR email LIKE ? OR employee_code LIKE ?)");
        let like = format!("%{}%", search);
        for _ in 0..4 {
            args.push(FilterValue::Str(like.clone()));
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM employees {}", where_clause);
    debug!(sql = %count_sql, "Counting employees");

    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_query = match arg {
            FilterValue::U64(v) => count_query.bind(*v),
            FilterValue::Str(s) => count_query.bind(s.as_str()),
        };
    }
    let total = count_query.fetch_one(pool.get_ref()).await.map_err(ApiError::from)?;

    let data_sql = format!(
        "SELECT * FROM employees {} ORDER BY id DESC LIMIT ? OFFSET ?",
        where_clause
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");

    let mut data_query = sqlx::query_as::<_, Employee>(&data_sql);
    for arg in &args {
        data_query = match arg {
            FilterValue::U64(v) => data_query.bind(*v),
            FilterValue::Str(s) => data_query.bind(s.as_str()),
        };
    }

    let employees = data_query
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Own profile for the self-service portal.
#[utoipa::path(
    get,
    path = "/api/employees/me",
    responses((status = 200, description = "Own profile", body = Employee)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn my_profile(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

async fn apply_update(
    pool: &MySqlPool,
    employee_id: u64,
    body: &Value,
    allowed: &[&str],
) -> Result<(), ApiError> {
    let body = check_update(body).map_err(ApiError::BadRequest)?;
    let update = build_update_sql("employees", &body, allowed, "id", employee_id)?;

    let affected = execute_update(pool, update).await.map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("Employee code or email already exists")
        } else {
            ApiError::from(e)
        }
    })?;

    if affected == 0 {
        // MySQL reports 0 rows when nothing changed, so check existence separately.
        fetch_employee(pool, employee_id).await?;
    }
    Ok(())
}

/// Update Employee
#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    request_body(content = Object, description = "Any subset of editable employee fields"),
    responses(
        (status = 200, description = "Employee updated"),
        (status = 400, description = "Unknown or invalid field"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    apply_update(pool.get_ref(), employee_id, &body, ADMIN_EDITABLE_COLUMNS).await?;
    info!(employee_id, updated_by = auth.user_id, "Employee updated");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee updated successfully" })))
}

/// Self-service profile edit
#[utoipa::path(
    put,
    path = "/api/employees/me",
    request_body(content = Object, description = "phone, address, qualification, pan, bank_account"),
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "Field not editable by employees")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_my_profile(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    apply_update(pool.get_ref(), employee_id, &body, SELF_EDITABLE_COLUMNS).await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Profile updated successfully" })))
}

async fn set_status(pool: &MySqlPool, employee_id: u64, status: EmployeeStatus) -> Result<(), ApiError> {
    let result = sqlx::query("UPDATE employees SET status = ? WHERE id = ?")
        .bind(status.as_ref())
        .bind(employee_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        fetch_employee(pool, employee_id).await?;
    }

    sqlx::query("UPDATE users SET is_active = ? WHERE employee_id = ?")
        .bind(status == EmployeeStatus::Active)
        .bind(employee_id)
        .execute(pool)
        .await?;

    Ok(())
}

#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}/block",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses((status = 200, description = "Employee blocked"), (status = 404, description = "Employee not found")),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn block_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    if auth.employee_id == Some(employee_id) {
        return Err(ApiError::bad_request("You cannot block yourself").into());
    }

    set_status(pool.get_ref(), employee_id, EmployeeStatus::Blocked).await?;
    info!(employee_id, by = auth.user_id, "Employee blocked");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee blocked" })))
}

#[utoipa::path(
    put,
    path = "/api/employees/{employee_id}/unblock",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses((status = 200, description = "Employee unblocked"), (status = 404, description = "Employee not found")),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn unblock_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let employee_id = path.into_inner();

    set_status(pool.get_ref(), employee_id, EmployeeStatus::Active).await?;
    info!(employee_id, by = auth.user_id, "Employee unblocked");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee unblocked" })))
}

/// Deletes an employee with their account; dependent rows cascade.
pub async fn remove_employee(pool: &MySqlPool, employee_id: u64) -> Result<(), ApiError> {
    let usernames = sqlx::query_scalar::<_, String>("SELECT username FROM users WHERE employee_id = ?")
        .bind(employee_id)
        .fetch_all(pool)
        .await?;

    let result = sqlx::query("DELETE FROM employees WHERE id = ?")
        .bind(employee_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    for username in &usernames {
        username_filter::remove(username);
        cache::forget_username(username).await;
    }

    Ok(())
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employees/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    remove_employee(pool.get_ref(), employee_id).await.map_err(|e| {
        if !matches!(e, ApiError::NotFound(_)) {
            error!(error = %e, employee_id, "Failed to delete employee");
        }
        e
    })?;
    info!(employee_id, by = auth.user_id, "Employee deleted");

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CreateEmployee {
        CreateEmployee {
            employee_code: "EMP-1".into(),
            first_name: "Asha".into(),
            last_name: Some("Rao".into()),
            email: "asha@example.com".into(),
            phone: None,
            address: None,
            department_id: Some(1),
            designation: None,
            date_of_birth: Some("14/07/1990".into()),
            joining_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            monthly_salary: 40_000.0,
            pan: None,
            qualification: None,
            bank_account: None,
        }
    }

    #[test]
    fn valid_employee_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_missing_code_and_bad_email() {
        let mut emp = sample();
        emp.employee_code = "  ".into();
        assert!(emp.validate().is_err());

        let mut emp = sample();
        emp.email = "asha.example.com".into();
        assert!(emp.validate().unwrap_err().contains("invalid email"));
    }

    #[test]
    fn create_request_accepts_nested_account() {
        let req: CreateEmployeeReq = serde_json::from_value(json!({
            "employee_code": "EMP-2",
            "first_name": "Ravi",
            "email": "ravi@example.com",
            "joining_date": "2026-02-01",
            "account": {"username": "ravi", "password": "password123", "role_id": 3}
        }))
        .unwrap();

        assert_eq!(req.employee.monthly_salary, 0.0);
        assert_eq!(req.account.map(|a| a.username), Some("ravi".to_string()));
    }

    #[test]
    fn update_rejects_values_create_would_refuse() {
        for body in [
            json!({"monthly_salary": -5000}),
            json!({"monthly_salary": "lots"}),
            json!({"first_name": "  "}),
            json!({"employee_code": null}),
            json!({"email": "nope"}),
            json!({"joining_date": "next week"}),
            json!({"joining_date": 20260101}),
        ] {
            assert!(check_update(&body).is_err(), "{body} was accepted");
        }
    }

    #[test]
    fn update_normalises_checked_fields() {
        let checked = check_update(&json!({
            "email": "  Asha.Rao@Example.COM ",
            "first_name": " Asha ",
            "joining_date": "2024-03-01",
            "monthly_salary": 52000.5,
            "phone": "98450 00000"
        }))
        .unwrap();

        assert_eq!(checked["email"], "asha.rao@example.com");
        assert_eq!(checked["first_name"], "Asha");
        assert_eq!(checked["joining_date"], "2024-03-01");
        assert_eq!(checked["monthly_salary"], 52000.5);
        assert_eq!(checked["phone"], "98450 00000");
    }
}
