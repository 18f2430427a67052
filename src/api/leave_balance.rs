use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::ApiError,
    model::leave_balance::{LAST_ALLOCATION_KEY, LeaveBalance, allocation_allowed},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::{MySql, MySqlPool, Transaction};
use tracing::{info, warn};
use utoipa::ToSchema;

/// Balance row for an employee; a missing row reads as all zeros.
pub async fn load_balance(pool: &MySqlPool, employee_id: u64) -> Result<LeaveBalance, ApiError> {
    let balance = sqlx::query_as::<_, LeaveBalance>("SELECT * FROM leave_balances WHERE employee_id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await?;

    Ok(balance.unwrap_or_else(|| LeaveBalance::empty(employee_id)))
}

const UPSERT_BALANCE: &str = r#"
    INSERT INTO leave_balances
        (employee_id, casual, sick, earned, compensatory, maternity, paternity, last_allocated_at)
    VALUES (?, ?, ?, ?, ?, ?, ?, ?)
    ON DUPLICATE KEY UPDATE
        casual = VALUES(casual),
        sick = VALUES(sick),
        earned = VALUES(earned),
        compensatory = VALUES(compensatory),
        maternity = VALUES(maternity),
        paternity = VALUES(paternity),
        last_allocated_at = VALUES(last_allocated_at)
"#;

fn upsert_query(balance: &LeaveBalance) -> sqlx::query::Query<'_, MySql, sqlx::mysql::MySqlArguments> {
    sqlx::query(UPSERT_BALANCE)
        .bind(balance.employee_id)
        .bind(balance.casual)
        .bind(balance.sick)
        .bind(balance.earned)
        .bind(balance.compensatory)
        .bind(balance.maternity)
        .bind(balance.paternity)
        .bind(balance.last_allocated_at)
}

pub async fn save_balance(pool: &MySqlPool, balance: &LeaveBalance) -> Result<(), sqlx::Error> {
    upsert_query(balance).execute(pool).await?;
    Ok(())
}

async fn last_allocation(pool: &MySqlPool) -> Result<Option<DateTime<Utc>>, ApiError> {
    let raw = sqlx::query_scalar::<_, String>("SELECT setting_value FROM system_settings WHERE setting_key = ?")
        .bind(LAST_ALLOCATION_KEY)
        .fetch_optional(pool)
        .await?;

    Ok(raw.and_then(|value| match DateTime::parse_from_rfc3339(&value) {
        Ok(at) => Some(at.with_timezone(&Utc)),
        Err(e) => {
            warn!(error = %e, value = %value, "Ignoring unreadable allocation timestamp");
            None
        }
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave-balances/me",
    responses(
        (status = 200, description = "Own leave balance", body = LeaveBalance),
        (status = 403, description = "No employee profile")
    ),
    tag = "Leave Balance",
    security(("bearer_auth" = []))
)]
pub async fn my_balance(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let balance = load_balance(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(balance))
}

#[utoipa::path(
    get,
    path = "/api/leave-balances/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Leave balance of the employee", body = LeaveBalance),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave Balance",
    security(("bearer_auth" = []))
)]
pub async fn employee_balance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let balance = load_balance(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(balance))
}

#[derive(Serialize, ToSchema)]
pub struct AllocationStatus {
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_allocated_at: Option<DateTime<Utc>>,
    pub allowed: bool,
}

#[utoipa::path(
    get,
    path = "/api/leave-balances/allocation",
    responses((status = 200, description = "Whether the monthly allocation may run now", body = AllocationStatus)),
    tag = "Leave Balance",
    security(("bearer_auth" = []))
)]
pub async fn allocation_status(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let last = last_allocation(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(AllocationStatus {
        last_allocated_at: last,
        allowed: allocation_allowed(last, &Local::now()),
    }))
}

/// Monthly allocation endpoint
#[utoipa::path(
    post,
    path = "/api/leave-balances/allocate",
    responses(
        (status = 200, description = "Monthly accrual added to every active employee", body = Object, example = json!({
            "message": "Monthly leave allocated",
            "employees": 42
        })),
        (status = 409, description = "Already allocated this month")
    ),
    tag = "Leave Balance",
    security(("bearer_auth" = []))
)]
pub async fn allocate(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let now = Utc::now();
    if !allocation_allowed(last_allocation(pool.get_ref()).await?, &now.with_timezone(&Local)) {
        return Err(ApiError::conflict("Leave has already been allocated this month").into());
    }

    let mut balances = sqlx::query_as::<_, LeaveBalance>(
        r#"
        SELECT e.id AS employee_id,
               COALESCE(b.casual, 0) AS casual,
               COALESCE(b.sick, 0) AS sick,
               COALESCE(b.earned, 0) AS earned,
               COALESCE(b.compensatory, 0) AS compensatory,
               COALESCE(b.maternity, 0) AS maternity,
               COALESCE(b.paternity, 0) AS paternity,
               b.last_allocated_at
        FROM employees e
        LEFT JOIN leave_balances b ON b.employee_id = e.id
        WHERE e.status = 'active'
        "#,
    )
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    let mut tx: Transaction<'_, MySql> = pool.begin().await.map_err(ApiError::from)?;

    for balance in balances.iter_mut() {
        balance.accrue(&config.accrual, now);
        upsert_query(balance).execute(&mut *tx).await.map_err(ApiError::from)?;
    }

    sqlx::query(
        r#"
        INSERT INTO system_settings (setting_key, setting_value) VALUES (?, ?)
        ON DUPLICATE KEY UPDATE setting_value = VALUES(setting_value)
        "#,
    )
    .bind(LAST_ALLOCATION_KEY)
    .bind(now.to_rfc3339())
    .execute(&mut *tx)
    .await
    .map_err(ApiError::from)?;

    tx.commit().await.map_err(ApiError::from)?;

    info!(employees = balances.len(), by = auth.user_id, "Monthly leave allocated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Monthly leave allocated",
        "employees": balances.len()
    })))
}
