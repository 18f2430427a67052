use crate::{
    api::{
        leave_balance::{load_balance, save_balance},
        notification::notify_best_effort,
    },
    auth::auth::AuthUser,
    error::ApiError,
    model::{
        employee::display_name,
        leave_request::{LeaveRequest, LeaveStatus, LeaveType, leave_duration},
        notification::NotificationKind,
    },
    utils::db_utils::paginate,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-02", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "CASUAL")]
    pub leave_type: LeaveType,
    #[serde(default)]
    pub half_day: bool,
    #[schema(example = "Family function")]
    pub reason: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    /// Filter by employee ID (HR/Admin only)
    #[schema(example = 123)]
    pub employee_id: Option<u64>,
    /// Filter by leave status
    #[schema(example = "pending")]
    pub status: Option<String>,
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Leave with the requester's name filled in.
#[derive(Serialize, ToSchema)]
pub struct LeaveDetail {
    #[serde(flatten)]
    pub leave: LeaveRequest,
    pub employee_name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewReq {
    #[schema(example = "Project deadline that week")]
    pub note: Option<String>,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// Checks a request against the balance it would draw from.
fn check_balance(leave_type: LeaveType, duration: f64, available: Option<f64>) -> Result<(), ApiError> {
    if leave_type.is_unbalanced() {
        return Ok(());
    }
    let available = available.unwrap_or(0.0);
    if duration > available {
        return Err(ApiError::bad_request(format!(
            "Insufficient {} balance: requested {}, available {}",
            leave_type, duration, available
        )));
    }
    Ok(())
}

async fn fetch_leave(pool: &MySqlPool, leave_id: u64) -> Result<LeaveRequest, ApiError> {
    sqlx::query_as::<_, LeaveRequest>("SELECT * FROM leave_requests WHERE id = ?")
        .bind(leave_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Leave request not found"))
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted successfully",
         body = Object,
         example = json!({
            "message": "Leave request submitted",
            "id": 17,
            "duration": 2.0,
            "status": "pending"
         })
        ),
        (status = 400, description = "Invalid dates or insufficient balance"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let duration = leave_duration(payload.start_date, payload.end_date, payload.half_day)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let balance = load_balance(pool.get_ref(), employee_id).await?;
    check_balance(payload.leave_type, duration, balance.available(payload.leave_type))?;

    let result = sqlx::query(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, half_day, duration, reason)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.half_day)
    .bind(duration)
    .bind(payload.reason.as_deref().map(str::trim))
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to create leave request");
        ApiError::from(e)
    })?;

    info!(employee_id, leave_type = %payload.leave_type, duration, "Leave requested");

    Ok(HttpResponse::Created().json(json!({
        "message": "Leave request submitted",
        "id": result.last_insert_id(),
        "duration": duration,
        "status": LeaveStatus::Pending
    })))
}

/* =========================
Approve leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved successfully", body = Object, example = json!({
            "message": "Leave approved",
            "balance_updated": true
        })),
        (status = 400, description = "Leave request not found or already processed", body = Object, example = json!({
            "message": "Leave request not found or already processed"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave_id = path.into_inner();
    let leave = fetch_leave(pool.get_ref(), leave_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'approved', reviewed_by = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(auth.user_id)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Approve leave failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("Leave request not found or already processed").into());
    }

    // The status change above stays even if the debit below fails.
    let balance_updated = match leave.leave_type.parse::<LeaveType>() {
        Ok(leave_type) if !leave_type.is_unbalanced() => {
            match debit_balance(pool.get_ref(), leave.employee_id, leave_type, leave.duration).await {
                Ok(()) => true,
                Err(e) => {
                    error!(error = %e, leave_id, employee_id = leave.employee_id, "Leave approved but balance debit failed");
                    false
                }
            }
        }
        Ok(_) => false,
        Err(_) => {
            error!(leave_id, leave_type = %leave.leave_type, "Approved leave has an unknown type; balance untouched");
            false
        }
    };

    notify_best_effort(
        pool.get_ref(),
        leave.employee_id,
        auth.employee_id,
        NotificationKind::LeaveUpdate,
        &format!(
            "Your {} leave from {} to {} was approved",
            leave.leave_type, leave.start_date, leave.end_date
        ),
    )
    .await;

    info!(leave_id, by = auth.user_id, balance_updated, "Leave approved");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave approved",
        "balance_updated": balance_updated
    })))
}

async fn debit_balance(pool: &MySqlPool, employee_id: u64, leave_type: LeaveType, days: f64) -> Result<(), ApiError> {
    let mut balance = load_balance(pool, employee_id).await?;
    balance.debit(leave_type, days);
    save_balance(pool, &balance).await?;
    Ok(())
}

/* =========================
Reject leave (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body = ReviewReq,
    responses(
        (status = 200, description = "Leave rejected successfully", body = Object, example = json!({
            "message": "Leave rejected"
        })),
        (status = 400, description = "Leave request not found or already processed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: Option<web::Json<ReviewReq>>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let leave_id = path.into_inner();
    let note = payload
        .as_ref()
        .and_then(|p| p.note.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let leave = fetch_leave(pool.get_ref(), leave_id).await?;

    let result = sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = 'rejected', reviewed_by = ?, review_note = ?
        WHERE id = ?
        AND status = 'pending'
        "#,
    )
    .bind(auth.user_id)
    .bind(note)
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, leave_id, "Reject leave failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("Leave request not found or already processed").into());
    }

    let message = match note {
        Some(n) => format!("Your {} leave from {} was rejected: {}", leave.leave_type, leave.start_date, n),
        None => format!("Your {} leave from {} was rejected", leave.leave_type, leave.start_date),
    };
    notify_best_effort(
        pool.get_ref(),
        leave.employee_id,
        auth.employee_id,
        NotificationKind::LeaveUpdate,
        &message,
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave rejected"
    })))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to cancel")
    ),
    responses(
        (status = 200, description = "Leave cancelled"),
        (status = 400, description = "Only pending requests can be cancelled"),
        (status = 403, description = "Not your request")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let leave_id = path.into_inner();

    let leave = fetch_leave(pool.get_ref(), leave_id).await?;
    if leave.employee_id != employee_id {
        return Err(ApiError::forbidden("You can only cancel your own leave requests").into());
    }

    let result = sqlx::query(
        "UPDATE leave_requests SET status = 'cancelled' WHERE id = ? AND status = 'pending'",
    )
    .bind(leave_id)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("Only pending requests can be cancelled").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave cancelled"
    })))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveDetail),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let leave_id = path.into_inner();

    let leave = fetch_leave(pool.get_ref(), leave_id).await?;
    auth.require_self_or_hr(leave.employee_id)?;

    // A deleted employee leaves the name empty rather than failing the lookup.
    let name = sqlx::query_as::<_, (String, Option<String>)>(
        "SELECT first_name, last_name FROM employees WHERE id = ?",
    )
    .bind(leave.employee_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::from)?
    .map(|(first, last)| display_name(&first, last.as_deref()));

    Ok(HttpResponse::Ok().json(LeaveDetail {
        leave,
        employee_name: name,
    }))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    let (page, per_page, offset) = paginate(query.page, query.per_page, 10);

    // -------------------------
    // WHERE clause
    // -------------------------
    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    // Employees only ever see their own requests.
    let employee_filter = if auth.role.is_manager() {
        query.employee_id
    } else {
        Some(auth.require_employee()?)
    };

    if let Some(emp_id) = employee_filter {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(emp_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    // -------------------------
    // COUNT query
    // -------------------------
    let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(ApiError::from)?;

    // -------------------------
    // DATA query
    // -------------------------
    let data_sql = format!(
        r#"
        SELECT *
        FROM leave_requests
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, LeaveRequest>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let leaves = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: leaves,
        page,
        per_page,
        total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paid_leave_needs_enough_balance() {
        assert!(check_balance(LeaveType::Casual, 2.0, Some(2.0)).is_ok());
        assert!(check_balance(LeaveType::Casual, 2.5, Some(2.0)).is_err());
        assert!(check_balance(LeaveType::Sick, 0.5, Some(0.0)).is_err());
    }

    #[test]
    fn lwp_and_vacation_skip_balance_check() {
        assert!(check_balance(LeaveType::Lwp, 10.0, None).is_ok());
        assert!(check_balance(LeaveType::Vacation, 3.0, None).is_ok());
    }

    #[test]
    fn balance_error_names_the_type() {
        let err = check_balance(LeaveType::Earned, 3.0, Some(1.5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Insufficient EARNED balance: requested 3, available 1.5"
        );
    }
}
