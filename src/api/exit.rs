use crate::{
    api::{employee::remove_employee, notification::notify_best_effort},
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, is_duplicate_key},
    model::{
        exit::{
            Clearance, ClearanceStatus, ExitInterview, ExitProgress, KnowledgeTransfer, Resignation,
            ResignationStatus, TransferStatus, last_working_day,
        },
        notification::NotificationKind,
    },
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct ResignationReq {
    #[schema(example = "Relocating to another city")]
    pub reason: String,
    /// Ignored when earlier than the end of the notice period
    #[schema(value_type = Option<String>, format = "date", example = "2026-12-31")]
    pub requested_last_day: Option<NaiveDate>,
}

#[derive(Deserialize, IntoParams)]
pub struct ResignationQuery {
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ClearanceReq {
    /// `cleared` or `on_hold`
    pub status: ClearanceStatus,
    #[schema(example = "Laptop returned")]
    pub remarks: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct TransferReq {
    #[schema(example = "Payroll batch jobs")]
    pub topic: String,
    #[schema(example = 12)]
    pub assignee_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct TransferStatusReq {
    pub status: TransferStatus,
}

#[derive(Deserialize, ToSchema)]
pub struct InterviewReq {
    #[schema(value_type = String, format = "date", example = "2026-11-20")]
    pub scheduled_on: NaiveDate,
    pub interviewer_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct InterviewFeedbackReq {
    pub feedback: Option<String>,
    #[schema(example = 4, minimum = 1, maximum = 5)]
    pub rating: u8,
}

fn check_rating(rating: u8) -> Result<(), ApiError> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(ApiError::bad_request("rating must be between 1 and 5"))
    }
}

fn check_transition(current: &str, next: TransferStatus) -> Result<(), ApiError> {
    let current = current
        .parse::<TransferStatus>()
        .map_err(|_| ApiError::Internal(format!("Unknown transfer status {current:?}")))?;
    if current.can_move_to(next) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Knowledge transfer cannot move from {current} to {next}"
        )))
    }
}

fn check_clearance_status(status: ClearanceStatus) -> Result<(), ApiError> {
    match status {
        ClearanceStatus::Cleared | ClearanceStatus::OnHold => Ok(()),
        ClearanceStatus::Pending => Err(ApiError::bad_request("Clearance can only be cleared or put on hold")),
    }
}

async fn fetch_resignation(pool: &MySqlPool, resignation_id: u64) -> Result<Resignation, ApiError> {
    sqlx::query_as::<_, Resignation>("SELECT * FROM resignations WHERE id = ?")
        .bind(resignation_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Resignation not found"))
}

/// Moves a resignation from `from` to `to`; 400 when it is no longer in `from`.
async fn transition(
    pool: &MySqlPool,
    resignation_id: u64,
    from: ResignationStatus,
    to: ResignationStatus,
    reviewer: Option<u64>,
) -> Result<(), ApiError> {
    let result = sqlx::query(
        "UPDATE resignations SET status = ?, reviewed_by = COALESCE(?, reviewed_by) WHERE id = ? AND status = ?",
    )
    .bind(to.as_ref())
    .bind(reviewer)
    .bind(resignation_id)
    .bind(from.as_ref())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request(format!("Resignation is not {from}")));
    }
    Ok(())
}

async fn load_progress(pool: &MySqlPool, resignation: &Resignation) -> Result<ExitProgress, ApiError> {
    let clearances = sqlx::query_as::<_, Clearance>("SELECT * FROM clearances WHERE resignation_id = ?")
        .bind(resignation.id)
        .fetch_all(pool)
        .await?;
    let transfers =
        sqlx::query_as::<_, KnowledgeTransfer>("SELECT * FROM knowledge_transfers WHERE resignation_id = ?")
            .bind(resignation.id)
            .fetch_all(pool)
            .await?;
    let interview = sqlx::query_as::<_, ExitInterview>("SELECT * FROM exit_interviews WHERE resignation_id = ?")
        .bind(resignation.id)
        .fetch_optional(pool)
        .await?;

    Ok(ExitProgress::summarize(resignation, &clearances, &transfers, interview.as_ref()))
}

/* =========================
Resignation
========================= */
#[utoipa::path(
    post,
    path = "/api/exit/resignations",
    request_body = ResignationReq,
    responses(
        (status = 201, description = "Resignation submitted", body = Object, example = json!({
            "message": "Resignation submitted",
            "id": 3,
            "last_working_day": "2026-11-15"
        })),
        (status = 409, description = "An active resignation already exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn submit_resignation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: web::Json<ResignationReq>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let reason = payload.reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("A reason is required").into());
    }

    let statuses = sqlx::query_scalar::<_, String>("SELECT status FROM resignations WHERE employee_id = ?")
        .bind(employee_id)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::from)?;
    let has_active = statuses
        .iter()
        .filter_map(|s| s.parse::<ResignationStatus>().ok())
        .any(ResignationStatus::is_active);
    if has_active {
        return Err(ApiError::conflict("You already have an active resignation").into());
    }

    let submitted_on = Local::now().date_naive();
    let last_day = last_working_day(submitted_on, config.notice_period_days, payload.requested_last_day);

    let result = sqlx::query(
        "INSERT INTO resignations (employee_id, submitted_on, last_working_day, reason) VALUES (?, ?, ?, ?)",
    )
    .bind(employee_id)
    .bind(submitted_on)
    .bind(last_day)
    .bind(reason)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    info!(employee_id, last_working_day = %last_day, "Resignation submitted");

    Ok(HttpResponse::Created().json(json!({
        "message": "Resignation submitted",
        "id": result.last_insert_id(),
        "last_working_day": last_day
    })))
}

#[utoipa::path(
    get,
    path = "/api/exit/resignations",
    params(ResignationQuery),
    responses((status = 200, description = "HR sees all resignations, employees their own", body = [Resignation])),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn list_resignations(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<ResignationQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_filter = if auth.role.is_manager() {
        None
    } else {
        Some(auth.require_employee()?)
    };

    let rows = sqlx::query_as::<_, Resignation>(
        r#"
        SELECT * FROM resignations
        WHERE (? IS NULL OR employee_id = ?) AND (? IS NULL OR status = ?)
        ORDER BY created_at DESC
        "#,
    )
    .bind(employee_filter)
    .bind(employee_filter)
    .bind(query.status.as_deref())
    .bind(query.status.as_deref())
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    put,
    path = "/api/exit/resignations/{resignation_id}/accept",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    responses(
        (status = 200, description = "Accepted; clearance checklist created"),
        (status = 400, description = "Resignation is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn accept_resignation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let resignation_id = path.into_inner();

    let resignation = fetch_resignation(pool.get_ref(), resignation_id).await?;
    transition(
        pool.get_ref(),
        resignation_id,
        ResignationStatus::Pending,
        ResignationStatus::Accepted,
        Some(auth.user_id),
    )
    .await?;

    for department in &config.clearance_departments {
        sqlx::query("INSERT IGNORE INTO clearances (resignation_id, department) VALUES (?, ?)")
            .bind(resignation_id)
            .bind(department)
            .execute(pool.get_ref())
            .await
            .map_err(|e| {
                error!(error = %e, resignation_id, department = %department, "Failed to create clearance");
                ApiError::from(e)
            })?;
    }

    notify_best_effort(
        pool.get_ref(),
        resignation.employee_id,
        auth.employee_id,
        NotificationKind::ExitUpdate,
        &format!(
            "Your resignation was accepted. Last working day: {}",
            resignation.last_working_day
        ),
    )
    .await;

    info!(resignation_id, by = auth.user_id, "Resignation accepted");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Resignation accepted",
        "clearances": config.clearance_departments
    })))
}

#[utoipa::path(
    put,
    path = "/api/exit/resignations/{resignation_id}/reject",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    responses(
        (status = 200, description = "Resignation rejected"),
        (status = 400, description = "Resignation is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn reject_resignation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let resignation_id = path.into_inner();

    let resignation = fetch_resignation(pool.get_ref(), resignation_id).await?;
    transition(
        pool.get_ref(),
        resignation_id,
        ResignationStatus::Pending,
        ResignationStatus::Rejected,
        Some(auth.user_id),
    )
    .await?;

    notify_best_effort(
        pool.get_ref(),
        resignation.employee_id,
        auth.employee_id,
        NotificationKind::ExitUpdate,
        "Your resignation was not accepted. Please talk to HR.",
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Resignation rejected" })))
}

#[utoipa::path(
    put,
    path = "/api/exit/resignations/{resignation_id}/withdraw",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    responses(
        (status = 200, description = "Resignation withdrawn"),
        (status = 400, description = "Only pending resignations can be withdrawn"),
        (status = 403, description = "Not your resignation")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn withdraw_resignation(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let resignation_id = path.into_inner();

    let resignation = fetch_resignation(pool.get_ref(), resignation_id).await?;
    if resignation.employee_id != employee_id {
        return Err(ApiError::forbidden("You can only withdraw your own resignation").into());
    }

    transition(
        pool.get_ref(),
        resignation_id,
        ResignationStatus::Pending,
        ResignationStatus::Withdrawn,
        None,
    )
    .await?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Resignation withdrawn" })))
}

/* =========================
Clearance
========================= */
#[utoipa::path(
    put,
    path = "/api/exit/clearances/{clearance_id}",
    params(("clearance_id" = u64, Path, description = "Clearance ID")),
    request_body = ClearanceReq,
    responses(
        (status = 200, description = "Clearance updated"),
        (status = 404, description = "Clearance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn update_clearance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<ClearanceReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    check_clearance_status(payload.status)?;
    let clearance_id = path.into_inner();

    let result = sqlx::query("UPDATE clearances SET status = ?, remarks = ?, cleared_by = ? WHERE id = ?")
        .bind(payload.status.as_ref())
        .bind(payload.remarks.as_deref().map(str::trim))
        .bind(auth.user_id)
        .bind(clearance_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    // MySQL reports 0 rows when the values did not change.
    if result.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM clearances WHERE id = ?)")
            .bind(clearance_id)
            .fetch_one(pool.get_ref())
            .await
            .map_err(ApiError::from)?
            != 0;
        if !exists {
            return Err(ApiError::not_found("Clearance not found").into());
        }
    }

    info!(clearance_id, status = %payload.status, "Clearance updated");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Clearance updated",
        "status": payload.status
    })))
}

/* =========================
Knowledge transfer
========================= */
#[utoipa::path(
    post,
    path = "/api/exit/resignations/{resignation_id}/transfers",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    request_body = TransferReq,
    responses(
        (status = 201, description = "Knowledge transfer item created"),
        (status = 400, description = "Resignation is not accepted")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn create_transfer(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<TransferReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let resignation_id = path.into_inner();

    let topic = payload.topic.trim();
    if topic.is_empty() {
        return Err(ApiError::bad_request("A topic is required").into());
    }

    let resignation = fetch_resignation(pool.get_ref(), resignation_id).await?;
    if resignation.status != ResignationStatus::Accepted.as_ref() {
        return Err(ApiError::bad_request("Resignation is not accepted").into());
    }

    let result = sqlx::query(
        "INSERT INTO knowledge_transfers (resignation_id, assignee_id, topic) VALUES (?, ?, ?)",
    )
    .bind(resignation_id)
    .bind(payload.assignee_id)
    .bind(topic)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    if let Some(assignee) = payload.assignee_id {
        notify_best_effort(
            pool.get_ref(),
            assignee,
            auth.employee_id,
            NotificationKind::ExitUpdate,
            &format!("You were assigned a knowledge transfer: {topic}"),
        )
        .await;
    }

    Ok(HttpResponse::Created().json(json!({
        "message": "Knowledge transfer created",
        "id": result.last_insert_id()
    })))
}

#[utoipa::path(
    put,
    path = "/api/exit/transfers/{transfer_id}",
    params(("transfer_id" = u64, Path, description = "Knowledge transfer ID")),
    request_body = TransferStatusReq,
    responses(
        (status = 200, description = "Status advanced"),
        (status = 400, description = "Status can only move forward"),
        (status = 403, description = "Not the assignee, owner or HR")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn update_transfer(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<TransferStatusReq>,
) -> actix_web::Result<impl Responder> {
    let transfer_id = path.into_inner();

    let transfer = sqlx::query_as::<_, KnowledgeTransfer>("SELECT * FROM knowledge_transfers WHERE id = ?")
        .bind(transfer_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found("Knowledge transfer not found"))?;

    if !auth.role.is_manager() {
        let me = auth.require_employee()?;
        let owner = fetch_resignation(pool.get_ref(), transfer.resignation_id).await?.employee_id;
        if transfer.assignee_id != Some(me) && owner != me {
            return Err(ApiError::forbidden("Not allowed to update this knowledge transfer").into());
        }
    }

    check_transition(&transfer.status, payload.status)?;

    let result = sqlx::query("UPDATE knowledge_transfers SET status = ? WHERE id = ? AND status = ?")
        .bind(payload.status.as_ref())
        .bind(transfer_id)
        .bind(&transfer.status)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Knowledge transfer was updated concurrently").into());
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Knowledge transfer updated",
        "status": payload.status
    })))
}

/* =========================
Exit interview
========================= */
#[utoipa::path(
    post,
    path = "/api/exit/resignations/{resignation_id}/interview",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    request_body = InterviewReq,
    responses(
        (status = 201, description = "Interview scheduled"),
        (status = 409, description = "Interview already scheduled")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn schedule_interview(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<InterviewReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let resignation_id = path.into_inner();

    let resignation = fetch_resignation(pool.get_ref(), resignation_id).await?;
    if resignation.status != ResignationStatus::Accepted.as_ref() {
        return Err(ApiError::bad_request("Resignation is not accepted").into());
    }

    sqlx::query("INSERT INTO exit_interviews (resignation_id, scheduled_on, interviewer_id) VALUES (?, ?, ?)")
        .bind(resignation_id)
        .bind(payload.scheduled_on)
        .bind(payload.interviewer_id.or(auth.employee_id))
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::conflict("Exit interview already scheduled")
            } else {
                ApiError::from(e)
            }
        })?;

    notify_best_effort(
        pool.get_ref(),
        resignation.employee_id,
        auth.employee_id,
        NotificationKind::ExitUpdate,
        &format!("Your exit interview is scheduled on {}", payload.scheduled_on),
    )
    .await;

    Ok(HttpResponse::Created().json(json!({ "message": "Exit interview scheduled" })))
}

#[utoipa::path(
    put,
    path = "/api/exit/resignations/{resignation_id}/interview",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    request_body = InterviewFeedbackReq,
    responses(
        (status = 200, description = "Interview completed"),
        (status = 400, description = "Rating out of range or no scheduled interview")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn complete_interview(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<InterviewFeedbackReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    check_rating(payload.rating)?;
    let resignation_id = path.into_inner();

    let result = sqlx::query(
        r#"
        UPDATE exit_interviews
        SET feedback = ?, rating = ?, status = 'completed'
        WHERE resignation_id = ? AND status = 'scheduled'
        "#,
    )
    .bind(payload.feedback.as_deref().map(str::trim))
    .bind(payload.rating)
    .bind(resignation_id)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("No scheduled interview for this resignation").into());
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Exit interview completed" })))
}

/* =========================
Progress and offboarding
========================= */
#[utoipa::path(
    get,
    path = "/api/exit/{resignation_id}/progress",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    responses(
        (status = 200, description = "Stage summary", body = ExitProgress),
        (status = 404, description = "Resignation not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn progress(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let resignation = fetch_resignation(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(resignation.employee_id)?;

    let summary = load_progress(pool.get_ref(), &resignation).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    post,
    path = "/api/exit/{resignation_id}/offboard",
    params(("resignation_id" = u64, Path, description = "Resignation ID")),
    responses(
        (status = 200, description = "Employee removed and resignation completed"),
        (status = 400, description = "Exit stages are not finished", body = ExitProgress)
    ),
    security(("bearer_auth" = [])),
    tag = "Exit"
)]
pub async fn offboard(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let resignation_id = path.into_inner();

    let resignation = fetch_resignation(pool.get_ref(), resignation_id).await?;
    let summary = load_progress(pool.get_ref(), &resignation).await?;

    if !summary.ready_for_offboarding {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "Exit stages are not finished",
            "progress": summary
        })));
    }

    match remove_employee(pool.get_ref(), resignation.employee_id).await {
        Ok(()) => {}
        Err(ApiError::NotFound(_)) => {
            warn!(resignation_id, employee_id = resignation.employee_id, "Employee already removed");
        }
        Err(e) => return Err(e.into()),
    }

    transition(
        pool.get_ref(),
        resignation_id,
        ResignationStatus::Accepted,
        ResignationStatus::Completed,
        Some(auth.user_id),
    )
    .await?;

    info!(resignation_id, employee_id = resignation.employee_id, "Employee offboarded");

    Ok(HttpResponse::Ok().json(json!({ "message": "Employee offboarded" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_must_be_one_to_five() {
        assert!(check_rating(0).is_err());
        assert!(check_rating(1).is_ok());
        assert!(check_rating(5).is_ok());
        assert!(check_rating(6).is_err());
    }

    #[test]
    fn transfer_moves_forward_only() {
        assert!(check_transition("pending", TransferStatus::InProgress).is_ok());
        assert!(check_transition("pending", TransferStatus::Completed).is_ok());
        assert!(check_transition("in_progress", TransferStatus::Pending).is_err());
        assert!(check_transition("completed", TransferStatus::Completed).is_err());
    }

    #[test]
    fn clearance_cannot_be_reset_to_pending() {
        assert!(check_clearance_status(ClearanceStatus::Cleared).is_ok());
        assert!(check_clearance_status(ClearanceStatus::OnHold).is_ok());
        assert!(check_clearance_status(ClearanceStatus::Pending).is_err());
    }

    #[test]
    fn unknown_transfer_status_is_internal() {
        assert!(matches!(
            check_transition("paused", TransferStatus::Completed),
            Err(ApiError::Internal(_))
        ));
    }
}
