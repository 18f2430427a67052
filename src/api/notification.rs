use crate::{
    auth::auth::AuthUser,
    error::ApiError,
    model::notification::{Notification, NotificationKind},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use utoipa::IntoParams;

/// Stores a notification for `recipient_id`; returns its id.
pub async fn notify(
    pool: &MySqlPool,
    recipient_id: u64,
    sender_id: Option<u64>,
    kind: NotificationKind,
    message: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO notifications (recipient_id, sender_id, kind, message) VALUES (?, ?, ?, ?)",
    )
    .bind(recipient_id)
    .bind(sender_id)
    .bind(kind.as_ref())
    .bind(message)
    .execute(pool)
    .await?;

    Ok(result.last_insert_id())
}

/// Notification delivery never fails the action that triggered it.
pub async fn notify_best_effort(
    pool: &MySqlPool,
    recipient_id: u64,
    sender_id: Option<u64>,
    kind: NotificationKind,
    message: &str,
) {
    if let Err(e) = notify(pool, recipient_id, sender_id, kind, message).await {
        tracing::warn!(error = %e, recipient_id, kind = %kind, "Failed to write notification");
    }
}

#[derive(Deserialize, IntoParams)]
pub struct NotificationQuery {
    /// Only unread notifications
    pub unread: Option<bool>,
    /// Maximum number of rows (default 50)
    pub limit: Option<u32>,
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses((status = 200, description = "Own notifications, unread first", body = [Notification])),
    tag = "Notification",
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<NotificationQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let sql = if query.unread.unwrap_or(false) {
        "SELECT * FROM notifications WHERE recipient_id = ? AND is_read = FALSE ORDER BY created_at DESC LIMIT ?"
    } else {
        "SELECT * FROM notifications WHERE recipient_id = ? ORDER BY is_read ASC, created_at DESC LIMIT ?"
    };

    let rows = sqlx::query_as::<_, Notification>(sql)
        .bind(employee_id)
        .bind(limit)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    put,
    path = "/api/notifications/{notification_id}/read",
    params(("notification_id" = u64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Marked as read"),
        (status = 404, description = "Not found or not yours")
    ),
    tag = "Notification",
    security(("bearer_auth" = []))
)]
pub async fn mark_read(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let notification_id = path.into_inner();

    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = ? AND recipient_id = ?")
        .bind(notification_id)
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    if result.rows_affected() == 0 {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE id = ? AND recipient_id = ?",
        )
        .bind(notification_id)
        .bind(employee_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

        if exists == 0 {
            return Err(ApiError::not_found("Notification not found").into());
        }
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Marked as read" })))
}

#[utoipa::path(
    put,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "All notifications marked as read")),
    tag = "Notification",
    security(("bearer_auth" = []))
)]
pub async fn mark_all_read(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE recipient_id = ? AND is_read = FALSE")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "All notifications marked as read",
        "updated": result.rows_affected()
    })))
}
