use crate::{
    api::birthday::{UpcomingBirthday, load_upcoming},
    auth::auth::AuthUser,
    error::ApiError,
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct DashboardSummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub headcount: i64,
    pub present_today: i64,
    pub on_leave_today: i64,
    pub pending_leave_requests: i64,
    pub pending_attendance_edits: i64,
    pub upcoming_birthdays: usize,
    pub birthdays: Vec<UpcomingBirthday>,
}

async fn count(pool: &MySqlPool, sql: &str, dates: &[NaiveDate]) -> Result<i64, ApiError> {
    let mut query = sqlx::query_scalar::<_, i64>(sql);
    for d in dates {
        query = query.bind(*d);
    }
    Ok(query.fetch_one(pool).await?)
}

#[utoipa::path(
    get,
    path = "/api/dashboard",
    responses(
        (status = 200, description = "Headline numbers for HR", body = DashboardSummary),
        (status = 403, description = "HR/Admin only")
    ),
    tag = "Dashboard",
    security(("bearer_auth" = []))
)]
pub async fn summary(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let pool = pool.get_ref();
    let today = Local::now().date_naive();

    let headcount = count(pool, "SELECT COUNT(*) FROM employees WHERE status = 'active'", &[]).await?;
    let present_today = count(
        pool,
        "SELECT COUNT(*) FROM attendance WHERE date = ?",
        &[today],
    )
    .await?;
    let on_leave_today = count(
        pool,
        r#"
        SELECT COUNT(DISTINCT employee_id) FROM leave_requests
        WHERE status = 'approved' AND start_date <= ? AND end_date >= ?
        "#,
        &[today, today],
    )
    .await?;
    let pending_leave_requests =
        count(pool, "SELECT COUNT(*) FROM leave_requests WHERE status = 'pending'", &[]).await?;
    let pending_attendance_edits =
        count(pool, "SELECT COUNT(*) FROM attendance_edit_requests WHERE status = 'pending'", &[]).await?;

    let birthdays = load_upcoming(pool, today).await?;

    Ok(HttpResponse::Ok().json(DashboardSummary {
        date: today,
        headcount,
        present_today,
        on_leave_today,
        pending_leave_requests,
        pending_attendance_edits,
        upcoming_birthdays: birthdays.len(),
        birthdays,
    }))
}
