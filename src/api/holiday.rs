use crate::{
    auth::auth::AuthUser,
    error::{ApiError, is_duplicate_key},
    model::holiday::{Holiday, HolidayKind},
    utils::{cache, dates},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};

/// Holidays for a calendar year, served from cache when possible.
pub async fn holidays_for_year(pool: &MySqlPool, year: i32) -> Result<Arc<Vec<Holiday>>, ApiError> {
    if let Some(cached) = cache::holidays_for_year(year).await {
        return Ok(cached);
    }

    let generation = cache::holiday_generation(year).await;
    let (from, to) = match (dates::first_of_month(year, 1), dates::last_of_month(year, 12)) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(ApiError::bad_request("Invalid year")),
    };

    let holidays = sqlx::query_as::<_, Holiday>(
        "SELECT * FROM holidays WHERE date BETWEEN ? AND ? ORDER BY date",
    )
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(cache::store_holidays(year, generation, holidays).await)
}

#[derive(Deserialize, IntoParams)]
pub struct HolidayQuery {
    /// Calendar year; defaults to the current one
    pub year: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct HolidayReq {
    #[schema(value_type = String, format = "date", example = "2026-12-25")]
    pub date: NaiveDate,
    #[schema(example = "Christmas Day")]
    pub name: String,
    pub kind: Option<HolidayKind>,
}

#[utoipa::path(
    get,
    path = "/api/holidays",
    params(HolidayQuery),
    responses((status = 200, description = "Holidays of the year", body = [Holiday])),
    tag = "Holiday",
    security(("bearer_auth" = []))
)]
pub async fn list_holidays(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HolidayQuery>,
) -> actix_web::Result<impl Responder> {
    let year = query.year.unwrap_or_else(|| Local::now().year());
    let holidays = holidays_for_year(pool.get_ref(), year).await?;
    Ok(HttpResponse::Ok().json(holidays.as_ref()))
}

#[utoipa::path(
    post,
    path = "/api/holidays",
    request_body = HolidayReq,
    responses(
        (status = 201, description = "Holiday created"),
        (status = 409, description = "A holiday already exists on that date")
    ),
    tag = "Holiday",
    security(("bearer_auth" = []))
)]
pub async fn create_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<HolidayReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Holiday name is required").into());
    }

    let kind = payload.kind.unwrap_or(HolidayKind::Public);
    let result = sqlx::query("INSERT INTO holidays (date, name, kind) VALUES (?, ?, ?)")
        .bind(payload.date)
        .bind(name)
        .bind(kind.as_ref())
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::conflict("A holiday already exists on that date")
            } else {
                ApiError::from(e)
            }
        })?;

    cache::invalidate_holidays(payload.date.year()).await;
    info!(date = %payload.date, name, "Holiday created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Holiday created",
        "id": result.last_insert_id()
    })))
}

async fn fetch_holiday(pool: &MySqlPool, holiday_id: u64) -> Result<Holiday, ApiError> {
    sqlx::query_as::<_, Holiday>("SELECT * FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Holiday not found"))
}

#[utoipa::path(
    put,
    path = "/api/holidays/{holiday_id}",
    params(("holiday_id" = u64, Path, description = "Holiday ID")),
    request_body = HolidayReq,
    responses(
        (status = 200, description = "Holiday updated"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Holiday",
    security(("bearer_auth" = []))
)]
pub async fn update_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<HolidayReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let holiday_id = path.into_inner();

    if payload.name.trim().is_empty() {
        return Err(ApiError::bad_request("Holiday name is required").into());
    }

    let existing = fetch_holiday(pool.get_ref(), holiday_id).await?;
    let kind = payload.kind.unwrap_or(HolidayKind::Public);

    sqlx::query("UPDATE holidays SET date = ?, name = ?, kind = ? WHERE id = ?")
        .bind(payload.date)
        .bind(payload.name.trim())
        .bind(kind.as_ref())
        .bind(holiday_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            if is_duplicate_key(&e) {
                ApiError::conflict("A holiday already exists on that date")
            } else {
                ApiError::from(e)
            }
        })?;

    cache::invalidate_holidays(existing.date.year()).await;
    cache::invalidate_holidays(payload.date.year()).await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Holiday updated" })))
}

#[utoipa::path(
    delete,
    path = "/api/holidays/{holiday_id}",
    params(("holiday_id" = u64, Path, description = "Holiday ID")),
    responses(
        (status = 200, description = "Holiday deleted"),
        (status = 404, description = "Holiday not found")
    ),
    tag = "Holiday",
    security(("bearer_auth" = []))
)]
pub async fn delete_holiday(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let holiday_id = path.into_inner();

    let existing = fetch_holiday(pool.get_ref(), holiday_id).await?;

    sqlx::query("DELETE FROM holidays WHERE id = ?")
        .bind(holiday_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    cache::invalidate_holidays(existing.date.year()).await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Holiday deleted" })))
}
