use crate::{
    api::notification::notify_best_effort,
    api::holiday::holidays_for_year,
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, is_duplicate_key},
    model::{
        attendance::{
            Attendance, AttendanceEditRequest, AttendanceStatus, DayStatus, PunchAction, classify_day,
            minutes_to_hours, status_for_minutes, worked_minutes,
        },
        holiday::Holiday,
        notification::NotificationKind,
    },
    utils::{dates, db_utils::paginate},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

/// Location captured by the browser at punch time.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PunchReq {
    #[schema(example = 23.8103)]
    pub latitude: Option<f64>,
    #[schema(example = 90.4125)]
    pub longitude: Option<f64>,
    #[schema(example = "Gulshan 1, Dhaka")]
    pub address: Option<String>,
}

impl PunchReq {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(ApiError::bad_request("latitude must be between -90 and 90"));
            }
        }
        if let Some(lng) = self.longitude {
            if !(-180.0..=180.0).contains(&lng) {
                return Err(ApiError::bad_request("longitude must be between -180 and 180"));
            }
        }
        Ok(())
    }
}

async fn record_for_day(pool: &MySqlPool, employee_id: u64, date: NaiveDate) -> Result<Option<Attendance>, ApiError> {
    Ok(
        sqlx::query_as::<_, Attendance>("SELECT * FROM attendance WHERE employee_id = ? AND date = ?")
            .bind(employee_id)
            .bind(date)
            .fetch_optional(pool)
            .await?,
    )
}

/// Punch-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/punch-in",
    request_body = PunchReq,
    responses(
        (status = 200, description = "Punched in", body = Object, example = json!({
            "message": "Punched in successfully",
            "punch_in": "09:02:11"
        })),
        (status = 409, description = "Already punched in today"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn punch_in(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: Option<web::Json<PunchReq>>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();
    payload.validate()?;

    let now = Local::now().naive_local();

    sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, punch_in, punch_in_lat, punch_in_lng, punch_in_address, status)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(now.date())
    .bind(now.time())
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.address.as_deref())
    .bind(AttendanceStatus::Open.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("Already punched in today")
        } else {
            error!(error = %e, employee_id, "Punch-in failed");
            ApiError::from(e)
        }
    })?;

    info!(employee_id, "Punched in");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Punched in successfully",
        "punch_in": now.time().format("%H:%M:%S").to_string()
    })))
}

/// Punch-out endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/punch-out",
    request_body = PunchReq,
    responses(
        (status = 200, description = "Punched out", body = Object, example = json!({
            "message": "Punched out successfully",
            "worked_hours": 8.25,
            "status": "present"
        })),
        (status = 400, description = "No punch-in found for today"),
        (status = 409, description = "Already punched out today")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn punch_out(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    payload: Option<web::Json<PunchReq>>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let payload = payload.map(|p| p.into_inner()).unwrap_or_default();
    payload.validate()?;

    let now = Local::now().naive_local();

    let record = record_for_day(pool.get_ref(), employee_id, now.date())
        .await?
        .ok_or_else(|| ApiError::bad_request("No punch-in found for today"))?;

    if record.punch_out.is_some() {
        return Err(ApiError::conflict("Already punched out today").into());
    }

    let minutes = worked_minutes(record.punch_in, now.time())
        .ok_or_else(|| ApiError::bad_request("Punch-out cannot be earlier than punch-in"))?;
    let status = status_for_minutes(minutes, config.full_day_hours);

    let result = sqlx::query(
        r#"
        UPDATE attendance
        SET punch_out = ?, punch_out_lat = ?, punch_out_lng = ?, punch_out_address = ?,
            worked_minutes = ?, status = ?
        WHERE id = ? AND punch_out IS NULL
        "#,
    )
    .bind(now.time())
    .bind(payload.latitude)
    .bind(payload.longitude)
    .bind(payload.address.as_deref())
    .bind(minutes)
    .bind(status.as_ref())
    .bind(record.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Punch-out failed");
        ApiError::from(e)
    })?;

    if result.rows_affected() == 0 {
        return Err(ApiError::conflict("Already punched out today").into());
    }

    info!(employee_id, minutes, status = %status, "Punched out");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Punched out successfully",
        "worked_hours": minutes_to_hours(minutes),
        "status": status
    })))
}

#[derive(Serialize, ToSchema)]
pub struct TodayResponse {
    pub record: Option<Attendance>,
    pub next_action: PunchAction,
    pub worked_hours: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses((status = 200, description = "Today's record and the next available action", body = TodayResponse)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    let date = Local::now().date_naive();

    let record = record_for_day(pool.get_ref(), employee_id, date).await?;
    let next_action = PunchAction::for_today(record.as_ref());
    let worked_hours = record.as_ref().and_then(|r| r.worked_minutes).map(minutes_to_hours);

    Ok(HttpResponse::Ok().json(TodayResponse {
        record,
        next_action,
        worked_hours,
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    /// HR/Admin may view another employee's calendar
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CalendarDay {
    #[schema(example = "2026-10-16")]
    pub date: String,
    pub status: DayStatus,
    pub worked_hours: Option<f64>,
    pub holiday_name: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
pub struct CalendarSummary {
    pub present: u32,
    pub half_day: u32,
    pub absent: u32,
    pub holiday: u32,
    pub weekend: u32,
    pub total_hours: f64,
}

#[derive(Serialize, ToSchema)]
pub struct CalendarResponse {
    pub employee_id: u64,
    pub year: i32,
    pub month: u32,
    pub days: Vec<CalendarDay>,
    pub summary: CalendarSummary,
}

/// Colors every day of a month from attendance rows and holidays.
pub fn build_calendar(
    year: i32,
    month: u32,
    today: NaiveDate,
    records: &[Attendance],
    holidays: &[Holiday],
) -> Option<(Vec<CalendarDay>, CalendarSummary)> {
    let first = dates::first_of_month(year, month)?;
    let last = dates::last_of_month(year, month)?;

    let by_day: HashMap<NaiveDate, &Attendance> = records.iter().map(|r| (r.date, r)).collect();
    let holiday_names: HashMap<NaiveDate, &str> = holidays.iter().map(|h| (h.date, h.name.as_str())).collect();

    let mut summary = CalendarSummary::default();
    let mut minutes_total = 0i64;

    let days = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| {
            let record = by_day.get(&date).copied();
            let holiday = holiday_names.get(&date).copied();
            let status = classify_day(date, today, record, holiday.is_some());

            match status {
                DayStatus::Present => summary.present += 1,
                DayStatus::HalfDay => summary.half_day += 1,
                DayStatus::Absent => summary.absent += 1,
                DayStatus::Holiday => summary.holiday += 1,
                DayStatus::Weekend => summary.weekend += 1,
                DayStatus::Upcoming => {}
            }
            let worked = record.and_then(|r| r.worked_minutes);
            minutes_total += worked.unwrap_or(0);

            CalendarDay {
                date: dates::day_key(date),
                status,
                worked_hours: worked.map(minutes_to_hours),
                holiday_name: holiday.map(str::to_string),
            }
        })
        .collect();

    summary.total_hours = minutes_to_hours(minutes_total);
    Some((days, summary))
}

#[utoipa::path(
    get,
    path = "/api/attendance/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Per-day attendance colouring for a month", body = CalendarResponse),
        (status = 400, description = "Invalid month")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn calendar(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CalendarQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => {
            auth.require_self_or_hr(id)?;
            id
        }
        None => auth.require_employee()?,
    };

    let today = Local::now().date_naive();
    let year = query.year.unwrap_or(today.year());
    let month = query.month.unwrap_or(today.month());

    let (first, last) = match (dates::first_of_month(year, month), dates::last_of_month(year, month)) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(ApiError::bad_request("Invalid year or month").into()),
    };

    let records = sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE employee_id = ? AND date BETWEEN ? AND ? ORDER BY date",
    )
    .bind(employee_id)
    .bind(first)
    .bind(last)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    let holidays = holidays_for_year(pool.get_ref(), year).await?;

    let (days, summary) = build_calendar(year, month, today, &records, &holidays)
        .ok_or_else(|| ApiError::bad_request("Invalid year or month"))?;

    Ok(HttpResponse::Ok().json(CalendarResponse {
        employee_id,
        year,
        month,
        days,
        summary,
    }))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct AttendanceQuery {
    pub employee_id: Option<u64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<Attendance>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

enum FilterValue {
    U64(u64),
    Date(NaiveDate),
}

#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses((status = 200, description = "Paginated attendance records", body = AttendanceListResponse)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 20);

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args = Vec::new();

    if let Some(id) = query.employee_id {
        where_sql.push_str(" AND employee_id = ?");
        args.push(FilterValue::U64(id));
    }
    if let Some(from) = query.from {
        where_sql.push_str(" AND date >= ?");
        args.push(FilterValue::Date(from));
    }
    if let Some(to) = query.to {
        where_sql.push_str(" AND date <= ?");
        args.push(FilterValue::Date(to));
    }

    let count_sql = format!("SELECT COUNT(*) FROM attendance{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Date(d) => count_q.bind(*d),
        };
    }
    let total = count_q.fetch_one(pool.get_ref()).await.map_err(ApiError::from)?;

    let data_sql = format!(
        "SELECT * FROM attendance{} ORDER BY date DESC, employee_id LIMIT ? OFFSET ?",
        where_sql
    );
    let mut data_q = sqlx::query_as::<_, Attendance>(&data_sql);
    for arg in &args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(*v),
            FilterValue::Date(d) => data_q.bind(*d),
        };
    }
    let data = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EditRequestReq {
    #[schema(value_type = String, format = "date", example = "2026-10-14")]
    pub date: NaiveDate,
    #[schema(value_type = String, example = "09:00:00")]
    pub punch_in: NaiveTime,
    #[schema(value_type = String, example = "18:00:00")]
    pub punch_out: NaiveTime,
    #[schema(example = "Forgot to punch out")]
    pub reason: String,
}

impl EditRequestReq {
    fn validate(&self, today: NaiveDate) -> Result<(), ApiError> {
        if self.date > today {
            return Err(ApiError::bad_request("Cannot correct attendance for a future date"));
        }
        if worked_minutes(self.punch_in, self.punch_out).is_none() {
            return Err(ApiError::bad_request("punch_out must be after punch_in"));
        }
        if self.reason.trim().is_empty() {
            return Err(ApiError::bad_request("A reason is required"));
        }
        Ok(())
    }
}

#[utoipa::path(
    post,
    path = "/api/attendance/edit-requests",
    request_body = EditRequestReq,
    responses(
        (status = 201, description = "Correction submitted for approval"),
        (status = 400, description = "Invalid date, times or reason")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn create_edit_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<EditRequestReq>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;
    payload.validate(Local::now().date_naive())?;

    let pending = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance_edit_requests WHERE employee_id = ? AND date = ? AND status = 'pending'",
    )
    .bind(employee_id)
    .bind(payload.date)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::from)?;
    if pending > 0 {
        return Err(ApiError::conflict("A correction for this date is already pending").into());
    }

    let result = sqlx::query(
        r#"
        INSERT INTO attendance_edit_requests (employee_id, date, punch_in, punch_out, reason)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(payload.date)
    .bind(payload.punch_in)
    .bind(payload.punch_out)
    .bind(payload.reason.trim())
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Correction submitted",
        "id": result.last_insert_id(),
        "status": "pending"
    })))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct EditRequestQuery {
    /// Defaults to `pending`
    pub status: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/attendance/edit-requests",
    params(EditRequestQuery),
    responses((status = 200, description = "Corrections (HR sees all, employees their own)", body = [AttendanceEditRequest])),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_edit_requests(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<EditRequestQuery>,
) -> actix_web::Result<impl Responder> {
    let status = query.status.as_deref().unwrap_or("pending");

    let rows = if auth.role.is_manager() {
        sqlx::query_as::<_, AttendanceEditRequest>(
            "SELECT * FROM attendance_edit_requests WHERE status = ? ORDER BY created_at DESC",
        )
        .bind(status)
        .fetch_all(pool.get_ref())
        .await
    } else {
        let employee_id = auth.require_employee()?;
        sqlx::query_as::<_, AttendanceEditRequest>(
            "SELECT * FROM attendance_edit_requests WHERE employee_id = ? AND status = ? ORDER BY created_at DESC",
        )
        .bind(employee_id)
        .bind(status)
        .fetch_all(pool.get_ref())
        .await
    }
    .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(rows))
}

async fn fetch_edit_request(pool: &MySqlPool, request_id: u64) -> Result<AttendanceEditRequest, ApiError> {
    sqlx::query_as::<_, AttendanceEditRequest>("SELECT * FROM attendance_edit_requests WHERE id = ?")
        .bind(request_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Correction request not found"))
}

async fn review_edit_request(pool: &MySqlPool, request_id: u64, status: &str, reviewer: u64) -> Result<(), ApiError> {
    let result = sqlx::query(
        "UPDATE attendance_edit_requests SET status = ?, reviewed_by = ? WHERE id = ? AND status = 'pending'",
    )
    .bind(status)
    .bind(reviewer)
    .bind(request_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::bad_request("Correction request not found or already processed"));
    }
    Ok(())
}

#[utoipa::path(
    put,
    path = "/api/attendance/edit-requests/{request_id}/approve",
    params(("request_id" = u64, Path, description = "Correction request ID")),
    responses(
        (status = 200, description = "Correction applied to the attendance record"),
        (status = 400, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn approve_edit_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let request_id = path.into_inner();

    let request = fetch_edit_request(pool.get_ref(), request_id).await?;
    let minutes = worked_minutes(request.punch_in, request.punch_out)
        .ok_or_else(|| ApiError::bad_request("Stored correction has punch_out before punch_in"))?;
    let status = status_for_minutes(minutes, config.full_day_hours);

    review_edit_request(pool.get_ref(), request_id, "approved", auth.user_id).await?;

    // Second write; not rolled back if it fails.
    sqlx::query(
        r#"
        INSERT INTO attendance (employee_id, date, punch_in, punch_out, worked_minutes, status)
        VALUES (?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            punch_in = VALUES(punch_in),
            punch_out = VALUES(punch_out),
            worked_minutes = VALUES(worked_minutes),
            status = VALUES(status)
        "#,
    )
    .bind(request.employee_id)
    .bind(request.date)
    .bind(request.punch_in)
    .bind(request.punch_out)
    .bind(minutes)
    .bind(status.as_ref())
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, request_id, "Correction approved but attendance write failed");
        ApiError::from(e)
    })?;

    notify_best_effort(
        pool.get_ref(),
        request.employee_id,
        auth.employee_id,
        NotificationKind::AttendanceUpdate,
        &format!("Your attendance correction for {} was approved", request.date),
    )
    .await;

    info!(request_id, employee_id = request.employee_id, "Attendance correction approved");

    Ok(HttpResponse::Ok().json(json!({ "message": "Correction approved" })))
}

#[utoipa::path(
    put,
    path = "/api/attendance/edit-requests/{request_id}/reject",
    params(("request_id" = u64, Path, description = "Correction request ID")),
    responses(
        (status = 200, description = "Correction rejected"),
        (status = 400, description = "Already processed")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn reject_edit_request(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let request_id = path.into_inner();

    let request = fetch_edit_request(pool.get_ref(), request_id).await?;
    review_edit_request(pool.get_ref(), request_id, "rejected", auth.user_id).await?;

    notify_best_effort(
        pool.get_ref(),
        request.employee_id,
        auth.employee_id,
        NotificationKind::AttendanceUpdate,
        &format!("Your attendance correction for {} was rejected", request.date),
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "message": "Correction rejected" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    fn attended(day: u32, minutes: i64, status: &str) -> Attendance {
        Attendance {
            id: u64::from(day),
            employee_id: 1,
            date: d(day),
            punch_in: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            punch_in_lat: None,
            punch_in_lng: None,
            punch_in_address: None,
            punch_out: NaiveTime::from_hms_opt(9, 0, 0).map(|t| t + chrono::Duration::minutes(minutes)),
            punch_out_lat: None,
            punch_out_lng: None,
            punch_out_address: None,
            worked_minutes: Some(minutes),
            status: status.into(),
        }
    }

    #[test]
    fn calendar_covers_whole_month_and_counts() {
        let records = [attended(1, 480, "present"), attended(2, 240, "half_day")];
        let holidays = [Holiday {
            id: 1,
            date: d(6),
            name: "Founders Day".into(),
            kind: "public".into(),
        }];

        let (days, summary) = build_calendar(2026, 10, d(16), &records, &holidays).unwrap();

        assert_eq!(days.len(), 31);
        assert_eq!(days[0].date, "2026-10-01");
        assert_eq!(days[0].status, DayStatus::Present);
        assert_eq!(days[1].status, DayStatus::HalfDay);
        assert_eq!(days[5].status, DayStatus::Holiday);
        assert_eq!(days[5].holiday_name.as_deref(), Some("Founders Day"));
        assert_eq!(days[20].status, DayStatus::Upcoming);

        assert_eq!(summary.present, 1);
        assert_eq!(summary.half_day, 1);
        assert_eq!(summary.holiday, 1);
        // Oct 3-4 and 10-11 are weekends before the 16th.
        assert_eq!(summary.weekend, 4);
        // 16 past-or-today days minus two worked, one holiday, four weekend days.
        assert_eq!(summary.absent, 9);
        assert_eq!(summary.total_hours, 12.0);
    }

    #[test]
    fn invalid_month_yields_none() {
        assert!(build_calendar(2026, 13, d(16), &[], &[]).is_none());
    }

    #[test]
    fn punch_location_bounds() {
        let ok = PunchReq {
            latitude: Some(23.8),
            longitude: Some(90.4),
            address: None,
        };
        assert!(ok.validate().is_ok());

        let bad = PunchReq {
            latitude: Some(123.0),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn edit_request_rules() {
        let req = EditRequestReq {
            date: d(14),
            punch_in: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            punch_out: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            reason: "Forgot to punch out".into(),
        };
        assert!(req.validate(d(16)).is_ok());
        assert!(req.validate(d(13)).is_err());

        let inverted = EditRequestReq {
            punch_in: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
            punch_out: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            ..req
        };
        assert!(inverted.validate(d(16)).is_err());
    }
}
