use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use crate::{
    api::employee::fetch_employee,
    auth::auth::AuthUser,
    error::{ApiError, is_duplicate_key},
    model::salary_slip::{SalarySlip, SlipFigures, SlipInputs},
    utils::{dates, db_utils::paginate},
};

#[derive(Deserialize, ToSchema)]
pub struct CreateSlip {
    #[schema(example = 1001)]
    pub employee_id: u64,

    #[schema(example = 2026)]
    pub year: i32,

    #[schema(example = 9)]
    pub month: u32,

    #[schema(example = 5000.0)]
    #[serde(default)]
    pub bonus: f64,

    #[schema(example = 500.0)]
    #[serde(default)]
    pub other_deductions: f64,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSlip {
    /// Overrides the salary captured when the slip was generated
    #[schema(example = 52000.0)]
    pub monthly_salary: Option<f64>,

    #[schema(example = 6000.0)]
    pub bonus: Option<f64>,

    #[schema(example = 2500.0)]
    pub other_deductions: Option<f64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SlipQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,

    #[schema(example = 10)]
    pub per_page: Option<u32>,

    #[schema(example = 1001)]
    pub employee_id: Option<u64>,

    /// Any date inside the pay month, e.g. `2026-09-01`
    #[schema(example = "2026-09-01", value_type = Option<String>, format = "date")]
    pub month: Option<NaiveDate>,
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedSlipResponse {
    pub data: Vec<SalarySlip>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct LwpLeave {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub half_day: bool,
}

/// Approved LWP days falling inside `first..=last`.
pub fn lwp_days_in_month(leaves: &[LwpLeave], first: NaiveDate, last: NaiveDate) -> f64 {
    leaves
        .iter()
        .map(|l| {
            let days = dates::overlap_days(l.start_date, l.end_date, first, last);
            if l.half_day && days > 0 { 0.5 } else { days as f64 }
        })
        .sum()
}

/// Pay month bounds: first day, last day, and day count.
fn month_bounds(year: i32, month: u32) -> Result<(NaiveDate, NaiveDate, u32), ApiError> {
    match (
        dates::first_of_month(year, month),
        dates::last_of_month(year, month),
        dates::days_in_month(year, month),
    ) {
        (Some(first), Some(last), Some(days)) => Ok((first, last, days)),
        _ => Err(ApiError::bad_request("Invalid year or month")),
    }
}

async fn count_lwp_days(pool: &MySqlPool, employee_id: u64, first: NaiveDate, last: NaiveDate) -> Result<f64, ApiError> {
    let leaves = sqlx::query_as::<_, LwpLeave>(
        r#"
        SELECT start_date, end_date, half_day
        FROM leave_requests
        WHERE employee_id = ? AND leave_type = 'LWP' AND status = 'approved'
          AND start_date <= ? AND end_date >= ?
        "#,
    )
    .bind(employee_id)
    .bind(last)
    .bind(first)
    .fetch_all(pool)
    .await?;

    Ok(lwp_days_in_month(&leaves, first, last))
}

fn validate_amounts(bonus: f64, other_deductions: f64) -> Result<(), ApiError> {
    if bonus < 0.0 || other_deductions < 0.0 {
        return Err(ApiError::bad_request("bonus and other_deductions cannot be negative"));
    }
    Ok(())
}

async fn fetch_slip(pool: &MySqlPool, slip_id: u64) -> Result<SalarySlip, ApiError> {
    sqlx::query_as::<_, SalarySlip>("SELECT * FROM salary_slips WHERE id = ?")
        .bind(slip_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Salary slip not found"))
}

#[utoipa::path(
    post,
    path = "/api/salary-slips",
    request_body = CreateSlip,
    responses(
        (status = 201, description = "Slip generated", body = SlipFigures),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "A slip already exists for that month")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_slip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateSlip>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    validate_amounts(payload.bonus, payload.other_deductions)?;

    let (first, last, days_in_month) = month_bounds(payload.year, payload.month)?;
    let employee = fetch_employee(pool.get_ref(), payload.employee_id).await?;
    let lwp_days = count_lwp_days(pool.get_ref(), employee.id, first, last).await?;

    let inputs = SlipInputs {
        monthly_salary: employee.monthly_salary,
        bonus: payload.bonus,
        other_deductions: payload.other_deductions,
        lwp_days,
        days_in_month,
    };
    let figures = inputs.compute();

    let result = sqlx::query(
        r#"
        INSERT INTO salary_slips
        (employee_id, month, monthly_salary, basic, hra, special_allowance, bonus,
         provident_fund, professional_tax, other_deductions, lwp_days, lwp_deduction, gross, net)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee.id)
    .bind(first)
    .bind(inputs.monthly_salary)
    .bind(figures.basic)
    .bind(figures.hra)
    .bind(figures.special_allowance)
    .bind(inputs.bonus)
    .bind(figures.provident_fund)
    .bind(figures.professional_tax)
    .bind(inputs.other_deductions)
    .bind(inputs.lwp_days)
    .bind(figures.lwp_deduction)
    .bind(figures.gross)
    .bind(figures.net)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("A salary slip already exists for this employee and month")
        } else {
            error!(error = %e, employee_id = employee.id, "Failed to store salary slip");
            ApiError::from(e)
        }
    })?;

    info!(employee_id = employee.id, month = %first, net = figures.net, "Salary slip generated");

    Ok(HttpResponse::Created().json(json!({
        "message": "Salary slip generated",
        "id": result.last_insert_id(),
        "figures": figures
    })))
}

#[utoipa::path(
    put,
    path = "/api/salary-slips/{slip_id}",
    request_body = UpdateSlip,
    params(
        ("slip_id" = u64, Path, description = "Salary slip ID")
    ),
    responses(
        (status = 200, description = "Slip recomputed", body = SlipFigures),
        (status = 404, description = "Slip not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn update_slip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateSlip>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let slip_id = path.into_inner();

    let slip = fetch_slip(pool.get_ref(), slip_id).await?;

    let bonus = payload.bonus.unwrap_or(slip.bonus);
    let other_deductions = payload.other_deductions.unwrap_or(slip.other_deductions);
    validate_amounts(bonus, other_deductions)?;

    let (first, last, days_in_month) = month_bounds(slip.month.year(), slip.month.month())?;
    let lwp_days = count_lwp_days(pool.get_ref(), slip.employee_id, first, last).await?;

    let inputs = SlipInputs {
        monthly_salary: payload.monthly_salary.unwrap_or(slip.monthly_salary),
        bonus,
        other_deductions,
        lwp_days,
        days_in_month,
    };
    let figures = inputs.compute();

    sqlx::query(
        r#"
        UPDATE salary_slips
        SET monthly_salary = ?, basic = ?, hra = ?, special_allowance = ?, bonus = ?,
            provident_fund = ?, professional_tax = ?, other_deductions = ?,
            lwp_days = ?, lwp_deduction = ?, gross = ?, net = ?
        WHERE id = ?
        "#,
    )
    .bind(inputs.monthly_salary)
    .bind(figures.basic)
    .bind(figures.hra)
    .bind(figures.special_allowance)
    .bind(inputs.bonus)
    .bind(figures.provident_fund)
    .bind(figures.professional_tax)
    .bind(inputs.other_deductions)
    .bind(inputs.lwp_days)
    .bind(figures.lwp_deduction)
    .bind(figures.gross)
    .bind(figures.net)
    .bind(slip_id)
    .execute(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Salary slip updated",
        "figures": figures
    })))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips/{slip_id}",
    params(
        ("slip_id" = u64, Path, description = "Salary slip ID")
    ),
    responses(
        (status = 200, body = SalarySlip),
        (status = 404, description = "Slip not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_slip(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let slip = fetch_slip(pool.get_ref(), path.into_inner()).await?;
    auth.require_self_or_hr(slip.employee_id)?;
    Ok(HttpResponse::Ok().json(slip))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips",
    params(SlipQuery),
    responses(
        (status = 200, body = PaginatedSlipResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_slips(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<SlipQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 10);
    let month = query
        .month
        .and_then(|m| dates::first_of_month(m.year(), m.month()));

    // NULL parameters disable their filter.
    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM salary_slips
        WHERE (? IS NULL OR employee_id = ?) AND (? IS NULL OR month = ?)
        "#,
    )
    .bind(query.employee_id)
    .bind(query.employee_id)
    .bind(month)
    .bind(month)
    .fetch_one(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    let data = sqlx::query_as::<_, SalarySlip>(
        r#"
        SELECT * FROM salary_slips
        WHERE (? IS NULL OR employee_id = ?) AND (? IS NULL OR month = ?)
        ORDER BY month DESC, employee_id
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(query.employee_id)
    .bind(query.employee_id)
    .bind(month)
    .bind(month)
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(PaginatedSlipResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/salary-slips/me",
    responses(
        (status = 200, description = "Own salary slips, newest first", body = [SalarySlip])
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn my_slips(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee()?;

    let slips = sqlx::query_as::<_, SalarySlip>(
        "SELECT * FROM salary_slips WHERE employee_id = ? ORDER BY month DESC",
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(slips))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn leave(start: NaiveDate, end: NaiveDate, half_day: bool) -> LwpLeave {
        LwpLeave { start_date: start, end_date: end, half_day }
    }

    #[test]
    fn counts_only_days_inside_the_month() {
        let leaves = [
            leave(d(8, 30), d(9, 2), false),
            leave(d(9, 10), d(9, 11), false),
            leave(d(9, 29), d(10, 3), false),
        ];
        assert_eq!(lwp_days_in_month(&leaves, d(9, 1), d(9, 30)), 6.0);
    }

    #[test]
    fn half_day_counts_as_half() {
        let leaves = [leave(d(9, 15), d(9, 15), true), leave(d(10, 1), d(10, 1), true)];
        assert_eq!(lwp_days_in_month(&leaves, d(9, 1), d(9, 30)), 0.5);
    }

    #[test]
    fn month_bounds_reject_bad_month() {
        assert!(month_bounds(2026, 0).is_err());
        let (first, last, days) = month_bounds(2028, 2).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
        assert_eq!(days, 29);
    }

    #[test]
    fn negative_amounts_rejected() {
        assert!(validate_amounts(-1.0, 0.0).is_err());
        assert!(validate_amounts(0.0, 0.0).is_ok());
    }
}
