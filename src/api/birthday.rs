use crate::{
    api::{employee::fetch_employee, notification::notify},
    auth::auth::AuthUser,
    error::ApiError,
    model::{employee::display_name, notification::NotificationKind},
    utils::dates::{days_until_birthday, parse_flexible_date},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, info};
use utoipa::ToSchema;

/// Birthdays up to this many days ahead are listed.
pub const BIRTHDAY_WINDOW_DAYS: i64 = 4;

#[derive(Debug, Clone, FromRow)]
pub struct BirthdayRow {
    pub id: u64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub designation: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct UpcomingBirthday {
    pub employee_id: u64,
    pub name: String,
    pub designation: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date_of_birth: NaiveDate,
    pub days_until: i64,
    pub is_today: bool,
}

/// Employees whose next birthday is within `0..=window` days of `today`,
/// nearest first. Unparseable birth dates are skipped.
pub fn upcoming_birthdays(rows: &[BirthdayRow], today: NaiveDate, window: i64) -> Vec<UpcomingBirthday> {
    let mut upcoming: Vec<UpcomingBirthday> = rows
        .iter()
        .filter_map(|row| {
            let raw = row.date_of_birth.as_deref()?;
            let birth = match parse_flexible_date(raw) {
                Some(d) => d,
                None => {
                    debug!(employee_id = row.id, raw, "Skipping unparseable birth date");
                    return None;
                }
            };
            let days_until = days_until_birthday(birth, today)?;
            (0..=window).contains(&days_until).then(|| UpcomingBirthday {
                employee_id: row.id,
                name: display_name(&row.first_name, row.last_name.as_deref()),
                designation: row.designation.clone(),
                date_of_birth: birth,
                days_until,
                is_today: days_until == 0,
            })
        })
        .collect();

    upcoming.sort_by(|a, b| a.days_until.cmp(&b.days_until).then_with(|| a.name.cmp(&b.name)));
    upcoming
}

pub async fn load_upcoming(pool: &MySqlPool, today: NaiveDate) -> Result<Vec<UpcomingBirthday>, ApiError> {
    let rows = sqlx::query_as::<_, BirthdayRow>(
        r#"
        SELECT id, first_name, last_name, designation, date_of_birth
        FROM employees
        WHERE status = 'active' AND date_of_birth IS NOT NULL AND date_of_birth <> ''
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(upcoming_birthdays(&rows, today, BIRTHDAY_WINDOW_DAYS))
}

#[utoipa::path(
    get,
    path = "/api/birthdays/upcoming",
    responses((status = 200, description = "Birthdays in the next few days", body = [UpcomingBirthday])),
    tag = "Birthday",
    security(("bearer_auth" = []))
)]
pub async fn upcoming(_auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let today = Local::now().date_naive();
    let birthdays = load_upcoming(pool.get_ref(), today).await?;
    Ok(HttpResponse::Ok().json(birthdays))
}

#[derive(Deserialize, ToSchema)]
pub struct WishReq {
    #[schema(example = "Happy birthday!")]
    pub message: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/birthdays/{employee_id}/wish",
    params(("employee_id" = u64, Path, description = "Employee to wish")),
    request_body = WishReq,
    responses(
        (status = 201, description = "Wish delivered as a notification"),
        (status = 400, description = "Cannot wish yourself"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Birthday",
    security(("bearer_auth" = []))
)]
pub async fn wish(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<WishReq>,
) -> actix_web::Result<impl Responder> {
    let sender_id = auth.require_employee()?;
    let recipient_id = path.into_inner();

    if sender_id == recipient_id {
        return Err(ApiError::bad_request("You cannot wish yourself").into());
    }

    let sender = fetch_employee(pool.get_ref(), sender_id).await?;
    fetch_employee(pool.get_ref(), recipient_id).await?;

    let message = match payload.message.as_deref().map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => format!("{}: {}", sender.full_name(), m),
        None => format!("{} wished you a happy birthday!", sender.full_name()),
    };

    let id = notify(
        pool.get_ref(),
        recipient_id,
        Some(sender_id),
        NotificationKind::BirthdayWish,
        &message,
    )
    .await
    .map_err(ApiError::from)?;

    info!(sender_id, recipient_id, "Birthday wish sent");

    Ok(HttpResponse::Created().json(json!({
        "message": "Wish sent",
        "notification_id": id
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: u64, name: &str, dob: Option<&str>) -> BirthdayRow {
        BirthdayRow {
            id,
            first_name: name.into(),
            last_name: None,
            designation: None,
            date_of_birth: dob.map(str::to_string),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn birthday_today_is_flagged() {
        let result = upcoming_birthdays(&[row(1, "Asha", Some("1990-10-16"))], today(), BIRTHDAY_WINDOW_DAYS);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].days_until, 0);
        assert!(result[0].is_today);
    }

    #[test]
    fn window_is_zero_to_four_days() {
        let rows = [
            row(1, "Four", Some("20/10/1991")),
            row(2, "Five", Some("21/10/1991")),
            row(3, "Yesterday", Some("15/10/1991")),
        ];
        let result = upcoming_birthdays(&rows, today(), BIRTHDAY_WINDOW_DAYS);
        let names: Vec<_> = result.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Four"]);
        assert!(!result[0].is_today);
    }

    #[test]
    fn mixed_formats_sorted_by_distance() {
        let rows = [
            row(1, "Later", Some("Oct 19, 1988")),
            row(2, "Sooner", Some("17 Oct 1995")),
            row(3, "Missing", None),
            row(4, "Garbled", Some("someday")),
        ];
        let result = upcoming_birthdays(&rows, today(), BIRTHDAY_WINDOW_DAYS);
        let ids: Vec<_> = result.iter().map(|b| (b.employee_id, b.days_until)).collect();
        assert_eq!(ids, vec![(2, 1), (1, 3)]);
    }
}
