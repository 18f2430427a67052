use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

use crate::error::ApiError;

/// SQL bindable value
#[derive(Debug, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Columns stored as free text even when the value looks like a date.
const TEXT_COLUMNS: &[&str] = &["date_of_birth"];

fn to_sql_value(column: &str, value: &Value) -> Result<SqlValue, ApiError> {
    Ok(match value {
        Value::String(s) if TEXT_COLUMNS.contains(&column) => SqlValue::String(s.clone()),
        Value::String(s) => {
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                SqlValue::Date(d)
            } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                SqlValue::DateTime(dt)
            } else {
                SqlValue::String(s.clone())
            }
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::I64(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::F64(f)
            } else {
                return Err(ApiError::bad_request(format!("{column}: number out of range")));
            }
        }
        Value::Bool(b) => SqlValue::Bool(*b),
        Value::Null => SqlValue::Null,
        _ => return Err(ApiError::bad_request(format!("{column}: unsupported value type"))),
    })
}

/// Builds `UPDATE table SET ... WHERE id_column = ?` from a JSON object.
/// Keys outside `allowed` are rejected, so column names never come from the caller unchecked.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, ApiError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ApiError::bad_request("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ApiError::bad_request("No fields provided for update"));
    }

    if let Some(bad) = obj.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ApiError::bad_request(format!("Field '{bad}' cannot be updated")));
    }

    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values = Vec::with_capacity(obj.len() + 1);
    for (column, value) in obj {
        values.push(to_sql_value(column, value)?);
    }
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Page number and size clamped to sane bounds, plus the row offset.
pub fn paginate(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> (u32, u32, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, 100);
    let offset = u64::from(page - 1) * u64::from(per_page);
    (page, per_page, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ALLOWED: &[&str] = &["phone", "joining_date", "monthly_salary", "date_of_birth"];

    #[test]
    fn builds_set_clause_and_typed_values() {
        let update =
            build_update_sql("employees", &json!({"joining_date": "2026-01-05"}), ALLOWED, "id", 12).unwrap();

        assert_eq!(update.sql, "UPDATE employees SET joining_date = ? WHERE id = ?");
        assert_eq!(
            update.values,
            vec![
                SqlValue::Date(NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()),
                SqlValue::U64(12),
            ]
        );
    }

    #[test]
    fn id_is_bound_last() {
        let update = build_update_sql(
            "employees",
            &json!({"phone": "+880100", "monthly_salary": 52000.5}),
            ALLOWED,
            "id",
            7,
        )
        .unwrap();

        assert!(update.sql.contains("phone = ?"));
        assert!(update.sql.contains("monthly_salary = ?"));
        assert_eq!(update.values.len(), 3);
        assert_eq!(update.values.last(), Some(&SqlValue::U64(7)));
        assert!(update.values.contains(&SqlValue::F64(52000.5)));
    }

    #[test]
    fn birth_date_stays_text() {
        let update =
            build_update_sql("employees", &json!({"date_of_birth": "1990-07-14"}), ALLOWED, "id", 1).unwrap();
        assert_eq!(update.values[0], SqlValue::String("1990-07-14".into()));
    }

    #[test]
    fn rejects_unknown_columns() {
        let err = build_update_sql("employees", &json!({"status": "active"}), ALLOWED, "id", 1).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.contains("status")));
    }

    #[test]
    fn rejects_empty_and_non_object_payloads() {
        assert!(build_update_sql("employees", &json!({}), ALLOWED, "id", 1).is_err());
        assert!(build_update_sql("employees", &json!([1, 2]), ALLOWED, "id", 1).is_err());
    }

    #[test]
    fn pagination_is_clamped() {
        assert_eq!(paginate(None, None, 20), (1, 20, 0));
        assert_eq!(paginate(Some(3), Some(500), 20), (3, 100, 200));
        assert_eq!(paginate(Some(0), Some(0), 20), (1, 1, 0));
    }
}
