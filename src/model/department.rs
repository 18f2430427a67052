use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Department {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = 12, nullable = true)]
    pub head_employee_id: Option<u64>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}
