use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HolidayKind {
    Public,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(value_type = String, format = "date", example = "2026-12-25")]
    pub date: NaiveDate,
    #[schema(example = "Christmas Day")]
    pub name: String,
    #[schema(example = "public")]
    pub kind: String,
}
