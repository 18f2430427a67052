use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Login account for an existing employee.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AccountReq {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
    #[schema(example = 3)]
    pub role_id: u8,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountReq {
    #[schema(example = 12)]
    pub employee_id: u64,
    #[serde(flatten)]
    pub account: AccountReq,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    pub username: String,
    pub password: String,
}

#[derive(FromRow)]
pub struct UserSql {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
