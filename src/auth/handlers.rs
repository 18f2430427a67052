use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, password_is_acceptable, verify_password},
    },
    config::Config,
    error::{ApiError, is_duplicate_key},
    model::role::Role,
    models::{AccountReq, Claims, CreateAccountReq, LoginReqDto, TokenType, UserSql},
    utils::{cache, username_filter},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_username_available(username: &str, pool: &MySqlPool) -> Result<bool, ApiError> {
    let username = username_filter::normalize(username);

    // Cuckoo filter: a miss is definitive.
    if !username_filter::might_exist(&username) {
        return Ok(true);
    }

    // Moka cache: a hit is definitive.
    if cache::is_username_taken(&username).await {
        return Ok(false);
    }

    let exists = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(username) = ? LIMIT 1)",
    )
    .bind(&username)
    .fetch_one(pool)
    .await?
        != 0;

    if exists {
        cache::mark_username_taken(&username).await;
    }

    Ok(!exists)
}

/// Creates a login account linked to `employee_id`; returns the user id.
pub async fn create_account(pool: &MySqlPool, employee_id: u64, account: &AccountReq) -> Result<u64, ApiError> {
    let username = username_filter::normalize(&account.username);

    if username.is_empty() {
        return Err(ApiError::bad_request("Username must not be empty"));
    }
    if !password_is_acceptable(&account.password) {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if Role::from_id(account.role_id).is_none() {
        return Err(ApiError::bad_request("Unknown role"));
    }
    if !is_username_available(&username, pool).await? {
        return Err(ApiError::conflict("Username already taken"));
    }

    let hashed = hash_password(&account.password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let result = sqlx::query(
        r#"INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#,
    )
    .bind(&username)
    .bind(&hashed)
    .bind(account.role_id)
    .bind(employee_id)
    .execute(pool)
    .await
    .map_err(|e| {
        if is_duplicate_key(&e) {
            ApiError::conflict("Username already exists")
        } else {
            ApiError::from(e)
        }
    })?;

    username_filter::insert(&username);
    cache::mark_username_taken(&username).await;

    Ok(result.last_insert_id())
}

/// Create a login account for an existing employee (Admin only)
#[utoipa::path(
    post,
    path = "/api/accounts",
    request_body = CreateAccountReq,
    responses(
        (status = 201, description = "Account created"),
        (status = 400, description = "Invalid username, password or role"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn register(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAccountReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let exists = sqlx::query_scalar::<_, i64>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = ?)")
        .bind(payload.employee_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::from)?
        != 0;
    if !exists {
        return Err(ApiError::not_found("Employee not found").into());
    }

    let user_id = create_account(pool.get_ref(), payload.employee_id, &payload.account).await?;
    info!(user_id, employee_id = payload.employee_id, "Account created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Account created",
        "user_id": user_id
    })))
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    ApiError::Internal(format!("token encoding failed: {e}"))
}

async fn store_refresh_token(pool: &MySqlPool, user_id: u64, claims: &Claims) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = LoginResponse),
        (status = 401, description = "Invalid credentials or blocked account")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(username = %user.username))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::bad_request("Username or password required").into());
    }

    let username = username_filter::normalize(&user.username);

    debug!("Fetching user from database");
    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&username)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        ApiError::from(e)
    })?;

    let db_user = match db_user {
        Some(u) => u,
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::Unauthorized("Invalid credentials".into()).into());
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()).into());
    }

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account blocked");
        return Err(ApiError::Unauthorized("Account is blocked".into()).into());
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };

    let access_token =
        generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl).map_err(token_error)?;
    let (refresh_token, refresh_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl).map_err(token_error)?;

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool.get_ref(), db_user.id, &refresh_claims).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // intentionally not failing login
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    }))
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

#[derive(sqlx::FromRow)]
struct RefreshRecord {
    id: u64,
    user_id: u64,
    revoked: bool,
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = LoginResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let token = bearer(&req).ok_or_else(|| ApiError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("Refresh token required".into()).into());
    }

    let record = sqlx::query_as::<_, RefreshRecord>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(ApiError::from)?;

    let record = match record {
        Some(r) if !r.revoked => r,
        _ => return Err(ApiError::Unauthorized("Refresh token revoked".into()).into()),
    };

    // A blocked or deleted account cannot refresh.
    let active = sqlx::query_scalar::<_, bool>("SELECT is_active FROM users WHERE id = ?")
        .bind(record.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(ApiError::from)?
        .unwrap_or(false);
    if !active {
        return Err(ApiError::Unauthorized("Account is blocked".into()).into());
    }

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record.id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    let subject = TokenSubject::from(&claims);
    let (new_refresh_token, new_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl).map_err(token_error)?;
    store_refresh_token(pool.get_ref(), record.user_id, &new_claims).await?;

    let access_token =
        generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl).map_err(token_error)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token: new_refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (always succeeds)")),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        warn!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, description = "Authenticated principal", body = AuthUser)),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(auth)
}
