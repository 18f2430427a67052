use crate::{
    auth::auth::AuthUser,
    error::{ApiError, is_duplicate_key},
    model::department::Department,
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct DepartmentReq {
    #[schema(example = "Engineering")]
    pub name: String,
    #[schema(example = 12)]
    pub head_employee_id: Option<u64>,
}

fn map_write_error(e: sqlx::Error) -> ApiError {
    if is_duplicate_key(&e) {
        ApiError::conflict("Department name already exists")
    } else {
        ApiError::from(e)
    }
}

#[utoipa::path(
    get,
    path = "/api/departments",
    responses((status = 200, description = "All departments", body = [Department])),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(_auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let departments = sqlx::query_as::<_, Department>("SELECT * FROM departments ORDER BY name")
        .fetch_all(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(departments))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = DepartmentReq,
    responses(
        (status = 201, description = "Department created"),
        (status = 409, description = "Name already used")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<DepartmentReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Department name is required").into());
    }

    let result = sqlx::query("INSERT INTO departments (name, head_employee_id) VALUES (?, ?)")
        .bind(name)
        .bind(payload.head_employee_id)
        .execute(pool.get_ref())
        .await
        .map_err(map_write_error)?;

    info!(department_id = result.last_insert_id(), "Department created");

    Ok(HttpResponse::Created().json(json!({
        "message": "Department created",
        "id": result.last_insert_id()
    })))
}

#[utoipa::path(
    put,
    path = "/api/departments/{department_id}",
    params(("department_id" = u64, Path, description = "Department ID")),
    request_body = DepartmentReq,
    responses(
        (status = 200, description = "Department updated"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn update_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<DepartmentReq>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let department_id = path.into_inner();

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Department name is required").into());
    }

    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM departments WHERE id = ?")
        .bind(department_id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(ApiError::from)?;
    if found == 0 {
        return Err(ApiError::not_found("Department not found").into());
    }

    sqlx::query("UPDATE departments SET name = ?, head_employee_id = ? WHERE id = ?")
        .bind(name)
        .bind(payload.head_employee_id)
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(map_write_error)?;

    Ok(HttpResponse::Ok().json(json!({ "message": "Department updated" })))
}

#[utoipa::path(
    delete,
    path = "/api/departments/{department_id}",
    params(("department_id" = u64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted; employees keep no department"),
        (status = 404, description = "Department not found")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn delete_department(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;
    let department_id = path.into_inner();

    let result = sqlx::query("DELETE FROM departments WHERE id = ?")
        .bind(department_id)
        .execute(pool.get_ref())
        .await
        .map_err(ApiError::from)?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Department not found").into());
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Department deleted" })))
}
