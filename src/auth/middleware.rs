use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

fn reject(req: ServiceRequest, message: &str) -> ServiceResponse<BoxBody> {
    let resp = ApiError::Unauthorized(message.to_string()).error_response();
    req.into_response(resp)
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_owned(),
            Err(_) => {
                return Ok(reject(req, "Invalid Authorization header encoding"));
            }
        },
        None => return Ok(reject(req, "Missing Authorization header")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return Ok(reject(req, "Authorization header must start with Bearer"));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, path = %req.path(), "Token rejected");
            return Ok(reject(req, "Invalid or expired token"));
        }
    };

    if claims.token_type != TokenType::Access {
        return Ok(reject(req, "Access token required"));
    }

    let role = match Role::from_id(claims.role) {
        Some(role) => role,
        None => return Ok(reject(req, "Invalid role")),
    };

    let auth_user = AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    };

    tracing::debug!(user_id = auth_user.user_id, role = ?auth_user.role, path = %req.path(), "Authenticated request");

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token};
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    #[actix_web::test]
    async fn rejects_requests_without_token() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(Config::for_tests()))
                .service(web::scope("/api").wrap(from_fn(auth_middleware)).route("/me", web::get().to(whoami))),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({"message": "Missing Authorization header"}));
    }

    #[actix_web::test]
    async fn bad_token_gets_message_without_details() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(Config::for_tests()))
                .service(web::scope("/api").wrap(from_fn(auth_middleware)).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", "Bearer not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({"message": "Invalid or expired token"}));
    }

    #[actix_web::test]
    async fn passes_authenticated_user_to_handler() {
        let config = Config::for_tests();
        let token = generate_access_token(
            &TokenSubject {
                user_id: 3,
                username: "asha".into(),
                role: 3,
                employee_id: Some(9),
            },
            &config.jwt_secret,
            60,
        )
        .unwrap();

        let app = test::init_service(
            App::new()
                .app_data(Data::new(config))
                .service(web::scope("/api").wrap(from_fn(auth_middleware)).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"asha"));
    }
}
