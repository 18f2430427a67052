use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    // The auth middleware already decoded the token for protected scopes.
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| ApiError::Internal("Config missing".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }

    let role = Role::from_id(claims.role).ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    })
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(actix_web::Error::from))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if self.role.is_manager() {
            Ok(())
        } else {
            Err(ApiError::forbidden("HR/Admin only"))
        }
    }

    /// Employee id of the caller, or 403 for accounts without a profile.
    pub fn require_employee(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }

    /// HR/Admin may act on anyone; everyone else only on themselves.
    pub fn require_self_or_hr(&self, employee_id: u64) -> Result<(), ApiError> {
        if self.role.is_manager() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed to access another employee's records"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};
    use actix_web::test::TestRequest;

    fn subject(role: u8) -> TokenSubject {
        TokenSubject {
            user_id: 1,
            username: "hr.lead".into(),
            role,
            employee_id: Some(11),
        }
    }

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "someone".into(),
            role,
            employee_id,
        }
    }

    #[actix_web::test]
    async fn extracts_user_from_bearer_token() {
        let config = Config::for_tests();
        let token = generate_access_token(&subject(2), &config.jwt_secret, 60).unwrap();

        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .app_data(Data::new(config))
            .to_http_request();

        let user = authenticate(&req).unwrap();
        assert_eq!(user.role, Role::Hr);
        assert_eq!(user.employee_id, Some(11));
    }

    #[actix_web::test]
    async fn refresh_token_is_not_an_access_token() {
        let config = Config::for_tests();
        let (token, _) = generate_refresh_token(&subject(3), &config.jwt_secret, 60).unwrap();

        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .app_data(Data::new(config))
            .to_http_request();

        assert!(matches!(authenticate(&req), Err(ApiError::Unauthorized(_))));
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let req = TestRequest::default()
            .app_data(Data::new(Config::for_tests()))
            .to_http_request();
        assert!(matches!(authenticate(&req), Err(ApiError::Unauthorized(_))));
    }

    #[test]
    fn role_guards() {
        assert!(user(Role::Admin, None).require_admin().is_ok());
        assert!(user(Role::Hr, None).require_admin().is_err());
        assert!(user(Role::Hr, None).require_hr_or_admin().is_ok());
        assert!(user(Role::Employee, Some(5)).require_hr_or_admin().is_err());
    }

    #[test]
    fn self_access_only_for_own_record() {
        let me = user(Role::Employee, Some(5));
        assert!(me.require_self_or_hr(5).is_ok());
        assert!(me.require_self_or_hr(6).is_err());
        assert!(user(Role::Hr, None).require_self_or_hr(6).is_ok());
        assert!(user(Role::System, None).require_employee().is_err());
    }
}
