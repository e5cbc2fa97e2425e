use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use sqlx::MySqlPool;

use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::db::revision;
use crate::error::AppError;
use crate::model::role::Role;

fn reject(req: ServiceRequest, err: AppError) -> ServiceResponse<BoxBody> {
    let resp = err.error_response();
    req.into_response(resp)
}

/// Bearer token check for every protected route. The token must verify,
/// carry a known role and not predate the user's current revision.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let (config, pool) = match (req.app_data::<Data<Config>>(), req.app_data::<Data<MySqlPool>>()) {
        (Some(config), Some(pool)) => (config.clone(), pool.clone()),
        _ => {
            tracing::error!("auth_middleware mounted without Config or MySqlPool app data");
            return Ok(reject(req, AppError::internal("app data missing")));
        }
    };

    let header_value = match req.headers().get("Authorization").map(|h| h.to_str()) {
        Some(Ok(h)) => h,
        Some(Err(_)) => {
            return Ok(reject(req, AppError::unauthorized("Invalid Authorization header encoding")));
        }
        None => return Ok(reject(req, AppError::unauthorized("Missing Authorization header"))),
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return Ok(reject(
            req,
            AppError::unauthorized("Authorization header must start with Bearer"),
        ));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Token verification failed");
            return Ok(reject(req, AppError::unauthorized("Invalid or expired token")));
        }
    };

    let Some(role) = Role::from_id(claims.role) else {
        return Ok(reject(req, AppError::unauthorized("Invalid role")));
    };

    match revision::current(pool.get_ref(), claims.user_id).await {
        Ok(current) if revision::is_current(claims.rev, current) => {}
        Ok(_) => {
            tracing::info!(user_id = claims.user_id, rev = claims.rev, "Revoked token presented");
            return Ok(reject(req, AppError::unauthorized("Token has been revoked")));
        }
        Err(e) => return Ok(reject(req, e)),
    }

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
        employee_id: claims.employee_id,
    });

    next.call(req).await
}
