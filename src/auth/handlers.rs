use actix_web::{HttpRequest, HttpResponse, Responder, web};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};

use crate::{
    auth::{jwt::generate_access_token, jwt::verify_token, password::verify_password},
    config::Config,
    db::revision,
    error::AppError,
    model::{role::Role, user::User},
    models::{LoginReqDto, LoginResponse, LoginUser},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Login; issuing a token revokes every token issued before it
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Username or password missing", body = Object, example = json!({
            "error": "Username and password are required"
        })),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "error": "Invalid credentials"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    info!("Login request received");

    let username = user.username.trim();
    if username.is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::invalid("Username and password are required").into());
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(username)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(AppError::from)?;

    let db_user = match db_user {
        Some(u) if u.is_active => u,
        Some(u) => {
            info!(user_id = u.id, "Invalid credentials: account disabled");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS).into());
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::unauthorized(INVALID_CREDENTIALS).into());
        }
    };

    if !verify_password(&user.password, &db_user.password)? {
        info!(user_id = db_user.id, "Invalid credentials: password mismatch");
        return Err(AppError::unauthorized(INVALID_CREDENTIALS).into());
    }

    let role = Role::from_id(db_user.role_id).ok_or_else(|| {
        tracing::error!(user_id = db_user.id, role_id = db_user.role_id, "User has unknown role");
        AppError::unauthorized(INVALID_CREDENTIALS)
    })?;

    debug!("Password verified, rotating token revision");
    let rev = revision::bump(pool.get_ref(), db_user.id).await?;

    let access_token = generate_access_token(
        db_user.id,
        db_user.username.clone(),
        role.id(),
        db_user.employee_id,
        rev,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(AppError::internal)?;

    info!(user_id = db_user.id, rev, "Login successful");

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl,
        user: LoginUser {
            id: db_user.id,
            username: db_user.username,
            role,
            employee_id: db_user.employee_id,
        },
    }))
}

/// Logout; revokes every outstanding token of the caller. Always 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Logged out (also returned for missing or invalid tokens)")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(claims) = token.and_then(|t| verify_token(t, &config.jwt_secret).ok()) else {
        return HttpResponse::NoContent().finish();
    };

    if let Ok(current) = revision::current(pool.get_ref(), claims.user_id).await {
        if revision::is_current(claims.rev, current) {
            match revision::bump(pool.get_ref(), claims.user_id).await {
                Ok(rev) => info!(user_id = claims.user_id, rev, "Logged out, tokens revoked"),
                Err(e) => tracing::warn!(user_id = claims.user_id, error = %e, "Logout could not revoke tokens"),
            }
        }
    }

    HttpResponse::NoContent().finish()
}
