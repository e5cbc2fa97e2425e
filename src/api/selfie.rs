use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::services::storage::{SelfieStorage, SignedUrl, UrlMethod, object_key};

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({"file_name": "1718000000-reference.jpg"}))]
pub struct RegisterSelfieRequest {
    pub file_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterSelfieResponse {
    #[schema(example = "Selfie updated")]
    pub message: String,
    #[schema(example = "selfies/12/1718000000-reference.jpg")]
    pub key: String,
}

#[derive(Serialize, ToSchema)]
pub struct SelfieStatus {
    pub has_selfie: bool,
    pub require_selfie: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({"file_name": "1718000000-in.jpg", "content_type": "image/jpeg"}))]
pub struct UploadUrlRequest {
    pub file_name: String,
    pub content_type: String,
}

fn check_image_type(content_type: &str) -> Result<&str, AppError> {
    let content_type = content_type.trim();
    match content_type.strip_prefix("image/") {
        Some(sub) if !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric() || "+.-".contains(c)) => {
            Ok(content_type)
        }
        _ => Err(AppError::invalid("Only image uploads are allowed")),
    }
}

/// Register the reference selfie used for face comparison
#[utoipa::path(
    post,
    path = "/api/employee/selfie",
    request_body = RegisterSelfieRequest,
    responses(
        (status = 200, description = "Reference selfie registered", body = RegisterSelfieResponse),
        (status = 400, description = "Invalid file name"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Selfie"
)]
#[instrument(name = "selfie_register", skip_all, fields(user_id = auth.user_id))]
pub async fn register(
    auth: AuthUser,
    body: web::Json<RegisterSelfieRequest>,
    pool: web::Data<MySqlPool>,
    storage: web::Data<SelfieStorage>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let key = object_key(employee_id, &body.file_name)?;

    let previous = db::selfie::replace_reference(pool.get_ref(), employee_id, &key).await?;
    if let Some(previous) = previous {
        storage.delete_best_effort(&previous).await;
    }

    info!(employee_id, "Reference selfie registered");
    Ok(HttpResponse::Ok().json(RegisterSelfieResponse {
        message: "Selfie updated".to_string(),
        key,
    }))
}

#[utoipa::path(
    get,
    path = "/api/employee/selfie/status",
    responses(
        (status = 200, description = "Whether a reference selfie exists and is needed", body = SelfieStatus),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Selfie"
)]
pub async fn status(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let employee = db::employee::find(pool.get_ref(), employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    let has_selfie = db::selfie::find_reference(pool.get_ref(), employee_id).await?.is_some();
    let require_selfie = db::config::effective_for(pool.get_ref(), employee_id, employee.supervisor_id)
        .await?
        .is_some_and(|c| c.require_selfie);

    Ok(HttpResponse::Ok().json(SelfieStatus {
        has_selfie,
        require_selfie,
    }))
}

/// Signed PUT URL for uploading a selfie
#[utoipa::path(
    post,
    path = "/api/employee/selfie/upload-url",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Signed upload URL", body = SignedUrl),
        (status = 400, description = "Invalid file name or content type"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Selfie"
)]
pub async fn upload_url(
    auth: AuthUser,
    body: web::Json<UploadUrlRequest>,
    storage: web::Data<SelfieStorage>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let key = object_key(employee_id, &body.file_name)?;
    let content_type = check_image_type(&body.content_type)?;

    let signed = storage.presign(UrlMethod::Put, &key, Some(content_type), Utc::now())?;
    Ok(HttpResponse::Ok().json(signed))
}

/// Signed GET URL for one of the caller's selfies
#[utoipa::path(
    get,
    path = "/api/employee/selfie/{file_name}/url",
    params(
        ("file_name" = String, Path, description = "Selfie file name")
    ),
    responses(
        (status = 200, description = "Signed download URL", body = SignedUrl),
        (status = 400, description = "Invalid file name"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Selfie"
)]
pub async fn download_url(
    auth: AuthUser,
    path: web::Path<String>,
    storage: web::Data<SelfieStorage>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let key = object_key(employee_id, &path)?;

    let signed = storage.presign(UrlMethod::Get, &key, None, Utc::now())?;
    Ok(HttpResponse::Ok().json(signed))
}
