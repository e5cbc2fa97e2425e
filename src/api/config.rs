use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::model::attendance_config::{AttendanceConfig, GeoFence, OverrideSettings, WorkingHours};
use crate::rules::schedule::crosses_midnight;

#[derive(Serialize, ToSchema)]
pub struct AdminConfigResponse {
    pub config: AttendanceConfig,
    /// True when nothing has been saved yet and defaults are shown
    pub is_default: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "override_settings": {"allow_remote_work": true},
    "is_active": true
}))]
pub struct EmployeeOverrideRequest {
    pub override_settings: OverrideSettings,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

fn validate_settings(locations: Option<&[GeoFence]>, hours: Option<&WorkingHours>) -> Result<(), AppError> {
    for fence in locations.unwrap_or_default() {
        fence.validate()?;
    }
    if let Some(hours) = hours {
        if crosses_midnight(hours) {
            // stored as given; the working-hours check compares minutes directly
            warn!(
                start = %hours.start,
                end = %hours.end,
                "Working hours end before they start; overnight windows are not supported by the hours check"
            );
        }
    }
    Ok(())
}

/// The caller's saved configuration, or defaults
#[utoipa::path(
    get,
    path = "/api/admin/config",
    responses(
        (status = 200, description = "Saved or default configuration", body = AdminConfigResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Config"
)]
pub async fn get_admin_config(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let supervisor_id = auth.require_supervisor()?;

    let response = match db::config::find_group(pool.get_ref(), supervisor_id).await? {
        Some(config) => AdminConfigResponse {
            config,
            is_default: false,
        },
        None => AdminConfigResponse {
            config: AttendanceConfig::default(),
            is_default: true,
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

/// Save the configuration applied to everyone the caller supervises
#[utoipa::path(
    put,
    path = "/api/admin/config",
    request_body = AttendanceConfig,
    responses(
        (status = 200, description = "Configuration saved", body = AttendanceConfig),
        (status = 400, description = "Invalid location or missing working hours", body = Object, example = json!({
            "error": "Location 'Head office' needs a positive radius"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Config"
)]
#[instrument(name = "config_save", skip_all, fields(user_id = auth.user_id))]
pub async fn put_admin_config(
    auth: AuthUser,
    body: web::Json<AttendanceConfig>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let supervisor_id = auth.require_supervisor()?;
    let config = body.into_inner();
    validate_settings(Some(&config.allowed_locations), Some(&config.working_hours))?;

    db::config::upsert_group(pool.get_ref(), supervisor_id, &config).await?;

    info!(supervisor_id, locations = config.allowed_locations.len(), "Attendance configuration saved");
    Ok(HttpResponse::Ok().json(config))
}

/// Set the override for one supervised employee
#[utoipa::path(
    put,
    path = "/api/admin/employees/{id}/config",
    params(
        ("id" = u64, Path, description = "Employee id")
    ),
    request_body = EmployeeOverrideRequest,
    responses(
        (status = 200, description = "Override saved", body = OverrideSettings),
        (status = 400, description = "Invalid location"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found or not under your supervision")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Config"
)]
#[instrument(name = "config_override", skip_all, fields(user_id = auth.user_id, employee_id = *path))]
pub async fn put_employee_override(
    auth: AuthUser,
    path: web::Path<u64>,
    body: web::Json<EmployeeOverrideRequest>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let scope = auth.scope()?;
    let employee = db::employee::find_in_scope(pool.get_ref(), path.into_inner(), scope).await?;
    let req = body.into_inner();
    validate_settings(
        req.override_settings.allowed_locations.as_deref(),
        req.override_settings.working_hours.as_ref(),
    )?;

    db::config::upsert_override(pool.get_ref(), employee.id, &req.override_settings, req.is_active).await?;

    info!(is_active = req.is_active, "Employee override saved");
    Ok(HttpResponse::Ok().json(req.override_settings))
}

/// Effective configuration for the calling employee
#[utoipa::path(
    get,
    path = "/api/employee/config",
    responses(
        (status = 200, description = "Effective configuration", body = AttendanceConfig),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Attendance configuration not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Config"
)]
pub async fn get_employee_config(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let employee = db::employee::find(pool.get_ref(), employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    let config = db::config::effective_for(pool.get_ref(), employee_id, employee.supervisor_id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance configuration not found"))?;
    Ok(HttpResponse::Ok().json(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn fence(radius: f64) -> GeoFence {
        GeoFence {
            name: "Head office".into(),
            latitude: 23.81,
            longitude: 90.41,
            radius,
            address: None,
        }
    }

    #[test]
    fn invalid_fence_fails_the_save() {
        let fences = [fence(100.0), fence(-1.0)];
        assert!(matches!(validate_settings(Some(&fences), None), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn overnight_hours_are_accepted() {
        let hours = WorkingHours {
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            flexible_time: 0,
            break_time: None,
        };
        assert!(validate_settings(None, Some(&hours)).is_ok());
    }

    #[test]
    fn override_request_defaults_to_active() {
        let req: EmployeeOverrideRequest =
            serde_json::from_str(r#"{"override_settings": {"require_selfie": false}}"#).unwrap();
        assert!(req.is_active);
        assert_eq!(req.override_settings.require_selfie, Some(false));
    }

    #[test]
    fn config_without_working_hours_is_refused() {
        assert!(serde_json::from_str::<AttendanceConfig>(r#"{"allowed_locations": []}"#).is_err());
    }
}
