use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{debug, info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, AttendanceSubEvent, EventType, Location, RecordStatus};
use crate::model::attendance_config::AttendanceConfig;
use crate::rules::geofence::validate_location;
use crate::rules::lifecycle;
use crate::rules::schedule::is_within_working_hours;
use crate::services::face::FaceVerifier;
use crate::services::storage::object_key;
use crate::utils::db_utils::{Page, Pagination, SqlFilter, SqlValue};

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "event_type": "clock_in",
    "location": {"latitude": 23.8103, "longitude": 90.4125, "address": "Gulshan 1, Dhaka"},
    "file_name": "1718000000-in.jpg"
}))]
pub struct ClockRequest {
    pub event_type: EventType,
    pub location: Location,
    /// Uploaded selfie, required when the effective configuration demands one
    pub file_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ClockResponse {
    #[schema(example = "Clock-in recorded")]
    pub message: String,
    /// Geofence the location matched, absent for remote work
    pub matched_location: Option<String>,
    pub record: AttendanceRecord,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page (1..=100)
    pub limit: Option<u32>,
    #[param(value_type = Option<String>, format = Date, example = "2026-03-01")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date, example = "2026-03-31")]
    pub end_date: Option<NaiveDate>,
    pub status: Option<RecordStatus>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub records: Vec<AttendanceRecord>,
    pub pagination: Pagination,
}

/// Adds an inclusive `a.date` range; a reversed range is a client error.
pub(crate) fn push_date_range(
    filter: &mut SqlFilter,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), AppError> {
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(AppError::invalid("start_date must not be after end_date"));
        }
    }
    filter
        .push_if(start, "a.date >= ?", SqlValue::Date)
        .push_if(end, "a.date <= ?", SqlValue::Date);
    Ok(())
}

pub(crate) struct ClockEntry {
    pub employee_id: u64,
    pub date: NaiveDate,
    pub event_type: EventType,
    pub event: AttendanceSubEvent,
    pub audit: Option<String>,
}

/// Applies a clock transition to the day's record and persists it:
/// clock-in inserts, clock-out is a versioned update.
pub(crate) async fn record_clock(
    pool: &MySqlPool,
    existing: Option<AttendanceRecord>,
    entry: ClockEntry,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, AppError> {
    match entry.event_type {
        EventType::ClockIn => {
            let record = lifecycle::clock_in(
                existing.as_ref(),
                entry.employee_id,
                entry.date,
                entry.event,
                entry.audit.as_deref(),
                now,
            )?;
            db::attendance::insert(pool, record).await
        }
        EventType::ClockOut => {
            let record = lifecycle::clock_out(existing, entry.event, entry.audit.as_deref(), now)?;
            db::attendance::save(pool, record).await
        }
    }
}

/// Resolves the selfie key for an employee event, running face comparison
/// when the configuration requires a selfie.
async fn check_selfie(
    pool: &MySqlPool,
    face: &dyn FaceVerifier,
    settings: &AttendanceConfig,
    employee_id: u64,
    file_name: Option<&str>,
) -> Result<String, AppError> {
    let file_name = file_name.map(str::trim).filter(|f| !f.is_empty());

    if !settings.require_selfie {
        return match file_name {
            Some(name) => object_key(employee_id, name),
            None => Ok(String::new()),
        };
    }

    let name = file_name.ok_or_else(|| AppError::invalid("Selfie is required"))?;
    let key = object_key(employee_id, name)?;
    let reference = db::selfie::find_reference(pool, employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Reference selfie not registered"))?;

    if !face.matches(&reference, &key).await? {
        info!(employee_id, "Face verification failed");
        return Err(AppError::rejected("Face verification failed"));
    }
    Ok(key)
}

/// Employee clock-in / clock-out
#[utoipa::path(
    post,
    path = "/api/employee/attendance",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Event recorded as pending", body = ClockResponse),
        (status = 400, description = "Duplicate clock-in, clock-out without clock-in, missing selfie", body = Object, example = json!({
            "error": "Already clocked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "No attendance configuration or reference selfie", body = Object, example = json!({
            "error": "Attendance configuration not found"
        })),
        (status = 409, description = "Record changed concurrently"),
        (status = 422, description = "Outside geofence, outside working hours or face mismatch", body = Object, example = json!({
            "error": "Location not within any allowed areas"
        })),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
#[instrument(name = "employee_clock", skip_all, fields(user_id = auth.user_id, event_type = ?body.event_type))]
pub async fn clock(
    auth: AuthUser,
    body: web::Json<ClockRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    face: web::Data<dyn FaceVerifier>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let req = body.into_inner();
    req.location.validate()?;

    let now = Utc::now();
    let local_now = now.with_timezone(&config.utc_offset);
    let today = local_now.date_naive();

    let employee = db::employee::find(pool.get_ref(), employee_id)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;
    employee.ensure_active()?;
    let settings = db::config::effective_for(pool.get_ref(), employee_id, employee.supervisor_id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance configuration not found"))?;

    let existing = db::attendance::find_by_day(pool.get_ref(), employee_id, today).await?;
    debug!(phase = ?lifecycle::phase(existing.as_ref()), "Loaded today's record");
    lifecycle::ensure_can_clock(existing.as_ref(), req.event_type)?;

    let location_check = validate_location(
        req.location.latitude,
        req.location.longitude,
        &settings.allowed_locations,
        settings.allow_remote_work,
    );
    if !location_check.valid {
        info!(employee_id, "Location rejected");
        return Err(AppError::rejected(location_check.message.unwrap_or_default()).into());
    }

    let schedule_check = is_within_working_hours(&local_now, &settings.working_hours);
    if !schedule_check.valid {
        info!(employee_id, "Outside working hours");
        return Err(AppError::rejected(schedule_check.message.unwrap_or_default()).into());
    }

    let selfie = check_selfie(
        pool.get_ref(),
        face.get_ref(),
        &settings,
        employee_id,
        req.file_name.as_deref(),
    )
    .await?;

    let event_type = req.event_type;
    let entry = ClockEntry {
        employee_id,
        date: today,
        event_type,
        event: AttendanceSubEvent::submitted(req.location, selfie, now),
        audit: None,
    };
    let record = record_clock(pool.get_ref(), existing, entry, now).await?;

    info!(employee_id, record_id = record.id, "{} recorded", event_type);

    Ok(HttpResponse::Ok().json(ClockResponse {
        message: format!("{} recorded", event_type),
        matched_location: location_check.matched_fence,
        record,
    }))
}

/// Today's record, or `null` before the first clock-in
#[utoipa::path(
    get,
    path = "/api/employee/attendance/today",
    responses(
        (status = 200, description = "Today's record or null", body = Option<AttendanceRecord>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn today(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let today = Utc::now().with_timezone(&config.utc_offset).date_naive();

    let record = db::attendance::find_by_day(pool.get_ref(), employee_id, today).await?;
    Ok(HttpResponse::Ok().json(record))
}

/// Own attendance history, newest day first
#[utoipa::path(
    get,
    path = "/api/employee/attendance/history",
    params(HistoryQuery),
    responses(
        (status = 200, description = "Paginated history", body = AttendanceListResponse),
        (status = 400, description = "Reversed date range"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<HistoryQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let page = Page::new(query.page, query.limit);

    let mut filter = SqlFilter::new();
    filter.push("a.employee_id = ?", [SqlValue::U64(employee_id)]);
    push_date_range(&mut filter, query.start_date, query.end_date)?;
    filter.push_if(query.status, "a.status = ?", |s: RecordStatus| {
        SqlValue::String(s.as_ref().to_string())
    });

    let (total, records) = db::attendance::count_and_list(pool.get_ref(), &filter, page).await?;

    Ok(HttpResponse::Ok().json(AttendanceListResponse {
        records,
        pagination: page.describe(total),
    }))
}
