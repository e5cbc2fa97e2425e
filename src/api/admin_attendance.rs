use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, NaiveDate, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};

use crate::api::attendance::{ClockEntry, push_date_range, record_clock};
use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, AttendanceSubEvent, EventType, Location, RecordStatus};
use crate::model::employee::EmployeeSummary;
use crate::model::role::Scope;
use crate::rules::lifecycle::{self, Decision, Verdict};
use crate::utils::db_utils::{Page, Pagination, SqlFilter, SqlValue, like_pattern};

const MAX_BULK_IDS: usize = 100;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AdminAttendanceQuery {
    /// 1-based page number
    pub page: Option<u32>,
    /// Items per page (1..=100)
    pub limit: Option<u32>,
    #[param(value_type = Option<String>, format = Date, example = "2026-03-01")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date, example = "2026-03-31")]
    pub end_date: Option<NaiveDate>,
    pub status: Option<RecordStatus>,
    pub employee_id: Option<u64>,
    /// Matches employee code, first or last name
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct AdminAttendanceItem {
    pub record: AttendanceRecord,
    pub employee: EmployeeSummary,
}

#[derive(Serialize, ToSchema)]
pub struct AdminAttendanceListResponse {
    pub records: Vec<AdminAttendanceItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "attendance_id": 42,
    "status": "rejected",
    "remarks": "Clocked in from home without approval",
    "event_type": "clock_in"
}))]
pub struct DecisionRequest {
    pub attendance_id: u64,
    pub status: Verdict,
    pub remarks: Option<String>,
    /// Omit to decide the whole record at once
    pub event_type: Option<EventType>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "attendance_ids": [42, 43, 44],
    "status": "approved",
    "event_type": "clock_out"
}))]
pub struct BulkDecisionRequest {
    pub attendance_ids: Vec<u64>,
    pub status: Verdict,
    pub remarks: Option<String>,
    pub event_type: Option<EventType>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BulkItemResult {
    pub attendance_id: u64,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct BulkDecisionResponse {
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BulkItemResult>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "event_type": "clock_in",
    "employee_id": 17,
    "location": {"latitude": 23.8103, "longitude": 90.4125},
    "timestamp": "2026-03-02T03:05:00Z"
}))]
pub struct SupervisorClockRequest {
    pub event_type: EventType,
    pub employee_id: u64,
    pub location: Location,
    /// Manually set event time; defaults to now
    #[schema(value_type = Option<String>, format = "date-time")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Records of employees the caller reviews, newest first
#[utoipa::path(
    get,
    path = "/api/admin/attendance",
    params(AdminAttendanceQuery),
    responses(
        (status = 200, description = "Paginated attendance list", body = AdminAttendanceListResponse),
        (status = 400, description = "Reversed date range"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin Attendance"
)]
pub async fn list(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AdminAttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let scope = auth.scope()?;
    let page = Page::new(query.page, query.limit);

    let mut filter = SqlFilter::new();
    if let Scope::SupervisedBy(supervisor_id) = scope {
        filter.push("e.supervisor_id = ?", [SqlValue::U64(supervisor_id)]);
    }
    push_date_range(&mut filter, query.start_date, query.end_date)?;
    filter
        .push_if(query.status, "a.status = ?", |s: RecordStatus| {
            SqlValue::String(s.as_ref().to_string())
        })
        .push_if(query.employee_id, "a.employee_id = ?", SqlValue::U64);

    if let Some(term) = query.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = like_pattern(term);
        filter.push(
            "(e.employee_code LIKE ? OR e.first_name LIKE ? OR e.last_name LIKE ?)",
            [
                SqlValue::String(pattern.clone()),
                SqlValue::String(pattern.clone()),
                SqlValue::String(pattern),
            ],
        );
    }

    let (total, rows) = db::attendance::count_and_list_with_employee(pool.get_ref(), &filter, page).await?;

    let records = rows
        .into_iter()
        .map(|(record, employee)| AdminAttendanceItem { record, employee })
        .collect();

    Ok(HttpResponse::Ok().json(AdminAttendanceListResponse {
        records,
        pagination: page.describe(total),
    }))
}

/// Loads, decides and writes back one record
async fn decide_one(
    pool: &MySqlPool,
    scope: Scope,
    attendance_id: u64,
    decision: &Decision,
    reviewer: &str,
) -> Result<AttendanceRecord, AppError> {
    let record = db::attendance::find_by_id(pool, attendance_id)
        .await?
        .ok_or_else(|| AppError::not_found("Attendance record not found"))?;

    // hide records outside the caller's scope
    db::employee::find_in_scope(pool, record.employee_id, scope)
        .await
        .map_err(|e| match e {
            AppError::NotFound(_) => AppError::not_found("Attendance record not found"),
            other => other,
        })?;

    let record = lifecycle::apply_decision(record, decision, reviewer, Utc::now())?;
    db::attendance::save(pool, record).await
}

/// Approve or reject one record, or one of its events
#[utoipa::path(
    patch,
    path = "/api/admin/attendance",
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision applied", body = AttendanceRecord),
        (status = 400, description = "Rejection without remarks or no such event", body = Object, example = json!({
            "error": "Remarks are required when rejecting attendance"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance record not found"),
        (status = 409, description = "Record changed concurrently")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin Attendance"
)]
#[instrument(name = "attendance_decide", skip_all, fields(reviewer = %auth.username, attendance_id = body.attendance_id))]
pub async fn decide(
    auth: AuthUser,
    body: web::Json<DecisionRequest>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let scope = auth.scope()?;
    let req = body.into_inner();
    let decision = Decision::new(req.status, req.remarks, req.event_type)?;

    let record = decide_one(pool.get_ref(), scope, req.attendance_id, &decision, &auth.username).await?;

    info!(status = %record.status, "Attendance {}", decision.verdict());
    Ok(HttpResponse::Ok().json(record))
}

/// Same decision for many records; each record succeeds or fails on its own
#[utoipa::path(
    post,
    path = "/api/admin/attendance/bulk",
    request_body = BulkDecisionRequest,
    responses(
        (status = 200, description = "Per-record outcome", body = BulkDecisionResponse),
        (status = 400, description = "Empty id list or rejection without remarks"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin Attendance"
)]
#[instrument(name = "attendance_bulk_decide", skip_all, fields(reviewer = %auth.username, count = body.attendance_ids.len()))]
pub async fn bulk_decide(
    auth: AuthUser,
    body: web::Json<BulkDecisionRequest>,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let scope = auth.scope()?;
    let req = body.into_inner();
    let decision = Decision::new(req.status, req.remarks, req.event_type)?;

    let mut ids = req.attendance_ids;
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(AppError::invalid("attendance_ids must not be empty").into());
    }
    if ids.len() > MAX_BULK_IDS {
        return Err(AppError::invalid(format!("At most {} records per request", MAX_BULK_IDS)).into());
    }

    let outcomes = join_all(
        ids.iter()
            .map(|id| decide_one(pool.get_ref(), scope, *id, &decision, &auth.username)),
    )
    .await;

    let results: Vec<BulkItemResult> = ids
        .iter()
        .zip(outcomes)
        .map(|(id, outcome)| match outcome {
            Ok(_) => BulkItemResult {
                attendance_id: *id,
                success: true,
                error: None,
            },
            Err(e) => {
                warn!(attendance_id = *id, error = %e, "Bulk decision item failed");
                BulkItemResult {
                    attendance_id: *id,
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        })
        .collect();

    let succeeded = results.iter().filter(|r| r.success).count();
    let failed = results.len() - succeeded;
    info!(succeeded, failed, "Bulk decision finished");

    Ok(HttpResponse::Ok().json(BulkDecisionResponse {
        succeeded,
        failed,
        results,
    }))
}

fn supervisor_audit(event_type: EventType, reviewer: &str, manual_time: bool) -> String {
    let suffix = if manual_time { " (Manual time set)" } else { "" };
    format!("{} by supervisor: {}{}", event_type, reviewer, suffix)
}

/// Clock an employee in or out on their behalf; skips every employee-side gate
#[utoipa::path(
    post,
    path = "/api/admin/attendance/clock",
    request_body = SupervisorClockRequest,
    responses(
        (status = 200, description = "Event recorded, approved", body = AttendanceRecord),
        (status = 400, description = "Lifecycle violation or future timestamp", body = Object, example = json!({
            "error": "No clock-in record found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Employee not found or not under your supervision")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Admin Attendance"
)]
#[instrument(name = "supervisor_clock", skip_all, fields(reviewer = %auth.username, employee_id = body.employee_id, event_type = ?body.event_type))]
pub async fn supervisor_clock(
    auth: AuthUser,
    body: web::Json<SupervisorClockRequest>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let scope = auth.scope()?;
    let req = body.into_inner();
    req.location.validate()?;

    let now = Utc::now();
    if req.timestamp.is_some_and(|t| t > now) {
        return Err(AppError::invalid("Timestamp cannot be in the future").into());
    }
    let timestamp = req.timestamp.unwrap_or(now);
    let date = timestamp.with_timezone(&config.utc_offset).date_naive();

    let employee = db::employee::find_in_scope(pool.get_ref(), req.employee_id, scope).await?;
    employee.ensure_active()?;

    let existing = db::attendance::find_by_day(pool.get_ref(), employee.id, date).await?;
    let entry = ClockEntry {
        employee_id: employee.id,
        date,
        event_type: req.event_type,
        event: AttendanceSubEvent::by_supervisor(req.location, timestamp, now),
        audit: Some(supervisor_audit(req.event_type, &auth.username, req.timestamp.is_some())),
    };
    let record = record_clock(pool.get_ref(), existing, entry, now).await?;

    info!(record_id = record.id, status = %record.status, "Supervisor clock recorded");
    Ok(HttpResponse::Ok().json(record))
}
