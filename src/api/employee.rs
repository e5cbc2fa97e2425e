use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use sqlx::MySqlPool;
use utoipa::ToSchema;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::model::attendance::RecordStatus;
use crate::model::attendance_config::AttendanceConfig;
use crate::model::employee::{Employee, EmployeeSummary};

#[derive(Debug, Default, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({"total_days": 14, "approved": 10, "partial": 2, "rejected": 1, "pending": 1}))]
pub struct MonthlyStats {
    pub total_days: i64,
    pub approved: i64,
    pub partial: i64,
    pub rejected: i64,
    pub pending: i64,
}

impl MonthlyStats {
    /// Folds `(status, count)` rows; unknown statuses still count as days
    pub fn from_counts(counts: &[(String, i64)]) -> Self {
        let mut stats = MonthlyStats::default();
        for (status, count) in counts {
            stats.total_days += count;
            match status.parse::<RecordStatus>() {
                Ok(RecordStatus::Approved) => stats.approved += count,
                Ok(RecordStatus::Partial) => stats.partial += count,
                Ok(RecordStatus::Rejected) => stats.rejected += count,
                Ok(RecordStatus::Pending) => stats.pending += count,
                Err(_) => tracing::warn!(status = %status, "Unknown attendance status in statistics"),
            }
        }
        stats
    }
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeDetailsResponse {
    pub employee: Employee,
    /// Absent when neither the supervisor nor an override configures attendance
    pub attendance_config: Option<AttendanceConfig>,
    pub statistics: MonthlyStats,
}

/// First and last day of the month containing `day`
pub fn month_bounds(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = day.with_day(1).unwrap_or(day);
    let next_month = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    let last = next_month.and_then(|d| d.pred_opt()).unwrap_or(day);
    (first, last)
}

/// Own profile, effective configuration and this month's statistics
#[utoipa::path(
    get,
    path = "/api/employee/details",
    responses(
        (status = 200, description = "Employee details", body = EmployeeDetailsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Employee not found")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn details(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.require_employee_id()?;
    let employee = db::employee::find(pool.get_ref(), employee_id)
        .await?
        .filter(|e| e.status == "active")
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    let attendance_config = db::config::effective_for(pool.get_ref(), employee_id, employee.supervisor_id).await?;

    let today = Utc::now().with_timezone(&config.utc_offset).date_naive();
    let (first, last) = month_bounds(today);
    let counts = db::attendance::status_counts(pool.get_ref(), employee_id, first, last).await?;

    Ok(HttpResponse::Ok().json(EmployeeDetailsResponse {
        employee,
        attendance_config,
        statistics: MonthlyStats::from_counts(&counts),
    }))
}

/// Active employees the caller supervises
#[utoipa::path(
    get,
    path = "/api/admin/employees",
    responses(
        (status = 200, description = "Supervised employees", body = Vec<EmployeeSummary>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Employee"
)]
pub async fn supervised(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let scope = auth.scope()?;
    let employees = db::employee::list_in_scope(pool.get_ref(), scope).await?;
    Ok(HttpResponse::Ok().json(employees))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_bounds_cover_the_whole_month() {
        assert_eq!(month_bounds(date(2026, 3, 17)), (date(2026, 3, 1), date(2026, 3, 31)));
        assert_eq!(month_bounds(date(2028, 2, 29)), (date(2028, 2, 1), date(2028, 2, 29)));
        assert_eq!(month_bounds(date(2026, 12, 5)), (date(2026, 12, 1), date(2026, 12, 31)));
    }

    #[test]
    fn stats_fold_status_counts() {
        let counts = vec![
            ("approved".to_string(), 10),
            ("partial".to_string(), 2),
            ("pending".to_string(), 1),
        ];
        assert_eq!(
            MonthlyStats::from_counts(&counts),
            MonthlyStats {
                total_days: 13,
                approved: 10,
                partial: 2,
                rejected: 0,
                pending: 1,
            }
        );
    }

    #[test]
    fn no_records_means_zeroes() {
        assert_eq!(MonthlyStats::from_counts(&[]), MonthlyStats::default());
    }
}
