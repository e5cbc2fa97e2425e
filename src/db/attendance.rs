//! `attendance_records` persistence.
//!
//! Sub-events are flattened into `clock_in_*` / `clock_out_*` columns.
//! `UNIQUE (employee_id, date)` guarantees one record per employee per day
//! and `version` guards every update after the insert.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, MySqlPool};

use crate::error::{AppError, is_duplicate_key};
use crate::model::attendance::{
    AttendanceRecord, AttendanceSubEvent, EventStatus, LivenessCheck, Location, RecordStatus,
};
use crate::model::employee::EmployeeSummary;
use crate::utils::db_utils::{Page, SqlFilter};

#[derive(Debug, FromRow)]
pub struct AttendanceRow {
    pub id: u64,
    pub employee_id: u64,
    pub date: NaiveDate,
    pub status: String,
    pub remarks: Option<String>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub clock_in_latitude: f64,
    pub clock_in_longitude: f64,
    pub clock_in_address: Option<String>,
    pub clock_in_selfie: String,
    pub clock_in_liveness: String,
    pub clock_in_status: String,
    pub clock_in_remarks: Option<String>,
    pub clock_in_timestamp: DateTime<Utc>,
    pub clock_in_created_at: DateTime<Utc>,
    pub clock_in_updated_at: DateTime<Utc>,

    pub clock_out_latitude: Option<f64>,
    pub clock_out_longitude: Option<f64>,
    pub clock_out_address: Option<String>,
    pub clock_out_selfie: Option<String>,
    pub clock_out_liveness: Option<String>,
    pub clock_out_status: Option<String>,
    pub clock_out_remarks: Option<String>,
    pub clock_out_timestamp: Option<DateTime<Utc>>,
    pub clock_out_created_at: Option<DateTime<Utc>>,
    pub clock_out_updated_at: Option<DateTime<Utc>>,
}

/// Record plus the owning employee's identity, for the supervisor dashboard
#[derive(Debug, FromRow)]
pub struct AttendanceWithEmployeeRow {
    #[sqlx(flatten)]
    pub record: AttendanceRow,
    pub employee_code: String,
    pub first_name: String,
    pub last_name: String,
}

fn parse_column<T: FromStr>(column: &str, raw: &str) -> Result<T, AppError> {
    raw.parse().map_err(|_| {
        tracing::error!(column, value = raw, "Unexpected enum value in attendance_records");
        AppError::internal(format!("bad {column} value '{raw}'"))
    })
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = AppError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let clock_in = AttendanceSubEvent {
            location: Location {
                latitude: row.clock_in_latitude,
                longitude: row.clock_in_longitude,
                address: row.clock_in_address,
            },
            selfie: row.clock_in_selfie,
            liveness_check: parse_column::<LivenessCheck>("clock_in_liveness", &row.clock_in_liveness)?,
            status: parse_column::<EventStatus>("clock_in_status", &row.clock_in_status)?,
            remarks: row.clock_in_remarks,
            timestamp: row.clock_in_timestamp,
            created_at: row.clock_in_created_at,
            updated_at: row.clock_in_updated_at,
        };

        let clock_out = match (
            row.clock_out_latitude,
            row.clock_out_longitude,
            row.clock_out_status,
            row.clock_out_timestamp,
        ) {
            (Some(latitude), Some(longitude), Some(status), Some(timestamp)) => Some(AttendanceSubEvent {
                location: Location {
                    latitude,
                    longitude,
                    address: row.clock_out_address,
                },
                selfie: row.clock_out_selfie.unwrap_or_default(),
                liveness_check: match row.clock_out_liveness.as_deref() {
                    Some(raw) => parse_column("clock_out_liveness", raw)?,
                    None => LivenessCheck::Pending,
                },
                status: parse_column("clock_out_status", &status)?,
                remarks: row.clock_out_remarks,
                timestamp,
                created_at: row.clock_out_created_at.unwrap_or(timestamp),
                updated_at: row.clock_out_updated_at.unwrap_or(timestamp),
            }),
            _ => None,
        };

        Ok(AttendanceRecord {
            id: row.id,
            employee_id: row.employee_id,
            date: row.date,
            clock_in,
            clock_out,
            status: parse_column::<RecordStatus>("status", &row.status)?,
            remarks: row.remarks,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub async fn find_by_day(
    pool: &MySqlPool,
    employee_id: u64,
    date: NaiveDate,
) -> Result<Option<AttendanceRecord>, AppError> {
    let row = sqlx::query_as::<_, AttendanceRow>(
        "SELECT * FROM attendance_records WHERE employee_id = ? AND date = ?",
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(pool)
    .await?;

    row.map(AttendanceRecord::try_from).transpose()
}

pub async fn find_by_id(pool: &MySqlPool, id: u64) -> Result<Option<AttendanceRecord>, AppError> {
    let row = sqlx::query_as::<_, AttendanceRow>("SELECT * FROM attendance_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(AttendanceRecord::try_from).transpose()
}

/// Inserts a freshly clocked-in record and returns it with its id.
/// A concurrent clock-in for the same day loses on the unique key.
pub async fn insert(pool: &MySqlPool, record: AttendanceRecord) -> Result<AttendanceRecord, AppError> {
    let event = &record.clock_in;
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_records (
            employee_id, date, status, remarks, version, created_at, updated_at,
            clock_in_latitude, clock_in_longitude, clock_in_address, clock_in_selfie,
            clock_in_liveness, clock_in_status, clock_in_remarks, clock_in_timestamp,
            clock_in_created_at, clock_in_updated_at
        )
        VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.employee_id)
    .bind(record.date)
    .bind(record.status.as_ref())
    .bind(record.remarks.as_deref())
    .bind(record.created_at)
    .bind(record.updated_at)
    .bind(event.location.latitude)
    .bind(event.location.longitude)
    .bind(event.location.address.as_deref())
    .bind(&event.selfie)
    .bind(event.liveness_check.as_ref())
    .bind(event.status.as_ref())
    .bind(event.remarks.as_deref())
    .bind(event.timestamp)
    .bind(event.created_at)
    .bind(event.updated_at)
    .execute(pool)
    .await;

    match result {
        Ok(done) => Ok(AttendanceRecord {
            id: done.last_insert_id(),
            version: 0,
            ..record
        }),
        Err(e) => Err(insert_error(e)),
    }
}

/// A second row for the same (employee, date) means the employee already clocked in.
fn insert_error(e: sqlx::Error) -> AppError {
    if is_duplicate_key(&e) {
        AppError::invalid("Already clocked in today")
    } else {
        e.into()
    }
}

fn ensure_written(rows_affected: u64, record_id: u64, version: u32) -> Result<(), AppError> {
    if rows_affected == 0 {
        tracing::warn!(record_id, version, "Attendance write lost a race");
        return Err(AppError::Conflict(
            "Attendance record was modified concurrently, please retry".to_string(),
        ));
    }
    Ok(())
}

/// Writes every mutable column if nobody else has written since `record`
/// was read. Returns the record with its bumped version.
pub async fn save(pool: &MySqlPool, record: AttendanceRecord) -> Result<AttendanceRecord, AppError> {
    let clock_in = &record.clock_in;
    let clock_out = record.clock_out.as_ref();

    let result = sqlx::query(
        r#"
        UPDATE attendance_records SET
            status = ?, remarks = ?, updated_at = ?, version = version + 1,
            clock_in_liveness = ?, clock_in_status = ?, clock_in_remarks = ?, clock_in_updated_at = ?,
            clock_out_latitude = ?, clock_out_longitude = ?, clock_out_address = ?, clock_out_selfie = ?,
            clock_out_liveness = ?, clock_out_status = ?, clock_out_remarks = ?, clock_out_timestamp = ?,
            clock_out_created_at = ?, clock_out_updated_at = ?
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(record.status.as_ref())
    .bind(record.remarks.as_deref())
    .bind(record.updated_at)
    .bind(clock_in.liveness_check.as_ref())
    .bind(clock_in.status.as_ref())
    .bind(clock_in.remarks.as_deref())
    .bind(clock_in.updated_at)
    .bind(clock_out.map(|e| e.location.latitude))
    .bind(clock_out.map(|e| e.location.longitude))
    .bind(clock_out.and_then(|e| e.location.address.as_deref()))
    .bind(clock_out.map(|e| e.selfie.as_str()))
    .bind(clock_out.map(|e| e.liveness_check.as_ref()))
    .bind(clock_out.map(|e| e.status.as_ref()))
    .bind(clock_out.and_then(|e| e.remarks.as_deref()))
    .bind(clock_out.map(|e| e.timestamp))
    .bind(clock_out.map(|e| e.created_at))
    .bind(clock_out.map(|e| e.updated_at))
    .bind(record.id)
    .bind(record.version)
    .execute(pool)
    .await?;

    ensure_written(result.rows_affected(), record.id, record.version)?;

    Ok(AttendanceRecord {
        version: record.version + 1,
        ..record
    })
}

pub async fn count_and_list(
    pool: &MySqlPool,
    filter: &SqlFilter,
    page: Page,
) -> Result<(i64, Vec<AttendanceRecord>), AppError> {
    let where_sql = filter.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM attendance_records a{}", where_sql);
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await?;

    let data_sql = format!(
        "SELECT a.* FROM attendance_records a{} ORDER BY a.date DESC LIMIT ? OFFSET ?",
        where_sql
    );
    let rows = filter
        .bind_as(sqlx::query_as::<_, AttendanceRow>(&data_sql))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    let records = rows
        .into_iter()
        .map(AttendanceRecord::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((total, records))
}

/// Dashboard listing; `filter` may reference `a.` (records) and `e.` (employees).
pub async fn count_and_list_with_employee(
    pool: &MySqlPool,
    filter: &SqlFilter,
    page: Page,
) -> Result<(i64, Vec<(AttendanceRecord, EmployeeSummary)>), AppError> {
    let where_sql = filter.where_sql();

    let count_sql = format!(
        "SELECT COUNT(*) FROM attendance_records a JOIN employees e ON e.id = a.employee_id{}",
        where_sql
    );
    let total = filter
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool)
        .await?;

    let data_sql = format!(
        r#"
        SELECT a.*, e.employee_code, e.first_name, e.last_name
        FROM attendance_records a
        JOIN employees e ON e.id = a.employee_id
        {}
        ORDER BY a.created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );
    let rows = filter
        .bind_as(sqlx::query_as::<_, AttendanceWithEmployeeRow>(&data_sql))
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(pool)
        .await?;

    rows.into_iter()
        .map(|row| {
            let employee = EmployeeSummary {
                id: row.record.employee_id,
                employee_code: row.employee_code,
                first_name: row.first_name,
                last_name: row.last_name,
            };
            AttendanceRecord::try_from(row.record).map(|record| (record, employee))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(|items| (total, items))
}

/// Record counts per overall status between two dates (inclusive)
pub async fn status_counts(
    pool: &MySqlPool,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<(String, i64)>, AppError> {
    let counts = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT status, COUNT(*)
        FROM attendance_records
        WHERE employee_id = ? AND date BETWEEN ? AND ?
        GROUP BY status
        "#,
    )
    .bind(employee_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::testing::db_error;
    use sqlx::error::ErrorKind;

    fn row() -> AttendanceRow {
        let now = Utc::now();
        AttendanceRow {
            id: 3,
            employee_id: 8,
            date: now.date_naive(),
            status: "partial".into(),
            remarks: Some("Clock-in approved by lead".into()),
            version: 2,
            created_at: now,
            updated_at: now,
            clock_in_latitude: 23.8,
            clock_in_longitude: 90.4,
            clock_in_address: None,
            clock_in_selfie: "selfies/8/in.jpg".into(),
            clock_in_liveness: "pending".into(),
            clock_in_status: "approved".into(),
            clock_in_remarks: None,
            clock_in_timestamp: now,
            clock_in_created_at: now,
            clock_in_updated_at: now,
            clock_out_latitude: None,
            clock_out_longitude: None,
            clock_out_address: None,
            clock_out_selfie: None,
            clock_out_liveness: None,
            clock_out_status: None,
            clock_out_remarks: None,
            clock_out_timestamp: None,
            clock_out_created_at: None,
            clock_out_updated_at: None,
        }
    }

    #[test]
    fn row_without_clock_out_columns_has_no_clock_out() {
        let record = AttendanceRecord::try_from(row()).unwrap();
        assert_eq!(record.status, RecordStatus::Partial);
        assert_eq!(record.clock_in.status, EventStatus::Approved);
        assert!(record.clock_out.is_none());
        assert_eq!(record.version, 2);
    }

    #[test]
    fn clock_out_columns_become_a_sub_event() {
        let now = Utc::now();
        let mut r = row();
        r.clock_out_latitude = Some(23.81);
        r.clock_out_longitude = Some(90.41);
        r.clock_out_selfie = Some(String::new());
        r.clock_out_status = Some("pending".into());
        r.clock_out_timestamp = Some(now);

        let record = AttendanceRecord::try_from(r).unwrap();
        let out = record.clock_out.unwrap();
        assert_eq!(out.status, EventStatus::Pending);
        assert_eq!(out.liveness_check, LivenessCheck::Pending);
        assert_eq!(out.created_at, now);
    }

    #[test]
    fn unknown_status_text_is_an_internal_error() {
        let mut r = row();
        r.status = "late".into();
        assert!(matches!(AttendanceRecord::try_from(r), Err(AppError::Internal(_))));
    }

    #[test]
    fn second_clock_in_on_the_same_day_is_rejected() {
        let err = insert_error(db_error("23000", ErrorKind::UniqueViolation));
        match err {
            AppError::InvalidInput(msg) => assert_eq!(msg, "Already clocked in today"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn foreign_key_failure_on_insert_is_internal() {
        let err = insert_error(db_error("23000", ErrorKind::ForeignKeyViolation));
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn stale_version_update_is_a_conflict() {
        assert!(matches!(ensure_written(0, 3, 2), Err(AppError::Conflict(_))));
        assert!(ensure_written(1, 3, 2).is_ok());
    }
}
