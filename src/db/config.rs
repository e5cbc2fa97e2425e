use chrono::NaiveTime;
use sqlx::{FromRow, MySqlPool};

use crate::error::AppError;
use crate::model::attendance_config::{AttendanceConfig, GeoFence, OverrideSettings, WorkingHours, resolve};

#[derive(Debug, FromRow)]
struct ConfigGroupRow {
    allowed_locations: String,
    work_start: NaiveTime,
    work_end: NaiveTime,
    flexible_time: u32,
    break_time: Option<u32>,
    require_selfie: bool,
    allow_remote_work: bool,
    description: Option<String>,
}

impl TryFrom<ConfigGroupRow> for AttendanceConfig {
    type Error = AppError;

    fn try_from(row: ConfigGroupRow) -> Result<Self, Self::Error> {
        let allowed_locations: Vec<GeoFence> = serde_json::from_str(&row.allowed_locations)?;
        Ok(AttendanceConfig {
            allowed_locations,
            working_hours: WorkingHours {
                start: row.work_start,
                end: row.work_end,
                flexible_time: row.flexible_time,
                break_time: row.break_time,
            },
            require_selfie: row.require_selfie,
            allow_remote_work: row.allow_remote_work,
            description: row.description,
        })
    }
}

/// The group a supervisor saved, if any
pub async fn find_group(pool: &MySqlPool, supervisor_id: u64) -> Result<Option<AttendanceConfig>, AppError> {
    let row = sqlx::query_as::<_, ConfigGroupRow>(
        r#"
        SELECT allowed_locations, work_start, work_end, flexible_time, break_time,
               require_selfie, allow_remote_work, description
        FROM attendance_config_groups
        WHERE supervisor_id = ?
        "#,
    )
    .bind(supervisor_id)
    .fetch_optional(pool)
    .await?;

    row.map(AttendanceConfig::try_from).transpose()
}

pub async fn upsert_group(pool: &MySqlPool, supervisor_id: u64, config: &AttendanceConfig) -> Result<(), AppError> {
    let locations = serde_json::to_string(&config.allowed_locations)?;

    sqlx::query(
        r#"
        INSERT INTO attendance_config_groups (
            supervisor_id, allowed_locations, work_start, work_end, flexible_time, break_time,
            require_selfie, allow_remote_work, description
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            allowed_locations = VALUES(allowed_locations),
            work_start = VALUES(work_start),
            work_end = VALUES(work_end),
            flexible_time = VALUES(flexible_time),
            break_time = VALUES(break_time),
            require_selfie = VALUES(require_selfie),
            allow_remote_work = VALUES(allow_remote_work),
            description = VALUES(description)
        "#,
    )
    .bind(supervisor_id)
    .bind(locations)
    .bind(config.working_hours.start)
    .bind(config.working_hours.end)
    .bind(config.working_hours.flexible_time)
    .bind(config.working_hours.break_time)
    .bind(config.require_selfie)
    .bind(config.allow_remote_work)
    .bind(config.description.as_deref())
    .execute(pool)
    .await?;

    Ok(())
}

/// Active override for one employee
pub async fn find_override(pool: &MySqlPool, employee_id: u64) -> Result<Option<OverrideSettings>, AppError> {
    let raw = sqlx::query_scalar::<_, String>(
        "SELECT override_settings FROM employee_attendance_configs WHERE employee_id = ? AND is_active = TRUE",
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?;

    match raw {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn upsert_override(
    pool: &MySqlPool,
    employee_id: u64,
    settings: &OverrideSettings,
    is_active: bool,
) -> Result<(), AppError> {
    let raw = serde_json::to_string(settings)?;

    sqlx::query(
        r#"
        INSERT INTO employee_attendance_configs (employee_id, override_settings, is_active)
        VALUES (?, ?, ?)
        ON DUPLICATE KEY UPDATE
            override_settings = VALUES(override_settings),
            is_active = VALUES(is_active)
        "#,
    )
    .bind(employee_id)
    .bind(raw)
    .bind(is_active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Override layered over the supervisor's group; `None` when neither exists
pub async fn effective_for(
    pool: &MySqlPool,
    employee_id: u64,
    supervisor_id: Option<u64>,
) -> Result<Option<AttendanceConfig>, AppError> {
    let group = match supervisor_id {
        Some(supervisor_id) => find_group(pool, supervisor_id).await?,
        None => None,
    };
    let override_settings = find_override(pool, employee_id).await?;
    Ok(resolve(group, override_settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_row_decodes_its_location_list() {
        let row = ConfigGroupRow {
            allowed_locations: r#"[{"name":"HQ","latitude":1.0,"longitude":2.0,"radius":50.0}]"#.into(),
            work_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            work_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            flexible_time: 15,
            break_time: None,
            require_selfie: true,
            allow_remote_work: false,
            description: None,
        };

        let config = AttendanceConfig::try_from(row).unwrap();
        assert_eq!(config.allowed_locations.len(), 1);
        assert_eq!(config.allowed_locations[0].name, "HQ");
        assert_eq!(config.working_hours.flexible_time, 15);
        assert!(config.require_selfie);
    }

    #[test]
    fn corrupt_location_json_is_internal() {
        let row = ConfigGroupRow {
            allowed_locations: "not json".into(),
            work_start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            work_end: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            flexible_time: 0,
            break_time: None,
            require_selfie: false,
            allow_remote_work: false,
            description: None,
        };
        assert!(matches!(AttendanceConfig::try_from(row), Err(AppError::Internal(_))));
    }
}
