use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;

/// Status of a single clock-in or clock-out event
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventStatus {
    Pending,
    Approved,
    Rejected,
}

/// Aggregate status of a daily record
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RecordStatus {
    Pending,
    Approved,
    Rejected,
    Partial,
}

impl From<EventStatus> for RecordStatus {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Pending => RecordStatus::Pending,
            EventStatus::Approved => RecordStatus::Approved,
            EventStatus::Rejected => RecordStatus::Rejected,
        }
    }
}

/// Anti-spoofing result; filled in by asynchronous post-processing, never inline.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LivenessCheck {
    Pending,
    Positive,
    Negative,
}

/// Which half of the day a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    #[serde(alias = "clockin", alias = "checkIn")]
    #[strum(serialize = "Clock-in")]
    ClockIn,
    #[serde(alias = "clockout", alias = "checkOut")]
    #[strum(serialize = "Clock-out")]
    ClockOut,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"latitude": 23.8103, "longitude": 90.4125, "address": "Gulshan 1, Dhaka"}))]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Location {
    pub fn validate(&self) -> Result<(), AppError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lng_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lng_ok {
            Ok(())
        } else {
            Err(AppError::invalid("Location coordinates are out of range"))
        }
    }
}

/// One clock-in or clock-out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSubEvent {
    pub location: Location,
    /// Stored selfie object key; empty for supervisor-initiated events
    pub selfie: String,
    pub liveness_check: LivenessCheck,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub timestamp: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceSubEvent {
    /// Employee self-service event, awaiting review
    pub fn submitted(location: Location, selfie: String, now: DateTime<Utc>) -> Self {
        Self {
            location,
            selfie,
            liveness_check: LivenessCheck::Pending,
            status: EventStatus::Pending,
            remarks: None,
            timestamp: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Supervisor-initiated event: no selfie, approved on creation
    pub fn by_supervisor(location: Location, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            location,
            selfie: String::new(),
            liveness_check: LivenessCheck::Pending,
            status: EventStatus::Approved,
            remarks: None,
            timestamp,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One employee, one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceRecord {
    /// Zero until the record has been inserted
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub clock_in: AttendanceSubEvent,
    pub clock_out: Option<AttendanceSubEvent>,
    pub status: RecordStatus,
    /// Append-only audit trail, one annotation per line
    pub remarks: Option<String>,
    #[serde(skip)]
    pub version: u32,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn event_mut(&mut self, event_type: EventType) -> Option<&mut AttendanceSubEvent> {
        match event_type {
            EventType::ClockIn => Some(&mut self.clock_in),
            EventType::ClockOut => self.clock_out.as_mut(),
        }
    }

    /// Add one line to the audit trail; earlier lines are kept verbatim.
    pub fn append_remark(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        self.remarks = Some(match self.remarks.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{}\n{}", existing, line),
            _ => line.to_string(),
        });
    }
}
