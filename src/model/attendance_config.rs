use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// A named circular zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Head office",
    "latitude": 23.8103,
    "longitude": 90.4125,
    "radius": 150.0,
    "address": "Gulshan 1, Dhaka"
}))]
pub struct GeoFence {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// meters
    pub radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl GeoFence {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid("Location name is required"));
        }
        let coords_ok = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if !coords_ok {
            return Err(AppError::invalid(format!("Location '{}' has out of range coordinates", self.name)));
        }
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(AppError::invalid(format!("Location '{}' needs a positive radius", self.name)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"start": "09:00", "end": "17:00", "flexible_time": 30, "break_time": 60}))]
pub struct WorkingHours {
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "09:00")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "17:00")]
    pub end: NaiveTime,
    /// minutes tolerated before start and after end
    #[serde(default)]
    pub flexible_time: u32,
    /// minutes, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub break_time: Option<u32>,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
            flexible_time: 30,
            break_time: Some(60),
        }
    }
}

/// Settings a supervisor saves for everyone they supervise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceConfig {
    #[serde(default)]
    pub allowed_locations: Vec<GeoFence>,
    pub working_hours: WorkingHours,
    #[serde(default)]
    pub require_selfie: bool,
    #[serde(default)]
    pub allow_remote_work: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        Self {
            allowed_locations: Vec::new(),
            working_hours: WorkingHours::default(),
            require_selfie: false,
            allow_remote_work: false,
            description: None,
        }
    }
}

/// Per-employee exceptions; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OverrideSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_locations: Option<Vec<GeoFence>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_selfie: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_remote_work: Option<bool>,
}

impl OverrideSettings {
    pub fn apply_to(self, mut base: AttendanceConfig) -> AttendanceConfig {
        if let Some(locations) = self.allowed_locations {
            base.allowed_locations = locations;
        }
        if let Some(hours) = self.working_hours {
            base.working_hours = hours;
        }
        if let Some(require) = self.require_selfie {
            base.require_selfie = require;
        }
        if let Some(remote) = self.allow_remote_work {
            base.allow_remote_work = remote;
        }
        base
    }
}

/// Effective settings for one employee: the override layered over the
/// supervisor's group, or over the defaults when only an override exists.
pub fn resolve(
    group: Option<AttendanceConfig>,
    override_settings: Option<OverrideSettings>,
) -> Option<AttendanceConfig> {
    match (group, override_settings) {
        (Some(group), Some(o)) => Some(o.apply_to(group)),
        (Some(group), None) => Some(group),
        (None, Some(o)) => Some(o.apply_to(AttendanceConfig::default())),
        (None, None) => None,
    }
}

/// `"HH:MM"` wall-clock times
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(raw.trim(), FORMAT)
            .map_err(|_| D::Error::custom(format!("invalid time '{}', expected HH:MM", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fence(name: &str) -> GeoFence {
        GeoFence {
            name: name.into(),
            latitude: 0.0,
            longitude: 0.0,
            radius: 100.0,
            address: None,
        }
    }

    #[test]
    fn working_hours_use_hh_mm_on_the_wire() {
        let hours: WorkingHours =
            serde_json::from_str(r#"{"start":"08:30","end":"16:45","flexible_time":15}"#).unwrap();
        assert_eq!(hours.start, NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(hours.break_time, None);

        let json = serde_json::to_value(&hours).unwrap();
        assert_eq!(json["end"], "16:45");
    }

    #[test]
    fn malformed_times_are_refused() {
        let err = serde_json::from_str::<WorkingHours>(r#"{"start":"9am","end":"17:00"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn override_replaces_only_the_fields_it_sets() {
        let group = AttendanceConfig {
            allowed_locations: vec![fence("office")],
            require_selfie: true,
            ..AttendanceConfig::default()
        };
        let o = OverrideSettings {
            allow_remote_work: Some(true),
            ..OverrideSettings::default()
        };

        let merged = resolve(Some(group), Some(o)).unwrap();
        assert!(merged.allow_remote_work);
        assert!(merged.require_selfie);
        assert_eq!(merged.allowed_locations[0].name, "office");
    }

    #[test]
    fn override_without_group_sits_on_defaults() {
        let o = OverrideSettings {
            allowed_locations: Some(vec![fence("home")]),
            ..OverrideSettings::default()
        };
        let merged = resolve(None, Some(o)).unwrap();
        assert_eq!(merged.working_hours, WorkingHours::default());
        assert_eq!(merged.allowed_locations.len(), 1);
    }

    #[test]
    fn fences_need_a_name_and_a_positive_radius() {
        assert!(fence("office").validate().is_ok());
        assert!(fence(" ").validate().is_err());

        let mut flat = fence("office");
        flat.radius = 0.0;
        assert!(flat.validate().is_err());

        let mut off_map = fence("office");
        off_map.longitude = 181.0;
        assert!(off_map.validate().is_err());
    }

    #[test]
    fn nothing_configured_resolves_to_none() {
        assert!(resolve(None, None).is_none());
    }
}
