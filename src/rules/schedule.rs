//! Working-hours window.
//!
//! The check runs on minutes since midnight of the local wall clock and
//! accepts `start - flexible_time <= t <= end + flexible_time`. A window
//! whose end is earlier than its start (an overnight shift) is compared
//! the same way and therefore never matches; see DESIGN.md.

use chrono::{DateTime, TimeZone, Timelike};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance_config::WorkingHours;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ScheduleCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn minutes_since_midnight<T: Timelike>(t: &T) -> i64 {
    i64::from(t.hour()) * 60 + i64::from(t.minute())
}

/// `timestamp` must already be in the record's local zone.
pub fn is_within_working_hours<Tz: TimeZone>(timestamp: &DateTime<Tz>, hours: &WorkingHours) -> ScheduleCheck {
    let t = minutes_since_midnight(&timestamp.time());
    let flex = i64::from(hours.flexible_time);
    let earliest = minutes_since_midnight(&hours.start) - flex;
    let latest = minutes_since_midnight(&hours.end) + flex;

    if (earliest..=latest).contains(&t) {
        return ScheduleCheck {
            valid: true,
            message: None,
        };
    }

    ScheduleCheck {
        valid: false,
        message: Some(format!(
            "Attendance only allowed between {} and {} (±{} minutes)",
            hours.start.format("%H:%M"),
            hours.end.format("%H:%M"),
            hours.flexible_time
        )),
    }
}

/// True when the configured end is earlier than the start.
pub fn crosses_midnight(hours: &WorkingHours) -> bool {
    hours.end < hours.start
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, NaiveTime};
    use proptest::prelude::*;

    fn hours(start: (u32, u32), end: (u32, u32), flex: u32) -> WorkingHours {
        WorkingHours {
            start: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            flexible_time: flex,
            break_time: None,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        let tz = FixedOffset::east_opt(6 * 3600).unwrap();
        tz.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn at_minute(minute: i64) -> DateTime<FixedOffset> {
        at(0, 0) + Duration::minutes(minute)
    }

    #[test]
    fn early_arrival_within_flexible_time_is_valid() {
        let h = hours((9, 0), (17, 0), 30);
        assert!(is_within_working_hours(&at(8, 45), &h).valid);
        assert!(is_within_working_hours(&at(8, 30), &h).valid);
    }

    #[test]
    fn arrival_before_the_margin_is_refused() {
        let h = hours((9, 0), (17, 0), 30);
        let check = is_within_working_hours(&at(8, 25), &h);
        assert!(!check.valid);
        assert_eq!(
            check.message.as_deref(),
            Some("Attendance only allowed between 09:00 and 17:00 (±30 minutes)")
        );
    }

    #[test]
    fn late_departure_uses_the_same_margin() {
        let h = hours((9, 0), (17, 0), 30);
        assert!(is_within_working_hours(&at(17, 30), &h).valid);
        assert!(!is_within_working_hours(&at(17, 31), &h).valid);
    }

    #[test]
    fn seconds_are_ignored() {
        let h = hours((9, 0), (17, 0), 0);
        let t = at(17, 0) + Duration::seconds(59);
        assert!(is_within_working_hours(&t, &h).valid);
    }

    #[test]
    fn local_wall_clock_is_what_counts() {
        let h = hours((9, 0), (17, 0), 0);
        // 03:30 UTC is 09:30 at +06:00
        let utc = chrono::Utc.with_ymd_and_hms(2026, 3, 2, 3, 30, 0).unwrap();
        let local = utc.with_timezone(&FixedOffset::east_opt(6 * 3600).unwrap());
        assert!(!is_within_working_hours(&utc, &h).valid);
        assert!(is_within_working_hours(&local, &h).valid);
    }

    #[test]
    fn overnight_windows_are_not_special_cased() {
        let h = hours((22, 0), (6, 0), 0);
        assert!(crosses_midnight(&h));
        assert!(!is_within_working_hours(&at(23, 0), &h).valid);
        assert!(!is_within_working_hours(&at(2, 0), &h).valid);
    }

    proptest! {
        #[test]
        fn every_minute_of_the_closed_window_is_valid(
            start in 60i64..600,
            length in 0i64..600,
            flex in 0i64..60,
            pick in 0.0f64..=1.0,
        ) {
            let end = start + length;
            let h = hours(((start / 60) as u32, (start % 60) as u32), ((end / 60) as u32, (end % 60) as u32), flex as u32);
            let lo = start - flex;
            let hi = end + flex;
            let t = lo + ((hi - lo) as f64 * pick).round() as i64;
            prop_assert!(is_within_working_hours(&at_minute(t), &h).valid);
        }

        #[test]
        fn the_minute_just_outside_is_invalid(
            start in 60i64..600,
            length in 0i64..600,
            flex in 0i64..60,
        ) {
            let end = start + length;
            let h = hours(((start / 60) as u32, (start % 60) as u32), ((end / 60) as u32, (end % 60) as u32), flex as u32);
            prop_assert!(!is_within_working_hours(&at_minute(start - flex - 1), &h).valid);
            prop_assert!(!is_within_working_hours(&at_minute(end + flex + 1), &h).valid);
        }
    }
}
