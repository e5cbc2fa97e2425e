//! Daily attendance record state machine.
//!
//! ```text
//! NoRecord --clock in--> ClockedIn --clock out--> ClockedOut --decision--> Partial | Approved | Rejected
//! ```
//!
//! All functions here are pure: callers load the current record, run the
//! transition, then persist the result with a compare-and-swap write.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use crate::error::AppError;
use crate::model::attendance::{AttendanceRecord, AttendanceSubEvent, EventStatus, EventType, RecordStatus};
use crate::rules::reconcile::reconcile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoRecord,
    ClockedIn,
    ClockedOut,
    Partial,
    Approved,
    Rejected,
}

pub fn phase(record: Option<&AttendanceRecord>) -> Phase {
    let Some(record) = record else {
        return Phase::NoRecord;
    };
    match (record.status, record.clock_out.is_some()) {
        (RecordStatus::Pending, false) => Phase::ClockedIn,
        (RecordStatus::Pending, true) => Phase::ClockedOut,
        (RecordStatus::Partial, _) => Phase::Partial,
        (RecordStatus::Approved, _) => Phase::Approved,
        (RecordStatus::Rejected, _) => Phase::Rejected,
    }
}

/// Checks that `event_type` is the next legal clock event for today's record.
pub fn ensure_can_clock(existing: Option<&AttendanceRecord>, event_type: EventType) -> Result<(), AppError> {
    match (event_type, existing) {
        (EventType::ClockIn, Some(_)) => Err(AppError::invalid("Already clocked in today")),
        (EventType::ClockIn, None) => Ok(()),
        (EventType::ClockOut, None) => Err(AppError::invalid("No clock-in record found for today")),
        (EventType::ClockOut, Some(r)) if r.clock_out.is_some() => {
            Err(AppError::invalid("Already clocked out today"))
        }
        (EventType::ClockOut, Some(_)) => Ok(()),
    }
}

/// `NoRecord -> ClockedIn`. The new record is `pending` whatever the
/// status of the clock-in itself.
pub fn clock_in(
    existing: Option<&AttendanceRecord>,
    employee_id: u64,
    date: NaiveDate,
    event: AttendanceSubEvent,
    audit: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, AppError> {
    ensure_can_clock(existing, EventType::ClockIn)?;

    let mut record = AttendanceRecord {
        id: 0,
        employee_id,
        date,
        clock_in: event,
        clock_out: None,
        status: RecordStatus::Pending,
        remarks: None,
        version: 0,
        created_at: now,
        updated_at: now,
    };
    if let Some(line) = audit {
        record.append_remark(line);
    }
    Ok(record)
}

/// `ClockedIn -> ClockedOut`
pub fn clock_out(
    existing: Option<AttendanceRecord>,
    event: AttendanceSubEvent,
    audit: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, AppError> {
    ensure_can_clock(existing.as_ref(), EventType::ClockOut)?;
    let Some(mut record) = existing else {
        return Err(AppError::invalid("No clock-in record found for today"));
    };

    record.status = reconcile(record.clock_in.status, Some(event.status));
    record.clock_out = Some(event);
    record.updated_at = now;
    if let Some(line) = audit {
        record.append_remark(line);
    }
    Ok(record)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Verdict {
    Approved,
    Rejected,
}

impl From<Verdict> for EventStatus {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Approved => EventStatus::Approved,
            Verdict::Rejected => EventStatus::Rejected,
        }
    }
}

/// A validated review decision. Construction fails for a rejection without
/// remarks, so an invalid decision never reaches a record.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    verdict: Verdict,
    remarks: Option<String>,
    target: Option<EventType>,
}

impl Decision {
    pub fn new(verdict: Verdict, remarks: Option<String>, target: Option<EventType>) -> Result<Self, AppError> {
        let remarks = remarks.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
        if verdict == Verdict::Rejected && remarks.is_none() {
            return Err(AppError::invalid("Remarks are required when rejecting attendance"));
        }
        Ok(Self {
            verdict,
            remarks,
            target,
        })
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    fn audit_line(&self, reviewer: &str) -> String {
        let subject = match self.target {
            Some(t) => t.to_string(),
            None => "Attendance".to_string(),
        };
        match &self.remarks {
            Some(r) => format!("{} {} by {}: {}", subject, self.verdict, reviewer, r),
            None => format!("{} {} by {}", subject, self.verdict, reviewer),
        }
    }
}

/// Applies a review decision.
///
/// With a target only that sub-event changes and the overall status is
/// reconciled. Without one (the legacy bulk decision) the record and both
/// sub-events take the verdict directly, skipping `partial`.
pub fn apply_decision(
    mut record: AttendanceRecord,
    decision: &Decision,
    reviewer: &str,
    now: DateTime<Utc>,
) -> Result<AttendanceRecord, AppError> {
    let status: EventStatus = decision.verdict.into();

    match decision.target {
        Some(target) => {
            let event = record
                .event_mut(target)
                .ok_or_else(|| AppError::invalid(format!("No {} to review", target.to_string().to_lowercase())))?;
            event.status = status;
            event.updated_at = now;
            if decision.remarks.is_some() {
                event.remarks = decision.remarks.clone();
            }
            record.status = reconcile(record.clock_in.status, record.clock_out.as_ref().map(|e| e.status));
        }
        None => {
            record.clock_in.status = status;
            record.clock_in.updated_at = now;
            if let Some(out) = record.clock_out.as_mut() {
                out.status = status;
                out.updated_at = now;
            }
            record.status = status.into();
        }
    }

    record.append_remark(&decision.audit_line(reviewer));
    record.updated_at = now;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{Location, LivenessCheck};
    use proptest::prelude::*;

    fn location() -> Location {
        Location {
            latitude: 23.8103,
            longitude: 90.4125,
            address: Some("Gulshan 1".into()),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn clocked_in() -> AttendanceRecord {
        let now = Utc::now();
        let event = AttendanceSubEvent::submitted(location(), "selfies/5/in.jpg".into(), now);
        clock_in(None, 5, today(), event, None, now).unwrap()
    }

    fn clocked_out() -> AttendanceRecord {
        let now = Utc::now();
        let event = AttendanceSubEvent::submitted(location(), "selfies/5/out.jpg".into(), now);
        clock_out(Some(clocked_in()), event, None, now).unwrap()
    }

    fn decide(record: AttendanceRecord, verdict: Verdict, remarks: Option<&str>, target: Option<EventType>) -> AttendanceRecord {
        let decision = Decision::new(verdict, remarks.map(str::to_string), target).unwrap();
        apply_decision(record, &decision, "lead@company.com", Utc::now()).unwrap()
    }

    #[test]
    fn first_clock_in_creates_a_pending_record() {
        let record = clocked_in();
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(record.clock_in.status, EventStatus::Pending);
        assert_eq!(record.clock_in.liveness_check, LivenessCheck::Pending);
        assert!(record.clock_out.is_none());
        assert_eq!(phase(Some(&record)), Phase::ClockedIn);
    }

    #[test]
    fn double_clock_in_is_invalid_input() {
        let existing = clocked_in();
        let event = AttendanceSubEvent::submitted(location(), "again.jpg".into(), Utc::now());
        let err = clock_in(Some(&existing), 5, today(), event, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "Already clocked in today"));
    }

    #[test]
    fn clock_out_requires_a_clock_in() {
        let event = AttendanceSubEvent::submitted(location(), "out.jpg".into(), Utc::now());
        let err = clock_out(None, event, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn second_clock_out_is_refused() {
        let event = AttendanceSubEvent::submitted(location(), "out2.jpg".into(), Utc::now());
        let err = clock_out(Some(clocked_out()), event, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "Already clocked out today"));
    }

    #[test]
    fn clock_out_moves_to_clocked_out() {
        let record = clocked_out();
        assert_eq!(record.status, RecordStatus::Pending);
        assert_eq!(phase(Some(&record)), Phase::ClockedOut);
        assert_eq!(phase(None), Phase::NoRecord);
    }

    #[test]
    fn approving_each_half_goes_through_partial() {
        let record = decide(clocked_out(), Verdict::Approved, None, Some(EventType::ClockIn));
        assert_eq!(record.status, RecordStatus::Partial);
        assert_eq!(record.clock_in.status, EventStatus::Approved);
        assert_eq!(record.clock_out.as_ref().unwrap().status, EventStatus::Pending);

        let record = decide(record, Verdict::Approved, None, Some(EventType::ClockOut));
        assert_eq!(record.status, RecordStatus::Approved);
        assert_eq!(phase(Some(&record)), Phase::Approved);
    }

    #[test]
    fn split_decisions_stay_partial() {
        let record = decide(clocked_out(), Verdict::Approved, None, Some(EventType::ClockIn));
        let record = decide(record, Verdict::Rejected, Some("left early"), Some(EventType::ClockOut));
        assert_eq!(record.status, RecordStatus::Partial);
        assert_eq!(record.clock_out.as_ref().unwrap().remarks.as_deref(), Some("left early"));
    }

    #[test]
    fn approving_a_lone_clock_in_is_partial() {
        let record = decide(clocked_in(), Verdict::Approved, None, Some(EventType::ClockIn));
        assert_eq!(record.status, RecordStatus::Partial);
    }

    #[test]
    fn reviewing_a_missing_clock_out_is_invalid() {
        let decision = Decision::new(Verdict::Approved, None, Some(EventType::ClockOut)).unwrap();
        let err = apply_decision(clocked_in(), &decision, "lead", Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "No clock-out to review"));
    }

    #[test]
    fn legacy_bulk_decision_sets_everything_at_once() {
        let record = decide(clocked_out(), Verdict::Rejected, Some("outside office"), None);
        assert_eq!(record.status, RecordStatus::Rejected);
        assert_eq!(record.clock_in.status, EventStatus::Rejected);
        assert_eq!(record.clock_out.as_ref().unwrap().status, EventStatus::Rejected);
        assert_eq!(
            record.remarks.as_deref(),
            Some("Attendance rejected by lead@company.com: outside office")
        );
    }

    #[test]
    fn decisions_append_to_the_audit_trail() {
        let record = decide(clocked_out(), Verdict::Approved, None, Some(EventType::ClockIn));
        let record = decide(record, Verdict::Approved, Some("ok"), Some(EventType::ClockOut));
        assert_eq!(
            record.remarks.as_deref(),
            Some("Clock-in approved by lead@company.com\nClock-out approved by lead@company.com: ok")
        );
    }

    #[test]
    fn supervisor_clock_in_keeps_record_pending_until_clock_out() {
        let now = Utc::now();
        let event = AttendanceSubEvent::by_supervisor(location(), now, now);
        assert!(event.selfie.is_empty());
        let record = clock_in(None, 9, today(), event, Some("Clock-in by supervisor: lead"), now).unwrap();
        assert_eq!(record.clock_in.status, EventStatus::Approved);
        assert_eq!(record.status, RecordStatus::Pending);

        let out = AttendanceSubEvent::by_supervisor(location(), now, now);
        let record = clock_out(Some(record), out, Some("Clock-out by supervisor: lead"), now).unwrap();
        assert_eq!(record.status, RecordStatus::Approved);
        assert_eq!(
            record.remarks.as_deref(),
            Some("Clock-in by supervisor: lead\nClock-out by supervisor: lead")
        );
    }

    #[test]
    fn approval_needs_no_remarks() {
        assert!(Decision::new(Verdict::Approved, None, None).is_ok());
        assert!(Decision::new(Verdict::Approved, Some("  ".into()), None).is_ok());
    }

    proptest! {
        #[test]
        fn blank_rejection_remarks_are_always_refused(
            blank in "[ \t\r\n]{0,12}",
            target in prop_oneof![Just(None), Just(Some(EventType::ClockIn)), Just(Some(EventType::ClockOut))],
        ) {
            let result = Decision::new(Verdict::Rejected, Some(blank), target);
            prop_assert!(matches!(result, Err(AppError::InvalidInput(_))));
            prop_assert!(matches!(Decision::new(Verdict::Rejected, None, target), Err(AppError::InvalidInput(_))));
        }
    }
}
