use crate::model::attendance::{EventStatus, RecordStatus};

/// Overall record status derived from the two sub-event statuses.
///
/// Matching statuses collapse to the shared value; an undecided clock-in
/// with no clock-out is still `pending`; anything else is `partial`.
pub fn reconcile(clock_in: EventStatus, clock_out: Option<EventStatus>) -> RecordStatus {
    match (clock_in, clock_out) {
        (a, Some(b)) if a == b => a.into(),
        (EventStatus::Pending, None) => RecordStatus::Pending,
        _ => RecordStatus::Partial,
    }
}
