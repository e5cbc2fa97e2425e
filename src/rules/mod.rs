pub mod geofence;
pub mod lifecycle;
pub mod reconcile;
pub mod schedule;
