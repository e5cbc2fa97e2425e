pub mod admin_attendance;
pub mod attendance;
pub mod config;
pub mod employee;
pub mod selfie;
