pub mod attendance;
pub mod attendance_config;
pub mod employee;
pub mod role;
pub mod user;
