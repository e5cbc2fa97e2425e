use crate::api::admin_attendance::{
    AdminAttendanceItem, AdminAttendanceListResponse, BulkDecisionRequest, BulkDecisionResponse, BulkItemResult,
    DecisionRequest, SupervisorClockRequest,
};
use crate::api::attendance::{AttendanceListResponse, ClockRequest, ClockResponse};
use crate::api::config::{AdminConfigResponse, EmployeeOverrideRequest};
use crate::api::employee::{EmployeeDetailsResponse, MonthlyStats};
use crate::api::selfie::{RegisterSelfieRequest, RegisterSelfieResponse, SelfieStatus, UploadUrlRequest};
use crate::model::attendance::{
    AttendanceRecord, AttendanceSubEvent, EventStatus, EventType, LivenessCheck, Location, RecordStatus,
};
use crate::model::attendance_config::{AttendanceConfig, GeoFence, OverrideSettings, WorkingHours};
use crate::model::employee::{Employee, EmployeeSummary};
use crate::model::role::Role;
use crate::models::{LoginReqDto, LoginResponse, LoginUser};
use crate::rules::lifecycle::Verdict;
use crate::services::storage::SignedUrl;
use crate::utils::db_utils::Pagination;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Admin API",
        version = "1.0.0",
        description = r#"
## Employee Attendance Administration

Employees clock in and out with their location and a selfie; supervisors
review each clock-in and clock-out and approve or reject it.

### Key Features
- **Self-service attendance**
  - Clock in / clock out gated by geofences, working hours and face comparison
  - Daily record and paginated history
- **Supervisor dashboard**
  - Review, approve or reject individual events or whole records
  - Bulk decisions and supervisor-initiated clock events
- **Configuration**
  - Allowed locations, working hours with flexible margin, selfie and remote-work policy
  - Per-employee overrides

### Security
Protected endpoints take a **JWT Bearer** token from `/auth/login`.
Logging in again or logging out revokes earlier tokens.

### Response Format
- JSON bodies; errors are `{"error": "<message>"}`
- Pagination supported for list endpoints
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::logout,

        crate::api::attendance::clock,
        crate::api::attendance::today,
        crate::api::attendance::history,

        crate::api::admin_attendance::list,
        crate::api::admin_attendance::decide,
        crate::api::admin_attendance::bulk_decide,
        crate::api::admin_attendance::supervisor_clock,

        crate::api::config::get_admin_config,
        crate::api::config::put_admin_config,
        crate::api::config::put_employee_override,
        crate::api::config::get_employee_config,

        crate::api::employee::details,
        crate::api::employee::supervised,

        crate::api::selfie::register,
        crate::api::selfie::status,
        crate::api::selfie::upload_url,
        crate::api::selfie::download_url
    ),
    components(
        schemas(
            LoginReqDto,
            LoginResponse,
            LoginUser,
            Role,
            Location,
            EventType,
            EventStatus,
            RecordStatus,
            LivenessCheck,
            AttendanceSubEvent,
            AttendanceRecord,
            ClockRequest,
            ClockResponse,
            AttendanceListResponse,
            Pagination,
            Verdict,
            DecisionRequest,
            BulkDecisionRequest,
            BulkItemResult,
            BulkDecisionResponse,
            SupervisorClockRequest,
            AdminAttendanceItem,
            AdminAttendanceListResponse,
            GeoFence,
            WorkingHours,
            AttendanceConfig,
            OverrideSettings,
            AdminConfigResponse,
            EmployeeOverrideRequest,
            Employee,
            EmployeeSummary,
            MonthlyStats,
            EmployeeDetailsResponse,
            RegisterSelfieRequest,
            RegisterSelfieResponse,
            SelfieStatus,
            UploadUrlRequest,
            SignedUrl
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login and token revocation"),
        (name = "Attendance", description = "Employee clock-in / clock-out"),
        (name = "Admin Attendance", description = "Supervisor review of attendance"),
        (name = "Config", description = "Attendance configuration and overrides"),
        (name = "Employee", description = "Employee profile and supervised employees"),
        (name = "Selfie", description = "Reference selfie and signed storage URLs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
