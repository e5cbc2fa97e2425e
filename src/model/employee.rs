use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "job_title": "Field Engineer",
        "supervisor_id": 12,
        "hire_date": "2024-01-01",
        "status": "active"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "Field Engineer", nullable = true)]
    pub job_title: Option<String>,

    /// Employee id of the supervisor who reviews this employee's attendance
    #[schema(example = 12, nullable = true)]
    pub supervisor_id: Option<u64>,

    #[schema(
        example = "2024-01-01",
        value_type = String,
        format = "date"
    )]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,
}

impl Employee {
    /// Only active employees may record attendance.
    pub fn ensure_active(&self) -> Result<(), AppError> {
        if self.status != "active" {
            return Err(AppError::invalid("Employee is not active"));
        }
        Ok(())
    }
}

/// Compact row for supervisor pickers
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeSummary {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "John")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
}
