use sqlx::MySqlPool;

use crate::error::AppError;
use crate::model::employee::{Employee, EmployeeSummary};
use crate::model::role::Scope;

const EMPLOYEE_COLUMNS: &str = "id, employee_code, first_name, last_name, email, phone, job_title, \
     supervisor_id, hire_date, status";

pub async fn find(pool: &MySqlPool, id: u64) -> Result<Option<Employee>, AppError> {
    let sql = format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS);
    let employee = sqlx::query_as::<_, Employee>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(employee)
}

/// Active employees a reviewer may act on, ordered by name
pub async fn list_in_scope(pool: &MySqlPool, scope: Scope) -> Result<Vec<EmployeeSummary>, AppError> {
    let base = "SELECT id, employee_code, first_name, last_name FROM employees WHERE status = 'active'";

    let employees = match scope {
        Scope::All => {
            let sql = format!("{} ORDER BY first_name, last_name", base);
            sqlx::query_as::<_, EmployeeSummary>(&sql).fetch_all(pool).await?
        }
        Scope::SupervisedBy(supervisor_id) => {
            let sql = format!("{} AND supervisor_id = ? ORDER BY first_name, last_name", base);
            sqlx::query_as::<_, EmployeeSummary>(&sql)
                .bind(supervisor_id)
                .fetch_all(pool)
                .await?
        }
    };

    Ok(employees)
}

/// Loads an employee the reviewer is allowed to act on.
/// Out-of-scope employees are reported as missing.
pub async fn find_in_scope(pool: &MySqlPool, id: u64, scope: Scope) -> Result<Employee, AppError> {
    match find(pool, id).await? {
        Some(employee) if scope.covers(employee.supervisor_id) => Ok(employee),
        _ => Err(AppError::not_found("Employee not found or not under your supervision")),
    }
}
