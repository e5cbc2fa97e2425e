use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::role::{Role, Scope};

/// Caller identity placed in request extensions by `auth_middleware`
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized("Not authenticated")),
        )
    }
}

impl AuthUser {
    /// Employee id for self-service endpoints
    pub fn require_employee_id(&self) -> Result<u64, AppError> {
        self.employee_id
            .ok_or_else(|| AppError::forbidden("No employee profile linked to this account"))
    }

    /// Employee id of a reviewer; config groups and supervised lists hang off it
    pub fn require_supervisor(&self) -> Result<u64, AppError> {
        match self.role {
            Role::Admin | Role::Supervisor => self.require_employee_id(),
            Role::Employee => Err(AppError::forbidden("Supervisor access required")),
        }
    }

    /// Employees this caller may review
    pub fn scope(&self) -> Result<Scope, AppError> {
        match self.role {
            Role::Admin => Ok(Scope::All),
            Role::Supervisor => self.require_employee_id().map(Scope::SupervisedBy),
            Role::Employee => Err(AppError::forbidden("Supervisor access required")),
        }
    }
}
