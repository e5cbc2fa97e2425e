use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reviews every employee's attendance
    Admin = 1,
    /// Reviews the employees whose `supervisor_id` is their own employee id
    Supervisor = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Supervisor),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// Which employees a reviewer may see and act on
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Scope {
    All,
    /// Employees whose `supervisor_id` is this employee id
    SupervisedBy(u64),
}

impl Scope {
    pub fn covers(self, supervisor_id: Option<u64>) -> bool {
        match self {
            Scope::All => true,
            Scope::SupervisedBy(id) => supervisor_id == Some(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Supervisor, Role::Employee] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(4), None);
    }

    #[test]
    fn supervisor_scope_covers_only_direct_reports() {
        assert!(Scope::SupervisedBy(4).covers(Some(4)));
        assert!(!Scope::SupervisedBy(4).covers(Some(5)));
        assert!(!Scope::SupervisedBy(4).covers(None));
        assert!(Scope::All.covers(None));
    }
}
