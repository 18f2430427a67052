use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    /// Roles allowed to manage other employees' records.
    pub fn is_manager(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Hr, Role::Employee, Role::System, Role::ApiUser] {
            assert_eq!(Role::from_id(role as u8), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
    }

    #[test]
    fn only_admin_and_hr_manage() {
        assert!(Role::Admin.is_manager());
        assert!(Role::Hr.is_manager());
        assert!(!Role::Employee.is_manager());
    }
}
