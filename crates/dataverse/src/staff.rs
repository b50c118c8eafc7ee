//! Internal staff: who manages which contracts and who runs which department.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ContractId, DepartmentId, StaffId};
use crate::store::{require_text, DataError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Director,
    ChiefAccountant,
    Manager,
    Presenter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffMember {
    pub id: StaffId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub role: StaffRole,
    pub department: Option<DepartmentId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStaffMember {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: StaffRole,
    #[serde(default)]
    pub department: Option<DepartmentId>,
}

impl NewStaffMember {
    pub fn validate(&self) -> Result<(), DataError> {
        require_text("username", &self.username, 150)?;
        require_text("first_name", &self.first_name, 150)?;
        require_text("last_name", &self.last_name, 150)?;
        if !self.email.is_empty() && !self.email.contains('@') {
            return Err(DataError::invalid("email", "must contain '@'"));
        }
        if self.phone.chars().count() > 20 {
            return Err(DataError::invalid("phone", "must be at most 20 characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub director: StaffId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDepartment {
    pub name: String,
    pub director: StaffId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractManagerAssignment {
    pub contract: ContractId,
    pub manager: StaffId,
    pub assigned_at: DateTime<Utc>,
}
