use chrono::{DateTime, Utc};

use super::{require_text, DataError, Dataset};
use crate::ids::{ContractId, DepartmentId, StaffId};
use crate::staff::{
    ContractManagerAssignment, Department, NewDepartment, NewStaffMember, StaffMember,
};

impl Dataset {
    pub fn staff(&self) -> impl Iterator<Item = &StaffMember> {
        self.staff.values()
    }

    pub fn staff_member(&self, id: StaffId) -> Result<&StaffMember, DataError> {
        self.staff
            .get(&id)
            .ok_or_else(|| DataError::not_found("staff member", id.0))
    }

    pub fn department(&self, id: DepartmentId) -> Result<&Department, DataError> {
        self.departments
            .get(&id)
            .ok_or_else(|| DataError::not_found("department", id.0))
    }

    pub fn departments(&self) -> impl Iterator<Item = &Department> {
        self.departments.values()
    }

    pub fn insert_staff_member(
        &mut self,
        new: NewStaffMember,
        now: DateTime<Utc>,
    ) -> Result<StaffMember, DataError> {
        new.validate()?;
        if let Some(department) = new.department {
            self.department(department)?;
        }

        let username = new.username.trim().to_string();
        if self.staff.values().any(|member| member.username == username) {
            return Err(DataError::Duplicate {
                entity: "staff member",
                field: "username",
                value: username,
            });
        }

        let member = StaffMember {
            id: StaffId(self.next_id()),
            username,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
            role: new.role,
            department: new.department,
            is_active: true,
            created_at: now,
        };
        self.staff.insert(member.id, member.clone());
        Ok(member)
    }

    /// Create a department. A staff member directs at most one department.
    pub fn insert_department(&mut self, new: NewDepartment) -> Result<Department, DataError> {
        require_text("name", &new.name, 100)?;
        self.staff_member(new.director)?;

        if self
            .departments
            .values()
            .any(|department| department.director == new.director)
        {
            return Err(DataError::Duplicate {
                entity: "department",
                field: "director",
                value: new.director.to_string(),
            });
        }

        let department = Department {
            id: DepartmentId(self.next_id()),
            name: new.name.trim().to_string(),
            director: new.director,
        };
        self.departments.insert(department.id, department.clone());
        Ok(department)
    }

    pub fn managers_of(
        &self,
        contract: ContractId,
    ) -> impl Iterator<Item = &ContractManagerAssignment> {
        self.manager_assignments
            .iter()
            .filter(move |assignment| assignment.contract == contract)
    }

    pub fn assign_manager(
        &mut self,
        contract: ContractId,
        manager: StaffId,
        now: DateTime<Utc>,
    ) -> Result<ContractManagerAssignment, DataError> {
        let number = self.contract(contract)?.contract_number.clone();
        let username = self.staff_member(manager)?.username.clone();

        if self
            .managers_of(contract)
            .any(|assignment| assignment.manager == manager)
        {
            return Err(DataError::Duplicate {
                entity: "manager assignment",
                field: "manager",
                value: format!("{number}/{username}"),
            });
        }

        let assignment = ContractManagerAssignment {
            contract,
            manager,
            assigned_at: now,
        };
        self.manager_assignments.push(assignment.clone());
        Ok(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::staff::StaffRole;

    fn new_member(username: &str, role: StaffRole) -> NewStaffMember {
        NewStaffMember {
            username: username.to_string(),
            first_name: "Maria".to_string(),
            last_name: "Ivanova".to_string(),
            email: "maria@example.com".to_string(),
            phone: String::new(),
            role,
            department: None,
        }
    }

    #[test]
    fn usernames_are_unique() {
        let mut data = Dataset::default();
        data.insert_staff_member(new_member("mivanova", StaffRole::Manager), now())
            .expect("insert");
        assert!(matches!(
            data.insert_staff_member(new_member("mivanova", StaffRole::Director), now()),
            Err(DataError::Duplicate { field: "username", .. })
        ));
    }

    #[test]
    fn a_director_runs_one_department() {
        let mut data = Dataset::default();
        let director = data
            .insert_staff_member(new_member("boss", StaffRole::Director), now())
            .unwrap();
        data.insert_department(NewDepartment {
            name: "Education".to_string(),
            director: director.id,
        })
        .expect("department");

        assert!(data
            .insert_department(NewDepartment {
                name: "Finance".to_string(),
                director: director.id,
            })
            .is_err());
    }

    #[test]
    fn managers_are_assigned_once_per_contract() {
        let (mut data, scheme, ..) = seeded();
        let contract = data.insert_contract(new_contract("PR-1", scheme), now()).unwrap();
        let manager = data
            .insert_staff_member(new_member("mgr", StaffRole::Manager), now())
            .unwrap();

        data.assign_manager(contract.id, manager.id, now()).expect("assign");
        assert!(data.assign_manager(contract.id, manager.id, now()).is_err());
        assert_eq!(data.managers_of(contract.id).count(), 1);
    }
}
