use tracing::info;

use super::{DataverseService, ServiceError};
use crate::contracts::{
    AuthorContent, Contractor, NewAuthorContent, NewContractor, NewPaymentScheme, PaymentScheme,
};
use crate::ids::{ContentId, ContractId, ContractorId, PaymentSchemeId, StaffId};
use crate::staff::{
    ContractManagerAssignment, Department, NewDepartment, NewStaffMember, StaffMember,
};
use crate::store::DatasetRepository;

impl<R> DataverseService<R>
where
    R: DatasetRepository + 'static,
{
    pub fn register_contractor(&self, new: NewContractor) -> Result<Contractor, ServiceError> {
        let now = self.now();
        let contractor = self.write(|data| data.insert_contractor(new, now))?;
        info!(contractor = %contractor.id, kind = contractor.kind.label(), "contractor registered");
        Ok(contractor)
    }

    pub fn contractors(&self) -> Result<Vec<Contractor>, ServiceError> {
        self.read(|data| data.contractors().cloned().collect())
    }

    pub fn contractor(&self, id: ContractorId) -> Result<Contractor, ServiceError> {
        Ok(self.read(|data| data.contractor(id).cloned())??)
    }

    pub fn delete_contractor(&self, id: ContractorId) -> Result<Contractor, ServiceError> {
        let removed = self.write(|data| data.delete_contractor(id))?;
        info!(contractor = %id, "contractor deleted");
        Ok(removed)
    }

    pub fn create_payment_scheme(
        &self,
        new: NewPaymentScheme,
    ) -> Result<PaymentScheme, ServiceError> {
        let scheme = self.write(|data| data.insert_payment_scheme(new))?;
        info!(scheme = %scheme.id, name = %scheme.name, "payment scheme created");
        Ok(scheme)
    }

    pub fn payment_schemes(&self) -> Result<Vec<PaymentScheme>, ServiceError> {
        self.read(|data| data.payment_schemes().cloned().collect())
    }

    pub fn delete_payment_scheme(
        &self,
        id: PaymentSchemeId,
    ) -> Result<PaymentScheme, ServiceError> {
        let removed = self.write(|data| data.delete_payment_scheme(id))?;
        info!(scheme = %id, "payment scheme deleted");
        Ok(removed)
    }

    pub fn create_content(&self, new: NewAuthorContent) -> Result<AuthorContent, ServiceError> {
        let now = self.now();
        let content = self.write(|data| data.insert_content(new, now))?;
        info!(content = %content.id, title = %content.title, "author content created");
        Ok(content)
    }

    pub fn contents(&self) -> Result<Vec<AuthorContent>, ServiceError> {
        self.read(|data| data.contents().cloned().collect())
    }

    pub fn delete_content(&self, id: ContentId) -> Result<AuthorContent, ServiceError> {
        let removed = self.write(|data| data.delete_content(id))?;
        info!(content = %id, "author content deleted");
        Ok(removed)
    }

    pub fn register_staff(&self, new: NewStaffMember) -> Result<StaffMember, ServiceError> {
        let now = self.now();
        let member = self.write(|data| data.insert_staff_member(new, now))?;
        info!(staff = %member.id, username = %member.username, "staff member registered");
        Ok(member)
    }

    pub fn staff(&self) -> Result<Vec<StaffMember>, ServiceError> {
        self.read(|data| data.staff().cloned().collect())
    }

    pub fn create_department(&self, new: NewDepartment) -> Result<Department, ServiceError> {
        let department = self.write(|data| data.insert_department(new))?;
        info!(department = %department.id, director = %department.director, "department created");
        Ok(department)
    }

    pub fn departments(&self) -> Result<Vec<Department>, ServiceError> {
        self.read(|data| data.departments().cloned().collect())
    }

    pub fn assign_manager(
        &self,
        contract: ContractId,
        manager: StaffId,
    ) -> Result<ContractManagerAssignment, ServiceError> {
        let now = self.now();
        let assignment = self.write(|data| data.assign_manager(contract, manager, now))?;
        info!(%contract, %manager, "manager assigned");
        Ok(assignment)
    }

    pub fn managers(
        &self,
        contract: ContractId,
    ) -> Result<Vec<ContractManagerAssignment>, ServiceError> {
        Ok(self.read(|data| {
            data.contract(contract)
                .map(|_| data.managers_of(contract).cloned().collect())
        })??)
    }
}
