use chrono::{DateTime, NaiveDate, Utc};

use super::{DataError, Dataset};
use crate::contracts::accruals::{Accrual, NewAccrual};
use crate::contracts::domain::{Contract, ContractTerms, NewContract};
use crate::ids::{AccrualId, ContractId};

impl Dataset {
    pub fn contracts(&self) -> impl Iterator<Item = &Contract> {
        self.contracts.values()
    }

    pub fn contract(&self, id: ContractId) -> Result<&Contract, DataError> {
        self.contracts
            .get(&id)
            .ok_or_else(|| DataError::not_found("contract", id.0))
    }

    fn contract_mut(&mut self, id: ContractId) -> Result<&mut Contract, DataError> {
        self.contracts
            .get_mut(&id)
            .ok_or_else(|| DataError::not_found("contract", id.0))
    }

    pub fn contract_by_number(&self, number: &str) -> Result<&Contract, DataError> {
        self.contracts
            .values()
            .find(|contract| contract.contract_number == number)
            .ok_or_else(|| DataError::UnknownContractNumber(number.to_string()))
    }

    pub fn insert_contract(
        &mut self,
        new: NewContract,
        now: DateTime<Utc>,
    ) -> Result<Contract, DataError> {
        new.validate()?;

        let scheme = self.payment_scheme(new.payment_scheme)?;
        if !scheme.is_active {
            return Err(DataError::invalid(
                "payment_scheme",
                format!("scheme '{}' is not active", scheme.name),
            ));
        }

        let number = new.contract_number.trim().to_string();
        if self.contract_by_number(&number).is_ok() {
            return Err(DataError::Duplicate {
                entity: "contract",
                field: "contract_number",
                value: number,
            });
        }

        if let Some(terms) = &new.terms {
            self.check_terms_references(terms)?;
        }

        let contract = Contract {
            id: ContractId(self.next_id()),
            contract_number: number,
            currency: new.currency,
            payment_scheme: new.payment_scheme,
            comment: new.comment,
            is_template: new.is_template,
            allow_new_accruals: new.allow_new_accruals,
            non_financial_terms: new.non_financial_terms,
            signed_at: new.signed_at,
            valid_from: new.valid_from,
            valid_until: new.valid_until,
            terminated_at: None,
            replaced_by: None,
            terms: new.terms,
            created_at: now,
        };
        self.contracts.insert(contract.id, contract.clone());
        Ok(contract)
    }

    fn check_terms_references(&self, terms: &ContractTerms) -> Result<(), DataError> {
        self.contractor(terms.contractor())?;
        if let ContractTerms::Author(author) = terms {
            self.content(author.content)?;
        }
        Ok(())
    }

    /// Attach the specialization of a contract. The link is one-to-one and set once.
    pub fn set_contract_terms(
        &mut self,
        id: ContractId,
        terms: ContractTerms,
    ) -> Result<Contract, DataError> {
        terms.validate()?;
        self.check_terms_references(&terms)?;

        let contract = self.contract_mut(id)?;
        if contract.terms.is_some() {
            return Err(DataError::Conflict(format!(
                "contract {} already carries its terms",
                contract.contract_number
            )));
        }
        contract.terms = Some(terms);
        Ok(contract.clone())
    }

    /// Mark `old` as replaced by `new`, keeping the supersession chain linear.
    pub fn supersede(&mut self, old: ContractId, new: ContractId) -> Result<Contract, DataError> {
        if old == new {
            return Err(DataError::Conflict(
                "a contract cannot supersede itself".to_string(),
            ));
        }

        let replacement = self.contract(new)?;
        let previous = self.contract(old)?;
        if let Some(current) = previous.replaced_by {
            return Err(DataError::Conflict(format!(
                "contract {} is already replaced by contract {}",
                previous.contract_number, current
            )));
        }
        if let Some(predecessor) = self.predecessor(new) {
            return Err(DataError::Conflict(format!(
                "contract {} already replaces contract {}",
                replacement.contract_number, predecessor
            )));
        }
        if self.supersession_chain(new)?.contains(&old) {
            return Err(DataError::Conflict(
                "supersession would form a cycle".to_string(),
            ));
        }

        let previous = self.contract_mut(old)?;
        previous.replaced_by = Some(new);
        Ok(previous.clone())
    }

    /// The contract that `id` replaced, if any.
    pub fn predecessor(&self, id: ContractId) -> Option<ContractId> {
        self.contracts
            .values()
            .find(|contract| contract.replaced_by == Some(id))
            .map(|contract| contract.id)
    }

    /// Every version of the agreement `id` belongs to, oldest first.
    pub fn supersession_chain(&self, id: ContractId) -> Result<Vec<ContractId>, DataError> {
        self.contract(id)?;

        let mut chain = vec![id];
        let mut cursor = id;
        while let Some(previous) = self.predecessor(cursor) {
            if chain.contains(&previous) {
                break;
            }
            chain.insert(0, previous);
            cursor = previous;
        }

        let mut cursor = self.contract(id)?.replaced_by;
        while let Some(next) = cursor {
            if chain.contains(&next) {
                break;
            }
            chain.push(next);
            cursor = self.contract(next)?.replaced_by;
        }

        Ok(chain)
    }

    /// The newest version in the chain containing `id`.
    pub fn latest_version(&self, id: ContractId) -> Result<ContractId, DataError> {
        let chain = self.supersession_chain(id)?;
        Ok(*chain.last().unwrap_or(&id))
    }

    pub fn terminate_contract(
        &mut self,
        id: ContractId,
        on: NaiveDate,
    ) -> Result<Contract, DataError> {
        let contract = self.contract_mut(id)?;
        if let Some(existing) = contract.terminated_at {
            return Err(DataError::Conflict(format!(
                "contract {} was already terminated on {}",
                contract.contract_number, existing
            )));
        }
        if contract.valid_from.is_some_and(|from| on < from) {
            return Err(DataError::invalid(
                "terminated_at",
                "must not precede valid_from",
            ));
        }
        contract.terminated_at = Some(on);
        Ok(contract.clone())
    }

    pub fn set_accruals_allowed(
        &mut self,
        id: ContractId,
        allowed: bool,
    ) -> Result<Contract, DataError> {
        let contract = self.contract_mut(id)?;
        contract.allow_new_accruals = allowed;
        Ok(contract.clone())
    }

    /// Delete a contract together with its accruals and assignments.
    pub fn delete_contract(&mut self, id: ContractId) -> Result<Contract, DataError> {
        let removed = self
            .contracts
            .remove(&id)
            .ok_or_else(|| DataError::not_found("contract", id.0))?;

        self.accruals.retain(|_, accrual| accrual.contract != id);
        self.thread_assignments
            .retain(|assignment| assignment.contract != id);
        self.manager_assignments
            .retain(|assignment| assignment.contract != id);
        for contract in self.contracts.values_mut() {
            if contract.replaced_by == Some(id) {
                contract.replaced_by = None;
            }
        }

        Ok(removed)
    }

    pub fn accruals(&self) -> impl Iterator<Item = &Accrual> {
        self.accruals.values()
    }

    pub fn accrual(&self, id: AccrualId) -> Result<&Accrual, DataError> {
        self.accruals
            .get(&id)
            .ok_or_else(|| DataError::not_found("accrual", id.0))
    }

    fn accrual_mut(&mut self, id: AccrualId) -> Result<&mut Accrual, DataError> {
        self.accruals
            .get_mut(&id)
            .ok_or_else(|| DataError::not_found("accrual", id.0))
    }

    pub fn accruals_for(&self, contract: ContractId) -> impl Iterator<Item = &Accrual> {
        self.accruals
            .values()
            .filter(move |accrual| accrual.contract == contract)
    }

    pub fn insert_accrual(
        &mut self,
        new: NewAccrual,
        now: DateTime<Utc>,
    ) -> Result<Accrual, DataError> {
        new.validate()?;

        let contract = self.contract(new.contract)?;
        if contract.is_template {
            return Err(DataError::Conflict(format!(
                "contract {} is a template and cannot accrue",
                contract.contract_number
            )));
        }
        if !contract.allow_new_accruals {
            return Err(DataError::Conflict(format!(
                "contract {} does not accept new accruals",
                contract.contract_number
            )));
        }

        let accrual = Accrual {
            id: AccrualId(self.next_id()),
            contract: new.contract,
            amount: new.amount,
            formula_parameters: new.formula_parameters,
            confirmed_at: None,
            paid_at: None,
            is_automated: new.is_automated,
            comment: new.comment,
            created_at: now,
        };
        self.accruals.insert(accrual.id, accrual.clone());
        Ok(accrual)
    }

    pub fn confirm_accrual(
        &mut self,
        id: AccrualId,
        at: DateTime<Utc>,
    ) -> Result<Accrual, DataError> {
        let accrual = self.accrual_mut(id)?;
        accrual.confirm(at)?;
        Ok(accrual.clone())
    }

    pub fn pay_accrual(&mut self, id: AccrualId, at: DateTime<Utc>) -> Result<Accrual, DataError> {
        let accrual = self.accrual_mut(id)?;
        accrual.pay(at)?;
        Ok(accrual.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::contracts::status::ContractStatus;
    use rust_decimal::Decimal;

    fn accrual(contract: ContractId) -> NewAccrual {
        NewAccrual {
            contract,
            amount: Decimal::new(3600000, 2),
            formula_parameters: None,
            is_automated: false,
            comment: None,
        }
    }

    #[test]
    fn contract_numbers_are_unique() {
        let (mut data, scheme, ..) = seeded();
        data.insert_contract(new_contract("PR-1", scheme), now())
            .expect("first");
        let error = data
            .insert_contract(new_contract(" PR-1 ", scheme), now())
            .expect_err("duplicate");
        assert!(matches!(error, DataError::Duplicate { field: "contract_number", .. }));
    }

    #[test]
    fn missing_scheme_is_refused() {
        let (mut data, ..) = seeded();
        let error = data
            .insert_contract(new_contract("PR-1", crate::ids::PaymentSchemeId(99)), now())
            .expect_err("missing scheme");
        assert_eq!(error, DataError::not_found("payment scheme", 99u64));
    }

    #[test]
    fn terms_are_attached_once() {
        let (mut data, scheme, contractor, content) = seeded();
        let contract = data
            .insert_contract(new_contract("AU-1", scheme), now())
            .expect("contract");

        data.set_contract_terms(contract.id, author_terms(contractor, content))
            .expect("attach");
        let error = data
            .set_contract_terms(contract.id, presenter_terms(contractor))
            .expect_err("second specialization");
        assert!(matches!(error, DataError::Conflict(_)));
    }

    #[test]
    fn terms_must_reference_existing_records() {
        let (mut data, scheme, contractor, _) = seeded();
        let contract = data
            .insert_contract(new_contract("AU-1", scheme), now())
            .expect("contract");

        let error = data
            .set_contract_terms(
                contract.id,
                author_terms(contractor, crate::ids::ContentId(404)),
            )
            .expect_err("dangling content");
        assert_eq!(error, DataError::not_found("author content", 404u64));
    }

    #[test]
    fn supersession_forms_a_linear_chain() {
        let (mut data, scheme, ..) = seeded();
        let first = data.insert_contract(new_contract("V1", scheme), now()).unwrap();
        let second = data.insert_contract(new_contract("V2", scheme), now()).unwrap();
        let third = data.insert_contract(new_contract("V3", scheme), now()).unwrap();

        data.supersede(first.id, second.id).expect("v1 -> v2");
        data.supersede(second.id, third.id).expect("v2 -> v3");

        assert_eq!(
            data.supersession_chain(second.id).unwrap(),
            vec![first.id, second.id, third.id]
        );
        assert_eq!(data.latest_version(first.id).unwrap(), third.id);
        assert_eq!(
            data.contract(first.id).unwrap().status(date(2025, 6, 1)),
            ContractStatus::Completed
        );

        assert!(data.supersede(third.id, first.id).is_err(), "cycle");
        assert!(data.supersede(first.id, third.id).is_err(), "already replaced");
        assert!(data.supersede(third.id, third.id).is_err(), "self");

        let other = data.insert_contract(new_contract("X", scheme), now()).unwrap();
        assert!(
            data.supersede(other.id, second.id).is_err(),
            "second already replaces first"
        );
    }

    #[test]
    fn deleting_a_contract_cascades() {
        let (mut data, scheme, ..) = seeded();
        let first = data.insert_contract(new_contract("V1", scheme), now()).unwrap();
        let second = data.insert_contract(new_contract("V2", scheme), now()).unwrap();
        data.supersede(first.id, second.id).unwrap();
        data.insert_accrual(accrual(second.id), now()).unwrap();

        data.delete_contract(second.id).expect("delete");

        assert_eq!(data.accruals().count(), 0);
        assert_eq!(data.contract(first.id).unwrap().replaced_by, None);
    }

    #[test]
    fn accruals_respect_contract_flags() {
        let (mut data, scheme, ..) = seeded();
        let mut template = new_contract("TPL", scheme);
        template.is_template = true;
        let template = data.insert_contract(template, now()).unwrap();
        assert!(matches!(
            data.insert_accrual(accrual(template.id), now()),
            Err(DataError::Conflict(_))
        ));

        let contract = data.insert_contract(new_contract("PR-1", scheme), now()).unwrap();
        data.set_accruals_allowed(contract.id, false).unwrap();
        assert!(data.insert_accrual(accrual(contract.id), now()).is_err());

        data.set_accruals_allowed(contract.id, true).unwrap();
        let entry = data.insert_accrual(accrual(contract.id), now()).unwrap();
        assert_eq!(data.accruals_for(contract.id).count(), 1);
        assert_eq!(entry.created_at, now());
    }

    #[test]
    fn termination_is_recorded_once() {
        let (mut data, scheme, ..) = seeded();
        let contract = data.insert_contract(new_contract("PR-1", scheme), now()).unwrap();

        assert!(data.terminate_contract(contract.id, date(2025, 1, 1)).is_err());
        data.terminate_contract(contract.id, date(2025, 4, 1)).expect("terminate");
        assert!(matches!(
            data.terminate_contract(contract.id, date(2025, 5, 1)),
            Err(DataError::Conflict(_))
        ));
    }
}
