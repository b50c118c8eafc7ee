//! Relational record store: the tables, their constraints, and the
//! repository abstraction that makes writes transactional.
//!
//! `Dataset` is a plain value. Every mutating method checks foreign keys and
//! uniqueness before touching a table, so a failed call leaves the dataset as
//! it was. Repositories layer copy-on-write transactions on top.

mod contracts;
mod repository;
mod staff;
mod threads;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contracts::domain::{
    AuthorContent, Contract, ContractTerms, Contractor, NewAuthorContent, NewContractor,
    NewPaymentScheme, PaymentScheme,
};
use crate::contracts::accruals::Accrual;
use crate::ids::{
    AccrualId, ContentId, ContractId, ContractorId, DepartmentId, PaymentSchemeId, StaffId,
    ThreadId,
};
use crate::staff::{ContractManagerAssignment, Department, StaffMember};
use crate::threads::domain::{EducationThread, ThreadContractAssignment};

pub use repository::{DatasetRepository, JsonFileRepository, MemoryRepository, RepositoryError};

/// Constraint violations raised by the store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },
    #[error("no contract numbered '{0}'")]
    UnknownContractNumber(String),
    #[error("{entity} with {field} '{value}' already exists")]
    Duplicate {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("{entity} {id} is still referenced by {referenced_by}")]
    Protected {
        entity: &'static str,
        id: u64,
        referenced_by: &'static str,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl DataError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl Into<u64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub(crate) fn require_text(field: &'static str, value: &str, max_len: usize) -> Result<(), DataError> {
    if value.trim().is_empty() {
        return Err(DataError::invalid(field, "must not be blank"));
    }
    if value.chars().count() > max_len {
        return Err(DataError::invalid(
            field,
            format!("must be at most {max_len} characters"),
        ));
    }
    Ok(())
}

/// Every table of the system plus the identifier sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    last_id: u64,
    contractors: BTreeMap<ContractorId, Contractor>,
    payment_schemes: BTreeMap<PaymentSchemeId, PaymentScheme>,
    contents: BTreeMap<ContentId, AuthorContent>,
    contracts: BTreeMap<ContractId, Contract>,
    accruals: BTreeMap<AccrualId, Accrual>,
    threads: BTreeMap<ThreadId, EducationThread>,
    thread_assignments: Vec<ThreadContractAssignment>,
    staff: BTreeMap<StaffId, StaffMember>,
    departments: BTreeMap<DepartmentId, Department>,
    manager_assignments: Vec<ContractManagerAssignment>,
}

impl Dataset {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    pub fn contractors(&self) -> impl Iterator<Item = &Contractor> {
        self.contractors.values()
    }

    pub fn contractor(&self, id: ContractorId) -> Result<&Contractor, DataError> {
        self.contractors
            .get(&id)
            .ok_or_else(|| DataError::not_found("contractor", id.0))
    }

    pub fn insert_contractor(
        &mut self,
        new: NewContractor,
        now: DateTime<Utc>,
    ) -> Result<Contractor, DataError> {
        new.validate()?;

        if let Some(inn) = &new.inn {
            if self
                .contractors
                .values()
                .any(|existing| existing.inn.as_deref() == Some(inn.as_str()))
            {
                return Err(DataError::Duplicate {
                    entity: "contractor",
                    field: "inn",
                    value: inn.clone(),
                });
            }
        }

        let contractor = Contractor {
            id: ContractorId(self.next_id()),
            name: new.name.trim().to_string(),
            kind: new.kind,
            inn: new.inn,
            kpp: new.kpp,
            passport_data: new.passport_data,
            bank_details: new.bank_details,
            elba_id: new.elba_id,
            created_at: now,
            updated_at: now,
        };
        self.contractors.insert(contractor.id, contractor.clone());
        Ok(contractor)
    }

    /// Remove a contractor no contract refers to.
    pub fn delete_contractor(&mut self, id: ContractorId) -> Result<Contractor, DataError> {
        self.contractor(id)?;
        if self
            .contracts
            .values()
            .any(|contract| contract.contractor() == Some(id))
        {
            return Err(DataError::Protected {
                entity: "contractor",
                id: id.0,
                referenced_by: "contracts",
            });
        }

        self.contractors
            .remove(&id)
            .ok_or_else(|| DataError::not_found("contractor", id.0))
    }

    pub fn payment_schemes(&self) -> impl Iterator<Item = &PaymentScheme> {
        self.payment_schemes.values()
    }

    pub fn payment_scheme(&self, id: PaymentSchemeId) -> Result<&PaymentScheme, DataError> {
        self.payment_schemes
            .get(&id)
            .ok_or_else(|| DataError::not_found("payment scheme", id.0))
    }

    pub fn insert_payment_scheme(
        &mut self,
        new: NewPaymentScheme,
    ) -> Result<PaymentScheme, DataError> {
        new.validate()?;

        let scheme = PaymentScheme {
            id: PaymentSchemeId(self.next_id()),
            name: new.name.trim().to_string(),
            description: new.description,
            parameters: new.parameters,
            is_active: new.is_active,
        };
        self.payment_schemes.insert(scheme.id, scheme.clone());
        Ok(scheme)
    }

    pub fn delete_payment_scheme(
        &mut self,
        id: PaymentSchemeId,
    ) -> Result<PaymentScheme, DataError> {
        self.payment_scheme(id)?;
        if self
            .contracts
            .values()
            .any(|contract| contract.payment_scheme == id)
        {
            return Err(DataError::Protected {
                entity: "payment scheme",
                id: id.0,
                referenced_by: "contracts",
            });
        }

        self.payment_schemes
            .remove(&id)
            .ok_or_else(|| DataError::not_found("payment scheme", id.0))
    }

    pub fn contents(&self) -> impl Iterator<Item = &AuthorContent> {
        self.contents.values()
    }

    pub fn content(&self, id: ContentId) -> Result<&AuthorContent, DataError> {
        self.contents
            .get(&id)
            .ok_or_else(|| DataError::not_found("author content", id.0))
    }

    pub fn insert_content(
        &mut self,
        new: NewAuthorContent,
        now: DateTime<Utc>,
    ) -> Result<AuthorContent, DataError> {
        new.validate()?;

        let content = AuthorContent {
            id: ContentId(self.next_id()),
            title: new.title.trim().to_string(),
            description: new.description,
            format: new.format,
            created_at: now,
            updated_at: now,
        };
        self.contents.insert(content.id, content.clone());
        Ok(content)
    }

    /// Remove author content that neither a contract nor a thread refers to.
    pub fn delete_content(&mut self, id: ContentId) -> Result<AuthorContent, DataError> {
        self.content(id)?;

        let referenced_by = if self.contracts.values().any(|contract| {
            matches!(&contract.terms, Some(ContractTerms::Author(terms)) if terms.content == id)
        }) {
            Some("contracts")
        } else if self.threads.values().any(|thread| thread.author_content == id) {
            Some("education threads")
        } else {
            None
        };
        if let Some(referenced_by) = referenced_by {
            return Err(DataError::Protected {
                entity: "author content",
                id: id.0,
                referenced_by,
            });
        }

        self.contents
            .remove(&id)
            .ok_or_else(|| DataError::not_found("author content", id.0))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::contracts::domain::{
        AuthorTerms, ContentFormat, ContractorKind, Currency, NewContract,
        PaymentSchedule, PresenterHourlyTerms, PresenterRole,
    };
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use serde_json::json;

    pub(crate) fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
            .single()
            .expect("valid instant")
    }

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    pub(crate) fn new_contractor(name: &str, inn: Option<&str>) -> NewContractor {
        NewContractor {
            name: name.to_string(),
            kind: ContractorKind::SelfEmployed,
            inn: inn.map(str::to_string),
            kpp: None,
            passport_data: None,
            bank_details: Some(json!({"bik": "044525225"})),
            elba_id: None,
        }
    }

    pub(crate) fn new_contract(number: &str, scheme: PaymentSchemeId) -> NewContract {
        NewContract {
            contract_number: number.to_string(),
            currency: Currency::Rub,
            payment_scheme: scheme,
            comment: String::new(),
            is_template: false,
            allow_new_accruals: true,
            non_financial_terms: None,
            signed_at: Some(date(2025, 1, 15)),
            valid_from: Some(date(2025, 2, 1)),
            valid_until: Some(date(2025, 12, 31)),
            terms: None,
        }
    }

    pub(crate) fn presenter_terms(presenter: ContractorId) -> ContractTerms {
        ContractTerms::PresenterHourly(PresenterHourlyTerms {
            presenter,
            role: PresenterRole::Lead,
            payment_schedule: PaymentSchedule::Monthly,
            payment_day_of_week: None,
            hours_worked: Decimal::new(1200, 2),
            hourly_rate: Some(Decimal::new(3000, 0)),
            tax_compensation: false,
        })
    }

    pub(crate) fn author_terms(author: ContractorId, content: ContentId) -> ContractTerms {
        ContractTerms::Author(AuthorTerms {
            author,
            content,
            commission_type: None,
            commission_value: None,
        })
    }

    /// A dataset holding one scheme, one contractor and one content item.
    pub(crate) fn seeded() -> (Dataset, PaymentSchemeId, ContractorId, ContentId) {
        let mut data = Dataset::default();
        let scheme = data
            .insert_payment_scheme(NewPaymentScheme {
                name: "Hourly".to_string(),
                description: "Paid per delivered hour".to_string(),
                parameters: json!({"rate": 3000}),
                is_active: true,
            })
            .expect("scheme");
        let contractor = data
            .insert_contractor(new_contractor("Ivan Sokolov", Some("7707083893")), now())
            .expect("contractor");
        let content = data
            .insert_content(
                NewAuthorContent {
                    title: "Data Analysis Bootcamp".to_string(),
                    description: String::new(),
                    format: ContentFormat::Video,
                },
                now(),
            )
            .expect("content");
        (data, scheme.id, contractor.id, content.id)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn identifiers_come_from_one_sequence() {
        let (mut data, scheme, contractor, content) = seeded();
        assert_eq!((scheme.0, contractor.0, content.0), (1, 2, 3));

        let next = data
            .insert_contractor(new_contractor("Olga Belova", None), now())
            .expect("insert");
        assert_eq!(next.id, ContractorId(4));
    }

    #[test]
    fn duplicate_inn_is_rejected() {
        let (mut data, ..) = seeded();
        let error = data
            .insert_contractor(new_contractor("Copy", Some("7707083893")), now())
            .expect_err("duplicate");

        assert_eq!(
            error,
            DataError::Duplicate {
                entity: "contractor",
                field: "inn",
                value: "7707083893".to_string(),
            }
        );
    }

    #[test]
    fn referenced_contractor_cannot_be_deleted() {
        let (mut data, scheme, contractor, _) = seeded();
        let mut new = new_contract("PR-1", scheme);
        new.terms = Some(presenter_terms(contractor));
        data.insert_contract(new, now()).expect("contract");

        assert!(matches!(
            data.delete_contractor(contractor),
            Err(DataError::Protected { .. })
        ));

        let loose = data
            .insert_contractor(new_contractor("Loose", None), now())
            .expect("insert");
        data.delete_contractor(loose.id).expect("delete");
        assert!(data.contractor(loose.id).is_err());
    }

    #[test]
    fn referenced_scheme_and_content_are_protected() {
        let (mut data, scheme, contractor, content) = seeded();
        let mut new = new_contract("AU-1", scheme);
        new.terms = Some(author_terms(contractor, content));
        let contract = data.insert_contract(new, now()).expect("contract");

        assert!(matches!(
            data.delete_payment_scheme(scheme),
            Err(DataError::Protected { referenced_by: "contracts", .. })
        ));
        assert!(matches!(
            data.delete_content(content),
            Err(DataError::Protected { referenced_by: "contracts", .. })
        ));

        data.delete_contract(contract.id).expect("delete contract");
        data.delete_content(content).expect("content is free");
        data.delete_payment_scheme(scheme).expect("scheme is free");
    }

    #[test]
    fn blank_names_are_invalid() {
        let mut data = Dataset::default();
        let error = data
            .insert_contractor(new_contractor("   ", None), now())
            .expect_err("blank");
        assert_eq!(error, DataError::invalid("name", "must not be blank"));
    }

    #[test]
    fn oversized_snapshot_amounts_saturate_totals() {
        use crate::contracts::{AccrualPolicy, NewAccrual, PaymentStats};
        use crate::views::DataverseSummary;
        use rust_decimal::Decimal;

        let (mut data, scheme, ..) = seeded();
        let contract = data
            .insert_contract(new_contract("PR-HUGE", scheme), now())
            .expect("contract");
        for _ in 0..2 {
            let accrual = data
                .insert_accrual(
                    NewAccrual {
                        contract: contract.id,
                        amount: Decimal::ONE,
                        formula_parameters: None,
                        is_automated: true,
                        comment: None,
                    },
                    now(),
                )
                .expect("accrual");
            // Snapshots loaded from disk skip input validation.
            if let Some(stored) = data.accruals.get_mut(&accrual.id) {
                stored.amount = Decimal::MAX;
            }
        }

        let stats = PaymentStats::for_contract(&data, contract.id);
        assert_eq!(stats.total_amount, Decimal::MAX);

        let summary = DataverseSummary::build(&data, &AccrualPolicy::default(), now());
        assert_eq!(summary.outstanding[0].outstanding, Decimal::MAX);
    }
}
