use std::io::Read;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use super::{DataverseService, ServiceError};
use crate::contracts::{
    AccrualFilter, AccrualPolicy, Contract, ContractFilter, ContractTerms, NewAccrual, NewContract,
};
use crate::ids::{AccrualId, ContractId};
use crate::import::{AccrualImporter, LedgerEntry};
use crate::store::{DataError, Dataset, DatasetRepository};
use crate::views::{AccrualView, ContractView};

impl<R> DataverseService<R>
where
    R: DatasetRepository + 'static,
{
    pub fn create_contract(&self, new: NewContract) -> Result<ContractView, ServiceError> {
        let now = self.now();
        let view = self.write(|data| {
            let contract = data.insert_contract(new, now)?;
            Ok(ContractView::build(&contract, data, now.date_naive()))
        })?;
        info!(
            contract = %view.id,
            number = %view.contract_number,
            status = view.status_label,
            "contract created"
        );
        Ok(view)
    }

    pub fn contract(
        &self,
        id: ContractId,
        at: Option<DateTime<Utc>>,
    ) -> Result<ContractView, ServiceError> {
        let today = self.instant(at).date_naive();
        Ok(self.read(|data| {
            data.contract(id)
                .map(|contract| ContractView::build(contract, data, today))
        })??)
    }

    pub fn contracts(
        &self,
        filter: &ContractFilter,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<ContractView>, ServiceError> {
        let now = self.instant(at);
        self.read(|data| {
            filter
                .apply(data, &self.policy, now)
                .into_iter()
                .map(|contract| ContractView::build(contract, data, now.date_naive()))
                .collect()
        })
    }

    pub fn delete_contract(&self, id: ContractId) -> Result<Contract, ServiceError> {
        let removed = self.write(|data| data.delete_contract(id))?;
        info!(contract = %id, number = %removed.contract_number, "contract deleted");
        Ok(removed)
    }

    /// Attach the presenter or author specialization to a contract.
    pub fn attach_terms(
        &self,
        id: ContractId,
        terms: ContractTerms,
    ) -> Result<ContractView, ServiceError> {
        let today = self.now().date_naive();
        let view = self.write(|data| {
            let contract = data.set_contract_terms(id, terms)?;
            Ok(ContractView::build(&contract, data, today))
        })?;
        info!(contract = %id, kind = ?view.kind, "contract terms attached");
        Ok(view)
    }

    /// Record that `replacement` supersedes `id`; returns the superseded contract.
    pub fn supersede(
        &self,
        id: ContractId,
        replacement: ContractId,
    ) -> Result<ContractView, ServiceError> {
        let today = self.now().date_naive();
        let view = self.write(|data| {
            let contract = data.supersede(id, replacement)?;
            Ok(ContractView::build(&contract, data, today))
        })?;
        info!(contract = %id, %replacement, "contract superseded");
        Ok(view)
    }

    /// Terminate a contract on `on`, or today when no date is given.
    pub fn terminate(
        &self,
        id: ContractId,
        on: Option<NaiveDate>,
    ) -> Result<ContractView, ServiceError> {
        let today = self.now().date_naive();
        let on = on.unwrap_or(today);
        let view = self.write(|data| {
            let contract = data.terminate_contract(id, on)?;
            Ok(ContractView::build(&contract, data, today))
        })?;
        info!(contract = %id, terminated_at = %on, "contract terminated");
        Ok(view)
    }

    pub fn set_accruals_allowed(
        &self,
        id: ContractId,
        allowed: bool,
    ) -> Result<ContractView, ServiceError> {
        let today = self.now().date_naive();
        let view = self.write(|data| {
            let contract = data.set_accruals_allowed(id, allowed)?;
            Ok(ContractView::build(&contract, data, today))
        })?;
        info!(contract = %id, allowed, status = view.status_label, "accrual intake changed");
        Ok(view)
    }

    /// Every version of the agreement `id` belongs to, oldest first.
    pub fn chain(
        &self,
        id: ContractId,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<ContractView>, ServiceError> {
        let today = self.instant(at).date_naive();
        Ok(self.read(|data| -> Result<Vec<ContractView>, DataError> {
            data.supersession_chain(id)?
                .into_iter()
                .map(|version| {
                    data.contract(version)
                        .map(|contract| ContractView::build(contract, data, today))
                })
                .collect()
        })??)
    }

    pub fn latest_version(
        &self,
        id: ContractId,
        at: Option<DateTime<Utc>>,
    ) -> Result<ContractView, ServiceError> {
        let today = self.instant(at).date_naive();
        Ok(self.read(|data| -> Result<ContractView, DataError> {
            let latest = data.latest_version(id)?;
            Ok(ContractView::build(data.contract(latest)?, data, today))
        })??)
    }

    pub fn record_accrual(&self, new: NewAccrual) -> Result<AccrualView, ServiceError> {
        let now = self.now();
        let view = self.write(|data| {
            let accrual = data.insert_accrual(new, now)?;
            Ok(AccrualView::build(&accrual, data, &self.policy, now))
        })?;
        info!(
            accrual = %view.id,
            contract = %view.contract,
            amount = %view.amount,
            "accrual recorded"
        );
        Ok(view)
    }

    pub fn accrual(
        &self,
        id: AccrualId,
        at: Option<DateTime<Utc>>,
    ) -> Result<AccrualView, ServiceError> {
        let now = self.instant(at);
        Ok(self.read(|data| {
            data.accrual(id)
                .map(|accrual| AccrualView::build(accrual, data, &self.policy, now))
        })??)
    }

    pub fn accruals(
        &self,
        filter: &AccrualFilter,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<AccrualView>, ServiceError> {
        let now = self.instant(at);
        self.read(|data| {
            filter
                .apply(data, &self.policy, now)
                .into_iter()
                .map(|accrual| AccrualView::build(accrual, data, &self.policy, now))
                .collect()
        })
    }

    /// Confirm an accrual at `at`, or now.
    pub fn confirm_accrual(
        &self,
        id: AccrualId,
        at: Option<DateTime<Utc>>,
    ) -> Result<AccrualView, ServiceError> {
        let now = self.now();
        let at = at.unwrap_or(now);
        let view = self.write(|data| {
            let accrual = data.confirm_accrual(id, at)?;
            Ok(AccrualView::build(&accrual, data, &self.policy, now))
        })?;
        info!(accrual = %id, confirmed_at = %at, "accrual confirmed");
        Ok(view)
    }

    /// Mark an accrual paid at `at`, or now.
    pub fn pay_accrual(
        &self,
        id: AccrualId,
        at: Option<DateTime<Utc>>,
    ) -> Result<AccrualView, ServiceError> {
        let now = self.now();
        let at = at.unwrap_or(now);
        let view = self.write(|data| {
            let accrual = data.pay_accrual(id, at)?;
            Ok(AccrualView::build(&accrual, data, &self.policy, now))
        })?;
        if view.confirmed_at.is_none() {
            warn!(accrual = %id, "accrual paid without confirmation");
        }
        info!(accrual = %id, paid_at = %at, "accrual paid");
        Ok(view)
    }

    /// Import an accounting ledger. Either every row is stored or none is.
    pub fn import_accruals<Rd: Read>(&self, reader: Rd) -> Result<Vec<AccrualView>, ServiceError> {
        let entries = AccrualImporter::from_reader(reader)?;
        let now = self.now();

        let views = self.repository.write(|data| {
            let mut views = Vec::with_capacity(entries.len());
            for entry in entries {
                let row = entry.row;
                let view = apply_ledger_entry(data, entry, &self.policy, now)
                    .map_err(|source| ServiceError::LedgerRow { row, source })?;
                views.push(view);
            }
            Ok::<_, ServiceError>(views)
        })?;

        info!(imported = views.len(), "accrual ledger imported");
        Ok(views)
    }
}

fn apply_ledger_entry(
    data: &mut Dataset,
    entry: LedgerEntry,
    policy: &AccrualPolicy,
    now: DateTime<Utc>,
) -> Result<AccrualView, DataError> {
    let contract = data.contract_by_number(entry.contract_number.trim())?.id;
    let mut accrual = data.insert_accrual(
        NewAccrual {
            contract,
            amount: entry.amount,
            formula_parameters: None,
            is_automated: true,
            comment: entry.comment,
        },
        now,
    )?;
    if let Some(at) = entry.confirmed_at {
        accrual = data.confirm_accrual(accrual.id, at)?;
    }
    if let Some(at) = entry.paid_at {
        accrual = data.pay_accrual(accrual.id, at)?;
    }
    Ok(AccrualView::build(&accrual, data, policy, now))
}
