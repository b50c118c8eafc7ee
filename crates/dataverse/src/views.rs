//! Read models: records joined with their derived status, as served by the API.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::contracts::{
    Accrual, AccrualPolicy, AccrualStatus, CompletionReason, Contract, ContractKind,
    ContractStatus, ContractTerms, Currency, PaymentStats,
};
use crate::ids::{AccrualId, ContentId, ContractId, ContractorId, PaymentSchemeId, ThreadId};
use crate::store::Dataset;
use crate::threads::{EducationThread, ThreadStatus};

#[derive(Debug, Clone, Serialize)]
pub struct ContractView {
    pub id: ContractId,
    pub contract_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContractKind>,
    pub currency: Currency,
    pub payment_scheme: PaymentSchemeId,
    pub status: ContractStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor: Option<ContractorId>,
    pub is_template: bool,
    pub allow_new_accruals: bool,
    pub signed_at: Option<NaiveDate>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub terminated_at: Option<NaiveDate>,
    pub replaced_by: Option<ContractId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms: Option<ContractTerms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earned_amount: Option<Decimal>,
    pub payments: PaymentStats,
}

impl ContractView {
    pub fn build(contract: &Contract, data: &Dataset, today: NaiveDate) -> Self {
        let standing = contract.standing(today);
        let earned_amount = match &contract.terms {
            Some(ContractTerms::PresenterHourly(terms)) => terms.earned_amount(),
            _ => None,
        };

        Self {
            id: contract.id,
            contract_number: contract.contract_number.clone(),
            kind: contract.kind(),
            currency: contract.currency,
            payment_scheme: contract.payment_scheme,
            status: standing.status,
            status_label: standing.status.label(),
            completion: standing.completion,
            contractor: contract.contractor(),
            is_template: contract.is_template,
            allow_new_accruals: contract.allow_new_accruals,
            signed_at: contract.signed_at,
            valid_from: contract.valid_from,
            valid_until: contract.valid_until,
            terminated_at: contract.terminated_at,
            replaced_by: contract.replaced_by,
            terms: contract.terms.clone(),
            earned_amount,
            payments: PaymentStats::for_contract(data, contract.id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccrualView {
    pub id: AccrualId,
    pub contract: ContractId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    pub amount: Decimal,
    pub status: AccrualStatus,
    pub status_label: &'static str,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_automated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AccrualView {
    pub fn build(
        accrual: &Accrual,
        data: &Dataset,
        policy: &AccrualPolicy,
        now: DateTime<Utc>,
    ) -> Self {
        let contract = data.contract(accrual.contract).ok();
        let status = policy.status(accrual, now);

        Self {
            id: accrual.id,
            contract: accrual.contract,
            contract_number: contract.map(|contract| contract.contract_number.clone()),
            currency: contract.map(|contract| contract.currency),
            amount: accrual.amount,
            status,
            status_label: status.label(),
            confirmed_at: accrual.confirmed_at,
            paid_at: accrual.paid_at,
            is_automated: accrual.is_automated,
            comment: accrual.comment.clone(),
            created_at: accrual.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadView {
    pub id: ThreadId,
    pub article: String,
    pub author_content: ContentId,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_open_start: bool,
    pub is_open_end: bool,
    pub is_auto_generated: bool,
    pub status: ThreadStatus,
    pub status_label: &'static str,
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<i64>,
    pub contracts: Vec<ContractId>,
    pub created_at: DateTime<Utc>,
}

impl ThreadView {
    pub fn build(thread: &EducationThread, data: &Dataset, today: NaiveDate) -> Self {
        let status = thread.status(today);

        Self {
            id: thread.id,
            article: thread.article.clone(),
            author_content: thread.author_content,
            start_date: thread.start_date,
            end_date: thread.end_date,
            is_open_start: thread.is_open_start,
            is_open_end: thread.is_open_end,
            is_auto_generated: thread.is_auto_generated,
            status,
            status_label: status.label(),
            running: thread.runs_on(today),
            duration_days: thread.duration_days(),
            contracts: data
                .assignments_for_thread(thread.id)
                .map(|assignment| assignment.contract)
                .collect(),
            created_at: thread.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrencyTotal {
    pub currency: Currency,
    pub outstanding: Decimal,
    pub overdue: Decimal,
}

/// Portfolio snapshot: how many records sit in each derived status.
#[derive(Debug, Clone, Serialize)]
pub struct DataverseSummary {
    pub as_of: DateTime<Utc>,
    pub contracts: Vec<StatusCount>,
    pub accruals: Vec<StatusCount>,
    pub threads: Vec<StatusCount>,
    pub outstanding: Vec<CurrencyTotal>,
}

impl DataverseSummary {
    pub fn build(data: &Dataset, policy: &AccrualPolicy, now: DateTime<Utc>) -> Self {
        let today = now.date_naive();

        let contracts = ContractStatus::ordered()
            .into_iter()
            .map(|status| StatusCount {
                status: status.label(),
                count: data
                    .contracts()
                    .filter(|contract| contract.status(today) == status)
                    .count(),
            })
            .collect();

        let accruals = AccrualStatus::ordered()
            .into_iter()
            .map(|status| StatusCount {
                status: status.label(),
                count: data
                    .accruals()
                    .filter(|accrual| policy.status(accrual, now) == status)
                    .count(),
            })
            .collect();

        let threads = ThreadStatus::ordered()
            .into_iter()
            .map(|status| StatusCount {
                status: status.label(),
                count: data
                    .threads()
                    .filter(|thread| thread.status(today) == status)
                    .count(),
            })
            .collect();

        let mut totals: BTreeMap<Currency, (Decimal, Decimal)> = BTreeMap::new();
        for accrual in data.accruals() {
            let status = policy.status(accrual, now);
            if !status.is_outstanding() {
                continue;
            }
            let Ok(contract) = data.contract(accrual.contract) else {
                continue;
            };
            let entry = totals.entry(contract.currency).or_default();
            entry.0 = entry.0.saturating_add(accrual.amount);
            if status == AccrualStatus::Overdue {
                entry.1 = entry.1.saturating_add(accrual.amount);
            }
        }

        let outstanding = totals
            .into_iter()
            .map(|(currency, (outstanding, overdue))| CurrencyTotal {
                currency,
                outstanding,
                overdue,
            })
            .collect();

        Self {
            as_of: now,
            contracts,
            accruals,
            threads,
            outstanding,
        }
    }

    pub fn count(&self, family: &[StatusCount], status: &str) -> usize {
        family
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }
}
