use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::accruals::{Accrual, AccrualPolicy, AccrualStatus};
use super::domain::{Contract, ContractKind, Currency};
use super::status::{CompletionReason, ContractStatus};
use crate::ids::{ContractId, ContractorId, PaymentSchemeId};
use crate::store::Dataset;

/// Criteria for listing contracts. Unset fields do not filter; set fields
/// must all hold.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractFilter {
    #[serde(default)]
    pub status: Option<ContractStatus>,
    #[serde(default)]
    pub completion: Option<CompletionReason>,
    #[serde(default)]
    pub is_template: Option<bool>,
    #[serde(default)]
    pub kind: Option<ContractKind>,
    #[serde(default)]
    pub payment_scheme: Option<PaymentSchemeId>,
    #[serde(default)]
    pub currency: Option<Currency>,
    #[serde(default)]
    pub contractor: Option<ContractorId>,
    /// Validity window overlaps `[valid_between_start, valid_between_end]`.
    #[serde(default)]
    pub valid_between_start: Option<NaiveDate>,
    #[serde(default)]
    pub valid_between_end: Option<NaiveDate>,
    #[serde(default)]
    pub with_unpaid_accruals: Option<bool>,
    #[serde(default)]
    pub with_confirmed_accruals: Option<bool>,
    #[serde(default)]
    pub accrual_status: Option<AccrualStatus>,
    #[serde(default)]
    pub partially_executed: Option<bool>,
    #[serde(default)]
    pub expiring_within_days: Option<u32>,
}

impl ContractFilter {
    pub fn matches(
        &self,
        contract: &Contract,
        data: &Dataset,
        policy: &AccrualPolicy,
        now: DateTime<Utc>,
    ) -> bool {
        let today = now.date_naive();

        if self.status.is_some() || self.completion.is_some() {
            let standing = contract.standing(today);
            if self.status.is_some_and(|status| standing.status != status) {
                return false;
            }
            if self.completion.is_some() && standing.completion != self.completion {
                return false;
            }
        }
        if self
            .is_template
            .is_some_and(|flag| contract.is_template != flag)
        {
            return false;
        }
        if self.kind.is_some() && contract.kind() != self.kind {
            return false;
        }
        if self
            .payment_scheme
            .is_some_and(|scheme| contract.payment_scheme != scheme)
        {
            return false;
        }
        if self
            .currency
            .is_some_and(|currency| contract.currency != currency)
        {
            return false;
        }
        if self.contractor.is_some() && contract.contractor() != self.contractor {
            return false;
        }

        match (self.valid_between_start, self.valid_between_end) {
            (Some(start), Some(end)) if !contract.overlaps(start, end) => return false,
            (Some(start), None) if !contract.overlaps(start, NaiveDate::MAX) => return false,
            (None, Some(end)) if !contract.overlaps(NaiveDate::MIN, end) => return false,
            _ => {}
        }

        if let Some(days) = self.expiring_within_days {
            if !expires_within(contract, today, days) {
                return false;
            }
        }

        let needs_accruals = self.with_unpaid_accruals.is_some()
            || self.with_confirmed_accruals.is_some()
            || self.accrual_status.is_some()
            || self.partially_executed.is_some();
        if !needs_accruals {
            return true;
        }

        let accruals: Vec<&Accrual> = data.accruals_for(contract.id).collect();

        if let Some(flag) = self.with_unpaid_accruals {
            if accruals.iter().any(|accrual| accrual.paid_at.is_none()) != flag {
                return false;
            }
        }
        if let Some(flag) = self.with_confirmed_accruals {
            if accruals.iter().any(|accrual| accrual.confirmed_at.is_some()) != flag {
                return false;
            }
        }
        if let Some(status) = self.accrual_status {
            if !accruals
                .iter()
                .any(|accrual| policy.status(accrual, now) == status)
            {
                return false;
            }
        }
        if let Some(flag) = self.partially_executed {
            let executed = accruals
                .iter()
                .filter(|accrual| accrual.paid_at.is_some())
                .count();
            let partial = executed > 0 && executed < contract.obligation_count();
            if partial != flag {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(
        &self,
        data: &'a Dataset,
        policy: &AccrualPolicy,
        now: DateTime<Utc>,
    ) -> Vec<&'a Contract> {
        data.contracts()
            .filter(|contract| self.matches(contract, data, policy, now))
            .collect()
    }
}

/// In force today and ending within the next `days` days.
fn expires_within(contract: &Contract, today: NaiveDate, days: u32) -> bool {
    let horizon = today
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    let started = contract.valid_from.is_some_and(|from| from <= today);
    let ends_soon = contract
        .valid_until
        .is_some_and(|until| until >= today && until <= horizon);
    started && ends_soon
}

/// Criteria for listing accruals.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccrualFilter {
    #[serde(default)]
    pub status: Option<AccrualStatus>,
    #[serde(default)]
    pub contract: Option<ContractId>,
    #[serde(default)]
    pub contractor: Option<ContractorId>,
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Any of created/confirmed/paid falls inside `[from, to]`.
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl AccrualFilter {
    pub fn matches(
        &self,
        accrual: &Accrual,
        data: &Dataset,
        policy: &AccrualPolicy,
        now: DateTime<Utc>,
    ) -> bool {
        if self
            .status
            .is_some_and(|status| policy.status(accrual, now) != status)
        {
            return false;
        }
        if self
            .contract
            .is_some_and(|contract| accrual.contract != contract)
        {
            return false;
        }

        if self.contractor.is_some() || self.currency.is_some() {
            let Ok(contract) = data.contract(accrual.contract) else {
                return false;
            };
            if self.contractor.is_some() && contract.contractor() != self.contractor {
                return false;
            }
            if self
                .currency
                .is_some_and(|currency| contract.currency != currency)
            {
                return false;
            }
        }

        if self.from.is_some() || self.to.is_some() {
            let from = self.from.unwrap_or(DateTime::<Utc>::MIN_UTC);
            let to = self.to.unwrap_or(DateTime::<Utc>::MAX_UTC);
            if !accrual.touches(from, to) {
                return false;
            }
        }

        true
    }

    pub fn apply<'a>(
        &self,
        data: &'a Dataset,
        policy: &AccrualPolicy,
        now: DateTime<Utc>,
    ) -> Vec<&'a Accrual> {
        data.accruals()
            .filter(|accrual| self.matches(accrual, data, policy, now))
            .collect()
    }
}

/// Accrual counters for a single contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PaymentStats {
    pub total_accruals: usize,
    pub paid_accruals: usize,
    pub unpaid_accruals: usize,
    pub total_amount: Decimal,
}

impl PaymentStats {
    pub fn for_contract(data: &Dataset, contract: ContractId) -> Self {
        data.accruals_for(contract)
            .fold(Self::default(), |mut stats, accrual| {
                stats.total_accruals += 1;
                if accrual.paid_at.is_some() {
                    stats.paid_accruals += 1;
                } else {
                    stats.unpaid_accruals += 1;
                }
                stats.total_amount = stats.total_amount.saturating_add(accrual.amount);
                stats
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::accruals::NewAccrual;
    use crate::store::fixtures::{author_terms, date, new_contract, now, presenter_terms, seeded};
    use serde_json::json;

    struct Scenario {
        data: Dataset,
        presenter: ContractorId,
        active: ContractId,
        expiring: ContractId,
        author: ContractId,
        draft: ContractId,
    }

    fn accrual(contract: ContractId, cents: i64) -> NewAccrual {
        NewAccrual {
            contract,
            amount: Decimal::new(cents, 2),
            formula_parameters: None,
            is_automated: false,
            comment: None,
        }
    }

    fn scenario() -> Scenario {
        let (mut data, scheme, presenter, content) = seeded();

        let mut active = new_contract("PR-ACTIVE", scheme);
        active.terms = Some(presenter_terms(presenter));
        active.non_financial_terms = Some(json!(["run 12 sessions", "grade homework", "retro"]));
        let active = data.insert_contract(active, now()).unwrap();

        let mut expiring = new_contract("PR-EXPIRING", scheme);
        expiring.valid_until = Some(date(2025, 3, 5));
        expiring.currency = Currency::Eur;
        let expiring = data.insert_contract(expiring, now()).unwrap();

        let mut author = new_contract("AU-1", scheme);
        author.terms = Some(author_terms(presenter, content));
        author.valid_from = Some(date(2025, 4, 1));
        let author = data.insert_contract(author, now()).unwrap();

        let mut draft = new_contract("DRAFT", scheme);
        draft.signed_at = None;
        let draft = data.insert_contract(draft, now()).unwrap();

        let paid = data.insert_accrual(accrual(active.id, 120000), now()).unwrap();
        data.pay_accrual(paid.id, now()).unwrap();
        data.insert_accrual(accrual(active.id, 80000), now()).unwrap();

        let confirmed = data.insert_accrual(accrual(expiring.id, 5000), now()).unwrap();
        data.confirm_accrual(confirmed.id, now() - Duration::days(40))
            .unwrap();

        Scenario {
            data,
            presenter,
            active: active.id,
            expiring: expiring.id,
            author: author.id,
            draft: draft.id,
        }
    }

    fn ids(contracts: Vec<&Contract>) -> Vec<ContractId> {
        contracts.into_iter().map(|contract| contract.id).collect()
    }

    #[test]
    fn filters_by_derived_status() {
        let s = scenario();
        let policy = AccrualPolicy::default();

        let active = ContractFilter {
            status: Some(ContractStatus::Active),
            ..ContractFilter::default()
        };
        assert_eq!(ids(active.apply(&s.data, &policy, now())), vec![s.active, s.expiring]);

        let scheduled = ContractFilter {
            status: Some(ContractStatus::Scheduled),
            ..ContractFilter::default()
        };
        assert_eq!(ids(scheduled.apply(&s.data, &policy, now())), vec![s.author]);

        let drafts = ContractFilter {
            status: Some(ContractStatus::Draft),
            ..ContractFilter::default()
        };
        assert_eq!(ids(drafts.apply(&s.data, &policy, now())), vec![s.draft]);
    }

    #[test]
    fn filters_by_kind_contractor_and_currency() {
        let s = scenario();
        let policy = AccrualPolicy::default();

        let authors = ContractFilter {
            kind: Some(ContractKind::Author),
            ..ContractFilter::default()
        };
        assert_eq!(ids(authors.apply(&s.data, &policy, now())), vec![s.author]);

        let by_contractor = ContractFilter {
            contractor: Some(s.presenter),
            ..ContractFilter::default()
        };
        assert_eq!(
            ids(by_contractor.apply(&s.data, &policy, now())),
            vec![s.active, s.author]
        );

        let euros = ContractFilter {
            currency: Some(Currency::Eur),
            ..ContractFilter::default()
        };
        assert_eq!(ids(euros.apply(&s.data, &policy, now())), vec![s.expiring]);
    }

    #[test]
    fn accrual_based_filters() {
        let s = scenario();
        let policy = AccrualPolicy::default();

        let overdue = ContractFilter {
            accrual_status: Some(AccrualStatus::Overdue),
            ..ContractFilter::default()
        };
        assert_eq!(ids(overdue.apply(&s.data, &policy, now())), vec![s.expiring]);

        let unpaid = ContractFilter {
            with_unpaid_accruals: Some(true),
            ..ContractFilter::default()
        };
        assert_eq!(
            ids(unpaid.apply(&s.data, &policy, now())),
            vec![s.active, s.expiring]
        );

        let partial = ContractFilter {
            partially_executed: Some(true),
            ..ContractFilter::default()
        };
        assert_eq!(ids(partial.apply(&s.data, &policy, now())), vec![s.active]);
    }

    #[test]
    fn expiring_soon_requires_contract_in_force() {
        let s = scenario();
        let policy = AccrualPolicy::default();
        let filter = ContractFilter {
            expiring_within_days: Some(7),
            ..ContractFilter::default()
        };
        assert_eq!(ids(filter.apply(&s.data, &policy, now())), vec![s.expiring]);
    }

    #[test]
    fn expiring_horizon_past_the_calendar_is_unbounded() {
        let s = scenario();
        let policy = AccrualPolicy::default();
        let filter = ContractFilter {
            expiring_within_days: Some(u32::MAX),
            ..ContractFilter::default()
        };
        assert_eq!(
            ids(filter.apply(&s.data, &policy, now())),
            vec![s.active, s.expiring, s.draft]
        );
    }

    #[test]
    fn validity_overlap_with_range() {
        let s = scenario();
        let policy = AccrualPolicy::default();
        let filter = ContractFilter {
            valid_between_start: Some(date(2025, 3, 10)),
            valid_between_end: Some(date(2025, 3, 20)),
            ..ContractFilter::default()
        };
        assert_eq!(ids(filter.apply(&s.data, &policy, now())), vec![s.active, s.draft]);
    }

    #[test]
    fn accrual_filter_joins_through_contract() {
        let s = scenario();
        let policy = AccrualPolicy::default();

        let euros = AccrualFilter {
            currency: Some(Currency::Eur),
            ..AccrualFilter::default()
        };
        let matched = euros.apply(&s.data, &policy, now());
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].contract, s.expiring);

        let presenter = AccrualFilter {
            contractor: Some(s.presenter),
            status: Some(AccrualStatus::Pending),
            ..AccrualFilter::default()
        };
        assert_eq!(presenter.apply(&s.data, &policy, now()).len(), 1);

        let window = AccrualFilter {
            from: Some(now() - Duration::days(41)),
            to: Some(now() - Duration::days(39)),
            ..AccrualFilter::default()
        };
        assert_eq!(window.apply(&s.data, &policy, now()).len(), 1);
    }

    #[test]
    fn payment_stats_count_and_sum() {
        let s = scenario();
        let stats = PaymentStats::for_contract(&s.data, s.active);
        assert_eq!(
            stats,
            PaymentStats {
                total_accruals: 2,
                paid_accruals: 1,
                unpaid_accruals: 1,
                total_amount: Decimal::new(200000, 2),
            }
        );
    }
}
