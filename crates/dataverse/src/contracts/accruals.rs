use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::money_limit;
use crate::ids::{AccrualId, ContractId};
use crate::store::DataError;

/// Default age after which a confirmed but unpaid accrual is overdue.
pub const DEFAULT_OVERDUE_DAYS: i64 = 30;

/// A financial entry owed under a contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accrual {
    pub id: AccrualId,
    pub contract: ContractId,
    pub amount: Decimal,
    pub formula_parameters: Option<Value>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_automated: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccrual {
    pub contract: ContractId,
    pub amount: Decimal,
    #[serde(default)]
    pub formula_parameters: Option<Value>,
    #[serde(default)]
    pub is_automated: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewAccrual {
    pub fn validate(&self) -> Result<(), DataError> {
        if self.amount <= Decimal::ZERO {
            return Err(DataError::invalid("amount", "must be positive"));
        }
        if self.amount.scale() > 2 {
            return Err(DataError::invalid("amount", "at most two decimal places"));
        }
        if self.amount > money_limit() {
            return Err(DataError::invalid(
                "amount",
                format!("must not exceed {}", money_limit()),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccrualStatus {
    Pending,
    Confirmed,
    Overdue,
    Paid,
}

impl AccrualStatus {
    pub const fn ordered() -> [Self; 4] {
        [Self::Pending, Self::Confirmed, Self::Overdue, Self::Paid]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Overdue => "overdue",
            Self::Paid => "paid",
        }
    }

    /// Whether money is still owed in this state.
    pub const fn is_outstanding(self) -> bool {
        !matches!(self, Self::Paid)
    }
}

/// Threshold settings for accrual classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrualPolicy {
    pub overdue_after: Duration,
}

impl AccrualPolicy {
    pub fn with_overdue_days(days: u32) -> Self {
        Self {
            overdue_after: Duration::days(i64::from(days)),
        }
    }

    /// Derive the status of `accrual` at instant `now`.
    pub fn status(&self, accrual: &Accrual, now: DateTime<Utc>) -> AccrualStatus {
        match (accrual.paid_at, accrual.confirmed_at) {
            (Some(_), _) => AccrualStatus::Paid,
            (None, Some(confirmed_at)) if now - confirmed_at > self.overdue_after => {
                AccrualStatus::Overdue
            }
            (None, Some(_)) => AccrualStatus::Confirmed,
            (None, None) => AccrualStatus::Pending,
        }
    }
}

impl Default for AccrualPolicy {
    fn default() -> Self {
        Self {
            overdue_after: Duration::days(DEFAULT_OVERDUE_DAYS),
        }
    }
}

impl Accrual {
    pub(crate) fn confirm(&mut self, at: DateTime<Utc>) -> Result<(), DataError> {
        if self.paid_at.is_some() {
            return Err(DataError::Conflict(format!(
                "accrual {} is already paid",
                self.id
            )));
        }
        if self.confirmed_at.is_some() {
            return Err(DataError::Conflict(format!(
                "accrual {} is already confirmed",
                self.id
            )));
        }
        self.confirmed_at = Some(at);
        Ok(())
    }

    pub(crate) fn pay(&mut self, at: DateTime<Utc>) -> Result<(), DataError> {
        if self.paid_at.is_some() {
            return Err(DataError::Conflict(format!(
                "accrual {} is already paid",
                self.id
            )));
        }
        if self.confirmed_at.is_some_and(|confirmed| at < confirmed) {
            return Err(DataError::invalid(
                "paid_at",
                "must not precede the confirmation",
            ));
        }
        self.paid_at = Some(at);
        Ok(())
    }

    /// Whether any of the lifecycle timestamps falls inside `[start, end]`.
    pub fn touches(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        [Some(self.created_at), self.confirmed_at, self.paid_at]
            .into_iter()
            .flatten()
            .any(|stamp| stamp >= start && stamp <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn accrual() -> Accrual {
        Accrual {
            id: AccrualId(3),
            contract: ContractId(1),
            amount: Decimal::new(1500000, 2),
            formula_parameters: None,
            confirmed_at: None,
            paid_at: None,
            is_automated: false,
            comment: None,
            created_at: instant(1),
        }
    }

    #[test]
    fn untouched_accrual_is_pending() {
        let policy = AccrualPolicy::default();
        assert_eq!(policy.status(&accrual(), instant(2)), AccrualStatus::Pending);
    }

    #[test]
    fn paid_wins_regardless_of_confirmation() {
        let policy = AccrualPolicy::default();
        let mut entry = accrual();
        entry.paid_at = Some(instant(5));
        assert_eq!(policy.status(&entry, instant(6)), AccrualStatus::Paid);

        entry.confirmed_at = Some(instant(1));
        let much_later = instant(1) + Duration::days(90);
        assert_eq!(policy.status(&entry, much_later), AccrualStatus::Paid);
    }

    #[test]
    fn confirmation_turns_overdue_strictly_after_threshold() {
        let policy = AccrualPolicy::default();
        let mut entry = accrual();
        entry.confirmed_at = Some(instant(1));

        let at_threshold = instant(1) + Duration::days(30);
        assert_eq!(policy.status(&entry, at_threshold), AccrualStatus::Confirmed);

        let past_threshold = at_threshold + Duration::seconds(1);
        assert_eq!(policy.status(&entry, past_threshold), AccrualStatus::Overdue);
    }

    #[test]
    fn custom_threshold_is_honoured() {
        let policy = AccrualPolicy::with_overdue_days(7);
        let mut entry = accrual();
        entry.confirmed_at = Some(instant(1));
        assert_eq!(policy.status(&entry, instant(9)), AccrualStatus::Overdue);
        assert_eq!(policy.status(&entry, instant(8)), AccrualStatus::Confirmed);
    }

    #[test]
    fn payment_cannot_precede_confirmation() {
        let mut entry = accrual();
        entry.confirm(instant(10)).expect("confirm");
        assert!(entry.pay(instant(9)).is_err());
        entry.pay(instant(11)).expect("pay");
        assert!(matches!(entry.confirm(instant(12)), Err(DataError::Conflict(_))));
    }

    #[test]
    fn new_accrual_requires_positive_cents() {
        let mut new = NewAccrual {
            contract: ContractId(1),
            amount: Decimal::ZERO,
            formula_parameters: None,
            is_automated: false,
            comment: None,
        };
        assert!(new.validate().is_err());

        new.amount = Decimal::new(10001, 3);
        assert!(new.validate().is_err());

        new.amount = Decimal::new(10050, 2);
        assert!(new.validate().is_ok());
    }

    #[test]
    fn new_accrual_amount_is_capped() {
        let mut new = NewAccrual {
            contract: ContractId(1),
            amount: Decimal::new(5, 0) * Decimal::new(10_000_000_000_000_000, 0),
            formula_parameters: None,
            is_automated: false,
            comment: None,
        };
        assert!(matches!(
            new.validate(),
            Err(DataError::Invalid { field: "amount", .. })
        ));

        new.amount = money_limit();
        assert!(new.validate().is_ok());
    }
}
