use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ContentId, ContractId, ContractorId, PaymentSchemeId};
use crate::store::{require_text, DataError};

/// Legal form of a counterparty.
/// Upper bound for amounts, rates and commissions stored on any record.
pub fn money_limit() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractorKind {
    Individual,
    SoleProprietor,
    SelfEmployed,
    LegalEntity,
    NonResident,
}

impl ContractorKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Individual => "Individual",
            Self::SoleProprietor => "Sole Proprietor",
            Self::SelfEmployed => "Self-Employed",
            Self::LegalEntity => "Legal Entity",
            Self::NonResident => "Non-Resident",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contractor {
    pub id: ContractorId,
    pub name: String,
    pub kind: ContractorKind,
    pub inn: Option<String>,
    pub kpp: Option<String>,
    pub passport_data: Option<Value>,
    pub bank_details: Option<Value>,
    pub elba_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload accepted when registering a contractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContractor {
    pub name: String,
    pub kind: ContractorKind,
    #[serde(default)]
    pub inn: Option<String>,
    #[serde(default)]
    pub kpp: Option<String>,
    #[serde(default)]
    pub passport_data: Option<Value>,
    #[serde(default)]
    pub bank_details: Option<Value>,
    #[serde(default)]
    pub elba_id: Option<String>,
}

impl NewContractor {
    pub fn validate(&self) -> Result<(), DataError> {
        require_text("name", &self.name, 255)?;

        if let Some(inn) = &self.inn {
            let digits = inn.chars().all(|c| c.is_ascii_digit());
            if !digits || !(inn.len() == 10 || inn.len() == 12) {
                return Err(DataError::invalid("inn", "expected 10 or 12 digits"));
            }
        }

        if let Some(kpp) = &self.kpp {
            if kpp.len() != 9 || !kpp.chars().all(|c| c.is_ascii_digit()) {
                return Err(DataError::invalid("kpp", "expected 9 digits"));
            }
        }

        if let Some(elba_id) = &self.elba_id {
            require_text("elba_id", elba_id, 50)?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentScheme {
    pub id: PaymentSchemeId,
    pub name: String,
    pub description: String,
    pub parameters: Value,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPaymentScheme {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Value,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl NewPaymentScheme {
    pub fn validate(&self) -> Result<(), DataError> {
        require_text("name", &self.name, 50)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    Presentation,
    Video,
    Article,
}

/// Authored course material that author contracts and threads refer to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorContent {
    pub id: ContentId,
    pub title: String,
    pub description: String,
    pub format: ContentFormat,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuthorContent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub format: ContentFormat,
}

impl NewAuthorContent {
    pub fn validate(&self) -> Result<(), DataError> {
        require_text("title", &self.title, 255)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "RUB")]
    Rub,
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    pub const fn code(self) -> &'static str {
        match self {
            Self::Rub => "RUB",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSchedule {
    Weekly,
    Monthly,
    AfterFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenterRole {
    Lead,
    CoPresenter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommissionType {
    Fixed,
    PercentageRevenue,
    PercentageProfit,
    HourlyRate,
    Experimental,
    FixedPlusPercentage,
}

/// Terms of an hourly contract with a course presenter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenterHourlyTerms {
    pub presenter: ContractorId,
    pub role: PresenterRole,
    pub payment_schedule: PaymentSchedule,
    #[serde(default)]
    pub payment_day_of_week: Option<u8>,
    pub hours_worked: Decimal,
    #[serde(default)]
    pub hourly_rate: Option<Decimal>,
    #[serde(default)]
    pub tax_compensation: bool,
}

impl PresenterHourlyTerms {
    /// Amount earned for the hours logged so far, when a rate is agreed.
    pub fn earned_amount(&self) -> Option<Decimal> {
        self.hourly_rate
            .and_then(|rate| self.hours_worked.checked_mul(rate))
            .map(|amount| amount.round_dp(2))
    }

    fn validate(&self) -> Result<(), DataError> {
        if let Some(day) = self.payment_day_of_week {
            if !(1..=7).contains(&day) {
                return Err(DataError::invalid(
                    "payment_day_of_week",
                    "must be between 1 and 7",
                ));
            }
        }

        if self.hours_worked.is_sign_negative() || self.hours_worked >= Decimal::from(1000) {
            return Err(DataError::invalid(
                "hours_worked",
                "must be within 0..1000 hours",
            ));
        }
        if self.hours_worked.scale() > 2 {
            return Err(DataError::invalid(
                "hours_worked",
                "at most two decimal places",
            ));
        }

        match self.hourly_rate {
            Some(rate) if rate <= Decimal::ZERO => {
                Err(DataError::invalid("hourly_rate", "must be positive"))
            }
            Some(rate) if rate > money_limit() => Err(DataError::invalid(
                "hourly_rate",
                format!("must not exceed {}", money_limit()),
            )),
            _ => Ok(()),
        }
    }
}

/// Terms of an agreement with the author of course material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorTerms {
    pub author: ContractorId,
    pub content: ContentId,
    #[serde(default)]
    pub commission_type: Option<CommissionType>,
    #[serde(default)]
    pub commission_value: Option<Decimal>,
}

impl AuthorTerms {
    fn validate(&self) -> Result<(), DataError> {
        match (self.commission_type, self.commission_value) {
            (None, Some(_)) => Err(DataError::invalid(
                "commission_value",
                "requires a commission type",
            )),
            (_, Some(value)) if value.is_sign_negative() => Err(DataError::invalid(
                "commission_value",
                "must not be negative",
            )),
            (_, Some(value)) if value > money_limit() => Err(DataError::invalid(
                "commission_value",
                format!("must not exceed {}", money_limit()),
            )),
            _ => Ok(()),
        }
    }
}

/// The specialization a base contract carries. A contract has at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContractTerms {
    PresenterHourly(PresenterHourlyTerms),
    Author(AuthorTerms),
}

impl ContractTerms {
    pub const fn kind(&self) -> ContractKind {
        match self {
            Self::PresenterHourly(_) => ContractKind::PresenterHourly,
            Self::Author(_) => ContractKind::Author,
        }
    }

    /// The contractor bound by these terms.
    pub const fn contractor(&self) -> ContractorId {
        match self {
            Self::PresenterHourly(terms) => terms.presenter,
            Self::Author(terms) => terms.author,
        }
    }

    pub fn validate(&self) -> Result<(), DataError> {
        match self {
            Self::PresenterHourly(terms) => terms.validate(),
            Self::Author(terms) => terms.validate(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    PresenterHourly,
    Author,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    pub contract_number: String,
    pub currency: Currency,
    pub payment_scheme: PaymentSchemeId,
    pub comment: String,
    pub is_template: bool,
    pub allow_new_accruals: bool,
    pub non_financial_terms: Option<Value>,
    pub signed_at: Option<NaiveDate>,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub terminated_at: Option<NaiveDate>,
    pub replaced_by: Option<ContractId>,
    pub terms: Option<ContractTerms>,
    pub created_at: DateTime<Utc>,
}

impl Contract {
    pub fn kind(&self) -> Option<ContractKind> {
        self.terms.as_ref().map(ContractTerms::kind)
    }

    pub fn contractor(&self) -> Option<ContractorId> {
        self.terms.as_ref().map(ContractTerms::contractor)
    }

    /// Number of non-financial obligations recorded on the contract.
    pub fn obligation_count(&self) -> usize {
        match &self.non_financial_terms {
            Some(Value::Array(items)) => items.len(),
            Some(Value::Object(entries)) => entries.len(),
            Some(Value::Null) | None => 0,
            Some(_) => 1,
        }
    }

    /// Whether the validity window overlaps `[start, end]`. A missing end is open-ended.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        match self.valid_from {
            Some(from) => from <= end && self.valid_until.map_or(true, |until| until >= start),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContract {
    pub contract_number: String,
    pub currency: Currency,
    pub payment_scheme: PaymentSchemeId,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default = "default_true")]
    pub allow_new_accruals: bool,
    #[serde(default)]
    pub non_financial_terms: Option<Value>,
    #[serde(default)]
    pub signed_at: Option<NaiveDate>,
    #[serde(default)]
    pub valid_from: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub terms: Option<ContractTerms>,
}

impl NewContract {
    pub fn validate(&self) -> Result<(), DataError> {
        require_text("contract_number", &self.contract_number, 50)?;

        if let (Some(from), Some(until)) = (self.valid_from, self.valid_until) {
            if from > until {
                return Err(DataError::invalid(
                    "valid_until",
                    "must not precede valid_from",
                ));
            }
        }

        if let Some(terms) = &self.terms {
            terms.validate()?;
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contractor(inn: Option<&str>) -> NewContractor {
        NewContractor {
            name: "Anna Petrova".to_string(),
            kind: ContractorKind::SelfEmployed,
            inn: inn.map(str::to_string),
            kpp: None,
            passport_data: None,
            bank_details: None,
            elba_id: None,
        }
    }

    #[test]
    fn inn_must_have_ten_or_twelve_digits() {
        assert!(contractor(Some("7707083893")).validate().is_ok());
        assert!(contractor(Some("500100732259")).validate().is_ok());
        assert!(contractor(Some("12345")).validate().is_err());
        assert!(contractor(Some("77070838AB")).validate().is_err());
    }

    #[test]
    fn presenter_terms_reject_out_of_range_weekday() {
        let terms = ContractTerms::PresenterHourly(PresenterHourlyTerms {
            presenter: ContractorId(1),
            role: PresenterRole::Lead,
            payment_schedule: PaymentSchedule::Weekly,
            payment_day_of_week: Some(8),
            hours_worked: Decimal::new(1250, 2),
            hourly_rate: None,
            tax_compensation: false,
        });

        assert_eq!(
            terms.validate(),
            Err(DataError::invalid(
                "payment_day_of_week",
                "must be between 1 and 7"
            ))
        );
    }

    #[test]
    fn earned_amount_multiplies_hours_by_rate() {
        let terms = PresenterHourlyTerms {
            presenter: ContractorId(1),
            role: PresenterRole::CoPresenter,
            payment_schedule: PaymentSchedule::AfterFlow,
            payment_day_of_week: None,
            hours_worked: Decimal::new(1250, 2),
            hourly_rate: Some(Decimal::new(2000, 0)),
            tax_compensation: false,
        };

        assert_eq!(terms.earned_amount(), Some(Decimal::new(25000, 0)));
    }

    #[test]
    fn oversized_rates_are_rejected_and_never_overflow() {
        let mut terms = PresenterHourlyTerms {
            presenter: ContractorId(1),
            role: PresenterRole::Lead,
            payment_schedule: PaymentSchedule::Monthly,
            payment_day_of_week: None,
            hours_worked: Decimal::new(99999, 2),
            hourly_rate: Some(Decimal::MAX),
            tax_compensation: false,
        };

        assert_eq!(terms.earned_amount(), None);
        assert!(matches!(
            ContractTerms::PresenterHourly(terms.clone()).validate(),
            Err(DataError::Invalid { field: "hourly_rate", .. })
        ));

        terms.hourly_rate = Some(money_limit());
        assert!(ContractTerms::PresenterHourly(terms.clone()).validate().is_ok());
        assert!(terms.earned_amount().is_some());
    }

    #[test]
    fn commission_is_capped() {
        let terms = ContractTerms::Author(AuthorTerms {
            author: ContractorId(1),
            content: ContentId(2),
            commission_type: Some(CommissionType::Fixed),
            commission_value: Some(money_limit() + Decimal::ONE),
        });
        assert!(matches!(
            terms.validate(),
            Err(DataError::Invalid { field: "commission_value", .. })
        ));
    }

    #[test]
    fn obligation_count_reads_lists_and_maps() {
        let mut contract = Contract {
            id: ContractId(1),
            contract_number: "C-1".to_string(),
            currency: Currency::Rub,
            payment_scheme: PaymentSchemeId(1),
            comment: String::new(),
            is_template: false,
            allow_new_accruals: true,
            non_financial_terms: Some(json!(["deliver slides", "record video"])),
            signed_at: None,
            valid_from: None,
            valid_until: None,
            terminated_at: None,
            replaced_by: None,
            terms: None,
            created_at: Utc::now(),
        };
        assert_eq!(contract.obligation_count(), 2);

        contract.non_financial_terms = Some(json!({"slides": true}));
        assert_eq!(contract.obligation_count(), 1);

        contract.non_financial_terms = None;
        assert_eq!(contract.obligation_count(), 0);
    }

    #[test]
    fn currency_uses_iso_codes_on_the_wire() {
        let encoded = serde_json::to_string(&Currency::Eur).expect("serialize");
        assert_eq!(encoded, "\"EUR\"");
    }
}
