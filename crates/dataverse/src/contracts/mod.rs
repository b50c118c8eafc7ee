//! Contractors, contracts and the accruals owed under them.

pub mod accruals;
pub mod domain;
pub mod queries;
pub mod status;

pub use accruals::{Accrual, AccrualPolicy, AccrualStatus, NewAccrual, DEFAULT_OVERDUE_DAYS};
pub use domain::{
    AuthorContent, AuthorTerms, CommissionType, ContentFormat, Contract, ContractKind,
    ContractTerms, Contractor, ContractorKind, Currency, NewAuthorContent, NewContract,
    NewContractor, NewPaymentScheme, PaymentSchedule, PaymentScheme, PresenterHourlyTerms,
    PresenterRole,
};
pub use queries::{AccrualFilter, ContractFilter, PaymentStats};
pub use status::{CompletionReason, ContractStanding, ContractStatus};
