use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::Contract;

/// Lifecycle status of a contract, derived from its dates and links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Draft,
    Scheduled,
    Active,
    Suspended,
    Completed,
}

impl ContractStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Draft,
            Self::Scheduled,
            Self::Active,
            Self::Suspended,
            Self::Completed,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Scheduled => "scheduled",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Completed => "completed",
        }
    }
}

/// Why a contract counts as completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Terminated,
    Superseded,
    Expired,
}

impl CompletionReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Terminated => "terminated",
            Self::Superseded => "superseded",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContractStanding {
    pub status: ContractStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion: Option<CompletionReason>,
}

impl ContractStanding {
    const fn of(status: ContractStatus) -> Self {
        Self {
            status,
            completion: None,
        }
    }

    const fn completed(reason: CompletionReason) -> Self {
        Self {
            status: ContractStatus::Completed,
            completion: Some(reason),
        }
    }
}

impl Contract {
    /// Classify the contract as of `today`. The first matching rule wins.
    pub fn standing(&self, today: NaiveDate) -> ContractStanding {
        if self.terminated_at.is_some_and(|date| date <= today) {
            return ContractStanding::completed(CompletionReason::Terminated);
        }
        if self.replaced_by.is_some() {
            return ContractStanding::completed(CompletionReason::Superseded);
        }

        let valid_from = match (self.is_template, self.signed_at, self.valid_from) {
            (false, Some(_), Some(valid_from)) => valid_from,
            _ => return ContractStanding::of(ContractStatus::Draft),
        };

        if self.valid_until.is_some_and(|until| today > until) {
            return ContractStanding::completed(CompletionReason::Expired);
        }
        if today < valid_from {
            return ContractStanding::of(ContractStatus::Scheduled);
        }
        if !self.allow_new_accruals {
            return ContractStanding::of(ContractStatus::Suspended);
        }

        ContractStanding::of(ContractStatus::Active)
    }

    pub fn status(&self, today: NaiveDate) -> ContractStatus {
        self.standing(today).status
    }
}
