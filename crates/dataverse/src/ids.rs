use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

record_id!(
    /// Identifier of a contractor (presenter, author or any other counterparty).
    ContractorId
);
record_id!(PaymentSchemeId);
record_id!(ContentId);
record_id!(
    /// Identifier of a base contract record.
    ContractId
);
record_id!(AccrualId);
record_id!(ThreadId);
record_id!(StaffId);
record_id!(DepartmentId);
