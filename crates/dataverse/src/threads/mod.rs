//! Education threads: scheduled course runs and the contracts staffed on them.

pub mod domain;
pub mod queries;
pub mod status;

pub use domain::{EducationThread, NewEducationThread, ThreadContractAssignment};
pub use queries::{ThreadFilter, ThreadOrder};
pub use status::ThreadStatus;
