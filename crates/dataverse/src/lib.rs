//! Records of an education business: contractors, contracts, accruals and
//! course threads, with lifecycle statuses derived on read.

pub mod config;
pub mod contracts;
pub mod error;
pub mod ids;
pub mod import;
pub mod router;
pub mod service;
pub mod staff;
pub mod store;
pub mod telemetry;
pub mod threads;
pub mod views;

pub use router::dataverse_router;
pub use service::{DataverseService, ServiceError};
