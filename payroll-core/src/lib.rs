pub mod calculations;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use db::repository::{PayrollRepository, RepositoryError};
pub use engine::{PayrollRunEngine, RosterEntry};
pub use error::PayrollError;
pub use models::*;
pub use service::{PayrollService, PayrollServiceError};
