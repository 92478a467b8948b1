//! SQLite storage for payroll data.
//!
//! Every amount is stored as exact decimal TEXT; see [`decimal`].

pub mod decimal;
pub mod factory;
pub mod repository;

pub use factory::SqliteRepositoryFactory;
pub use repository::SqliteRepository;
