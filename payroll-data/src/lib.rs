//! CSV import of tax band configuration and the employee roster.

pub mod band_loader;
pub mod employee_loader;

mod serde_decimal;

pub use band_loader::{TaxBandLoader, TaxBandLoaderError, TaxBandRecord};
pub use employee_loader::{EmployeeLoader, EmployeeLoaderError, EmployeeRecord};
