use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Employee, NewEmployee, PayPeriod, PayrollRun, PayrollStatus, PriorYtd, TaxBand, TaxKind,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    /// A uniqueness rule of the store was violated, e.g. a PPS number or a
    /// pay period that is already recorded.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait PayrollRepository: Send + Sync {
    // Tax bands
    /// Active bands for `(tax_year, kind)`, ascending by lower bound.
    async fn get_active_tax_bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
    ) -> Result<Vec<TaxBand>, RepositoryError>;

    async fn insert_tax_band(
        &self,
        band: &TaxBand,
    ) -> Result<(), RepositoryError>;

    /// Replaces every band, active or not, of `(tax_year, kind)` with
    /// `bands` in one atomic step.  On error the old group is kept intact.
    /// Returns the number of rows removed.
    async fn replace_tax_bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
        bands: &[TaxBand],
    ) -> Result<u64, RepositoryError>;

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError>;

    // Employees
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] when the PPS number is already taken.
    async fn create_employee(
        &self,
        employee: NewEmployee,
    ) -> Result<Employee, RepositoryError>;

    async fn get_employee(
        &self,
        id: i64,
    ) -> Result<Employee, RepositoryError>;

    async fn list_active_employees(&self) -> Result<Vec<Employee>, RepositoryError>;

    /// Every employee, active or not, ordered by id.
    async fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError>;

    async fn set_employee_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<(), RepositoryError>;

    // Year-to-date history
    /// Sums of the employee's persisted payslips for runs whose period ends
    /// in `tax_year`.  Derived from history on every call.
    async fn get_prior_ytd(
        &self,
        employee_id: i64,
        tax_year: i32,
    ) -> Result<PriorYtd, RepositoryError>;

    // Payroll runs
    async fn payroll_run_exists_for_period(
        &self,
        period: &PayPeriod,
    ) -> Result<bool, RepositoryError>;

    /// Persists a run and all of its payslips atomically and returns it with
    /// its new id.
    ///
    /// # Errors
    ///
    /// [`RepositoryError::Conflict`] when a run for the same period already
    /// exists.
    async fn save_payroll_run(
        &self,
        run: &PayrollRun,
    ) -> Result<PayrollRun, RepositoryError>;

    async fn get_payroll_run(
        &self,
        id: i64,
    ) -> Result<PayrollRun, RepositoryError>;

    /// All runs, most recent period end first.
    async fn list_payroll_runs(&self) -> Result<Vec<PayrollRun>, RepositoryError>;

    async fn update_payroll_status(
        &self,
        id: i64,
        status: PayrollStatus,
    ) -> Result<(), RepositoryError>;
}
