//! Async boundary between the pure payroll core and the repository.
//!
//! All I/O for a run happens here, before and after the engine: the
//! run-level checks, the band snapshot, prior YTD history, and the single
//! commit of the finished run.  Nothing is written if any step fails.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::calculations::{SocialInsuranceConfig, TaxBandTable, TaxCalculator};
use crate::db::{PayrollRepository, RepositoryError};
use crate::engine::{PayrollRunEngine, RosterEntry};
use crate::error::PayrollError;
use crate::models::{Employee, PayPeriod, PayrollRun, PayrollStatus, TaxBreakdown, TaxKind};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PayrollServiceError {
    #[error(transparent)]
    Payroll(#[from] PayrollError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct PayrollService {
    repo: Box<dyn PayrollRepository>,
    social_insurance: SocialInsuranceConfig,
}

impl PayrollService {
    pub fn new(repo: Box<dyn PayrollRepository>) -> Self {
        Self::with_social_insurance(repo, SocialInsuranceConfig::default())
    }

    pub fn with_social_insurance(
        repo: Box<dyn PayrollRepository>,
        social_insurance: SocialInsuranceConfig,
    ) -> Self {
        Self {
            repo,
            social_insurance,
        }
    }

    pub fn repository(&self) -> &dyn PayrollRepository {
        self.repo.as_ref()
    }

    /// Runs payroll for every active employee over `period` and persists
    /// the processed run.
    ///
    /// # Errors
    ///
    /// - `PreconditionFailed` if the period is inverted, a run already
    ///   exists for exactly this period, or there are no active employees.
    /// - `ConfigurationMissing` or `InvalidInput` from any employee.
    /// - Repository failures.
    #[instrument(skip(self), fields(start = %period.start, end = %period.end))]
    pub async fn process_payroll(
        &self,
        period: PayPeriod,
    ) -> Result<PayrollRun, PayrollServiceError> {
        period.validate()?;

        if self.repo.payroll_run_exists_for_period(&period).await? {
            return Err(PayrollError::PreconditionFailed(format!(
                "a payroll run already exists for {} to {}",
                period.start, period.end
            ))
            .into());
        }

        let employees = self.repo.list_active_employees().await?;
        if employees.is_empty() {
            return Err(
                PayrollError::PreconditionFailed("no active employees found".to_string()).into(),
            );
        }

        let tax_year = period.tax_year();
        let bands = self.load_band_table(tax_year).await?;

        let mut roster = Vec::with_capacity(employees.len());
        for employee in employees {
            let prior_ytd = self.repo.get_prior_ytd(employee.id, tax_year).await?;
            roster.push(RosterEntry::new(employee, prior_ytd));
        }

        let run = PayrollRunEngine::with_social_insurance(&bands, self.social_insurance.clone())
            .process(period, &roster)?;
        let saved = match self.repo.save_payroll_run(&run).await {
            Ok(saved) => saved,
            // Another writer committed this period after the check above
            Err(RepositoryError::Conflict(reason)) => {
                warn!(%reason, "payroll run lost a race for its period");
                return Err(PayrollError::PreconditionFailed(format!(
                    "a payroll run already exists for {} to {}",
                    period.start, period.end
                ))
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        info!(run_id = ?saved.id(), payslips = saved.payslips().len(), "payroll run saved");
        Ok(saved)
    }

    /// Breakdown for a stored employee at an arbitrary gross.  Nothing is
    /// persisted.
    pub async fn calculate_for_employee(
        &self,
        employee_id: i64,
        gross: Decimal,
        tax_year: i32,
    ) -> Result<TaxBreakdown, PayrollServiceError> {
        let employee = self.repo.get_employee(employee_id).await?;
        self.calculate(&employee, gross, tax_year).await
    }

    /// Breakdown for an employee snapshot that need not be stored.
    pub async fn calculate(
        &self,
        employee: &Employee,
        gross: Decimal,
        tax_year: i32,
    ) -> Result<TaxBreakdown, PayrollServiceError> {
        let bands = self.load_band_table(tax_year).await?;
        let breakdown = TaxCalculator::with_social_insurance(&bands, self.social_insurance.clone())
            .calculate(employee, gross, tax_year)?;
        Ok(breakdown)
    }

    pub async fn get_employee(
        &self,
        id: i64,
    ) -> Result<Employee, PayrollServiceError> {
        Ok(self.repo.get_employee(id).await?)
    }

    /// The payroll roster, or every employee ever registered when
    /// `include_inactive` is set.
    pub async fn list_employees(
        &self,
        include_inactive: bool,
    ) -> Result<Vec<Employee>, PayrollServiceError> {
        let employees = if include_inactive {
            self.repo.list_employees().await?
        } else {
            self.repo.list_active_employees().await?
        };
        Ok(employees)
    }

    /// Adds an employee to or removes them from future payroll runs.
    /// Payslips already issued are kept.
    pub async fn set_employee_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<Employee, PayrollServiceError> {
        self.repo.set_employee_active(id, active).await?;
        let employee = self.repo.get_employee(id).await?;

        info!(employee_id = id, active, "employee roster status changed");
        Ok(employee)
    }

    pub async fn get_payroll(
        &self,
        id: i64,
    ) -> Result<PayrollRun, PayrollServiceError> {
        Ok(self.repo.get_payroll_run(id).await?)
    }

    pub async fn list_payrolls(&self) -> Result<Vec<PayrollRun>, PayrollServiceError> {
        Ok(self.repo.list_payroll_runs().await?)
    }

    /// Moves a processed run to paid.
    pub async fn mark_paid(
        &self,
        id: i64,
    ) -> Result<PayrollRun, PayrollServiceError> {
        let mut run = self.repo.get_payroll_run(id).await?;
        if let Err(e) = run.mark_paid() {
            warn!(run_id = id, status = %run.status(), "rejected payment of payroll run");
            return Err(e.into());
        }
        self.repo.update_payroll_status(id, PayrollStatus::Paid).await?;

        info!(run_id = id, "payroll run marked paid");
        Ok(run)
    }

    /// Snapshot of the banded scales for one year.  Read once per run.
    async fn load_band_table(
        &self,
        tax_year: i32,
    ) -> Result<TaxBandTable, RepositoryError> {
        let mut bands = self.repo.get_active_tax_bands(tax_year, TaxKind::IncomeTax).await?;
        bands.extend(
            self.repo
                .get_active_tax_bands(tax_year, TaxKind::UniversalCharge)
                .await?,
        );
        Ok(TaxBandTable::from_bands(bands))
    }
}
