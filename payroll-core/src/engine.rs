//! Builds a complete payroll run from a roster in memory.
//!
//! Employees are independent of each other, so payslips are computed on the
//! rayon pool.  The run is all-or-nothing: the first failing employee aborts
//! it and no run is returned.  Persisting the result is the caller's job.

use chrono::Utc;
use rayon::prelude::*;
use rust_decimal::Decimal;
use tracing::{debug, error, info};

use crate::calculations::{SocialInsuranceConfig, TaxBandProvider, TaxCalculator};
use crate::error::PayrollError;
use crate::models::{Employee, PayPeriod, PayrollRun, Payslip, PriorYtd, TaxBreakdown};

/// One employee as they enter a run, with their history for the tax year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub employee: Employee,
    pub prior_ytd: PriorYtd,
}

impl RosterEntry {
    pub fn new(
        employee: Employee,
        prior_ytd: PriorYtd,
    ) -> Self {
        Self {
            employee,
            prior_ytd,
        }
    }
}

pub struct PayrollRunEngine<'a> {
    calculator: TaxCalculator<'a>,
}

impl<'a> PayrollRunEngine<'a> {
    pub fn new(bands: &'a dyn TaxBandProvider) -> Self {
        Self {
            calculator: TaxCalculator::new(bands),
        }
    }

    pub fn with_social_insurance(
        bands: &'a dyn TaxBandProvider,
        config: SocialInsuranceConfig,
    ) -> Self {
        Self {
            calculator: TaxCalculator::with_social_insurance(bands, config),
        }
    }

    /// Computes one payslip per roster entry and returns the run in the
    /// processed state.
    ///
    /// Payslips are ordered by employee id whatever the roster order.
    ///
    /// # Errors
    ///
    /// - [`PayrollError::PreconditionFailed`] for an inverted period or an
    ///   empty roster, before any employee is processed.
    /// - Any error from an individual employee, which abandons the run.
    pub fn process(
        &self,
        period: PayPeriod,
        roster: &[RosterEntry],
    ) -> Result<PayrollRun, PayrollError> {
        period.validate()?;
        if roster.is_empty() {
            return Err(PayrollError::PreconditionFailed(
                "no active employees to process".to_string(),
            ));
        }

        let tax_year = period.tax_year();
        info!(
            start = %period.start,
            end = %period.end,
            tax_year,
            employees = roster.len(),
            "processing payroll run"
        );

        let mut payslips = roster
            .par_iter()
            .map(|entry| self.payslip_for(entry, tax_year))
            .collect::<Result<Vec<_>, _>>()?;
        payslips.sort_by_key(|slip| slip.employee_id);

        let mut run = PayrollRun::draft(period);
        run.attach_payslips(payslips)?;
        run.mark_processed(Utc::now())?;

        let totals = run.totals();
        info!(
            gross = %totals.gross,
            net = %totals.net,
            payslips = run.payslips().len(),
            "payroll run processed"
        );
        Ok(run)
    }

    fn payslip_for(
        &self,
        entry: &RosterEntry,
        tax_year: i32,
    ) -> Result<Payslip, PayrollError> {
        let employee = &entry.employee;
        let result = self.employee_breakdown(employee, tax_year);

        match result {
            Ok(breakdown) => {
                debug!(
                    employee_id = employee.id,
                    gross = %breakdown.gross_pay,
                    net = %breakdown.net_pay,
                    "payslip computed"
                );
                Ok(Payslip::new(employee.id, &breakdown, &entry.prior_ytd))
            }
            Err(e) => {
                error!(employee_id = employee.id, error = %e, "payroll run aborted");
                Err(e)
            }
        }
    }

    fn employee_breakdown(
        &self,
        employee: &Employee,
        tax_year: i32,
    ) -> Result<TaxBreakdown, PayrollError> {
        if employee.gross_salary <= Decimal::ZERO {
            return Err(PayrollError::InvalidInput(format!(
                "employee {} has a non-positive salary of {}",
                employee.id, employee.gross_salary
            )));
        }
        self.calculator.calculate(employee, employee.gross_salary, tax_year)
    }
}
