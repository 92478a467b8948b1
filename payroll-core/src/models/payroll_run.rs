use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PayrollStatus, Payslip};
use crate::error::PayrollError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub payment_date: NaiveDate,
}

impl PayPeriod {
    /// The tax year a period belongs to is the calendar year it ends in.
    pub fn tax_year(&self) -> i32 {
        self.end.year()
    }

    /// # Errors
    ///
    /// [`PayrollError::PreconditionFailed`] when the period starts after it ends.
    pub fn validate(&self) -> Result<(), PayrollError> {
        if self.start > self.end {
            return Err(PayrollError::PreconditionFailed(format!(
                "pay period start {} is after end {}",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// Column-wise sums over a run's payslips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunTotals {
    pub gross: Decimal,
    pub income_tax: Decimal,
    pub social_insurance: Decimal,
    pub universal_charge: Decimal,
    pub net: Decimal,
}

impl RunTotals {
    pub fn from_payslips(payslips: &[Payslip]) -> Self {
        payslips.iter().fold(Self::default(), |acc, slip| Self {
            gross: acc.gross + slip.gross_pay,
            income_tax: acc.income_tax + slip.income_tax,
            social_insurance: acc.social_insurance + slip.social_insurance,
            universal_charge: acc.universal_charge + slip.universal_charge,
            net: acc.net + slip.net_pay,
        })
    }
}

/// A batch of payslips for one pay period.
///
/// Totals are never maintained incrementally: every change to the payslip
/// set recomputes them from scratch, so `totals()` always equals
/// `RunTotals::from_payslips(self.payslips())`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollRun {
    id: Option<i64>,
    period: PayPeriod,
    status: PayrollStatus,
    payslips: Vec<Payslip>,
    totals: RunTotals,
    processed_at: Option<DateTime<Utc>>,
}

impl PayrollRun {
    /// An empty run in draft, not yet persisted.
    pub fn draft(period: PayPeriod) -> Self {
        Self {
            id: None,
            period,
            status: PayrollStatus::Draft,
            payslips: Vec::new(),
            totals: RunTotals::default(),
            processed_at: None,
        }
    }

    /// Rebuilds a persisted run.  Totals are re-derived from `payslips`.
    pub fn restore(
        id: i64,
        period: PayPeriod,
        status: PayrollStatus,
        payslips: Vec<Payslip>,
        processed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let totals = RunTotals::from_payslips(&payslips);
        Self {
            id: Some(id),
            period,
            status,
            payslips,
            totals,
            processed_at,
        }
    }

    pub fn with_id(
        mut self,
        id: i64,
    ) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn period(&self) -> &PayPeriod {
        &self.period
    }

    pub fn tax_year(&self) -> i32 {
        self.period.tax_year()
    }

    pub fn status(&self) -> PayrollStatus {
        self.status
    }

    pub fn payslips(&self) -> &[Payslip] {
        &self.payslips
    }

    pub fn totals(&self) -> &RunTotals {
        &self.totals
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Adds payslips to a draft run and recomputes the totals.
    ///
    /// The whole batch is rejected, leaving the run untouched, if the run is
    /// no longer a draft or any employee would end up with two payslips.
    pub fn attach_payslips(
        &mut self,
        payslips: Vec<Payslip>,
    ) -> Result<(), PayrollError> {
        self.ensure_draft()?;

        let mut seen: HashSet<i64> = self.payslips.iter().map(|p| p.employee_id).collect();
        for slip in &payslips {
            if !seen.insert(slip.employee_id) {
                return Err(PayrollError::PreconditionFailed(format!(
                    "employee {} already has a payslip in this run",
                    slip.employee_id
                )));
            }
        }

        self.payslips.extend(payslips);
        self.recompute_totals();
        Ok(())
    }

    /// Removes an employee's payslip from a draft run and recomputes the totals.
    pub fn detach_payslip(
        &mut self,
        employee_id: i64,
    ) -> Result<Option<Payslip>, PayrollError> {
        self.ensure_draft()?;

        let Some(index) = self.payslips.iter().position(|p| p.employee_id == employee_id) else {
            return Ok(None);
        };
        let removed = self.payslips.remove(index);
        self.recompute_totals();
        Ok(Some(removed))
    }

    /// Finalises a draft run.  A run without payslips cannot be processed.
    pub fn mark_processed(
        &mut self,
        at: DateTime<Utc>,
    ) -> Result<(), PayrollError> {
        self.status.validate_transition(PayrollStatus::Processed)?;
        if self.payslips.is_empty() {
            return Err(PayrollError::PreconditionFailed(
                "a payroll run with no payslips cannot be processed".to_string(),
            ));
        }

        self.recompute_totals();
        self.status = PayrollStatus::Processed;
        self.processed_at = Some(at);
        Ok(())
    }

    pub fn mark_paid(&mut self) -> Result<(), PayrollError> {
        self.status.validate_transition(PayrollStatus::Paid)?;
        self.status = PayrollStatus::Paid;
        Ok(())
    }

    fn ensure_draft(&self) -> Result<(), PayrollError> {
        if self.status != PayrollStatus::Draft {
            return Err(PayrollError::PreconditionFailed(format!(
                "payslips of a {} payroll run cannot change",
                self.status
            )));
        }
        Ok(())
    }

    fn recompute_totals(&mut self) {
        self.totals = RunTotals::from_payslips(&self.payslips);
    }
}
