//! In-memory [`PayrollRepository`] for unit tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Datelike, TimeZone, Utc};

use crate::db::{PayrollRepository, RepositoryError};
use crate::models::{
    Employee, NewEmployee, PayPeriod, PayrollRun, PayrollStatus, PriorYtd, TaxBand, TaxKind,
};

#[derive(Default)]
struct State {
    bands: Vec<TaxBand>,
    employees: Vec<Employee>,
    runs: Vec<PayrollRun>,
}

#[derive(Default)]
pub(crate) struct InMemoryRepository {
    state: Mutex<State>,
    blind_period_check: bool,
}

impl InMemoryRepository {
    pub fn with_bands(bands: Vec<TaxBand>) -> Self {
        let repo = Self::default();
        repo.state.lock().unwrap().bands = bands;
        repo
    }

    /// `payroll_run_exists_for_period` always answers false, as when another
    /// writer commits the same period between the check and the save.
    pub fn with_blind_period_check(mut self) -> Self {
        self.blind_period_check = true;
        self
    }
}

#[async_trait]
impl PayrollRepository for InMemoryRepository {
    async fn get_active_tax_bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
    ) -> Result<Vec<TaxBand>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut bands: Vec<_> = state
            .bands
            .iter()
            .filter(|b| b.tax_year == tax_year && b.kind == kind && b.is_active)
            .cloned()
            .collect();
        bands.sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));
        Ok(bands)
    }

    async fn insert_tax_band(
        &self,
        band: &TaxBand,
    ) -> Result<(), RepositoryError> {
        self.state.lock().unwrap().bands.push(band.clone());
        Ok(())
    }

    async fn replace_tax_bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
        bands: &[TaxBand],
    ) -> Result<u64, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let before = state.bands.len();
        state.bands.retain(|b| !(b.tax_year == tax_year && b.kind == kind));
        let removed = (before - state.bands.len()) as u64;
        state.bands.extend_from_slice(bands);
        Ok(removed)
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut years: Vec<_> = state.bands.iter().map(|b| b.tax_year).collect();
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        Ok(years)
    }

    async fn create_employee(
        &self,
        employee: NewEmployee,
    ) -> Result<Employee, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.employees.iter().any(|e| e.pps_number == employee.pps_number) {
            return Err(RepositoryError::Conflict(format!(
                "PPS number {} is already registered",
                employee.pps_number
            )));
        }
        let created = Employee {
            id: state.employees.len() as i64 + 1,
            pps_number: employee.pps_number,
            first_name: employee.first_name,
            last_name: employee.last_name,
            gross_salary: employee.gross_salary,
            pay_frequency: employee.pay_frequency,
            tax_credits_annual: employee.tax_credits_annual,
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        };
        state.employees.push(created.clone());
        Ok(created)
    }

    async fn get_employee(
        &self,
        id: i64,
    ) -> Result<Employee, RepositoryError> {
        let state = self.state.lock().unwrap();
        state
            .employees
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_active_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state.employees.iter().filter(|e| e.is_active).cloned().collect())
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        Ok(self.state.lock().unwrap().employees.clone())
    }

    async fn set_employee_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let employee = state
            .employees
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(RepositoryError::NotFound)?;
        employee.is_active = active;
        Ok(())
    }

    async fn get_prior_ytd(
        &self,
        employee_id: i64,
        tax_year: i32,
    ) -> Result<PriorYtd, RepositoryError> {
        let state = self.state.lock().unwrap();
        let ytd = state
            .runs
            .iter()
            .filter(|r| r.period().end.year() == tax_year)
            .flat_map(|r| r.payslips())
            .filter(|p| p.employee_id == employee_id)
            .fold(PriorYtd::default(), |acc, p| PriorYtd {
                gross: acc.gross + p.gross_pay,
                income_tax: acc.income_tax + p.income_tax,
                social_insurance: acc.social_insurance + p.social_insurance,
                universal_charge: acc.universal_charge + p.universal_charge,
            });
        Ok(ytd)
    }

    async fn payroll_run_exists_for_period(
        &self,
        period: &PayPeriod,
    ) -> Result<bool, RepositoryError> {
        if self.blind_period_check {
            return Ok(false);
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .runs
            .iter()
            .any(|r| r.period().start == period.start && r.period().end == period.end))
    }

    async fn save_payroll_run(
        &self,
        run: &PayrollRun,
    ) -> Result<PayrollRun, RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let period = run.period();
        if state
            .runs
            .iter()
            .any(|r| r.period().start == period.start && r.period().end == period.end)
        {
            return Err(RepositoryError::Conflict(format!(
                "a payroll run for {} to {} already exists",
                period.start, period.end
            )));
        }
        let saved = run.clone().with_id(state.runs.len() as i64 + 1);
        state.runs.push(saved.clone());
        Ok(saved)
    }

    async fn get_payroll_run(
        &self,
        id: i64,
    ) -> Result<PayrollRun, RepositoryError> {
        let state = self.state.lock().unwrap();
        state
            .runs
            .iter()
            .find(|r| r.id() == Some(id))
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_payroll_runs(&self) -> Result<Vec<PayrollRun>, RepositoryError> {
        let state = self.state.lock().unwrap();
        let mut runs = state.runs.clone();
        runs.sort_by(|a, b| b.period().end.cmp(&a.period().end));
        Ok(runs)
    }

    async fn update_payroll_status(
        &self,
        id: i64,
        status: PayrollStatus,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().unwrap();
        let run = state
            .runs
            .iter_mut()
            .find(|r| r.id() == Some(id))
            .ok_or(RepositoryError::NotFound)?;
        *run = PayrollRun::restore(
            id,
            *run.period(),
            status,
            run.payslips().to_vec(),
            run.processed_at(),
        );
        Ok(())
    }
}
