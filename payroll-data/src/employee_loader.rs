use std::collections::HashSet;
use std::io::Read;

use payroll_core::{Employee, NewEmployee, PayFrequency, PayrollRepository, RepositoryError};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::serde_decimal::{deserialize_decimal, deserialize_optional_decimal};

#[derive(Debug, Error)]
pub enum EmployeeLoaderError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("Unknown pay frequency '{0}' (expected weekly or monthly)")]
    UnknownPayFrequency(String),

    #[error("PPS number {0} is already registered")]
    DuplicatePps(String),

    #[error("Invalid record for {pps_number}: {reason}")]
    InvalidRecord { pps_number: String, reason: String },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<csv::Error> for EmployeeLoaderError {
    fn from(err: csv::Error) -> Self {
        EmployeeLoaderError::CsvParse(err.to_string())
    }
}

/// One row of an employee roster CSV.  `tax_credits_annual` may be empty,
/// meaning no credits.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EmployeeRecord {
    pub pps_number: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub gross_salary: Decimal,
    pub pay_frequency: String,
    #[serde(default, deserialize_with = "deserialize_optional_decimal")]
    pub tax_credits_annual: Option<Decimal>,
}

impl EmployeeRecord {
    /// Checks the record and converts it for insertion.
    pub fn to_new_employee(&self) -> Result<NewEmployee, EmployeeLoaderError> {
        let pay_frequency = PayFrequency::parse(self.pay_frequency.trim())
            .ok_or_else(|| EmployeeLoaderError::UnknownPayFrequency(self.pay_frequency.clone()))?;
        let invalid = |reason: String| EmployeeLoaderError::InvalidRecord {
            pps_number: self.pps_number.clone(),
            reason,
        };

        if self.gross_salary <= Decimal::ZERO {
            return Err(invalid(format!(
                "gross salary must be positive, got {}",
                self.gross_salary
            )));
        }
        let tax_credits_annual = self.tax_credits_annual.unwrap_or(Decimal::ZERO);
        if tax_credits_annual < Decimal::ZERO {
            return Err(invalid(format!(
                "tax credits must not be negative, got {}",
                tax_credits_annual
            )));
        }

        Ok(NewEmployee {
            pps_number: self.pps_number.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            gross_salary: self.gross_salary,
            pay_frequency,
            tax_credits_annual,
        })
    }
}

pub struct EmployeeLoader;

impl EmployeeLoader {
    pub fn parse<R: Read>(reader: R) -> Result<Vec<EmployeeRecord>, EmployeeLoaderError> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: EmployeeRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Creates one employee per record.  Every record is checked before the
    /// first insert, including PPS numbers repeated within the file or
    /// already in the store.
    pub async fn load<R: PayrollRepository + ?Sized>(
        repo: &R,
        records: &[EmployeeRecord],
    ) -> Result<Vec<Employee>, EmployeeLoaderError> {
        let new_employees = records
            .iter()
            .map(EmployeeRecord::to_new_employee)
            .collect::<Result<Vec<_>, _>>()?;

        let existing = repo.list_employees().await?;
        let mut seen: HashSet<&str> = existing.iter().map(|e| e.pps_number.as_str()).collect();
        for employee in &new_employees {
            if !seen.insert(employee.pps_number.as_str()) {
                return Err(EmployeeLoaderError::DuplicatePps(employee.pps_number.clone()));
            }
        }

        let mut created = Vec::with_capacity(new_employees.len());
        for employee in new_employees {
            let pps_number = employee.pps_number.clone();
            let employee = repo.create_employee(employee).await.map_err(|e| match e {
                RepositoryError::Conflict(_) => EmployeeLoaderError::DuplicatePps(pps_number),
                other => other.into(),
            })?;
            debug!(id = employee.id, pps = %employee.pps_number, "employee created");
            created.push(employee);
        }
        info!(count = created.len(), "employees loaded");
        Ok(created)
    }
}
