mod employee;
mod pay_frequency;
mod payroll_run;
mod payroll_status;
mod payslip;
mod tax_band;
mod tax_breakdown;
mod tax_kind;

pub use employee::{Employee, NewEmployee};
pub use pay_frequency::PayFrequency;
pub use payroll_run::{PayPeriod, PayrollRun, RunTotals};
pub use payroll_status::PayrollStatus;
pub use payslip::{Payslip, PriorYtd, YtdTotals};
pub use tax_band::TaxBand;
pub use tax_breakdown::TaxBreakdown;
pub use tax_kind::TaxKind;
