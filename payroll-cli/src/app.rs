use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use payroll_core::db::RepositoryRegistry;
use payroll_core::{Employee, PayFrequency, PayPeriod, PayrollService};
use payroll_db_sqlite::SqliteRepositoryFactory;
use rust_decimal::Decimal;
use tracing::debug;

use crate::render;
use crate::utils::parse_decimal;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Irish payroll: PAYE, PRSI and USC deductions and payroll runs.
///
/// Connects to the configured database (migrated and seeded with the 2025
/// tax bands on first use) and runs one command against it.
#[derive(Debug, Parser)]
#[command(name = "payroll", version)]
pub struct Cli {
    /// Database backend to use.
    #[arg(long, global = true, default_value = "sqlite")]
    pub backend: String,

    /// Database connection string.
    /// For SQLite this is a file path (e.g. `payroll.db`) or `:memory:`.
    #[arg(long, global = true, default_value = "payroll.db")]
    pub db: String,

    /// Log filter, a level ("debug") or any RUST_LOG directive.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also append log output to this file.
    #[arg(long, global = true)]
    pub log_file: Option<std::path::PathBuf>,

    /// Hide log output on stderr.
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Show the deductions for one period's gross pay without saving anything.
    Calculate {
        /// Stored employee whose frequency and credits apply.
        #[arg(long, conflicts_with_all = ["frequency", "credits"])]
        employee: Option<i64>,

        /// Gross pay for the period; defaults to the employee's salary.
        #[arg(long, value_parser = parse_decimal, required_unless_present = "employee")]
        gross: Option<Decimal>,

        /// Pay frequency when no employee is given.
        #[arg(long, value_parser = parse_frequency, default_value = "monthly")]
        frequency: PayFrequency,

        /// Annual tax credits when no employee is given.
        #[arg(long, value_parser = parse_decimal, default_value = "0")]
        credits: Decimal,

        /// Tax year whose bands apply.
        #[arg(long, default_value = "2025")]
        year: i32,
    },

    /// Process a payroll run for every active employee.
    Run {
        /// First day of the pay period (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Last day of the pay period; its year selects the tax year.
        #[arg(long)]
        end: NaiveDate,

        /// Payment date; defaults to the period end.
        #[arg(long)]
        payment_date: Option<NaiveDate>,
    },

    /// Print one payroll run with its payslips.
    Show { id: i64 },

    /// List payroll runs, most recent period first.
    List,

    /// Mark a processed payroll run as paid.
    Pay { id: i64 },

    /// List the active employees.
    Employees {
        /// Include employees who have been deactivated.
        #[arg(long, default_value_t = false)]
        all: bool,
    },

    /// Print one employee's record.
    Employee { id: i64 },

    /// Remove an employee from future payroll runs.
    Deactivate { id: i64 },

    /// Return a deactivated employee to the payroll roster.
    Activate { id: i64 },
}

fn parse_frequency(s: &str) -> Result<PayFrequency, String> {
    PayFrequency::parse(s.trim())
        .ok_or_else(|| format!("unknown pay frequency '{s}' (expected weekly or monthly)"))
}

// ─── wiring ──────────────────────────────────────────────────────────────────

/// Registry with every backend this binary links.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry
}

/// Runs one command and returns the report to print.
pub async fn execute(
    service: &PayrollService,
    command: Command,
) -> Result<String> {
    match command {
        Command::Calculate {
            employee,
            gross,
            frequency,
            credits,
            year,
        } => {
            let (subject, breakdown) = match employee {
                Some(id) => {
                    let employee = service
                        .get_employee(id)
                        .await
                        .with_context(|| format!("Failed to load employee {id}"))?;
                    let gross = gross.unwrap_or(employee.gross_salary);
                    let breakdown = service.calculate(&employee, gross, year).await?;
                    (employee.full_name(), breakdown)
                }
                None => {
                    let gross = gross.context("--gross is required without --employee")?;
                    let employee = ad_hoc_employee(gross, frequency, credits);
                    let breakdown = service.calculate(&employee, gross, year).await?;
                    (format!("{} pay, {year}", frequency.as_str().to_lowercase()), breakdown)
                }
            };
            Ok(render::breakdown(&subject, &breakdown))
        }

        Command::Run {
            start,
            end,
            payment_date,
        } => {
            let period = PayPeriod {
                start,
                end,
                payment_date: payment_date.unwrap_or(end),
            };
            debug!(?period, "processing payroll");
            let run = service.process_payroll(period).await?;
            Ok(render::run(&run))
        }

        Command::Show { id } => {
            let run = service
                .get_payroll(id)
                .await
                .with_context(|| format!("Failed to load payroll run {id}"))?;
            Ok(render::run(&run))
        }

        Command::List => Ok(render::run_list(&service.list_payrolls().await?)),

        Command::Pay { id } => {
            let run = service
                .mark_paid(id)
                .await
                .with_context(|| format!("Failed to mark payroll run {id} paid"))?;
            Ok(render::run_summary(&run))
        }

        Command::Employees { all } => {
            let employees = service
                .list_employees(all)
                .await
                .context("Failed to list employees")?;
            Ok(render::employees(&employees))
        }

        Command::Employee { id } => {
            let employee = service
                .get_employee(id)
                .await
                .with_context(|| format!("Failed to load employee {id}"))?;
            Ok(render::employee(&employee))
        }

        Command::Deactivate { id } => set_active(service, id, false).await,

        Command::Activate { id } => set_active(service, id, true).await,
    }
}

async fn set_active(
    service: &PayrollService,
    id: i64,
    active: bool,
) -> Result<String> {
    let employee = service
        .set_employee_active(id, active)
        .await
        .with_context(|| format!("Failed to update employee {id}"))?;
    Ok(render::employee(&employee))
}

/// A throwaway employee record carrying only what the calculators read.
fn ad_hoc_employee(
    gross: Decimal,
    pay_frequency: PayFrequency,
    tax_credits_annual: Decimal,
) -> Employee {
    Employee {
        id: 0,
        pps_number: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        gross_salary: gross,
        pay_frequency,
        tax_credits_annual,
        is_active: true,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("payroll").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn calculate_with_raw_figures() {
        let cli = parse(&[
            "calculate",
            "--gross",
            "50,000",
            "--credits",
            "3300",
            "--frequency",
            "weekly",
        ]);

        assert_eq!(
            cli.command,
            Command::Calculate {
                employee: None,
                gross: Some(dec!(50000)),
                frequency: PayFrequency::Weekly,
                credits: dec!(3300),
                year: 2025,
            }
        );
    }

    #[test]
    fn calculate_for_employee_needs_no_gross() {
        let cli = parse(&["calculate", "--employee", "7", "--year", "2026"]);

        assert_eq!(
            cli.command,
            Command::Calculate {
                employee: Some(7),
                gross: None,
                frequency: PayFrequency::Monthly,
                credits: dec!(0),
                year: 2026,
            }
        );
    }

    #[test]
    fn calculate_rejects_missing_gross_and_employee() {
        let result = Cli::try_parse_from(["payroll", "calculate"]);
        assert!(result.is_err());
    }

    #[test]
    fn calculate_rejects_employee_with_credits() {
        let result =
            Cli::try_parse_from(["payroll", "calculate", "--employee", "1", "--credits", "10"]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_frequency_is_rejected() {
        let result = Cli::try_parse_from([
            "payroll",
            "calculate",
            "--gross",
            "100",
            "--frequency",
            "fortnightly",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn run_parses_dates_and_global_flags() {
        let cli = parse(&[
            "run",
            "--start",
            "2025-01-01",
            "--end",
            "2025-01-31",
            "--db",
            ":memory:",
            "--log-level",
            "debug",
        ]);

        assert_eq!(cli.db, ":memory:");
        assert_eq!(cli.backend, "sqlite");
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(
            cli.command,
            Command::Run {
                start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
                payment_date: None,
            }
        );
    }

    #[test]
    fn show_and_pay_take_an_id() {
        assert_eq!(parse(&["show", "3"]).command, Command::Show { id: 3 });
        assert_eq!(parse(&["pay", "3"]).command, Command::Pay { id: 3 });
    }

    #[test]
    fn employee_commands() {
        assert_eq!(parse(&["employees"]).command, Command::Employees { all: false });
        assert_eq!(parse(&["employees", "--all"]).command, Command::Employees { all: true });
        assert_eq!(parse(&["employee", "5"]).command, Command::Employee { id: 5 });
        assert_eq!(parse(&["deactivate", "5"]).command, Command::Deactivate { id: 5 });
        assert_eq!(parse(&["activate", "5"]).command, Command::Activate { id: 5 });
    }

    #[test]
    fn registry_links_sqlite() {
        assert_eq!(build_registry().available_backends(), vec!["sqlite"]);
    }
}
