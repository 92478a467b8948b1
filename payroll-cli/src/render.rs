//! Plain-text reports printed by the `payroll` commands.

use std::fmt::Write;

use payroll_core::{Employee, PayrollRun, TaxBreakdown};

use crate::utils::format_money;

const RULE: &str = "────────────────────────────────────────────────────────────────────────";

pub fn breakdown(
    subject: &str,
    breakdown: &TaxBreakdown,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{subject}");
    let _ = writeln!(out, "{}", "─".repeat(34));
    let _ = writeln!(out, "{breakdown}");
    let _ = writeln!(
        out,
        "Total deductions: {:>12}",
        format_money(breakdown.total_deductions())
    );
    out
}

/// One line per run: id, period, status and net total.
pub fn run_summary(run: &PayrollRun) -> String {
    let period = run.period();
    format!(
        "Run #{} {} to {} (paid {}) tax year {} {} net {}",
        run.id().map_or_else(|| "-".to_string(), |id| id.to_string()),
        period.start,
        period.end,
        period.payment_date,
        run.tax_year(),
        run.status(),
        format_money(run.totals().net),
    )
}

/// Header, one row per payslip, and the run totals.
pub fn run(run: &PayrollRun) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", run_summary(run));
    if let Some(at) = run.processed_at() {
        let _ = writeln!(out, "Processed at {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "{:>8} {:>12} {:>11} {:>10} {:>10} {:>12} {:>12}",
        "Employee", "Gross", "PAYE", "PRSI", "USC", "Net", "YTD gross"
    );
    let _ = writeln!(out, "{RULE}");

    for slip in run.payslips() {
        let _ = writeln!(
            out,
            "{:>8} {:>12} {:>11} {:>10} {:>10} {:>12} {:>12}",
            slip.employee_id,
            format_money(slip.gross_pay),
            format_money(slip.income_tax),
            format_money(slip.social_insurance),
            format_money(slip.universal_charge),
            format_money(slip.net_pay),
            format_money(slip.ytd.gross),
        );
    }

    let totals = run.totals();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "{:>8} {:>12} {:>11} {:>10} {:>10} {:>12}",
        "Total",
        format_money(totals.gross),
        format_money(totals.income_tax),
        format_money(totals.social_insurance),
        format_money(totals.universal_charge),
        format_money(totals.net),
    );
    out
}

pub fn run_list(runs: &[PayrollRun]) -> String {
    if runs.is_empty() {
        return "No payroll runs.\n".to_string();
    }
    let mut out = String::new();
    for run in runs {
        let _ = writeln!(out, "{}", run_summary(run));
    }
    out
}

pub fn employees(employees: &[Employee]) -> String {
    if employees.is_empty() {
        return "No employees.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5}  {:<10} {:<24} {:<8} {:>12} {:>10}  {}",
        "Id", "PPS", "Name", "Freq", "Gross", "Credits", "Status"
    );
    for e in employees {
        let _ = writeln!(
            out,
            "{:>5}  {:<10} {:<24} {:<8} {:>12} {:>10}  {}",
            e.id,
            e.pps_number,
            e.full_name(),
            e.pay_frequency.as_str(),
            format_money(e.gross_salary),
            format_money(e.tax_credits_annual),
            status_label(e),
        );
    }
    out
}

pub fn employee(e: &Employee) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Employee #{} {} ({})", e.id, e.full_name(), e.pps_number);
    let _ = writeln!(out, "Pay frequency:    {}", e.pay_frequency.as_str());
    let _ = writeln!(out, "Gross per period: {}", format_money(e.gross_salary));
    let _ = writeln!(out, "Annual credits:   {}", format_money(e.tax_credits_annual));
    let _ = writeln!(out, "Status:           {}", status_label(e));
    let _ = writeln!(out, "Registered:       {}", e.created_at.format("%Y-%m-%d"));
    out
}

fn status_label(e: &Employee) -> &'static str {
    if e.is_active { "active" } else { "inactive" }
}
