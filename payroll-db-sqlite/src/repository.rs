use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use payroll_core::{
    Employee, NewEmployee, PayFrequency, PayPeriod, PayrollRepository, PayrollRun, PayrollStatus,
    Payslip, PriorYtd, RepositoryError, TaxBand, TaxKind, YtdTotals,
};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use tracing::debug;

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Opens `database_url`, creating the file if needed.
    ///
    /// Accepts a sqlx URL (`sqlite:payroll.db`), a bare path, or
    /// `:memory:`.  An in-memory database is private to one connection, so
    /// its pool is capped at a single connection.
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let url = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}", database_url)
        };

        let options = SqliteConnectOptions::from_str(&url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new();
        if in_memory {
            pool_options = pool_options.max_connections(1);
        }
        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_url))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Executes every `*.sql` file in `seeds_dir` in filename order.
    ///
    /// Each file is applied at most once per database: its name is recorded
    /// in `applied_seeds` in the same transaction as its statements, and
    /// later calls skip it.  Requires the migrations to have run.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            let applied: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM applied_seeds WHERE file_name = ?")
                    .bind(&name)
                    .fetch_optional(&self.pool)
                    .await
                    .context("Failed to read seed history")?;
            if applied.is_some() {
                debug!(file = %path.display(), "seed file already applied");
                continue;
            }

            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            let mut tx = self.pool.begin().await.context("Failed to begin seed transaction")?;
            sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(&sql))
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            sqlx::query("INSERT INTO applied_seeds (file_name, applied_at) VALUES (?, ?)")
                .bind(&name)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Failed to record seed file '{}'", path.display()))?;
            tx.commit()
                .await
                .with_context(|| format!("Failed to commit seed file '{}'", path.display()))?;

            debug!(file = %path.display(), "seed file applied");
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn payslips_for_run(
        &self,
        run_id: i64,
    ) -> Result<Vec<Payslip>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT employee_id, gross_pay, income_tax, social_insurance, universal_charge,
                    net_pay, tax_credits_used, ytd_gross, ytd_income_tax,
                    ytd_social_insurance, ytd_universal_charge, ytd_net
             FROM payslips WHERE payroll_run_id = ? ORDER BY employee_id",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_payslip).collect()
    }

    async fn row_to_payroll_run(
        &self,
        row: &SqliteRow,
    ) -> Result<PayrollRun, RepositoryError> {
        let id: i64 = row.try_get("id").map_err(db_err)?;
        let status_code: String = row.try_get("status").map_err(db_err)?;
        let status = PayrollStatus::parse(&status_code).ok_or_else(|| {
            RepositoryError::Database(format!("Invalid payroll status: {}", status_code))
        })?;
        let period = PayPeriod {
            start: row.try_get::<NaiveDate, _>("pay_period_start").map_err(db_err)?,
            end: row.try_get::<NaiveDate, _>("pay_period_end").map_err(db_err)?,
            payment_date: row.try_get::<NaiveDate, _>("payment_date").map_err(db_err)?,
        };
        let processed_at: Option<DateTime<Utc>> = row.try_get("processed_at").map_err(db_err)?;

        let payslips = self.payslips_for_run(id).await?;
        Ok(PayrollRun::restore(id, period, status, payslips, processed_at))
    }
}

/// UNIQUE violations become [`RepositoryError::Conflict`]; everything else
/// is a plain database error.
fn db_err(e: sqlx::Error) -> RepositoryError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => RepositoryError::Conflict(db.message().to_string()),
        _ => RepositoryError::Database(e.to_string()),
    }
}

/// Swaps the message of a [`RepositoryError::Conflict`] for one in domain
/// terms.
fn explain_conflict(
    err: RepositoryError,
    message: impl FnOnce() -> String,
) -> RepositoryError {
    match err {
        RepositoryError::Conflict(_) => RepositoryError::Conflict(message()),
        other => other,
    }
}

async fn insert_band(
    conn: &mut SqliteConnection,
    band: &TaxBand,
) -> Result<(), RepositoryError> {
    sqlx::query(
        "INSERT INTO tax_bands (tax_year, tax_kind, band_name, income_lower, income_upper,
                                rate, is_active, effective_from, effective_to)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(band.tax_year)
    .bind(band.kind.as_str())
    .bind(band.band_name.as_deref())
    .bind(decimal_to_text(band.lower_bound))
    .bind(band.upper_bound.map(decimal_to_text))
    .bind(decimal_to_text(band.rate))
    .bind(band.is_active)
    .bind(band.effective_from)
    .bind(band.effective_to)
    .execute(conn)
    .await
    .map_err(db_err)?;

    Ok(())
}

fn row_to_tax_band(row: &SqliteRow) -> Result<TaxBand, RepositoryError> {
    let kind_code: String = row.try_get("tax_kind").map_err(db_err)?;
    let kind = TaxKind::parse(&kind_code)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid tax kind: {}", kind_code)))?;

    Ok(TaxBand {
        tax_year: row.try_get("tax_year").map_err(db_err)?,
        kind,
        band_name: row.try_get("band_name").map_err(db_err)?,
        lower_bound: get_decimal(row, "income_lower")?,
        upper_bound: get_optional_decimal(row, "income_upper")?,
        rate: get_decimal(row, "rate")?,
        is_active: row.try_get("is_active").map_err(db_err)?,
        effective_from: row.try_get("effective_from").map_err(db_err)?,
        effective_to: row.try_get("effective_to").map_err(db_err)?,
    })
}

fn row_to_employee(row: &SqliteRow) -> Result<Employee, RepositoryError> {
    let frequency_code: String = row.try_get("pay_frequency").map_err(db_err)?;
    let pay_frequency = PayFrequency::parse(&frequency_code).ok_or_else(|| {
        RepositoryError::Database(format!("Invalid pay frequency: {}", frequency_code))
    })?;

    Ok(Employee {
        id: row.try_get("id").map_err(db_err)?,
        pps_number: row.try_get("pps_number").map_err(db_err)?,
        first_name: row.try_get("first_name").map_err(db_err)?,
        last_name: row.try_get("last_name").map_err(db_err)?,
        gross_salary: get_decimal(row, "gross_salary")?,
        pay_frequency,
        tax_credits_annual: get_decimal(row, "tax_credits_annual")?,
        is_active: row.try_get("is_active").map_err(db_err)?,
        created_at: row
            .try_get::<DateTime<Utc>, _>("created_at")
            .map_err(|e| RepositoryError::Database(format!("Failed to get created_at: {}", e)))?,
    })
}

fn row_to_payslip(row: &SqliteRow) -> Result<Payslip, RepositoryError> {
    Ok(Payslip {
        employee_id: row.try_get("employee_id").map_err(db_err)?,
        gross_pay: get_decimal(row, "gross_pay")?,
        income_tax: get_decimal(row, "income_tax")?,
        social_insurance: get_decimal(row, "social_insurance")?,
        universal_charge: get_decimal(row, "universal_charge")?,
        net_pay: get_decimal(row, "net_pay")?,
        tax_credits_used: get_decimal(row, "tax_credits_used")?,
        ytd: YtdTotals {
            gross: get_decimal(row, "ytd_gross")?,
            income_tax: get_decimal(row, "ytd_income_tax")?,
            social_insurance: get_decimal(row, "ytd_social_insurance")?,
            universal_charge: get_decimal(row, "ytd_universal_charge")?,
            net: get_decimal(row, "ytd_net")?,
        },
    })
}

const EMPLOYEE_COLUMNS: &str = "id, pps_number, first_name, last_name, gross_salary, pay_frequency,
     tax_credits_annual, is_active, created_at";

const PAYROLL_RUN_COLUMNS: &str =
    "id, pay_period_start, pay_period_end, payment_date, status, processed_at";

#[async_trait]
impl PayrollRepository for SqliteRepository {
    async fn get_active_tax_bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
    ) -> Result<Vec<TaxBand>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT tax_year, tax_kind, band_name, income_lower, income_upper, rate,
                    is_active, effective_from, effective_to
             FROM tax_bands
             WHERE tax_year = ? AND tax_kind = ? AND is_active = 1",
        )
        .bind(tax_year)
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut bands = rows.iter().map(row_to_tax_band).collect::<Result<Vec<_>, _>>()?;
        // TEXT ordering would put "12012" before "2"
        bands.sort_by(|a, b| a.lower_bound.cmp(&b.lower_bound));
        Ok(bands)
    }

    async fn insert_tax_band(
        &self,
        band: &TaxBand,
    ) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(db_err)?;
        insert_band(&mut conn, band).await
    }

    async fn replace_tax_bands(
        &self,
        tax_year: i32,
        kind: TaxKind,
        bands: &[TaxBand],
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let removed = sqlx::query("DELETE FROM tax_bands WHERE tax_year = ? AND tax_kind = ?")
            .bind(tax_year)
            .bind(kind.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();

        for band in bands {
            // Dropping `tx` on error rolls back the delete as well
            insert_band(&mut tx, band).await?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(tax_year, %kind, removed, inserted = bands.len(), "tax band group replaced");
        Ok(removed)
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows = sqlx::query("SELECT DISTINCT tax_year FROM tax_bands ORDER BY tax_year DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(|row| row.try_get("tax_year").map_err(db_err)).collect()
    }

    async fn create_employee(
        &self,
        employee: NewEmployee,
    ) -> Result<Employee, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO employees (pps_number, first_name, last_name, gross_salary,
                                    pay_frequency, tax_credits_annual, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, 1, ?)",
        )
        .bind(&employee.pps_number)
        .bind(&employee.first_name)
        .bind(&employee.last_name)
        .bind(decimal_to_text(employee.gross_salary))
        .bind(employee.pay_frequency.as_str())
        .bind(decimal_to_text(employee.tax_credits_annual))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            explain_conflict(db_err(e), || {
                format!("PPS number {} is already registered", employee.pps_number)
            })
        })?;

        self.get_employee(result.last_insert_rowid()).await
    }

    async fn get_employee(
        &self,
        id: i64,
    ) -> Result<Employee, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM employees WHERE id = ?", EMPLOYEE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or(RepositoryError::NotFound)?;

        row_to_employee(&row)
    }

    async fn list_active_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM employees WHERE is_active = 1 ORDER BY id",
            EMPLOYEE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_employee).collect()
    }

    async fn list_employees(&self) -> Result<Vec<Employee>, RepositoryError> {
        let rows = sqlx::query(&format!("SELECT {} FROM employees ORDER BY id", EMPLOYEE_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        rows.iter().map(row_to_employee).collect()
    }

    async fn set_employee_active(
        &self,
        id: i64,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE employees SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn get_prior_ytd(
        &self,
        employee_id: i64,
        tax_year: i32,
    ) -> Result<PriorYtd, RepositoryError> {
        let rows = sqlx::query(
            "SELECT p.gross_pay, p.income_tax, p.social_insurance, p.universal_charge
             FROM payslips p
             JOIN payroll_runs r ON r.id = p.payroll_run_id
             WHERE p.employee_id = ? AND r.tax_year = ?",
        )
        .bind(employee_id)
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        // Summed here rather than with SUM(), which would go through REAL
        let mut ytd = PriorYtd::default();
        for row in &rows {
            ytd.gross += get_decimal(row, "gross_pay")?;
            ytd.income_tax += get_decimal(row, "income_tax")?;
            ytd.social_insurance += get_decimal(row, "social_insurance")?;
            ytd.universal_charge += get_decimal(row, "universal_charge")?;
        }
        Ok(ytd)
    }

    async fn payroll_run_exists_for_period(
        &self,
        period: &PayPeriod,
    ) -> Result<bool, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM payroll_runs
             WHERE pay_period_start = ? AND pay_period_end = ?",
        )
        .bind(period.start)
        .bind(period.end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;

        let count: i64 = row.try_get("n").map_err(db_err)?;
        Ok(count > 0)
    }

    async fn save_payroll_run(
        &self,
        run: &PayrollRun,
    ) -> Result<PayrollRun, RepositoryError> {
        let period = run.period();
        let totals = run.totals();

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let result = sqlx::query(
            "INSERT INTO payroll_runs (pay_period_start, pay_period_end, payment_date, tax_year,
                                       status, total_gross, total_income_tax,
                                       total_social_insurance, total_universal_charge,
                                       total_net, processed_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(period.start)
        .bind(period.end)
        .bind(period.payment_date)
        .bind(run.tax_year())
        .bind(run.status().as_str())
        .bind(decimal_to_text(totals.gross))
        .bind(decimal_to_text(totals.income_tax))
        .bind(decimal_to_text(totals.social_insurance))
        .bind(decimal_to_text(totals.universal_charge))
        .bind(decimal_to_text(totals.net))
        .bind(run.processed_at())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            explain_conflict(db_err(e), || {
                format!(
                    "a payroll run for {} to {} already exists",
                    period.start, period.end
                )
            })
        })?;

        let run_id = result.last_insert_rowid();

        for slip in run.payslips() {
            sqlx::query(
                "INSERT INTO payslips (payroll_run_id, employee_id, gross_pay, income_tax,
                                       social_insurance, universal_charge, net_pay,
                                       tax_credits_used, ytd_gross, ytd_income_tax,
                                       ytd_social_insurance, ytd_universal_charge, ytd_net)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(run_id)
            .bind(slip.employee_id)
            .bind(decimal_to_text(slip.gross_pay))
            .bind(decimal_to_text(slip.income_tax))
            .bind(decimal_to_text(slip.social_insurance))
            .bind(decimal_to_text(slip.universal_charge))
            .bind(decimal_to_text(slip.net_pay))
            .bind(decimal_to_text(slip.tax_credits_used))
            .bind(decimal_to_text(slip.ytd.gross))
            .bind(decimal_to_text(slip.ytd.income_tax))
            .bind(decimal_to_text(slip.ytd.social_insurance))
            .bind(decimal_to_text(slip.ytd.universal_charge))
            .bind(decimal_to_text(slip.ytd.net))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        debug!(run_id, payslips = run.payslips().len(), "payroll run committed");

        self.get_payroll_run(run_id).await
    }

    async fn get_payroll_run(
        &self,
        id: i64,
    ) -> Result<PayrollRun, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payroll_runs WHERE id = ?",
            PAYROLL_RUN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        self.row_to_payroll_run(&row).await
    }

    async fn list_payroll_runs(&self) -> Result<Vec<PayrollRun>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM payroll_runs ORDER BY pay_period_end DESC, id DESC",
            PAYROLL_RUN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut runs = Vec::with_capacity(rows.len());
        for row in &rows {
            runs.push(self.row_to_payroll_run(row).await?);
        }
        Ok(runs)
    }

    async fn update_payroll_status(
        &self,
        id: i64,
        status: PayrollStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE payroll_runs SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
