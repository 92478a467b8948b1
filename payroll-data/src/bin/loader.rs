use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use payroll_data::{EmployeeLoader, TaxBandLoader};
use payroll_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Load tax bands and/or employees from CSV files into the payroll database.
///
/// Band CSV columns: tax_year, tax_kind (PAYE or USC), band_name,
/// income_lower, income_upper (empty for the top band), rate, effective_from,
/// effective_to.
///
/// Employee CSV columns: pps_number, first_name, last_name, gross_salary,
/// pay_frequency (weekly or monthly), tax_credits_annual.
#[derive(Parser, Debug)]
#[command(name = "payroll-data-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// CSV file of tax bands; replaces the stored bands of each year and kind it contains
    #[arg(short, long)]
    bands: Option<PathBuf>,

    /// CSV file of employees to add
    #[arg(short, long)]
    employees: Option<PathBuf>,

    /// SQLite database (path or sqlite: URL); created if missing
    #[arg(short, long, default_value = "payroll.db")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Run seed files from the specified directory after migrations
    #[arg(short, long)]
    seeds: Option<PathBuf>,
}

/// Honours `RUST_LOG`, otherwise only warnings; progress goes to stdout.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::from("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    if args.bands.is_none() && args.employees.is_none() && !args.migrate && args.seeds.is_none() {
        bail!("nothing to do: pass --bands, --employees, --migrate or --seeds");
    }

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    if let Some(seeds_dir) = &args.seeds {
        println!("Running seeds from: {}", seeds_dir.display());
        repo.run_seeds(seeds_dir)
            .await
            .with_context(|| format!("Failed to run seeds from: {}", seeds_dir.display()))?;
        println!("Seeds complete.");
    }

    if let Some(path) = &args.bands {
        println!("Loading tax bands from: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = TaxBandLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;
        println!("Parsed {} records from CSV", records.len());

        let inserted = TaxBandLoader::load(&repo, &records)
            .await
            .context("Failed to load tax bands into database")?;
        println!("Successfully loaded {} tax bands.", inserted);
    }

    if let Some(path) = &args.employees {
        println!("Loading employees from: {}", path.display());
        let file =
            File::open(path).with_context(|| format!("Failed to open: {}", path.display()))?;
        let records = EmployeeLoader::parse(file)
            .with_context(|| format!("Failed to parse CSV: {}", path.display()))?;

        let created = EmployeeLoader::load(&repo, &records)
            .await
            .context("Failed to load employees into database")?;
        for employee in &created {
            println!("  #{:<4} {} ({})", employee.id, employee.full_name(), employee.pps_number);
        }
        println!("Successfully loaded {} employees.", created.len());
    }

    Ok(())
}
