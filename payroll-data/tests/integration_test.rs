//! End-to-end tests: CSV loaders into a real SQLite store, then payroll runs
//! through the service.

use chrono::NaiveDate;
use payroll_core::{
    PayPeriod, PayrollError, PayrollRepository, PayrollService, PayrollServiceError, PayrollStatus,
    TaxKind,
};
use payroll_data::{EmployeeLoader, EmployeeLoaderError, TaxBandLoader, TaxBandLoaderError};
use payroll_db_sqlite::SqliteRepository;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

const BANDS_CSV_2025: &str = include_str!("../test-data/tax_bands_2025.csv");
const EMPLOYEES_CSV: &str = include_str!("../test-data/employees.csv");

/// Migrated database with no seed data, as after `--migrate` alone.
async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool).await;
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    repo
}

async fn setup_loaded_service() -> PayrollService {
    let repo = setup_test_db().await;

    let bands = TaxBandLoader::parse(BANDS_CSV_2025.as_bytes()).expect("Failed to parse bands");
    TaxBandLoader::load(&repo, &bands)
        .await
        .expect("Failed to load bands");

    let employees =
        EmployeeLoader::parse(EMPLOYEES_CSV.as_bytes()).expect("Failed to parse employees");
    EmployeeLoader::load(&repo, &employees)
        .await
        .expect("Failed to load employees");

    PayrollService::new(Box::new(repo))
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn january_2025() -> PayPeriod {
    PayPeriod {
        start: date(2025, 1, 1),
        end: date(2025, 1, 31),
        payment_date: date(2025, 1, 31),
    }
}

fn february_2025() -> PayPeriod {
    PayPeriod {
        start: date(2025, 2, 1),
        end: date(2025, 2, 28),
        payment_date: date(2025, 2, 28),
    }
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn test_load_all_2025_bands() {
    let repo = setup_test_db().await;

    let records = TaxBandLoader::parse(BANDS_CSV_2025.as_bytes()).expect("Failed to parse CSV");
    assert_eq!(records.len(), 6);

    let inserted = TaxBandLoader::load(&repo, &records)
        .await
        .expect("Failed to load bands");
    assert_eq!(inserted, 6);

    let paye = repo
        .get_active_tax_bands(2025, TaxKind::IncomeTax)
        .await
        .expect("Failed to get PAYE bands");
    assert_eq!(paye.len(), 2);
    assert_eq!(paye[0].lower_bound, dec!(0));
    assert_eq!(paye[0].upper_bound, Some(dec!(42000)));
    assert_eq!(paye[0].rate, dec!(0.20));
    assert_eq!(paye[1].lower_bound, dec!(42000));
    assert_eq!(paye[1].upper_bound, None);
    assert_eq!(paye[1].rate, dec!(0.40));

    let usc = repo
        .get_active_tax_bands(2025, TaxKind::UniversalCharge)
        .await
        .expect("Failed to get USC bands");
    let rates: Vec<_> = usc.iter().map(|b| b.rate).collect();
    assert_eq!(rates, vec![dec!(0.005), dec!(0.02), dec!(0.04), dec!(0.08)]);

    assert_eq!(repo.list_tax_years().await.unwrap(), vec![2025]);
}

#[tokio::test]
async fn test_band_load_is_idempotent() {
    let repo = setup_test_db().await;
    let records = TaxBandLoader::parse(BANDS_CSV_2025.as_bytes()).unwrap();

    TaxBandLoader::load(&repo, &records).await.unwrap();
    TaxBandLoader::load(&repo, &records).await.unwrap();

    let paye = repo
        .get_active_tax_bands(2025, TaxKind::IncomeTax)
        .await
        .unwrap();
    let usc = repo.get_active_tax_bands(2025, TaxKind::UniversalCharge).await.unwrap();
    assert_eq!(paye.len(), 2);
    assert_eq!(usc.len(), 4);
}

#[tokio::test]
async fn test_invalid_partition_leaves_store_untouched() {
    let repo = setup_test_db().await;
    let good = TaxBandLoader::parse(BANDS_CSV_2025.as_bytes()).unwrap();
    TaxBandLoader::load(&repo, &good).await.unwrap();

    // Gap between 40000 and 42000
    let bad_csv = "\
tax_year,tax_kind,band_name,income_lower,income_upper,rate,effective_from,effective_to
2025,PAYE,Standard rate,0,40000,0.20,2025-01-01,
2025,PAYE,Higher rate,42000,,0.40,2025-01-01,
";
    let bad = TaxBandLoader::parse(bad_csv.as_bytes()).unwrap();
    let result = TaxBandLoader::load(&repo, &bad).await;
    assert!(matches!(
        result,
        Err(TaxBandLoaderError::InvalidBands {
            tax_year: 2025,
            kind: TaxKind::IncomeTax,
            ..
        })
    ));

    let paye = repo
        .get_active_tax_bands(2025, TaxKind::IncomeTax)
        .await
        .unwrap();
    assert_eq!(paye[0].upper_bound, Some(dec!(42000)));
}

#[tokio::test]
async fn test_prsi_rows_are_rejected() {
    let csv = "\
tax_year,tax_kind,band_name,income_lower,income_upper,rate,effective_from,effective_to
2025,PRSI,Class A,0,,0.04,2025-01-01,
";
    let records = TaxBandLoader::parse(csv.as_bytes()).unwrap();
    let repo = setup_test_db().await;

    let result = TaxBandLoader::load(&repo, &records).await;
    assert!(matches!(result, Err(TaxBandLoaderError::NotBanded(TaxKind::SocialInsurance))));
}

#[tokio::test]
async fn test_load_employees() {
    let repo = setup_test_db().await;
    let records = EmployeeLoader::parse(EMPLOYEES_CSV.as_bytes()).unwrap();

    let created = EmployeeLoader::load(&repo, &records).await.unwrap();
    assert_eq!(created.len(), 4);
    assert_eq!(created[0].full_name(), "Aoife Byrne");
    assert_eq!(created[2].tax_credits_annual, dec!(0));

    let active = repo.list_active_employees().await.unwrap();
    assert_eq!(active.len(), 4);
}

#[tokio::test]
async fn test_bad_employee_row_inserts_nothing() {
    let repo = setup_test_db().await;
    let csv = "\
pps_number,first_name,last_name,gross_salary,pay_frequency,tax_credits_annual
1111111A,Sean,Kelly,3000,monthly,3300
2222222B,Ciara,Ryan,3000,fortnightly,3300
";
    let records = EmployeeLoader::parse(csv.as_bytes()).unwrap();

    let result = EmployeeLoader::load(&repo, &records).await;
    assert!(matches!(result, Err(EmployeeLoaderError::UnknownPayFrequency(_))));
    assert!(repo.list_active_employees().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_pps_is_typed_and_inserts_nothing() {
    let repo = setup_test_db().await;
    let records = EmployeeLoader::parse(EMPLOYEES_CSV.as_bytes()).unwrap();
    EmployeeLoader::load(&repo, &records).await.unwrap();

    let csv = "\
pps_number,first_name,last_name,gross_salary,pay_frequency,tax_credits_annual
9999999Z,Orla,Nolan,3000,monthly,3300
1234567T,Aoife,Byrne,50000,monthly,3300
";
    let again = EmployeeLoader::parse(csv.as_bytes()).unwrap();
    let result = EmployeeLoader::load(&repo, &again).await;

    assert!(matches!(
        result,
        Err(EmployeeLoaderError::DuplicatePps(ref pps)) if pps == "1234567T"
    ));
    assert_eq!(repo.list_employees().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_pps_repeated_within_file_is_rejected() {
    let repo = setup_test_db().await;
    let csv = "\
pps_number,first_name,last_name,gross_salary,pay_frequency,tax_credits_annual
1111111A,Sean,Kelly,3000,monthly,3300
1111111A,Sean,Kelly,3100,monthly,3300
";
    let records = EmployeeLoader::parse(csv.as_bytes()).unwrap();

    let result = EmployeeLoader::load(&repo, &records).await;

    assert!(matches!(result, Err(EmployeeLoaderError::DuplicatePps(_))));
    assert!(repo.list_employees().await.unwrap().is_empty());
}

// =============================================================================
// Loaded bands versus seed data
// =============================================================================

const REVISED_USC_CSV: &str = "\
tax_year,tax_kind,band_name,income_lower,income_upper,rate,effective_from,effective_to
2025,USC,Band 1,0,12012,0.005,2025-01-01,2025-12-31
2025,USC,Band 2,12012,27382,0.02,2025-01-01,2025-12-31
2025,USC,Band 3,27382,70044,0.03,2025-01-01,2025-12-31
2025,USC,Band 4,70044,,0.08,2025-01-01,2025-12-31
";

fn seeds_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../payroll-db-sqlite/seeds")
}

#[tokio::test]
async fn test_reseeding_does_not_resurrect_replaced_bands() {
    let repo = setup_test_db().await;
    repo.run_seeds(&seeds_dir()).await.unwrap();

    let revised = TaxBandLoader::parse(REVISED_USC_CSV.as_bytes()).unwrap();
    TaxBandLoader::load(&repo, &revised).await.unwrap();
    repo.run_seeds(&seeds_dir()).await.unwrap();

    let usc = repo
        .get_active_tax_bands(2025, TaxKind::UniversalCharge)
        .await
        .unwrap();
    let bounds: Vec<_> = usc.iter().map(|b| (b.lower_bound, b.rate)).collect();
    assert_eq!(
        bounds,
        vec![
            (dec!(0), dec!(0.005)),
            (dec!(12012), dec!(0.02)),
            (dec!(27382), dec!(0.03)),
            (dec!(70044), dec!(0.08)),
        ]
    );
}

#[tokio::test]
async fn test_bands_loaded_before_first_seed_win() {
    let repo = setup_test_db().await;
    let revised = TaxBandLoader::parse(REVISED_USC_CSV.as_bytes()).unwrap();
    TaxBandLoader::load(&repo, &revised).await.unwrap();

    repo.run_seeds(&seeds_dir()).await.unwrap();

    let usc = repo
        .get_active_tax_bands(2025, TaxKind::UniversalCharge)
        .await
        .unwrap();
    assert_eq!(usc.len(), 4);
    assert_eq!(usc[2].lower_bound, dec!(27382));
    // PAYE had no rows, so it comes from the seed
    let paye = repo
        .get_active_tax_bands(2025, TaxKind::IncomeTax)
        .await
        .unwrap();
    assert_eq!(paye.len(), 2);
}

// =============================================================================
// Payroll runs
// =============================================================================

#[tokio::test]
async fn test_process_payroll_end_to_end() {
    let service = setup_loaded_service().await;

    let run = service
        .process_payroll(january_2025())
        .await
        .expect("payroll run failed");

    assert!(run.id().is_some());
    assert_eq!(run.status(), PayrollStatus::Processed);
    assert_eq!(run.tax_year(), 2025);
    assert_eq!(run.payslips().len(), 4);

    let slips = run.payslips();

    // 50000 monthly, 3300 credits
    assert_eq!(slips[0].income_tax, dec!(8300.00));
    assert_eq!(slips[0].social_insurance, dec!(2000.00));
    assert_eq!(slips[0].universal_charge, dec!(1304.62));
    assert_eq!(slips[0].net_pay, dec!(38395.38));

    // 100000 monthly, 3300 credits
    assert_eq!(slips[1].income_tax, dec!(28300.00));
    assert_eq!(slips[1].social_insurance, dec!(4000.00));
    assert_eq!(slips[1].universal_charge, dec!(4502.86));
    assert_eq!(slips[1].net_pay, dec!(63197.14));

    // Weekly, exactly at the threshold
    assert_eq!(slips[2].social_insurance, dec!(14.08));
    // Weekly, one cent under
    assert_eq!(slips[3].social_insurance, dec!(0));
    assert_eq!(slips[3].income_tax, dec!(70.40));

    let totals = run.totals();
    assert_eq!(totals.gross, dec!(150703.99));
    assert_eq!(
        totals.net,
        slips.iter().map(|s| s.net_pay).sum::<rust_decimal::Decimal>()
    );
}

#[tokio::test]
async fn test_run_round_trips_through_store() {
    let service = setup_loaded_service().await;
    let run = service.process_payroll(january_2025()).await.unwrap();
    let id = run.id().unwrap();

    let loaded = service.get_payroll(id).await.unwrap();
    assert_eq!(loaded.period(), run.period());
    assert_eq!(loaded.status(), PayrollStatus::Processed);
    assert_eq!(loaded.payslips(), run.payslips());
    assert_eq!(loaded.totals(), run.totals());

    let listed = service.list_payrolls().await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_second_run_accumulates_ytd() {
    let service = setup_loaded_service().await;
    service.process_payroll(january_2025()).await.unwrap();

    let february = service.process_payroll(february_2025()).await.unwrap();
    let slip = &february.payslips()[0];

    assert_eq!(slip.ytd.gross, dec!(100000.00));
    assert_eq!(slip.ytd.income_tax, dec!(16600.00));
    assert_eq!(slip.ytd.net, dec!(76790.76));
}

#[tokio::test]
async fn test_duplicate_period_is_rejected() {
    let service = setup_loaded_service().await;
    service.process_payroll(january_2025()).await.unwrap();

    let result = service.process_payroll(january_2025()).await;
    assert!(matches!(
        result,
        Err(PayrollServiceError::Payroll(PayrollError::PreconditionFailed(_)))
    ));
    assert_eq!(service.list_payrolls().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_roster_persists_nothing() {
    let repo = setup_test_db().await;
    let bands = TaxBandLoader::parse(BANDS_CSV_2025.as_bytes()).unwrap();
    TaxBandLoader::load(&repo, &bands).await.unwrap();
    let service = PayrollService::new(Box::new(repo));

    let result = service.process_payroll(january_2025()).await;
    assert!(matches!(
        result,
        Err(PayrollServiceError::Payroll(PayrollError::PreconditionFailed(_)))
    ));
    assert!(service.list_payrolls().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_year_configuration() {
    let service = setup_loaded_service().await;
    let period = PayPeriod {
        start: date(2026, 1, 1),
        end: date(2026, 1, 31),
        payment_date: date(2026, 1, 31),
    };

    let result = service.process_payroll(period).await;
    assert!(matches!(
        result,
        Err(PayrollServiceError::Payroll(PayrollError::ConfigurationMissing {
            tax_year: 2026,
            ..
        }))
    ));
    assert!(service.list_payrolls().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_mark_paid_is_terminal() {
    let service = setup_loaded_service().await;
    let run = service.process_payroll(january_2025()).await.unwrap();
    let id = run.id().unwrap();

    let paid = service.mark_paid(id).await.unwrap();
    assert_eq!(paid.status(), PayrollStatus::Paid);
    assert_eq!(
        service.get_payroll(id).await.unwrap().status(),
        PayrollStatus::Paid
    );

    let again = service.mark_paid(id).await;
    assert!(matches!(
        again,
        Err(PayrollServiceError::Payroll(PayrollError::PreconditionFailed(_)))
    ));
}
