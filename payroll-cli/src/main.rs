use anyhow::Context;
use clap::Parser;
use tracing::debug;

use payroll_cli::{Cli, build_registry, execute, logging};
use payroll_core::PayrollService;
use payroll_core::db::DbConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&logging::LogOptions {
        level: cli.log_level.as_deref(),
        file: cli.log_file.as_deref(),
        quiet: cli.quiet,
    })?;

    let db_config = DbConfig {
        backend: cli.backend,
        connection_string: cli.db,
    };

    debug!("connecting to {} backend", db_config.backend);
    let registry = build_registry();
    let repo = registry
        .create(&db_config)
        .await
        .with_context(|| format!("Failed to open database: {}", db_config.connection_string))?;
    let service = PayrollService::new(repo);

    let report = execute(&service, cli.command).await?;
    print!("{report}");

    Ok(())
}
