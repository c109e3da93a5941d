//! fluxalloc - Attribute billed income and operating costs to categories

use clap::Parser;
use fluxalloc::{
    category::CategoryKey,
    cli::{Cli, Command},
    engine::AllocationEngine,
    error::Result,
    output::get_formatter,
    snapshot::{SnapshotLoader, SnapshotRepository},
};
use fluxalloc_core::{EngineConfig, IdFilter, TracingReporter};
use fluxalloc_valuation::ValueCalculator;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The --quiet flag overrides RUST_LOG.
    let filter = if cli.quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("fluxalloc=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = EngineConfig::from_cli(cli.currency.as_deref())?;
    let filters = cli.report_filters()?;

    let loader = SnapshotLoader::discover(cli.snapshot.clone())?;
    let snapshot = loader.load().await?;
    let calculator = Arc::new(ValueCalculator::new(Arc::new(snapshot.rate_table())));
    let repository = SnapshotRepository::new(snapshot);

    info!(
        "Allocating in {} from {}",
        config.default_currency,
        loader.path().display()
    );
    let engine = AllocationEngine::new(&repository, filters, config, calculator, &TracingReporter)?;
    let formatter = get_formatter(cli.compact);

    let output = match cli.command {
        Command::Totals => formatter.format_totals(&engine.totals_by_month()),

        Command::Income { by, with_fixed_sum } => {
            let allowed = match by {
                CategoryKey::User => engine.filters().users.clone(),
                _ => IdFilter::All,
            };
            let mut income = engine.income_by_logs(by, &allowed)?;
            if with_fixed_sum && by == CategoryKey::User {
                income.merge(&engine.fixed_sum_income());
                income.merge(&engine.fixed_sum_no_logs_income()?);
            }
            formatter.format_income(by, &income, &engine.overage_failures())
        }

        Command::Billed { by } => {
            let allowed = match by {
                CategoryKey::Project => engine.filters().projects.clone(),
                _ => IdFilter::All,
            };
            let income = engine.income_by_billed_value(by, &allowed)?;
            formatter.format_income(by, &income, &engine.overage_failures())
        }

        Command::Costs { raw } => {
            let costs = if raw {
                engine.user_costs()
            } else {
                engine.attributed_costs()?
            };
            formatter.format_costs(&CategoryKey::User.to_string(), &costs)
        }

        Command::CategoryCosts { by } => {
            formatter.format_costs(&by.to_string(), &engine.category_costs_by_logs(by))
        }
    };

    println!("{output}");
    Ok(())
}
