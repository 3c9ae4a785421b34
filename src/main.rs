use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use irpf_presumed_income::config::Config;
use irpf_presumed_income::file_io::FileStore;
use irpf_presumed_income::pipeline::FeaturePipeline;

/// Computes the presumed-income feature table from IRPF declaration
/// history and exports it.
#[derive(Parser, Debug)]
#[command(name = "irpf-presumed-income", version)]
struct Cli {
    /// Applications CSV, overrides IRPF_APPLICATIONS_PATH.
    #[arg(long)]
    applications: Option<PathBuf>,

    /// Bank reference CSV, overrides IRPF_BANK_REFERENCE_PATH.
    #[arg(long)]
    bank_reference: Option<PathBuf>,

    /// Branch reference CSV, overrides IRPF_BRANCH_REFERENCE_PATH.
    #[arg(long)]
    branch_reference: Option<PathBuf>,

    /// Income lookup table JSON, overrides IRPF_INCOME_TABLE_PATH.
    #[arg(long)]
    income_table: Option<PathBuf>,

    /// Output CSV, overrides IRPF_OUTPUT_PATH.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Fail instead of warning when a group carries conflicting declared
    /// branches.
    #[arg(long)]
    strict_grouping: bool,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "irpf_presumed_income=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(path) = cli.applications {
        config.applications_path = path;
    }
    if let Some(path) = cli.bank_reference {
        config.bank_reference_path = path;
    }
    if let Some(path) = cli.branch_reference {
        config.branch_reference_path = path;
    }
    if let Some(path) = cli.income_table {
        config.income_table_path = path;
    }
    if let Some(path) = cli.output {
        config.output_path = path;
    }
    config.strict_grouping = config.strict_grouping || cli.strict_grouping;

    let store = FileStore::from_config(&config);
    let pipeline = FeaturePipeline::new(store, config.strict_grouping);

    let exported = pipeline.run()?;
    tracing::info!("Feature computation complete: {} row(s) exported", exported);

    Ok(())
}
