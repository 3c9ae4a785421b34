use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub applications_path: PathBuf,
    pub bank_reference_path: PathBuf,
    pub branch_reference_path: PathBuf,
    pub income_table_path: PathBuf,
    pub output_path: PathBuf,
    /// Upgrade declared-branch disagreements within a group from a
    /// warning to a hard failure.
    pub strict_grouping: bool,
}

fn required_path(var: &str) -> anyhow::Result<PathBuf> {
    std::env::var(var)
        .map_err(|_| anyhow::anyhow!("{} environment variable required", var))
        .and_then(|value| {
            if value.trim().is_empty() {
                anyhow::bail!("{} cannot be empty", var);
            }
            Ok(PathBuf::from(value))
        })
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            applications_path: required_path("IRPF_APPLICATIONS_PATH")?,
            bank_reference_path: required_path("IRPF_BANK_REFERENCE_PATH")?,
            branch_reference_path: required_path("IRPF_BRANCH_REFERENCE_PATH")?,
            income_table_path: required_path("IRPF_INCOME_TABLE_PATH").and_then(|path| {
                if path.extension().map_or(false, |ext| ext == "json") {
                    Ok(path)
                } else {
                    anyhow::bail!("IRPF_INCOME_TABLE_PATH must point at a .json document")
                }
            })?,
            output_path: std::env::var("IRPF_OUTPUT_PATH")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/presumed_income_features.csv")),
            strict_grouping: std::env::var("IRPF_STRICT_GROUPING")
                .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "True"))
                .unwrap_or(false),
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Applications: {}", config.applications_path.display());
        tracing::debug!("Bank reference: {}", config.bank_reference_path.display());
        tracing::debug!(
            "Branch reference: {}",
            config.branch_reference_path.display()
        );
        tracing::debug!("Income table: {}", config.income_table_path.display());
        tracing::debug!("Output: {}", config.output_path.display());
        if config.strict_grouping {
            tracing::info!("Strict grouping enabled");
        }

        Ok(config)
    }
}
