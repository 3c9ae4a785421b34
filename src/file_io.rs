use crate::config::Config;
use crate::errors::{FeatureError, ResultExt};
use crate::income_table::PresumedIncomeTable;
use crate::models::{
    ApplicationRecord, BankReferenceRow, BranchReferenceRow, FeatureRow, TaxReportPayload,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// External collaborator the pipeline loads sources from and exports
/// features to.
///
/// The pipeline only ever sees this trait; the file-backed implementation
/// below is interchangeable with any other source of the same tables.
pub trait DatasetStore {
    fn load_applications(&self) -> Result<Vec<ApplicationRecord>, FeatureError>;
    fn load_bank_reference(&self) -> Result<Vec<BankReferenceRow>, FeatureError>;
    fn load_branch_reference(&self) -> Result<Vec<BranchReferenceRow>, FeatureError>;
    fn load_income_table(&self) -> Result<PresumedIncomeTable, FeatureError>;
    fn export_features(&self, rows: &[FeatureRow]) -> Result<(), FeatureError>;
}

/// Filesystem-backed store: semicolon-delimited CSV for the applications
/// and output tables, plain CSV for the reference tables, JSON for the
/// income lookup table.
#[derive(Debug, Clone)]
pub struct FileStore {
    applications_path: PathBuf,
    bank_reference_path: PathBuf,
    branch_reference_path: PathBuf,
    income_table_path: PathBuf,
    output_path: PathBuf,
}

impl FileStore {
    pub fn from_config(config: &Config) -> Self {
        FileStore {
            applications_path: config.applications_path.clone(),
            bank_reference_path: config.bank_reference_path.clone(),
            branch_reference_path: config.branch_reference_path.clone(),
            income_table_path: config.income_table_path.clone(),
            output_path: config.output_path.clone(),
        }
    }
}

/// Applications CSV row before payload parsing and normalization.
#[derive(Debug, Deserialize)]
struct RawApplicationRow {
    person_id: String,
    loan_id: String,
    irpf_id: String,
    time_stamp: String,
    product_code: String,
    state: String,
    rev: String,
    #[serde(rename = "riskInfo")]
    risk_info: String,
    bank_code_pl: String,
    branch_number_pl: String,
}

/// Left-pads a numeric code with zeros up to `width`.
fn zero_fill(value: &str, width: usize) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= width {
        trimmed.to_string()
    } else {
        format!("{:0>width$}", trimmed, width = width)
    }
}

/// Parses the timestamp formats the upstream extraction emits: RFC 3339,
/// `YYYY-MM-DD HH:MM:SS`, or a bare date.
fn parse_timestamp(value: &str) -> Result<NaiveDateTime, FeatureError> {
    let trimmed = value.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }

    Err(FeatureError::InvalidRecord(format!(
        "unparseable time_stamp '{}'",
        value
    )))
}

impl RawApplicationRow {
    fn into_record(self) -> Result<ApplicationRecord, FeatureError> {
        let time_stamp = parse_timestamp(&self.time_stamp)?;

        let risk_info: BTreeMap<String, TaxReportPayload> = serde_json::from_str(&self.risk_info)
            .map_err(|e| {
            FeatureError::InvalidRecord(format!(
                "riskInfo for loan {} is not a year-keyed object: {}",
                self.loan_id, e
            ))
        })?;

        Ok(ApplicationRecord {
            person_id: self.person_id,
            loan_id: self.loan_id,
            irpf_id: self.irpf_id,
            time_stamp,
            product_code: self.product_code,
            state: self.state,
            rev: self.rev,
            risk_info,
            bank_code_pl: zero_fill(&self.bank_code_pl, 3),
            branch_number_pl: zero_fill(&self.branch_number_pl, 4),
        })
    }
}

fn read_csv<T: serde::de::DeserializeOwned>(
    path: &Path,
    delimiter: u8,
) -> Result<Vec<T>, FeatureError> {
    let file = File::open(path)
        .map_err(FeatureError::Io)
        .with_context(|| format!("opening '{}'", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut rows = Vec::new();
    for row in reader.deserialize::<T>() {
        rows.push(row.with_context(|| format!("reading '{}'", path.display()))?);
    }
    Ok(rows)
}

impl DatasetStore for FileStore {
    fn load_applications(&self) -> Result<Vec<ApplicationRecord>, FeatureError> {
        tracing::info!(
            "Loading applications from '{}'",
            self.applications_path.display()
        );
        let raw: Vec<RawApplicationRow> = read_csv(&self.applications_path, b';')?;
        raw.into_iter().map(RawApplicationRow::into_record).collect()
    }

    fn load_bank_reference(&self) -> Result<Vec<BankReferenceRow>, FeatureError> {
        tracing::info!(
            "Loading bank reference from '{}'",
            self.bank_reference_path.display()
        );
        read_csv(&self.bank_reference_path, b',')
    }

    fn load_branch_reference(&self) -> Result<Vec<BranchReferenceRow>, FeatureError> {
        tracing::info!(
            "Loading branch reference from '{}'",
            self.branch_reference_path.display()
        );
        read_csv(&self.branch_reference_path, b',')
    }

    fn load_income_table(&self) -> Result<PresumedIncomeTable, FeatureError> {
        tracing::info!(
            "Loading income lookup table from '{}'",
            self.income_table_path.display()
        );
        PresumedIncomeTable::from_path(&self.income_table_path)
            .with_context(|| format!("loading '{}'", self.income_table_path.display()))
    }

    fn export_features(&self, rows: &[FeatureRow]) -> Result<(), FeatureError> {
        tracing::info!(
            "Exporting {} feature row(s) to '{}'",
            rows.len(),
            self.output_path.display()
        );

        let file = File::create(&self.output_path)
            .map_err(FeatureError::Io)
            .with_context(|| format!("creating '{}'", self.output_path.display()))?;

        let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(file);
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("writing '{}'", self.output_path.display()))?;
        }
        writer.flush().map_err(FeatureError::Io)?;

        Ok(())
    }
}
