use crate::aggregator::HistoryAggregator;
use crate::classifier::StatusClassifier;
use crate::errors::{FeatureError, ResultExt};
use crate::file_io::DatasetStore;
use crate::models::{
    ApplicationRecord, BankReferenceRow, BranchCode, BranchReferenceRow, ClassifiedRow,
    ExplodedYearRow, FeatureRow,
};
use crate::resolver::{PresumedIncomeResolver, SELF_DECLARATION_TOKEN};
use std::collections::HashMap;

/// Orchestrates the feature computation end to end:
/// load → join → classify → aggregate → resolve → export.
///
/// Each stage is a pure function of the previous stage's output plus the
/// static reference data; stages cannot be skipped because each consumes
/// the concrete output type of the one before it. A pipeline instance
/// carries no cross-run state: every `run` loads fresh sources and a
/// fresh lookup table.
pub struct FeaturePipeline<S: DatasetStore> {
    store: S,
    classifier: StatusClassifier,
    aggregator: HistoryAggregator,
}

struct SourceTables {
    applications: Vec<ApplicationRecord>,
    banks: Vec<BankReferenceRow>,
    branches: Vec<BranchReferenceRow>,
}

impl<S: DatasetStore> FeaturePipeline<S> {
    pub fn new(store: S, strict_grouping: bool) -> Self {
        FeaturePipeline {
            store,
            classifier: StatusClassifier::new(),
            aggregator: HistoryAggregator::new(strict_grouping),
        }
    }

    /// Computes the feature table without exporting it.
    pub fn execute(&self) -> Result<Vec<FeatureRow>, FeatureError> {
        tracing::info!("Step 1: Loading source datasets");
        let sources = self.load_sources()?;
        let resolver = PresumedIncomeResolver::new(self.store.load_income_table()?);

        tracing::info!(
            "Step 2: Exploding riskInfo and joining reference tables ({} application(s))",
            sources.applications.len()
        );
        let exploded = self.explode_and_join(&sources);
        tracing::info!("Exploded into {} year row(s)", exploded.len());

        tracing::info!("Step 3: Classifying tax-status messages");
        let classified = self.classify(exploded);

        tracing::info!("Step 4: Aggregating declaration history per applicant");
        let aggregates = self.aggregator.aggregate(&classified)?;
        tracing::info!("Aggregated into {} applicant group(s)", aggregates.len());

        tracing::info!("Step 5: Resolving presumed income per group");
        let mut features = Vec::with_capacity(aggregates.len());
        for agg in &aggregates {
            let mut brand_values: Vec<(&str, i64)> = Vec::with_capacity(BranchCode::ALL.len() + 1);
            brand_values.push((SELF_DECLARATION_TOKEN, i64::from(agg.stars)));
            for (code, count) in agg.brand_counts.iter() {
                brand_values.push((code.as_str(), i64::from(count)));
            }

            let income = resolver
                .resolve(agg.year, &brand_values, agg.branch_code_pl)
                .with_context(|| {
                    format!(
                        "resolving presumed income for {} at {}",
                        agg.cpf, agg.time_stamp
                    )
                })?;

            features.push(FeatureRow::from_aggregate(agg, income));
        }

        Ok(features)
    }

    /// Computes the feature table and hands it to the export collaborator.
    pub fn run(&self) -> Result<usize, FeatureError> {
        let features = self.execute()?;

        tracing::info!("Step 6: Exporting feature table");
        self.store.export_features(&features)?;

        Ok(features.len())
    }

    fn load_sources(&self) -> Result<SourceTables, FeatureError> {
        Ok(SourceTables {
            applications: self.store.load_applications()?,
            banks: self.store.load_bank_reference()?,
            branches: self.store.load_branch_reference()?,
        })
    }

    /// Flattens each application's year-keyed payloads into one row per
    /// year and left-joins the reference tables twice: once for the
    /// historical bank/branch, once for the current loan's.
    ///
    /// A failed reference join leaves the joined columns `None`; the row
    /// itself is kept.
    fn explode_and_join(&self, sources: &SourceTables) -> Vec<ExplodedYearRow> {
        let mut bank_code_by_name: HashMap<&str, &str> = HashMap::new();
        for bank in &sources.banks {
            bank_code_by_name
                .entry(bank.bank.as_str())
                .or_insert(bank.bank_code.as_str());
        }

        let mut branch_code_by_key: HashMap<(&str, &str), Option<BranchCode>> = HashMap::new();
        for branch in &sources.branches {
            branch_code_by_key
                .entry((branch.bank_code.as_str(), branch.branch.as_str()))
                .or_insert(branch.branch_code);
        }

        let mut rows = Vec::new();
        for record in &sources.applications {
            let branch_code_pl = branch_code_by_key
                .get(&(
                    record.bank_code_pl.as_str(),
                    record.branch_number_pl.as_str(),
                ))
                .copied()
                .flatten();

            for (report_year, payload) in &record.risk_info {
                let bank_code = payload
                    .bank
                    .as_deref()
                    .and_then(|name| bank_code_by_name.get(name).copied());

                let branch_code = match (bank_code, payload.branch.as_deref()) {
                    (Some(code), Some(branch)) => branch_code_by_key
                        .get(&(code, branch))
                        .copied()
                        .flatten(),
                    _ => None,
                };

                rows.push(ExplodedYearRow {
                    cpf: payload
                        .cpf
                        .clone()
                        .unwrap_or_else(|| record.person_id.clone()),
                    person_id: record.person_id.clone(),
                    loan_id: record.loan_id.clone(),
                    irpf_id: record.irpf_id.clone(),
                    time_stamp: record.time_stamp,
                    product_code: record.product_code.clone(),
                    report_year: report_year.clone(),
                    full_status_text: payload.full_status_text.clone(),
                    bank: payload.bank.clone(),
                    branch: payload.branch.clone(),
                    bank_code: bank_code.map(str::to_string),
                    branch_code,
                    bank_code_pl: record.bank_code_pl.clone(),
                    branch_number_pl: record.branch_number_pl.clone(),
                    branch_code_pl,
                });
            }
        }

        rows
    }

    fn classify(&self, rows: Vec<ExplodedYearRow>) -> Vec<ClassifiedRow> {
        rows.into_iter()
            .map(|row| {
                let status = self.classifier.classify(row.full_status_text.as_deref());
                ClassifiedRow { row, status }
            })
            .collect()
    }
}
