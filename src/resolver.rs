use crate::errors::FeatureError;
use crate::income_table::PresumedIncomeTable;
use crate::models::BranchCode;

/// Brand token under which the applicant's own declaration count is stored.
pub const SELF_DECLARATION_TOKEN: &str = "ESTR";

/// Counts are bucketed 0–7; 7 means "7 or more".
const MAX_VALUE_BUCKET: i64 = 7;

/// Bucket consulted for the declared branch when the applicant has any
/// self-declaration history.
const AT_LEAST_ONE_BUCKET: i64 = 1;

/// Resolves the presumed income for one applicant-year from the lookup
/// table.
///
/// The answer is the maximum over all candidate incomes: presumed income
/// reflects the most favorable evidence across brand histories and
/// self-declaration, not an average or a single primary source.
#[derive(Debug)]
pub struct PresumedIncomeResolver {
    table: PresumedIncomeTable,
}

impl PresumedIncomeResolver {
    pub fn new(table: PresumedIncomeTable) -> Self {
        PresumedIncomeResolver { table }
    }

    pub fn table(&self) -> &PresumedIncomeTable {
        &self.table
    }

    /// Resolves one row.
    ///
    /// `brand_values` carries the per-brand declaration counts plus the
    /// `ESTR` star rating. A missing year/brand/bucket entry for any of
    /// them is fatal for the row: the lookup table is incomplete for data
    /// actually observed, which is a modeling error rather than a routine
    /// absence. Only the declared-branch side lookup may default to 0.
    pub fn resolve(
        &self,
        year: i32,
        brand_values: &[(&str, i64)],
        declared_branch: Option<BranchCode>,
    ) -> Result<f64, FeatureError> {
        let year_bucket = self
            .table
            .year_bucket(year)
            .ok_or(FeatureError::YearBucketUnavailable { year })?;

        let mut candidates: Vec<f64> = Vec::with_capacity(brand_values.len() + 1);

        for (brand, value) in brand_values {
            let bucket = (*value).min(MAX_VALUE_BUCKET);
            let income = self.table.income(year_bucket, brand, bucket).ok_or(
                FeatureError::MissingIncomeEntry {
                    year_bucket,
                    brand: (*brand).to_string(),
                    bucket,
                },
            )?;
            candidates.push(income);
        }

        let self_declarations = brand_values
            .iter()
            .find(|(brand, _)| *brand == SELF_DECLARATION_TOKEN)
            .map(|(_, value)| *value)
            .unwrap_or(0);

        if self_declarations > 0 {
            let declared_income = declared_branch
                .and_then(|branch| {
                    self.table
                        .income(year_bucket, branch.as_str(), AT_LEAST_ONE_BUCKET)
                })
                .unwrap_or(0.0);
            candidates.push(declared_income);
        }

        if candidates.is_empty() {
            return Err(FeatureError::UnresolvableIncome { year });
        }

        Ok(candidates.into_iter().fold(f64::MIN, f64::max))
    }
}
