use crate::errors::FeatureError;
use crate::models::{ApplicantYearAggregate, BranchCode, BrandCounts, ClassifiedRow};
use crate::star_rating::StarRatingTable;
use chrono::{Datelike, NaiveDateTime};
use std::collections::BTreeMap;

/// Aggregates classified tax-report rows into one row per
/// (applicant, inquiry timestamp).
///
/// Grouping keys are significant; output order is not. The declared branch
/// of the current loan is carried through, not aggregated: the first value
/// observed per group wins, and later disagreement is a data-quality
/// warning (or a hard error when strict grouping is enabled).
#[derive(Debug)]
pub struct HistoryAggregator {
    stars: StarRatingTable,
    strict_grouping: bool,
}

#[derive(Default)]
struct GroupState {
    number_declaration: u32,
    number_tax_refund: u32,
    brand_counts: BrandCounts,
    branch_code_pl: Option<BranchCode>,
    branch_code_pl_seen: bool,
}

impl HistoryAggregator {
    pub fn new(strict_grouping: bool) -> Self {
        HistoryAggregator {
            stars: StarRatingTable::new(),
            strict_grouping,
        }
    }

    /// Groups by (cpf, timestamp) and computes counts, star rating and
    /// per-brand one-hot sums.
    pub fn aggregate(
        &self,
        rows: &[ClassifiedRow],
    ) -> Result<Vec<ApplicantYearAggregate>, FeatureError> {
        let mut groups: BTreeMap<(String, NaiveDateTime), GroupState> = BTreeMap::new();

        for classified in rows {
            let row = &classified.row;
            let key = (row.cpf.clone(), row.time_stamp);
            let state = groups.entry(key).or_default();

            state.number_declaration += 1;
            state.number_tax_refund += u32::from(classified.status.tax_refund);

            // Rows outside the brand vocabulary stay in the group but
            // contribute to no one-hot column.
            if let Some(code) = row.branch_code {
                state.brand_counts.record(code);
            }

            if !state.branch_code_pl_seen {
                state.branch_code_pl = row.branch_code_pl;
                state.branch_code_pl_seen = true;
            } else if state.branch_code_pl != row.branch_code_pl {
                let detail = format!(
                    "declared branch {:?} at {} disagrees with first-seen {:?}",
                    row.branch_code_pl, row.time_stamp, state.branch_code_pl
                );
                if self.strict_grouping {
                    return Err(FeatureError::AmbiguousGroupKey {
                        cpf: row.cpf.clone(),
                        detail,
                    });
                }
                tracing::warn!("Ambiguous declared branch for {}: {}", row.cpf, detail);
            }
        }

        let aggregates = groups
            .into_iter()
            .map(|((cpf, time_stamp), state)| {
                let stars = self
                    .stars
                    .rating(state.number_declaration, state.number_tax_refund);

                ApplicantYearAggregate {
                    cpf,
                    time_stamp,
                    year: time_stamp.year(),
                    number_declaration: state.number_declaration,
                    number_tax_refund: state.number_tax_refund,
                    stars,
                    brand_counts: state.brand_counts,
                    branch_code_pl: state.branch_code_pl,
                }
            })
            .collect();

        Ok(aggregates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExplodedYearRow, IrpfStatusFlags};
    use chrono::NaiveDate;

    fn row(cpf: &str, day: u32, branch: Option<BranchCode>, pl: Option<BranchCode>) -> ExplodedYearRow {
        ExplodedYearRow {
            cpf: cpf.to_string(),
            person_id: cpf.to_string(),
            loan_id: "L1".to_string(),
            irpf_id: "I1".to_string(),
            time_stamp: NaiveDate::from_ymd_opt(2020, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            product_code: "P".to_string(),
            report_year: "2018".to_string(),
            full_status_text: None,
            bank: None,
            branch: None,
            bank_code: None,
            branch_code: branch,
            bank_code_pl: "001".to_string(),
            branch_number_pl: "0001".to_string(),
            branch_code_pl: pl,
        }
    }

    fn classified(row: ExplodedYearRow, tax_refund: u8) -> ClassifiedRow {
        ClassifiedRow {
            row,
            status: IrpfStatusFlags {
                extraction_error: 0,
                not_declared: 0,
                tax_refund,
                tax_to_pay: u8::from(tax_refund == 0),
            },
        }
    }

    #[test]
    fn counts_and_refunds_per_group() {
        let agg = HistoryAggregator::new(false);
        let rows = vec![
            classified(row("A1", 1, Some(BranchCode::Hsbc), Some(BranchCode::Pers)), 1),
            classified(row("A1", 1, Some(BranchCode::Hsbc), Some(BranchCode::Pers)), 0),
            classified(row("B2", 1, None, None), 1),
        ];

        let result = agg.aggregate(&rows).unwrap();
        assert_eq!(result.len(), 2);

        let a1 = &result[0];
        assert_eq!(a1.cpf, "A1");
        assert_eq!(a1.number_declaration, 2);
        assert_eq!(a1.number_tax_refund, 1);
        assert_eq!(a1.year, 2020);
        assert_eq!(a1.brand_counts.get(BranchCode::Hsbc), 2);
        assert_eq!(a1.branch_code_pl, Some(BranchCode::Pers));

        let b2 = &result[1];
        assert_eq!(b2.number_declaration, 1);
        assert_eq!(b2.brand_counts.iter().map(|(_, n)| n).sum::<u32>(), 0);
    }

    #[test]
    fn stars_come_from_rating_table() {
        let agg = HistoryAggregator::new(false);
        let rows: Vec<ClassifiedRow> = (0..4)
            .map(|i| classified(row("A1", 1, None, None), u8::from(i < 3)))
            .collect();

        let result = agg.aggregate(&rows).unwrap();
        // 4 declarations, 3 refunds maps to 2 stars in the triangular table.
        assert_eq!(result[0].stars, 2);
    }

    #[test]
    fn first_declared_branch_wins_on_disagreement() {
        let agg = HistoryAggregator::new(false);
        let rows = vec![
            classified(row("A1", 1, None, Some(BranchCode::Pers)), 0),
            classified(row("A1", 1, None, Some(BranchCode::Hsbc)), 0),
        ];

        let result = agg.aggregate(&rows).unwrap();
        assert_eq!(result[0].branch_code_pl, Some(BranchCode::Pers));
    }

    #[test]
    fn strict_grouping_rejects_disagreement() {
        let agg = HistoryAggregator::new(true);
        let rows = vec![
            classified(row("A1", 1, None, Some(BranchCode::Pers)), 0),
            classified(row("A1", 1, None, Some(BranchCode::Hsbc)), 0),
        ];

        let result = agg.aggregate(&rows);
        assert!(matches!(
            result,
            Err(FeatureError::AmbiguousGroupKey { .. })
        ));
    }
}
