use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============ Reference Vocabulary ============

/// Closed vocabulary of bank-brand declaration channels.
///
/// Every branch in the branch reference table maps to one of these tokens
/// (or to none, when the branch is not covered by the reference data).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BranchCode {
    #[serde(rename = "PERS")]
    Pers,
    #[serde(rename = "STIL")]
    Stil,
    #[serde(rename = "PRIM")]
    Prim,
    #[serde(rename = "OUTR")]
    Outr,
    #[serde(rename = "HSBC")]
    Hsbc,
    #[serde(rename = "VANG")]
    Vang,
    #[serde(rename = "UNIC")]
    Unic,
    #[serde(rename = "ESPA")]
    Espa,
    #[serde(rename = "PRIV")]
    Priv,
}

impl BranchCode {
    /// All brand tokens, in the column order used by the feature table.
    pub const ALL: [BranchCode; 9] = [
        BranchCode::Pers,
        BranchCode::Stil,
        BranchCode::Prim,
        BranchCode::Outr,
        BranchCode::Hsbc,
        BranchCode::Vang,
        BranchCode::Unic,
        BranchCode::Espa,
        BranchCode::Priv,
    ];

    /// The uppercase token used in reference data and lookup-table keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchCode::Pers => "PERS",
            BranchCode::Stil => "STIL",
            BranchCode::Prim => "PRIM",
            BranchCode::Outr => "OUTR",
            BranchCode::Hsbc => "HSBC",
            BranchCode::Vang => "VANG",
            BranchCode::Unic => "UNIC",
            BranchCode::Espa => "ESPA",
            BranchCode::Priv => "PRIV",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl FromStr for BranchCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BranchCode::ALL
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or(())
    }
}

impl fmt::Display for BranchCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deserializes a branch code leniently: empty strings and tokens outside
/// the vocabulary become `None` instead of failing the whole row.
pub fn lenient_branch_code<'de, D>(deserializer: D) -> Result<Option<BranchCode>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| BranchCode::from_str(value).ok()))
}

// ============ Source Models ============

/// Per-year payload carried inside an application's `riskInfo` map.
///
/// Every field is optional: the tax-authority extraction may have failed
/// partway, leaving an empty object for that year.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxReportPayload {
    /// CPF the tax report belongs to.
    #[serde(default)]
    pub cpf: Option<String>,
    /// Free-text status message returned by the tax authority.
    #[serde(default)]
    pub full_status_text: Option<String>,
    /// Name of the bank the historical declaration was routed through.
    #[serde(default)]
    pub bank: Option<String>,
    /// Branch number at that bank.
    #[serde(default)]
    pub branch: Option<String>,
}

/// One tax-authority inquiry result for a loan application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationRecord {
    /// Applicant identifier (CPF-equivalent tax ID).
    pub person_id: String,
    /// Loan the inquiry was made for.
    pub loan_id: String,
    /// Identifier of the IRPF inquiry itself.
    pub irpf_id: String,
    /// When the inquiry was made.
    pub time_stamp: NaiveDateTime,
    /// Loan product code.
    pub product_code: String,
    /// Processing state of the inquiry.
    pub state: String,
    /// Revision marker.
    pub rev: String,
    /// Year-keyed tax report payloads. At least one entry per record; a
    /// payload may be an empty object, never null.
    #[serde(rename = "riskInfo")]
    pub risk_info: BTreeMap<String, TaxReportPayload>,
    /// Bank code of the current loan application, zero-filled to 3 digits.
    pub bank_code_pl: String,
    /// Branch number of the current loan application, zero-filled to 4 digits.
    pub branch_number_pl: String,
}

/// Bank reference dimension row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankReferenceRow {
    /// Canonical bank code.
    #[serde(alias = "Codigo_Banco")]
    pub bank_code: String,
    /// Bank display name, the join key against historical payloads.
    #[serde(alias = "BankName")]
    pub bank: String,
}

/// Branch reference dimension row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchReferenceRow {
    /// Bank the branch belongs to.
    #[serde(alias = "Bank")]
    pub bank_code: String,
    /// Branch number.
    #[serde(alias = "Branch")]
    pub branch: String,
    /// Brand token for the branch, absent when the branch is unmapped.
    #[serde(default, deserialize_with = "lenient_branch_code")]
    pub branch_code: Option<BranchCode>,
}

// ============ Pipeline Models ============

/// One row per (application, tax-report year) after exploding `riskInfo`
/// and joining the bank/branch reference tables.
///
/// The joined columns are optional: a code that fails to match the
/// reference tables propagates as `None` rather than dropping the row.
#[derive(Debug, Clone)]
pub struct ExplodedYearRow {
    /// Applicant CPF. Falls back to `person_id` when the year payload
    /// carries no CPF of its own.
    pub cpf: String,
    pub person_id: String,
    pub loan_id: String,
    pub irpf_id: String,
    pub time_stamp: NaiveDateTime,
    pub product_code: String,
    /// The `riskInfo` key, carried through as text.
    pub report_year: String,
    /// Free-text status for this year, if extracted.
    pub full_status_text: Option<String>,
    /// Counterpart bank name from the year payload.
    pub bank: Option<String>,
    /// Counterpart branch number from the year payload.
    pub branch: Option<String>,
    /// Bank code resolved from the bank reference table.
    pub bank_code: Option<String>,
    /// Brand token resolved for the historical bank/branch.
    pub branch_code: Option<BranchCode>,
    pub bank_code_pl: String,
    pub branch_number_pl: String,
    /// Brand token resolved for the current loan's bank/branch.
    pub branch_code_pl: Option<BranchCode>,
}

/// IRPF status flags derived from a single status message.
///
/// All flags are 0/1 integers. `tax_to_pay` is 1 exactly when the other
/// three flags are all 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrpfStatusFlags {
    pub extraction_error: u8,
    pub not_declared: u8,
    pub tax_refund: u8,
    pub tax_to_pay: u8,
}

/// An exploded year row together with its classified status flags.
#[derive(Debug, Clone)]
pub struct ClassifiedRow {
    pub row: ExplodedYearRow,
    pub status: IrpfStatusFlags,
}

/// One-hot sums of historical branch codes over the brand vocabulary.
///
/// Rows whose branch code falls outside the vocabulary (or is unresolved)
/// contribute to no column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BrandCounts {
    counts: [u32; BranchCode::ALL.len()],
}

impl BrandCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of `code`.
    pub fn record(&mut self, code: BranchCode) {
        self.counts[code.index()] += 1;
    }

    /// Count for a single brand.
    pub fn get(&self, code: BranchCode) -> u32 {
        self.counts[code.index()]
    }

    /// Iterates (brand, count) in column order.
    pub fn iter(&self) -> impl Iterator<Item = (BranchCode, u32)> + '_ {
        BranchCode::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

/// Aggregated declaration history for one (applicant, inquiry timestamp).
#[derive(Debug, Clone)]
pub struct ApplicantYearAggregate {
    pub cpf: String,
    pub time_stamp: NaiveDateTime,
    /// Calendar year of the inquiry timestamp. This, not the exploded
    /// report year, drives the income lookup.
    pub year: i32,
    /// Number of tax reports observed for the group.
    pub number_declaration: u32,
    /// Number of those reports flagged as refunded.
    pub number_tax_refund: u32,
    /// Star rating, −1 when the rating table has no entry for the pair.
    pub stars: i8,
    pub brand_counts: BrandCounts,
    /// Brand token declared on the current loan application.
    pub branch_code_pl: Option<BranchCode>,
}

// ============ Output Model ============

/// Final feature row, with presentation column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRow {
    pub cpf: String,
    pub time_stamp: NaiveDateTime,
    pub times_declared: u32,
    pub times_refunded: u32,
    #[serde(rename = "ESTR")]
    pub stars: i8,
    pub year: i32,
    #[serde(rename = "PERS")]
    pub pers: u32,
    #[serde(rename = "STIL")]
    pub stil: u32,
    #[serde(rename = "PRIM")]
    pub prim: u32,
    #[serde(rename = "OUTR")]
    pub outr: u32,
    #[serde(rename = "HSBC")]
    pub hsbc: u32,
    #[serde(rename = "VANG")]
    pub vang: u32,
    #[serde(rename = "UNIC")]
    pub unic: u32,
    #[serde(rename = "ESPA")]
    pub espa: u32,
    #[serde(rename = "PRIV")]
    pub priv_: u32,
    pub branch_declared: Option<BranchCode>,
    pub presumed_income: f64,
}

impl FeatureRow {
    /// Builds the presentation row from an aggregate and its resolved income.
    pub fn from_aggregate(agg: &ApplicantYearAggregate, presumed_income: f64) -> Self {
        let c = &agg.brand_counts;
        FeatureRow {
            cpf: agg.cpf.clone(),
            time_stamp: agg.time_stamp,
            times_declared: agg.number_declaration,
            times_refunded: agg.number_tax_refund,
            stars: agg.stars,
            year: agg.year,
            pers: c.get(BranchCode::Pers),
            stil: c.get(BranchCode::Stil),
            prim: c.get(BranchCode::Prim),
            outr: c.get(BranchCode::Outr),
            hsbc: c.get(BranchCode::Hsbc),
            vang: c.get(BranchCode::Vang),
            unic: c.get(BranchCode::Unic),
            espa: c.get(BranchCode::Espa),
            priv_: c.get(BranchCode::Priv),
            branch_declared: agg.branch_code_pl,
            presumed_income,
        }
    }
}
