use crate::errors::FeatureError;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Year-bucketed, brand-keyed presumed-income lookup table.
///
/// Loaded once from a JSON document of the shape
/// `{"2015": {"HSBC": {"0": 1200.0, ...}, ...}, ...}` and immutable for the
/// lifetime of a pipeline run. Year keys are a sparse, sorted set; queries
/// resolve to the greatest year at or below the query year. Every lookup
/// returns an explicit `Option` so a missing entry is never confused with a
/// present zero.
#[derive(Debug, Clone)]
pub struct PresumedIncomeTable {
    /// Sorted ascending; drives `year_bucket` resolution.
    years: Vec<i32>,
    entries: BTreeMap<i32, BTreeMap<String, BTreeMap<i64, f64>>>,
}

impl PresumedIncomeTable {
    /// Reads and validates the table from a JSON document.
    ///
    /// Year keys must parse as integers and value-bucket keys as integers;
    /// anything else is an `InvalidRecord` rather than a silent skip.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeatureError> {
        let raw: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>> =
            serde_json::from_reader(reader)?;

        let mut entries = BTreeMap::new();
        for (year_key, brands) in raw {
            let year: i32 = year_key.parse().map_err(|_| {
                FeatureError::InvalidRecord(format!(
                    "lookup-table year key '{}' is not an integer",
                    year_key
                ))
            })?;

            let mut brand_map = BTreeMap::new();
            for (brand, buckets) in brands {
                let mut bucket_map = BTreeMap::new();
                for (bucket_key, income) in buckets {
                    let bucket: i64 = bucket_key.parse().map_err(|_| {
                        FeatureError::InvalidRecord(format!(
                            "lookup-table bucket key '{}' under {}/{} is not an integer",
                            bucket_key, year_key, brand
                        ))
                    })?;
                    bucket_map.insert(bucket, income);
                }
                brand_map.insert(brand, bucket_map);
            }
            entries.insert(year, brand_map);
        }

        let years: Vec<i32> = entries.keys().copied().collect();
        tracing::debug!(
            "Presumed-income table loaded: {} year bucket(s)",
            years.len()
        );

        Ok(PresumedIncomeTable { years, entries })
    }

    pub fn from_path(path: &Path) -> Result<Self, FeatureError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Convenience for tests and embedded tables.
    pub fn from_value(value: serde_json::Value) -> Result<Self, FeatureError> {
        Self::from_reader(value.to_string().as_bytes())
    }

    /// Sorted year buckets present in the table.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Greatest table year at or below `year`, if any.
    pub fn year_bucket(&self, year: i32) -> Option<i32> {
        let idx = self.years.partition_point(|y| *y <= year);
        if idx == 0 {
            None
        } else {
            Some(self.years[idx - 1])
        }
    }

    /// Income for an exact (year bucket, brand, value bucket) triple.
    ///
    /// `None` means the entry is genuinely absent from the table; the
    /// caller decides whether that is fatal or a defaultable miss.
    pub fn income(&self, year_bucket: i32, brand: &str, bucket: i64) -> Option<f64> {
        self.entries
            .get(&year_bucket)?
            .get(brand)?
            .get(&bucket)
            .copied()
    }

    /// Brand tokens available under one year bucket.
    pub fn brand_tokens(&self, year_bucket: i32) -> Vec<&str> {
        self.entries
            .get(&year_bucket)
            .map(|brands| brands.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> PresumedIncomeTable {
        PresumedIncomeTable::from_value(json!({
            "2018": {"HSBC": {"0": 0.0, "1": 1500.0}},
            "2020": {"HSBC": {"1": 1800.0}},
        }))
        .unwrap()
    }

    #[test]
    fn year_bucket_picks_greatest_at_or_below() {
        let table = sample();
        assert_eq!(table.year_bucket(2019), Some(2018));
        assert_eq!(table.year_bucket(2020), Some(2020));
        assert_eq!(table.year_bucket(2025), Some(2020));
    }

    #[test]
    fn year_bucket_is_none_below_all_keys() {
        let table = sample();
        assert_eq!(table.year_bucket(2017), None);
    }

    #[test]
    fn missing_entry_is_distinct_from_present_zero() {
        let table = sample();
        assert_eq!(table.income(2018, "HSBC", 0), Some(0.0));
        assert_eq!(table.income(2018, "HSBC", 2), None);
        assert_eq!(table.income(2018, "PERS", 1), None);
    }

    #[test]
    fn non_integer_year_key_is_rejected() {
        let result = PresumedIncomeTable::from_value(json!({
            "two-thousand": {"HSBC": {"1": 100.0}},
        }));
        assert!(matches!(result, Err(FeatureError::InvalidRecord(_))));
    }

    #[test]
    fn non_integer_bucket_key_is_rejected() {
        let result = PresumedIncomeTable::from_value(json!({
            "2018": {"HSBC": {"many": 100.0}},
        }));
        assert!(matches!(result, Err(FeatureError::InvalidRecord(_))));
    }
}
