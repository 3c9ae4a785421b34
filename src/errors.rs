use std::fmt;

/// Feature-engine error types.
#[derive(Debug)]
pub enum FeatureError {
    /// Filesystem error while loading or exporting a dataset.
    Io(std::io::Error),
    /// CSV parsing or writing error.
    Csv(csv::Error),
    /// JSON parsing error (riskInfo payloads, lookup table).
    Json(serde_json::Error),
    /// A source row that cannot be interpreted (bad timestamp, bad bucket key).
    InvalidRecord(String),
    /// No lookup-table year is less than or equal to the query year.
    YearBucketUnavailable {
        /// Year the caller asked for.
        year: i32,
    },
    /// A year/brand/bucket combination observed in the data is absent from
    /// the lookup table. Fatal for the row: the table is incomplete.
    MissingIncomeEntry {
        /// Resolved year bucket.
        year_bucket: i32,
        /// Brand token of the failed lookup.
        brand: String,
        /// Clamped value bucket of the failed lookup.
        bucket: i64,
    },
    /// The resolver's candidate set came out empty.
    UnresolvableIncome {
        /// Year the resolution was attempted for.
        year: i32,
    },
    /// More than one declared branch observed within a single group
    /// (raised only when strict grouping is enabled).
    AmbiguousGroupKey {
        /// Applicant the group belongs to.
        cpf: String,
        /// Human-readable description of the disagreement.
        detail: String,
    },
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<FeatureError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for FeatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureError::Io(e) => write!(f, "I/O error: {}", e),
            FeatureError::Csv(e) => write!(f, "CSV error: {}", e),
            FeatureError::Json(e) => write!(f, "JSON error: {}", e),
            FeatureError::InvalidRecord(msg) => write!(f, "Invalid record: {}", msg),
            FeatureError::YearBucketUnavailable { year } => {
                write!(f, "No lookup-table year at or below {}", year)
            }
            FeatureError::MissingIncomeEntry {
                year_bucket,
                brand,
                bucket,
            } => write!(
                f,
                "Lookup table has no entry for year {} brand {} bucket {}",
                year_bucket, brand, bucket
            ),
            FeatureError::UnresolvableIncome { year } => {
                write!(f, "Empty presumed-income candidate set for year {}", year)
            }
            FeatureError::AmbiguousGroupKey { cpf, detail } => {
                write!(f, "Ambiguous declared branch for {}: {}", cpf, detail)
            }
            FeatureError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for FeatureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeatureError::Io(e) => Some(e),
            FeatureError::Csv(e) => Some(e),
            FeatureError::Json(e) => Some(e),
            FeatureError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FeatureError {
    fn from(err: std::io::Error) -> Self {
        FeatureError::Io(err)
    }
}

impl From<csv::Error> for FeatureError {
    fn from(err: csv::Error) -> Self {
        FeatureError::Csv(err)
    }
}

impl From<serde_json::Error> for FeatureError {
    fn from(err: serde_json::Error) -> Self {
        FeatureError::Json(err)
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `FeatureError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, FeatureError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, FeatureError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, FeatureError> {
    fn context(self, context: impl Into<String>) -> Result<T, FeatureError> {
        self.map_err(|e| FeatureError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, FeatureError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FeatureError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for csv::Error results to add context directly.
impl<T> ResultExt<T> for Result<T, csv::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, FeatureError> {
        self.map_err(|e| FeatureError::WithContext {
            source: Box::new(FeatureError::Csv(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, FeatureError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FeatureError::WithContext {
            source: Box::new(FeatureError::Csv(e)),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_and_displays_chain() {
        let base: Result<(), FeatureError> = Err(FeatureError::YearBucketUnavailable { year: 2012 });
        let wrapped = base.context("resolving cpf 123");
        let msg = wrapped.unwrap_err().to_string();
        assert!(msg.starts_with("resolving cpf 123: "));
        assert!(msg.contains("2012"));
    }

    #[test]
    fn with_context_is_lazy_on_ok() {
        let ok: Result<u8, FeatureError> = Ok(7);
        let value = ok
            .with_context(|| unreachable!("must not be evaluated on Ok"))
            .unwrap();
        assert_eq!(value, 7);
    }
}
