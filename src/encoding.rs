// src/encoding.rs

//! Ordinal encoding of categorical target labels.
//!
//! The default table covers AJCC pathologic stages:
//!
//! | labels                                              | ordinal |
//! |-----------------------------------------------------|---------|
//! | `stage 0`, `stage tis`                              | 0       |
//! | `stage i`, `stage ia`, `stage ib`, `stage ic`       | 1       |
//! | `stage ii`, `stage iia`, `stage iib`, `stage iic`   | 2       |
//! | `stage iii`, `stage iiia`, `stage iiib`, `stage iiic` | 3     |
//! | `stage iv`, `stage iva`, `stage ivb`, `stage ivc`   | 4       |
//!
//! Labels are compared after trimming and lowercasing. Anything outside the
//! table (`stage x`, `NA`, `nan`, ...) is handled by the encoder's
//! [`UnknownCategoryPolicy`], which is strict unless configured otherwise.

use log::{debug, warn};
use ndarray::Array1;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, Result};

pub const PATHOLOGIC_STAGE: &str = "pathologic_stage";

const DEFAULT_STAGE_TABLE: &[(&str, f64)] = &[
    ("stage 0", 0.0),
    ("stage tis", 0.0),
    ("stage i", 1.0),
    ("stage ia", 1.0),
    ("stage ib", 1.0),
    ("stage ic", 1.0),
    ("stage ii", 2.0),
    ("stage iia", 2.0),
    ("stage iib", 2.0),
    ("stage iic", 2.0),
    ("stage iii", 3.0),
    ("stage iiia", 3.0),
    ("stage iiib", 3.0),
    ("stage iiic", 3.0),
    ("stage iv", 4.0),
    ("stage iva", 4.0),
    ("stage ivb", 4.0),
    ("stage ivc", 4.0),
];

/// What to do with a label that is not in the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnknownCategoryPolicy {
    /// Fail with `UnknownCategory`.
    Fail,
    /// Map every unrecognized label to this value.
    Bucket(f64),
}

/// An immutable label → ordinal table.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    scheme: String,
    table: HashMap<String, f64>,
    unknown: UnknownCategoryPolicy,
}

/// TOML form of an encoder:
///
/// ```toml
/// scheme = "pathologic_stage"
/// unknown_bucket = -1.0   # omit for strict failure
///
/// [categories]
/// "stage i" = 1
/// "stage ii" = 2
/// ```
#[derive(Debug, Deserialize)]
struct EncodingFile {
    #[serde(default = "default_scheme")]
    scheme: String,
    #[serde(default)]
    unknown_bucket: Option<f64>,
    categories: BTreeMap<String, f64>,
}

fn default_scheme() -> String {
    PATHOLOGIC_STAGE.to_string()
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

impl LabelEncoder {
    pub fn new<I, S>(scheme: &str, categories: I, unknown: UnknownCategoryPolicy) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let table = categories
            .into_iter()
            .map(|(label, value)| (normalize_label(label.as_ref()), value))
            .collect();
        Self {
            scheme: scheme.to_string(),
            table,
            unknown,
        }
    }

    /// The built-in pathologic stage table with strict handling of unknown labels.
    pub fn pathologic_stage() -> Self {
        Self::new(
            PATHOLOGIC_STAGE,
            DEFAULT_STAGE_TABLE.iter().copied(),
            UnknownCategoryPolicy::Fail,
        )
    }

    pub fn with_unknown_policy(mut self, unknown: UnknownCategoryPolicy) -> Self {
        self.unknown = unknown;
        self
    }

    /// Loads an encoder from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| AnalysisError::io(path, e))?;
        let parsed: EncodingFile = toml::from_str(&text).map_err(|e| AnalysisError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let unknown = match parsed.unknown_bucket {
            Some(value) => UnknownCategoryPolicy::Bucket(value),
            None => UnknownCategoryPolicy::Fail,
        };
        debug!(
            "Loaded {} categories for scheme '{}' from {}",
            parsed.categories.len(),
            parsed.scheme,
            path.display()
        );
        Ok(Self::new(&parsed.scheme, parsed.categories, unknown))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn unknown_policy(&self) -> UnknownCategoryPolicy {
        self.unknown
    }

    pub fn encode_one(&self, label: &str) -> Result<f64> {
        match self.table.get(&normalize_label(label)) {
            Some(&value) => Ok(value),
            None => match self.unknown {
                UnknownCategoryPolicy::Fail => Err(AnalysisError::UnknownCategory {
                    label: label.to_string(),
                    scheme: self.scheme.clone(),
                }),
                UnknownCategoryPolicy::Bucket(value) => Ok(value),
            },
        }
    }

    /// Encodes every label, in order.
    ///
    /// # Errors
    /// `UnknownCategory` on the first unrecognized label when the policy is strict.
    pub fn encode<S: AsRef<str>>(&self, labels: &[S]) -> Result<Array1<f64>> {
        let encoded = labels
            .iter()
            .map(|label| self.encode_one(label.as_ref()))
            .collect::<Result<Vec<f64>>>()?;

        if let UnknownCategoryPolicy::Bucket(bucket) = self.unknown {
            let bucketed = labels
                .iter()
                .filter(|label| !self.table.contains_key(&normalize_label(label.as_ref())))
                .count();
            if bucketed > 0 {
                warn!(
                    "{} of {} labels are outside the {} table and were encoded as {}.",
                    bucketed,
                    labels.len(),
                    self.scheme,
                    bucket
                );
            }
        }
        Ok(Array1::from(encoded))
    }
}

/// Parses labels of a numeric target.
pub fn parse_numeric_labels<S: AsRef<str>>(target: &str, labels: &[S]) -> Result<Array1<f64>> {
    labels
        .iter()
        .map(|label| {
            let raw = label.as_ref();
            raw.trim().parse::<f64>().map_err(|_| AnalysisError::InvalidValue {
                context: format!("target '{}'", target),
                value: raw.to_string(),
            })
        })
        .collect::<Result<Vec<f64>>>()
        .map(Array1::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn stages_map_to_ordinals() {
        let encoder = LabelEncoder::pathologic_stage();
        let encoded = encoder
            .encode(&["Stage I", "stage IIB", " stage iiic ", "stage iva", "stage 0"])
            .unwrap();
        assert_eq!(encoded.to_vec(), vec![1.0, 2.0, 3.0, 4.0, 0.0]);
    }

    #[test]
    fn strict_policy_rejects_unknown_labels() {
        let encoder = LabelEncoder::pathologic_stage();
        match encoder.encode(&["stage i", "stage x"]) {
            Err(AnalysisError::UnknownCategory { label, scheme }) => {
                assert_eq!(label, "stage x");
                assert_eq!(scheme, PATHOLOGIC_STAGE);
            }
            other => panic!("expected UnknownCategory, got {:?}", other),
        }
    }

    #[test]
    fn bucket_policy_maps_unknown_labels() {
        let encoder =
            LabelEncoder::pathologic_stage().with_unknown_policy(UnknownCategoryPolicy::Bucket(-1.0));
        let encoded = encoder.encode(&["NA", "stage ii", "nan"]).unwrap();
        assert_eq!(encoded.to_vec(), vec![-1.0, 2.0, -1.0]);
    }

    #[test]
    fn toml_configuration_replaces_the_table() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "scheme = \"grade\"\nunknown_bucket = 0.0\n\n[categories]\n\"g1\" = 1\n\"G2\" = 2.0\n"
        )
        .unwrap();
        let encoder = LabelEncoder::from_toml_file(file.path()).unwrap();
        assert_eq!(encoder.scheme(), "grade");
        assert_eq!(encoder.unknown_policy(), UnknownCategoryPolicy::Bucket(0.0));
        assert_eq!(encoder.encode(&["G1", "g2", "g3"]).unwrap().to_vec(), vec![1.0, 2.0, 0.0]);
    }

    #[test]
    fn numeric_labels_are_parsed() {
        let parsed = parse_numeric_labels("age", &["42", " 37.5"]).unwrap();
        assert_eq!(parsed.to_vec(), vec![42.0, 37.5]);
        assert!(matches!(
            parse_numeric_labels("age", &["old"]),
            Err(AnalysisError::InvalidValue { .. })
        ));
    }
}
