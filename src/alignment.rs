// src/alignment.rs

//! Joining clinical attributes onto the sample order of an embedding.
//!
//! The join is keyed on sample identifiers. Clinical rows may come in any
//! order and may include samples the embedding does not have, and vice versa.
//! Output rows always follow the embedding: a sample with no clinical record
//! gets a row of [`MISSING_SENTINEL`], and any copied value that reads `nan`
//! is replaced by the sentinel too. The two cases are indistinguishable in the
//! output.

use log::{debug, info, warn};
use ndarray::{Array2, Axis};
use std::collections::HashMap;
use std::path::Path;

use crate::container::TensorContainer;
use crate::error::{AnalysisError, Result};

/// Placeholder for unmatched samples and missing values.
pub const MISSING_SENTINEL: &str = "NA";

const NAN_TEXT: &str = "nan";

/// Tensor names inside a clinical container.
pub const CLINICAL_DATA: &str = "/data";
pub const CLINICAL_FIELDS: &str = "/index";
pub const CLINICAL_SAMPLES: &str = "/columns";

/// Clinical values for the requested fields, one row per clinical record.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicalTable {
    pub sample_ids: Vec<String>,
    pub fields: Vec<String>,
    /// records x fields
    pub values: Array2<String>,
}

/// Clinical values in embedding order.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedClinical {
    pub fields: Vec<String>,
    /// target samples x fields
    pub values: Array2<String>,
    pub matched: usize,
    pub unmatched: usize,
    pub duplicate_keys: usize,
}

impl ClinicalTable {
    pub fn new(sample_ids: Vec<String>, fields: Vec<String>, values: Array2<String>) -> Result<Self> {
        if values.nrows() != sample_ids.len() {
            return Err(AnalysisError::shape(
                "clinical rows vs clinical sample ids",
                sample_ids.len(),
                values.nrows(),
            ));
        }
        if values.ncols() != fields.len() {
            return Err(AnalysisError::shape(
                "clinical columns vs clinical fields",
                fields.len(),
                values.ncols(),
            ));
        }
        Ok(Self {
            sample_ids,
            fields,
            values,
        })
    }

    /// Reads the requested fields, in request order, from a clinical container.
    ///
    /// `/data` is stored fields x samples, `/index` names the fields and
    /// `/columns` names the samples.
    pub fn load<P: AsRef<Path>, S: AsRef<str>>(path: P, requested_fields: &[S]) -> Result<Self> {
        let path = path.as_ref();
        let container = TensorContainer::open(path)?;
        let data = container.read_string_matrix(CLINICAL_DATA)?;
        let all_fields = container.read_string_vector(CLINICAL_FIELDS)?;
        let sample_ids = container.read_string_vector(CLINICAL_SAMPLES)?;

        if data.nrows() != all_fields.len() {
            return Err(AnalysisError::shape(
                format!("{} rows vs {}", CLINICAL_DATA, CLINICAL_FIELDS),
                all_fields.len(),
                data.nrows(),
            ));
        }
        if data.ncols() != sample_ids.len() {
            return Err(AnalysisError::shape(
                format!("{} columns vs {}", CLINICAL_DATA, CLINICAL_SAMPLES),
                sample_ids.len(),
                data.ncols(),
            ));
        }

        let field_to_idx: HashMap<&str, usize> = all_fields
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.as_str(), idx))
            .collect();
        let selected = requested_fields
            .iter()
            .map(|field| {
                field_to_idx
                    .get(field.as_ref())
                    .copied()
                    .ok_or_else(|| AnalysisError::MissingField {
                        field: field.as_ref().to_string(),
                    })
            })
            .collect::<Result<Vec<usize>>>()?;

        let values = data.t().select(Axis(1), &selected);
        info!(
            "Loaded {} clinical records with fields {:?} from {}",
            sample_ids.len(),
            requested_fields.iter().map(|f| f.as_ref()).collect::<Vec<_>>(),
            path.display()
        );
        Self::new(
            sample_ids,
            requested_fields.iter().map(|f| f.as_ref().to_string()).collect(),
            values,
        )
    }

    /// Reorders the table onto `target_keys`.
    ///
    /// Row `i` of the result is the record whose key equals `target_keys[i]`,
    /// or all [`MISSING_SENTINEL`] when there is none. When a key occurs more
    /// than once in the table, its last record wins.
    pub fn align_to<S: AsRef<str>>(&self, target_keys: &[S]) -> AlignedClinical {
        let mut key_to_row: HashMap<&str, usize> = HashMap::with_capacity(self.sample_ids.len());
        let mut duplicate_keys = 0;
        for (row, key) in self.sample_ids.iter().enumerate() {
            if key_to_row.insert(key.as_str(), row).is_some() {
                duplicate_keys += 1;
            }
        }

        let n_fields = self.fields.len();
        let mut values = Array2::from_elem((target_keys.len(), n_fields), MISSING_SENTINEL.to_string());
        let mut matched = 0;
        for (target_row, key) in target_keys.iter().enumerate() {
            if let Some(&source_row) = key_to_row.get(key.as_ref()) {
                values.row_mut(target_row).assign(&self.values.row(source_row));
                matched += 1;
            }
        }
        values.mapv_inplace(|value| {
            if value == NAN_TEXT {
                MISSING_SENTINEL.to_string()
            } else {
                value
            }
        });

        let unmatched = target_keys.len() - matched;
        if duplicate_keys > 0 {
            warn!(
                "{} clinical sample ids occur more than once; the last record was used.",
                duplicate_keys
            );
        }
        if unmatched > 0 {
            warn!(
                "{} of {} samples have no clinical record and are filled with '{}'.",
                unmatched,
                target_keys.len(),
                MISSING_SENTINEL
            );
        }
        debug!("Matched {} samples to clinical records.", matched);

        AlignedClinical {
            fields: self.fields.clone(),
            values,
            matched,
            unmatched,
            duplicate_keys,
        }
    }
}

impl AlignedClinical {
    /// Treats the aligned matrix as a clinical table keyed by `keys`.
    pub fn into_table(self, keys: Vec<String>) -> Result<ClinicalTable> {
        ClinicalTable::new(keys, self.fields, self.values)
    }
}
