use std::collections::HashMap;
use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::error::QsipError;
use crate::extract::extract_source_table;
use crate::mapping::{build_column_mapping, CanonicalField, ColumnAliases};
use crate::reconcile::{reconcile, Reconciled};
use crate::schema::*;
use crate::subset::SourceSelection;
use crate::table::{self, MetadataTable};

#[pyclass]
pub struct QsipMetadata {
    base_path: PathBuf,
    sample: Option<MetadataTable>,
    source: Option<MetadataTable>,
    reconciled: Option<Reconciled>,
}

#[pymethods]
impl QsipMetadata {
    #[new]
    fn new(base_path: String) -> Self {
        Self {
            base_path: PathBuf::from(base_path),
            sample: None,
            source: None,
            reconciled: None,
        }
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load sample-level metadata (one row per gradient fraction).
    ///
    /// The first column is the sample id. All columns are loaded as strings.
    #[pyo3(signature = (filename=None))]
    fn load_sample_metadata(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let fname = filename.unwrap_or("sample-metadata.tsv");
        let table = table::read_metadata(self.base_path.join(fname))?;
        let df = table.frame().clone();
        self.sample = Some(table);
        self.reconciled = None;
        Ok(PyDataFrame(df))
    }

    /// Load source-level metadata (one row per source).
    ///
    /// Optional: when it is never loaded, `reconcile` extracts it from the
    /// sample metadata.
    #[pyo3(signature = (filename=None))]
    fn load_source_metadata(&mut self, filename: Option<&str>) -> PyResult<PyDataFrame> {
        let fname = filename.unwrap_or("source-metadata.tsv");
        let table = table::read_metadata(self.base_path.join(fname))?;
        let df = table.frame().clone();
        self.source = Some(table);
        self.reconciled = None;
        Ok(PyDataFrame(df))
    }

    // ── Reconciliation ──────────────────────────────────────────────────────

    /// Validate both metadata tables and rename aliased columns.
    ///
    /// Each `*_column` argument names the metadata column holding that
    /// field; the defaults are the canonical names. Returns the
    /// `(source, sample)` frames.
    #[pyo3(signature = (
        source_mat_id_column = sample::SOURCE_MAT_ID,
        isotope_column = source::ISOTOPE,
        isotopolog_column = source::ISOTOPOLOG,
        gradient_position_column = sample::GRADIENT_POSITION,
        gradient_pos_density_column = sample::GRADIENT_POS_DENSITY,
        gradient_pos_amt_column = sample::GRADIENT_POS_AMT,
    ))]
    fn reconcile(
        &mut self,
        source_mat_id_column: &str,
        isotope_column: &str,
        isotopolog_column: &str,
        gradient_position_column: &str,
        gradient_pos_density_column: &str,
        gradient_pos_amt_column: &str,
    ) -> PyResult<(PyDataFrame, PyDataFrame)> {
        let sample = self
            .sample
            .as_ref()
            .ok_or_else(|| QsipError::NotLoaded("sample metadata".into()))?;

        let mapping = ColumnAliases::new()
            .with_alias(CanonicalField::SourceMatId, source_mat_id_column)
            .with_alias(CanonicalField::Isotope, isotope_column)
            .with_alias(CanonicalField::Isotopolog, isotopolog_column)
            .with_alias(CanonicalField::GradientPosition, gradient_position_column)
            .with_alias(CanonicalField::GradientPosDensity, gradient_pos_density_column)
            .with_alias(CanonicalField::GradientPosAmt, gradient_pos_amt_column);

        let result = reconcile(sample, self.source.as_ref(), source_mat_id_column, &mapping)?;
        let frames = (
            PyDataFrame(result.source.frame().clone()),
            PyDataFrame(result.sample.frame().clone()),
        );
        self.reconciled = Some(result);
        Ok(frames)
    }

    /// Check the sources selected for feature filtering against the
    /// reconciled source metadata.
    #[pyo3(signature = (
        unlabeled_sources,
        labeled_sources,
        min_unlabeled_sources = 1,
        min_labeled_sources = 1,
        min_unlabeled_fractions = 1,
        min_labeled_fractions = 1,
    ))]
    fn check_source_selection(
        &self,
        unlabeled_sources: Vec<String>,
        labeled_sources: Vec<String>,
        min_unlabeled_sources: usize,
        min_labeled_sources: usize,
        min_unlabeled_fractions: usize,
        min_labeled_fractions: usize,
    ) -> PyResult<()> {
        let reconciled = self.reconciled()?;
        let selection = SourceSelection {
            unlabeled_sources,
            labeled_sources,
            min_unlabeled_sources,
            min_labeled_sources,
            min_unlabeled_fractions,
            min_labeled_fractions,
        };
        selection.validate(&reconciled.source)?;
        Ok(())
    }

    /// Write the reconciled tables as TSV files under the base path.
    #[pyo3(signature = (source_filename="source-metadata.tsv", sample_filename="sample-metadata.tsv"))]
    fn write_metadata(&self, source_filename: &str, sample_filename: &str) -> PyResult<()> {
        let reconciled = self.reconciled()?;
        table::write_metadata(&reconciled.source, self.base_path.join(source_filename))?;
        table::write_metadata(&reconciled.sample, self.base_path.join(sample_filename))?;
        Ok(())
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn sample_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self.sample.as_ref().map(|t| PyDataFrame(t.frame().clone())))
    }

    #[getter]
    fn source_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self.source.as_ref().map(|t| PyDataFrame(t.frame().clone())))
    }

    #[getter]
    fn reconciled_source_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self
            .reconciled
            .as_ref()
            .map(|r| PyDataFrame(r.source.frame().clone())))
    }

    #[getter]
    fn reconciled_sample_df(&self) -> PyResult<Option<PyDataFrame>> {
        Ok(self
            .reconciled
            .as_ref()
            .map(|r| PyDataFrame(r.sample.frame().clone())))
    }

    /// Row-key column names of the reconciled `(source, sample)` tables.
    #[getter]
    fn id_columns(&self) -> PyResult<Option<(String, String)>> {
        Ok(self.reconciled.as_ref().map(|r| {
            (
                r.source.id_column().to_string(),
                r.sample.id_column().to_string(),
            )
        }))
    }

    #[getter]
    fn source_derived(&self) -> PyResult<Option<bool>> {
        Ok(self.reconciled.as_ref().map(|r| r.source_derived))
    }
}

impl QsipMetadata {
    fn reconciled(&self) -> Result<&Reconciled, QsipError> {
        self.reconciled
            .as_ref()
            .ok_or_else(|| {
                QsipError::NotLoaded("reconciled metadata (call reconcile first)".into())
            })
    }
}

// ── Module-level functions ──────────────────────────────────────────────────

/// Build a `{canonical field: alias or None}` dict from `<field>_column`
/// keyword arguments. Unrelated keys are ignored.
#[pyfunction]
#[pyo3(name = "build_column_mapping")]
pub fn build_column_mapping_py(
    params: HashMap<String, String>,
) -> HashMap<String, Option<String>> {
    let mapping = build_column_mapping(&params);
    CanonicalField::ALL
        .iter()
        .filter(|f| params.contains_key(&format!("{}{}", f.name(), COLUMN_PARAM_SUFFIX)))
        .map(|f| (f.name().to_string(), mapping.alias(*f).map(str::to_string)))
        .collect()
}

/// Extract source-level metadata from a sample-level frame.
#[pyfunction]
#[pyo3(signature = (sample_df, source_column, id_column=None))]
pub fn extract_source_metadata(
    sample_df: PyDataFrame,
    source_column: &str,
    id_column: Option<&str>,
) -> PyResult<PyDataFrame> {
    let sample = to_table(sample_df, id_column)?;
    let extracted = extract_source_table(&sample, source_column)?;
    Ok(PyDataFrame(extracted.into_frame()))
}

/// Reconcile sample and optional source frames; returns `(source, sample)`.
///
/// `column_mapping` maps canonical field names to the caller's column names.
/// `source_column` defaults to the column mapped to `source_mat_id`.
#[pyfunction]
#[pyo3(signature = (sample_df, source_df=None, source_column=None, column_mapping=None))]
pub fn reconcile_metadata(
    sample_df: PyDataFrame,
    source_df: Option<PyDataFrame>,
    source_column: Option<&str>,
    column_mapping: Option<HashMap<String, String>>,
) -> PyResult<(PyDataFrame, PyDataFrame)> {
    let mut mapping = ColumnAliases::new();
    for (field, column) in column_mapping.unwrap_or_default() {
        mapping.set(field.parse::<CanonicalField>()?, column);
    }
    let source_column = source_column.unwrap_or_else(|| mapping.source_id_column());

    let sample = to_table(sample_df, None)?;
    let source = source_df.map(|df| to_table(df, None)).transpose()?;
    let (source, sample) =
        reconcile(&sample, source.as_ref(), source_column, &mapping)?.into_pair();
    Ok((
        PyDataFrame(source.into_frame()),
        PyDataFrame(sample.into_frame()),
    ))
}

fn to_table(df: PyDataFrame, id_column: Option<&str>) -> Result<MetadataTable, QsipError> {
    match id_column {
        Some(id) => MetadataTable::new(df.0, id),
        None => MetadataTable::from_frame(df.0),
    }
}
