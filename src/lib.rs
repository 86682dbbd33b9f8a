//! Metadata preparation for quantitative stable isotope probing (qSIP).
//!
//! Reconciles sample-level and source-level metadata, resolves column
//! aliases against the canonical names the qSIP2 engine expects, and
//! reports missing columns in a form the user can act on.

pub mod error;
pub mod extract;
pub mod mapping;
pub mod reconcile;
pub mod schema;
pub mod subset;
pub mod table;
pub mod validate;

#[cfg(feature = "python")]
mod model;

pub use error::QsipError;
pub use extract::extract_source_table;
pub use mapping::{
    build_column_mapping, CanonicalField, ColumnAliases, ColumnRequirement, Scope,
};
pub use reconcile::{reconcile, Reconciled};
pub use subset::SourceSelection;
pub use table::{read_metadata, write_metadata, MetadataTable};
pub use validate::{validate_and_rename, MissingColumn, MissingColumnsReport};

#[cfg(feature = "python")]
mod python {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::model::{self, QsipMetadata};
    use crate::schema;

    /// Export schema constants as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Source
        let source = PyModule::new(m.py(), "source")?;
        source.add("ISOTOPE", schema::source::ISOTOPE)?;
        source.add("ISOTOPOLOG", schema::source::ISOTOPOLOG)?;
        source.add("ALL", schema::source::ALL.to_vec())?;
        m.add_submodule(&source)?;

        // Sample
        let sample = PyModule::new(m.py(), "sample")?;
        sample.add("SOURCE_MAT_ID", schema::sample::SOURCE_MAT_ID)?;
        sample.add("GRADIENT_POSITION", schema::sample::GRADIENT_POSITION)?;
        sample.add("GRADIENT_POS_DENSITY", schema::sample::GRADIENT_POS_DENSITY)?;
        sample.add("GRADIENT_POS_AMT", schema::sample::GRADIENT_POS_AMT)?;
        sample.add("ALL", schema::sample::ALL.to_vec())?;
        m.add_submodule(&sample)?;

        // Index
        let index = PyModule::new(m.py(), "index")?;
        index.add("ID", schema::index::ID)?;
        m.add_submodule(&index)?;

        Ok(())
    }

    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<QsipMetadata>()?;
        m.add_function(wrap_pyfunction!(model::build_column_mapping_py, m)?)?;
        m.add_function(wrap_pyfunction!(model::extract_source_metadata, m)?)?;
        m.add_function(wrap_pyfunction!(model::reconcile_metadata, m)?)?;
        add_schema_exports(m)?;
        Ok(())
    }
}
