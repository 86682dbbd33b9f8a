#[cfg(feature = "python")]
use pyo3::exceptions::{PyRuntimeError, PyValueError};
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

use crate::validate::MissingColumnsReport;

#[derive(Error, Debug)]
pub enum QsipError {
    #[error("Data not loaded: {0}")]
    NotLoaded(String),

    #[error(
        "The column '{column}' was not found in the {table} metadata. Please update \
         the column name passed to the method or update your metadata."
    )]
    ColumnNotFound { column: String, table: String },

    #[error("{0}")]
    MissingColumns(MissingColumnsReport),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    General(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),
}

impl QsipError {
    pub(crate) fn column_not_found(column: &str, table: impl std::fmt::Display) -> Self {
        QsipError::ColumnNotFound {
            column: column.to_string(),
            table: table.to_string(),
        }
    }
}

#[cfg(feature = "python")]
impl From<QsipError> for PyErr {
    fn from(err: QsipError) -> PyErr {
        match err {
            QsipError::ColumnNotFound { .. }
            | QsipError::MissingColumns(_)
            | QsipError::Validation(_)
            | QsipError::InvalidData(_) => PyValueError::new_err(err.to_string()),
            _ => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

#[cfg(feature = "python")]
impl From<PyErr> for QsipError {
    fn from(err: PyErr) -> Self {
        QsipError::General(err.to_string())
    }
}
