use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Stage not ready: {stage} requires {missing}")]
    StageNotReady { stage: Stage, missing: &'static str },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    General(String),
}

#[cfg(feature = "python")]
impl From<AuditError> for pyo3::PyErr {
    fn from(err: AuditError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for AuditError {
    fn from(err: pyo3::PyErr) -> Self {
        AuditError::General(err.to_string())
    }
}
