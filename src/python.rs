use std::path::PathBuf;
use std::sync::Arc;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::PyModule;
use pyo3_polars::PyDataFrame;

use crate::compliance::ScoringPolicy;
use crate::error::AuditError;
use crate::factors::EmissionFactorTable;
use crate::model::SourceDocument;
use crate::normalizer::PatternRecognizer;
use crate::pipeline::AuditPipeline;
use crate::report::{self, CsvReportRenderer, JsonReportRenderer, ReportRenderer};
use crate::schema;

/// One audit run, driven stage by stage from Python.
#[pyclass(name = "AuditSession")]
pub struct PyAuditSession {
    pipeline: AuditPipeline,
    recognizer: PatternRecognizer,
}

#[pymethods]
impl PyAuditSession {
    /// factors_csv: CSV with `source_type,factor` columns (default: standard factors)
    /// policy_json: JSON object overriding rubric thresholds
    #[new]
    #[pyo3(signature = (factors_csv=None, policy_json=None))]
    fn new(factors_csv: Option<PathBuf>, policy_json: Option<&str>) -> PyResult<Self> {
        let factors = match factors_csv {
            Some(path) => EmissionFactorTable::from_csv(path)?,
            None => EmissionFactorTable::default(),
        };
        let policy = match policy_json {
            Some(json) => serde_json::from_str(json).map_err(AuditError::from)?,
            None => ScoringPolicy::default(),
        };
        Ok(Self {
            pipeline: AuditPipeline::new(Arc::new(factors), policy),
            recognizer: PatternRecognizer::standard()?,
        })
    }

    #[getter]
    fn stage(&self) -> &'static str {
        self.pipeline.stage().label()
    }

    /// Documents as `(name, text)` pairs; ids are assigned as doc_0, doc_1, ...
    fn process_documents(&mut self, documents: Vec<(String, String)>) -> &'static str {
        self.pipeline
            .process_documents(SourceDocument::batch(documents))
            .label()
    }

    /// Run the pattern recognizer; returns the extracted documents as JSON.
    fn extract(&mut self) -> PyResult<String> {
        let extracted = self.pipeline.extract(&self.recognizer)?;
        Ok(serde_json::to_string(extracted).map_err(AuditError::from)?)
    }

    /// Returns the emissions aggregate as JSON.
    fn calculate(&mut self) -> PyResult<String> {
        let aggregate = self.pipeline.calculate()?;
        Ok(serde_json::to_string(aggregate).map_err(AuditError::from)?)
    }

    /// Returns the compliance result as JSON.
    fn check_compliance(&mut self) -> PyResult<String> {
        let result = self.pipeline.check_compliance()?;
        Ok(serde_json::to_string(result).map_err(AuditError::from)?)
    }

    #[pyo3(signature = (reporting_period="2024 Q1"))]
    fn report_json(&self, reporting_period: &str) -> PyResult<String> {
        let report = self.pipeline.build_report(reporting_period)?;
        Ok(serde_json::to_string_pretty(&report).map_err(AuditError::from)?)
    }

    /// Write the report into `directory` as json or csv; returns the path.
    #[pyo3(signature = (directory, format="json", reporting_period="2024 Q1"))]
    fn write_report(
        &self,
        directory: PathBuf,
        format: &str,
        reporting_period: &str,
    ) -> PyResult<PathBuf> {
        let csv = CsvReportRenderer::default();
        let renderer: &dyn ReportRenderer = match format {
            "json" => &JsonReportRenderer,
            "csv" => &csv,
            other => {
                return Err(PyValueError::new_err(format!(
                    "Invalid format: '{}'. Must be 'json' or 'csv'",
                    other
                )))
            }
        };
        let report = self.pipeline.build_report(reporting_period)?;
        Ok(report::write_report(directory, renderer, &report)?)
    }

    /// Calculation details of the current run as a DataFrame.
    fn calculation_details(&self) -> PyResult<PyDataFrame> {
        let aggregate = self
            .pipeline
            .emissions()
            .ok_or(AuditError::StageNotReady {
                stage: crate::pipeline::Stage::Calculation,
                missing: "emissions calculation",
            })?;
        Ok(PyDataFrame(report::calculation_details_frame(aggregate)?))
    }
}

/// Export schema constants as Python submodules
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Source types
    let source_type = PyModule::new(m.py(), "source_type")?;
    source_type.add("ELECTRICITY", schema::source_type::ELECTRICITY)?;
    source_type.add("NATURAL_GAS", schema::source_type::NATURAL_GAS)?;
    source_type.add("DIESEL", schema::source_type::DIESEL)?;
    source_type.add("GASOLINE", schema::source_type::GASOLINE)?;
    source_type.add("PEAK_DEMAND", schema::source_type::PEAK_DEMAND)?;
    m.add_submodule(&source_type)?;

    // Factor table
    let factor_table = PyModule::new(m.py(), "factor_table")?;
    factor_table.add("SOURCE_TYPE", schema::factor_table::SOURCE_TYPE)?;
    factor_table.add("FACTOR", schema::factor_table::FACTOR)?;
    m.add_submodule(&factor_table)?;

    // Calculation details
    let calculation = PyModule::new(m.py(), "calculation")?;
    calculation.add("DOCUMENT_ID", schema::calculation::DOCUMENT_ID)?;
    calculation.add("DOCUMENT_NAME", schema::calculation::DOCUMENT_NAME)?;
    calculation.add("SOURCE", schema::calculation::SOURCE)?;
    calculation.add("SOURCE_TYPE", schema::calculation::SOURCE_TYPE)?;
    calculation.add("VALUE", schema::calculation::VALUE)?;
    calculation.add("UNIT", schema::calculation::UNIT)?;
    calculation.add("EMISSION_FACTOR", schema::calculation::EMISSION_FACTOR)?;
    calculation.add("EMISSIONS", schema::calculation::EMISSIONS)?;
    calculation.add("CONFIDENCE", schema::calculation::CONFIDENCE)?;
    m.add_submodule(&calculation)?;

    Ok(())
}

#[pymodule]
#[pyo3(name = "_core")]
fn carbon_audit_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyAuditSession>()?;
    add_schema_exports(m)?;
    Ok(())
}
