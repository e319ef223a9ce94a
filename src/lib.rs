//! Emissions calculation and compliance scoring for carbon-emissions audits.
//!
//! Recognizer hits are normalized into quantity records, converted to
//! emissions with an emission factor table, aggregated, and scored against a
//! five-check compliance rubric. [`AuditPipeline`] sequences the stages.

pub mod aggregation;
pub mod compliance;
pub mod error;
pub mod factors;
pub mod model;
pub mod normalizer;
pub mod pipeline;
pub mod report;
pub mod schema;

#[cfg(feature = "python")]
mod python;

pub use aggregation::{aggregate, aggregate_documents};
pub use compliance::{score, score_with, ScoringPolicy};
pub use error::AuditError;
pub use factors::EmissionFactorTable;
pub use model::{
    CalculationDetail, CheckStatus, ComplianceCheck, ComplianceResult, CriticalIssue,
    EmissionsAggregate, ExtractedDocument, OverallStatus, QuantityRecord, RawHit, SourceDocument,
    SourceType,
};
pub use normalizer::{normalize, PatternRecognizer, Recognizer};
pub use pipeline::{AuditPipeline, Stage};
pub use report::{AuditReport, CsvReportRenderer, JsonReportRenderer, ReportRenderer};
