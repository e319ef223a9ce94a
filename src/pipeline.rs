use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::aggregation::aggregate_documents;
use crate::compliance::{score_with, ScoringPolicy};
use crate::error::AuditError;
use crate::factors::EmissionFactorTable;
use crate::model::{ComplianceResult, EmissionsAggregate, ExtractedDocument, SourceDocument};
use crate::normalizer::{extract_document, Recognizer};
use crate::report::AuditReport;

/// Steps of an audit, in the order they must run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Upload,
    Extraction,
    Calculation,
    Compliance,
    Reporting,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Upload,
        Stage::Extraction,
        Stage::Calculation,
        Stage::Compliance,
        Stage::Reporting,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Stage::Upload => "upload",
            Stage::Extraction => "extraction",
            Stage::Calculation => "calculation",
            Stage::Compliance => "compliance",
            Stage::Reporting => "reporting",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Carries one audit session through upload, extraction, calculation,
/// compliance and reporting.
///
/// Each step needs the previous step's output. Re-running a step discards
/// everything downstream of it, so outputs always belong to the same run.
#[derive(Debug, Clone)]
pub struct AuditPipeline {
    stage: Stage,
    factors: Arc<EmissionFactorTable>,
    policy: ScoringPolicy,
    documents: Option<Vec<SourceDocument>>,
    extracted: Option<Vec<ExtractedDocument>>,
    emissions: Option<EmissionsAggregate>,
    compliance: Option<ComplianceResult>,
}

impl Default for AuditPipeline {
    fn default() -> Self {
        Self::new(Arc::new(EmissionFactorTable::default()), ScoringPolicy::default())
    }
}

impl AuditPipeline {
    pub fn new(factors: Arc<EmissionFactorTable>, policy: ScoringPolicy) -> Self {
        Self {
            stage: Stage::Upload,
            factors,
            policy,
            documents: None,
            extracted: None,
            emissions: None,
            compliance: None,
        }
    }

    /// The next step waiting to run.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn factors(&self) -> &EmissionFactorTable {
        &self.factors
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    pub fn documents(&self) -> Option<&[SourceDocument]> {
        self.documents.as_deref()
    }

    pub fn extracted(&self) -> Option<&[ExtractedDocument]> {
        self.extracted.as_deref()
    }

    pub fn emissions(&self) -> Option<&EmissionsAggregate> {
        self.emissions.as_ref()
    }

    pub fn compliance(&self) -> Option<&ComplianceResult> {
        self.compliance.as_ref()
    }

    /// Drop the outputs of every step after `stage`.
    fn rewind_after(&mut self, stage: Stage) {
        if stage < Stage::Extraction {
            self.extracted = None;
        }
        if stage < Stage::Calculation {
            self.emissions = None;
        }
        if stage < Stage::Compliance {
            self.compliance = None;
        }
    }

    // ── Stages ──────────────────────────────────────────────────────────────

    /// Accept OCR-processed documents.
    pub fn process_documents(&mut self, documents: Vec<SourceDocument>) -> Stage {
        info!(documents = documents.len(), "documents processed");
        self.documents = Some(documents);
        self.rewind_after(Stage::Upload);
        self.stage = Stage::Extraction;
        self.stage
    }

    pub fn extract(&mut self, recognizer: &dyn Recognizer) -> Result<&[ExtractedDocument], AuditError> {
        let documents = self.documents.as_ref().ok_or(AuditError::StageNotReady {
            stage: Stage::Extraction,
            missing: "processed documents",
        })?;

        let extracted: Vec<ExtractedDocument> = documents
            .iter()
            .map(|doc| extract_document(doc, recognizer))
            .collect();
        info!(
            documents = extracted.len(),
            records = extracted.iter().map(|d| d.items.len()).sum::<usize>(),
            "data extracted"
        );

        self.rewind_after(Stage::Extraction);
        self.stage = Stage::Calculation;
        Ok(&*self.extracted.insert(extracted))
    }

    pub fn calculate(&mut self) -> Result<&EmissionsAggregate, AuditError> {
        let extracted = self.extracted.as_ref().ok_or(AuditError::StageNotReady {
            stage: Stage::Calculation,
            missing: "extracted data",
        })?;

        let mut aggregate = aggregate_documents(extracted, &self.factors);
        aggregate.calculated_at = Some(Utc::now());
        info!(total_emissions = aggregate.total_emissions, "emissions calculated");

        self.rewind_after(Stage::Calculation);
        self.stage = Stage::Compliance;
        Ok(&*self.emissions.insert(aggregate))
    }

    pub fn check_compliance(&mut self) -> Result<&ComplianceResult, AuditError> {
        let emissions = self.emissions.as_ref().ok_or(AuditError::StageNotReady {
            stage: Stage::Compliance,
            missing: "emissions calculation",
        })?;

        let mut result = score_with(emissions, &self.policy);
        result.stamp(Utc::now(), self.policy.review_interval_days);
        self.stage = Stage::Reporting;
        Ok(&*self.compliance.insert(result))
    }

    /// Assemble the audit report for `reporting_period`. Does not advance.
    pub fn build_report(&self, reporting_period: &str) -> Result<AuditReport, AuditError> {
        let missing = |what: &'static str| AuditError::StageNotReady {
            stage: Stage::Reporting,
            missing: what,
        };
        let emissions = self.emissions.as_ref().ok_or_else(|| missing("emissions calculation"))?;
        let compliance = self.compliance.as_ref().ok_or_else(|| missing("compliance check"))?;
        Ok(AuditReport::build(emissions, compliance, reporting_period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RawHit, SourceType};
    use crate::normalizer::PatternRecognizer;

    struct FixedRecognizer(Vec<RawHit>);

    impl Recognizer for FixedRecognizer {
        fn recognize(&self, _text: &str) -> Vec<RawHit> {
            self.0.clone()
        }
    }

    fn diesel(raw: &str) -> RawHit {
        RawHit {
            source_type: SourceType::Diesel,
            raw_value: raw.to_string(),
            unit: "gallons".to_string(),
            confidence: 0.95,
            source: "Diesel fuel consumption".to_string(),
        }
    }

    #[test]
    fn stages_refuse_to_run_out_of_order() {
        let mut pipeline = AuditPipeline::default();
        assert_eq!(pipeline.stage(), Stage::Upload);

        let err = pipeline.extract(&FixedRecognizer(vec![])).unwrap_err();
        assert!(matches!(
            err,
            AuditError::StageNotReady {
                stage: Stage::Extraction,
                ..
            }
        ));
        assert!(pipeline.calculate().is_err());
        assert!(pipeline.check_compliance().is_err());
        assert!(pipeline.build_report("2024 Q1").is_err());
    }

    #[test]
    fn runs_all_stages_in_order() {
        let mut pipeline = AuditPipeline::default();
        pipeline.process_documents(SourceDocument::batch([("a.pdf", ""), ("b.pdf", "")]));
        assert_eq!(pipeline.stage(), Stage::Extraction);

        let extracted = pipeline.extract(&FixedRecognizer(vec![diesel("500")])).unwrap();
        assert_eq!(extracted.len(), 2);
        assert_eq!(pipeline.stage(), Stage::Calculation);

        let total = pipeline.calculate().unwrap().total_emissions;
        assert!((total - 2.0 * 5075.0).abs() < 1e-6);
        assert_eq!(pipeline.stage(), Stage::Compliance);

        let result = pipeline.check_compliance().unwrap();
        let checked_at = result.checked_at.unwrap();
        assert_eq!((result.next_review_date.unwrap() - checked_at).num_days(), 365);
        assert_eq!(pipeline.stage(), Stage::Reporting);
        assert!(pipeline.emissions().unwrap().calculated_at.unwrap() <= checked_at);

        let report = pipeline.build_report("2024 Q1").unwrap();
        assert_eq!(report.reporting_period, "2024 Q1");
        assert!((report.executive_summary.total_emissions - total).abs() < 1e-9);
    }

    #[test]
    fn rerunning_a_stage_discards_downstream_outputs() {
        let mut pipeline = AuditPipeline::default();
        pipeline.process_documents(SourceDocument::batch([("a.pdf", "")]));
        pipeline.extract(&FixedRecognizer(vec![diesel("1")])).unwrap();
        pipeline.calculate().unwrap();
        pipeline.check_compliance().unwrap();

        pipeline.extract(&FixedRecognizer(vec![diesel("2")])).unwrap();
        assert!(pipeline.emissions().is_none());
        assert!(pipeline.compliance().is_none());
        assert_eq!(pipeline.stage(), Stage::Calculation);

        pipeline.process_documents(vec![]);
        assert!(pipeline.extracted().is_none());
        assert_eq!(pipeline.stage(), Stage::Extraction);
    }

    #[test]
    fn empty_upload_flows_through_to_zero_results() {
        let mut pipeline = AuditPipeline::default();
        pipeline.process_documents(vec![]);
        pipeline.extract(&PatternRecognizer::standard().unwrap()).unwrap();
        let aggregate = pipeline.calculate().unwrap();
        assert_eq!(aggregate.total_emissions, 0.0);
        let result = pipeline.check_compliance().unwrap();
        assert!(result.overall_score.is_finite());
    }

    #[test]
    fn exponent_values_cannot_overflow_the_aggregate() {
        let mut pipeline = AuditPipeline::default();
        pipeline.process_documents(SourceDocument::batch([("a.pdf", "")]));
        let extracted = pipeline.extract(&FixedRecognizer(vec![diesel("1e308")])).unwrap();
        assert_eq!(extracted[0].items.len(), 1);

        let aggregate = pipeline.calculate().unwrap();
        assert_eq!(aggregate.total_emissions, 0.0);
        assert!(aggregate.calculation_details.is_empty());
        let json = serde_json::to_value(aggregate).unwrap();
        assert_eq!(json["totalEmissions"], 0.0);
    }
}
