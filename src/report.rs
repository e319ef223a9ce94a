//! Report boundary: assembles the audit report from pipeline outputs and
//! hands it to a renderer.
//!
//! Renderers produce bytes only. `JsonReportRenderer` emits the full report;
//! `CsvReportRenderer` emits the calculation details as a spreadsheet table
//! built with Polars.
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::AuditError;
use crate::model::{CheckStatus, ComplianceResult, EmissionsAggregate};
use crate::schema::{calculation, standard};

pub const REPORT_TITLE: &str = "Carbon Emissions Audit Report";
pub const REPORT_FILE_STEM: &str = "carbon-emissions-audit-report";

const DEFAULT_RECOMMENDATIONS: [&str; 3] = [
    "Implement continuous monitoring for real-time emissions tracking",
    "Expand scope to include additional emission sources",
    "Enhance data quality through improved collection processes",
];

// ── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutiveSummary {
    pub total_emissions: f64,
    pub compliance_score: f64,
    pub key_findings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub report_id: Uuid,
    pub report_title: String,
    pub generated_at: DateTime<Utc>,
    pub reporting_period: String,
    pub methodology: String,
    pub compliance_standards: Vec<String>,
    pub executive_summary: ExecutiveSummary,
    pub emissions_data: EmissionsAggregate,
    pub compliance_status: ComplianceResult,
    pub recommendations: Vec<String>,
}

impl AuditReport {
    pub fn build(
        emissions: &EmissionsAggregate,
        compliance: &ComplianceResult,
        reporting_period: &str,
    ) -> Self {
        let mut key_findings = vec![
            format!(
                "Total emissions of {} across {} documents",
                format_emissions(emissions.total_emissions),
                emissions.emissions_by_document.len()
            ),
            format!(
                "{} emission source types identified and quantified",
                emissions.emissions_by_type.len()
            ),
            format!(
                "Overall compliance score {:.0}% ({})",
                compliance.overall_score, compliance.overall_status
            ),
        ];
        key_findings.extend(compliance.critical_issues.iter().map(|i| i.message.clone()));

        Self {
            report_id: Uuid::new_v4(),
            report_title: REPORT_TITLE.to_string(),
            generated_at: Utc::now(),
            reporting_period: reporting_period.to_string(),
            methodology: emissions.methodology.clone(),
            compliance_standards: vec![
                standard::ISO_14064_1.to_string(),
                standard::GHG_PROTOCOL.to_string(),
            ],
            executive_summary: ExecutiveSummary {
                total_emissions: emissions.total_emissions,
                compliance_score: compliance.overall_score,
                key_findings,
            },
            emissions_data: emissions.clone(),
            compliance_status: compliance.clone(),
            recommendations: recommendations(compliance),
        }
    }
}

/// Remediations of every check that did not pass, in check order without
/// repeats. Falls back to general guidance when all checks pass.
fn recommendations(compliance: &ComplianceResult) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for check in compliance
        .checks
        .iter()
        .filter(|c| c.status != CheckStatus::Pass)
    {
        for rec in &check.recommendations {
            if !out.contains(rec) {
                out.push(rec.clone());
            }
        }
    }
    if out.is_empty() {
        out = DEFAULT_RECOMMENDATIONS.iter().map(|r| r.to_string()).collect();
    }
    out
}

/// `6200.0` → `"6.20 tonnes CO₂e"`, `12.5` → `"12.50 kg CO₂e"`.
pub fn format_emissions(kg: f64) -> String {
    if kg >= 1000.0 {
        format!("{:.2} tonnes CO₂e", kg / 1000.0)
    } else {
        format!("{kg:.2} kg CO₂e")
    }
}

// ── Calculation table ───────────────────────────────────────────────────────

/// One row per calculation detail, columns as in `schema::calculation`.
pub fn calculation_details_frame(aggregate: &EmissionsAggregate) -> Result<DataFrame, AuditError> {
    let details = &aggregate.calculation_details;

    let mut document_ids = Vec::with_capacity(details.len());
    let mut document_names = Vec::with_capacity(details.len());
    let mut sources = Vec::with_capacity(details.len());
    let mut source_types = Vec::with_capacity(details.len());
    let mut values = Vec::with_capacity(details.len());
    let mut units = Vec::with_capacity(details.len());
    let mut factors = Vec::with_capacity(details.len());
    let mut emissions = Vec::with_capacity(details.len());
    let mut confidences = Vec::with_capacity(details.len());

    for d in details {
        document_ids.push(d.document_id.clone());
        document_names.push(d.document_name.clone().unwrap_or_default());
        sources.push(d.source.clone());
        source_types.push(d.source_type.to_string());
        values.push(d.value);
        units.push(d.unit.clone());
        factors.push(d.emission_factor);
        emissions.push(d.emissions);
        confidences.push(d.confidence);
    }

    let df = DataFrame::new(vec![
        Column::new(calculation::DOCUMENT_ID.into(), &document_ids),
        Column::new(calculation::DOCUMENT_NAME.into(), &document_names),
        Column::new(calculation::SOURCE.into(), &sources),
        Column::new(calculation::SOURCE_TYPE.into(), &source_types),
        Column::new(calculation::VALUE.into(), &values),
        Column::new(calculation::UNIT.into(), &units),
        Column::new(calculation::EMISSION_FACTOR.into(), &factors),
        Column::new(calculation::EMISSIONS.into(), &emissions),
        Column::new(calculation::CONFIDENCE.into(), &confidences),
    ])?;

    Ok(df)
}

// ── Renderers ───────────────────────────────────────────────────────────────

/// Serializes an audit report to a document format.
pub trait ReportRenderer {
    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, report: &AuditReport) -> Result<Vec<u8>, AuditError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportRenderer;

impl ReportRenderer for JsonReportRenderer {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, report: &AuditReport) -> Result<Vec<u8>, AuditError> {
        Ok(serde_json::to_vec_pretty(report)?)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CsvReportRenderer {
    pub separator: u8,
}

impl Default for CsvReportRenderer {
    fn default() -> Self {
        Self { separator: b',' }
    }
}

impl ReportRenderer for CsvReportRenderer {
    fn extension(&self) -> &'static str {
        "csv"
    }

    fn render(&self, report: &AuditReport) -> Result<Vec<u8>, AuditError> {
        let mut df = calculation_details_frame(&report.emissions_data)?;
        let mut buf: Vec<u8> = Vec::new();
        CsvWriter::new(&mut buf)
            .include_header(true)
            .with_separator(self.separator)
            .finish(&mut df)?;
        Ok(buf)
    }
}

/// Write `report` into `dir` as `carbon-emissions-audit-report.<ext>`.
pub fn write_report(
    dir: impl AsRef<Path>,
    renderer: &dyn ReportRenderer,
    report: &AuditReport,
) -> Result<PathBuf, AuditError> {
    let path = dir
        .as_ref()
        .join(format!("{REPORT_FILE_STEM}.{}", renderer.extension()));
    let bytes = renderer.render(report)?;
    std::fs::write(&path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::aggregate;
    use crate::compliance::score;
    use crate::factors::EmissionFactorTable;
    use crate::model::{QuantityRecord, SourceType};

    fn sample() -> (EmissionsAggregate, ComplianceResult) {
        let records = vec![
            QuantityRecord {
                source_type: SourceType::Electricity,
                value: 2450.0,
                unit: "kWh".into(),
                confidence: 0.92,
                source: "Electricity consumption".into(),
                document_id: "doc_0".into(),
            },
            QuantityRecord {
                source_type: SourceType::Diesel,
                value: 500.0,
                unit: "gallons".into(),
                confidence: 0.5,
                source: "Diesel fuel consumption".into(),
                document_id: "doc_1".into(),
            },
        ];
        let agg = aggregate(&records, &EmissionFactorTable::default());
        let result = score(&agg);
        (agg, result)
    }

    #[test]
    fn formats_kg_and_tonnes() {
        assert_eq!(format_emissions(12.5), "12.50 kg CO₂e");
        assert_eq!(format_emissions(6200.0), "6.20 tonnes CO₂e");
        assert_eq!(format_emissions(0.0), "0.00 kg CO₂e");
    }

    #[test]
    fn report_summarises_and_collects_recommendations() {
        let (agg, result) = sample();
        let report = AuditReport::build(&agg, &result, "2024 Q1");

        assert_eq!(report.report_title, REPORT_TITLE);
        assert_eq!(report.executive_summary.total_emissions, agg.total_emissions);
        assert!(report.executive_summary.key_findings[0].contains("tonnes CO₂e across 2 documents"));
        assert!(report
            .executive_summary
            .key_findings
            .iter()
            .any(|f| f.contains("low confidence")));
        // scope (2 types) and data quality (50%) fall short
        assert!(report
            .recommendations
            .contains(&"Expand scope coverage".to_string()));
        assert!(report
            .recommendations
            .contains(&"Improve data collection processes".to_string()));
        assert!(!report
            .recommendations
            .contains(&DEFAULT_RECOMMENDATIONS[0].to_string()));
    }

    #[test]
    fn frame_has_one_row_per_calculation() {
        let (agg, _) = sample();
        let df = calculation_details_frame(&agg).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), calculation::ALL.len());
        let emissions = df.column(calculation::EMISSIONS).unwrap().f64().unwrap();
        assert!((emissions.get(1).unwrap() - 5075.0).abs() < 1e-9);
    }

    #[test]
    fn csv_renderer_writes_header_and_rows() {
        let (agg, result) = sample();
        let report = AuditReport::build(&agg, &result, "2024 Q1");
        let bytes = CsvReportRenderer::default().render(&report).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), calculation::ALL.join(","));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn json_renderer_uses_camel_case_keys() {
        let (agg, result) = sample();
        let report = AuditReport::build(&agg, &result, "2024 Q1");
        let bytes = JsonReportRenderer.render(&report).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["reportTitle"], REPORT_TITLE);
        assert_eq!(json["reportingPeriod"], "2024 Q1");
        assert_eq!(json["complianceStatus"]["overallStatus"], "partial");
        assert_eq!(
            json["complianceStatus"]["criticalIssues"][0]["type"],
            "low_confidence"
        );
    }
}
