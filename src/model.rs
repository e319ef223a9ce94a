use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::factors::EmissionFactorTable;
use crate::schema::source_type;

// ── Source types ────────────────────────────────────────────────────────────

/// Category of an emission source. Selects the emission factor.
///
/// The five named variants are the recognised GHG sources. `Other` carries
/// any key a recognizer produced that is not one of them; such records are
/// kept and aggregated with a zero factor unless the table names the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceType {
    Electricity,
    NaturalGas,
    Diesel,
    Gasoline,
    PeakDemand,
    Other(String),
}

impl SourceType {
    pub const KNOWN: [SourceType; 5] = [
        SourceType::Electricity,
        SourceType::NaturalGas,
        SourceType::Diesel,
        SourceType::Gasoline,
        SourceType::PeakDemand,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Electricity => source_type::ELECTRICITY,
            Self::NaturalGas => source_type::NATURAL_GAS,
            Self::Diesel => source_type::DIESEL,
            Self::Gasoline => source_type::GASOLINE,
            Self::PeakDemand => source_type::PEAK_DEMAND,
            Self::Other(key) => key,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for SourceType {
    fn from(key: &str) -> Self {
        match key.trim() {
            source_type::ELECTRICITY => Self::Electricity,
            source_type::NATURAL_GAS => Self::NaturalGas,
            source_type::DIESEL => Self::Diesel,
            source_type::GASOLINE => Self::Gasoline,
            source_type::PEAK_DEMAND => Self::PeakDemand,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for SourceType {
    fn from(key: String) -> Self {
        Self::from(key.as_str())
    }
}

impl From<SourceType> for String {
    fn from(value: SourceType) -> Self {
        match value {
            SourceType::Other(key) => key,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Extraction ──────────────────────────────────────────────────────────────

/// A document after upload/OCR: an identifier, a display name and its text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDocument {
    pub id: String,
    pub name: String,
    pub text: String,
}

impl SourceDocument {
    pub fn new(id: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            text: text.into(),
        }
    }

    /// Number a batch of `(name, text)` pairs as `doc_0`, `doc_1`, ...
    pub fn batch<I, N, T>(files: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<String>,
    {
        files
            .into_iter()
            .enumerate()
            .map(|(index, (name, text))| Self::new(format!("doc_{index}"), name, text))
            .collect()
    }
}

/// One unparsed hit from a recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawHit {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub raw_value: String,
    pub unit: String,
    pub confidence: f64,
    pub source: String,
}

/// A typed, validated quantity attributed to one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityRecord {
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub value: f64,
    pub unit: String,
    pub confidence: f64,
    pub source: String,
    pub document_id: String,
}

/// All records extracted from one document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedDocument {
    pub document_id: String,
    pub document_name: String,
    pub items: Vec<QuantityRecord>,
    pub extracted_at: DateTime<Utc>,
}

// ── Emissions ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationDetail {
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    pub source: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
    pub value: f64,
    pub unit: String,
    pub emission_factor: f64,
    pub emissions: f64,
    pub confidence: f64,
}

/// Running totals for one source type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeEmissions {
    #[serde(skip)]
    pub source_type: SourceType,
    pub total: f64,
    pub count: usize,
    pub unit: String,
}

/// Per-type totals in first-seen order. Serializes as a JSON object keyed
/// by source type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmissionsByType(pub(crate) Vec<TypeEmissions>);

impl EmissionsByType {
    pub fn get(&self, source_type: &SourceType) -> Option<&TypeEmissions> {
        self.0.iter().find(|t| &t.source_type == source_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeEmissions> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn source_types(&self) -> impl Iterator<Item = &SourceType> {
        self.0.iter().map(|t| &t.source_type)
    }
}

impl Serialize for EmissionsByType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for entry in &self.0 {
            map.serialize_entry(entry.source_type.as_str(), entry)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEmissions {
    pub document_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    pub emissions: f64,
    pub calculations: Vec<CalculationDetail>,
}

/// Output of one calculation run. Read-only once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionsAggregate {
    pub total_emissions: f64,
    pub emissions_by_type: EmissionsByType,
    pub emissions_by_document: Vec<DocumentEmissions>,
    pub calculation_details: Vec<CalculationDetail>,
    #[serde(rename = "emissionFactorsUsed")]
    pub factors_used: EmissionFactorTable,
    pub methodology: String,
    /// Set by the pipeline when the calculation stage runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calculated_at: Option<DateTime<Utc>>,
}

// ── Compliance ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Compliant,
    Partial,
    NonCompliant,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Compliant => "compliant",
            Self::Partial => "partial",
            Self::NonCompliant => "non_compliant",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceCheck {
    pub category: String,
    pub standard: String,
    pub requirement: String,
    pub status: CheckStatus,
    pub score: f64,
    pub details: String,
    pub recommendations: Vec<String>,
    /// Score is a fixed stand-in rather than derived from the data.
    pub placeholder: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    HighEmissions,
    LowConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalIssue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceResult {
    pub overall_score: f64,
    pub overall_status: OverallStatus,
    pub checks: Vec<ComplianceCheck>,
    pub critical_issues: Vec<CriticalIssue>,
    pub standards: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_review_date: Option<DateTime<Utc>>,
}

impl ComplianceResult {
    /// Record when the check ran and schedule the next review
    /// `review_interval_days` later.
    pub fn stamp(&mut self, checked_at: DateTime<Utc>, review_interval_days: i64) {
        self.checked_at = Some(checked_at);
        self.next_review_date = Some(checked_at + Duration::days(review_interval_days));
    }
}
