use chrono::Utc;
use regex::{Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::error::AuditError;
use crate::model::{ExtractedDocument, QuantityRecord, RawHit, SourceDocument, SourceType};

/// Finds emission quantities in document text.
///
/// Stand-in for an OCR/NLP service; the normalizer only sees the hits.
pub trait Recognizer {
    fn recognize(&self, text: &str) -> Vec<RawHit>;
}

/// Turn recognizer hits into quantity records for one document.
///
/// Values must parse as finite non-negative decimals (thousands separators
/// allowed). Hits that fail are dropped and logged; duplicates are kept.
pub fn normalize<I>(document_id: &str, hits: I) -> Vec<QuantityRecord>
where
    I: IntoIterator<Item = RawHit>,
{
    let mut records = Vec::new();
    let mut dropped = 0usize;

    for hit in hits {
        let Some(value) = parse_quantity(&hit.raw_value) else {
            warn!(
                document_id,
                source_type = %hit.source_type,
                raw_value = %hit.raw_value,
                "dropping hit with unusable value"
            );
            dropped += 1;
            continue;
        };
        if !hit.confidence.is_finite() {
            warn!(document_id, source_type = %hit.source_type, "dropping hit with non-finite confidence");
            dropped += 1;
            continue;
        }

        records.push(QuantityRecord {
            source_type: hit.source_type,
            value,
            unit: hit.unit,
            confidence: hit.confidence.clamp(0.0, 1.0),
            source: hit.source,
            document_id: document_id.to_string(),
        });
    }

    debug!(document_id, kept = records.len(), dropped, "normalized recognizer hits");
    records
}

/// Parse a recognizer value such as `"2,450"` or `" 12.5 "`.
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Run `recognizer` over a document's text and normalize the hits.
pub fn extract_document(document: &SourceDocument, recognizer: &dyn Recognizer) -> ExtractedDocument {
    let hits = recognizer.recognize(&document.text);
    ExtractedDocument {
        document_id: document.id.clone(),
        document_name: document.name.clone(),
        items: normalize(&document.id, hits),
        extracted_at: Utc::now(),
    }
}

// ── Pattern recognizer ──────────────────────────────────────────────────────

/// One extraction rule: first match of `pattern`, capture group 1 is the value.
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub source_type: SourceType,
    pub pattern: Regex,
    pub unit: String,
    pub confidence: f64,
    pub label: String,
}

impl PatternRule {
    pub fn new(
        source_type: SourceType,
        pattern: &str,
        unit: &str,
        confidence: f64,
        label: &str,
    ) -> Result<Self, AuditError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| AuditError::InvalidData(format!("Bad pattern for {source_type}: {e}")))?;
        Ok(Self {
            source_type,
            pattern,
            unit: unit.to_string(),
            confidence,
            label: label.to_string(),
        })
    }

    fn find(&self, text: &str) -> Option<RawHit> {
        let captures = self.pattern.captures(text)?;
        let value = captures.get(1)?;
        Some(RawHit {
            source_type: self.source_type.clone(),
            raw_value: value.as_str().to_string(),
            unit: self.unit.clone(),
            confidence: self.confidence,
            source: self.label.clone(),
        })
    }
}

/// Regex-based recognizer for utility bills and fuel invoices.
///
/// Each rule reports at most one hit, in rule order.
#[derive(Debug, Clone)]
pub struct PatternRecognizer {
    rules: Vec<PatternRule>,
}

impl PatternRecognizer {
    pub fn new(rules: Vec<PatternRule>) -> Self {
        Self { rules }
    }

    /// Rules for electricity, natural gas, diesel, gasoline and peak demand.
    pub fn standard() -> Result<Self, AuditError> {
        Ok(Self::new(vec![
            PatternRule::new(
                SourceType::Electricity,
                r"(\d+,?\d*)\s*kWh",
                "kWh",
                0.92,
                "Electricity consumption",
            )?,
            PatternRule::new(
                SourceType::NaturalGas,
                r"(\d+,?\d*)\s*cubic feet",
                "cubic feet",
                0.88,
                "Natural gas usage",
            )?,
            PatternRule::new(
                SourceType::Diesel,
                r"Diesel.*?(\d+)\s*gallons",
                "gallons",
                0.95,
                "Diesel fuel consumption",
            )?,
            PatternRule::new(
                SourceType::Gasoline,
                r"Gasoline.*?(\d+)\s*gallons",
                "gallons",
                0.93,
                "Gasoline consumption",
            )?,
            // \b keeps "kWh" from matching as demand
            PatternRule::new(
                SourceType::PeakDemand,
                r"(\d+)\s*kW\b",
                "kW",
                0.85,
                "Peak electricity demand",
            )?,
        ]))
    }

    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }
}

impl Recognizer for PatternRecognizer {
    fn recognize(&self, text: &str) -> Vec<RawHit> {
        self.rules.iter().filter_map(|rule| rule.find(text)).collect()
    }
}
