use std::collections::HashMap;

use tracing::{debug, warn};

use crate::factors::EmissionFactorTable;
use crate::model::{
    CalculationDetail, DocumentEmissions, EmissionsAggregate, EmissionsByType, ExtractedDocument,
    QuantityRecord, SourceType, TypeEmissions,
};
use crate::schema::standard;

/// Convert quantity records to emissions and total them overall, by source
/// type and by document.
///
/// A type missing from `factors` contributes zero emissions; the record is
/// still listed in `calculation_details`. A record whose emissions would push
/// any total past `f64::MAX` is dropped and logged. Types keep first-seen
/// order and documents keep input order. Reads no clock; `calculated_at` is
/// left unset.
pub fn aggregate(records: &[QuantityRecord], factors: &EmissionFactorTable) -> EmissionsAggregate {
    let mut acc = Accumulator::new(factors);
    for record in records {
        acc.add(record, None);
    }
    acc.finish()
}

/// Like [`aggregate`], but keyed on extracted documents: every document is
/// listed (including those with no records) and carries its name.
pub fn aggregate_documents(
    documents: &[ExtractedDocument],
    factors: &EmissionFactorTable,
) -> EmissionsAggregate {
    let mut acc = Accumulator::new(factors);
    for doc in documents {
        acc.document_slot(&doc.document_id, Some(&doc.document_name));
        for record in &doc.items {
            acc.add(record, Some(&doc.document_name));
        }
    }
    acc.finish()
}

struct Accumulator<'a> {
    factors: &'a EmissionFactorTable,
    total: f64,
    by_type: Vec<TypeEmissions>,
    type_index: HashMap<SourceType, usize>,
    by_document: Vec<DocumentEmissions>,
    document_index: HashMap<String, usize>,
    details: Vec<CalculationDetail>,
}

impl<'a> Accumulator<'a> {
    fn new(factors: &'a EmissionFactorTable) -> Self {
        Self {
            factors,
            total: 0.0,
            by_type: Vec::new(),
            type_index: HashMap::new(),
            by_document: Vec::new(),
            document_index: HashMap::new(),
            details: Vec::new(),
        }
    }

    fn document_slot(&mut self, document_id: &str, document_name: Option<&str>) -> usize {
        let by_document = &mut self.by_document;
        *self
            .document_index
            .entry(document_id.to_string())
            .or_insert_with(|| {
                by_document.push(DocumentEmissions {
                    document_id: document_id.to_string(),
                    document_name: document_name.map(str::to_string),
                    emissions: 0.0,
                    calculations: Vec::new(),
                });
                by_document.len() - 1
            })
    }

    fn type_slot(&mut self, record: &QuantityRecord) -> usize {
        let by_type = &mut self.by_type;
        *self
            .type_index
            .entry(record.source_type.clone())
            .or_insert_with(|| {
                by_type.push(TypeEmissions {
                    source_type: record.source_type.clone(),
                    total: 0.0,
                    count: 0,
                    unit: record.unit.clone(),
                });
                by_type.len() - 1
            })
    }

    fn add(&mut self, record: &QuantityRecord, document_name: Option<&str>) {
        let emission_factor = match self.factors.get(&record.source_type) {
            Some(factor) => factor,
            None => {
                warn!(
                    source_type = %record.source_type,
                    document_id = %record.document_id,
                    "no emission factor for source type; counting zero emissions"
                );
                0.0
            }
        };
        let emissions = record.value * emission_factor;
        if !emissions.is_finite() || !(self.total + emissions).is_finite() {
            warn!(
                source_type = %record.source_type,
                document_id = %record.document_id,
                value = record.value,
                emission_factor,
                "dropping record whose emissions overflow"
            );
            return;
        }

        let detail = CalculationDetail {
            document_id: record.document_id.clone(),
            document_name: document_name.map(str::to_string),
            source: record.source.clone(),
            source_type: record.source_type.clone(),
            value: record.value,
            unit: record.unit.clone(),
            emission_factor,
            emissions,
            confidence: record.confidence,
        };

        self.total += emissions;

        let t = self.type_slot(record);
        self.by_type[t].total += emissions;
        self.by_type[t].count += 1;

        let d = self.document_slot(&record.document_id, document_name);
        self.by_document[d].emissions += emissions;
        self.by_document[d].calculations.push(detail.clone());

        self.details.push(detail);
    }

    fn finish(self) -> EmissionsAggregate {
        debug!(
            total_emissions = self.total,
            source_types = self.by_type.len(),
            documents = self.by_document.len(),
            calculations = self.details.len(),
            "aggregated emissions"
        );
        EmissionsAggregate {
            total_emissions: self.total,
            emissions_by_type: EmissionsByType(self.by_type),
            emissions_by_document: self.by_document,
            calculation_details: self.details,
            factors_used: self.factors.clone(),
            methodology: standard::GHG_PROTOCOL_CORPORATE.to_string(),
            calculated_at: None,
        }
    }
}
