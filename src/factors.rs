use std::fmt;
use std::path::Path;

use polars::prelude::*;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::error::AuditError;
use crate::model::SourceType;
use crate::schema::factor_table;

/// Standard emission factors (kg CO2e per unit).
pub const DEFAULT_FACTORS: [(SourceType, f64); 5] = [
    (SourceType::Electricity, 0.45), // per kWh (US average)
    (SourceType::NaturalGas, 0.0053), // per cubic foot
    (SourceType::Diesel, 10.15),      // per gallon
    (SourceType::Gasoline, 8.89),     // per gallon
    (SourceType::PeakDemand, 0.45),   // same as electricity
];

/// Source type → kg CO2e per unit. Built once, then shared read-only.
///
/// Entries keep insertion order so snapshots serialize the way they were
/// configured.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionFactorTable {
    entries: Vec<(SourceType, f64)>,
}

impl Default for EmissionFactorTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_FACTORS.to_vec(),
        }
    }
}

impl EmissionFactorTable {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a table from `(type, factor)` pairs, rejecting negative,
    /// non-finite and duplicate entries.
    pub fn from_entries<I>(entries: I) -> Result<Self, AuditError>
    where
        I: IntoIterator<Item = (SourceType, f64)>,
    {
        let mut table = Self::empty();
        for (source_type, factor) in entries {
            table.insert(source_type, factor)?;
        }
        Ok(table)
    }

    fn insert(&mut self, source_type: SourceType, factor: f64) -> Result<(), AuditError> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(AuditError::Validation(format!(
                "Emission factor for '{source_type}' must be a finite non-negative number, got {factor}"
            )));
        }
        if self.get(&source_type).is_some() {
            return Err(AuditError::Validation(format!(
                "Duplicate emission factor for '{source_type}'"
            )));
        }
        self.entries.push((source_type, factor));
        Ok(())
    }

    pub fn get(&self, source_type: &SourceType) -> Option<f64> {
        self.entries
            .iter()
            .find(|(key, _)| key == source_type)
            .map(|(_, factor)| *factor)
    }

    /// Factor for `source_type`, or 0 when the table has no entry.
    pub fn factor_for(&self, source_type: &SourceType) -> f64 {
        self.get(source_type).unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SourceType, f64)> {
        self.entries.iter().map(|(key, factor)| (key, *factor))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── Loading ─────────────────────────────────────────────────────────────

    /// Load a factor table from a CSV with `source_type` and `factor` columns.
    ///
    /// Columns are read as strings, whitespace is trimmed, and `factor` is
    /// cast to Float64. A factor that fails to parse is a validation error.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let mut raw = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)) // all columns as String
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?;

        let trimmed: Vec<String> = raw
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        raw.set_column_names(trimmed)?;

        for required in [factor_table::SOURCE_TYPE, factor_table::FACTOR] {
            if raw.column(required).is_err() {
                return Err(AuditError::MissingColumn(required.to_string()));
            }
        }

        let df = raw
            .lazy()
            .with_columns([col(factor_table::FACTOR)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .cast(DataType::Float64)])
            .collect()?;

        let keys = df.column(factor_table::SOURCE_TYPE)?.str()?;
        let values = df.column(factor_table::FACTOR)?.f64()?;

        let mut table = Self::empty();
        for (row, (key, value)) in keys.into_iter().zip(values.into_iter()).enumerate() {
            let key = key.ok_or_else(|| {
                AuditError::InvalidData(format!("Null source_type at row {row}"))
            })?;
            let factor = value.ok_or_else(|| {
                AuditError::Validation(format!("Factor for '{key}' at row {row} is not a number"))
            })?;
            table.insert(SourceType::from(key), factor)?;
        }

        debug!(path = %path.display(), entries = table.len(), "loaded emission factor table");
        Ok(table)
    }

    /// Parse a JSON object such as `{"electricity": 0.45, "diesel": 10.15}`.
    pub fn from_json_str(json: &str) -> Result<Self, AuditError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Serialize for EmissionFactorTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, factor) in &self.entries {
            map.serialize_entry(key.as_str(), factor)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EmissionFactorTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = EmissionFactorTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of source type to emission factor")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut table = EmissionFactorTable::empty();
                while let Some((key, factor)) = access.next_entry::<String, f64>()? {
                    table
                        .insert(SourceType::from(key), factor)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}
