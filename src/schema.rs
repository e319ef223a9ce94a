/// Column-name and key constants for carbon-audit tables.
/// Single source of truth - exported to Python via PyO3.

// ── Source type keys ────────────────────────────────────────────────────────
pub mod source_type {
    pub const ELECTRICITY: &str = "electricity";
    pub const NATURAL_GAS: &str = "natural_gas";
    pub const DIESEL: &str = "diesel";
    pub const GASOLINE: &str = "gasoline";
    pub const PEAK_DEMAND: &str = "peak_demand";

    pub const ALL: [&str; 5] = [ELECTRICITY, NATURAL_GAS, DIESEL, GASOLINE, PEAK_DEMAND];
}

// ── Emission factor table columns ───────────────────────────────────────────
pub mod factor_table {
    pub const SOURCE_TYPE: &str = "source_type";
    pub const FACTOR: &str = "factor";
}

// ── Calculation detail columns ──────────────────────────────────────────────
pub mod calculation {
    pub const DOCUMENT_ID: &str = "document_id";
    pub const DOCUMENT_NAME: &str = "document_name";
    pub const SOURCE: &str = "source";
    pub const SOURCE_TYPE: &str = "source_type";
    pub const VALUE: &str = "value";
    pub const UNIT: &str = "unit";
    pub const EMISSION_FACTOR: &str = "emission_factor";
    pub const EMISSIONS: &str = "emissions";
    pub const CONFIDENCE: &str = "confidence";

    pub const ALL: [&str; 9] = [
        DOCUMENT_ID,
        DOCUMENT_NAME,
        SOURCE,
        SOURCE_TYPE,
        VALUE,
        UNIT,
        EMISSION_FACTOR,
        EMISSIONS,
        CONFIDENCE,
    ];
}

// ── Standards and methodology labels ────────────────────────────────────────
pub mod standard {
    pub const ISO_14064_1: &str = "ISO 14064-1";
    pub const GHG_PROTOCOL: &str = "GHG Protocol";
    pub const GHG_PROTOCOL_CORPORATE: &str = "GHG Protocol Corporate Standard";
}
