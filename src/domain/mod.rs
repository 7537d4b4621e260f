// Forecast horizons
pub mod horizon;

// Feature schema and scaling parameters
pub mod ml;

// Tabular unit batches
pub mod table;

// VFM arithmetic and tiers
pub mod valuation;

// Domain-specific error types
pub mod errors;
