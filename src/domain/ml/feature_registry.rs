use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Current observed price of a unit. Also the first sequence feature.
pub const PRICE_COLUMN: &str = "total_deposit_median";

/// Opaque unit identifier (grid cell + size category + period).
pub const UNIT_ID_COLUMN: &str = "grid_id";

/// Ordered list of forecaster input columns.
/// This order MUST match exactly with the order used when the forecaster and its
/// input scaler were fit. Any change here is a breaking change for the models.
pub const SEQUENCE_FEATURE_NAMES: &[&str] = &[
    "total_deposit_median",
    "trade_count",
    "BASE_RATE",
    "CPI_YOY",
    "deposit_lag_1",
    "deposit_lag_3",
    "deposit_lag_6",
    "deposit_lag_9",
    "base_rate_lag_3",
    "base_rate_lag_6",
    "base_rate_lag_9",
    "cpi_yoy_lag_3",
    "cpi_yoy_lag_6",
    "cpi_yoy_lag_9",
    "base_rate_diff_3",
];

/// Location indices for scorers trained with the grid crime index.
pub const LOCATION_FEATURE_NAMES: &[&str] = &[
    "trans_index",
    "conv_index",
    "env_index",
    "safety_score_scaled",
    "grid_crime_index",
];

/// Location indices for scorers trained with hospital access in place of crime.
pub const LOCATION_FEATURE_NAMES_HOSPITAL: &[&str] = &[
    "trans_index",
    "conv_index",
    "env_index",
    "safety_score_scaled",
    "hospital_index",
];

/// Which fifth index the location scorer was trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationSchemaVersion {
    #[default]
    Crime,
    Hospital,
}

impl LocationSchemaVersion {
    pub fn feature_names(&self) -> &'static [&'static str] {
        match self {
            LocationSchemaVersion::Crime => LOCATION_FEATURE_NAMES,
            LocationSchemaVersion::Hospital => LOCATION_FEATURE_NAMES_HOSPITAL,
        }
    }
}

impl FromStr for LocationSchemaVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "crime" => Ok(LocationSchemaVersion::Crime),
            "hospital" => Ok(LocationSchemaVersion::Hospital),
            _ => anyhow::bail!(
                "Invalid location schema: {}. Must be 'crime' or 'hospital'",
                s
            ),
        }
    }
}

impl fmt::Display for LocationSchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationSchemaVersion::Crime => f.write_str("crime"),
            LocationSchemaVersion::Hospital => f.write_str("hospital"),
        }
    }
}

/// Column names the engine reads from an input batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub price_column: String,
    pub unit_id_column: String,
    pub sequence_features: Vec<String>,
    pub location_features: Vec<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::for_location_version(LocationSchemaVersion::default())
    }
}

impl FeatureSchema {
    pub fn for_location_version(version: LocationSchemaVersion) -> Self {
        Self {
            price_column: PRICE_COLUMN.to_string(),
            unit_id_column: UNIT_ID_COLUMN.to_string(),
            sequence_features: to_owned(SEQUENCE_FEATURE_NAMES),
            location_features: to_owned(version.feature_names()),
        }
    }

    /// Columns a batch must carry. Location columns are only required when the
    /// scorer will run.
    pub fn required_columns(&self, include_location: bool) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::with_capacity(
            1 + self.sequence_features.len() + self.location_features.len(),
        );
        columns.push(&self.price_column);
        for name in self.sequence_features.iter().chain(
            include_location
                .then_some(self.location_features.iter())
                .into_iter()
                .flatten(),
        ) {
            if !columns.contains(&name.as_str()) {
                columns.push(name);
            }
        }
        columns
    }
}

fn to_owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_widths() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.sequence_features.len(), 15);
        assert_eq!(schema.location_features.len(), 5);
        assert_eq!(schema.sequence_features[0], PRICE_COLUMN);
        assert_eq!(schema.location_features[4], "grid_crime_index");
    }

    #[test]
    fn test_hospital_version_swaps_fifth_index() {
        let schema = FeatureSchema::for_location_version(LocationSchemaVersion::Hospital);
        assert_eq!(schema.location_features[4], "hospital_index");
        assert_eq!(schema.location_features[..4], LOCATION_FEATURE_NAMES[..4]);
    }

    #[test]
    fn test_required_columns_deduplicates_price() {
        let schema = FeatureSchema::default();

        let without_location = schema.required_columns(false);
        assert_eq!(without_location.len(), 15);
        assert_eq!(without_location[0], PRICE_COLUMN);

        let with_location = schema.required_columns(true);
        assert_eq!(with_location.len(), 20);
        assert!(with_location.contains(&"safety_score_scaled"));
    }

    #[test]
    fn test_location_version_parsing() {
        assert_eq!(
            "Hospital".parse::<LocationSchemaVersion>().unwrap(),
            LocationSchemaVersion::Hospital
        );
        assert!("transit".parse::<LocationSchemaVersion>().is_err());
    }
}
