pub mod feature_registry;
pub mod scaler;

pub use feature_registry::{FeatureSchema, LocationSchemaVersion};
pub use scaler::{ScalerKind, ScalerState};
