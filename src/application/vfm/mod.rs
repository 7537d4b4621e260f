pub mod compositor;
pub mod engine;
pub mod engine_cache;
pub mod feature_scaling;
pub mod forecaster;
pub mod report;
pub mod scorer;
pub mod summary;

pub use compositor::{
    FUTURE_PRICE_COLUMN, HORIZON_COLUMN, LOCATION_SCORE_COLUMN, PRICE_CHANGE_PCT_COLUMN,
    VFM_INDEX_COLUMN, VfmCompositor,
};
pub use engine::{EngineComponents, EngineState, ScorerComponents, VfmEngine};
pub use engine_cache::EngineCache;
pub use report::{EngineStatus, VfmReport};
pub use summary::BatchSummary;
