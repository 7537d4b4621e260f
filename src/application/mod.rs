// Model backends and artifact loading
pub mod ml;

// VFM pipeline: scaling, forecasting, scoring, composition
pub mod vfm;
