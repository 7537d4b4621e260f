//! Value-for-money arithmetic.
//!
//! VFM = alpha * (location_score / 100) + beta * (future_price / (current_price + EPSILON))
//! when the location scorer contributes, and the plain price ratio otherwise.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Guard added to every price denominator.
pub const EPSILON: f64 = 1e-6;

/// Upper bound of the location score scale
pub const MAX_LOCATION_SCORE: f64 = 100.0;

/// Blend weights for the scorer term (alpha) and the price-ratio term (beta).
///
/// The weights are not required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VfmWeights {
    pub alpha: f64,
    pub beta: f64,
}

impl Default for VfmWeights {
    fn default() -> Self {
        Self {
            alpha: 0.6,
            beta: 0.4,
        }
    }
}

/// VFM index and price change for a single unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub vfm_index: f64,
    pub price_change_pct: f64,
}

/// Combines a forecast and a location score into a [`Valuation`].
///
/// With `use_scorer == false` the scorer term is removed entirely, so
/// `location_score` and `alpha` have no effect.
pub fn compose(
    current_price: f64,
    future_price: f64,
    location_score: f64,
    use_scorer: bool,
    weights: VfmWeights,
) -> Valuation {
    let price_ratio = future_price / (current_price + EPSILON);
    let vfm_index = if use_scorer {
        weights.alpha * (location_score / MAX_LOCATION_SCORE) + weights.beta * price_ratio
    } else {
        price_ratio
    };

    Valuation {
        vfm_index,
        price_change_pct: (future_price - current_price) / (current_price + EPSILON) * 100.0,
    }
}

/// Dashboard bands for the VFM index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VfmTier {
    Low,
    Fair,
    Good,
    Excellent,
}

impl VfmTier {
    /// `>= 2.0` excellent, `[1.0, 2.0)` good, `[0.5, 1.0)` fair, anything else low.
    pub fn classify(vfm_index: f64) -> Self {
        if vfm_index >= 2.0 {
            VfmTier::Excellent
        } else if vfm_index >= 1.0 {
            VfmTier::Good
        } else if vfm_index >= 0.5 {
            VfmTier::Fair
        } else {
            VfmTier::Low
        }
    }

    pub fn all() -> [VfmTier; 4] {
        [VfmTier::Excellent, VfmTier::Good, VfmTier::Fair, VfmTier::Low]
    }
}

impl fmt::Display for VfmTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            VfmTier::Excellent => "excellent",
            VfmTier::Good => "good",
            VfmTier::Fair => "fair",
            VfmTier::Low => "low",
        };
        f.write_str(label)
    }
}

/// Where a per-row model output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    /// Produced by the model
    Model,
    /// Model unavailable or failed; forecast passes the current price through,
    /// score falls back to zero
    Fallback,
    /// Component disabled for this engine
    Skipped,
}

impl PredictionSource {
    pub fn label(&self) -> &'static str {
        match self {
            PredictionSource::Model => "model",
            PredictionSource::Fallback => "fallback",
            PredictionSource::Skipped => "skipped",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blended_index() {
        let v = compose(1000.0, 1120.0, 75.0, true, VfmWeights::default());
        assert!((v.vfm_index - 0.898).abs() < 1e-6);
        assert!((v.price_change_pct - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_scorer_term_removed_when_disabled() {
        let a = compose(1000.0, 1010.0, 75.0, false, VfmWeights { alpha: 0.9, beta: 0.1 });
        let b = compose(1000.0, 1010.0, 0.0, false, VfmWeights { alpha: 0.0, beta: 5.0 });
        assert_eq!(a.vfm_index, 1010.0 / (1000.0 + EPSILON));
        assert_eq!(a, b);
        assert!((a.vfm_index - 1.01).abs() < 1e-6);
        assert!((a.price_change_pct - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_price_is_finite() {
        let v = compose(0.0, 500.0, 50.0, true, VfmWeights::default());
        assert!(v.vfm_index.is_finite());
        assert!(v.price_change_pct.is_finite());
        assert_eq!(v.price_change_pct, 500.0 / EPSILON * 100.0);
    }

    #[test]
    fn test_zero_price_and_zero_forecast() {
        let v = compose(0.0, 0.0, 0.0, false, VfmWeights::default());
        assert_eq!(v.vfm_index, 0.0);
        assert_eq!(v.price_change_pct, 0.0);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(VfmTier::classify(2.0), VfmTier::Excellent);
        assert_eq!(VfmTier::classify(1.999), VfmTier::Good);
        assert_eq!(VfmTier::classify(1.0), VfmTier::Good);
        assert_eq!(VfmTier::classify(0.5), VfmTier::Fair);
        assert_eq!(VfmTier::classify(0.49), VfmTier::Low);
        assert_eq!(VfmTier::classify(f64::NAN), VfmTier::Low);
    }
}
