use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Forecast lead time in months.
///
/// The forecaster always emits one column per horizon, in the order returned by
/// [`Horizon::all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    ThreeMonths,
    SixMonths,
    NineMonths,
    TwelveMonths,
}

impl Horizon {
    /// Horizon used when a caller asks for an unsupported lead time
    pub const FALLBACK: Horizon = Horizon::SixMonths;

    /// Resolves a lead time in months.
    ///
    /// Anything other than 3, 6, 9 or 12 resolves to the 6-month horizon.
    pub fn from_months(months: u32) -> Self {
        match months {
            3 => Horizon::ThreeMonths,
            6 => Horizon::SixMonths,
            9 => Horizon::NineMonths,
            12 => Horizon::TwelveMonths,
            other => {
                debug!(
                    "Unsupported horizon {} months, using {} months",
                    other,
                    Self::FALLBACK.months()
                );
                Self::FALLBACK
            }
        }
    }

    pub fn months(&self) -> u32 {
        match self {
            Horizon::ThreeMonths => 3,
            Horizon::SixMonths => 6,
            Horizon::NineMonths => 9,
            Horizon::TwelveMonths => 12,
        }
    }

    /// Column of the forecaster output holding this horizon
    pub fn column_index(&self) -> usize {
        match self {
            Horizon::ThreeMonths => 0,
            Horizon::SixMonths => 1,
            Horizon::NineMonths => 2,
            Horizon::TwelveMonths => 3,
        }
    }

    /// Returns all horizons in forecaster column order
    pub fn all() -> [Horizon; 4] {
        [
            Horizon::ThreeMonths,
            Horizon::SixMonths,
            Horizon::NineMonths,
            Horizon::TwelveMonths,
        ]
    }
}

impl Default for Horizon {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}m", self.months())
    }
}
