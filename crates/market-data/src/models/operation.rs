use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Upstream operations the proxy is allowed to forward.
///
/// The wire names match the upstream `function` query parameter exactly.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// Company fundamentals. Changes slowly.
    #[serde(rename = "OVERVIEW")]
    Overview,
    /// Daily OHLCV series. Changes once per trading day.
    #[serde(rename = "TIME_SERIES_DAILY")]
    TimeSeriesDaily,
}

impl Operation {
    pub const ALL: [Operation; 2] = [Operation::Overview, Operation::TimeSeriesDaily];

    /// The upstream `function` value for this operation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overview => "OVERVIEW",
            Self::TimeSeriesDaily => "TIME_SERIES_DAILY",
        }
    }

    /// Extra query parameters the upstream expects for this operation.
    pub fn extra_params(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Overview => &[],
            // 'full' is premium-only on the daily series
            Self::TimeSeriesDaily => &[("outputsize", "compact")],
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| ValidationError::UnsupportedOperation(s.to_string()))
    }
}
