use crate::libs::error::LinkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Methods able to score a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ScoringMethod {
    #[serde(rename = "metcalf")]
    Metcalf,
    #[serde(rename = "hg")]
    Hypergeom,
    #[serde(rename = "likescore")]
    Likelihood,
}

impl ScoringMethod {
    pub const ALL: [ScoringMethod; 3] = [
        ScoringMethod::Metcalf,
        ScoringMethod::Hypergeom,
        ScoringMethod::Likelihood,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ScoringMethod::Metcalf => "metcalf",
            ScoringMethod::Hypergeom => "hg",
            ScoringMethod::Likelihood => "likescore",
        }
    }
}

impl fmt::Display for ScoringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ScoringMethod {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScoringMethod::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                LinkError::invalid_value(format!(
                    "unknown scoring method {}, expected one of metcalf, hg, likescore",
                    s
                ))
            })
    }
}

/// Parameters a score was computed with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreParams {
    pub cutoff: f64,
    pub standardised: bool,
}

impl Default for ScoreParams {
    fn default() -> Self {
        Self {
            cutoff: 0.0,
            standardised: false,
        }
    }
}

/// The value one scoring method assigned to a link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub method: ScoringMethod,
    pub value: f64,
    pub parameter: ScoreParams,
}

impl Score {
    /// # Errors
    /// `InvalidValue` for an unknown method name.
    ///
    /// # Example
    /// ```
    /// use nplink::libs::scoring::{Score, ScoreParams, ScoringMethod};
    /// let score = Score::new("hg", 0.01, ScoreParams::default()).unwrap();
    /// assert_eq!(score.method, ScoringMethod::Hypergeom);
    /// assert!(Score::new("rosetta", 1.0, ScoreParams::default()).is_err());
    /// ```
    pub fn new(name: &str, value: f64, parameter: ScoreParams) -> Result<Self, LinkError> {
        Ok(Self::of(name.parse()?, value, parameter))
    }

    pub fn of(method: ScoringMethod, value: f64, parameter: ScoreParams) -> Self {
        Self {
            method,
            value,
            parameter,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.method, self.value)
    }
}
