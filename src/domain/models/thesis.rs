//! Investment thesis profiles.
//!
//! A thesis weights the five evaluation dimensions. Outside the crate a
//! profile is built through [`ThesisProfile::new`], which rejects weights that
//! are negative or non-finite and weights that do not sum to one.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::evidence::Dimension;

/// Allowed deviation of a weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Errors raised when defining thesis profiles.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ThesisError {
    #[error("Thesis id cannot be empty")]
    EmptyId,

    #[error("Thesis '{id}': {dimension} weight must be a finite, non-negative number (got {value})")]
    InvalidWeight {
        id: String,
        dimension: Dimension,
        value: f64,
    },

    #[error("Thesis '{id}': weights must sum to 1.0 (got {sum})")]
    WeightsDoNotSumToOne { id: String, sum: f64 },

    #[error("Thesis '{0}' is defined more than once")]
    DuplicateProfile(String),
}

/// Per-dimension weights of a thesis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThesisWeights {
    pub technical: f64,
    pub business: f64,
    pub market: f64,
    pub team: f64,
    pub financial: f64,
}

impl ThesisWeights {
    pub const fn new(technical: f64, business: f64, market: f64, team: f64, financial: f64) -> Self {
        Self {
            technical,
            business,
            market,
            team,
            financial,
        }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Technical => self.technical,
            Dimension::Business => self.business,
            Dimension::Market => self.market,
            Dimension::Team => self.team,
            Dimension::Financial => self.financial,
        }
    }

    pub fn sum(&self) -> f64 {
        Dimension::ALL.iter().map(|d| self.get(*d)).sum()
    }
}

/// A named weighting scheme over the five dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThesisProfile {
    id: String,
    name: String,
    weights: ThesisWeights,
}

/// Unvalidated profile as it appears in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThesisDefinition {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub weights: ThesisWeights,
}

impl ThesisProfile {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        weights: ThesisWeights,
    ) -> Result<Self, ThesisError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ThesisError::EmptyId);
        }

        for dimension in Dimension::ALL {
            let value = weights.get(dimension);
            if !value.is_finite() || value < 0.0 {
                return Err(ThesisError::InvalidWeight {
                    id,
                    dimension,
                    value,
                });
            }
        }

        let sum = weights.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ThesisError::WeightsDoNotSumToOne { id, sum });
        }

        Ok(Self {
            id,
            name: name.into(),
            weights,
        })
    }

    /// Build a profile from weights already known to be valid.
    pub(crate) fn trusted(id: &str, name: &str, weights: ThesisWeights) -> Self {
        debug_assert!((weights.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE);
        Self {
            id: id.to_string(),
            name: name.to_string(),
            weights,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weights(&self) -> &ThesisWeights {
        &self.weights
    }
}

impl TryFrom<ThesisDefinition> for ThesisProfile {
    type Error = ThesisError;

    fn try_from(def: ThesisDefinition) -> Result<Self, Self::Error> {
        let name = def.name.unwrap_or_else(|| def.id.clone());
        Self::new(def.id, name, def.weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_profile() {
        let profile =
            ThesisProfile::new("custom", "Custom", ThesisWeights::new(0.2, 0.2, 0.2, 0.2, 0.2))
                .unwrap();
        assert_eq!(profile.id(), "custom");
        assert_eq!(profile.weights().get(Dimension::Team), 0.2);
    }

    #[test]
    fn test_rejects_bad_sum() {
        let err = ThesisProfile::new("x", "X", ThesisWeights::new(0.5, 0.5, 0.5, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, ThesisError::WeightsDoNotSumToOne { .. }));
    }

    #[test]
    fn test_rejects_negative_and_nan_weights() {
        let err = ThesisProfile::new("x", "X", ThesisWeights::new(1.2, -0.2, 0.0, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(
            err,
            ThesisError::InvalidWeight { dimension: Dimension::Business, .. }
        ));

        let err = ThesisProfile::new("x", "X", ThesisWeights::new(f64::NAN, 0.5, 0.5, 0.0, 0.0))
            .unwrap_err();
        assert!(matches!(err, ThesisError::InvalidWeight { .. }));
    }

    #[test]
    fn test_rejects_empty_id() {
        let err = ThesisProfile::new(" ", "X", ThesisWeights::new(1.0, 0.0, 0.0, 0.0, 0.0))
            .unwrap_err();
        assert_eq!(err, ThesisError::EmptyId);
    }

    #[test]
    fn test_definition_name_defaults_to_id() {
        let def = ThesisDefinition {
            id: "platform-play".to_string(),
            name: None,
            weights: ThesisWeights::new(0.4, 0.3, 0.1, 0.1, 0.1),
        };
        let profile = ThesisProfile::try_from(def).unwrap();
        assert_eq!(profile.name(), "platform-play");
    }
}
