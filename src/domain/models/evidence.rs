//! Evidence domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence assumed for items that carry none (or a non-finite one).
pub const DEFAULT_ITEM_CONFIDENCE: f64 = 0.5;

/// One of the five evaluation dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Technical,
    Business,
    Market,
    Team,
    Financial,
}

impl Dimension {
    pub const ALL: [Self; 5] = [
        Self::Technical,
        Self::Business,
        Self::Market,
        Self::Team,
        Self::Financial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Business => "business",
            Self::Market => "market",
            Self::Team => "team",
            Self::Financial => "financial",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "technical" => Some(Self::Technical),
            "business" => Some(Self::Business),
            "market" => Some(Self::Market),
            "team" => Some(Self::Team),
            "financial" => Some(Self::Financial),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a piece of evidence came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_type: Option<String>,
    /// Checklist subtype this item covers, e.g. `security` or `funding`
    #[serde(default)]
    pub evidence_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Atomic unit of collected information about a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: String,
    pub category: Dimension,
    pub content: String,
    /// Source's own trust estimate in `[0, 1]`
    #[serde(default, alias = "confidence")]
    pub self_reported_confidence: Option<f64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub source_metadata: SourceMetadata,
}

impl EvidenceItem {
    pub fn new(
        id: impl Into<String>,
        category: Dimension,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            content: content.into(),
            self_reported_confidence: None,
            timestamp,
            source_metadata: SourceMetadata::default(),
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.self_reported_confidence = Some(confidence);
        self
    }

    pub fn with_evidence_type(mut self, evidence_type: impl Into<String>) -> Self {
        self.source_metadata.evidence_type = Some(evidence_type.into());
        self
    }

    /// Self-reported confidence clamped to `[0, 1]`, defaulting to 0.5.
    pub fn quality(&self) -> f64 {
        match self.self_reported_confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => DEFAULT_ITEM_CONFIDENCE,
        }
    }
}
