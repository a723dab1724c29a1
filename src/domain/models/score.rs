//! Scoring result types.

use serde::{Deserialize, Serialize};

use super::evidence::Dimension;

/// Letter grade for a weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            Self::A
        } else if score >= 70.0 {
            Self::B
        } else if score >= 55.0 {
            Self::C
        } else if score >= 40.0 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Investment recommendation derived from the weighted score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Strong Buy")]
    StrongBuy,
    Buy,
    Hold,
    Pass,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::StrongBuy
        } else if score >= 65.0 {
            Self::Buy
        } else if score >= 50.0 {
            Self::Hold
        } else {
            Self::Pass
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StrongBuy => "Strong Buy",
            Self::Buy => "Buy",
            Self::Hold => "Hold",
            Self::Pass => "Pass",
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score and confidence for one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionScore {
    /// 0-100
    pub score: f64,
    /// 0-1
    pub confidence: f64,
    pub evidence_count: usize,
}

/// Scores for all five dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DimensionScores {
    pub technical: DimensionScore,
    pub business: DimensionScore,
    pub market: DimensionScore,
    pub team: DimensionScore,
    pub financial: DimensionScore,
}

impl DimensionScores {
    pub fn get(&self, dimension: Dimension) -> &DimensionScore {
        match dimension {
            Dimension::Technical => &self.technical,
            Dimension::Business => &self.business,
            Dimension::Market => &self.market,
            Dimension::Team => &self.team,
            Dimension::Financial => &self.financial,
        }
    }

    pub fn get_mut(&mut self, dimension: Dimension) -> &mut DimensionScore {
        match dimension {
            Dimension::Technical => &mut self.technical,
            Dimension::Business => &mut self.business,
            Dimension::Market => &mut self.market,
            Dimension::Team => &mut self.team,
            Dimension::Financial => &mut self.financial,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, &DimensionScore)> {
        Dimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }
}

/// How much the engine trusts its own score, and why.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub overall_confidence: f64,
    /// Mean self-reported confidence over all items
    pub evidence_quality: f64,
    /// Fraction of dimensions with at least one item
    pub evidence_coverage: f64,
    /// Required checklist subtypes absent from the whole collection
    pub missing_critical_evidence: Vec<String>,
    /// Always zero: missing evidence lowers confidence, never the score
    pub score_penalty: f64,
    /// Multiplicative reduction applied to the thesis confidence
    pub confidence_reduction: f64,
}

/// Full output of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComprehensiveScoreResult {
    #[serde(flatten)]
    pub dimensions: DimensionScores,
    /// Thesis actually used, after default fallback
    pub thesis_id: String,
    pub thesis_score: f64,
    pub thesis_confidence: f64,
    pub weighted_score: f64,
    pub confidence_adjusted_score: f64,
    pub final_grade: Grade,
    pub investment_recommendation: Recommendation,
    pub confidence_breakdown: ConfidenceBreakdown,
}
