//! Confidence scoring engine.
//!
//! Turns a collection of evidence and a thesis selector into per-dimension
//! scores, a thesis-weighted score, a grade and a recommendation, together
//! with an estimate of how far the result can be trusted.
//!
//! Scoring is pure: the same evidence and thesis always produce the same
//! result. Recency is measured against the newest item unless an explicit
//! reference time is passed to [`ScoringEngine::score_as_of`].
//!
//! Missing evidence never lowers the score itself. It lowers the thesis
//! confidence by 10% per absent required subtype, capped at 50%.

pub mod checklist;
pub mod signals;

use chrono::{DateTime, Duration, Utc};

use self::checklist::{checklist_for, expected_total, missing_critical_evidence};
use self::signals::classify;
use crate::domain::models::{
    ComprehensiveScoreResult, ConfidenceBreakdown, Dimension, DimensionScore, DimensionScores,
    EvidenceItem, Grade, Recommendation, ScoringConfig, ThesisProfile,
};
use crate::services::thesis_registry::ThesisRegistry;

/// Weight of each confidence component for a dimension.
const QUANTITY_WEIGHT: f64 = 0.20;
const QUALITY_WEIGHT: f64 = 0.30;
const COVERAGE_WEIGHT: f64 = 0.20;
const RECENCY_WEIGHT: f64 = 0.15;
const CONSISTENCY_WEIGHT: f64 = 0.15;
/// Source consistency is not measured; every dimension gets this value.
const ASSUMED_CONSISTENCY: f64 = 0.8;

/// Weight of each component of the thesis confidence.
const DIMENSION_CONFIDENCE_WEIGHT: f64 = 0.6;
const VOLUME_WEIGHT: f64 = 0.2;
const OVERALL_QUALITY_WEIGHT: f64 = 0.2;

const REDUCTION_PER_MISSING: f64 = 0.10;
const MAX_CONFIDENCE_REDUCTION: f64 = 0.50;

/// Stateless scorer; cheap to share across threads.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    registry: ThesisRegistry,
    recency_window: Duration,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(ThesisRegistry::builtin())
    }
}

impl ScoringEngine {
    pub fn new(registry: ThesisRegistry) -> Self {
        Self::with_config(registry, &ScoringConfig::default())
    }

    pub fn with_config(registry: ThesisRegistry, config: &ScoringConfig) -> Self {
        Self {
            registry,
            recency_window: Duration::days(i64::from(config.recency_window_days.max(1))),
        }
    }

    pub fn registry(&self) -> &ThesisRegistry {
        &self.registry
    }

    /// Score evidence under a thesis, measuring recency from the newest item.
    pub fn score(&self, evidence: &[EvidenceItem], thesis_id: &str) -> ComprehensiveScoreResult {
        let as_of = evidence
            .iter()
            .map(|item| item.timestamp)
            .max()
            .unwrap_or_default();
        self.score_as_of(evidence, thesis_id, as_of)
    }

    /// Score evidence under a thesis, measuring recency from `as_of`.
    pub fn score_as_of(
        &self,
        evidence: &[EvidenceItem],
        thesis_id: &str,
        as_of: DateTime<Utc>,
    ) -> ComprehensiveScoreResult {
        let thesis = self.registry.resolve(thesis_id);

        let mut dimensions = DimensionScores::default();
        for dimension in Dimension::ALL {
            let bucket: Vec<&EvidenceItem> =
                evidence.iter().filter(|item| item.category == dimension).collect();
            *dimensions.get_mut(dimension) = self.score_dimension(dimension, &bucket, as_of);
        }

        let weighted_score = weighted_score(&dimensions, thesis);

        let evidence_quality = mean(evidence.iter().map(EvidenceItem::quality));
        let mean_dimension_confidence =
            dimensions.iter().map(|(_, d)| d.confidence).sum::<f64>() / Dimension::ALL.len() as f64;
        let volume = ratio_capped(evidence.len(), expected_total());
        let base_confidence = DIMENSION_CONFIDENCE_WEIGHT * mean_dimension_confidence
            + VOLUME_WEIGHT * volume
            + OVERALL_QUALITY_WEIGHT * evidence_quality;

        let missing = missing_critical_evidence(evidence);
        let confidence_reduction =
            (REDUCTION_PER_MISSING * missing.len() as f64).min(MAX_CONFIDENCE_REDUCTION);
        let thesis_confidence = (base_confidence * (1.0 - confidence_reduction)).clamp(0.0, 1.0);

        let covered_dimensions = dimensions.iter().filter(|(_, d)| d.evidence_count > 0).count();

        tracing::debug!(
            thesis = thesis.id(),
            evidence = evidence.len(),
            weighted_score,
            thesis_confidence,
            missing = missing.len(),
            "scored evidence"
        );

        ComprehensiveScoreResult {
            dimensions,
            thesis_id: thesis.id().to_string(),
            thesis_score: weighted_score,
            thesis_confidence,
            weighted_score,
            confidence_adjusted_score: weighted_score,
            final_grade: Grade::from_score(weighted_score),
            investment_recommendation: Recommendation::from_score(weighted_score),
            confidence_breakdown: ConfidenceBreakdown {
                overall_confidence: thesis_confidence,
                evidence_quality,
                evidence_coverage: covered_dimensions as f64 / Dimension::ALL.len() as f64,
                missing_critical_evidence: missing,
                score_penalty: 0.0,
                confidence_reduction,
            },
        }
    }

    fn score_dimension(
        &self,
        dimension: Dimension,
        items: &[&EvidenceItem],
        as_of: DateTime<Utc>,
    ) -> DimensionScore {
        if items.is_empty() {
            return DimensionScore::default();
        }

        let n = items.len() as f64;
        let signal_sum: f64 = items.iter().map(|item| classify(&item.content).weight()).sum();
        // Best case is every item positive (weight 1.0 each); 50 is neutral.
        let raw = 50.0f64.mul_add(signal_sum / n, 50.0).clamp(0.0, 100.0);
        let quality = mean(items.iter().map(|item| item.quality()));
        let score = (raw * quality).clamp(0.0, 100.0);

        let checklist = checklist_for(dimension);
        let confidence = QUANTITY_WEIGHT * ratio_capped(items.len(), checklist.expected_count)
            + QUALITY_WEIGHT * quality
            + COVERAGE_WEIGHT * checklist.coverage(items)
            + RECENCY_WEIGHT * self.recency(items, as_of)
            + CONSISTENCY_WEIGHT * ASSUMED_CONSISTENCY;

        DimensionScore {
            score,
            confidence: confidence.clamp(0.0, 1.0),
            evidence_count: items.len(),
        }
    }

    /// Mean freshness in `[0, 1]`; items at or after `as_of` count as fresh.
    fn recency(&self, items: &[&EvidenceItem], as_of: DateTime<Utc>) -> f64 {
        let window = self.recency_window.num_seconds() as f64;
        mean(items.iter().map(|item| {
            let age = (as_of - item.timestamp).num_seconds().max(0) as f64;
            (1.0 - age / window).max(0.0)
        }))
    }
}

fn weighted_score(dimensions: &DimensionScores, thesis: &ThesisProfile) -> f64 {
    dimensions
        .iter()
        .map(|(dimension, d)| d.score * thesis.weights().get(dimension))
        .sum::<f64>()
        .clamp(0.0, 100.0)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn ratio_capped(count: usize, expected: usize) -> f64 {
    if expected == 0 {
        return 1.0;
    }
    (count as f64 / expected as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: Dimension, content: &str, confidence: f64) -> EvidenceItem {
        EvidenceItem::new("e", category, content, Utc::now()).with_confidence(confidence)
    }

    #[test]
    fn test_empty_evidence_is_well_defined() {
        let engine = ScoringEngine::default();
        let result = engine.score(&[], "buy-and-build");

        assert_eq!(result.weighted_score, 0.0);
        assert_eq!(result.thesis_confidence, 0.0);
        assert_eq!(result.final_grade, Grade::F);
        assert_eq!(result.investment_recommendation, Recommendation::Pass);
        for (_, d) in result.dimensions.iter() {
            assert_eq!(*d, DimensionScore::default());
        }
        assert_eq!(result.confidence_breakdown.confidence_reduction, MAX_CONFIDENCE_REDUCTION);
        assert_eq!(result.confidence_breakdown.evidence_coverage, 0.0);
    }

    #[test]
    fn test_all_positive_full_confidence_scores_100() {
        let engine = ScoringEngine::default();
        let evidence = vec![item(Dimension::Market, "strong growth", 1.0)];
        let result = engine.score(&evidence, "accelerate-organic-growth");
        assert_eq!(result.dimensions.market.score, 100.0);
        assert!((result.weighted_score - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_item_scores_above_midpoint() {
        let engine = ScoringEngine::default();
        let evidence = vec![item(Dimension::Team, "Team of twelve", 1.0)];
        let result = engine.score(&evidence, "turnaround");
        assert!((result.dimensions.team.score - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_confidence_defaults_to_half() {
        let engine = ScoringEngine::default();
        let evidence = vec![EvidenceItem::new("e", Dimension::Financial, "profitable", Utc::now())];
        let result = engine.score(&evidence, "margin-expansion");
        assert!((result.dimensions.financial.score - 50.0).abs() < 1e-9);
        assert!((result.confidence_breakdown.evidence_quality - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_thesis_resolves_to_default() {
        let engine = ScoringEngine::default();
        let result = engine.score(&[item(Dimension::Market, "growth", 0.9)], "does-not-exist");
        assert_eq!(result.thesis_id, "accelerate-organic-growth");
    }

    #[test]
    fn test_stale_evidence_lowers_confidence_only() {
        let engine = ScoringEngine::default();
        let now = Utc::now();
        let fresh = vec![item(Dimension::Technical, "robust architecture", 0.8)];
        let mut stale = fresh.clone();
        stale[0].timestamp = now - Duration::days(400);

        let fresh_result = engine.score_as_of(&fresh, "buy-and-build", now);
        let stale_result = engine.score_as_of(&stale, "buy-and-build", now);

        assert_eq!(fresh_result.dimensions.technical.score, stale_result.dimensions.technical.score);
        assert!(stale_result.dimensions.technical.confidence < fresh_result.dimensions.technical.confidence);
    }

    #[test]
    fn test_recency_window_configurable() {
        let now = Utc::now();
        let mut evidence = vec![item(Dimension::Team, "leadership", 0.7)];
        evidence[0].timestamp = now - Duration::days(30);

        let short = ScoringEngine::with_config(
            ThesisRegistry::builtin(),
            &ScoringConfig { recency_window_days: 30 },
        );
        let long = ScoringEngine::default();

        assert!(
            short.score_as_of(&evidence, "turnaround", now).dimensions.team.confidence
                < long.score_as_of(&evidence, "turnaround", now).dimensions.team.confidence
        );
    }
}
