//! Scoring engine integration tests: worked example, bounds and purity.

mod common;

use common::{aged_evidence, evidence, reference_time};
use diligence::domain::models::{Dimension, EvidenceItem, Grade, Recommendation};
use diligence::services::scoring::checklist::CHECKLISTS;
use diligence::services::{ScoringEngine, ThesisRegistry};
use proptest::prelude::*;

/// Ten items, six technical with four positive and two negative signals.
fn worked_example() -> Vec<EvidenceItem> {
    vec![
        evidence("t1", Dimension::Technical, "Robust microservice architecture", 0.8),
        evidence("t2", Dimension::Technical, "Scalable Kubernetes platform", 0.8),
        evidence("t3", Dimension::Technical, "Modern React frontend", 0.8),
        evidence("t4", Dimension::Technical, "Secure SOC2 certified processes", 0.8),
        evidence("t5", Dimension::Technical, "Legacy billing module", 0.8),
        evidence("t6", Dimension::Technical, "Known vulnerability backlog", 0.8),
        evidence("b1", Dimension::Business, "Subscription pricing for enterprise customers", 0.8),
        evidence("m1", Dimension::Market, "Crowded market with several incumbents", 0.8),
        evidence("p1", Dimension::Team, "CTO joined last year", 0.8),
        evidence("f1", Dimension::Financial, "Series B funding", 0.8),
    ]
}

#[test]
fn test_worked_example_under_digital_transformation() {
    let engine = ScoringEngine::default();
    let result = engine.score(&worked_example(), "digital-transformation");

    let technical = result.dimensions.technical.score;
    assert!((55.0..=75.0).contains(&technical), "technical score {technical}");
    // (4 × 1.0 − 2 × 0.5) / 6 = 0.5 → 75 × 0.8
    assert!((technical - 60.0).abs() < 1e-9);

    let others_weight = 1.0 - 0.50;
    assert!((result.thesis_score - technical).abs() <= others_weight * 100.0);
    assert_eq!(result.dimensions.technical.evidence_count, 6);
    assert_eq!(result.thesis_id, "digital-transformation");
}

#[test]
fn test_adjusted_score_equals_weighted_score() {
    let engine = ScoringEngine::default();
    let result = engine.score(&worked_example(), "margin-expansion");

    assert_eq!(result.confidence_adjusted_score, result.weighted_score);
    assert_eq!(result.thesis_score, result.weighted_score);
    assert_eq!(result.confidence_breakdown.score_penalty, 0.0);
    assert!(result.confidence_breakdown.confidence_reduction > 0.0);
    assert!(!result.confidence_breakdown.missing_critical_evidence.is_empty());
}

#[test]
fn test_full_checklist_coverage_has_no_reduction() {
    let items: Vec<EvidenceItem> = CHECKLISTS
        .iter()
        .flat_map(|checklist| {
            checklist.required.iter().map(move |req| {
                evidence(req.key, checklist.dimension, "documented", 0.9)
                    .with_evidence_type(req.key)
            })
        })
        .collect();

    let result = ScoringEngine::default().score(&items, "buy-and-build");
    assert_eq!(result.confidence_breakdown.confidence_reduction, 0.0);
    assert!(result.confidence_breakdown.missing_critical_evidence.is_empty());
    assert_eq!(result.confidence_breakdown.evidence_coverage, 1.0);
}

#[test]
fn test_missing_evidence_never_changes_score() {
    let engine = ScoringEngine::default();
    let sparse = vec![evidence("t", Dimension::Technical, "documented", 0.9)];
    let declared = vec![evidence("t", Dimension::Technical, "documented", 0.9).with_evidence_type("security")];

    let a = engine.score(&sparse, "turnaround");
    let b = engine.score(&declared, "turnaround");
    assert_eq!(a.weighted_score, b.weighted_score);
    assert!(b.thesis_confidence > a.thesis_confidence);
}

#[test]
fn test_grade_and_recommendation_follow_weighted_score() {
    let engine = ScoringEngine::default();
    let result = engine.score(&worked_example(), "digital-transformation");
    assert_eq!(result.final_grade, Grade::from_score(result.weighted_score));
    assert_eq!(
        result.investment_recommendation,
        Recommendation::from_score(result.weighted_score)
    );
}

#[test]
fn test_every_thesis_weights_sum_to_one() {
    for profile in ThesisRegistry::builtin().profiles() {
        let sum = profile.weights().sum();
        assert!((sum - 1.0).abs() < 1e-12, "{} sums to {sum}", profile.id());
    }
}

#[test]
fn test_old_evidence_lowers_confidence_not_score() {
    let engine = ScoringEngine::default();
    let fresh = vec![aged_evidence("m", Dimension::Market, "strong growth", 0)];
    let stale = vec![aged_evidence("m", Dimension::Market, "strong growth", 500)];

    let fresh = engine.score_as_of(&fresh, "carve-out", reference_time());
    let stale = engine.score_as_of(&stale, "carve-out", reference_time());
    assert_eq!(fresh.weighted_score, stale.weighted_score);
    assert!(stale.thesis_confidence < fresh.thesis_confidence);
}

const WORDS: &[&str] = &[
    "strong", "weak", "growth", "legacy", "api", "revenue", "ceo", "funding", "churn", "the",
    "platform", "risk", "profitable", "hiring", "tam",
];
const THESES: &[&str] = &[
    "accelerate-organic-growth",
    "buy-and-build",
    "digital-transformation",
    "margin-expansion",
    "turnaround",
    "carve-out",
    "unknown-thesis",
];

fn arb_item() -> impl Strategy<Value = EvidenceItem> {
    (
        0usize..5,
        prop::collection::vec(prop::sample::select(WORDS), 0..8),
        prop::option::of(prop_oneof![-1.0f64..2.0, Just(f64::NAN)]),
        0i64..1000,
    )
        .prop_map(|(dim, words, confidence, days)| {
            let mut item = aged_evidence("p", Dimension::ALL[dim], &words.join(" "), days);
            item.self_reported_confidence = confidence;
            item
        })
}

proptest! {
    /// Property: every score and confidence stays within its range
    #[test]
    fn prop_scores_and_confidences_bounded(
        items in prop::collection::vec(arb_item(), 0..40),
        thesis in prop::sample::select(THESES),
    ) {
        let result = ScoringEngine::default().score_as_of(&items, thesis, reference_time());

        for (_, d) in result.dimensions.iter() {
            prop_assert!((0.0..=100.0).contains(&d.score));
            prop_assert!((0.0..=1.0).contains(&d.confidence));
        }
        prop_assert!((0.0..=100.0).contains(&result.weighted_score));
        prop_assert!((0.0..=1.0).contains(&result.thesis_confidence));
        prop_assert!((0.0..=0.5).contains(&result.confidence_breakdown.confidence_reduction));
        prop_assert_eq!(result.confidence_adjusted_score, result.weighted_score);
    }

    /// Property: scoring is a pure function of its input
    #[test]
    fn prop_scoring_is_idempotent(
        items in prop::collection::vec(arb_item(), 0..20),
        thesis in prop::sample::select(THESES),
    ) {
        let engine = ScoringEngine::default();
        let first = engine.score(&items, thesis);
        let second = engine.score(&items, thesis);
        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
