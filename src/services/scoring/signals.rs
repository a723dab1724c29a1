//! Lexical sentiment signals in evidence text.
//!
//! A deliberately simple word-list heuristic: an item is positive when it
//! contains more positive signal words than negative ones, and vice versa.

/// Words counted as positive signals.
const POSITIVE_SIGNALS: &[&str] = &[
    "strong", "excellent", "robust", "scalable", "modern", "innovative", "leading", "growth",
    "growing", "secure", "efficient", "proven", "profitable", "successful", "advanced",
    "reliable", "mature", "expanding", "award", "certified", "best", "increasing",
    "competitive", "differentiated", "recurring",
];

/// Words counted as negative signals.
const NEGATIVE_SIGNALS: &[&str] = &[
    "weak", "poor", "legacy", "outdated", "risk", "risky", "debt", "vulnerable",
    "vulnerability", "decline", "declining", "lack", "lacking", "limited", "concern",
    "concerns", "issue", "issues", "problem", "problems", "slow", "churn", "loss", "losses",
    "failure", "failing", "deprecated", "breach", "layoffs", "unprofitable", "struggling",
    "negative",
];

/// Sentiment of one evidence item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Contribution to a dimension's weighted sum.
    pub fn weight(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Neutral => 0.6,
            Self::Negative => -0.5,
        }
    }
}

/// Lowercased alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

pub fn classify(content: &str) -> Sentiment {
    let (positive, negative) = tokenize(content).fold((0_usize, 0_usize), |(pos, neg), token| {
        if POSITIVE_SIGNALS.contains(&token.as_str()) {
            (pos + 1, neg)
        } else if NEGATIVE_SIGNALS.contains(&token.as_str()) {
            (pos, neg + 1)
        } else {
            (pos, neg)
        }
    });

    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Sentiment::Positive,
        std::cmp::Ordering::Less => Sentiment::Negative,
        std::cmp::Ordering::Equal => Sentiment::Neutral,
    }
}
