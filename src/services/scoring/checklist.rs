//! Required-evidence checklist per dimension.

use std::collections::HashSet;

use super::signals::tokenize;
use crate::domain::models::{Dimension, EvidenceItem};

/// A kind of evidence a complete assessment should contain.
#[derive(Debug, Clone, Copy)]
pub struct RequiredEvidence {
    pub key: &'static str,
    /// Any token starting with one of these marks the subtype present
    pub prefixes: &'static [&'static str],
    /// Short or ambiguous terms that only count as whole tokens
    pub words: &'static [&'static str],
}

/// Checklist for one dimension.
#[derive(Debug, Clone, Copy)]
pub struct DimensionChecklist {
    pub dimension: Dimension,
    /// Item count at which quantity stops adding confidence
    pub expected_count: usize,
    pub required: &'static [RequiredEvidence],
}

const fn req(
    key: &'static str,
    prefixes: &'static [&'static str],
    words: &'static [&'static str],
) -> RequiredEvidence {
    RequiredEvidence { key, prefixes, words }
}

pub static CHECKLISTS: [DimensionChecklist; 5] = [
    DimensionChecklist {
        dimension: Dimension::Technical,
        expected_count: 10,
        required: &[
            req("technology_stack", &["stack", "framework", "language", "kubernetes", "react", "python", "java"], &["rust", "go"]),
            req("architecture", &["architect", "microservice", "monolith", "infrastructure", "cloud", "serverless"], &[]),
            req("security", &["security", "secure", "encrypt", "soc2", "iso27001", "compliance", "vulnerab", "penetration"], &[]),
            req("scalability", &["scal", "performance", "latency", "throughput", "uptime"], &[]),
            req("api_capabilities", &["api", "integration", "webhook", "endpoint"], &["sdk", "sdks"]),
        ],
    },
    DimensionChecklist {
        dimension: Dimension::Business,
        expected_count: 8,
        required: &[
            req("business_model", &["saas", "subscription", "marketplace", "freemium", "pricing", "licens"], &[]),
            req("revenue_streams", &["revenue", "sales", "billing", "monetiz"], &["arr", "mrr"]),
            req("customer_segments", &["customer", "client", "enterprise", "segment"], &["smb", "smbs"]),
            req("competitive_advantage", &["moat", "advantage", "differentiat", "patent", "proprietary"], &[]),
        ],
    },
    DimensionChecklist {
        dimension: Dimension::Market,
        expected_count: 6,
        required: &[
            req("market_size", &["addressable", "size", "billion"], &["tam", "sam", "som"]),
            req("competition", &["competit", "rival", "incumbent", "alternative"], &[]),
            req("growth_metrics", &["growth", "growing", "expansion"], &["cagr", "yoy"]),
        ],
    },
    DimensionChecklist {
        dimension: Dimension::Team,
        expected_count: 5,
        required: &[
            req("leadership", &["founder", "leadership", "executive"], &["ceo", "cto", "cfo", "coo"]),
            req("team_strength", &["engineer", "team", "headcount", "employee", "talent", "expertise"], &[]),
            req("hiring", &["hiring", "recruit", "opening", "career"], &["job"]),
        ],
    },
    DimensionChecklist {
        dimension: Dimension::Financial,
        expected_count: 6,
        required: &[
            req("funding", &["funding", "raised", "series", "investor", "valuation", "venture"], &[]),
            req("profitability", &["profit", "ebitda", "margin", "breakeven", "earnings"], &[]),
            req("unit_economics", &["payback", "churn", "retention"], &["ltv", "cac", "unit"]),
        ],
    },
];

pub fn checklist_for(dimension: Dimension) -> &'static DimensionChecklist {
    let index = Dimension::ALL
        .iter()
        .position(|d| *d == dimension)
        .unwrap_or_default();
    &CHECKLISTS[index]
}

/// Sum of expected item counts over all dimensions.
pub fn expected_total() -> usize {
    CHECKLISTS.iter().map(|c| c.expected_count).sum()
}

impl RequiredEvidence {
    /// Whether `item` declares or mentions this subtype.
    pub fn is_covered_by(&self, item: &EvidenceItem) -> bool {
        if item.source_metadata.evidence_type.as_deref() == Some(self.key) {
            return true;
        }
        tokenize(&item.content).any(|token| {
            self.words.contains(&token.as_str())
                || self.prefixes.iter().any(|prefix| token.starts_with(prefix))
        })
    }
}

impl DimensionChecklist {
    /// Required subtypes present among `items`.
    pub fn present(&self, items: &[&EvidenceItem]) -> HashSet<&'static str> {
        self.required
            .iter()
            .filter(|req| items.iter().any(|item| req.is_covered_by(item)))
            .map(|req| req.key)
            .collect()
    }

    /// Fraction of required subtypes present among `items`.
    pub fn coverage(&self, items: &[&EvidenceItem]) -> f64 {
        if self.required.is_empty() {
            return 1.0;
        }
        self.present(items).len() as f64 / self.required.len() as f64
    }
}

/// Required subtypes absent from the whole collection, as `dimension.subtype`.
///
/// Any item may cover any subtype regardless of its own category.
pub fn missing_critical_evidence(evidence: &[EvidenceItem]) -> Vec<String> {
    let all: Vec<&EvidenceItem> = evidence.iter().collect();
    CHECKLISTS
        .iter()
        .flat_map(|checklist| {
            let present = checklist.present(&all);
            checklist
                .required
                .iter()
                .filter(move |req| !present.contains(req.key))
                .map(move |req| format!("{}.{}", checklist.dimension, req.key))
        })
        .collect()
}

/// Total number of required subtypes across all dimensions.
pub fn required_total() -> usize {
    CHECKLISTS.iter().map(|c| c.required.len()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(category: Dimension, content: &str) -> EvidenceItem {
        EvidenceItem::new("e", category, content, Utc::now())
    }

    #[test]
    fn test_checklists_in_dimension_order() {
        for dimension in Dimension::ALL {
            assert_eq!(checklist_for(dimension).dimension, dimension);
        }
        assert_eq!(expected_total(), 35);
        assert_eq!(required_total(), 18);
    }

    #[test]
    fn test_keyword_prefix_match() {
        let checklist = checklist_for(Dimension::Technical);
        let a = item(Dimension::Technical, "Public REST APIs and webhooks");
        let b = item(Dimension::Technical, "Raised capital last year");
        let present = checklist.present(&[&a]);
        assert!(present.contains("api_capabilities"));
        assert!(checklist.present(&[&b]).is_empty());
    }

    #[test]
    fn test_short_keywords_match_whole_tokens_only() {
        let business = checklist_for(Dimension::Business);
        let market = checklist_for(Dimension::Market);
        let team = checklist_for(Dimension::Team);
        let financial = checklist_for(Dimension::Financial);

        let unrelated = item(
            Dimension::Technical,
            "Orders arrive as an array; the same jobs run in the United States",
        );
        assert!(business.present(&[&unrelated]).is_empty());
        assert!(market.present(&[&unrelated]).is_empty());
        assert!(team.present(&[&unrelated]).is_empty());
        assert!(financial.present(&[&unrelated]).is_empty());

        let relevant = item(Dimension::Business, "ARR of $4M, SAM of $2B, one open job, unit economics improving");
        assert!(business.present(&[&relevant]).contains("revenue_streams"));
        assert!(market.present(&[&relevant]).contains("market_size"));
        assert!(team.present(&[&relevant]).contains("hiring"));
        assert!(financial.present(&[&relevant]).contains("unit_economics"));
    }

    #[test]
    fn test_declared_evidence_type_counts() {
        let checklist = checklist_for(Dimension::Financial);
        let declared = item(Dimension::Financial, "see attachment").with_evidence_type("funding");
        assert_eq!(checklist.coverage(&[&declared]), 1.0 / 3.0);
    }

    #[test]
    fn test_missing_across_collection() {
        assert_eq!(missing_critical_evidence(&[]).len(), required_total());

        let evidence = vec![item(Dimension::Team, "The CEO is hiring senior engineers")];
        let missing = missing_critical_evidence(&evidence);
        assert_eq!(missing.len(), required_total() - 3);
        assert!(!missing.contains(&"team.leadership".to_string()));
        assert!(missing.contains(&"financial.funding".to_string()));
    }
}
