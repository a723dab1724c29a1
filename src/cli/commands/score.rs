//! `diligence score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::Cell;
use serde::Serialize;

use super::read_evidence_file;
use crate::cli::output::{format_ratio, format_score, list_table, number_cell, output, CommandOutput};
use crate::domain::models::{ComprehensiveScoreResult, Config};
use crate::services::scoring::ScoringEngine;
use crate::services::thesis_registry::{ThesisRegistry, DEFAULT_THESIS_ID};

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// JSON file holding an array of evidence items
    #[arg(long, short)]
    pub evidence: PathBuf,

    /// Investment thesis id; unknown ids use the default thesis
    #[arg(long, short, default_value = DEFAULT_THESIS_ID)]
    pub thesis: String,
}

#[derive(Debug, Serialize)]
pub struct ScoreOutput {
    pub evidence_count: usize,
    #[serde(flatten)]
    pub result: ComprehensiveScoreResult,
}

impl CommandOutput for ScoreOutput {
    fn to_human(&self) -> String {
        let r = &self.result;
        let mut table = list_table(&["dimension", "score", "confidence", "items"]);
        for (dimension, d) in r.dimensions.iter() {
            table.add_row(vec![
                Cell::new(dimension),
                number_cell(format_score(d.score)),
                number_cell(format_ratio(d.confidence)),
                number_cell(d.evidence_count),
            ]);
        }

        let mut lines = vec![
            format!("Thesis: {}  ({} evidence items)", r.thesis_id, self.evidence_count),
            String::new(),
            table.to_string(),
            String::new(),
            format!("Weighted score:  {}", format_score(r.weighted_score)),
            format!("Grade:           {}", r.final_grade),
            format!("Recommendation:  {}", r.investment_recommendation),
            format!(
                "Confidence:      {} (reduced by {})",
                format_ratio(r.thesis_confidence),
                format_ratio(r.confidence_breakdown.confidence_reduction)
            ),
        ];

        let missing = &r.confidence_breakdown.missing_critical_evidence;
        if !missing.is_empty() {
            lines.push(format!("Missing evidence: {}", missing.join(", ")));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: ScoreArgs, config: &Config, json_mode: bool) -> Result<()> {
    let evidence = read_evidence_file(&args.evidence).await?;
    let registry =
        ThesisRegistry::with_definitions(&config.theses).context("Invalid thesis configuration")?;
    let engine = ScoringEngine::with_config(registry, &config.scoring);

    let result = engine.score(&evidence, &args.thesis);
    output(
        &ScoreOutput {
            evidence_count: evidence.len(),
            result,
        },
        json_mode,
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Dimension, EvidenceItem};
    use chrono::Utc;

    #[test]
    fn test_human_output_lists_dimensions_and_gaps() {
        let engine = ScoringEngine::default();
        let evidence = vec![EvidenceItem::new("m", Dimension::Market, "strong growth", Utc::now())];
        let out = ScoreOutput {
            evidence_count: 1,
            result: engine.score(&evidence, "buy-and-build"),
        };
        let human = out.to_human();
        assert!(human.contains("market"));
        assert!(human.contains("Missing evidence"));
        assert!(human.contains("buy-and-build"));
    }

    #[test]
    fn test_json_output_is_flat() {
        let out = ScoreOutput {
            evidence_count: 0,
            result: ScoringEngine::default().score(&[], "turnaround"),
        };
        let json = out.to_json();
        assert_eq!(json["evidence_count"], 0);
        assert!(json.get("technical").is_some());
        assert_eq!(json["final_grade"], "F");
    }
}
