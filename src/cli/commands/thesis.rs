//! `diligence thesis` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use comfy_table::Cell;
use serde::Serialize;

use crate::cli::output::{list_table, number_cell, output, CommandOutput};
use crate::domain::models::{Config, ThesisWeights};
use crate::services::thesis_registry::ThesisRegistry;

#[derive(Args, Debug)]
pub struct ThesisArgs {
    #[command(subcommand)]
    pub command: ThesisCommands,
}

#[derive(Subcommand, Debug)]
pub enum ThesisCommands {
    /// List built-in and configured thesis profiles
    List,
}

#[derive(Debug, Serialize)]
pub struct ThesisEntry {
    pub id: String,
    pub name: String,
    pub default: bool,
    pub weights: ThesisWeights,
}

#[derive(Debug, Serialize)]
pub struct ThesisListOutput {
    pub theses: Vec<ThesisEntry>,
}

impl CommandOutput for ThesisListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "name", "technical", "business", "market", "team", "financial"]);
        for t in &self.theses {
            let id = if t.default { format!("{} *", t.id) } else { t.id.clone() };
            table.add_row(vec![
                Cell::new(id),
                Cell::new(&t.name),
                number_cell(format!("{:.2}", t.weights.technical)),
                number_cell(format!("{:.2}", t.weights.business)),
                number_cell(format!("{:.2}", t.weights.market)),
                number_cell(format!("{:.2}", t.weights.team)),
                number_cell(format!("{:.2}", t.weights.financial)),
            ]);
        }
        format!("{table}\n\n* default for unknown thesis ids")
    }
}

impl ThesisListOutput {
    pub fn from_registry(registry: &ThesisRegistry) -> Self {
        let default_id = registry.default_profile().id();
        Self {
            theses: registry
                .profiles()
                .map(|p| ThesisEntry {
                    id: p.id().to_string(),
                    name: p.name().to_string(),
                    default: p.id() == default_id,
                    weights: *p.weights(),
                })
                .collect(),
        }
    }
}

pub fn execute(args: ThesisArgs, config: &Config, json_mode: bool) -> Result<()> {
    match args.command {
        ThesisCommands::List => {
            let registry = ThesisRegistry::with_definitions(&config.theses)
                .context("Invalid thesis configuration")?;
            output(&ThesisListOutput::from_registry(&registry), json_mode);
        }
    }
    Ok(())
}
