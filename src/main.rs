//! Diligence CLI entry point.

use clap::Parser;

use diligence::cli::commands::{self, load_config};
use diligence::cli::{handle_error, Cli, Commands};
use diligence::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let result = match cli.command {
        // init runs before any configuration exists
        Commands::Init(args) => commands::init::execute(args, json).await,
        command => {
            let config = match load_config(cli.config.as_deref()) {
                Ok(config) => config,
                Err(err) => handle_error(err, json),
            };

            let _logger = match LoggerImpl::init(&config.logging) {
                Ok(logger) => Some(logger),
                Err(err) => {
                    eprintln!("Warning: logging disabled: {err:#}");
                    None
                }
            };

            match command {
                Commands::Init(_) => Ok(()),
                Commands::Submit(args) => commands::pipeline::submit(args, &config, json).await,
                Commands::Status(args) => commands::pipeline::status(args, &config, json).await,
                Commands::Metrics => commands::pipeline::metrics(&config, json).await,
                Commands::Score(args) => commands::score::execute(args, &config, json).await,
                Commands::Thesis(args) => commands::thesis::execute(args, &config, json),
                Commands::Work(args) => commands::work::execute(args, &config, json).await,
            }
        }
    };

    if let Err(err) = result {
        handle_error(err, json);
    }
}
