use clap::Parser;
use gridiron_edge::cli::{show_config, Cli, Commands};
use gridiron_edge::config::Config;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; a missing file means defaults, a broken one is fatal
    let config_missing = !Path::new(&cli.config).exists();
    let config = if config_missing {
        Config::default()
    } else {
        Config::load(&cli.config)?
    };

    // Initialize telemetry
    gridiron_edge::telemetry::init_telemetry(&config.telemetry)?;
    if config_missing {
        tracing::warn!(path = %cli.config, "Config file not found; using defaults");
    }

    match cli.command {
        Commands::Bridge(args) => {
            tracing::info!(season = args.season, week = args.week, "Bridging weekly exports");
            args.execute(&config)?;
        }
        Commands::Build(args) => {
            tracing::info!(season = args.season, "Building matchup table");
            args.execute(&config)?;
        }
        Commands::Train(args) => {
            tracing::info!("Training models");
            args.execute(&config)?;
        }
        Commands::Predict(args) => {
            tracing::info!(season = args.season, week = args.week, "Predicting week");
            args.execute(&config)?;
        }
        Commands::Status(args) => {
            args.execute(&config)?;
        }
        Commands::Config => {
            show_config(&config);
        }
    }

    Ok(())
}
