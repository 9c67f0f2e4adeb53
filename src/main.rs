//! kfold-trainer - Main Entry Point

use clap::Parser;
use kfold_trainer::cli::{cmd_inspect, cmd_train, train_config, Cli, Commands};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "kfold_trainer=debug" } else { "kfold_trainer=info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    match cli.command {
        Commands::Train {
            data,
            output_dir,
            n_splits,
            seed,
            fill_value,
            early_stopping_rounds,
            eval_metric,
            n_estimators,
            learning_rate,
        } => {
            let config = train_config(
                &data,
                output_dir,
                n_splits,
                seed,
                fill_value,
                early_stopping_rounds,
                eval_metric,
                n_estimators,
                learning_rate,
            )?;
            cmd_train(&config)?;
        }
        Commands::Inspect { data } => {
            cmd_inspect(&data)?;
        }
    }

    Ok(())
}
