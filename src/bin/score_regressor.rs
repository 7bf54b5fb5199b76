// Scores a pre-trained regressor on held-out data.

use anyhow::{Context, Error, Result};
use clap::Parser;
use log::info;
use std::time::Instant;

use omics_embedding_analyses::encoding::PATHOLOGIC_STAGE;
use omics_embedding_analyses::{run_scoring, LabelEncoder, ScoringConfig};

fn main() -> Result<(), Error> {
    let total_time_start = Instant::now();
    let cli_args = cli::CliArgs::parse();

    let log_level = cli_args
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: Invalid log level '{}' provided. Defaulting to Info.",
                cli_args.log_level
            );
            log::LevelFilter::Info
        });
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_micros()
        .init();

    info!("Starting score-regressor with args: {:?}", cli_args);

    let encoder = match &cli_args.encoding_config {
        Some(path) => LabelEncoder::from_toml_file(path)
            .with_context(|| format!("Failed to load label encoding from {}", path.display()))?,
        None => LabelEncoder::pathologic_stage(),
    };

    let config = ScoringConfig {
        target: cli_args.target,
        encoder,
        ..ScoringConfig::new(
            cli_args.model_artifact,
            cli_args.train_data,
            cli_args.test_data,
            cli_args.score_output,
            cli_args.other_output,
        )
    };
    let scores = run_scoring(&config).with_context(|| {
        format!(
            "Scoring model {} on {} failed",
            config.model.display(),
            config.test.display()
        )
    })?;

    info!(
        "score-regressor finished in {:.2?} (mse={:.6}, r2={:.6}, mse_baseline={:.6}).",
        total_time_start.elapsed(),
        scores.mse,
        scores.r2,
        scores.mse_baseline
    );
    Ok(())
}

mod cli {
    use super::PATHOLOGIC_STAGE;
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Parser, Debug)]
    #[command(author, version, about = "Score a pre-trained regressor on held-out data.", long_about = None)]
    pub(crate) struct CliArgs {
        /// Serialized regressor artifact.
        pub(crate) model_artifact: PathBuf,

        /// Container with the training `/X` and `/target` (baseline only).
        pub(crate) train_data: PathBuf,

        /// Container with the evaluation `/X` and `/target`.
        pub(crate) test_data: PathBuf,

        /// Output JSON with mse, r2 and mse_baseline.
        pub(crate) score_output: PathBuf,

        /// Output JSON with y_true and y_pred.
        pub(crate) other_output: PathBuf,

        #[arg(long, default_value = PATHOLOGIC_STAGE)]
        pub(crate) target: String,

        /// TOML file overriding the stage encoding table.
        #[arg(long)]
        pub(crate) encoding_config: Option<PathBuf>,

        #[arg(long, default_value = "Info")]
        pub(crate) log_level: String,
    }
}
