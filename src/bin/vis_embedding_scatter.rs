// Plots three principal components of an embedding with clinical annotations.

use anyhow::{anyhow, Context, Error, Result};
use clap::Parser;
use log::info;
use std::time::Instant;

use omics_embedding_analyses::embedding::parse_groups;
use omics_embedding_analyses::{run_visualization, ScoreScaling, VisualizationConfig};

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

    info!("Starting vis-embedding-scatter with args: {:?}", cli_args);

    let clinical_fields = parse_groups(&cli_args.clinical_fields);
    if clinical_fields.is_empty() {
        return Err(anyhow!("--clinical-fields must name at least one field."));
    }

    let config = VisualizationConfig {
        exclude_groups: cli_args
            .exclude_groups
            .as_deref()
            .map(parse_groups)
            .unwrap_or_default(),
        clinical_fields,
        scaling: if cli_args.scale_by_singular_values {
            ScoreScaling::SingularValues
        } else {
            ScoreScaling::Unscaled
        },
        scores_tsv: cli_args.scores_tsv,
        ..VisualizationConfig::new(
            cli_args.model_data,
            cli_args.clinical_data,
            cli_args.first_pc_index,
            cli_args.output_path,
        )
    };

    let summary = run_visualization(&config).with_context(|| {
        format!(
            "Plotting embedding {} with clinical data {} failed",
            config.model_data.display(),
            config.clinical_data.display()
        )
    })?;

    info!(
        "vis-embedding-scatter finished in {:.2?}: {} samples, {} components, {} without clinical record.",
        total_time_start.elapsed(),
        summary.n_samples,
        summary.n_components,
        summary.unmatched_clinical
    );
    Ok(())
}

mod cli {
    use clap::Parser;
    use std::path::PathBuf;

    #[derive(Parser, Debug)]
    #[command(author, version, about = "3D principal component scatter of a pathway embedding.", long_about = None)]
    pub(crate) struct CliArgs {
        /// Container with /embedding, /sample_ids, /sample_groups and /pathways.
        pub(crate) model_data: PathBuf,

        /// Container with /data, /index and /columns.
        pub(crate) clinical_data: PathBuf,

        /// First of the three plotted components (0-based).
        pub(crate) first_pc_index: usize,

        /// Output HTML file.
        pub(crate) output_path: PathBuf,

        /// Comma-separated groups to drop before the decomposition.
        pub(crate) exclude_groups: Option<String>,

        #[arg(long, default_value = "gender,hpv_status")]
        pub(crate) clinical_fields: String,

        /// Plot U * diag(s) instead of U.
        #[arg(long)]
        pub(crate) scale_by_singular_values: bool,

        /// Also write the component scores as TSV.
        #[arg(long)]
        pub(crate) scores_tsv: Option<PathBuf>,

        #[arg(long, default_value = "Info")]
        pub(crate) log_level: String,
    }
}
