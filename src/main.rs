use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use intent_prototypes::Result;
use intent_prototypes::commands::{
    analyze_clusters, build_prototypes, embed_dataset, embedding_client, gemini_client,
    run_clustering, run_pipeline, show_status,
};
use intent_prototypes::config::{Config, get_config_dir, run_interactive_config, show_config};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "intent-prototypes")]
#[command(about = "Clusters browsing-intent embeddings into reusable intent prototypes")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    paths: PathArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Default)]
struct PathArgs {
    /// Directory holding config.toml (defaults to ~/.intent-prototypes)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Source CSV with id, output and metadata columns
    #[arg(long, global = true)]
    input: Option<PathBuf>,
    /// Embeddings JSON file
    #[arg(long, global = true)]
    embeddings: Option<PathBuf>,
    /// Directory for k selection, cluster results and prototypes
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Gemini connection, clustering and merge settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Generate embeddings for the source CSV
    Embed,
    /// Select k, cluster the embeddings and summarize every cluster
    Cluster {
        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Build intent prototypes from the cluster results
    Prototypes {
        /// Override the merge similarity threshold
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Run clustering and prototype generation, embedding first when needed
    Run {
        /// Regenerate embeddings even if the embeddings file exists
        #[arg(long)]
        embed: bool,
    },
    /// Tally interests, attributes and shops per assigned cluster of the input CSV
    Analyze,
    /// Show which pipeline artifacts exist
    Status,
}

fn load_config(paths: PathArgs) -> Result<Config> {
    let config_dir = match paths.config_dir {
        Some(dir) => dir,
        None => get_config_dir().map_err(anyhow::Error::from)?,
    };
    let mut config = Config::load(config_dir)?;

    if let Some(input) = paths.input {
        config.paths.input_csv = input;
    }
    if let Some(embeddings) = paths.embeddings {
        config.paths.embeddings = embeddings;
    }
    if let Some(results_dir) = paths.results_dir {
        config.paths.results_dir = results_dir;
    }
    Ok(config)
}

/// Log filter from a `RUST_LOG`-style directive string, showing warnings when unset.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives.unwrap_or_default())
}

fn main() -> Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .init();

    let cli = Cli::parse();

    if let Commands::Config { show } = cli.command {
        let config_dir = match cli.paths.config_dir {
            Some(dir) => dir,
            None => get_config_dir().map_err(anyhow::Error::from)?,
        };
        if show {
            show_config(&config_dir)?;
        } else {
            run_interactive_config(&config_dir)?;
        }
        return Ok(());
    }

    let mut config = load_config(cli.paths)?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Embed => {
            let client = gemini_client(&config)?;
            embed_dataset(&config, &embedding_client(&client, &config))?;
        }
        Commands::Cluster { seed } => {
            if let Some(seed) = seed {
                config.clustering.set_seed(seed);
            }
            let client = gemini_client(&config)?;
            run_clustering(&config, &client)?;
        }
        Commands::Prototypes { threshold } => {
            if let Some(threshold) = threshold {
                config
                    .merge
                    .set_similarity_threshold(threshold)
                    .map_err(anyhow::Error::from)?;
            }
            build_prototypes(&config)?;
        }
        Commands::Run { embed } => {
            let client = gemini_client(&config)?;
            run_pipeline(&config, &client, embed)?;
        }
        Commands::Analyze => {
            analyze_clusters(&config)?;
        }
        Commands::Status => {
            show_status(&config)?;
        }
    }

    Ok(())
}
