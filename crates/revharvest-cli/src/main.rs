mod analyze;
mod harvest;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "revharvest")]
#[command(about = "Harvest customer reviews and build an issue knowledge base")]
#[command(after_help = "Examples:
  revharvest validate --job config/job.yaml
  revharvest harvest --out reviews.json --events
  revharvest analyze --input reviews.json --knowledge-base kb.md
  revharvest import --file survey.csv --out survey.json")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Harvest reviews for every entity in a job file
    Harvest {
        /// Job file to run (defaults to REVHARVEST_JOB_PATH)
        #[arg(long)]
        job: Option<PathBuf>,

        /// Write the batch result here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Stream job progress as JSON lines on stderr
        #[arg(long)]
        events: bool,

        /// Keep reviews collected by sources that later failed
        #[arg(long)]
        keep_partial: bool,
    },
    /// Label reviews and summarise each issue category
    Analyze {
        /// Harvest JSON output or a CSV spreadsheet
        #[arg(long)]
        input: PathBuf,

        /// Write the analysis report here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,

        /// Export the knowledge base (`.csv` for CSV, Markdown otherwise)
        #[arg(long)]
        knowledge_base: Option<PathBuf>,

        /// Use the built-in lexicon instead of the LLM endpoint
        #[arg(long)]
        offline: bool,
    },
    /// Convert a CSV spreadsheet of reviews to JSON
    Import {
        #[arg(long)]
        file: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check a job file without making any requests
    Validate {
        #[arg(long)]
        job: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = revharvest_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Some(Commands::Harvest {
            job,
            out,
            events,
            keep_partial,
        }) => {
            let job_path = job.unwrap_or_else(|| config.job_path.clone());
            let options = harvest::HarvestArgs {
                job_path,
                out,
                events,
                keep_partial,
            };
            harvest::run_harvest(&config, options).await?;
        }
        Some(Commands::Analyze {
            input,
            out,
            knowledge_base,
            offline,
        }) => {
            let options = analyze::AnalyzeArgs {
                input,
                out,
                knowledge_base,
                offline,
            };
            analyze::run_analyze(&config, options).await?;
        }
        Some(Commands::Import { file, out }) => {
            let reviews = revharvest_analysis::load_spreadsheet(&file)?;
            output::write_json(&reviews, out.as_deref())?;
        }
        Some(Commands::Validate { job }) => {
            let job_path = job.unwrap_or_else(|| config.job_path.clone());
            harvest::run_validate(&config, &job_path)?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

#[cfg(test)]
fn test_config() -> revharvest_core::AppConfig {
    revharvest_core::AppConfig {
        log_level: "info".to_string(),
        job_path: PathBuf::from("./config/job.yaml"),
        request_timeout_secs: 30,
        min_delay_ms: 0,
        max_delay_ms: 0,
        max_attempts: 3,
        retry_backoff_base_ms: 0,
        rotate_user_agents: false,
        llm_api_key: None,
        llm_base_url: "https://api.openai.com/v1".to_string(),
        llm_model: "gpt-4o".to_string(),
    }
}
