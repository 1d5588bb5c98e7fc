mod crawl;
mod merge;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::crawl::CrawlArgs;
use crate::merge::MergeArgs;

#[derive(Debug, Parser)]
#[command(name = "rescrawl")]
#[command(about = "Reservation calendar crawler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl reservations for a date or date range
    Crawl(CrawlArgs),
    /// Merge a new export into a stored one, deduplicating by reservation number
    Merge(MergeArgs),
    /// List exports in the output directory, newest first
    Files {
        #[arg(long, env = "RESCRAWL_OUTPUT_DIR", default_value = "output")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Crawl(args) => {
            let mut config = rescrawl_core::load_app_config()?;
            init_tracing(&config.log_level)?;
            args.apply_to(&mut config);
            crawl::run_crawl(&config, &args).await
        }
        Commands::Merge(args) => {
            init_tracing("info")?;
            merge::run_merge(&args)
        }
        Commands::Files { dir } => {
            init_tracing("info")?;
            let sink = rescrawl_export::FileSink::new(dir);
            for file in sink.list_files()? {
                println!(
                    "{:<60} {:>10}  {}",
                    file.name,
                    file.size,
                    file.modified.format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(())
        }
    }
}

fn init_tracing(default_level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[cfg(test)]
mod tests;
