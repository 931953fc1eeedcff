mod assets;
mod backend;
mod config;
mod feed;
mod hashing;
mod ingest;
mod models;
mod parser;
mod sanitize;

use std::time::Instant;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "iprox_scraper", about = "Iprox CMS scraper for the construction-work backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape projects, then the city-office pages
    Run,
    /// Scrape the project index and every project behind it
    Projects,
    /// Scrape the contact page and the city offices
    Offices,
    /// Ask the backend to drop records not seen in the last run
    Gc {
        /// Project type to collect
        #[arg(short, long, default_value = "projects")]
        project_type: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = config::Settings::from_env();

    if !backend::wait_until_reachable(&settings.backend_host, settings.backend_port).await {
        anyhow::bail!(
            "backend {}:{} is unreachable",
            settings.backend_host,
            settings.backend_port
        );
    }

    let ingestion = ingest::Ingestion::new(settings)?;

    let result = match cli.command {
        Commands::Run => {
            let report = ingestion.run_projects("projects").await?;
            report.print();
            ingestion.run_offices().await
        }
        Commands::Projects => {
            let report = ingestion.run_projects("projects").await?;
            report.print();
            Ok(())
        }
        Commands::Offices => ingestion.run_offices().await,
        Commands::Gc { project_type } => ingestion.garbage_collect(&project_type).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
