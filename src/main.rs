use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::{ArgGroup, Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod aggregate;
mod credentials;
mod error;
mod loader;
mod models;
mod report;

#[cfg(test)]
mod test_http;

use loader::Source;

#[derive(Parser)]
#[command(name = "onboarding-dashboard")]
#[command(about = "User onboarding status dashboard", long_about = None)]
struct Cli {
    #[command(flatten)]
    source: SourceArgs,

    /// Logical name of the dataset
    #[arg(long, global = true, default_value = "onboarding")]
    name: String,

    /// Treat this date as today when picking the month (YYYY-MM-DD)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[command(group(
    ArgGroup::new("source")
        .args(["file_id", "csv"])
        .required(true)
        .multiple(false)
))]
struct SourceArgs {
    /// Google Drive file id of the onboarding export
    #[arg(long)]
    file_id: Option<String>,
    /// Read the onboarding export from a local CSV file instead
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the HTML dashboard
    Render {
        #[arg(long, default_value = "dashboard.html")]
        out: PathBuf,
    },
    /// Print tile totals and the daily breakdown
    Summary,
    /// Write the aggregated dashboard as JSON
    Export {
        #[arg(long, default_value = "dashboard.json")]
        out: PathBuf,
    },
}

impl SourceArgs {
    fn into_source(self) -> anyhow::Result<Source> {
        match (self.file_id, self.csv) {
            (Some(file_id), None) => Ok(Source::Drive { file_id }),
            (None, Some(path)) => Ok(Source::Local { path }),
            _ => anyhow::bail!("exactly one of --file-id or --csv is required"),
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let today = cli.as_of.unwrap_or_else(|| Local::now().date_naive());
    let source = cli.source.into_source()?;
    info!(?source, %today, "starting onboarding dashboard");

    let table = loader::load_table(&cli.name, &source)
        .await
        .context("failed to load onboarding dataset")?;
    let dashboard = aggregate::build_dashboard(&table, today)
        .context("failed to aggregate onboarding statuses")?;

    match cli.command {
        Commands::Render { out } => {
            let html = report::build_html(&dashboard);
            std::fs::write(&out, html)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Dashboard written to {}.", out.display());
        }
        Commands::Summary => {
            print!("{}", report::build_summary(&dashboard));
        }
        Commands::Export { out } => {
            let json = serde_json::to_string_pretty(&dashboard)?;
            std::fs::write(&out, json)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Dashboard data written to {}.", out.display());
        }
    }

    Ok(())
}
