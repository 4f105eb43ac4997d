use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use adfreport::config::Config;
use adfreport::factory::{AzureFactoryClient, InMemoryFactory, RunQueryApi};
use adfreport::mailer::SendGridMailer;
use adfreport::scenario::ScenarioRegistry;
use adfreport::window::RunDateWindow;
use adfreport::{tracker, ReportRequest};

#[derive(Parser)]
#[command(
    name = "adfreport",
    about = "Azure Data Factory pipeline run reports",
    version,
    long_about = None
)]
struct Cli {
    /// Config file (defaults to $ADFREPORT_CONFIG, then ./adfreport.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the run report for a scenario and mail it
    Report {
        /// Registered scenario name
        #[arg(long)]
        scenario: String,

        /// Value of the run's fileName parameter
        #[arg(long)]
        filename: String,

        /// Country; runs must carry exactly this annotation
        #[arg(long, default_value = "")]
        country: String,

        /// Environment shown in the report header
        #[arg(long, default_value = "")]
        env: String,

        /// Services shown in the report header
        #[arg(long, default_value = "")]
        services: String,

        /// Mail subject
        #[arg(long, default_value = "Data load report")]
        subject: String,

        /// Recipient; repeat for several (overrides [mail].recipients)
        #[arg(long = "to")]
        to: Vec<String>,

        /// Append the configured placeholder rows
        #[arg(long)]
        extra_rows: bool,

        /// Also write the rendered HTML to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip mailing
        #[arg(long)]
        no_mail: bool,

        /// Read runs and activities from a capture file instead of Azure
        #[arg(long)]
        replay: Option<PathBuf>,
    },

    /// List registered scenarios
    Scenarios,

    /// Print data-load tracker rows for an owner and status
    Tracker {
        /// Tracker export (JSON array of rows)
        #[arg(long)]
        file: PathBuf,

        /// Owner substring, case-insensitive
        #[arg(long)]
        owner: String,

        /// Status, case-insensitive
        #[arg(long, default_value = "StandBy")]
        status: String,
    },

    /// Serve reports over HTTP
    Serve {
        /// Bind address
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: String,

        /// Read runs and activities from a capture file instead of Azure
        #[arg(long)]
        replay: Option<PathBuf>,
    },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn factory(config: &Config, replay: Option<&Path>) -> Result<Arc<dyn RunQueryApi>> {
    Ok(match replay {
        Some(path) => Arc::new(InMemoryFactory::from_json_file(path)?),
        None => Arc::new(AzureFactoryClient::new(&config.factory, &config.retry)?),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(cli.json || config.logging.json);

    match cli.command {
        Commands::Report {
            scenario,
            filename,
            country,
            env,
            services,
            subject,
            to,
            extra_rows,
            output,
            no_mail,
            replay,
        } => {
            let api = factory(&config, replay.as_deref())?;
            let registry = ScenarioRegistry::from_config(&config.scenarios);
            let window = RunDateWindow::current(&config.window)?;
            let request = ReportRequest {
                scenario,
                filename,
                country,
                env,
                services,
                extra_rows,
            };

            let report =
                adfreport::generate_report(api.as_ref(), &registry, &config, &window, &request).await?;

            if let Some(path) = output {
                std::fs::write(&path, &report.html)
                    .with_context(|| format!("failed to write report: {}", path.display()))?;
                tracing::info!(path = %path.display(), "Report written");
            }

            if no_mail {
                tracing::info!("Mailing skipped");
            } else {
                let recipients = if to.is_empty() { config.mail.recipients.clone() } else { to };
                let mailer = SendGridMailer::from_config(&config.mail, config.retry.request_timeout())?;
                adfreport::deliver(&mailer, &report, &config.mail.from, &recipients, &subject).await?;
                println!("Report for run {} sent to {} recipient(s)", report.header.run_id, recipients.len());
            }
        }
        Commands::Scenarios => {
            let registry = ScenarioRegistry::from_config(&config.scenarios);
            for name in registry.names() {
                println!("{name}");
            }
        }
        Commands::Tracker { file, owner, status } => {
            let rows = tracker::load_rows(&file)?;
            let entries = tracker::filter_rows(&rows, &owner, &status);
            tracing::info!(matched = entries.len(), total = rows.len(), "Filtered tracker rows");
            tracker::print_rows(&entries, &mut std::io::stdout().lock())?;
        }
        Commands::Serve { bind, replay } => {
            tracing::info!(%bind, "Starting adfreport service");
            let api = factory(&config, replay.as_deref())?;
            adfreport::serve(&bind, api, config).await?;
        }
    }

    Ok(())
}
