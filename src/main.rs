//! model-sync CLI - reconcile a data model against MySQL/MariaDB schemas

use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;

use model_sync::ui::{ConsoleUi, HeadlessUi, Interaction};
use model_sync::utils::logging;
use model_sync::{CasePolicy, Error, SyncSummary};

#[derive(Parser)]
#[command(name = "model-sync")]
#[command(about = "Reconcile a declarative data model against MySQL/MariaDB schemas")]
#[command(version)]
struct Cli {
    /// Log verbosity: trace, debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync the database schemas to a data model
    Sync {
        /// Path to the JSON data model
        #[arg(long)]
        data_model: PathBuf,

        /// Path to the JSON connection configuration
        #[arg(long)]
        db_config: PathBuf,

        /// Database identifier case
        #[arg(long, value_enum, default_value = "snake")]
        case: CasePolicy,

        /// Non-interactive: proceed without prompting and drop all orphan
        /// tables
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(summary) => {
            println!();
            println!("  {}", style("Sync completed").green().bold());
            println!("  {summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", style(&e).red());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<SyncSummary, Error> {
    let cli = Cli::parse();

    logging::init_logging(&cli.verbosity, &cli.log_format)?;

    match cli.command {
        Commands::Sync {
            data_model,
            db_config,
            case,
            yes,
        } => {
            let client = model_sync::init(&data_model, &db_config, case).await?;

            let mut ui: Box<dyn Interaction> = if yes {
                Box::new(HeadlessUi::new(true))
            } else {
                Box::new(ConsoleUi::new())
            };

            client.sync(ui.as_mut()).await
        }
    }
}
