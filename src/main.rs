//! TicketMaker - submit Freshdesk tickets from the command line.
//!
//! # Configuration
//!
//! Credentials come from one store, selected with `--store` or
//! `TICKETMAKER_CREDENTIAL_STORE`:
//!
//! - `env` (default): `TICKETMAKER_URL` and `TICKETMAKER_API_KEY`
//! - `file`: a JSON file written by `ticketmaker config set`
//!
//! A `.env` file in the working directory is loaded first.
//!
//! Logs go to stderr. Set `TICKETMAKER_LOG_FILE` to also append them to a
//! file; `RUST_LOG` controls the level for both.
//!
//! # Usage
//!
//! ```bash
//! ticketmaker config set --url example.freshdesk.com --api-key xxx
//! ticketmaker submit --store file -s "Printer down" -e a@b.com -d "<p>Jammed</p>"
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use ticketmaker::config::{log_file_from_env, Settings, StoreKind};
use ticketmaker::credentials::{CredentialResolver, JsonFileStore, SecretKey, SecretStore};
use ticketmaker::error::{exit_codes, TicketError};
use ticketmaker::models::{Attachment, Priority, Status, TicketDraft};
use ticketmaker::pipeline::{DescriptionSource, FileDescription, StaticDescription, TicketPipeline};

#[derive(Parser)]
#[command(name = "ticketmaker", author, version, about = "Submit support tickets to Freshdesk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new ticket.
    Submit(SubmitArgs),
    /// Manage the JSON credential file.
    Config(ConfigArgs),
}

#[derive(Args)]
struct SubmitArgs {
    /// Ticket subject.
    #[arg(short, long)]
    subject: String,

    /// Requester email address.
    #[arg(short, long)]
    email: String,

    /// Description as HTML (may contain inline base64 images).
    #[arg(short, long, conflicts_with = "description_file")]
    description: Option<String>,

    /// Read the description HTML from a file.
    #[arg(long, value_name = "PATH")]
    description_file: Option<PathBuf>,

    /// Priority: 1-4 or Low, Medium, High, Urgent.
    #[arg(short, long, default_value = "1")]
    priority: Priority,

    /// Status: 2-5 or Open, Pending, Resolved, Closed.
    #[arg(long, default_value = "2")]
    status: Status,

    /// Ticket type: Alert, EDR, Problem, Task, Sage or Other.
    #[arg(short = 't', long = "type")]
    ticket_type: Option<String>,

    /// Classification, required for Sage tickets (e.g. "Password Reset").
    #[arg(short, long)]
    classification: Option<String>,

    /// File to attach. Repeat for several files.
    #[arg(short, long = "attachment", visible_alias = "attachments", value_name = "PATH")]
    attachments: Vec<PathBuf>,

    /// Credential store: env or file.
    #[arg(long)]
    store: Option<StoreKind>,

    /// Path of the JSON credential file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,

    /// Path of the JSON credential file.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Store the API base address and key.
    Set {
        /// Freshdesk domain, e.g. example.freshdesk.com.
        #[arg(long)]
        url: Option<String>,

        /// Freshdesk API key.
        #[arg(long)]
        api_key: Option<String>,
    },
    /// Show the stored configuration (key masked).
    Show,
}

#[tokio::main]
async fn main() {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    init_tracing();

    let code = match run().await {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            e.downcast_ref::<TicketError>()
                .map(TicketError::exit_code)
                .unwrap_or(exit_codes::GENERAL)
        }
    };
    std::process::exit(code);
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ticketmaker=info"));

    let file_layer = log_file_from_env().and_then(|path| match open_log_file(&path) {
        Ok(file) => Some(fmt::layer().with_writer(Arc::new(file)).with_ansi(false)),
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {e}", path.display());
            None
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_ansi(false))
        .with(file_layer)
        .init();
}

/// Opens `path` for appending, creating parent directories as needed.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::from_env().context("Failed to load settings")?;

    match cli.command {
        Commands::Submit(args) => {
            if let Some(store) = args.store {
                settings.store = store;
            }
            if let Some(path) = &args.config {
                settings.config_path = path.clone();
            }
            run_submit(args, &settings).await
        }
        Commands::Config(args) => {
            if let Some(path) = args.config {
                settings.config_path = path;
            }
            run_config(args.command, &settings)
        }
    }
}

async fn run_submit(args: SubmitArgs, settings: &Settings) -> Result<()> {
    tracing::debug!(store = ?settings.store, "Submitting ticket");

    let resolver = CredentialResolver::from_settings(settings);
    let pipeline =
        TicketPipeline::from_settings(resolver, settings).context("Failed to create HTTP client")?;

    let source: Box<dyn DescriptionSource> = match (args.description, args.description_file) {
        (_, Some(path)) => Box::new(FileDescription(path)),
        (text, None) => Box::new(StaticDescription(text.unwrap_or_default())),
    };

    let mut draft = TicketDraft::new(args.subject, args.email)
        .with_priority(args.priority)
        .with_status(args.status);
    draft.ticket_type = args.ticket_type;
    draft.classification = args.classification;

    let attachments: Vec<Attachment> = args
        .attachments
        .into_iter()
        .map(Attachment::user_file)
        .collect();

    let ticket = pipeline
        .submit(draft, &attachments, source.as_ref())
        .await
        .context("Failed to create ticket")?;

    match ticket.id {
        Some(id) => println!("Ticket #{} created.", id),
        None => println!("Ticket created."),
    }
    if let Some(url) = &ticket.web_url {
        println!("View ticket: {}", url);
    }
    Ok(())
}

fn run_config(command: ConfigCommand, settings: &Settings) -> Result<()> {
    let mut store = JsonFileStore::new(&settings.config_path);

    match command {
        ConfigCommand::Set { url, api_key } => {
            if url.is_none() && api_key.is_none() {
                return Err(
                    TicketError::validation("nothing to set; pass --url and/or --api-key").into(),
                );
            }
            if let Some(url) = url {
                store.set(SecretKey::BaseUrl, url.trim())?;
            }
            if let Some(key) = api_key {
                store.set(SecretKey::ApiKey, key.trim())?;
            }
            println!("Configuration saved to {}", store.path().display());
        }
        ConfigCommand::Show => {
            println!("Configuration file: {}", store.path().display());
            println!("URL: {}", display_value(store.get(SecretKey::BaseUrl)?));
            println!("API key: {}", mask_secret(store.get(SecretKey::ApiKey)?));
        }
    }
    Ok(())
}

fn display_value(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "<not set>".to_string())
}

fn mask_secret(value: Option<String>) -> String {
    match value {
        Some(key) if key.chars().count() > 6 => {
            let chars: Vec<char> = key.chars().collect();
            let prefix: String = chars[..3].iter().collect();
            let suffix: String = chars[chars.len() - 3..].iter().collect();
            format!("{prefix}***{suffix}")
        }
        Some(key) if !key.is_empty() => "***".to_string(),
        _ => "<not set>".to_string(),
    }
}
