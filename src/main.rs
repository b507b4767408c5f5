//! crawl-store main entry point
//!
//! This is the command-line interface for inspecting and maintaining a
//! crawl-store database.

use clap::{Parser, Subcommand};
use crawl_store::config::load_config_with_hash;
use crawl_store::output::{load_statistics, print_statistics};
use crawl_store::storage::{QueueStorage, SqliteStorage, Storage};
use crawl_store::CrawlStoreError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use url::Url;

/// crawl-store: durable crawler state on SQLite
///
/// Inspects and maintains the visited ledger, cookie jar and request queue
/// that a crawler keeps across restarts.
#[derive(Parser, Debug)]
#[command(name = "crawl-store")]
#[command(version = "1.0.0")]
#[command(about = "Durable crawler state on SQLite", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database and schema if missing
    Init,

    /// Drop all tables; the store needs `init` before further use
    Clear,

    /// Drop all tables and recreate an empty schema
    Reset,

    /// Show counters for every sub-store
    Stats,

    /// Record a request id as visited
    Visit {
        #[arg(value_name = "ID")]
        request_id: u64,
    },

    /// Check whether a request id has been visited
    IsVisited {
        #[arg(value_name = "ID")]
        request_id: u64,
    },

    /// Store the cookie string for the host of a URL
    SetCookies { url: Url, cookies: String },

    /// Print the cookie string stored for the host of a URL
    Cookies { url: Url },

    /// Append a payload to the request queue
    Enqueue { payload: String },

    /// Remove and print the oldest payload in the request queue
    Dequeue,

    /// Print the number of queued payloads
    Size,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let storage = SqliteStorage::from_config(config.storage);
    storage.init()?;

    let result = run_command(&storage, cli.command);
    storage.close()?;

    result.map_err(|e: CrawlStoreError| {
        tracing::error!("Command failed: {}", e);
        e.into()
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("crawl_store=info,warn"),
            1 => EnvFilter::new("crawl_store=debug,info"),
            2 => EnvFilter::new("crawl_store=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Executes one subcommand against an initialized store
///
/// Lookups that find nothing report it on stderr and exit with status 1.
fn run_command(storage: &SqliteStorage, command: Command) -> crawl_store::Result<ExitCode> {
    match command {
        Command::Init => {
            println!("✓ Store ready at {}", storage.path());
        }
        Command::Clear => {
            storage.clear()?;
            println!("✓ Store cleared; run `init` before using it again");
        }
        Command::Reset => {
            storage.reset()?;
            println!("✓ Store reset to empty");
        }
        Command::Stats => {
            println!("Database: {}\n", storage.path());
            let stats = load_statistics(storage)?;
            print_statistics(&stats);
        }
        Command::Visit { request_id } => {
            storage.visited(request_id)?;
            println!("✓ Recorded {}", request_id);
        }
        Command::IsVisited { request_id } => {
            println!("{}", storage.is_visited(request_id)?);
        }
        Command::SetCookies { url, cookies } => {
            storage.set_cookies_for(&url, &cookies)?;
            println!("✓ Stored cookies for {}", url);
        }
        Command::Cookies { url } => match storage.cookies_for(&url)? {
            Some(cookies) => println!("{}", cookies),
            None => {
                eprintln!("No cookies stored for {}", url);
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Enqueue { payload } => {
            storage.add_request(payload.as_bytes())?;
            println!("✓ Enqueued {} bytes", payload.len());
        }
        Command::Dequeue => match storage.get_request()? {
            Some(payload) => println!("{}", String::from_utf8_lossy(&payload)),
            None => {
                eprintln!("Queue is empty");
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Size => {
            println!("{}", storage.queue_size()?);
        }
    }

    Ok(ExitCode::SUCCESS)
}
