use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::Roster;
use rollcall_notify::{HttpChannel, WelcomeRequest};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000";

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a roster file and list its entries
    Roster {
        /// Path to the roster TOML file
        path: PathBuf,
        /// Also check that every reference photo exists under this directory
        #[arg(long)]
        photos: Option<PathBuf>,
    },
    /// Send a welcome email through the daemon
    Notify {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        name: String,
        /// Daemon base URL
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        url: String,
    },
    /// Show daemon status
    Status {
        /// Daemon base URL
        #[arg(long, default_value = DEFAULT_ENDPOINT)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Roster { path, photos } => {
            let roster = Roster::load(&path)
                .with_context(|| format!("invalid roster {}", path.display()))?;
            let mut missing = 0;
            for identity in roster.identities() {
                let status = match &photos {
                    Some(dir) if !dir.join(&identity.photo).is_file() => {
                        missing += 1;
                        "  (photo missing)"
                    }
                    _ => "",
                };
                println!("{:<24} {:<32} {}{status}", identity.name, identity.email, identity.photo);
            }
            println!("{} entries", roster.len());
            if missing > 0 {
                bail!("{missing} reference photo(s) missing");
            }
        }
        Commands::Notify { email, name, url } => {
            let endpoint = format!("{}/api/welcome-email", url.trim_end_matches('/'));
            let channel = HttpChannel::with_timeout(endpoint, Duration::from_secs(30))?;
            let message = channel
                .post(&WelcomeRequest { email, name })
                .await
                .context("welcome email failed")?;
            println!("{message}");
        }
        Commands::Status { url } => {
            let endpoint = format!("{}/api/status", url.trim_end_matches('/'));
            let status: serde_json::Value = reqwest::get(&endpoint)
                .await
                .with_context(|| format!("rollcalld not reachable at {url}"))?
                .error_for_status()?
                .json()
                .await?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }

    Ok(())
}
