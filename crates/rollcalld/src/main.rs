use anyhow::{Context, Result};
use rollcall_core::Roster;
use rollcalld::api::{self, AppState};
use rollcalld::mail::SmtpMailer;
use rollcalld::Config;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("rollcalld starting");

    let config = Config::from_env();

    let roster_entries = match Roster::load(&config.roster_path) {
        Ok(roster) => Some(roster.len()),
        Err(err) => {
            tracing::warn!(error = %err, "no roster loaded; serving mail endpoint only");
            None
        }
    };

    let mailer = Arc::new(SmtpMailer::from_config(&config.smtp).context("invalid SMTP configuration")?);

    // Readiness probe only; a failure here does not stop the daemon.
    let probe = Arc::clone(&mailer);
    tokio::spawn(async move {
        match probe.verify().await {
            Ok(true) => tracing::info!(host = %probe.host(), "SMTP relay ready"),
            Ok(false) => tracing::warn!(host = %probe.host(), "SMTP relay did not accept probe"),
            Err(err) => tracing::warn!(host = %probe.host(), error = %err, "SMTP relay unreachable"),
        }
    });

    let app = api::router(AppState {
        mailer,
        roster_entries,
        smtp_host: config.smtp.host.clone(),
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "rollcalld ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!("rollcalld shutting down");
    Ok(())
}
