use rollcall_core::DEFAULT_DISTANCE_THRESHOLD;
use rollcall_notify::cooldown::{DEFAULT_COOLDOWN_SECS, DEFAULT_PURGE_THRESHOLD};
use rollcall_notify::{ChannelError, HttpChannel, RetryPolicy, DEFAULT_MAX_IN_FLIGHT};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::sampler::SamplerConfig;

/// Longest accepted sampling period; larger values are clamped.
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 3_600_000;

/// Longest accepted per-attempt notification timeout; larger values are clamped.
pub const MAX_NOTIFY_TIMEOUT_SECS: u64 = 3_600;

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpTls {
    /// Implicit TLS from the first byte (port 465).
    Wrapper,
    /// Plain connection upgraded with STARTTLS (port 587).
    StartTls,
    /// No TLS. Only for local relays and tests.
    None,
}

impl FromStr for SmtpTls {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wrapper" | "tls" | "implicit" => Ok(Self::Wrapper),
            "starttls" => Ok(Self::StartTls),
            "none" | "plain" => Ok(Self::None),
            other => Err(format!("unknown SMTP TLS mode: {other}")),
        }
    }
}

/// Outgoing mail settings. Credentials are optional; without them the
/// relay is used unauthenticated.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub tls: SmtpTls,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address for welcome mail.
    pub from: String,
    pub subject: String,
}

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Roster TOML file.
    pub roster_path: PathBuf,
    /// Directory holding the roster's reference photos.
    pub photo_dir: PathBuf,
    /// Maximum descriptor distance for a positive match.
    pub distance_threshold: f32,
    /// Period between sampling ticks, in milliseconds.
    pub sample_interval_ms: u64,
    /// Ticks allowed to be in flight at once before new ones are skipped.
    pub max_inflight_ticks: usize,
    /// Minimum seconds between two welcome notifications for one email.
    pub cooldown_secs: i64,
    /// Cooldown store size above which expired records are evicted.
    pub cooldown_purge_threshold: usize,
    /// Delivery retries after the first failed attempt.
    pub dispatch_retries: u32,
    /// Capacity of the notification dispatch queue.
    pub dispatch_queue: usize,
    /// Deliveries allowed in flight at once.
    pub dispatch_concurrency: usize,
    /// Upper bound on one delivery attempt, in seconds.
    pub notify_timeout_secs: u64,
    /// Address the HTTP API listens on.
    pub listen_addr: String,
    /// Welcome-email endpoint the pipeline posts to.
    pub notify_url: String,
    pub smtp: SmtpConfig,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());

        let config_dir = lookup("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&home).join(".config"))
            .join("rollcall");

        let data_dir = lookup("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&home).join(".local/share"))
            .join("rollcall");

        let listen_addr = lookup("ROLLCALL_LISTEN_ADDR").unwrap_or_else(|| "127.0.0.1:3000".to_string());
        let notify_url = lookup("ROLLCALL_NOTIFY_URL")
            .unwrap_or_else(|| format!("http://{listen_addr}/api/welcome-email"));

        Self {
            roster_path: lookup("ROLLCALL_ROSTER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| config_dir.join("roster.toml")),
            photo_dir: lookup("ROLLCALL_PHOTO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("images")),
            distance_threshold: parse_or(&lookup, "ROLLCALL_DISTANCE_THRESHOLD", DEFAULT_DISTANCE_THRESHOLD),
            sample_interval_ms: parse_or(&lookup, "ROLLCALL_SAMPLE_INTERVAL_MS", 100),
            max_inflight_ticks: parse_or(&lookup, "ROLLCALL_MAX_INFLIGHT_TICKS", 4),
            cooldown_secs: parse_or(&lookup, "ROLLCALL_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS),
            cooldown_purge_threshold: parse_or(
                &lookup,
                "ROLLCALL_COOLDOWN_PURGE_THRESHOLD",
                DEFAULT_PURGE_THRESHOLD,
            ),
            dispatch_retries: parse_or(&lookup, "ROLLCALL_DISPATCH_RETRIES", 0),
            dispatch_queue: parse_or(&lookup, "ROLLCALL_DISPATCH_QUEUE", 64),
            dispatch_concurrency: parse_or(&lookup, "ROLLCALL_DISPATCH_CONCURRENCY", DEFAULT_MAX_IN_FLIGHT),
            notify_timeout_secs: parse_or(&lookup, "ROLLCALL_NOTIFY_TIMEOUT_SECS", 30),
            listen_addr,
            notify_url,
            smtp: SmtpConfig {
                host: lookup("ROLLCALL_SMTP_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: parse_or(&lookup, "ROLLCALL_SMTP_PORT", 465),
                tls: parse_or(&lookup, "ROLLCALL_SMTP_TLS", SmtpTls::Wrapper),
                username: lookup("ROLLCALL_SMTP_USERNAME").filter(|v| !v.is_empty()),
                password: lookup("ROLLCALL_SMTP_PASSWORD").filter(|v| !v.is_empty()),
                from: lookup("ROLLCALL_MAIL_FROM").unwrap_or_else(|| "rollcall@localhost.localdomain".to_string()),
                subject: lookup("ROLLCALL_MAIL_SUBJECT")
                    .unwrap_or_else(|| "Welcome to The Special Character".to_string()),
            },
        }
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            interval: Duration::from_millis(self.sample_interval_ms.clamp(1, MAX_SAMPLE_INTERVAL_MS)),
            max_inflight: self.max_inflight_ticks.max(1),
        }
    }

    /// Cooldown window. Negative values mean no cooldown; values chrono
    /// cannot represent fall back to the default window.
    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.cooldown_secs.max(0)).unwrap_or_else(|| {
            tracing::warn!(
                value = self.cooldown_secs,
                "ROLLCALL_COOLDOWN_SECS out of range; using default"
            );
            chrono::Duration::seconds(DEFAULT_COOLDOWN_SECS)
        })
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs.clamp(1, MAX_NOTIFY_TIMEOUT_SECS))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.dispatch_retries,
            attempt_timeout: self.notify_timeout(),
            ..RetryPolicy::default()
        }
    }

    /// HTTP channel posting to [`Config::notify_url`], for pipelines that
    /// deliver through a running `rollcalld` endpoint.
    pub fn notify_channel(&self) -> Result<HttpChannel, ChannelError> {
        HttpChannel::with_timeout(&self.notify_url, self.notify_timeout())
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(key, value = %raw, "invalid config value; using default");
                default
            }
        },
        None => default,
    }
}
