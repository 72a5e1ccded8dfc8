//! Server configuration, read from `HH_*` environment variables.
//!
//! Invalid values are logged and replaced by their defaults so that a typo never stops the server from starting.
use std::{env, str::FromStr};

use harvest_common::{helpers::parse_boolean_flag, Secret};
use log::*;

const DEFAULT_HH_HOST: &str = "127.0.0.1";
const DEFAULT_HH_PORT: u16 = 8480;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/harvest_hub.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_EVENT_BUFFER_SIZE: usize = 25;
const DEFAULT_SMTP_PORT: u16 = 587;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Bring the database schema up to date when the server starts.
    pub auto_migrate: bool,
    /// Capacity of each event channel feeding the notification hooks.
    pub event_buffer_size: usize,
    /// SMTP settings. When `None`, notifications are written to the log instead of being emailed.
    pub email: Option<EmailConfig>,
}

#[derive(Clone, Debug, Default)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: Secret<String>,
    pub from_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HH_HOST.to_string(),
            port: DEFAULT_HH_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            auto_migrate: true,
            event_buffer_size: DEFAULT_EVENT_BUFFER_SIZE,
            email: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let host = lookup("HH_HOST").unwrap_or_else(|| DEFAULT_HH_HOST.into());
        let port = parse_or_default(&lookup, "HH_PORT", DEFAULT_HH_PORT);
        let database_url = lookup("HH_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ HH_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let max_connections = parse_or_default(&lookup, "HH_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS).max(1);
        let auto_migrate = parse_boolean_flag(lookup("HH_AUTO_MIGRATE"), true);
        let event_buffer_size = parse_or_default(&lookup, "HH_EVENT_BUFFER_SIZE", DEFAULT_EVENT_BUFFER_SIZE).max(1);
        let email = EmailConfig::from_lookup(&lookup);
        Self { host, port, database_url, max_connections, auto_migrate, event_buffer_size, email }
    }
}

impl EmailConfig {
    /// `None` unless `HH_SMTP_HOST` is set.
    pub fn from_lookup<F>(lookup: &F) -> Option<Self>
    where F: Fn(&str) -> Option<String> {
        let Some(smtp_host) = lookup("HH_SMTP_HOST").filter(|s| !s.trim().is_empty()) else {
            info!("🪛️ HH_SMTP_HOST is not set. Notifications will be logged, but not emailed.");
            return None;
        };
        let smtp_port = parse_or_default(lookup, "HH_SMTP_PORT", DEFAULT_SMTP_PORT);
        let smtp_username = lookup("HH_SMTP_USERNAME").unwrap_or_default();
        let smtp_password = Secret::new(lookup("HH_SMTP_PASSWORD").unwrap_or_default());
        if smtp_password.is_empty() {
            warn!("🪛️ HH_SMTP_PASSWORD is not set. Sending email will probably fail.");
        }
        let from_address = lookup("HH_EMAIL_FROM").unwrap_or_else(|| {
            let from = format!("noreply@{smtp_host}");
            warn!("🪛️ HH_EMAIL_FROM is not set. Using {from}.");
            from
        });
        Some(Self { smtp_host, smtp_port, smtp_username, smtp_password, from_address })
    }
}

fn parse_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}
