//! The server has no real command line. Any argument prints the help text, except `--config`, which prints the
//! configuration the server would start with.
use std::env;

use crate::config::ServerConfig;

const HELP: &str = include_str!("./cli-help.txt");

/// Environment variables that are safe to echo back. `HH_SMTP_PASSWORD` is never shown.
const DISPLAY_ENVS: [&str; 11] = [
    "RUST_LOG",
    "HH_HOST",
    "HH_PORT",
    "HH_DATABASE_URL",
    "HH_DB_MAX_CONNECTIONS",
    "HH_AUTO_MIGRATE",
    "HH_EVENT_BUFFER_SIZE",
    "HH_SMTP_HOST",
    "HH_SMTP_PORT",
    "HH_SMTP_USERNAME",
    "HH_EMAIL_FROM",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    RunServer,
    ShowHelp,
    ShowConfig,
}

impl CliCommand {
    /// `args` excludes the program name.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        match args.next() {
            None => Self::RunServer,
            Some(a) if a.as_ref() == "--config" => Self::ShowConfig,
            Some(_) => Self::ShowHelp,
        }
    }
}

/// Handles the command line. Returns `true` if the server should not start.
pub fn handle_command_line_args() -> bool {
    match CliCommand::from_args(env::args().skip(1)) {
        CliCommand::RunServer => false,
        CliCommand::ShowHelp => {
            println!("\n{HELP}\n");
            println!("{}", env_report(|name| env::var(name).ok()));
            true
        },
        CliCommand::ShowConfig => {
            println!("{:#?}", ServerConfig::from_env_or_default());
            true
        },
    }
}

fn env_report<F>(lookup: F) -> String
where F: Fn(&str) -> Option<String> {
    let mut report = String::from("Current environment values (secrets are not shown):\n");
    for name in DISPLAY_ENVS {
        let val = lookup(name).unwrap_or_else(|| "Not set".into());
        report.push_str(&format!("  {name:<25} {val}\n"));
    }
    report
}
