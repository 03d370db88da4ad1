//! CLI argument definitions.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ghostwriter - drafts reply suggestions for incoming chat messages.
#[derive(Parser, Debug)]
#[command(name = "ghostwriter", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Relay server port.
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Data directory for the SQLite store.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the relay server (default).
    Serve,

    /// Draft replies for one message against the configured store and
    /// providers, then print them.
    Draft {
        /// Message text.
        content: String,

        /// Sender key the message came from.
        #[arg(long)]
        sender: String,

        /// User the reply is drafted for.
        #[arg(long)]
        user: String,

        /// Message time in ms since epoch. Defaults to now.
        #[arg(long)]
        timestamp: Option<i64>,

        /// Print the candidates as a JSON array.
        #[arg(long)]
        json: bool,
    },
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve)
    }

    /// Priority: --config flag > GHOSTWRITER_CONFIG env var > ~/.ghostwriter/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("GHOSTWRITER_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Priority: --port flag > GHOSTWRITER_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("GHOSTWRITER_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }
}

fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".ghostwriter").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".ghostwriter").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_serve() {
        let args = CliArgs::parse_from(["ghostwriter"]);
        assert_eq!(args.command(), Command::Serve);
    }

    #[test]
    fn test_flags_override() {
        let args = CliArgs::parse_from([
            "ghostwriter",
            "--config",
            "/tmp/gw.toml",
            "--port",
            "4000",
            "--data-dir",
            "/tmp/gw",
            "--log-level",
            "debug",
        ]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/gw.toml"));
        assert_eq!(args.resolve_port(3001), 4000);
        assert_eq!(args.resolve_data_dir().as_deref(), Some("/tmp/gw"));
        assert_eq!(args.resolve_log_level().as_deref(), Some("debug"));
    }

    #[test]
    fn test_draft_subcommand() {
        let args = CliArgs::parse_from([
            "ghostwriter",
            "draft",
            "lunch?",
            "--sender",
            "alice",
            "--user",
            "u1",
            "--timestamp",
            "1000",
            "-l",
            "warn",
        ]);
        assert_eq!(
            args.command(),
            Command::Draft {
                content: "lunch?".to_string(),
                sender: "alice".to_string(),
                user: "u1".to_string(),
                timestamp: Some(1000),
                json: false,
            }
        );
        assert_eq!(args.resolve_log_level().as_deref(), Some("warn"));
    }

    #[test]
    fn test_draft_requires_sender() {
        assert!(CliArgs::try_parse_from(["ghostwriter", "draft", "hi", "--user", "u1"]).is_err());
    }
}
