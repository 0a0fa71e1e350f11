use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "SNIP_SERVER_ADDRESS";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const SNAPSHOT_PATH_ENV: &str = "SNIP_FILE_STORAGE_PATH";
pub const DATABASE_DSN_ENV: &str = "SNIP_DATABASE_DSN";
pub const MAX_CONNECTIONS_ENV: &str = "SNIP_DATABASE_MAX_CONNECTIONS";
pub const CODE_LENGTH_ENV: &str = "SNIP_CODE_LENGTH";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";
pub const LOG_LEVEL_ENV: &str = "SNIP_LOG_LEVEL";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_SNAPSHOT_PATH: &str = "./storage.txt";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    #[value(name = "text")]
    Text,
    #[value(name = "json")]
    Json,
}

impl Display for LogFormatArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormatArg::Text => write!(f, "text"),
            LogFormatArg::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip-gateway")]
pub struct CLI {
    #[arg(short = 'a', long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Prefix of every short URL handed out.
    #[arg(short = 'b', long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Snapshot file of the in-memory store; empty disables persistence.
    #[arg(
        short = 'f',
        long,
        env = SNAPSHOT_PATH_ENV,
        default_value = DEFAULT_SNAPSHOT_PATH,
    )]
    pub snapshot_path: String,

    /// PostgreSQL DSN; selects the database store when set.
    #[arg(short = 'd', long, env = DATABASE_DSN_ENV)]
    pub database_dsn: Option<String>,

    #[arg(
        long,
        env = MAX_CONNECTIONS_ENV,
        default_value_t = snip_storage::config::DEFAULT_MAX_CONNECTIONS,
    )]
    pub max_connections: u32,

    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = snip_generator::random::DEFAULT_LENGTH,
        value_parser = parse_code_length,
    )]
    pub code_length: usize,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,

    /// Filter directives, overridden by `RUST_LOG`.
    #[arg(long, env = LOG_LEVEL_ENV, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

impl CLI {
    pub fn snapshot_path(&self) -> Option<PathBuf> {
        Some(self.snapshot_path.trim())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
    }

    pub fn database_dsn(&self) -> Option<&str> {
        self.database_dsn.as_deref().filter(|dsn| !dsn.is_empty())
    }
}

fn parse_code_length(value: &str) -> Result<usize, String> {
    let length: usize = value.parse().map_err(|e| format!("{e}"))?;
    if length == 0 {
        return Err("code length must be positive".to_string());
    }
    Ok(length)
}
