use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use kgs::{FillConfig, PoolConfig};
use kgs_tonic_core::types::{DEFAULT_MAX_KEYS_PER_REQUEST, key_space};
use std::path::PathBuf;

/// Runtime configuration for the `kgs-tonic-server` binary.
///
/// These settings control how the key pool is filled at startup, how requests
/// are bounded, and where the server listens. All values are parsed from CLI
/// arguments or environment variables (optionally loaded from `.env`), with
/// defaults suitable for a small production deployment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kgs-tonic-server",
    version,
    about = "A gRPC service handing out batches of pre-generated unique keys"
)]
pub struct CliArgs {
    /// Number of keys generated into the pool at startup.
    ///
    /// Must not exceed the number of distinct keys of `KEY_LENGTH` characters.
    ///
    /// Environment variable: `POOL_SIZE`
    #[arg(long, env = "POOL_SIZE", default_value_t = 100_000)]
    pub pool_size: usize,

    /// Maximum number of simultaneous store operations while filling.
    ///
    /// Keep this below the backend's connection limit.
    ///
    /// Environment variable: `MAX_CONCURRENCY`
    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = FillConfig::DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Number of characters in every key.
    ///
    /// Environment variable: `KEY_LENGTH`
    #[arg(long, env = "KEY_LENGTH", default_value_t = kgs::DEFAULT_KEY_LENGTH)]
    pub key_length: usize,

    /// Time budget for a single allocation, in milliseconds.
    ///
    /// Environment variable: `ALLOCATION_TIMEOUT_MS`
    #[arg(long, env = "ALLOCATION_TIMEOUT_MS", default_value_t = 2_000)]
    pub allocation_timeout_ms: u64,

    /// Maximum number of keys a client may request at once.
    ///
    /// Environment variable: `MAX_KEYS_PER_REQUEST`
    #[arg(long, env = "MAX_KEYS_PER_REQUEST", default_value_t = DEFAULT_MAX_KEYS_PER_REQUEST)]
    pub max_keys_per_request: u64,

    /// Path to the SQLite database holding the pool. When omitted, the pool
    /// lives in memory and is lost on exit.
    ///
    /// Environment variable: `DATABASE`
    #[arg(long, env = "DATABASE")]
    pub database: Option<PathBuf>,

    /// Seconds to wait for in-flight requests to finish on shutdown.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Address to listen on (TCP or Unix socket path; use --uds for Unix socket).
    ///
    /// Example: "0.0.0.0:50051" or "/tmp/kgs.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub pool: PoolConfig,
    pub max_keys_per_request: u64,
    pub database: Option<PathBuf>,
    pub shutdown_timeout: Duration,
    pub server_addr: String,
    pub uds: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.key_length == 0 {
            bail!("KEY_LENGTH must be greater than 0");
        }

        if args.max_concurrency == 0 {
            bail!("MAX_CONCURRENCY must be greater than 0");
        }

        if args.max_keys_per_request == 0 {
            bail!("MAX_KEYS_PER_REQUEST must be greater than 0");
        }

        if let Some(space) = key_space(args.key_length) {
            if args.pool_size as u64 > space {
                bail!(
                    "POOL_SIZE ({}) exceeds the key space for KEY_LENGTH {} (max = {})",
                    args.pool_size,
                    args.key_length,
                    space
                );
            }
        }

        let fill = FillConfig::new(args.pool_size, args.key_length)
            .with_max_concurrency(args.max_concurrency);
        let pool = PoolConfig::new(fill)
            .with_allocation_timeout(Duration::from_millis(args.allocation_timeout_ms));

        Ok(Self {
            pool,
            max_keys_per_request: args.max_keys_per_request,
            database: args.database,
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            server_addr: args.server_addr,
            uds: args.uds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let args = CliArgs::try_parse_from(std::iter::once("kgs-tonic-server").chain(args.iter().copied()))?;
        ServerConfig::try_from(args)
    }

    #[test]
    fn defaults_are_valid() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.pool.fill.key_length, 4);
        assert_eq!(config.pool.fill.max_concurrency, 100);
        assert_eq!(config.pool.allocation_timeout, Duration::from_secs(2));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
        assert!(config.database.is_none());
        assert!(!config.uds);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--pool-size",
            "10",
            "--key-length",
            "6",
            "--max-concurrency",
            "2",
            "--allocation-timeout-ms",
            "250",
            "--database",
            "/tmp/keys.db",
        ])
        .unwrap();
        assert_eq!(config.pool.fill, FillConfig::new(10, 6).with_max_concurrency(2));
        assert_eq!(config.pool.allocation_timeout, Duration::from_millis(250));
        assert_eq!(config.database, Some(PathBuf::from("/tmp/keys.db")));
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(parse(&["--key-length", "0"]).is_err());
        assert!(parse(&["--max-concurrency", "0"]).is_err());
        assert!(parse(&["--max-keys-per-request", "0"]).is_err());
        assert!(parse(&["--key-length", "1", "--pool-size", "63"]).is_err());
        assert!(parse(&["--key-length", "1", "--pool-size", "62"]).is_ok());
    }
}
