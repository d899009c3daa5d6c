use anyhow::{Context, bail};
use clap::Parser;
use core::time::Duration;
use std::net::SocketAddr;

/// Runtime configuration for the `country-tonic-server` binary.
///
/// Every setting can be supplied as a CLI flag or an environment variable
/// (optionally through a `.env` file). The defaults are the service's
/// reference values, so running the binary without arguments connects to a
/// local MongoDB and listens on port 50051.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "country-tonic-server",
    version,
    about = "A gRPC service that persists country records to MongoDB"
)]
pub struct CliArgs {
    /// TCP address the gRPC server listens on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:50051"))]
    pub server_addr: String,

    /// MongoDB connection string.
    ///
    /// Environment variable: `MONGODB_URI`
    #[arg(long, env = "MONGODB_URI", default_value_t = String::from("mongodb://localhost:27017"))]
    pub mongodb_uri: String,

    /// Database that holds the country collection.
    ///
    /// Environment variable: `MONGODB_DATABASE`
    #[arg(long, env = "MONGODB_DATABASE", default_value_t = String::from("basic_service"))]
    pub database: String,

    /// Collection each created country is inserted into.
    ///
    /// Environment variable: `MONGODB_COLLECTION`
    #[arg(long, env = "MONGODB_COLLECTION", default_value_t = String::from("country"))]
    pub collection: String,

    /// Upper bound, in seconds, on establishing the store connection at
    /// startup. The process exits if the store is not reachable in time.
    ///
    /// Environment variable: `CONNECT_TIMEOUT`
    #[arg(long, env = "CONNECT_TIMEOUT", default_value_t = 20)]
    pub connect_timeout: u64,

    /// Seconds in-flight calls are given to finish once shutdown starts. Calls
    /// still running afterwards are abandoned.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: SocketAddr,
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
    pub connect_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let server_addr = args
            .server_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("SERVER_ADDR ({}) is not a socket address", args.server_addr))?;

        if args.mongodb_uri.trim().is_empty() {
            bail!("MONGODB_URI must not be empty");
        }

        if args.database.trim().is_empty() {
            bail!("MONGODB_DATABASE must not be empty");
        }

        if args.collection.trim().is_empty() {
            bail!("MONGODB_COLLECTION must not be empty");
        }

        if args.connect_timeout == 0 {
            bail!("CONNECT_TIMEOUT must be greater than 0");
        }

        Ok(Self {
            server_addr,
            mongodb_uri: args.mongodb_uri,
            database: args.database,
            collection: args.collection,
            connect_timeout: Duration::from_secs(args.connect_timeout),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["country-tonic-server"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_reference_values() {
        let config = ServerConfig::try_from(args(&[])).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:50051".parse().unwrap());
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "basic_service");
        assert_eq!(config.collection, "country");
        assert_eq!(config.connect_timeout, Duration::from_secs(20));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(3));
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::try_from(args(&[
            "--server-addr",
            "127.0.0.1:6000",
            "--database",
            "atlas",
            "--connect-timeout",
            "5",
        ]))
        .unwrap();
        assert_eq!(config.server_addr.port(), 6000);
        assert_eq!(config.database, "atlas");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_unparseable_address() {
        let err = ServerConfig::try_from(args(&["--server-addr", "localhost"])).unwrap_err();
        assert!(err.to_string().contains("SERVER_ADDR"));
    }

    #[test]
    fn rejects_zero_connect_timeout() {
        assert!(ServerConfig::try_from(args(&["--connect-timeout", "0"])).is_err());
    }

    #[test]
    fn rejects_blank_collection() {
        assert!(ServerConfig::try_from(args(&["--collection", " "])).is_err());
    }
}
