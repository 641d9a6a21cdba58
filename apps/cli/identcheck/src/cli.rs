//! Command-line surface.

use ident_core::config::MAX_TIMEOUT_SECS;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "identcheck", version, about = "RFC 1413 ident lookups and same-user checks")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Directory holding ident.toml (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Remote ident port, overriding config and environment
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Also write logs to <DIR>/identcheck.log
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ask the remote ident service who owns a connection
    Query(QueryArgs),

    /// Decide whether a connection's owner is the user running this process
    SameUser(ConnectionArgs),

    /// Print the identity this process runs as
    Whoami,

    /// Answer same-user checks for connections made to LISTEN
    Serve(ServeArgs),
}

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Our end of the connection
    #[arg(long)]
    pub local: SocketAddr,

    /// The peer's end of the connection
    #[arg(long)]
    pub remote: SocketAddr,

    /// Per-query timeout in seconds (1-300), overriding config
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub timeout: Option<u64>,
}

impl ConnectionArgs {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Run through the callback interface instead of awaiting
    #[arg(long)]
    pub nonblocking: bool,

    /// Print the response as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:8113")]
    pub listen: SocketAddr,
}
