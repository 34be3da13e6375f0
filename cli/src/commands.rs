pub mod discover;
pub mod probe;

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use camscout_common::config::{DiscoveryMode, WS_DISCOVERY_PORT, parse_duration};
use camscout_common::models::AuthMode;
use camscout_common::network::target::Target;

#[derive(Parser)]
#[command(name = "camscout")]
#[command(about = "Finds ONVIF cameras on a network and identifies them.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Reduce output (-q hides headers, -qq prints only the summary)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover and identify cameras
    #[command(alias = "d")]
    Discover(DiscoverArgs),
    /// Send a single WS-Discovery probe and print the raw matches
    #[command(alias = "p")]
    Probe {
        ip: IpAddr,
        #[arg(short, long, default_value_t = WS_DISCOVERY_PORT)]
        port: u16,
        /// Probe deadline, e.g. 3s or 500ms
        #[arg(short, long, value_parser = parse_duration)]
        timeout: Option<Duration>,
    },
}

#[derive(Args)]
pub struct DiscoverArgs {
    /// IP, range (a.b.c.d-e), CIDR, "lan" or a comma separated mix. Defaults to the LAN.
    pub target: Option<Target>,

    /// Ports probed on every host
    #[arg(short, long, value_delimiter = ',')]
    pub ports: Option<Vec<u16>>,

    /// Probe deadline, e.g. 3s or 500ms
    #[arg(short, long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// netscan, multicast or both
    #[arg(short, long)]
    pub mode: Option<DiscoveryMode>,

    /// Maximum number of probes in flight
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// TOML file mapping secret paths to credentials
    #[arg(short, long)]
    pub credentials: Option<PathBuf>,

    /// none, usernametoken, digest or both
    #[arg(long)]
    pub auth_mode: Option<AuthMode>,

    /// Secret path tried first for every camera
    #[arg(long)]
    pub secret_path: Option<String>,

    /// TOML config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print discovered devices as JSON
    #[arg(long)]
    pub json: bool,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
