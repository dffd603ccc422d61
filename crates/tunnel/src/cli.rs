//! CLI argument parsing (`spec.md` §6.1).

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tunnel")]
#[command(author, version, about = "WebRTC peer-to-peer tunnel over a piping server", long_about = None)]
pub struct Cli {
    /// Piping server base URL.
    #[arg(short = 's', long, env = "PIPING_SERVER", default_value = "https://ppng.io", global = true)]
    pub server: String,

    /// Override DNS server (`host:port`) used to resolve the piping server.
    #[arg(long, global = true)]
    pub dns_server: Option<String>,

    /// Disable TLS certificate verification against the piping server.
    #[arg(short = 'k', long, global = true)]
    pub insecure: bool,

    /// Extra HTTP header sent with every relay request (`name: value`).
    /// May be given more than once.
    #[arg(short = 'H', long = "header", global = true)]
    pub headers: Vec<String>,

    /// ICE server list as a JSON array (e.g. `[{"urls":"stun:stun.l.google.com:19302"}]`).
    #[arg(long, global = true)]
    pub ice_servers: Option<String>,

    /// Verbose output (-v, -vv, -vvv); raises the log level one step per repeat.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Establish a TCP/UDP tunnel through a remote peer.
    Tunnel(TunnelArgs),

    /// Bridge stdio to a peer over a direct data channel.
    Duplex(DuplexArgs),

    /// Print version information.
    Version,
}

#[derive(clap::Args)]
pub struct TunnelArgs {
    /// Take the listener (offer) role instead of the dialer (answer) role.
    #[arg(short = 'l', long)]
    pub listen: bool,

    /// Carry UDP datagrams instead of TCP bytes.
    #[arg(short = 'u', long)]
    pub udp: bool,

    /// Local TCP/UDP port: bound on the listener, dialed on the dialer.
    pub port: u16,

    /// Opaque rendezvous path agreed out of band with the peer.
    pub path: String,
}

#[derive(clap::Args)]
pub struct DuplexArgs {
    /// This side's identifier.
    pub local_id: String,

    /// The peer's identifier.
    pub remote_id: String,
}
