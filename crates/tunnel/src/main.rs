//! WebRTC peer-to-peer tunnel and stdio duplex, signaled over a piping server.

#![forbid(unsafe_code)]

mod cli;
mod commands;
mod exit_codes;
mod logging;
mod output;

use clap::Parser;
use cli::Cli;
use commands::SharedConfig;
use tunnel_net::TunnelError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(TunnelError::PeerConnectionDisconnected) => std::process::exit(exit_codes::SUCCESS),
        Err(err) => {
            output::color::error(&err.to_string());
            std::process::exit(exit_codes::ERROR);
        }
    }
}

async fn run(cli: Cli) -> tunnel_net::Result<()> {
    let shared = match &cli.command {
        cli::Commands::Version => None,
        _ => Some(SharedConfig::from_cli(&cli)?),
    };

    match cli.command {
        cli::Commands::Version => {
            commands::version::execute();
            Ok(())
        }
        cli::Commands::Tunnel(args) => commands::tunnel::execute(args, shared.unwrap()).await,
        cli::Commands::Duplex(args) => commands::duplex::execute(args, shared.unwrap()).await,
    }
}
