//! `tracing-subscriber` initialization.
//!
//! Default level is `warn`; each repeated `-v` raises it one step
//! (`info`, `debug`, `trace`). `RUST_LOG` always wins when set, so a user
//! chasing a specific module can still override the verbosity flags.

use tracing_subscriber::EnvFilter;

pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tunnel={default_level},tunnel_net={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
