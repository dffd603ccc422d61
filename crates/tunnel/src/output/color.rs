//! Minimal stderr status printing, kept deliberately plain — this crate's
//! real diagnostics go through `tracing`; these helpers are just for the
//! handful of user-facing lines a CLI prints regardless of `-v`.

pub fn error(message: &str) {
    eprintln!("error: {message}");
}

pub fn info(message: &str) {
    eprintln!("{message}");
}
