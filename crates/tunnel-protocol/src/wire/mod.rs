//! Wire message types exchanged over the relay.

pub mod handshake;

pub use handshake::{InitialHandshake, CURRENT_VERSION};
