//! Signaling handshake, WebRTC peer sessions, and tunnel/duplex forwarding
//! for the WebRTC piping tunnel.
//!
//! See `SPEC_FULL.md` §4 for the component breakdown: [`relay`] is the
//! one-shot mailbox HTTP client, [`signaling`] drives the offer/answer
//! handshake state machine, [`session`] wraps the WebRTC peer connection,
//! and [`tunnel`] / [`duplex`] couple local sockets or stdio to data
//! channels.

#![forbid(unsafe_code)]

pub mod duplex;
pub mod error;
pub mod relay;
pub mod session;
pub mod signaling;
pub mod tunnel;

pub use error::{Result, TunnelError};
