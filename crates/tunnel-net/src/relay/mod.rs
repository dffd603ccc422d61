//! One-shot mailbox HTTP client for the relay server.

pub mod client;

pub use client::RelayClient;
