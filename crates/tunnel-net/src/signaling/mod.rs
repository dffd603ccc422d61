//! Drives the offer/answer handshake state machine (`spec.md` §4.2).
//!
//! [`answer`] and [`offer`] implement the same skeleton — handshake, SDP
//! exchange, candidate exchange, wait for the connection state to settle —
//! with the start swapped, matching the "two polymorphic variants sharing
//! one state machine" framing in the spec. [`candidates`] holds the
//! message-passing translation of the ICE-candidate callback described in
//! §9 DESIGN NOTES.

pub mod answer;
pub mod candidates;
pub mod offer;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::peer_connection::RTCPeerConnection;

use crate::relay::client::Header;
use crate::relay::RelayClient;
use crate::signaling::candidates::{CandidateEvent, PendingCandidates};
use crate::{Result, TunnelError};

pub use answer::run_answer;
pub use offer::{run_offer, CandidateTasks};

/// Fixed retry delay for every relay interaction (`spec.md` §4.2: "retried
/// with a fixed 3-second delay between attempts, indefinitely").
pub const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Shared configuration for both signaler roles.
#[derive(Debug, Clone)]
pub struct SignalerConfig {
    pub relay: RelayClient,
    pub headers: Vec<Header>,
    /// `offer_<path>` for `tunnel`, or the raw identifier for `duplex`.
    pub offer_id: String,
    /// `answer_<path>` for `tunnel`, or the raw identifier for `duplex`.
    pub answer_id: String,
}

/// Retry `f` with [`RETRY_DELAY`] between attempts until it succeeds, a
/// non-retryable error occurs, or `cancel` fires. `RelayNetwork`,
/// `RelayUnavailable`, and `InvalidPeerMessage` are all retried — the last
/// one matches the original implementation's behavior of looping on a
/// decode failure rather than treating it as fatal (`spec.md` §7) — every
/// other error is returned immediately.
pub(crate) async fn retry_relay<T, F, Fut>(
    mut f: F,
    cancel: &CancellationToken,
    what: &str,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TunnelError::PeerConnectionDisconnected),
            result = f() => match result {
                Ok(value) => return Ok(value),
                Err(err @ (TunnelError::RelayNetwork(_)
                    | TunnelError::RelayUnavailable { .. }
                    | TunnelError::InvalidPeerMessage(_))) => {
                    warn!(%what, %err, "retrying relay call");
                    tokio::select! {
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                        _ = cancel.cancelled() => return Err(TunnelError::PeerConnectionDisconnected),
                    }
                }
                Err(other) => return Err(other),
            },
        }
    }
}

/// Drain `rx`, feeding every event through `PendingCandidates` and posting
/// the resulting batches to `address`, in order, each retried forever.
/// Shared by both signaler roles — only the address and channel differ.
pub(crate) async fn run_candidate_sender(
    relay: RelayClient,
    address: String,
    headers: Vec<Header>,
    mut rx: mpsc::UnboundedReceiver<CandidateEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut pending = PendingCandidates::new();
    while let Some(event) = rx.recv().await {
        for batch in pending.on_event(event) {
            post_candidate_batch(&relay, &address, &headers, &batch, &cancel).await?;
        }
    }
    Ok(())
}

async fn post_candidate_batch(
    relay: &RelayClient,
    address: &str,
    headers: &[Header],
    batch: &[RTCIceCandidate],
    cancel: &CancellationToken,
) -> Result<()> {
    let inits: Vec<RTCIceCandidateInit> = batch
        .iter()
        .map(|c| c.to_json().map_err(TunnelError::from))
        .collect::<Result<_>>()?;
    let body = serde_json::to_vec(&inits)
        .map_err(|e| TunnelError::InvalidPeerMessage(e.to_string()))?;

    retry_relay(
        || {
            let relay = relay.clone();
            let body = body.clone();
            async move {
                relay
                    .post(address, "application/json; charset=utf-8", Bytes::from(body), headers)
                    .await
            }
        },
        cancel,
        "post candidate batch",
    )
    .await
}

/// `GET address` repeatedly, adding each batch to `pc`, until an empty
/// array (the terminal sentinel) arrives.
pub(crate) async fn run_candidate_receiver(
    relay: RelayClient,
    address: String,
    headers: Vec<Header>,
    pc: Arc<RTCPeerConnection>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let body = retry_relay(
            || {
                let relay = relay.clone();
                let address = address.clone();
                let headers = headers.clone();
                async move { relay.get(&address, &headers).await }
            },
            &cancel,
            "get candidate batch",
        )
        .await?;

        let batch: Vec<RTCIceCandidateInit> = serde_json::from_slice(&body)
            .map_err(|e| TunnelError::InvalidPeerMessage(e.to_string()))?;
        if batch.is_empty() {
            debug!(%address, "candidate stream terminated");
            return Ok(());
        }
        for candidate in batch {
            pc.add_ice_candidate(candidate).await?;
        }
    }
}
