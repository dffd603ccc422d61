//! Offer-side signaling (`spec.md` §4.2, "Offer creates its SDP before the
//! initial handshake; POSTs SDP after the handshake exchange").

use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tunnel_protocol::address::{candidate_address, handshake_address, sdp_address};
use tunnel_protocol::wire::InitialHandshake;

use crate::session::PeerSession;
use crate::signaling::candidates::CandidateEvent;
use crate::signaling::{retry_relay, run_candidate_receiver, run_candidate_sender, SignalerConfig};
use crate::{Result, TunnelError};

/// Handles for the two candidate-exchange tasks, which keep running for the
/// life of the connection (trickle ICE can produce candidates long after
/// the SDP exchange completes) — callers hold these alongside
/// `session.watch_terminal()` and the tunnel-forwarding tasks, and clean
/// them up together when the session ends.
pub struct CandidateTasks {
    pub sender: JoinHandle<Result<()>>,
    pub receiver: JoinHandle<Result<()>>,
}

/// Run the offer side of the handshake: creates and posts the local
/// description, waits for the remote one, and spawns the candidate-batch
/// sender/receiver for the rest of the connection's life. Returns once SDP
/// has been exchanged in both directions.
pub async fn run_offer(
    config: SignalerConfig,
    session: &PeerSession,
    cancel: CancellationToken,
) -> Result<CandidateTasks> {
    let pc = session.peer_connection();
    let (candidate_tx, candidate_rx) = session.watch_ice_candidates();

    let local_description = pc.create_offer(None).await?;
    pc.set_local_description(local_description.clone()).await?;

    let handshake_out = handshake_address(&config.offer_id, &config.answer_id);
    let handshake_in = handshake_address(&config.answer_id, &config.offer_id);

    retry_relay(
        || {
            let relay = config.relay.clone();
            let headers = config.headers.clone();
            let address = handshake_out.clone();
            async move {
                let body = serde_json::to_vec(&InitialHandshake::current())
                    .expect("InitialHandshake always serializes");
                relay
                    .post(&address, "application/json; charset=utf-8", Bytes::from(body), &headers)
                    .await
            }
        },
        &cancel,
        "post offer handshake",
    )
    .await?;

    let remote_handshake: InitialHandshake = retry_relay(
        || {
            let relay = config.relay.clone();
            let headers = config.headers.clone();
            let address = handshake_in.clone();
            async move {
                let body = relay.get(&address, &headers).await?;
                serde_json::from_slice(&body)
                    .map_err(|e| TunnelError::InvalidPeerMessage(e.to_string()))
            }
        },
        &cancel,
        "get answer handshake",
    )
    .await?;
    remote_handshake.check_supported()?;
    info!(?remote_handshake, "answer-side handshake received");

    let candidate_out = candidate_address(&config.offer_id, &config.answer_id);
    let candidate_sender = tokio::spawn(run_candidate_sender(
        config.relay.clone(),
        candidate_out,
        config.headers.clone(),
        candidate_rx,
        cancel.clone(),
    ));

    let candidate_in = candidate_address(&config.answer_id, &config.offer_id);
    let candidate_receiver = tokio::spawn(run_candidate_receiver(
        config.relay.clone(),
        candidate_in,
        config.headers.clone(),
        pc.clone(),
        cancel.clone(),
    ));

    let sdp_out = sdp_address(&config.offer_id, &config.answer_id);
    let sdp_in = sdp_address(&config.answer_id, &config.offer_id);

    retry_relay(
        || {
            let relay = config.relay.clone();
            let headers = config.headers.clone();
            let address = sdp_out.clone();
            let description = local_description.clone();
            async move {
                let body = serde_json::to_vec(&description)
                    .map_err(|e| TunnelError::InvalidPeerMessage(e.to_string()))?;
                relay
                    .post(&address, "application/json; charset=utf-8", Bytes::from(body), &headers)
                    .await
            }
        },
        &cancel,
        "post offer sdp",
    )
    .await?;

    let remote_sdp = retry_relay(
        || {
            let relay = config.relay.clone();
            let headers = config.headers.clone();
            let address = sdp_in.clone();
            async move {
                let body = relay.get(&address, &headers).await?;
                serde_json::from_slice(&body)
                    .map_err(|e| TunnelError::InvalidPeerMessage(e.to_string()))
            }
        },
        &cancel,
        "get answer sdp",
    )
    .await?;
    pc.set_remote_description(remote_sdp).await?;
    info!("answer sdp received, remote description set");
    let _ = candidate_tx.send(CandidateEvent::RemoteDescriptionSet);
    drop(candidate_tx);

    Ok(CandidateTasks {
        sender: candidate_sender,
        receiver: candidate_receiver,
    })
}
