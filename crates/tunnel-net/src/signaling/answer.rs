//! Answer-side signaling (`spec.md` §4.2: "must first set the remote
//! description received from offer, then generate its SDP ... and only
//! then set its own local description, starting candidate gathering").

use bytes::Bytes;
use tracing::info;

use tokio_util::sync::CancellationToken;

use tunnel_protocol::address::{candidate_address, handshake_address, sdp_address};
use tunnel_protocol::wire::InitialHandshake;

use crate::session::PeerSession;
use crate::signaling::candidates::CandidateEvent;
use crate::signaling::offer::CandidateTasks;
use crate::signaling::{retry_relay, run_candidate_receiver, run_candidate_sender, SignalerConfig};
use crate::{Result, TunnelError};

/// Run the answer side of the handshake. Unlike [`super::offer::run_offer`],
/// no local description exists yet when this starts — it is only created
/// (and set) after the offer's SDP has been received, which is also the
/// point candidate gathering begins on this side.
pub async fn run_answer(
    config: SignalerConfig,
    session: &PeerSession,
    cancel: CancellationToken,
) -> Result<CandidateTasks> {
    let pc = session.peer_connection();
    let (candidate_tx, candidate_rx) = session.watch_ice_candidates();

    let handshake_in = handshake_address(&config.offer_id, &config.answer_id);
    let handshake_out = handshake_address(&config.answer_id, &config.offer_id);

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
        "get offer handshake",
    )
    .await?;
    info!(?remote_handshake, "offer-side handshake received");

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
        "post answer handshake",
    )
    .await?;

    let candidate_out = candidate_address(&config.answer_id, &config.offer_id);
    let candidate_sender = tokio::spawn(run_candidate_sender(
        config.relay.clone(),
        candidate_out,
        config.headers.clone(),
        candidate_rx,
        cancel.clone(),
    ));

    let candidate_in = candidate_address(&config.offer_id, &config.answer_id);
    let candidate_receiver = tokio::spawn(run_candidate_receiver(
        config.relay.clone(),
        candidate_in,
        config.headers.clone(),
        pc.clone(),
        cancel.clone(),
    ));

    let sdp_in = sdp_address(&config.offer_id, &config.answer_id);
    let sdp_out = sdp_address(&config.answer_id, &config.offer_id);

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
        "get offer sdp",
    )
    .await?;
    pc.set_remote_description(remote_sdp).await?;
    info!("offer sdp received, remote description set");

    let local_description = pc.create_answer(None).await?;

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
        "post answer sdp",
    )
    .await?;

    pc.set_local_description(local_description).await?;
    let _ = candidate_tx.send(CandidateEvent::RemoteDescriptionSet);
    drop(candidate_tx);

    Ok(CandidateTasks {
        sender: candidate_sender,
        receiver: candidate_receiver,
    })
}
