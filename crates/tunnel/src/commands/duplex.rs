//! `duplex <local-id> <remote-id>` (`spec.md` §4.6).

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::info;
use webrtc::data_channel::RTCDataChannel;

use tunnel_net::duplex::run_duplex_bridge;
use tunnel_net::session::PeerSession;
use tunnel_net::signaling::{run_answer, run_offer, SignalerConfig};
use tunnel_net::{Result, TunnelError};
use tunnel_protocol::address::is_offer_role;

use crate::cli::DuplexArgs;
use crate::commands::SharedConfig;

pub async fn execute(args: DuplexArgs, shared: SharedConfig) -> Result<()> {
    let is_offer = is_offer_role(&args.local_id, &args.remote_id);

    let config = SignalerConfig {
        relay: shared.relay,
        headers: shared.headers,
        offer_id: if is_offer {
            args.local_id.clone()
        } else {
            args.remote_id.clone()
        },
        answer_id: if is_offer {
            args.remote_id.clone()
        } else {
            args.local_id.clone()
        },
    };

    // Never detached: the duplex bridge talks to the channel through
    // on_message/send, matching `duplex/handle_offer.go`.
    let session = PeerSession::new(shared.ice_servers, false).await?;
    let cancel = CancellationToken::new();
    let terminal = session.watch_terminal();

    let (candidate_tasks, channel) = if is_offer {
        let channel = session.create_data_channel("data", true, None).await?;
        let tasks = run_offer(config, &session, cancel.clone()).await?;
        (tasks, channel)
    } else {
        // The answer side never creates its own channel: it waits for the
        // one the offer side opened, per `duplex/handle_answer.go`'s
        // `OnDataChannel` handler.
        let channel_rx = wait_for_data_channel(&session);
        let tasks = run_answer(config, &session, cancel.clone()).await?;
        let channel = channel_rx
            .await
            .map_err(|_| TunnelError::PeerConnectionDisconnected)?;
        (tasks, channel)
    };

    info!(local = %args.local_id, remote = %args.remote_id, offer_role = is_offer, "duplex channel established");

    let bridge = tokio::spawn(run_duplex_bridge(channel));

    let result = tokio::select! {
        outcome = terminal => match outcome {
            Ok(outcome) => outcome,
            Err(_) => Err(TunnelError::PeerConnectionDisconnected),
        },
        bridge_result = bridge => bridge_result.unwrap_or(Err(TunnelError::PeerConnectionDisconnected)),
    };

    cancel.cancel();
    candidate_tasks.sender.abort();
    candidate_tasks.receiver.abort();
    session.close().await;

    result
}

fn wait_for_data_channel(session: &PeerSession) -> oneshot::Receiver<Arc<RTCDataChannel>> {
    let (tx, rx) = oneshot::channel();
    let tx = std::sync::Mutex::new(Some(tx));
    session
        .peer_connection()
        .on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
            if let Some(tx) = tx.lock().expect("data channel mutex poisoned").take() {
                let _ = tx.send(channel);
            }
            Box::pin(async {})
        }));
    rx
}
