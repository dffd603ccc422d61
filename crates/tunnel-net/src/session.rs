//! Wraps the WebRTC peer connection (`spec.md` §4.3).
//!
//! One [`PeerSession`] per tunnel/duplex process. It owns the
//! `RTCPeerConnection`, translates its `on_ice_candidate` callback into the
//! [`CandidateEvent`](crate::signaling::candidates::CandidateEvent) stream the
//! signaler consumes, and turns `on_peer_connection_state_change` into the
//! single terminal-outcome channel described in §5 (`PeerConnectionFailed`
//! vs. the clean `PeerConnectionDisconnected` stop).

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::setting_engine::SettingEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_candidate::RTCIceCandidate;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::RTCPeerConnection;

use crate::signaling::candidates::CandidateEvent;
use crate::{Result, TunnelError};

/// A live (or being-established) WebRTC peer connection, plus the event
/// plumbing the rest of the crate needs.
pub struct PeerSession {
    pc: Arc<RTCPeerConnection>,
}

impl PeerSession {
    /// Build the peer connection. `detach` mirrors `spec.md` §4.3: set for
    /// TCP tunnels (byte-stream data channels). Left unset for UDP tunnels
    /// and duplex stdio, both of which stay on the message-oriented
    /// `on_message`/`send` API (`duplex/handle_offer.go` never detaches its
    /// channel).
    pub async fn new(ice_servers: Vec<RTCIceServer>, detach: bool) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media_engine)?;

        let mut setting_engine = SettingEngine::default();
        if detach {
            setting_engine.detach_data_channels();
        }

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .with_setting_engine(setting_engine)
            .build();

        let config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };
        let pc = Arc::new(api.new_peer_connection(config).await?);

        Ok(Self { pc })
    }

    /// The underlying peer connection, for the signaler and tunnel/duplex
    /// layers that need to create data channels or set descriptions.
    pub fn peer_connection(&self) -> Arc<RTCPeerConnection> {
        self.pc.clone()
    }

    /// Create a data channel. Used for the real per-flow channels (TCP/UDP
    /// tunnel) as well as the listener-side throwaway `"data"` channel
    /// (`spec.md` §4.3) that exists only to make the offer description
    /// well-formed.
    pub async fn create_data_channel(
        &self,
        label: &str,
        ordered: bool,
        max_retransmits: Option<u16>,
    ) -> Result<Arc<RTCDataChannel>> {
        let init = RTCDataChannelInit {
            ordered: Some(ordered),
            max_retransmits,
            ..Default::default()
        };
        Ok(self.pc.create_data_channel(label, Some(init)).await?)
    }

    /// Wire the `on_ice_candidate` callback into an event channel. The
    /// callback itself does nothing but translate and send — all state
    /// (`PendingCandidates`) and every relay POST live in the task that
    /// drains the receiver, per the §9 redesign. The sender is returned
    /// too, so the signaling driver can push its own
    /// `CandidateEvent::RemoteDescriptionSet` onto the same queue once it
    /// sets the remote description, keeping every mutation of
    /// `PendingCandidates` on one task in one order.
    pub fn watch_ice_candidates(
        &self,
    ) -> (
        mpsc::UnboundedSender<CandidateEvent>,
        mpsc::UnboundedReceiver<CandidateEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback_tx = tx.clone();
        self.pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
            let tx = callback_tx.clone();
            Box::pin(async move {
                let event = match candidate {
                    Some(c) => CandidateEvent::New(c),
                    None => CandidateEvent::Done,
                };
                if tx.send(event).is_err() {
                    debug!("ice candidate event dropped: signaler already gone");
                }
            })
        }));
        (tx, rx)
    }

    /// Wire `on_peer_connection_state_change` into a one-shot terminal
    /// outcome: `Ok(())` on `Disconnected` (clean stop), `Err` on `Failed`.
    /// Any other state transition is logged and otherwise ignored.
    pub fn watch_terminal(&self) -> oneshot::Receiver<Result<()>> {
        let (tx, rx) = oneshot::channel();
        let tx = std::sync::Mutex::new(Some(tx));
        self.pc
            .on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
                info!(%state, "peer connection state changed");
                let outcome = match state {
                    RTCPeerConnectionState::Failed => Some(Err(TunnelError::PeerConnectionFailed)),
                    RTCPeerConnectionState::Disconnected => {
                        Some(Err(TunnelError::PeerConnectionDisconnected))
                    }
                    _ => None,
                };
                if let Some(outcome) = outcome {
                    if let Some(tx) = tx.lock().expect("terminal sender mutex poisoned").take() {
                        let _ = tx.send(outcome);
                    }
                }
                Box::pin(async {})
            }));
        rx
    }

    /// Close the peer connection. Failures are logged, not propagated: by
    /// the time this runs the session is already ending (`spec.md` §5,
    /// "the peer connection is closed exactly once on session end").
    pub async fn close(&self) {
        if let Err(err) = self.pc.close().await {
            warn!(%err, "failed to close peer connection");
        }
    }
}
