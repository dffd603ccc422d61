//! `TunnelListener`: the offer side of `tunnel` (`spec.md` §4.4).
//!
//! Grounded in `core/listener.go`'s `tcpListener`/`udpListener`: a TCP
//! accept loop creates one data channel per connection; a UDP loop keys a
//! data channel by source address, creating one the first time a new
//! source is seen.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::RTCPeerConnection;

use crate::tunnel::LocalTransport;
use crate::{Result, TunnelError};

const COPY_BUF_SIZE: usize = 32 * 1024;
const UDP_BUF_SIZE: usize = 64 * 1024;

/// Dispatch to the TCP or UDP accept loop per `transport`.
pub async fn run_listener(
    pc: Arc<RTCPeerConnection>,
    transport: LocalTransport,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    match transport {
        LocalTransport::Tcp => run_listener_tcp(pc, port, cancel).await,
        LocalTransport::Udp => run_listener_udp(pc, port, cancel).await,
    }
}

/// Create the listener-side decorative `"data"` channel and immediately
/// close it, so the offer description is well-formed before any real flow
/// exists (`spec.md` §4.3/§9). Must be called before `create_offer`.
pub async fn create_placeholder_channel(pc: &Arc<RTCPeerConnection>) -> Result<()> {
    let channel = pc.create_data_channel("data", None).await?;
    channel.close().await?;
    Ok(())
}

/// Run the TCP accept loop. Fatal for the whole session if the listener
/// itself fails (`spec.md` §4.4); a single connection's failure (dial,
/// detach) only ever drops that one flow.
pub async fn run_listener_tcp(
    pc: Arc<RTCPeerConnection>,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(TunnelError::LocalAcceptFailed)?;
    debug!(port, "tcp tunnel listener bound");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = accepted.map_err(TunnelError::LocalAcceptFailed)?;
                debug!(%peer, "accepted tcp connection");
                let channel = pc.create_data_channel("data", None).await?;
                spawn_tcp_flow(channel, stream);
            }
        }
    }
}

fn spawn_tcp_flow(channel: Arc<RTCDataChannel>, stream: TcpStream) {
    channel.on_open(Box::new(move || {
        let channel = channel.clone();
        let stream = stream;
        Box::pin(async move {
            let raw = match channel.detach().await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%err, "failed to detach data channel");
                    return;
                }
            };
            let (mut sock_read, mut sock_write) = stream.into_split();
            let to_channel = raw.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; COPY_BUF_SIZE];
                loop {
                    let n = match sock_read.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    if to_channel.write(&Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                        break;
                    }
                }
            });
            tokio::spawn(async move {
                let mut buf = vec![0u8; COPY_BUF_SIZE];
                loop {
                    let n = match raw.read(&mut buf).await {
                        Ok(n) if n > 0 => n,
                        _ => break,
                    };
                    if sock_write.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            });
        })
    }));
}

/// Run the UDP loop: a table maps remote source address to the per-flow
/// queue feeding the data channel created the first time that source is
/// seen, per `spec.md` §4.4's keying rule. Unordered, unreliable channels —
/// matches `spec.md` §4.3 ("never for UDP").
///
/// A new channel is not open the instant it is created, so datagrams that
/// arrive for it (including the one that triggered its creation) are
/// queued and only sent once `on_open` fires (`spec.md` §4.4/§5) — sending
/// on a still-`Connecting` channel fails outright and would drop them.
pub async fn run_listener_udp(
    pc: Arc<RTCPeerConnection>,
    port: u16,
    cancel: CancellationToken,
) -> Result<()> {
    let socket = Arc::new(
        UdpSocket::bind(("0.0.0.0", port))
            .await
            .map_err(TunnelError::LocalAcceptFailed)?,
    );
    debug!(port, "udp tunnel listener bound");

    let flows: Arc<Mutex<HashMap<std::net::SocketAddr, mpsc::UnboundedSender<Bytes>>>> =
        Arc::new(Mutex::new(HashMap::new()));
    let mut buf = vec![0u8; UDP_BUF_SIZE];

    loop {
        let (n, source) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            received = socket.recv_from(&mut buf) => received.map_err(TunnelError::LocalAcceptFailed)?,
        };
        let datagram = Bytes::copy_from_slice(&buf[..n]);

        let existing = flows.lock().await.get(&source).cloned();
        let sender = match existing {
            Some(sender) => sender,
            None => {
                let (tx, rx) = mpsc::unbounded_channel();
                flows.lock().await.insert(source, tx.clone());
                spawn_udp_flow(pc.clone(), socket.clone(), source, rx).await?;
                tx
            }
        };

        if sender.send(datagram).is_err() {
            warn!(%source, "udp flow queue closed");
        }
    }
}

/// Create the data channel for `source`, wait for it to open before
/// draining `rx` into it, and wire the return path back to the socket.
async fn spawn_udp_flow(
    pc: Arc<RTCPeerConnection>,
    socket: Arc<UdpSocket>,
    source: std::net::SocketAddr,
    mut rx: mpsc::UnboundedReceiver<Bytes>,
) -> Result<()> {
    let init = RTCDataChannelInit {
        ordered: Some(false),
        max_retransmits: Some(0),
        ..Default::default()
    };
    let channel = pc.create_data_channel("data", Some(init)).await?;

    let (open_tx, open_rx) = oneshot::channel();
    register_open_once(channel.clone(), open_tx);
    spawn_udp_reader(channel.clone(), socket, source);

    tokio::spawn(async move {
        if open_rx.await.is_err() {
            return;
        }
        while let Some(datagram) = rx.recv().await {
            if channel.send(&datagram).await.is_err() {
                warn!(%source, "failed to forward datagram to data channel");
                break;
            }
        }
    });

    Ok(())
}

fn register_open_once(channel: Arc<RTCDataChannel>, open: oneshot::Sender<()>) {
    let open = std::sync::Mutex::new(Some(open));
    channel.on_open(Box::new(move || {
        if let Some(open) = open.lock().expect("open mutex poisoned").take() {
            let _ = open.send(());
        }
        Box::pin(async {})
    }));
}

fn spawn_udp_reader(channel: Arc<RTCDataChannel>, socket: Arc<UdpSocket>, source: std::net::SocketAddr) {
    channel.on_message(Box::new(move |msg| {
        let socket = socket.clone();
        Box::pin(async move {
            if let Err(err) = socket.send_to(&msg.data, source).await {
                warn!(%err, %source, "failed to write datagram back to udp socket");
            }
        })
    }));
}
