//! `TunnelDialer`: the answer side of `tunnel` (`spec.md` §4.5).
//!
//! Grounded in `tunnel/dialer.go`'s `tcpDialer`/`udpDialer`: reacts to
//! inbound data channels created by the listener, dials the configured
//! local service per channel, and bridges bytes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tracing::warn;
use webrtc::data_channel::RTCDataChannel;
use webrtc::peer_connection::RTCPeerConnection;

use crate::tunnel::LocalTransport;
use crate::Result;

const COPY_BUF_SIZE: usize = 32 * 1024;
const UDP_BUF_SIZE: usize = 64 * 1024;

/// Register `on_data_channel`, dialing `port` on the loopback host for every
/// inbound channel. Per-flow failures (dial refused) only drop that one
/// flow — `spec.md` §7 `LocalDialFailed` is per-flow, not fatal.
pub async fn run_dialer(pc: Arc<RTCPeerConnection>, transport: LocalTransport, port: u16) -> Result<()> {
    pc.on_data_channel(Box::new(move |channel: Arc<RTCDataChannel>| {
        match transport {
            LocalTransport::Tcp => spawn_tcp_flow(channel, port),
            LocalTransport::Udp => spawn_udp_flow(channel, port),
        }
        Box::pin(async {})
    }));
    Ok(())
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

fn spawn_tcp_flow(channel: Arc<RTCDataChannel>, port: u16) {
    channel.on_open(Box::new(move || {
        let channel = channel.clone();
        Box::pin(async move {
            let raw = match channel.detach().await {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(%err, "failed to detach data channel");
                    return;
                }
            };
            let stream = match TcpStream::connect(loopback(port)).await {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(%err, port, "local dial failed, dropping flow");
                    let _ = raw.close().await;
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

fn spawn_udp_flow(channel: Arc<RTCDataChannel>, port: u16) {
    let channel_for_open = channel.clone();
    tokio::spawn(async move {
        let socket = match UdpSocket::bind(("0.0.0.0", 0)).await {
            Ok(socket) => socket,
            Err(err) => {
                warn!(%err, "failed to open local udp socket, dropping flow");
                let _ = channel_for_open.close().await;
                return;
            }
        };
        if let Err(err) = socket.connect(loopback(port)).await {
            warn!(%err, port, "local dial failed, dropping flow");
            let _ = channel_for_open.close().await;
            return;
        }
        let socket = Arc::new(socket);

        let read_socket = socket.clone();
        let send_channel = channel_for_open.clone();
        channel_for_open.on_open(Box::new(move || {
            let read_socket = read_socket.clone();
            let send_channel = send_channel.clone();
            Box::pin(async move {
                tokio::spawn(async move {
                    let mut buf = vec![0u8; UDP_BUF_SIZE];
                    loop {
                        let n = match read_socket.recv(&mut buf).await {
                            Ok(n) => n,
                            Err(_) => break,
                        };
                        if send_channel.send(&Bytes::copy_from_slice(&buf[..n])).await.is_err() {
                            break;
                        }
                    }
                });
            })
        }));

        channel_for_open.on_message(Box::new(move |msg| {
            let socket = socket.clone();
            Box::pin(async move {
                if let Err(err) = socket.send(&msg.data).await {
                    warn!(%err, "failed to write datagram to local udp socket");
                }
            })
        }));
    });
}
