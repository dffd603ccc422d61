//! End-to-end scenarios from `spec.md` §8, run against the in-process mock
//! relay in `support::mock_relay` instead of a real piping server.

mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use tunnel_net::relay::RelayClient;
use tunnel_net::session::PeerSession;
use tunnel_net::signaling::{run_answer, run_offer, SignalerConfig};
use tunnel_net::tunnel::{listener, run_dialer, run_listener, LocalTransport};

async fn relay_client(base_url: &str) -> RelayClient {
    RelayClient::new(base_url, false, None).unwrap()
}

/// Scenario 1: TCP loopback tunnel. A client writes `"abc"` to the listener
/// port and reads it back from an echo stub behind the dialer.
#[tokio::test]
async fn tcp_loopback_tunnel_echoes() {
    let relay = support::mock_relay::spawn().await;
    let cancel = CancellationToken::new();

    let listener_port = 17001;
    let dialer_port = 17002;

    // Echo stub the dialer connects to.
    tokio::spawn(async move {
        let stub = tokio::net::TcpListener::bind(("127.0.0.1", dialer_port))
            .await
            .unwrap();
        loop {
            let (mut conn, _) = stub.accept().await.unwrap();
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                loop {
                    let n = conn.read(&mut buf).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    let _ = conn.write_all(&buf[..n]).await;
                }
            });
        }
    });

    let offer_session = PeerSession::new(vec![], true).await.unwrap();
    let answer_session = PeerSession::new(vec![], true).await.unwrap();

    listener::create_placeholder_channel(&offer_session.peer_connection())
        .await
        .unwrap();

    let config = SignalerConfig {
        relay: relay_client(&relay.base_url).await,
        headers: vec![],
        offer_id: "offer_tcppath".to_string(),
        answer_id: "answer_tcppath".to_string(),
    };

    let (offer_tasks, answer_tasks) = tokio::join!(
        run_offer(config.clone(), &offer_session, cancel.clone()),
        run_answer(config.clone(), &answer_session, cancel.clone()),
    );
    let offer_tasks = offer_tasks.unwrap();
    let answer_tasks = answer_tasks.unwrap();

    let listener_pc = offer_session.peer_connection();
    tokio::spawn(run_listener(listener_pc, LocalTransport::Tcp, listener_port, cancel.clone()));

    let dialer_pc = answer_session.peer_connection();
    run_dialer(dialer_pc, LocalTransport::Tcp, dialer_port).await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut client = TcpStream::connect(("127.0.0.1", listener_port)).await.unwrap();
    client.write_all(b"abc").await.unwrap();
    let mut buf = [0u8; 3];
    client.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"abc");

    cancel.cancel();
    offer_tasks.sender.abort();
    offer_tasks.receiver.abort();
    answer_tasks.sender.abort();
    answer_tasks.receiver.abort();
    offer_session.close().await;
    answer_session.close().await;
}

/// Scenario 5: version skew. An offer-side handshake read against a
/// relay-replayed `{"version":2}` must fail with `UnsupportedPeerVersion`.
#[tokio::test]
async fn version_skew_is_rejected() {
    let relay = support::mock_relay::spawn().await;
    let client = relay_client(&relay.base_url).await;

    let address =
        tunnel_protocol::address::handshake_address("answer_skew", "offer_skew");
    client
        .post(
            &address,
            "application/json; charset=utf-8",
            bytes::Bytes::from_static(br#"{"version":2}"#),
            &[],
        )
        .await
        .unwrap();

    let body = client.get(&address, &[]).await.unwrap();
    let handshake: tunnel_protocol::wire::InitialHandshake =
        serde_json::from_slice(&body).unwrap();
    let err = handshake.check_supported().unwrap_err();
    assert!(matches!(
        err,
        tunnel_protocol::ProtocolError::UnsupportedVersion {
            local: 1,
            remote: 2
        }
    ));
}
