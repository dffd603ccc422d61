//! `tunnel [--listen|-l] [--udp|-u] <port> <path>` (`spec.md` §4.4/4.5).

use tokio_util::sync::CancellationToken;
use tracing::info;

use tunnel_net::session::PeerSession;
use tunnel_net::signaling::{run_answer, run_offer, SignalerConfig};
use tunnel_net::tunnel::{listener, run_dialer, run_listener, LocalTransport};
use tunnel_net::{Result, TunnelError};
use tunnel_protocol::address::{answer_side_id, offer_side_id};

use crate::cli::TunnelArgs;
use crate::commands::SharedConfig;

pub async fn execute(args: TunnelArgs, shared: SharedConfig) -> Result<()> {
    let transport = if args.udp {
        LocalTransport::Udp
    } else {
        LocalTransport::Tcp
    };

    let config = SignalerConfig {
        relay: shared.relay,
        headers: shared.headers,
        offer_id: offer_side_id(&args.path),
        answer_id: answer_side_id(&args.path),
    };

    let session = PeerSession::new(shared.ice_servers, transport.detach()).await?;
    let cancel = CancellationToken::new();
    let terminal = session.watch_terminal();

    let candidate_tasks = if args.listen {
        listener::create_placeholder_channel(&session.peer_connection()).await?;
        run_offer(config, &session, cancel.clone()).await?
    } else {
        run_answer(config, &session, cancel.clone()).await?
    };

    info!(listen = args.listen, udp = args.udp, port = args.port, "tunnel established");

    let forwarding = if args.listen {
        tokio::spawn(run_listener(
            session.peer_connection(),
            transport,
            args.port,
            cancel.clone(),
        ))
    } else {
        let pc = session.peer_connection();
        tokio::spawn(async move { run_dialer(pc, transport, args.port).await })
    };

    let result = match terminal.await {
        Ok(outcome) => outcome,
        Err(_) => Err(TunnelError::PeerConnectionDisconnected),
    };

    cancel.cancel();
    candidate_tasks.sender.abort();
    candidate_tasks.receiver.abort();
    forwarding.abort();
    session.close().await;

    result
}
