//! `DuplexBridge`: couples one data channel to stdio (`spec.md` §4.6).
//!
//! Unlike the TCP/UDP tunnel flows, there is no underlying socket with its
//! own EOF/close signal, so the two ends agree on an explicit sentinel: one
//! zero-length frame means "no more data." `P6` requires exactly one such
//! frame per direction, never as real payload.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{self, AsyncReadExt, AsyncWriteExt};
use tokio::sync::oneshot;
use tracing::warn;
use webrtc::data_channel::RTCDataChannel;

use crate::Result;

const STDIN_BUF_SIZE: usize = 32 * 1024;

/// Bridge `channel` to stdin/stdout. Waits for the channel's `on_open` before
/// forwarding stdin (mirrors `duplex/handle_offer.go`/`handle_answer.go`,
/// which both gate `stdinToDataChannel` on the channel's open callback).
/// Returns once both directions have finished: stdin hit EOF and the close
/// sentinel was sent, and the channel sent its own close sentinel (or the
/// channel closed).
pub async fn run_duplex_bridge(channel: Arc<RTCDataChannel>) -> Result<()> {
    let (stdout_done_tx, stdout_done_rx) = oneshot::channel();
    register_message_to_stdout(channel.clone(), stdout_done_tx);

    let (open_tx, open_rx) = oneshot::channel();
    register_open(channel.clone(), open_tx);

    let stdin_to_channel = async {
        let _ = open_rx.await;
        stdin_to_data_channel(channel).await
    };

    let (stdin_result, stdout_result) = tokio::join!(stdin_to_channel, stdout_done_rx);
    stdin_result?;
    let _ = stdout_result;
    Ok(())
}

fn register_open(channel: Arc<RTCDataChannel>, open: oneshot::Sender<()>) {
    let open = std::sync::Mutex::new(Some(open));
    channel.on_open(Box::new(move || {
        if let Some(open) = open.lock().expect("open mutex poisoned").take() {
            let _ = open.send(());
        }
        Box::pin(async {})
    }));
}

async fn stdin_to_data_channel(channel: Arc<RTCDataChannel>) -> Result<()> {
    let mut stdin = io::stdin();
    let mut buf = vec![0u8; STDIN_BUF_SIZE];
    loop {
        let n = stdin.read(&mut buf).await?;
        if n == 0 {
            channel.send(&Bytes::new()).await?;
            return Ok(());
        }
        channel.send(&Bytes::copy_from_slice(&buf[..n])).await?;
    }
}

fn register_message_to_stdout(channel: Arc<RTCDataChannel>, done: oneshot::Sender<()>) {
    let done = Arc::new(std::sync::Mutex::new(Some(done)));
    channel.on_message(Box::new(move |msg| {
        let done = done.clone();
        Box::pin(async move {
            if msg.data.is_empty() {
                if let Some(done) = done.lock().expect("stdout-done mutex poisoned").take() {
                    let _ = done.send(());
                }
                return;
            }
            let mut stdout = io::stdout();
            if let Err(err) = stdout.write_all(&msg.data).await {
                warn!(%err, "failed to write to stdout");
                return;
            }
            let _ = stdout.flush().await;
        })
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdin_buffer_is_bounded_at_32_kib() {
        assert_eq!(STDIN_BUF_SIZE, 32 * 1024);
    }
}
