//! Candidate-batch bookkeeping, and the message-passing translation of the
//! WebRTC ICE-candidate callback described in `spec.md` §9 DESIGN NOTES.
//!
//! The naive implementation (`original_source/piping-webrtc-signaling`)
//! holds three flags behind one mutex and calls the HTTP client from inside
//! the callback itself. Here the callback only ever does one thing: turn
//! itself into a [`CandidateEvent`] and push it onto an unbounded channel.
//! A single task owns [`PendingCandidates`] as plain data and is the only
//! thing that ever calls the relay, so the three invariants below are all
//! checked in one place with no lock.

use webrtc::ice_transport::ice_candidate::RTCIceCandidate;

/// One step of the candidate exchange, as seen by the owning task.
#[derive(Debug)]
pub enum CandidateEvent {
    /// A new locally-discovered candidate (`on_ice_candidate(Some(c))`).
    New(RTCIceCandidate),
    /// Candidate discovery finished (`on_ice_candidate(None)`).
    Done,
    /// The remote description has just been set. Sent by the signaling
    /// driver itself, not by the WebRTC callback, so the flush in step 6
    /// below happens on the same task and in the same order as everything
    /// else touching `PendingCandidates`.
    RemoteDescriptionSet,
}

/// Tracks the three invariants from `spec.md` §4.2's candidate-stream
/// contract: the queue of candidates discovered before the remote
/// description existed, whether discovery has finished, and whether the
/// empty-array terminal has already gone out.
#[derive(Debug, Default)]
pub struct PendingCandidates {
    queue: Vec<RTCIceCandidate>,
    discovery_done: bool,
    terminal_sent: bool,
    remote_description_set: bool,
}

impl PendingCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event, returning the candidate batches that must now be
    /// POSTed, in order. An empty `Vec` inside the outer `Vec` is the
    /// terminal marker.
    pub fn on_event(&mut self, event: CandidateEvent) -> Vec<Vec<RTCIceCandidate>> {
        match event {
            CandidateEvent::New(candidate) => {
                if self.remote_description_set {
                    vec![vec![candidate]]
                } else {
                    self.queue.push(candidate);
                    Vec::new()
                }
            }
            CandidateEvent::Done => {
                self.discovery_done = true;
                if self.remote_description_set && !self.terminal_sent {
                    self.terminal_sent = true;
                    vec![Vec::new()]
                } else {
                    Vec::new()
                }
            }
            CandidateEvent::RemoteDescriptionSet => {
                self.remote_description_set = true;
                let mut batches = Vec::new();
                if !self.queue.is_empty() {
                    batches.push(std::mem::take(&mut self.queue));
                }
                if self.discovery_done && !self.terminal_sent {
                    self.terminal_sent = true;
                    batches.push(Vec::new());
                }
                batches
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;

    fn candidate(n: u32) -> RTCIceCandidate {
        RTCIceCandidate::from(&RTCIceCandidateInit {
            candidate: format!("candidate:{n}"),
            ..Default::default()
        })
    }

    #[test]
    fn candidates_before_remote_description_are_queued_then_flushed() {
        let mut pending = PendingCandidates::new();
        assert!(pending.on_event(CandidateEvent::New(candidate(1))).is_empty());
        assert!(pending.on_event(CandidateEvent::New(candidate(2))).is_empty());

        let batches = pending.on_event(CandidateEvent::RemoteDescriptionSet);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
    }

    #[test]
    fn candidates_after_remote_description_are_sent_immediately() {
        let mut pending = PendingCandidates::new();
        pending.on_event(CandidateEvent::RemoteDescriptionSet);
        let batches = pending.on_event(CandidateEvent::New(candidate(1)));
        assert_eq!(batches, vec![vec![candidate(1)]]);
    }

    #[test]
    fn done_before_remote_description_sends_nothing_yet() {
        let mut pending = PendingCandidates::new();
        assert!(pending.on_event(CandidateEvent::Done).is_empty());

        let batches = pending.on_event(CandidateEvent::RemoteDescriptionSet);
        assert_eq!(batches, vec![Vec::<RTCIceCandidate>::new()]);
    }

    #[test]
    fn done_after_remote_description_sends_terminal_once() {
        let mut pending = PendingCandidates::new();
        pending.on_event(CandidateEvent::RemoteDescriptionSet);
        let batches = pending.on_event(CandidateEvent::Done);
        assert_eq!(batches, vec![Vec::<RTCIceCandidate>::new()]);

        // A second Done (shouldn't happen, but must stay idempotent) sends nothing more.
        assert!(pending.on_event(CandidateEvent::Done).is_empty());
    }
}
