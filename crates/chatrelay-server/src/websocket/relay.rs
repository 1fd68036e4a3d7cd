//! Per-session relay loop.
//!
//! One inbound text message starts one turn: a single provider stream whose
//! text deltas are forwarded, in order, to the session that asked. Messages
//! that arrive mid-turn wait in the inbound queue and run afterwards. Every
//! text frame is a prompt, whitespace included.

use std::sync::Arc;
use std::time::Duration;

use chatrelay_llm::{Provider, StreamEvent};
use futures::StreamExt;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use super::registry::{ConnectionId, SendOutcome, SessionRegistry};
use crate::metrics::{RELAY_FRAGMENTS_TOTAL, RELAY_TURN_ERRORS_TOTAL, RELAY_TURNS_TOTAL};

const TRANSPORT: &str = "websocket";

/// How a single turn ended.
#[derive(Debug, PartialEq, Eq)]
enum TurnOutcome {
    Completed,
    Failed,
    Disconnected,
}

/// Drives the turns of one WebSocket session.
pub struct RelayLoop {
    id: ConnectionId,
    provider: Arc<dyn Provider>,
    registry: Arc<SessionRegistry>,
    fragment_delay: Option<Duration>,
    cancel: CancellationToken,
}

impl RelayLoop {
    /// Build a loop for the already-registered session `id`.
    pub fn new(
        id: ConnectionId,
        provider: Arc<dyn Provider>,
        registry: Arc<SessionRegistry>,
        fragment_delay: Option<Duration>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            provider,
            registry,
            fragment_delay,
            cancel,
        }
    }

    /// Process inbound messages until the peer goes away.
    ///
    /// Always deregisters the session before returning.
    #[instrument(skip_all, fields(conn_id = %self.id))]
    pub async fn run(self, mut inbound: mpsc::Receiver<String>) {
        loop {
            let text = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                msg = inbound.recv() => match msg {
                    Some(text) => text,
                    None => break,
                },
            };

            if self.run_turn(&text).await == TurnOutcome::Disconnected {
                break;
            }
        }

        let _ = self.registry.remove(&self.id);
        debug!("relay loop closed");
    }

    async fn run_turn(&self, prompt: &str) -> TurnOutcome {
        counter!(RELAY_TURNS_TOTAL, "transport" => TRANSPORT).increment(1);
        let started = Instant::now();
        debug!(model = self.provider.model(), "starting turn");

        let opened = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return TurnOutcome::Disconnected,
            result = self.provider.stream(prompt) => result,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                counter!(RELAY_TURN_ERRORS_TOTAL, "transport" => TRANSPORT).increment(1);
                warn!(error = %e, kind = e.category(), "upstream request failed");
                return TurnOutcome::Failed;
            }
        };

        let mut fragments = 0usize;
        let mut full_text = String::new();
        loop {
            let next = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return TurnOutcome::Disconnected,
                next = stream.next() => next,
            };

            match next {
                Some(Ok(StreamEvent::TextDelta { delta })) => {
                    if delta.is_empty() {
                        continue;
                    }
                    if fragments > 0
                        && let Some(delay) = self.fragment_delay
                    {
                        tokio::select! {
                            biased;
                            () = self.cancel.cancelled() => return TurnOutcome::Disconnected,
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        chars = delta.len(),
                        "fragment received"
                    );
                    full_text.push_str(&delta);
                    fragments += 1;

                    let outcome = tokio::select! {
                        biased;
                        () = self.cancel.cancelled() => return TurnOutcome::Disconnected,
                        outcome = self.registry.send(&self.id, delta) => outcome,
                    };
                    if outcome != SendOutcome::Delivered {
                        debug!(?outcome, "session gone mid-turn");
                        return TurnOutcome::Disconnected;
                    }
                    counter!(RELAY_FRAGMENTS_TOTAL, "transport" => TRANSPORT).increment(1);
                }
                Some(Ok(StreamEvent::Done { stop_reason })) => {
                    debug!(
                        fragments,
                        chars = full_text.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        stop_reason,
                        "turn complete"
                    );
                    trace!(text = %full_text, "full response");
                    return TurnOutcome::Completed;
                }
                Some(Err(e)) => {
                    counter!(RELAY_TURN_ERRORS_TOTAL, "transport" => TRANSPORT).increment(1);
                    warn!(
                        error = %e,
                        kind = e.category(),
                        fragments,
                        "upstream stream failed mid-turn"
                    );
                    return TurnOutcome::Failed;
                }
                None => {
                    info!(fragments, "upstream stream ended without a stop reason");
                    return TurnOutcome::Completed;
                }
            }
        }
    }
}
