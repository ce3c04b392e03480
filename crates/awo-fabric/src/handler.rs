use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::event::LedgerEvent;
use crate::gateway::EventCallback;
use crate::router::EventStream;

/// Stop signal for a running [`EventHandler`]. Cheap to clone.
#[derive(Clone)]
pub struct EventStopper {
    tx: Arc<watch::Sender<bool>>,
}

impl EventStopper {
    /// End event handling now. Idempotent.
    pub fn stop_now(&self) {
        self.tx.send_replace(true);
    }

    /// Suspend for `after`, then end event handling.
    pub async fn stop_event_handling(&self, after: Duration) {
        tokio::time::sleep(after).await;
        debug!(after_ms = after.as_millis() as u64, "stopping event handling");
        self.stop_now();
    }

    pub fn is_stopped(&self) -> bool {
        *self.tx.borrow()
    }
}

enum Step {
    Recheck,
    Stop,
    Received(Result<LedgerEvent, RecvError>),
}

/// A live subscription to one chaincode event, bound to a callback.
///
/// Events are buffered from creation; [`start_event_handling`] drains them
/// into the callback until an [`EventStopper`] fires.
///
/// [`start_event_handling`]: EventHandler::start_event_handling
pub struct EventHandler {
    event_name: String,
    chaincode: String,
    stream: EventStream,
    callback: EventCallback,
    stop_tx: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
}

impl EventHandler {
    pub fn new(
        event_name: impl Into<String>,
        chaincode: impl Into<String>,
        stream: EventStream,
        callback: EventCallback,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            event_name: event_name.into(),
            chaincode: chaincode.into(),
            stream,
            callback,
            stop_tx: Arc::new(stop_tx),
            stop_rx,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn chaincode(&self) -> &str {
        &self.chaincode
    }

    /// Handle that ends [`start_event_handling`](Self::start_event_handling).
    pub fn stopper(&self) -> EventStopper {
        EventStopper {
            tx: Arc::clone(&self.stop_tx),
        }
    }

    /// Deliver events to the callback until stopped, returning the number
    /// of events delivered.
    ///
    /// Each callback runs to completion before the stop signal is checked
    /// again. A failing callback is logged and does not end handling. If
    /// the event source goes away, handling ends early.
    pub async fn start_event_handling(&mut self) -> usize {
        info!(event = %self.event_name, chaincode = %self.chaincode, "event handling started");
        let mut delivered = 0usize;

        loop {
            if *self.stop_rx.borrow() {
                break;
            }

            let step = tokio::select! {
                biased;
                changed = self.stop_rx.changed() => match changed {
                    Ok(()) => Step::Recheck,
                    Err(_) => Step::Stop,
                },
                received = self.stream.recv() => Step::Received(received),
            };

            match step {
                Step::Recheck => {}
                Step::Stop => break,
                Step::Received(Ok(event)) => {
                    delivered += 1;
                    debug!(%event, "event delivered");
                    if let Err(e) = (self.callback)(&event) {
                        warn!(%event, error = %e, "event callback failed");
                    }
                }
                Step::Received(Err(RecvError::Lagged(skipped))) => {
                    warn!(event = %self.event_name, skipped, "event handler lagged; events dropped");
                }
                Step::Received(Err(RecvError::Closed)) => {
                    debug!(event = %self.event_name, "event source closed");
                    break;
                }
            }
        }

        info!(event = %self.event_name, delivered, "event handling stopped");
        delivered
    }
}
