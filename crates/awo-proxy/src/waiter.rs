use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use awo_fabric::{EventCallback, EventHandler, HandlerResult, LedgerEvent};
use awo_types::{WorkOrderId, WorkOrderResponse};

use crate::config::Correlation;
use crate::decode::CompletionEvent;
use crate::error::{DecodeError, ProxyError, ProxyResult};

type Resolution = Result<WorkOrderResponse, DecodeError>;

/// Single-resolution holder for one result wait.
///
/// Created per wait and fed by the completion-event callback. The first
/// event attributed to the awaited work order resolves the slot, with
/// either its decoded response or the decode error; later events are
/// ignored. Events that cannot be attributed are counted.
pub struct ResultSlot {
    work_order_id: WorkOrderId,
    correlation: Correlation,
    sender: Mutex<Option<oneshot::Sender<Resolution>>>,
    unattributed: AtomicUsize,
}

impl ResultSlot {
    pub fn new(
        work_order_id: WorkOrderId,
        correlation: Correlation,
    ) -> (Arc<Self>, oneshot::Receiver<Resolution>) {
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(Self {
            work_order_id,
            correlation,
            sender: Mutex::new(Some(tx)),
            unattributed: AtomicUsize::new(0),
        });
        (slot, rx)
    }

    pub fn work_order_id(&self) -> &WorkOrderId {
        &self.work_order_id
    }

    /// Events seen that could not be matched to any work order.
    pub fn unattributed_events(&self) -> usize {
        self.unattributed.load(Ordering::SeqCst)
    }

    pub fn is_resolved(&self) -> bool {
        self.sender
            .lock()
            .expect("result slot lock poisoned")
            .is_none()
    }

    /// Decode callback bound to this slot.
    pub fn callback(self: &Arc<Self>) -> EventCallback {
        let slot = Arc::clone(self);
        Arc::new(move |event: &LedgerEvent| -> HandlerResult {
            slot.offer(event)?;
            Ok(())
        })
    }

    /// Feed one completion event into the slot.
    ///
    /// Returns the decode error for a malformed event, after recording it
    /// as this slot's resolution when the event is attributed to the
    /// awaited work order.
    pub fn offer(&self, event: &LedgerEvent) -> Result<(), DecodeError> {
        let completion = match CompletionEvent::decode(event) {
            Ok(completion) => completion,
            Err(e) => {
                self.unattributed.fetch_add(1, Ordering::SeqCst);
                return Err(e);
            }
        };

        match (self.correlation, &completion.work_order_id) {
            (Correlation::FirstEvent, _) => {}
            (Correlation::WorkOrderId, Some(id)) if *id == self.work_order_id => {}
            (Correlation::WorkOrderId, Some(other)) => {
                debug!(awaited = %self.work_order_id, event_for = %other, "completion for another work order");
                return Ok(());
            }
            (Correlation::WorkOrderId, None) => {
                self.unattributed.fetch_add(1, Ordering::SeqCst);
                return Err(DecodeError::MissingWorkOrderId);
            }
        }

        let resolution = completion.response();
        let outcome = match &resolution {
            Ok(_) => Ok(()),
            Err(e) => Err(e.clone()),
        };
        self.resolve(resolution, event);
        outcome
    }

    fn resolve(&self, resolution: Resolution, event: &LedgerEvent) {
        let sender = self
            .sender
            .lock()
            .expect("result slot lock poisoned")
            .take();
        match sender {
            Some(tx) => {
                debug!(work_order_id = %self.work_order_id, %event, "result slot resolved");
                // The waiter may already have timed out and dropped its receiver.
                let _ = tx.send(resolution);
            }
            None => {
                debug!(work_order_id = %self.work_order_id, %event, "result slot already resolved; event ignored");
            }
        }
    }
}

/// Bounded wait for a completion event.
///
/// Listening and the deadline run together on the calling task. The wait
/// ends as soon as the slot resolves, the event source closes, or the
/// timeout elapses, and listening is stopped before it returns.
pub struct EventWaiter {
    timeout: Duration,
}

enum Outcome {
    Resolved(Result<Resolution, oneshot::error::RecvError>),
    SourceClosed(usize),
    TimedOut,
}

impl EventWaiter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn wait(
        &self,
        mut handler: EventHandler,
        slot: &ResultSlot,
        mut receiver: oneshot::Receiver<Resolution>,
    ) -> ProxyResult<WorkOrderResponse> {
        let stopper = handler.stopper();
        let listening = handler.start_event_handling();
        tokio::pin!(listening);
        let deadline = tokio::time::sleep(self.timeout);
        tokio::pin!(deadline);

        let outcome = tokio::select! {
            biased;
            resolved = &mut receiver => Outcome::Resolved(resolved),
            delivered = &mut listening => Outcome::SourceClosed(delivered),
            () = &mut deadline => Outcome::TimedOut,
        };

        let (resolution, delivered, closed) = match outcome {
            Outcome::Resolved(Ok(resolution)) => {
                stopper.stop_now();
                (Some(resolution), listening.await, false)
            }
            Outcome::Resolved(Err(_)) => {
                stopper.stop_now();
                (None, listening.await, true)
            }
            // The last event before the close may have resolved the slot.
            Outcome::SourceClosed(delivered) => (receiver.try_recv().ok(), delivered, true),
            Outcome::TimedOut => {
                stopper.stop_now();
                let delivered = listening.await;
                (receiver.try_recv().ok(), delivered, false)
            }
        };

        match resolution {
            Some(Ok(response)) => {
                info!(work_order_id = %slot.work_order_id(), delivered, "work order result received");
                Ok(response)
            }
            Some(Err(e)) => Err(ProxyError::Decode(e)),
            None if !closed => {
                info!(
                    work_order_id = %slot.work_order_id(),
                    waited_secs = self.timeout.as_secs(),
                    delivered,
                    unattributed = slot.unattributed_events(),
                    "timed out waiting for work order result"
                );
                Err(ProxyError::Timeout {
                    work_order_id: slot.work_order_id().clone(),
                    waited: self.timeout,
                    unattributed_events: slot.unattributed_events(),
                })
            }
            None => {
                warn!(work_order_id = %slot.work_order_id(), delivered, "event source closed before a result arrived");
                Err(ProxyError::SubscriptionClosed)
            }
        }
    }
}
