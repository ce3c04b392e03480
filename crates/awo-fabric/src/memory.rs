use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use awo_types::ContractResponse;

use crate::config::NetworkConfig;
use crate::error::{FabricError, Result};
use crate::event::LedgerEvent;
use crate::gateway::{
    EventCallback, GatewayConnector, LedgerGateway, ORDER_CHAINCODE, WORK_ORDER_COMPLETE,
    WORK_ORDER_COMPLETED_EVENT, WORK_ORDER_SUBMIT, WORK_ORDER_SUBMITTED_EVENT,
};
use crate::handler::EventHandler;
use crate::router::{EventRouter, Topic};

/// A chaincode invocation as received by the in-memory ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub chaincode: String,
    pub function: String,
    pub params: Vec<String>,
}

/// Work order state held by the simulated `order` chaincode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWorkOrder {
    pub worker_id: String,
    pub requester_id: String,
    pub request: String,
    pub response: Option<String>,
}

#[derive(Default)]
struct ChaincodeState {
    work_orders: BTreeMap<String, StoredWorkOrder>,
    invocations: Vec<Invocation>,
    scripted_failures: usize,
}

/// In-memory ledger gateway for tests, local demos, and embedding.
///
/// Simulates the `order` chaincode: submissions and completions are
/// recorded and announced through `workOrderSubmitted` /
/// `workOrderCompleted` events. With a commit delay, events are routed on
/// a spawned task after the delay, so callers see the same
/// submit-now-observe-later behaviour as on a real ledger.
pub struct InMemoryGateway {
    chaincode: String,
    router: Arc<EventRouter>,
    state: RwLock<ChaincodeState>,
    block_height: AtomicU64,
    commit_delay: Duration,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self {
            chaincode: ORDER_CHAINCODE.to_string(),
            router: Arc::new(EventRouter::new()),
            state: RwLock::new(ChaincodeState::default()),
            block_height: AtomicU64::new(0),
            commit_delay: Duration::ZERO,
        }
    }

    /// Delay between an invocation and the routing of its event.
    ///
    /// A non-zero delay spawns onto the current tokio runtime, so
    /// invocations must then run inside one.
    pub fn with_commit_delay(mut self, delay: Duration) -> Self {
        self.commit_delay = delay;
        self
    }

    /// Make the next `count` invocations report `Error` without executing.
    /// They are still recorded.
    pub fn fail_invocations(&self, count: usize) {
        self.state
            .write()
            .expect("chaincode lock poisoned")
            .scripted_failures = count;
    }

    /// All invocations received so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.state
            .read()
            .expect("chaincode lock poisoned")
            .invocations
            .clone()
    }

    pub fn work_order(&self, work_order_id: &str) -> Option<StoredWorkOrder> {
        self.state
            .read()
            .expect("chaincode lock poisoned")
            .work_orders
            .get(work_order_id)
            .cloned()
    }

    /// Height of the most recent block.
    pub fn block_height(&self) -> u64 {
        self.block_height.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.router.subscriber_count()
    }

    /// Route an arbitrary event from this chaincode immediately, bypassing
    /// chaincode logic.
    pub fn publish_raw(&self, event_name: &str, payload: Vec<u8>) -> LedgerEvent {
        let event = LedgerEvent::new(event_name, self.chaincode.clone(), payload, self.next_block());
        let delivered = self.router.route(&event);
        debug!(%event, delivered, "raw event published");
        event
    }

    fn next_block(&self) -> u64 {
        self.block_height.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(&self, chaincode: &str, function: &str, params: &[String]) -> bool {
        let mut state = self.state.write().expect("chaincode lock poisoned");
        state.invocations.push(Invocation {
            chaincode: chaincode.to_string(),
            function: function.to_string(),
            params: params.to_vec(),
        });
        if state.scripted_failures > 0 {
            state.scripted_failures -= 1;
            return false;
        }
        true
    }

    /// Execute chaincode logic, returning the event to emit.
    fn execute(&self, chaincode: &str, function: &str, params: &[String]) -> Result<(&'static str, Vec<u8>)> {
        if chaincode != self.chaincode {
            return Err(FabricError::UnknownFunction {
                chaincode: chaincode.to_string(),
                function: function.to_string(),
            });
        }

        match function {
            WORK_ORDER_SUBMIT => {
                let [work_order_id, worker_id, requester_id, request] = expect_params::<4>(function, params)?;
                let mut state = self.state.write().expect("chaincode lock poisoned");
                if state.work_orders.contains_key(work_order_id) {
                    return Err(FabricError::DuplicateWorkOrder(work_order_id.clone()));
                }
                state.work_orders.insert(
                    work_order_id.clone(),
                    StoredWorkOrder {
                        worker_id: worker_id.clone(),
                        requester_id: requester_id.clone(),
                        request: request.clone(),
                        response: None,
                    },
                );
                let payload = json!({
                    "workOrderId": work_order_id,
                    "workerId": worker_id,
                    "requesterId": requester_id,
                    "workOrderRequest": request,
                });
                Ok((WORK_ORDER_SUBMITTED_EVENT, encode(&payload)?))
            }
            WORK_ORDER_COMPLETE => {
                let [work_order_id, response] = expect_params::<2>(function, params)?;
                let mut state = self.state.write().expect("chaincode lock poisoned");
                let stored = state
                    .work_orders
                    .get_mut(work_order_id)
                    .ok_or_else(|| FabricError::UnknownWorkOrder(work_order_id.clone()))?;
                stored.response = Some(response.clone());
                let payload = json!({
                    "workOrderId": work_order_id,
                    "workOrderResponse": response,
                });
                Ok((WORK_ORDER_COMPLETED_EVENT, encode(&payload)?))
            }
            other => Err(FabricError::UnknownFunction {
                chaincode: chaincode.to_string(),
                function: other.to_string(),
            }),
        }
    }

    fn commit(&self, event: LedgerEvent) {
        if self.commit_delay.is_zero() {
            let delivered = self.router.route(&event);
            debug!(%event, delivered, "event committed");
            return;
        }

        let router = Arc::clone(&self.router);
        let delay = self.commit_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let delivered = router.route(&event);
            debug!(%event, delivered, "event committed");
        });
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerGateway for InMemoryGateway {
    async fn invoke_chaincode(
        &self,
        chaincode: &str,
        function: &str,
        params: Vec<String>,
    ) -> ContractResponse {
        if !self.record(chaincode, function, &params) {
            warn!(chaincode, function, "scripted invocation failure");
            return ContractResponse::Error;
        }

        match self.execute(chaincode, function, &params) {
            Ok((event_name, payload)) => {
                let event = LedgerEvent::new(event_name, chaincode, payload, self.next_block());
                debug!(chaincode, function, tx = %event.short_tx_id(), "invocation accepted");
                self.commit(event);
                ContractResponse::Success
            }
            Err(e) => {
                warn!(chaincode, function, error = %e, "chaincode invocation failed");
                ContractResponse::Error
            }
        }
    }

    fn event_handler(
        &self,
        event_name: &str,
        chaincode: &str,
        callback: EventCallback,
    ) -> Result<EventHandler> {
        let stream = self.router.subscribe(Topic::new(chaincode, event_name));
        Ok(EventHandler::new(event_name, chaincode, stream, callback))
    }
}

/// Connector handing out a shared [`InMemoryGateway`].
pub struct InMemoryConnector {
    gateway: Arc<InMemoryGateway>,
}

impl InMemoryConnector {
    pub fn new(gateway: Arc<InMemoryGateway>) -> Self {
        Self { gateway }
    }
}

impl GatewayConnector for InMemoryConnector {
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn LedgerGateway>> {
        if network.channel.trim().is_empty() {
            return Err(FabricError::InvalidConfig("channel must not be empty".into()));
        }
        if let Some(ref profile) = network.profile_path {
            if !profile.exists() {
                return Err(FabricError::NotConnected(format!(
                    "connection profile {} not found",
                    profile.display()
                )));
            }
        }
        info!(channel = %network.channel, peer = %network.peer, "connected to in-memory ledger");
        let gateway: Arc<dyn LedgerGateway> = self.gateway.clone();
        Ok(gateway)
    }
}

fn expect_params<'a, const N: usize>(function: &str, params: &'a [String]) -> Result<&'a [String; N]> {
    params.try_into().map_err(|_| FabricError::InvalidParams {
        function: function.to_string(),
        expected: N,
        actual: params.len(),
    })
}

fn encode(payload: &serde_json::Value) -> Result<Vec<u8>> {
    serde_json::to_vec(payload).map_err(|e| FabricError::Serialization(e.to_string()))
}
