use std::sync::Arc;

use async_trait::async_trait;

use awo_types::ContractResponse;

use crate::config::NetworkConfig;
use crate::error::Result;
use crate::event::LedgerEvent;
use crate::handler::EventHandler;

/// Chaincode that records work orders.
pub const ORDER_CHAINCODE: &str = "order";
/// Chaincode function recording a new work order.
pub const WORK_ORDER_SUBMIT: &str = "workOrderSubmit";
/// Chaincode function recording a work order's result.
pub const WORK_ORDER_COMPLETE: &str = "workOrderComplete";
/// Event emitted once a submission is committed.
pub const WORK_ORDER_SUBMITTED_EVENT: &str = "workOrderSubmitted";
/// Event emitted once a completion is committed.
pub const WORK_ORDER_COMPLETED_EVENT: &str = "workOrderCompleted";

/// Result returned by an event callback. An `Err` is a fault for that one
/// event; the handler logs it and keeps listening.
pub type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Callback invoked for every event delivered to an [`EventHandler`].
pub type EventCallback = Arc<dyn Fn(&LedgerEvent) -> HandlerResult + Send + Sync>;

/// What the work order proxy needs from a ledger network client.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Submit a transaction invoking `function` on `chaincode`.
    ///
    /// Returns once the transaction is accepted for ordering; the state
    /// change is not queryable until it commits.
    async fn invoke_chaincode(
        &self,
        chaincode: &str,
        function: &str,
        params: Vec<String>,
    ) -> ContractResponse;

    /// Subscribe to `event_name` events from `chaincode`.
    ///
    /// The subscription is live from the moment this returns; events are
    /// buffered until [`EventHandler::start_event_handling`] runs.
    fn event_handler(
        &self,
        event_name: &str,
        chaincode: &str,
        callback: EventCallback,
    ) -> Result<EventHandler>;
}

/// Builds a gateway from network configuration.
pub trait GatewayConnector: Send + Sync {
    fn connect(&self, network: &NetworkConfig) -> Result<Arc<dyn LedgerGateway>>;
}
