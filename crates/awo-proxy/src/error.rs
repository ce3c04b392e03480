use std::time::Duration;

use thiserror::Error;

use awo_fabric::FabricError;
use awo_types::WorkOrderId;

/// Why a completion event could not be turned into a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("event payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("malformed event envelope: {0}")]
    Envelope(String),

    #[error("event envelope carries no work order id")]
    MissingWorkOrderId,

    #[error("malformed work order response: {0}")]
    InnerResponse(String),

    #[error("work order response is empty")]
    EmptyResponse,
}

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy configuration is missing")]
    MissingConfig,

    #[error("invalid proxy configuration: {0}")]
    Config(String),

    #[error("ledger gateway is not initialized")]
    NotInitialized,

    #[error("{0} is not supported by this ledger backend")]
    Unsupported(&'static str),

    #[error("no completion event for work order {work_order_id} within {waited:?} ({unattributed_events} unattributed events)")]
    Timeout {
        work_order_id: WorkOrderId,
        waited: Duration,
        unattributed_events: usize,
    },

    #[error("completion event decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("completion subscription closed before an event arrived")]
    SubscriptionClosed,

    #[error("gateway error: {0}")]
    Gateway(#[from] FabricError),

    #[error("blocking call made from inside an async runtime; await the async form instead")]
    BlockingInRuntime,

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

pub type ProxyResult<T> = Result<T, ProxyError>;
