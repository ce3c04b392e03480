//! Work order proxy over a ledger event stream.
//!
//! Submissions and completions are fire-and-forget chaincode invocations.
//! Results are not queryable until the ledger commits, so
//! [`FabricWorkOrderProxy`] obtains them by subscribing to the
//! `workOrderCompleted` event and waiting for the one carrying the
//! requested work order, bounded by a timeout.

pub mod config;
pub mod decode;
pub mod error;
pub mod fabric;
pub mod traits;
pub mod waiter;

pub use config::{Correlation, ProxyConfig};
pub use decode::{CompletionEvent, SubmittedWorkOrder};
pub use error::{DecodeError, ProxyError, ProxyResult};
pub use fabric::FabricWorkOrderProxy;
pub use traits::{EncryptionKey, EncryptionKeyQuery, WorkOrderProxy};
pub use waiter::{EventWaiter, ResultSlot};

pub use awo_types::{
    ContractResponse, RequesterId, WorkOrderId, WorkOrderRequest, WorkOrderResponse, WorkerId,
};
