//! Foundation types for the work order proxy.
//!
//! Every other crate in the workspace depends on `awo-types`.
//!
//! # Key Types
//!
//! - [`WorkOrderId`], [`WorkerId`], [`RequesterId`]: opaque caller-supplied identifiers
//! - [`WorkOrderRequest`]: encoded request passed through to the ledger untouched
//! - [`WorkOrderResponse`]: decoded structured result of a completed work order
//! - [`ContractResponse`]: status code returned by ledger invocations

pub mod error;
pub mod ids;
pub mod status;
pub mod work_order;

pub use error::TypeError;
pub use ids::{RequesterId, WorkOrderId, WorkerId};
pub use status::ContractResponse;
pub use work_order::{WorkOrderRequest, WorkOrderResponse};
