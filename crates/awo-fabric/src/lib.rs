//! Ledger gateway for the work order proxy.
//!
//! Defines the contract the proxy needs from a ledger network client:
//! chaincode invocation and event subscription with start/stop control.
//! [`InMemoryGateway`] implements the contract over a simulated `order`
//! chaincode for tests, local demos, and embedding.

pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod handler;
pub mod memory;
pub mod router;

pub use config::NetworkConfig;
pub use error::{FabricError, Result};
pub use event::LedgerEvent;
pub use gateway::{EventCallback, GatewayConnector, HandlerResult, LedgerGateway};
pub use handler::{EventHandler, EventStopper};
pub use memory::{InMemoryConnector, InMemoryGateway, Invocation, StoredWorkOrder};
pub use router::{EventRouter, EventStream, Topic};
