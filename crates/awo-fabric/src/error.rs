/// Errors produced by the ledger gateway.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    /// Network configuration rejected by the connector.
    #[error("invalid network config: {0}")]
    InvalidConfig(String),

    /// The gateway could not reach the ledger network.
    #[error("not connected to ledger network: {0}")]
    NotConnected(String),

    /// No such function on the chaincode.
    #[error("unknown function {function} on chaincode {chaincode}")]
    UnknownFunction { chaincode: String, function: String },

    /// Invocation parameter count does not match the function.
    #[error("{function} expects {expected} params, got {actual}")]
    InvalidParams {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// The work order is not recorded on the ledger.
    #[error("work order not found: {0}")]
    UnknownWorkOrder(String),

    /// A work order with this id was already submitted.
    #[error("work order already exists: {0}")]
    DuplicateWorkOrder(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the fabric crate.
pub type Result<T> = std::result::Result<T, FabricError>;
