use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Encoded work order request (a JSON-RPC string).
///
/// Its schema belongs to the requester and the worker; the proxy hands it
/// to the ledger byte for byte.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderRequest(String);

impl WorkOrderRequest {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for WorkOrderRequest {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl From<&str> for WorkOrderRequest {
    fn from(encoded: &str) -> Self {
        Self(encoded.to_string())
    }
}

/// Decoded result of a completed work order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkOrderResponse(Value);

impl WorkOrderResponse {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Parse a response from its JSON text form.
    pub fn from_json_str(s: &str) -> Result<Self, TypeError> {
        serde_json::from_str(s)
            .map(Self)
            .map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Compact JSON text form, as pushed to the ledger on completion.
    pub fn to_json_string(&self) -> String {
        self.0.to_string()
    }

    /// `null`, `""`, `{}` and `[]` count as empty.
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for WorkOrderResponse {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for WorkOrderResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
