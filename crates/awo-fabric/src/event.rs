use std::fmt;

use serde::{Deserialize, Serialize};

/// A chaincode event delivered by the ledger.
///
/// Consumers decode `payload`; the block number and transaction id say
/// where the event came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Name the chaincode emitted the event under.
    pub event_name: String,
    /// Chaincode that emitted the event.
    pub chaincode: String,
    /// Raw event payload.
    pub payload: Vec<u8>,
    /// Block that committed the emitting transaction.
    pub block_number: u64,
    /// Hex id of the emitting transaction.
    pub tx_id: String,
}

impl LedgerEvent {
    /// Build an event, deriving its transaction id from the content.
    pub fn new(
        event_name: impl Into<String>,
        chaincode: impl Into<String>,
        payload: Vec<u8>,
        block_number: u64,
    ) -> Self {
        let event_name = event_name.into();
        let chaincode = chaincode.into();
        let tx_id = Self::derive_tx_id(&event_name, &chaincode, &payload, block_number);
        Self {
            event_name,
            chaincode,
            payload,
            block_number,
            tx_id,
        }
    }

    /// Short hex representation of the transaction id (first 8 chars).
    pub fn short_tx_id(&self) -> &str {
        let end = self.tx_id.len().min(8);
        &self.tx_id[..end]
    }

    fn derive_tx_id(event_name: &str, chaincode: &str, payload: &[u8], block_number: u64) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"awo-ledger-tx-v1:");
        hasher.update(&block_number.to_le_bytes());
        hasher.update(chaincode.as_bytes());
        hasher.update(b":");
        hasher.update(event_name.as_bytes());
        hasher.update(b":");
        hasher.update(payload);
        hex::encode(hasher.finalize().as_bytes())
    }
}

impl fmt::Display for LedgerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} @{} tx:{}",
            self.chaincode,
            self.event_name,
            self.block_number,
            self.short_tx_id()
        )
    }
}
