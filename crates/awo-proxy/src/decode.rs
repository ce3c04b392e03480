use serde::Deserialize;

use awo_fabric::LedgerEvent;
use awo_types::{RequesterId, WorkOrderId, WorkOrderRequest, WorkOrderResponse, WorkerId};

use crate::error::DecodeError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompletionEnvelope {
    #[serde(default)]
    work_order_id: Option<String>,
    work_order_response: String,
}

/// Outer layer of a `workOrderCompleted` event.
///
/// The envelope carries the response as an encoded JSON string, so
/// decoding happens in two steps: [`decode`](Self::decode) reads the
/// envelope, [`response`](Self::response) parses the embedded string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionEvent {
    /// Work order the event reports on, when the chaincode includes it.
    pub work_order_id: Option<WorkOrderId>,
    raw_response: String,
}

impl CompletionEvent {
    pub fn decode(event: &LedgerEvent) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(&event.payload)?;
        let envelope: CompletionEnvelope =
            serde_json::from_str(text).map_err(|e| DecodeError::Envelope(e.to_string()))?;
        Ok(Self {
            work_order_id: envelope
                .work_order_id
                .and_then(|id| WorkOrderId::new(id).ok()),
            raw_response: envelope.work_order_response,
        })
    }

    /// The embedded response string, undecoded.
    pub fn raw_response(&self) -> &str {
        &self.raw_response
    }

    /// Parse the embedded response. Blank text, and anything
    /// [`WorkOrderResponse::is_empty`] rejects, is empty.
    pub fn response(&self) -> Result<WorkOrderResponse, DecodeError> {
        if self.raw_response.trim().is_empty() {
            return Err(DecodeError::EmptyResponse);
        }
        let response = WorkOrderResponse::from_json_str(&self.raw_response)
            .map_err(|e| DecodeError::InnerResponse(e.to_string()))?;
        if response.is_empty() {
            return Err(DecodeError::EmptyResponse);
        }
        Ok(response)
    }
}

/// Payload of a `workOrderSubmitted` event, as consumed by workers.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedWorkOrder {
    pub work_order_id: WorkOrderId,
    pub worker_id: WorkerId,
    pub requester_id: RequesterId,
    pub work_order_request: WorkOrderRequest,
}

impl SubmittedWorkOrder {
    pub fn decode(event: &LedgerEvent) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(&event.payload)?;
        serde_json::from_str(text).map_err(|e| DecodeError::Envelope(e.to_string()))
    }
}
