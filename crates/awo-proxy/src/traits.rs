use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use awo_types::{
    ContractResponse, RequesterId, WorkOrderId, WorkOrderRequest, WorkOrderResponse, WorkerId,
};

use crate::error::ProxyResult;

/// A worker's published encryption key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionKey {
    pub worker_id: WorkerId,
    pub encryption_key: String,
    pub encryption_key_nonce: String,
    pub tag: String,
    pub signature: String,
}

/// Optional arguments of an encryption key lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EncryptionKeyQuery {
    pub last_used_key_nonce: Option<String>,
    pub tag: Option<String>,
    pub signature_nonce: Option<String>,
    pub signature: Option<String>,
}

/// Work order operations every ledger backend exposes.
///
/// Submission and completion report a [`ContractResponse`]; local failures
/// like a missing gateway are logged and reported as
/// [`ContractResponse::Error`] without contacting the ledger.
#[async_trait]
pub trait WorkOrderProxy: Send + Sync {
    /// Submit a work order. Returns once the ledger accepts the
    /// transaction, without waiting for it to commit.
    async fn work_order_submit(
        &self,
        work_order_id: &WorkOrderId,
        worker_id: &WorkerId,
        requester_id: &RequesterId,
        request: &WorkOrderRequest,
        request_id: Option<u64>,
    ) -> ContractResponse;

    /// Wait for the result of a submitted work order.
    async fn work_order_get_result(
        &self,
        work_order_id: &WorkOrderId,
        request_id: Option<u64>,
    ) -> ProxyResult<WorkOrderResponse>;

    /// Record a work order's result. Called by the worker side.
    async fn work_order_complete(
        &self,
        work_order_id: &WorkOrderId,
        response: &str,
    ) -> ContractResponse;

    /// Begin setting a worker's encryption key.
    async fn encryption_key_start(&self, tag: &str) -> ProxyResult<()>;

    /// Look up a worker's encryption key.
    async fn encryption_key_get(
        &self,
        worker_id: &WorkerId,
        requester_id: &RequesterId,
        query: EncryptionKeyQuery,
    ) -> ProxyResult<EncryptionKey>;

    /// Publish a worker's encryption key.
    async fn encryption_key_set(
        &self,
        worker_id: &WorkerId,
        encryption_key: &str,
        encryption_nonce: &str,
        tag: &str,
        signature: &str,
    ) -> ProxyResult<ContractResponse>;
}
