use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use awo_fabric::gateway::{WORK_ORDER_COMPLETE, WORK_ORDER_SUBMIT};
use awo_fabric::{EventCallback, EventHandler, GatewayConnector, LedgerGateway};
use awo_types::{
    ContractResponse, RequesterId, WorkOrderId, WorkOrderRequest, WorkOrderResponse, WorkerId,
};

use crate::config::ProxyConfig;
use crate::error::{ProxyError, ProxyResult};
use crate::traits::{EncryptionKey, EncryptionKeyQuery, WorkOrderProxy};
use crate::waiter::{EventWaiter, ResultSlot};

/// Work order proxy backed by a Fabric-style ledger gateway.
///
/// Results come from `workOrderCompleted` events rather than a query: a
/// submitted transaction is not readable until it commits.
pub struct FabricWorkOrderProxy {
    config: ProxyConfig,
    gateway: Option<Arc<dyn LedgerGateway>>,
}

impl FabricWorkOrderProxy {
    /// Build a proxy, connecting through `connector`.
    ///
    /// Fails only when `config` is absent or invalid. A connection failure
    /// is logged and leaves the proxy uninitialized: every operation then
    /// reports an error without reaching the ledger.
    pub fn new(config: Option<ProxyConfig>, connector: &dyn GatewayConnector) -> ProxyResult<Self> {
        let config = config.ok_or(ProxyError::MissingConfig)?;
        config.validate()?;

        let gateway = match connector.connect(&config.network) {
            Ok(gateway) => {
                info!(channel = %config.network.channel, chaincode = %config.chaincode, "work order proxy connected");
                Some(gateway)
            }
            Err(e) => {
                error!(error = %e, "failed to initialize ledger gateway");
                None
            }
        };

        Ok(Self { config, gateway })
    }

    /// Build a proxy over an already-connected gateway.
    pub fn with_gateway(config: ProxyConfig, gateway: Arc<dyn LedgerGateway>) -> ProxyResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            gateway: Some(gateway),
        })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.gateway.is_some()
    }

    /// Subscribe `callback` to `workOrderSubmitted` events.
    pub fn get_work_order_submitted_event_handler(
        &self,
        callback: EventCallback,
    ) -> ProxyResult<EventHandler> {
        self.event_handler(&self.config.submitted_event, callback)
    }

    /// Subscribe `callback` to `workOrderCompleted` events.
    pub fn get_work_order_completed_event_handler(
        &self,
        callback: EventCallback,
    ) -> ProxyResult<EventHandler> {
        self.event_handler(&self.config.completed_event, callback)
    }

    /// [`work_order_get_result`](WorkOrderProxy::work_order_get_result) for
    /// synchronous callers. Runs the wait on a private single-threaded
    /// runtime that is torn down afterwards. Fails with
    /// [`ProxyError::BlockingInRuntime`] when called from inside a tokio
    /// runtime.
    pub fn work_order_get_result_blocking(
        &self,
        work_order_id: &WorkOrderId,
        request_id: Option<u64>,
    ) -> ProxyResult<WorkOrderResponse> {
        if tokio::runtime::Handle::try_current().is_ok() {
            error!(%work_order_id, "blocking get-result called from an async context");
            return Err(ProxyError::BlockingInRuntime);
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.work_order_get_result(work_order_id, request_id))
    }

    fn gateway(&self) -> ProxyResult<&Arc<dyn LedgerGateway>> {
        self.gateway.as_ref().ok_or_else(|| {
            error!("ledger gateway is not initialized");
            ProxyError::NotInitialized
        })
    }

    fn event_handler(&self, event_name: &str, callback: EventCallback) -> ProxyResult<EventHandler> {
        let gateway = self.gateway()?;
        let handler = gateway.event_handler(event_name, &self.config.chaincode, callback)?;
        Ok(handler)
    }

    fn unsupported(operation: &'static str) -> ProxyError {
        error!(operation, "this API is not supported by the fabric backend");
        ProxyError::Unsupported(operation)
    }
}

#[async_trait]
impl WorkOrderProxy for FabricWorkOrderProxy {
    async fn work_order_submit(
        &self,
        work_order_id: &WorkOrderId,
        worker_id: &WorkerId,
        requester_id: &RequesterId,
        request: &WorkOrderRequest,
        request_id: Option<u64>,
    ) -> ContractResponse {
        let Ok(gateway) = self.gateway() else {
            return ContractResponse::Error;
        };

        let params = vec![
            work_order_id.to_string(),
            worker_id.to_string(),
            requester_id.to_string(),
            request.as_str().to_string(),
        ];
        let status = gateway
            .invoke_chaincode(&self.config.chaincode, WORK_ORDER_SUBMIT, params)
            .await;
        debug!(%work_order_id, ?request_id, %status, code = status.code(), "work order submitted");
        status
    }

    async fn work_order_get_result(
        &self,
        work_order_id: &WorkOrderId,
        request_id: Option<u64>,
    ) -> ProxyResult<WorkOrderResponse> {
        let (slot, receiver) = ResultSlot::new(work_order_id.clone(), self.config.correlation);
        let handler = match self.get_work_order_completed_event_handler(slot.callback()) {
            Ok(handler) => handler,
            Err(e) => {
                info!(%work_order_id, error = %e, "failed while creating event handler");
                return Err(e);
            }
        };

        debug!(
            %work_order_id,
            ?request_id,
            wait_secs = self.config.wait_time_secs,
            "waiting for work order result"
        );
        EventWaiter::new(self.config.wait_time())
            .wait(handler, &slot, receiver)
            .await
    }

    async fn work_order_complete(
        &self,
        work_order_id: &WorkOrderId,
        response: &str,
    ) -> ContractResponse {
        let Ok(gateway) = self.gateway() else {
            return ContractResponse::Error;
        };
        if response.trim().is_empty() {
            warn!(%work_order_id, "work order response is empty");
            return ContractResponse::Error;
        }

        let params = vec![work_order_id.to_string(), response.to_string()];
        let status = gateway
            .invoke_chaincode(&self.config.chaincode, WORK_ORDER_COMPLETE, params)
            .await;
        debug!(%work_order_id, %status, code = status.code(), "work order completed");
        status
    }

    async fn encryption_key_start(&self, _tag: &str) -> ProxyResult<()> {
        Err(Self::unsupported("encryption_key_start"))
    }

    async fn encryption_key_get(
        &self,
        _worker_id: &WorkerId,
        _requester_id: &RequesterId,
        _query: EncryptionKeyQuery,
    ) -> ProxyResult<EncryptionKey> {
        Err(Self::unsupported("encryption_key_get"))
    }

    async fn encryption_key_set(
        &self,
        _worker_id: &WorkerId,
        _encryption_key: &str,
        _encryption_nonce: &str,
        _tag: &str,
        _signature: &str,
    ) -> ProxyResult<ContractResponse> {
        Err(Self::unsupported("encryption_key_set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;

    use awo_fabric::gateway::WORK_ORDER_COMPLETED_EVENT;
    use awo_fabric::{HandlerResult, InMemoryConnector, InMemoryGateway, Invocation, LedgerEvent};

    use crate::config::Correlation;
    use crate::decode::SubmittedWorkOrder;
    use crate::error::DecodeError;

    fn wo(s: &str) -> WorkOrderId {
        WorkOrderId::new(s).unwrap()
    }

    fn proxy_over(gateway: &Arc<InMemoryGateway>) -> FabricWorkOrderProxy {
        proxy_with_config(gateway, ProxyConfig::default())
    }

    fn proxy_with_config(gateway: &Arc<InMemoryGateway>, config: ProxyConfig) -> FabricWorkOrderProxy {
        FabricWorkOrderProxy::new(Some(config), &InMemoryConnector::new(Arc::clone(gateway))).unwrap()
    }

    fn uninitialized_proxy(gateway: &Arc<InMemoryGateway>) -> FabricWorkOrderProxy {
        let mut config = ProxyConfig::default();
        config.network.channel = String::new();
        let proxy = proxy_with_config(gateway, config);
        assert!(!proxy.is_initialized());
        proxy
    }

    async fn submit(proxy: &FabricWorkOrderProxy, id: &str) -> ContractResponse {
        proxy
            .work_order_submit(
                &wo(id),
                &WorkerId::new("worker-1").unwrap(),
                &RequesterId::new("requester-1").unwrap(),
                &WorkOrderRequest::new(r#"{"jsonrpc": "2.0", "id": 7}"#),
                Some(7),
            )
            .await
    }

    /// Complete `id` on the ledger after `delay`, from another task.
    fn complete_later(gateway: &Arc<InMemoryGateway>, id: &str, response: &str, delay: Duration) {
        let gateway = Arc::clone(gateway);
        let id = id.to_string();
        let response = response.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            gateway
                .invoke_chaincode("order", WORK_ORDER_COMPLETE, vec![id, response])
                .await;
        });
    }

    #[tokio::test]
    async fn submit_forwards_params_in_order() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);

        assert_eq!(submit(&proxy, "ab12").await, ContractResponse::Success);
        assert_eq!(
            gateway.invocations(),
            vec![Invocation {
                chaincode: "order".into(),
                function: "workOrderSubmit".into(),
                params: vec![
                    "ab12".into(),
                    "worker-1".into(),
                    "requester-1".into(),
                    r#"{"jsonrpc": "2.0", "id": 7}"#.into(),
                ],
            }]
        );
    }

    #[tokio::test]
    async fn submit_returns_gateway_status_unchanged() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        gateway.fail_invocations(1);

        assert_eq!(submit(&proxy, "ab12").await, ContractResponse::Error);
        assert_eq!(gateway.invocations().len(), 1);
    }

    #[tokio::test]
    async fn complete_with_empty_response_never_invokes() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);

        assert_eq!(proxy.work_order_complete(&wo("ab12"), "").await, ContractResponse::Error);
        assert_eq!(proxy.work_order_complete(&wo("ab12"), "  \n").await, ContractResponse::Error);
        assert!(gateway.invocations().is_empty());
    }

    #[tokio::test]
    async fn complete_forwards_id_and_response() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        submit(&proxy, "ab12").await;

        let status = proxy.work_order_complete(&wo("ab12"), r#"{"result": 42}"#).await;
        assert_eq!(status, ContractResponse::Success);

        let invocations = gateway.invocations();
        assert_eq!(invocations.len(), 2);
        assert_eq!(invocations[1].function, "workOrderComplete");
        assert_eq!(invocations[1].params, vec!["ab12".to_string(), r#"{"result": 42}"#.to_string()]);
    }

    #[tokio::test]
    async fn complete_reports_ledger_rejection() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);

        // Never submitted, so the chaincode rejects it.
        let status = proxy.work_order_complete(&wo("ab12"), r#"{"result": 42}"#).await;
        assert_eq!(status, ContractResponse::Error);
        assert_eq!(gateway.invocations().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn get_result_returns_decoded_response() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        submit(&proxy, "ab12").await;
        complete_later(&gateway, "ab12", r#"{"result": {"outData": "heart ok"}}"#, Duration::from_millis(500));

        let started = tokio::time::Instant::now();
        let response = proxy.work_order_get_result(&wo("ab12"), None).await.unwrap();

        assert_eq!(response.value()["result"]["outData"], "heart ok");
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn get_result_is_bounded_by_wait_time() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);

        let started = tokio::time::Instant::now();
        let err = proxy.work_order_get_result(&wo("ab12"), Some(3)).await.unwrap_err();

        assert!(matches!(err, ProxyError::Timeout { .. }));
        assert!(started.elapsed() >= Duration::from_secs(30));
        assert!(started.elapsed() < Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_timeouts_never_return_stale_results() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        submit(&proxy, "ab12").await;
        complete_later(&gateway, "ab12", r#"{"result": 1}"#, Duration::from_millis(10));
        assert!(proxy.work_order_get_result(&wo("ab12"), None).await.is_ok());

        for _ in 0..2 {
            let err = proxy.work_order_get_result(&wo("ab12"), None).await.unwrap_err();
            match err {
                ProxyError::Timeout { work_order_id, .. } => assert_eq!(work_order_id, wo("ab12")),
                other => panic!("expected timeout, got {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_waits_receive_their_own_results() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        submit(&proxy, "wo-a").await;
        submit(&proxy, "wo-b").await;

        // wo-b completes first; wo-a's waiter must not take it.
        complete_later(&gateway, "wo-b", r#"{"owner": "b"}"#, Duration::from_millis(100));
        complete_later(&gateway, "wo-a", r#"{"owner": "a"}"#, Duration::from_millis(200));

        let (id_a, id_b) = (wo("wo-a"), wo("wo-b"));
        let (a, b) = tokio::join!(
            proxy.work_order_get_result(&id_a, None),
            proxy.work_order_get_result(&id_b, None),
        );
        assert_eq!(a.unwrap().value(), &json!({"owner": "a"}));
        assert_eq!(b.unwrap().value(), &json!({"owner": "b"}));
    }

    #[tokio::test(start_paused = true)]
    async fn waiters_on_the_same_order_all_resolve() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        submit(&proxy, "ab12").await;
        complete_later(&gateway, "ab12", r#"{"result": 5}"#, Duration::from_millis(50));

        let id = wo("ab12");
        let (first, second) = tokio::join!(
            proxy.work_order_get_result(&id, None),
            proxy.work_order_get_result(&id, None),
        );
        assert_eq!(first.unwrap(), second.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_payload_does_not_end_the_wait() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        submit(&proxy, "ab12").await;

        let injector = Arc::clone(&gateway);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            injector.publish_raw(WORK_ORDER_COMPLETED_EVENT, b"\xff not json".to_vec());
        });
        complete_later(&gateway, "ab12", r#"{"result": "fine"}"#, Duration::from_millis(20));

        let response = proxy.work_order_get_result(&wo("ab12"), None).await.unwrap();
        assert_eq!(response.value()["result"], "fine");
    }

    #[tokio::test(start_paused = true)]
    async fn bad_response_for_awaited_order_is_a_decode_error() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        submit(&proxy, "ab12").await;
        complete_later(&gateway, "ab12", "<html>not json</html>", Duration::from_millis(10));

        let err = proxy.work_order_get_result(&wo("ab12"), None).await.unwrap_err();
        assert!(matches!(err, ProxyError::Decode(DecodeError::InnerResponse(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn first_event_correlation_accepts_events_without_id() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_with_config(
            &gateway,
            ProxyConfig {
                correlation: Correlation::FirstEvent,
                ..Default::default()
            },
        );

        let injector = Arc::clone(&gateway);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let payload = json!({"workOrderResponse": "{\"result\": \"anon\"}"});
            injector.publish_raw(WORK_ORDER_COMPLETED_EVENT, payload.to_string().into_bytes());
        });

        let response = proxy.work_order_get_result(&wo("ab12"), None).await.unwrap();
        assert_eq!(response.value()["result"], "anon");
    }

    #[tokio::test(start_paused = true)]
    async fn configured_wait_time_is_honoured() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_with_config(
            &gateway,
            ProxyConfig {
                wait_time_secs: 2,
                ..Default::default()
            },
        );

        let started = tokio::time::Instant::now();
        let err = proxy.work_order_get_result(&wo("ab12"), None).await.unwrap_err();
        assert!(matches!(err, ProxyError::Timeout { waited, .. } if waited == Duration::from_secs(2)));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn encryption_key_operations_are_unsupported() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);
        let worker = WorkerId::new("worker-1").unwrap();
        let requester = RequesterId::new("requester-1").unwrap();

        assert!(matches!(
            proxy.encryption_key_start("tag").await,
            Err(ProxyError::Unsupported("encryption_key_start"))
        ));
        assert!(matches!(
            proxy
                .encryption_key_get(&worker, &requester, EncryptionKeyQuery::default())
                .await,
            Err(ProxyError::Unsupported("encryption_key_get"))
        ));
        assert!(matches!(
            proxy.encryption_key_set(&worker, "key", "nonce", "tag", "sig").await,
            Err(ProxyError::Unsupported("encryption_key_set"))
        ));
        assert!(gateway.invocations().is_empty());
        assert_eq!(gateway.subscriber_count(), 0);
    }

    #[test]
    fn missing_config_fails_construction() {
        let connector = InMemoryConnector::new(Arc::new(InMemoryGateway::new()));
        assert!(matches!(
            FabricWorkOrderProxy::new(None, &connector),
            Err(ProxyError::MissingConfig)
        ));
    }

    #[test]
    fn invalid_config_fails_construction() {
        let connector = InMemoryConnector::new(Arc::new(InMemoryGateway::new()));
        let config = ProxyConfig {
            wait_time_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            FabricWorkOrderProxy::new(Some(config), &connector),
            Err(ProxyError::Config(_))
        ));
    }

    #[tokio::test]
    async fn with_gateway_builds_an_initialized_proxy() {
        let gateway = Arc::new(InMemoryGateway::new());
        let shared: Arc<dyn LedgerGateway> = gateway.clone();
        let proxy = FabricWorkOrderProxy::with_gateway(ProxyConfig::default(), shared).unwrap();

        assert!(proxy.is_initialized());
        assert_eq!(submit(&proxy, "ab12").await, ContractResponse::Success);
        assert!(gateway.work_order("ab12").is_some());
    }

    #[test]
    fn with_gateway_rejects_invalid_config() {
        let shared: Arc<dyn LedgerGateway> = Arc::new(InMemoryGateway::new());
        let config = ProxyConfig {
            completed_event: " ".into(),
            ..Default::default()
        };
        assert!(matches!(
            FabricWorkOrderProxy::with_gateway(config, shared),
            Err(ProxyError::Config(_))
        ));
    }

    #[tokio::test]
    async fn uninitialized_gateway_reports_errors_without_ledger_calls() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = uninitialized_proxy(&gateway);

        assert_eq!(submit(&proxy, "ab12").await, ContractResponse::Error);
        assert_eq!(
            proxy.work_order_complete(&wo("ab12"), r#"{"result": 1}"#).await,
            ContractResponse::Error
        );
        assert!(matches!(
            proxy.work_order_get_result(&wo("ab12"), None).await,
            Err(ProxyError::NotInitialized)
        ));

        let noop = || -> EventCallback { Arc::new(|_: &LedgerEvent| -> HandlerResult { Ok(()) }) };
        assert!(matches!(
            proxy.get_work_order_submitted_event_handler(noop()),
            Err(ProxyError::NotInitialized)
        ));
        assert!(matches!(
            proxy.get_work_order_completed_event_handler(noop()),
            Err(ProxyError::NotInitialized)
        ));

        assert!(gateway.invocations().is_empty());
        assert_eq!(gateway.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn submitted_event_handler_sees_submissions() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: EventCallback = Arc::new(move |event: &LedgerEvent| -> HandlerResult {
            sink.lock().unwrap().push(SubmittedWorkOrder::decode(event)?);
            Ok(())
        });
        let mut handler = proxy.get_work_order_submitted_event_handler(callback).unwrap();
        assert_eq!(handler.event_name(), "workOrderSubmitted");
        assert_eq!(handler.chaincode(), "order");

        submit(&proxy, "ab12").await;
        let stopper = handler.stopper();
        let (delivered, ()) = tokio::join!(
            handler.start_event_handling(),
            stopper.stop_event_handling(Duration::from_millis(20)),
        );

        assert_eq!(delivered, 1);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].work_order_id, wo("ab12"));
        assert_eq!(seen[0].requester_id.as_str(), "requester-1");
    }

    #[test]
    fn blocking_result_uses_a_private_runtime() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);

        let worker_gateway = Arc::clone(&gateway);
        let worker = std::thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let params = vec!["ab12".into(), "w".into(), "r".into(), "{}".into()];
                worker_gateway.invoke_chaincode("order", WORK_ORDER_SUBMIT, params).await;
                while worker_gateway.subscriber_count() == 0 {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                worker_gateway
                    .invoke_chaincode(
                        "order",
                        WORK_ORDER_COMPLETE,
                        vec!["ab12".into(), r#"{"result": "sync"}"#.into()],
                    )
                    .await;
            });
        });

        let response = proxy.work_order_get_result_blocking(&wo("ab12"), Some(1)).unwrap();
        worker.join().unwrap();
        assert_eq!(response.value()["result"], "sync");
    }

    #[tokio::test]
    async fn blocking_result_inside_a_runtime_is_an_error() {
        let gateway = Arc::new(InMemoryGateway::new());
        let proxy = proxy_over(&gateway);

        assert!(matches!(
            proxy.work_order_get_result_blocking(&wo("ab12"), None),
            Err(ProxyError::BlockingInRuntime)
        ));
        assert_eq!(gateway.subscriber_count(), 0);
    }
}
