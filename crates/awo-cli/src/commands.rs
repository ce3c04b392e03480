use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use awo_fabric::{EventCallback, HandlerResult, InMemoryConnector, InMemoryGateway, LedgerEvent};
use awo_proxy::{FabricWorkOrderProxy, ProxyConfig, SubmittedWorkOrder, WorkOrderProxy};
use awo_types::{
    ContractResponse, RequesterId, WorkOrderId, WorkOrderRequest, WorkOrderResponse, WorkerId,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Simulate(args) => cmd_simulate(config, args),
        Command::Config(_) => cmd_config(config),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ProxyConfig> {
    Ok(match path {
        Some(path) => ProxyConfig::load(path)?,
        None => ProxyConfig::default(),
    })
}

fn cmd_config(config: ProxyConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn cmd_simulate(config: ProxyConfig, args: SimulateArgs) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(simulate(config, args))?;
    if report.succeeded < report.orders {
        anyhow::bail!("{} of {} work orders failed", report.orders - report.succeeded, report.orders);
    }
    Ok(())
}

struct SimulationReport {
    orders: usize,
    succeeded: usize,
    completed: usize,
}

async fn simulate(config: ProxyConfig, args: SimulateArgs) -> anyhow::Result<SimulationReport> {
    let commit_delay = Duration::from_millis(args.commit_delay_ms);
    let ledger = Arc::new(InMemoryGateway::new().with_commit_delay(commit_delay));
    let proxy = Arc::new(FabricWorkOrderProxy::new(
        Some(config),
        &InMemoryConnector::new(Arc::clone(&ledger)),
    )?);
    if !proxy.is_initialized() {
        anyhow::bail!("ledger gateway failed to initialize; check the [network] section");
    }

    println!(
        "{} in-memory ledger, chaincode {}, wait {}s",
        "▶".cyan().bold(),
        proxy.config().chaincode.as_str().yellow(),
        proxy.config().wait_time_secs
    );

    // Worker side: pick up submissions from the ledger and complete them.
    let (tx, rx) = mpsc::unbounded_channel::<SubmittedWorkOrder>();
    let callback: EventCallback = Arc::new(move |event: &LedgerEvent| -> HandlerResult {
        tx.send(SubmittedWorkOrder::decode(event)?)?;
        Ok(())
    });
    let mut listener = proxy.get_work_order_submitted_event_handler(callback)?;
    let stopper = listener.stopper();
    let listening = tokio::spawn(async move { listener.start_event_handling().await });
    let worker = tokio::spawn(run_worker(
        Arc::clone(&proxy),
        rx,
        Duration::from_millis(args.worker_delay_ms),
    ));

    // Requester side: submit and wait, all orders at once.
    let worker_id = WorkerId::new("worker-sim")?;
    let requester_id = RequesterId::new("requester-sim")?;
    let mut requests = JoinSet::new();
    for seq in 0..args.orders as u64 {
        let id = WorkOrderId::new(uuid::Uuid::now_v7().simple().to_string())?;
        let proxy = Arc::clone(&proxy);
        let (worker_id, requester_id) = (worker_id.clone(), requester_id.clone());
        requests.spawn(async move {
            let outcome = request_round_trip(&proxy, &id, &worker_id, &requester_id, seq).await;
            (id, outcome)
        });
    }

    let mut succeeded = 0usize;
    while let Some(joined) = requests.join_next().await {
        let (id, outcome) = joined?;
        match outcome {
            Ok(response) => {
                succeeded += 1;
                println!("  {} {} {}", "✓".green().bold(), id.to_string().yellow(), response);
            }
            Err(e) => println!("  {} {} {}", "✗".red().bold(), id.to_string().yellow(), e.to_string().red()),
        }
    }

    stopper.stop_event_handling(commit_delay).await;
    let delivered = listening.await?;
    let completed = worker.await?;

    println!(
        "{} {}/{} results received; worker saw {} submissions, completed {}",
        "■".cyan().bold(),
        succeeded,
        args.orders,
        delivered,
        completed
    );
    println!("  ledger height: {}", ledger.block_height().to_string().bold());
    Ok(SimulationReport {
        orders: args.orders,
        succeeded,
        completed,
    })
}

async fn request_round_trip(
    proxy: &FabricWorkOrderProxy,
    id: &WorkOrderId,
    worker_id: &WorkerId,
    requester_id: &RequesterId,
    seq: u64,
) -> anyhow::Result<WorkOrderResponse> {
    let request = WorkOrderRequest::new(
        json!({
            "jsonrpc": "2.0",
            "method": "WorkOrderSubmit",
            "id": seq,
            "params": {
                "workOrderId": id,
                "inData": [{"index": 0, "data": format!("sample input {seq}")}],
            },
        })
        .to_string(),
    );

    let status = proxy
        .work_order_submit(id, worker_id, requester_id, &request, Some(seq))
        .await;
    if status != ContractResponse::Success {
        anyhow::bail!("submit returned {status}");
    }

    Ok(proxy.work_order_get_result(id, Some(seq)).await?)
}

async fn run_worker(
    proxy: Arc<FabricWorkOrderProxy>,
    mut submissions: mpsc::UnboundedReceiver<SubmittedWorkOrder>,
    delay: Duration,
) -> usize {
    let mut completed = 0;
    while let Some(order) = submissions.recv().await {
        tokio::time::sleep(delay).await;
        let response = WorkOrderResponse::new(json!({
            "jsonrpc": "2.0",
            "result": {
                "workOrderId": order.work_order_id,
                "workerId": order.worker_id,
                "requesterId": order.requester_id,
                "outData": [{"index": 0, "data": format!("processed {} bytes", order.work_order_request.as_str().len())}],
            },
        }));
        let status = proxy
            .work_order_complete(&order.work_order_id, &response.to_json_string())
            .await;
        if status.is_success() {
            completed += 1;
        } else {
            tracing::warn!(work_order_id = %order.work_order_id, "worker failed to complete work order");
        }
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = std::env::temp_dir().join("awo-cli-no-such-dir");
        assert!(load_config(Some(&dir.join("proxy.toml"))).is_err());
    }

    #[test]
    fn no_config_path_uses_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config.wait_time_secs, ProxyConfig::DEFAULT_WAIT_TIME_SECS);
    }

    #[tokio::test]
    async fn simulate_round_trips_every_order() {
        let args = SimulateArgs {
            orders: 4,
            worker_delay_ms: 5,
            commit_delay_ms: 5,
        };
        let report = simulate(ProxyConfig::default(), args).await.unwrap();
        assert_eq!(report.succeeded, 4);
        assert_eq!(report.completed, 4);
    }
}
