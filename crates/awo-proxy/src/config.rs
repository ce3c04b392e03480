use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use awo_fabric::gateway::{ORDER_CHAINCODE, WORK_ORDER_COMPLETED_EVENT, WORK_ORDER_SUBMITTED_EVENT};
use awo_fabric::NetworkConfig;

use crate::error::{ProxyError, ProxyResult};

/// How a completion event is matched to the caller waiting for it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Correlation {
    /// The event's `workOrderId` must equal the awaited id.
    #[default]
    WorkOrderId,
    /// The first well-formed completion event is taken, whatever its id.
    /// For chaincode that does not embed the id in its events.
    FirstEvent,
}

/// Configuration for [`FabricWorkOrderProxy`](crate::FabricWorkOrderProxy).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Chaincode recording work orders.
    pub chaincode: String,
    /// Event emitted when a submission commits.
    pub submitted_event: String,
    /// Event emitted when a completion commits.
    pub completed_event: String,
    /// Upper bound on a result wait, in seconds.
    pub wait_time_secs: u64,
    pub correlation: Correlation,
    pub network: NetworkConfig,
}

impl ProxyConfig {
    pub const DEFAULT_WAIT_TIME_SECS: u64 = 30;

    pub fn wait_time(&self) -> Duration {
        Duration::from_secs(self.wait_time_secs)
    }

    pub fn validate(&self) -> ProxyResult<()> {
        if self.wait_time_secs == 0 {
            return Err(ProxyError::Config("wait_time_secs must be positive".into()));
        }
        for (field, value) in [
            ("chaincode", &self.chaincode),
            ("submitted_event", &self.submitted_event),
            ("completed_event", &self.completed_event),
        ] {
            if value.trim().is_empty() {
                return Err(ProxyError::Config(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Parse and validate a TOML document. Absent keys take their defaults.
    pub fn from_toml_str(s: &str) -> ProxyResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ProxyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ProxyResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ProxyError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> ProxyResult<String> {
        toml::to_string_pretty(self).map_err(|e| ProxyError::Config(e.to_string()))
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            chaincode: ORDER_CHAINCODE.into(),
            submitted_event: WORK_ORDER_SUBMITTED_EVENT.into(),
            completed_event: WORK_ORDER_COMPLETED_EVENT.into(),
            wait_time_secs: Self::DEFAULT_WAIT_TIME_SECS,
            correlation: Correlation::WorkOrderId,
            network: NetworkConfig::default(),
        }
    }
}
