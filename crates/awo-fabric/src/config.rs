use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Connection parameters for a ledger network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Channel hosting the work order chaincode.
    pub channel: String,
    /// Organization the client identity belongs to.
    pub org: String,
    /// Client identity used to sign invocations.
    pub user: String,
    /// Peer the client connects to.
    pub peer: String,
    /// Optional connection profile describing the network.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_path: Option<PathBuf>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channel: "mychannel".into(),
            org: "org1".into(),
            user: "User1".into(),
            peer: "peer0.org1.example.com".into(),
            profile_path: None,
        }
    }
}
