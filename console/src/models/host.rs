//! Host and host group models

use openapi_client::models::{HostGroupInfo, HostInfo};
use serde::{Deserialize, Serialize};

/// Host identifier
pub type HostId = i64;

/// A remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: HostId,
    pub address: String,
    pub port: u16,

    /// Opaque reference to the credentials held by the backend
    pub credential_ref: Option<String>,

    pub os_label: Option<String>,
}

impl From<HostInfo> for Host {
    fn from(info: HostInfo) -> Self {
        Self {
            id: info.id,
            address: info.ip,
            port: info.port.unwrap_or(22),
            credential_ref: info.username,
            os_label: info.os_label,
        }
    }
}

/// A named set of hosts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostGroup {
    pub id: i64,
    pub name: String,
    pub hosts: Vec<Host>,
}

impl HostGroup {
    pub fn from_info(info: HostGroupInfo, hosts: Vec<Host>) -> Self {
        Self {
            id: info.id,
            name: info.name,
            hosts,
        }
    }
}
