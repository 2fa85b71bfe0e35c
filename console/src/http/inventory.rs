//! Host group and host API client

use openapi_client::models::{CreateHostRequest, HostGroupInfo, HostInfo};

use crate::errors::ConsoleError;
use crate::http::client::HttpClient;
use crate::http::routes::Routes;

impl HttpClient {
    /// Get all host groups
    pub async fn get_host_groups(&self) -> Result<Vec<HostGroupInfo>, ConsoleError> {
        let groups: Option<Vec<HostGroupInfo>> = self.get(&Routes::host_groups()).await?;
        Ok(groups.unwrap_or_default())
    }

    /// Get the hosts of one group
    pub async fn get_group_hosts(&self, group_id: i64) -> Result<Vec<HostInfo>, ConsoleError> {
        let hosts: Option<Vec<HostInfo>> = self.get(&Routes::group_hosts(group_id)).await?;
        Ok(hosts.unwrap_or_default())
    }

    /// Create one host
    pub async fn create_host(&self, request: &CreateHostRequest) -> Result<HostInfo, ConsoleError> {
        self.post(&Routes::hosts(), request).await
    }
}
