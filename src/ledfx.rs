//! LedFx HTTP implementation of the control API.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::control::{ControlApi, DeviceInfo, VirtualInfo};
use crate::error::{ControlError, RegistryError};
use crate::policy::ConnectionConfig;

/// Client for a LedFx instance's REST API.
pub struct LedFxClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct VirtualsResponse {
    #[serde(default)]
    virtuals: HashMap<String, VirtualInfo>,
}

#[derive(Debug, Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: HashMap<String, DeviceInfo>,
}

#[derive(Debug, Deserialize)]
struct SingleVirtualResponse {
    #[serde(default)]
    active: bool,
}

impl LedFxClient {
    /// Build a client with the given per-call timeout.
    pub fn new(connection: &ConnectionConfig, call_timeout: Duration) -> Result<Self, ControlError> {
        let http = reqwest::Client::builder().timeout(call_timeout).build()?;
        Ok(Self {
            base_url: connection.base_url(),
            http,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, RegistryError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RegistryError::Unreachable(e.to_string()))?
            .error_for_status()
            .map_err(|e| RegistryError::Unreachable(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ControlApi for LedFxClient {
    async fn list_virtuals(&self) -> Result<HashMap<String, VirtualInfo>, RegistryError> {
        let response: VirtualsResponse = self.get_json("/api/virtuals").await?;
        Ok(response.virtuals)
    }

    async fn list_devices(&self) -> Result<HashMap<String, DeviceInfo>, RegistryError> {
        let response: DevicesResponse = self.get_json("/api/devices").await?;
        Ok(response.devices)
    }

    async fn virtual_state(&self, id: &str) -> Result<bool, RegistryError> {
        let response: SingleVirtualResponse =
            self.get_json(&format!("/api/virtuals/{id}")).await?;
        Ok(response.active)
    }

    async fn set_virtual_active(&self, id: &str, active: bool) -> Result<(), ControlError> {
        let url = format!("{}/api/virtuals/{id}", self.base_url);
        self.http
            .put(&url)
            .json(&json!({ "active": active }))
            .send()
            .await
            .map_err(|e| ControlError::CallFailed {
                target_id: id.to_string(),
                reason: e.to_string(),
            })?
            .error_for_status()
            .map_err(|e| ControlError::CallFailed {
                target_id: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
