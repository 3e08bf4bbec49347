pub mod client;
#[cfg(test)]
pub mod fake;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::models::{Device, Network, Profile, ProfileCategory, WirelessProfileIds};

pub use client::DashboardClient;
pub use types::{ActionBatch, AlertSettings, BatchAction};

/// Product type the device listing is restricted to
pub const CAMERA_PRODUCT_TYPE: &str = "camera";

/// Operations the sync needs from the cloud dashboard
#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_organization_devices(
        &self,
        org_id: &str,
        tags: &[String],
        product_type: &str,
    ) -> Result<Vec<Device>>;

    async fn list_organization_networks(&self, org_id: &str, tags: &[String]) -> Result<Vec<Network>>;

    async fn list_profiles(&self, network_id: &str, category: ProfileCategory) -> Result<Vec<Profile>>;

    async fn get_alert_settings(&self, network_id: &str) -> Result<AlertSettings>;

    async fn create_profile(
        &self,
        network_id: &str,
        category: ProfileCategory,
        name: &str,
        attributes: &Map<String, Value>,
    ) -> Result<Profile>;

    async fn update_profile(
        &self,
        network_id: &str,
        category: ProfileCategory,
        profile_id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<Profile>;

    async fn assign_quality_profile(&self, serial: &str, profile_id: &str) -> Result<()>;

    async fn assign_wireless_profiles(&self, serial: &str, ids: &WirelessProfileIds) -> Result<()>;

    async fn enable_rtsp(&self, serial: &str) -> Result<()>;

    async fn list_pending_action_batches(&self, org_id: &str) -> Result<Vec<ActionBatch>>;

    async fn create_action_batch(
        &self,
        org_id: &str,
        actions: &[BatchAction],
        confirmed: bool,
        synchronous: bool,
    ) -> Result<ActionBatch>;
}
