use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::WirelessProfileIds;

// --- Dashboard API types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSettings {
    #[serde(rename = "defaultDestinations", default)]
    pub default_destinations: Option<Value>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionBatchStatus {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub failed: bool,
    #[serde(default)]
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionBatch {
    pub id: String,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default)]
    pub status: ActionBatchStatus,
}

/// One operation inside an action batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAction {
    pub resource: String,
    pub operation: String,
    pub body: Value,
}

impl BatchAction {
    pub fn update(resource: String, body: Value) -> Self {
        Self {
            resource,
            operation: "update".to_string(),
            body,
        }
    }

    pub fn assign_quality(serial: &str, profile_id: &str) -> Self {
        Self::update(
            format!("/devices/{}/camera/qualityAndRetention", serial),
            serde_json::json!(QualityAndRetentionUpdate { profile_id: profile_id.to_string() }),
        )
    }

    pub fn assign_wireless(serial: &str, ids: &WirelessProfileIds) -> Self {
        Self::update(
            format!("/devices/{}/camera/wirelessProfiles", serial),
            serde_json::json!(WirelessProfilesUpdate { ids: ids.clone() }),
        )
    }

    pub fn enable_rtsp(serial: &str) -> Self {
        Self::update(
            format!("/devices/{}/camera/video/settings", serial),
            serde_json::json!(VideoSettingsUpdate { external_rtsp_enabled: true }),
        )
    }
}

// --- Request bodies ---

#[derive(Debug, Serialize)]
pub(crate) struct QualityAndRetentionUpdate {
    #[serde(rename = "profileId")]
    pub profile_id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct WirelessProfilesUpdate {
    pub ids: WirelessProfileIds,
}

#[derive(Debug, Serialize)]
pub(crate) struct VideoSettingsUpdate {
    #[serde(rename = "externalRtspEnabled")]
    pub external_rtsp_enabled: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ActionBatchCreate<'a> {
    pub confirmed: bool,
    pub synchronous: bool,
    pub actions: &'a [BatchAction],
}
