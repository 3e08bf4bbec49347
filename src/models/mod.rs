use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Port cameras expose their external RTSP stream on
pub const RTSP_PORT: u16 = 9000;

/// Build the external RTSP URL for a camera LAN address
pub fn rtsp_url(lan_ip: &str) -> String {
    format!("rtsp://{}:{}/live", lan_ip, RTSP_PORT)
}

/// Canonical tag prefixes carried by template profile names
pub mod tag_prefix {
    pub const QUALITY: &str = "qp-";
    pub const WIRELESS: &str = "wp-";
}

/// The two kinds of camera profile synced from the template network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileCategory {
    Quality,
    Wireless,
}

impl ProfileCategory {
    /// Name prefix that marks a profile as template-managed
    pub fn tag_prefix(self) -> &'static str {
        match self {
            Self::Quality => tag_prefix::QUALITY,
            Self::Wireless => tag_prefix::WIRELESS,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Quality => "Quality Profiles",
            Self::Wireless => "Wireless Profiles",
        }
    }

    /// Fields the platform returns but rejects on create/update
    pub fn read_only_fields(self) -> &'static [&'static str] {
        match self {
            Self::Quality => &["id", "networkId", "name"],
            Self::Wireless => &["id", "networkId", "name", "appliedDeviceCount"],
        }
    }
}

impl std::fmt::Display for ProfileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Profile is a named quality-retention or wireless settings bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "string_or_number", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "networkId", default, skip_serializing_if = "Option::is_none")]
    pub network_id: Option<String>,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            network_id: None,
            attributes: Map::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// Settings that may be sent on create/update, minus identity and read-only fields
    pub fn updatable_fields(&self, category: ProfileCategory) -> Map<String, Value> {
        let read_only = category.read_only_fields();
        self.attributes
            .iter()
            .filter(|(k, _)| !read_only.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Profile IDs come back as strings for some categories and numbers for others
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!("invalid profile id: {}", other))),
    }
}

/// Network as returned by the organization network listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Device (camera) as returned by the organization device listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "networkId", default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "lanIp", default)]
    pub lan_ip: Option<String>,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "productType", default)]
    pub product_type: Option<String>,
}

impl Device {
    /// Name to show operators; unnamed cameras fall back to their serial
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.serial,
        }
    }

    pub fn is_on_network(&self, network_id: &str) -> bool {
        self.network_id.as_deref() == Some(network_id)
    }
}

/// Ordered wireless profile IDs for one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirelessProfileIds {
    pub primary: String,
    pub secondary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

/// Quality profile resolved for one camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityAssignment {
    pub profile_id: String,
    pub profile_name: String,
}

/// RTSP enablement for one camera; the URL is known only when the LAN IP is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RtspTarget {
    pub url: Option<String>,
}

/// AssignmentPlan is the resolved per-camera instruction set for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentPlan {
    pub serial: String,
    pub name: String,
    pub quality: Option<QualityAssignment>,
    pub wireless: Option<WirelessProfileIds>,
    pub rtsp: Option<RtspTarget>,
}

impl AssignmentPlan {
    pub fn is_empty(&self) -> bool {
        self.quality.is_none() && self.wireless.is_none() && self.rtsp.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rtsp_url() {
        assert_eq!(rtsp_url("10.0.0.5"), "rtsp://10.0.0.5:9000/live");
    }

    #[test]
    fn test_profile_deserialize_keeps_attributes() {
        let raw = json!({
            "id": "42",
            "networkId": "N_1",
            "name": "qp-lobby",
            "maxRetentionDays": 30,
            "audioRecordingEnabled": false
        });
        let profile: Profile = serde_json::from_value(raw).unwrap();
        assert_eq!(profile.id.as_deref(), Some("42"));
        assert_eq!(profile.network_id.as_deref(), Some("N_1"));
        assert_eq!(profile.attributes.len(), 2);
        assert_eq!(profile.attributes["maxRetentionDays"], json!(30));
    }

    #[test]
    fn test_numeric_profile_id() {
        let profile: Profile = serde_json::from_value(json!({"id": 3, "name": "wp-3-yard"})).unwrap();
        assert_eq!(profile.id.as_deref(), Some("3"));
        assert!(profile.attributes.is_empty());
    }

    #[test]
    fn test_updatable_fields_drops_read_only() {
        let profile = Profile::new("wp-1-office")
            .with_id("7")
            .with_attribute("ssid", json!({"name": "cams"}))
            .with_attribute("appliedDeviceCount", json!(3));

        let fields = profile.updatable_fields(ProfileCategory::Wireless);
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("ssid"));

        // appliedDeviceCount is only read-only for wireless profiles
        let fields = profile.updatable_fields(ProfileCategory::Quality);
        assert!(fields.contains_key("appliedDeviceCount"));
    }

    #[test]
    fn test_device_display_name() {
        let mut device: Device = serde_json::from_value(json!({
            "serial": "Q2AB-CDEF-GHIJ",
            "networkId": "N_1",
            "tags": ["rtsp"],
            "lanIp": "10.0.0.5",
            "model": "MV12"
        }))
        .unwrap();
        assert_eq!(device.display_name(), "Q2AB-CDEF-GHIJ");
        assert!(device.is_on_network("N_1"));

        device.name = Some("Lobby".to_string());
        assert_eq!(device.display_name(), "Lobby");
    }

    #[test]
    fn test_wireless_ids_omit_missing_backup() {
        let ids = WirelessProfileIds {
            primary: "1".to_string(),
            secondary: "2".to_string(),
            backup: None,
        };
        assert_eq!(serde_json::to_value(&ids).unwrap(), json!({"primary": "1", "secondary": "2"}));
    }
}
