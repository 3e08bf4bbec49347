//! In-memory dashboard used by unit tests.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use super::types::{ActionBatch, ActionBatchStatus, AlertSettings, BatchAction};
use super::DashboardApi;
use crate::models::{Device, Network, Profile, ProfileCategory, WirelessProfileIds};

/// A write (or batch poll) seen by the fake
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProfile { network_id: String, category: ProfileCategory, name: String },
    UpdateProfile { network_id: String, category: ProfileCategory, profile_id: String },
    AssignQuality { serial: String, profile_id: String },
    AssignWireless { serial: String, ids: WirelessProfileIds },
    EnableRtsp { serial: String },
    ListPendingBatches,
    CreateActionBatch { actions: usize, confirmed: bool, synchronous: bool },
}

#[derive(Default)]
struct State {
    devices: Vec<Device>,
    networks: Vec<Network>,
    profiles: HashMap<(String, ProfileCategory), Vec<Profile>>,
    alerts: HashMap<String, AlertSettings>,
    pending_batches: VecDeque<usize>,
    failing: HashSet<String>,
    calls: Vec<Call>,
    next_id: usize,
}

#[derive(Default)]
pub struct FakeDashboard {
    state: Mutex<State>,
}

impl FakeDashboard {
    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_network(&self, id: &str, tags: &[&str]) {
        self.with_state(|s| {
            s.networks.push(Network {
                id: id.to_string(),
                name: format!("Network {}", id),
                tags: tags.iter().map(|t| t.to_string()).collect(),
            })
        });
    }

    pub fn add_camera(&self, serial: &str, network_id: &str, tags: &[&str], lan_ip: Option<&str>) {
        self.with_state(|s| {
            s.devices.push(Device {
                serial: serial.to_string(),
                name: None,
                network_id: Some(network_id.to_string()),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                lan_ip: lan_ip.map(|ip| ip.to_string()),
                model: "MV12".to_string(),
                product_type: Some("camera".to_string()),
            })
        });
    }

    pub fn add_profile(&self, network_id: &str, category: ProfileCategory, profile: Profile) {
        self.with_state(|s| {
            s.profiles
                .entry((network_id.to_string(), category))
                .or_default()
                .push(profile)
        });
    }

    pub fn set_alerts(&self, network_id: &str, settings: AlertSettings) {
        self.with_state(|s| {
            s.alerts.insert(network_id.to_string(), settings);
        });
    }

    pub fn profiles(&self, network_id: &str, category: ProfileCategory) -> Vec<Profile> {
        self.with_state(|s| {
            s.profiles
                .get(&(network_id.to_string(), category))
                .cloned()
                .unwrap_or_default()
        })
    }

    /// Pending batch counts returned by successive polls; empty means zero
    pub fn queue_pending_batches(&self, counts: &[usize]) {
        self.with_state(|s| s.pending_batches.extend(counts.iter().copied()));
    }

    /// Make every call whose operation key matches fail, e.g. `list_profiles:N_2`
    pub fn fail(&self, key: &str) {
        self.with_state(|s| {
            s.failing.insert(key.to_string());
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|s| s.calls.clone())
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.with_state(|s| s.failing.contains(key)) {
            return Err(anyhow::anyhow!("injected failure: {}", key));
        }
        Ok(())
    }

    fn record(&self, call: Call) {
        self.with_state(|s| s.calls.push(call));
    }
}

#[async_trait]
impl DashboardApi for FakeDashboard {
    async fn list_organization_devices(
        &self,
        _org_id: &str,
        tags: &[String],
        product_type: &str,
    ) -> Result<Vec<Device>> {
        self.check("list_devices")?;
        Ok(self.with_state(|s| {
            s.devices
                .iter()
                .filter(|d| d.product_type.as_deref() == Some(product_type))
                .filter(|d| tags.iter().any(|t| d.tags.contains(t)))
                .cloned()
                .collect()
        }))
    }

    async fn list_organization_networks(&self, _org_id: &str, tags: &[String]) -> Result<Vec<Network>> {
        self.check("list_networks")?;
        Ok(self.with_state(|s| {
            s.networks
                .iter()
                .filter(|n| tags.iter().any(|t| n.tags.contains(t)))
                .cloned()
                .collect()
        }))
    }

    async fn list_profiles(&self, network_id: &str, category: ProfileCategory) -> Result<Vec<Profile>> {
        self.check(&format!("list_profiles:{}", network_id))?;
        Ok(self.profiles(network_id, category))
    }

    async fn get_alert_settings(&self, network_id: &str) -> Result<AlertSettings> {
        self.check(&format!("alerts:{}", network_id))?;
        Ok(self.with_state(|s| s.alerts.get(network_id).cloned().unwrap_or_default()))
    }

    async fn create_profile(
        &self,
        network_id: &str,
        category: ProfileCategory,
        name: &str,
        attributes: &Map<String, Value>,
    ) -> Result<Profile> {
        self.record(Call::CreateProfile {
            network_id: network_id.to_string(),
            category,
            name: name.to_string(),
        });
        self.check(&format!("create_profile:{}", name))?;

        let profile = self.with_state(|s| {
            s.next_id += 1;
            let profile = Profile {
                id: Some(format!("new-{}", s.next_id)),
                name: name.to_string(),
                network_id: Some(network_id.to_string()),
                attributes: attributes.clone(),
            };
            s.profiles
                .entry((network_id.to_string(), category))
                .or_default()
                .push(profile.clone());
            profile
        });
        Ok(profile)
    }

    async fn update_profile(
        &self,
        network_id: &str,
        category: ProfileCategory,
        profile_id: &str,
        attributes: &Map<String, Value>,
    ) -> Result<Profile> {
        self.record(Call::UpdateProfile {
            network_id: network_id.to_string(),
            category,
            profile_id: profile_id.to_string(),
        });
        self.check(&format!("update_profile:{}", profile_id))?;

        self.with_state(|s| {
            let profiles = s
                .profiles
                .get_mut(&(network_id.to_string(), category))
                .ok_or_else(|| anyhow::anyhow!("no profiles on {}", network_id))?;
            let profile = profiles
                .iter_mut()
                .find(|p| p.id.as_deref() == Some(profile_id))
                .ok_or_else(|| anyhow::anyhow!("profile {} not found", profile_id))?;
            profile.attributes = attributes.clone();
            Ok(profile.clone())
        })
    }

    async fn assign_quality_profile(&self, serial: &str, profile_id: &str) -> Result<()> {
        self.record(Call::AssignQuality {
            serial: serial.to_string(),
            profile_id: profile_id.to_string(),
        });
        self.check(&format!("assign_quality:{}", serial))
    }

    async fn assign_wireless_profiles(&self, serial: &str, ids: &WirelessProfileIds) -> Result<()> {
        self.record(Call::AssignWireless {
            serial: serial.to_string(),
            ids: ids.clone(),
        });
        self.check(&format!("assign_wireless:{}", serial))
    }

    async fn enable_rtsp(&self, serial: &str) -> Result<()> {
        self.record(Call::EnableRtsp {
            serial: serial.to_string(),
        });
        self.check(&format!("enable_rtsp:{}", serial))
    }

    async fn list_pending_action_batches(&self, _org_id: &str) -> Result<Vec<ActionBatch>> {
        self.record(Call::ListPendingBatches);
        let count = self.with_state(|s| s.pending_batches.pop_front().unwrap_or(0));
        Ok((0..count)
            .map(|i| ActionBatch {
                id: format!("pending-{}", i),
                confirmed: true,
                status: ActionBatchStatus::default(),
            })
            .collect())
    }

    async fn create_action_batch(
        &self,
        _org_id: &str,
        actions: &[BatchAction],
        confirmed: bool,
        synchronous: bool,
    ) -> Result<ActionBatch> {
        self.record(Call::CreateActionBatch {
            actions: actions.len(),
            confirmed,
            synchronous,
        });
        let id = self.with_state(|s| {
            s.next_id += 1;
            format!("batch-{}", s.next_id)
        });
        Ok(ActionBatch {
            id,
            confirmed,
            status: ActionBatchStatus::default(),
        })
    }
}
