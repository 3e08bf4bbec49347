pub mod diff;
pub mod plan;

use anyhow::Result;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::batch::{ActionBatcher, BatchSettings};
use crate::config::{module, Config};
use crate::confirm::Confirm;
use crate::dashboard::{AlertSettings, BatchAction, DashboardApi, CAMERA_PRODUCT_TYPE};
use crate::models::{Device, Network, Profile, ProfileCategory};
use crate::tags::{classify_tag, TagIntent};
use crate::utils::{compact_json, render_table};

use self::diff::{diff_profiles, ProfileDiff};
use self::plan::{plan_network, AssignmentCategory, Diagnostic, NetworkCatalogs, NetworkPlan, ProfileCatalog};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("operator declined {0} changes on network {1}; skipping profile configuration can conflict with camera configuration, aborting run")]
    OperatorAbort(ProfileCategory, String),
}

// --- Read phase ---

/// Template network state the targets are reconciled against
#[derive(Debug, Clone, Default)]
pub struct TemplateData {
    pub quality: Vec<Profile>,
    pub wireless: Vec<Profile>,
    pub alerts: Option<AlertSettings>,
}

impl TemplateData {
    pub fn profiles(&self, category: ProfileCategory) -> &[Profile] {
        match category {
            ProfileCategory::Quality => &self.quality,
            ProfileCategory::Wireless => &self.wireless,
        }
    }
}

/// One target network with its template-managed profiles and eligible cameras
#[derive(Debug, Clone)]
pub struct TargetNetwork {
    pub network: Network,
    pub quality: Vec<Profile>,
    pub wireless: Vec<Profile>,
    pub alerts: Option<AlertSettings>,
    pub devices: Vec<Device>,
}

impl TargetNetwork {
    pub fn profiles(&self, category: ProfileCategory) -> &[Profile] {
        match category {
            ProfileCategory::Quality => &self.quality,
            ProfileCategory::Wireless => &self.wireless,
        }
    }
}

/// Everything read before any write is issued
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub template: TemplateData,
    pub targets: Vec<TargetNetwork>,
    /// Target networks left out because a read failed
    pub read_errors: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ReadCategory {
    Profiles(ProfileCategory),
    Alerts,
}

const READ_CATEGORIES: [ReadCategory; 3] = [
    ReadCategory::Profiles(ProfileCategory::Quality),
    ReadCategory::Profiles(ProfileCategory::Wireless),
    ReadCategory::Alerts,
];

enum ReadResult {
    Profiles(Vec<Profile>),
    Alerts(AlertSettings),
}

type Keyed = (String, ReadCategory, Result<ReadResult>);

/// Read one category of one network; template-managed profiles only
async fn read_network(api: &dyn DashboardApi, network_id: String, category: ReadCategory) -> Keyed {
    let result = match category {
        ReadCategory::Profiles(kind) => api.list_profiles(&network_id, kind).await.map(|profiles| {
            ReadResult::Profiles(
                profiles
                    .into_iter()
                    .filter(|p| p.name.contains(kind.tag_prefix()))
                    .collect(),
            )
        }),
        ReadCategory::Alerts => api.get_alert_settings(&network_id).await.map(ReadResult::Alerts),
    };
    (network_id, category, result)
}

/// Read every category of every network concurrently, keyed by (network, category)
async fn read_networks(
    api: &dyn DashboardApi,
    network_ids: &[String],
) -> HashMap<(String, ReadCategory), Result<ReadResult>> {
    let tasks = network_ids
        .iter()
        .flat_map(|id| READ_CATEGORIES.iter().map(move |c| read_network(api, id.clone(), *c)));

    join_all(tasks)
        .await
        .into_iter()
        .map(|(id, category, result)| ((id, category), result))
        .collect()
}

fn take_profiles(
    results: &mut HashMap<(String, ReadCategory), Result<ReadResult>>,
    network_id: &str,
    category: ProfileCategory,
) -> Result<Vec<Profile>> {
    match results.remove(&(network_id.to_string(), ReadCategory::Profiles(category))) {
        Some(Ok(ReadResult::Profiles(profiles))) => Ok(profiles),
        Some(Err(e)) => Err(e),
        _ => Err(anyhow::anyhow!("missing {} read for network {}", category, network_id)),
    }
}

fn take_alerts(
    results: &mut HashMap<(String, ReadCategory), Result<ReadResult>>,
    network_id: &str,
) -> Option<AlertSettings> {
    match results.remove(&(network_id.to_string(), ReadCategory::Alerts)) {
        Some(Ok(ReadResult::Alerts(alerts))) => Some(alerts),
        Some(Err(e)) => {
            tracing::warn!("Failed to read alert settings for network {}: {}", network_id, e);
            None
        }
        _ => None,
    }
}

/// Pick the networks to sync: tagged networks hosting at least one eligible camera
pub fn select_targets(devices: Vec<Device>, networks: Vec<Network>, config: &Config) -> (Vec<Network>, Vec<Device>) {
    let cameras: Vec<Device> = devices
        .into_iter()
        .filter(|d| d.model.starts_with(&config.camera_model_prefix))
        .filter(|d| d.network_id.is_some())
        .collect();

    let camera_networks: HashSet<&str> = cameras.iter().filter_map(|d| d.network_id.as_deref()).collect();
    let targets: Vec<Network> = networks
        .into_iter()
        .filter(|n| camera_networks.contains(n.id.as_str()))
        .collect();

    let target_ids: HashSet<&str> = targets.iter().map(|n| n.id.as_str()).collect();
    let cameras = cameras
        .into_iter()
        .filter(|d| d.network_id.as_deref().is_some_and(|id| target_ids.contains(id)))
        .collect();

    (targets, cameras)
}

/// Run the read phase: organization listings and template first, then every target at once
pub async fn gather(api: &dyn DashboardApi, config: &Config) -> Result<Snapshot> {
    let camera_tags = vec![config.dst_camera_tag.clone()];
    let network_tags = vec![config.dst_network_tag.clone()];
    let template_ids = vec![config.src_net_id.clone()];

    let (devices, networks, mut template_reads) = tokio::join!(
        api.list_organization_devices(&config.dst_org_id, &camera_tags, CAMERA_PRODUCT_TYPE),
        api.list_organization_networks(&config.dst_org_id, &network_tags),
        read_networks(api, &template_ids),
    );

    let template = TemplateData {
        quality: take_profiles(&mut template_reads, &config.src_net_id, ProfileCategory::Quality)?,
        wireless: take_profiles(&mut template_reads, &config.src_net_id, ProfileCategory::Wireless)?,
        alerts: take_alerts(&mut template_reads, &config.src_net_id),
    };

    let (networks, devices) = select_targets(devices?, networks?, config);
    tracing::info!(
        "Found {} target networks with {} tagged cameras",
        networks.len(),
        devices.len()
    );

    let network_ids: Vec<String> = networks.iter().map(|n| n.id.clone()).collect();
    let mut reads = read_networks(api, &network_ids).await;

    let mut snapshot = Snapshot {
        template,
        ..Snapshot::default()
    };

    for network in networks {
        let quality = take_profiles(&mut reads, &network.id, ProfileCategory::Quality);
        let wireless = take_profiles(&mut reads, &network.id, ProfileCategory::Wireless);
        let alerts = take_alerts(&mut reads, &network.id);

        let (quality, wireless) = match (quality, wireless) {
            (Ok(q), Ok(w)) => (q, w),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!("Skipping network {}: {}", network.id, e);
                snapshot.read_errors.push(format!("{}: {}", network.id, e));
                continue;
            }
        };

        let devices = devices.iter().filter(|d| d.is_on_network(&network.id)).cloned().collect();
        snapshot.targets.push(TargetNetwork {
            network,
            quality,
            wireless,
            alerts,
            devices,
        });
    }

    Ok(snapshot)
}

// --- Reporting ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileCounts {
    pub created: usize,
    pub updated: usize,
}

/// Outcome of syncing one target network
#[derive(Debug, Clone, Default)]
pub struct NetworkReport {
    pub network_id: String,
    pub profiles: HashMap<ProfileCategory, ProfileCounts>,
    pub assigned: HashMap<AssignmentCategory, usize>,
    pub skipped: Vec<AssignmentCategory>,
    pub diagnostics: Vec<Diagnostic>,
    pub errors: Vec<String>,
}

impl NetworkReport {
    fn new(network_id: &str) -> Self {
        Self {
            network_id: network_id.to_string(),
            ..Self::default()
        }
    }

    pub fn profile_counts(&self, category: ProfileCategory) -> ProfileCounts {
        self.profiles.get(&category).copied().unwrap_or_default()
    }

    pub fn assigned_count(&self, category: AssignmentCategory) -> usize {
        self.assigned.get(&category).copied().unwrap_or(0)
    }

    pub fn message(&self) -> String {
        let quality = self.profile_counts(ProfileCategory::Quality);
        let wireless = self.profile_counts(ProfileCategory::Wireless);
        format!(
            "Network {}: wireless profiles {} created / {} updated, quality profiles {} created / {} updated, \
             {} quality, {} wireless, {} RTSP assignments, {} cameras skipped, {} errors",
            self.network_id,
            wireless.created,
            wireless.updated,
            quality.created,
            quality.updated,
            self.assigned_count(AssignmentCategory::Quality),
            self.assigned_count(AssignmentCategory::Wireless),
            self.assigned_count(AssignmentCategory::Rtsp),
            self.diagnostics.len(),
            self.errors.len()
        )
    }
}

/// Outcome of a whole run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub networks: Vec<NetworkReport>,
    pub read_errors: Vec<String>,
}

impl SyncReport {
    pub fn error_count(&self) -> usize {
        self.read_errors.len() + self.networks.iter().map(|n| n.errors.len()).sum::<usize>()
    }
}

// --- Write phase ---

/// Syncer drives the read phase once, then writes network by network
pub struct Syncer<'a> {
    api: &'a dyn DashboardApi,
    confirm: &'a dyn Confirm,
    config: &'a Config,
    batch_settings: BatchSettings,
}

impl<'a> Syncer<'a> {
    pub fn new(api: &'a dyn DashboardApi, confirm: &'a dyn Confirm, config: &'a Config) -> Self {
        Self {
            api,
            confirm,
            config,
            batch_settings: BatchSettings::default(),
        }
    }

    pub fn with_batch_settings(mut self, settings: BatchSettings) -> Self {
        self.batch_settings = settings;
        self
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let snapshot = gather(self.api, self.config).await?;
        if self.config.verbose {
            show_snapshot(&snapshot, &self.config.rtsp_enable_tag);
        }

        let mut report = SyncReport {
            read_errors: snapshot.read_errors.clone(),
            ..SyncReport::default()
        };

        for target in &snapshot.targets {
            let network_report = self.sync_network(&snapshot.template, target).await?;
            tracing::info!("{}", network_report.message());
            report.networks.push(network_report);
        }

        Ok(report)
    }

    /// Write one network: wireless profiles, quality profiles, then camera assignments
    pub async fn sync_network(&self, template: &TemplateData, target: &TargetNetwork) -> Result<NetworkReport> {
        let network_id = target.network.id.as_str();
        tracing::info!("Working on network {}", network_id);
        let mut report = NetworkReport::new(network_id);

        for (category, module_name) in [
            (ProfileCategory::Wireless, module::WIRELESS_PROFILES),
            (ProfileCategory::Quality, module::QUALITY_PROFILES),
        ] {
            if !self.config.module_enabled(module_name) {
                continue;
            }
            let diff = diff_profiles(
                template.profiles(category),
                target.profiles(category),
                self.config.duplicate_match,
            );
            self.apply_profiles(network_id, category, &diff, &mut report).await?;
        }

        let catalogs = match self.read_catalogs(network_id).await {
            Ok(catalogs) => catalogs,
            Err(e) => {
                tracing::error!("Skipping camera assignments on network {}: {}", network_id, e);
                report.errors.push(format!("catalog read: {}", e));
                return Ok(report);
            }
        };
        if catalogs.quality.is_empty() && catalogs.wireless.is_empty() {
            tracing::debug!("Network {} has no camera profiles to assign", network_id);
        } else {
            tracing::debug!(
                "Network {} catalogs: {} quality, {} wireless",
                network_id,
                catalogs.quality.len(),
                catalogs.wireless.len()
            );
        }

        let devices: Vec<&Device> = target.devices.iter().collect();
        let plan = plan_network(&devices, &catalogs, self.config);
        report.diagnostics = plan.diagnostics.clone();

        if self.config.use_action_batches {
            self.apply_batched(&plan, &mut report).await;
        } else {
            for category in [AssignmentCategory::Quality, AssignmentCategory::Wireless, AssignmentCategory::Rtsp] {
                self.apply_assignments(category, &plan, &mut report).await;
            }
        }

        Ok(report)
    }

    /// Catalogs include every profile now on the network, not only template-managed ones
    async fn read_catalogs(&self, network_id: &str) -> Result<NetworkCatalogs> {
        let mut catalogs = NetworkCatalogs::default();
        if self.config.module_enabled(module::QUALITY_PROFILES) {
            let profiles = self.api.list_profiles(network_id, ProfileCategory::Quality).await?;
            catalogs.quality = ProfileCatalog::from_profiles(&profiles);
        }
        if self.config.module_enabled(module::WIRELESS_PROFILES) {
            let profiles = self.api.list_profiles(network_id, ProfileCategory::Wireless).await?;
            catalogs.wireless = ProfileCatalog::from_profiles(&profiles);
        }
        Ok(catalogs)
    }

    /// Show the summary when running unattended and verbose, then ask the gate
    async fn gate(&self, summary: &str) -> bool {
        if self.config.verbose && !self.config.supervised {
            println!("{}", summary);
        }
        self.confirm.confirm(summary).await
    }

    async fn apply_profiles(
        &self,
        network_id: &str,
        category: ProfileCategory,
        diff: &ProfileDiff,
        report: &mut NetworkReport,
    ) -> Result<()> {
        if diff.is_empty() {
            tracing::info!("No {} to sync on network {}", category, network_id);
            return Ok(());
        }

        let summary = format!(
            "Network {}: {} to be created:\n{}\n{} to be updated:\n{}",
            network_id,
            category,
            profile_table(&diff.to_create),
            category,
            profile_table(&diff.to_update)
        );
        if !self.gate(&summary).await {
            return Err(SyncError::OperatorAbort(category, network_id.to_string()).into());
        }

        let mut counts = ProfileCounts::default();

        for profile in &diff.to_create {
            let fields = profile.updatable_fields(category);
            match self.api.create_profile(network_id, category, &profile.name, &fields).await {
                Ok(_) => counts.created += 1,
                Err(e) => {
                    tracing::warn!("Failed to create {} '{}' on {}: {}", category, profile.name, network_id, e);
                    report.errors.push(format!("{}: create '{}': {}", category, profile.name, e));
                }
            }
        }

        for profile in &diff.to_update {
            let Some(id) = profile.id.as_deref() else {
                report.errors.push(format!("{}: update '{}': target profile has no id", category, profile.name));
                continue;
            };
            let fields = profile.updatable_fields(category);
            match self.api.update_profile(network_id, category, id, &fields).await {
                Ok(_) => counts.updated += 1,
                Err(e) => {
                    tracing::warn!("Failed to update {} '{}' on {}: {}", category, profile.name, network_id, e);
                    report.errors.push(format!("{}: update '{}': {}", category, profile.name, e));
                }
            }
        }

        tracing::info!(
            "{} copied to network {} ({} created, {} updated)",
            category,
            network_id,
            counts.created,
            counts.updated
        );
        report.profiles.insert(category, counts);
        Ok(())
    }

    async fn apply_assignments(&self, category: AssignmentCategory, plan: &NetworkPlan, report: &mut NetworkReport) {
        if plan.count(category) == 0 {
            return;
        }
        if !self.gate(&assignment_summary(category, plan)).await {
            tracing::info!("Skipping assignment of {} for these cameras", category.label());
            report.skipped.push(category);
            return;
        }

        let mut assigned = 0;
        for camera in &plan.plans {
            let result = match category {
                AssignmentCategory::Quality => match &camera.quality {
                    Some(q) => self.api.assign_quality_profile(&camera.serial, &q.profile_id).await,
                    None => continue,
                },
                AssignmentCategory::Wireless => match &camera.wireless {
                    Some(ids) => self.api.assign_wireless_profiles(&camera.serial, ids).await,
                    None => continue,
                },
                AssignmentCategory::Rtsp => match &camera.rtsp {
                    Some(_) => self.api.enable_rtsp(&camera.serial).await,
                    None => continue,
                },
            };
            match result {
                Ok(()) => assigned += 1,
                Err(e) => {
                    tracing::warn!("Failed to apply {} to camera {}: {}", category.label(), camera.serial, e);
                    report.errors.push(format!("{} {}: {}", category.label(), camera.serial, e));
                }
            }
        }
        report.assigned.insert(category, assigned);
    }

    /// Confirm each category, then submit all accepted changes as action batches
    async fn apply_batched(&self, plan: &NetworkPlan, report: &mut NetworkReport) {
        let mut actions = Vec::new();
        let mut accepted = Vec::new();

        for category in [AssignmentCategory::Quality, AssignmentCategory::Wireless, AssignmentCategory::Rtsp] {
            if plan.count(category) == 0 {
                continue;
            }
            if !self.gate(&assignment_summary(category, plan)).await {
                tracing::info!("Skipping assignment of {} for these cameras", category.label());
                report.skipped.push(category);
                continue;
            }
            actions.extend(batch_actions(category, plan));
            accepted.push(category);
        }

        if actions.is_empty() {
            return;
        }

        let batcher = ActionBatcher::new(self.api, &self.config.dst_org_id, self.batch_settings);
        match batcher.submit(&actions).await {
            Ok(_) => {
                for category in accepted {
                    report.assigned.insert(category, plan.count(category));
                }
            }
            Err(e) => {
                tracing::warn!("Action batch submission failed for network {}: {}", report.network_id, e);
                report.errors.push(format!("action batch: {}", e));
            }
        }
    }
}

fn batch_actions(category: AssignmentCategory, plan: &NetworkPlan) -> Vec<BatchAction> {
    match category {
        AssignmentCategory::Quality => plan
            .quality()
            .map(|(p, q)| BatchAction::assign_quality(&p.serial, &q.profile_id))
            .collect(),
        AssignmentCategory::Wireless => plan
            .wireless()
            .map(|(p, ids)| BatchAction::assign_wireless(&p.serial, ids))
            .collect(),
        AssignmentCategory::Rtsp => plan.rtsp().map(|(p, _)| BatchAction::enable_rtsp(&p.serial)).collect(),
    }
}

// --- Console display ---

fn profile_table(profiles: &[Profile]) -> String {
    let rows: Vec<Vec<String>> = profiles
        .iter()
        .map(|p| {
            vec![
                p.id.clone().unwrap_or_default(),
                p.name.clone(),
                compact_json(&p.attributes),
            ]
        })
        .collect();
    render_table(&["id", "name", "settings"], &rows)
}

fn assignment_summary(category: AssignmentCategory, plan: &NetworkPlan) -> String {
    let (headers, rows): (&[&str], Vec<Vec<String>>) = match category {
        AssignmentCategory::Quality => (
            &["serial", "name", "quality profile", "profile id"][..],
            plan.quality()
                .map(|(p, q)| vec![p.serial.clone(), p.name.clone(), q.profile_name.clone(), q.profile_id.clone()])
                .collect(),
        ),
        AssignmentCategory::Wireless => (
            &["serial", "name", "primary", "secondary", "backup"][..],
            plan.wireless()
                .map(|(p, ids)| {
                    vec![
                        p.serial.clone(),
                        p.name.clone(),
                        ids.primary.clone(),
                        ids.secondary.clone(),
                        ids.backup.clone().unwrap_or_default(),
                    ]
                })
                .collect(),
        ),
        AssignmentCategory::Rtsp => (
            &["serial", "name", "rtsp url"][..],
            plan.rtsp()
                .map(|(p, r)| vec![p.serial.clone(), p.name.clone(), r.url.clone().unwrap_or_default()])
                .collect(),
        ),
    };
    format!(
        "{} will be applied to the following cameras:\n{}",
        category.label(),
        render_table(headers, &rows)
    )
}

fn tag_summary(tags: &[String], rtsp_tag: &str) -> String {
    tags.iter()
        .map(|t| match classify_tag(t, rtsp_tag) {
            TagIntent::None => t.clone(),
            TagIntent::Rtsp => format!("{} (rtsp)", t),
            TagIntent::Quality(_) => format!("{} (quality)", t),
            TagIntent::Wireless(order) => format!("{} (wireless {})", t, order.digits().join(">")),
            TagIntent::Invalid(_) => format!("{} (invalid)", t),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn alert_table(alerts: Option<&AlertSettings>) -> String {
    match alerts {
        Some(settings) => {
            let rows: Vec<Vec<String>> = settings
                .alerts
                .iter()
                .map(|a| vec![a.alert_type.clone(), a.enabled.to_string()])
                .collect();
            render_table(&["type", "enabled"], &rows)
        }
        None => "No Camera Alerts Found!".to_string(),
    }
}

fn show_snapshot(snapshot: &Snapshot, rtsp_tag: &str) {
    let template = &snapshot.template;
    println!("Source Template Camera Quality Profiles:\n{}", profile_table(&template.quality));
    println!("Source Template Camera Wireless Profiles:\n{}", profile_table(&template.wireless));
    println!("Source Template Camera Alerts:\n{}", alert_table(template.alerts.as_ref()));

    let network_rows: Vec<Vec<String>> = snapshot
        .targets
        .iter()
        .map(|t| vec![t.network.id.clone(), t.network.name.clone(), t.network.tags.join(", ")])
        .collect();
    println!("Target Networks:\n{}", render_table(&["id", "name", "tags"], &network_rows));

    let device_rows: Vec<Vec<String>> = snapshot
        .targets
        .iter()
        .flat_map(|t| t.devices.iter())
        .map(|d| {
            vec![
                d.serial.clone(),
                d.display_name().to_string(),
                d.network_id.clone().unwrap_or_default(),
                d.lan_ip.clone().unwrap_or_default(),
                tag_summary(&d.tags, rtsp_tag),
            ]
        })
        .collect();
    println!(
        "Target Devices:\n{}",
        render_table(&["serial", "name", "network", "lan ip", "tags"], &device_rows)
    );

    for target in &snapshot.targets {
        println!(
            "Quality Profiles currently in Network {}:\n{}",
            target.network.id,
            profile_table(&target.quality)
        );
        println!(
            "Wireless Profiles currently in Network {}:\n{}",
            target.network.id,
            profile_table(&target.wireless)
        );
        println!(
            "Camera Alerts currently in Network {}:\n{}",
            target.network.id,
            alert_table(target.alerts.as_ref())
        );
    }
}
