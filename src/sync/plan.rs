use thiserror::Error;

use crate::config::{module, Config, DuplicateMatch};
use crate::models::{
    rtsp_url, AssignmentPlan, Device, Profile, QualityAssignment, RtspTarget, WirelessProfileIds,
};
use crate::tags::{parse_device_tags, WirelessOrder};

/// Why a parsed tag could not be resolved against a network's profiles
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("unresolved quality profile: no profile name contains '{0}'")]
    UnresolvedQualityProfile(String),

    #[error("unresolvable wireless assignment for order {order:?}: no profile matches {missing:?}")]
    UnresolvableWirelessAssignment { order: Vec<String>, missing: Vec<String> },
}

/// Per-camera write categories, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentCategory {
    Quality,
    Wireless,
    Rtsp,
}

impl AssignmentCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Quality => "Quality Profiles",
            Self::Wireless => "Wireless Profiles",
            Self::Rtsp => "RTSP",
        }
    }
}

/// A camera left out of one category, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub serial: String,
    pub category: AssignmentCategory,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
}

/// Name to ID lookup over one network's profiles, in fetch order
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    entries: Vec<CatalogEntry>,
}

impl ProfileCatalog {
    /// Profiles without an ID cannot be assigned and are left out
    pub fn from_profiles(profiles: &[Profile]) -> Self {
        let entries = profiles
            .iter()
            .filter_map(|p| {
                p.id.as_ref().map(|id| CatalogEntry {
                    id: id.clone(),
                    name: p.name.clone(),
                })
            })
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pick among entries whose name contains `needle`
    pub fn find_containing(&self, needle: &str, policy: DuplicateMatch) -> Option<&CatalogEntry> {
        let matches: Vec<&CatalogEntry> = self.entries.iter().filter(|e| e.name.contains(needle)).collect();
        if matches.len() > 1 {
            tracing::warn!(
                "{} profiles match '{}', using the {:?} one",
                matches.len(),
                needle,
                policy
            );
        }
        policy.pick(matches)
    }
}

/// Resolve a qp- tag to the profile whose name contains it
pub fn resolve_quality(
    tag: &str,
    catalog: &ProfileCatalog,
    policy: DuplicateMatch,
) -> Result<QualityAssignment, PlanError> {
    catalog
        .find_containing(tag, policy)
        .map(|entry| QualityAssignment {
            profile_id: entry.id.clone(),
            profile_name: entry.name.clone(),
        })
        .ok_or_else(|| PlanError::UnresolvedQualityProfile(tag.to_string()))
}

/// Resolve each wireless digit to the profile whose name contains `-<digit>-`
pub fn resolve_wireless(
    order: &WirelessOrder,
    catalog: &ProfileCatalog,
    policy: DuplicateMatch,
) -> Result<WirelessProfileIds, PlanError> {
    let mut ids = Vec::new();
    let mut missing = Vec::new();
    for digit in order.digits() {
        match catalog.find_containing(&format!("-{}-", digit), policy) {
            Some(entry) => ids.push(entry.id.clone()),
            None => missing.push(digit.clone()),
        }
    }

    let unresolvable = || PlanError::UnresolvableWirelessAssignment {
        order: order.digits().to_vec(),
        missing: missing.clone(),
    };

    match ids.as_slice() {
        [primary, secondary] if missing.is_empty() => Ok(WirelessProfileIds {
            primary: primary.clone(),
            secondary: secondary.clone(),
            backup: None,
        }),
        [primary, secondary, backup] if missing.is_empty() => Ok(WirelessProfileIds {
            primary: primary.clone(),
            secondary: secondary.clone(),
            backup: Some(backup.clone()),
        }),
        _ => Err(unresolvable()),
    }
}

/// Everything planned for one network
#[derive(Debug, Clone, Default)]
pub struct NetworkPlan {
    pub plans: Vec<AssignmentPlan>,
    pub diagnostics: Vec<Diagnostic>,
}

impl NetworkPlan {
    pub fn quality(&self) -> impl Iterator<Item = (&AssignmentPlan, &QualityAssignment)> {
        self.plans.iter().filter_map(|p| p.quality.as_ref().map(|q| (p, q)))
    }

    pub fn wireless(&self) -> impl Iterator<Item = (&AssignmentPlan, &WirelessProfileIds)> {
        self.plans.iter().filter_map(|p| p.wireless.as_ref().map(|w| (p, w)))
    }

    pub fn rtsp(&self) -> impl Iterator<Item = (&AssignmentPlan, &RtspTarget)> {
        self.plans.iter().filter_map(|p| p.rtsp.as_ref().map(|r| (p, r)))
    }

    pub fn count(&self, category: AssignmentCategory) -> usize {
        match category {
            AssignmentCategory::Quality => self.quality().count(),
            AssignmentCategory::Wireless => self.wireless().count(),
            AssignmentCategory::Rtsp => self.rtsp().count(),
        }
    }
}

/// Catalogs of the profiles present on a network after profile sync
#[derive(Debug, Clone, Default)]
pub struct NetworkCatalogs {
    pub quality: ProfileCatalog,
    pub wireless: ProfileCatalog,
}

/// Parse every camera's tags and resolve them against the network catalogs
pub fn plan_network(devices: &[&Device], catalogs: &NetworkCatalogs, config: &Config) -> NetworkPlan {
    let policy = config.duplicate_match;
    let quality_enabled = config.module_enabled(module::QUALITY_PROFILES);
    let wireless_enabled = config.module_enabled(module::WIRELESS_PROFILES);
    let rtsp_enabled = config.module_enabled(module::RTSP_SETTINGS);

    let mut network_plan = NetworkPlan::default();

    for device in devices {
        let intent = parse_device_tags(&device.tags, &config.rtsp_enable_tag);
        let mut diagnose = |category: AssignmentCategory, message: String| {
            tracing::warn!("Skipping {} for camera {}: {}", category.label(), device.serial, message);
            network_plan.diagnostics.push(Diagnostic {
                serial: device.serial.clone(),
                category,
                message,
            });
        };

        let quality = match intent.quality.as_ref().filter(|_| quality_enabled) {
            Some(Ok(tag)) => match resolve_quality(tag, &catalogs.quality, policy) {
                Ok(assignment) => Some(assignment),
                Err(e) => {
                    diagnose(AssignmentCategory::Quality, e.to_string());
                    None
                }
            },
            Some(Err(e)) => {
                diagnose(AssignmentCategory::Quality, e.to_string());
                None
            }
            None => None,
        };

        let wireless = match intent.wireless.as_ref().filter(|_| wireless_enabled) {
            Some(Ok(order)) => match resolve_wireless(order, &catalogs.wireless, policy) {
                Ok(ids) => Some(ids),
                Err(e) => {
                    diagnose(AssignmentCategory::Wireless, e.to_string());
                    None
                }
            },
            Some(Err(e)) => {
                diagnose(AssignmentCategory::Wireless, e.to_string());
                None
            }
            None => None,
        };

        let rtsp = (intent.rtsp && rtsp_enabled).then(|| RtspTarget {
            url: device.lan_ip.as_deref().filter(|ip| !ip.is_empty()).map(rtsp_url),
        });

        let plan = AssignmentPlan {
            serial: device.serial.clone(),
            name: device.display_name().to_string(),
            quality,
            wireless,
            rtsp,
        };
        if !plan.is_empty() {
            network_plan.plans.push(plan);
        }
    }

    network_plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::parse_wireless_tag;

    fn catalog(entries: &[(&str, &str)]) -> ProfileCatalog {
        let profiles: Vec<Profile> = entries
            .iter()
            .map(|(id, name)| Profile::new(*name).with_id(*id))
            .collect();
        ProfileCatalog::from_profiles(&profiles)
    }

    fn wireless_catalog() -> ProfileCatalog {
        catalog(&[("w1", "wp-1-office"), ("w2", "wp-2-yard"), ("w3", "wp-3-dock")])
    }

    fn device(serial: &str, tags: &[&str], lan_ip: Option<&str>) -> Device {
        Device {
            serial: serial.to_string(),
            name: None,
            network_id: Some("N_1".to_string()),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            lan_ip: lan_ip.map(|ip| ip.to_string()),
            model: "MV12".to_string(),
            product_type: Some("camera".to_string()),
        }
    }

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_resolve_wireless_three_profiles() {
        let order = parse_wireless_tag("wp-2-1-3").unwrap();
        let ids = resolve_wireless(&order, &wireless_catalog(), DuplicateMatch::First).unwrap();
        assert_eq!(
            ids,
            WirelessProfileIds {
                primary: "w2".to_string(),
                secondary: "w1".to_string(),
                backup: Some("w3".to_string()),
            }
        );
    }

    #[test]
    fn test_resolve_wireless_two_profiles() {
        let order = parse_wireless_tag("wp-3-1").unwrap();
        let ids = resolve_wireless(&order, &wireless_catalog(), DuplicateMatch::First).unwrap();
        assert_eq!(ids.primary, "w3");
        assert_eq!(ids.secondary, "w1");
        assert_eq!(ids.backup, None);
    }

    #[test]
    fn test_resolve_wireless_missing_profile_is_an_error() {
        let order = parse_wireless_tag("wp-1-4-2").unwrap();
        let err = resolve_wireless(&order, &wireless_catalog(), DuplicateMatch::First).unwrap_err();
        assert_eq!(
            err,
            PlanError::UnresolvableWirelessAssignment {
                order: vec!["1".to_string(), "4".to_string(), "2".to_string()],
                missing: vec!["4".to_string()],
            }
        );

        let err = resolve_wireless(&order, &ProfileCatalog::default(), DuplicateMatch::First);
        assert!(err.is_err());
    }

    #[test]
    fn test_wireless_digit_needs_both_dashes() {
        // "-1-" must not match wp-10-...
        let catalog = catalog(&[("w10", "wp-10-lab"), ("w2", "wp-2-yard")]);
        let order = parse_wireless_tag("wp-1-2").unwrap();
        assert!(resolve_wireless(&order, &catalog, DuplicateMatch::First).is_err());
    }

    #[test]
    fn test_resolve_quality_substring_and_policy() {
        let catalog = catalog(&[("q1", "qp-lobby"), ("q2", "qp-lobby-night"), ("q3", "qp-yard")]);

        let first = resolve_quality("qp-lobby", &catalog, DuplicateMatch::First).unwrap();
        assert_eq!(first.profile_id, "q1");
        let last = resolve_quality("qp-lobby", &catalog, DuplicateMatch::Last).unwrap();
        assert_eq!(last.profile_id, "q2");

        assert_eq!(
            resolve_quality("qp-dock", &catalog, DuplicateMatch::First),
            Err(PlanError::UnresolvedQualityProfile("qp-dock".to_string()))
        );
    }

    #[test]
    fn test_catalog_skips_profiles_without_id() {
        let catalog = ProfileCatalog::from_profiles(&[Profile::new("qp-new"), Profile::new("qp-old").with_id("1")]);
        assert_eq!(catalog.len(), 1);
        assert!(!catalog.is_empty());
        assert!(ProfileCatalog::from_profiles(&[Profile::new("qp-new")]).is_empty());
    }

    #[test]
    fn test_plan_network() {
        let devices = vec![
            device("CAM-1", &["camProfiler", "qp-lobby", "wp-2-1-3", "rtsp"], Some("10.0.0.5")),
            device("CAM-2", &["qp-lobby", "qp-yard", "wp-5"], None),
            device("CAM-3", &["camProfiler"], None),
            device("CAM-4", &["rtsp"], None),
        ];
        let refs: Vec<&Device> = devices.iter().collect();
        let catalogs = NetworkCatalogs {
            quality: catalog(&[("q1", "qp-lobby")]),
            wireless: wireless_catalog(),
        };

        let plan = plan_network(&refs, &catalogs, &config());

        // CAM-2 has only errors and CAM-3 has nothing to do
        assert_eq!(plan.plans.len(), 2);

        let cam1 = &plan.plans[0];
        assert_eq!(cam1.serial, "CAM-1");
        assert_eq!(cam1.quality.as_ref().map(|q| q.profile_id.as_str()), Some("q1"));
        assert_eq!(cam1.wireless.as_ref().and_then(|w| w.backup.as_deref()), Some("w3"));
        assert_eq!(
            cam1.rtsp,
            Some(RtspTarget { url: Some("rtsp://10.0.0.5:9000/live".to_string()) })
        );

        let cam4 = &plan.plans[1];
        assert_eq!(cam4.rtsp, Some(RtspTarget { url: None }));

        assert_eq!(plan.diagnostics.len(), 2);
        assert!(plan.diagnostics.iter().all(|d| d.serial == "CAM-2"));
        assert!(plan.diagnostics[0].message.starts_with("ambiguous quality tag"));
        assert!(plan.diagnostics[1].message.starts_with("insufficient wireless profiles"));

        assert_eq!(plan.count(AssignmentCategory::Quality), 1);
        assert_eq!(plan.count(AssignmentCategory::Wireless), 1);
        assert_eq!(plan.count(AssignmentCategory::Rtsp), 2);
    }

    #[test]
    fn test_unresolved_quality_is_reported() {
        let devices = vec![device("CAM-1", &["qp-missing"], None)];
        let refs: Vec<&Device> = devices.iter().collect();
        let plan = plan_network(&refs, &NetworkCatalogs::default(), &config());
        assert!(plan.plans.is_empty());
        assert_eq!(plan.diagnostics.len(), 1);
        assert_eq!(plan.diagnostics[0].category, AssignmentCategory::Quality);
    }

    #[test]
    fn test_disabled_modules_are_not_planned() {
        let mut cfg = config();
        cfg.modules = vec![module::RTSP_SETTINGS.to_string()];

        let devices = vec![device("CAM-1", &["qp-lobby", "wp-a-b", "rtsp"], Some("10.0.0.9"))];
        let refs: Vec<&Device> = devices.iter().collect();
        let catalogs = NetworkCatalogs {
            quality: catalog(&[("q1", "qp-lobby")]),
            wireless: wireless_catalog(),
        };
        let plan = plan_network(&refs, &catalogs, &cfg);

        assert_eq!(plan.plans.len(), 1);
        assert!(plan.plans[0].quality.is_none());
        assert!(plan.plans[0].wireless.is_none());
        assert!(plan.diagnostics.is_empty());
    }

    #[test]
    fn test_custom_rtsp_tag() {
        let mut cfg = config();
        cfg.rtsp_enable_tag = "stream".to_string();
        let devices = vec![device("CAM-1", &["rtsp"], None), device("CAM-2", &["stream"], None)];
        let refs: Vec<&Device> = devices.iter().collect();
        let plan = plan_network(&refs, &NetworkCatalogs::default(), &cfg);
        assert_eq!(plan.plans.len(), 1);
        assert_eq!(plan.plans[0].serial, "CAM-2");
    }
}
