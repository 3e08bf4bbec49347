use std::env;

/// Default dashboard API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";

/// Canonical sync module names
pub mod module {
    pub const QUALITY_PROFILES: &str = "quality_profiles";
    pub const WIRELESS_PROFILES: &str = "wireless_profiles";
    pub const RTSP_SETTINGS: &str = "rtsp_settings";

    pub const ALL: &[&str] = &[QUALITY_PROFILES, WIRELESS_PROFILES, RTSP_SETTINGS];
}

/// Which entry wins when several profiles match the same name or pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateMatch {
    #[default]
    First,
    Last,
}

impl DuplicateMatch {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "first" => Some(Self::First),
            "last" => Some(Self::Last),
            _ => None,
        }
    }

    /// Pick one item out of an ordered set of candidates
    pub fn pick<T, I>(self, candidates: I) -> Option<T>
    where
        I: IntoIterator<Item = T>,
    {
        match self {
            Self::First => candidates.into_iter().next(),
            Self::Last => candidates.into_iter().last(),
        }
    }
}

/// Config holds all run configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub src_org_id: String,
    pub dst_org_id: String,
    pub src_net_id: String,
    pub dst_network_tag: String,
    pub dst_camera_tag: String,
    pub rtsp_enable_tag: String,
    pub camera_model_prefix: String,
    pub verbose: bool,
    pub supervised: bool,
    pub console_logging: bool,
    pub max_retries: u32,
    pub max_requests: usize,
    pub modules: Vec<String>,
    pub use_action_batches: bool,
    pub duplicate_match: DuplicateMatch,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            src_org_id: String::new(),
            dst_org_id: String::new(),
            src_net_id: String::new(),
            dst_network_tag: "camProfiler".to_string(),
            dst_camera_tag: "camProfiler".to_string(),
            rtsp_enable_tag: "rtsp".to_string(),
            camera_model_prefix: "MV".to_string(),
            verbose: true,
            supervised: true,
            console_logging: true,
            max_retries: 100,
            max_requests: 10,
            modules: module::ALL.iter().map(|m| m.to_string()).collect(),
            use_action_batches: false,
            duplicate_match: DuplicateMatch::First,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup; `load` uses the process environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let src_org_id = get("SRC_ORG_ID", &defaults.src_org_id);
        let dst_org_id = match lookup("DST_ORG_ID") {
            Some(id) if !id.is_empty() => id,
            _ => src_org_id.clone(),
        };

        let duplicate_match = match lookup("DUPLICATE_MATCH") {
            Some(raw) => DuplicateMatch::parse(&raw).unwrap_or_else(|| {
                tracing::warn!("Invalid DUPLICATE_MATCH '{}', using first", raw);
                DuplicateMatch::First
            }),
            None => defaults.duplicate_match,
        };

        let modules = match lookup("SYNC_MODULES") {
            Some(raw) => parse_modules(&raw),
            None => defaults.modules.clone(),
        };

        Self {
            api_key: get("DASHBOARD_API_KEY", &defaults.api_key),
            base_url: get("DASHBOARD_BASE_URL", &defaults.base_url),
            src_org_id,
            dst_org_id,
            src_net_id: get("SRC_NET_ID", &defaults.src_net_id),
            dst_network_tag: get("DST_NETWORK_TAG", &defaults.dst_network_tag),
            dst_camera_tag: get("DST_CAMERA_TAG", &defaults.dst_camera_tag),
            rtsp_enable_tag: get("RTSP_ENABLE_TAG", &defaults.rtsp_enable_tag),
            camera_model_prefix: get("CAMERA_MODEL_PREFIX", &defaults.camera_model_prefix),
            verbose: get_bool(&lookup, "VERBOSE", defaults.verbose),
            supervised: get_bool(&lookup, "SUPERVISED", defaults.supervised),
            console_logging: get_bool(&lookup, "CONSOLE_LOGGING", defaults.console_logging),
            max_retries: get_num(&lookup, "MAX_RETRIES", defaults.max_retries),
            max_requests: get_num(&lookup, "MAX_REQUESTS", defaults.max_requests).max(1),
            modules,
            use_action_batches: get_bool(&lookup, "USE_ACTION_BATCHES", defaults.use_action_batches),
            duplicate_match,
        }
    }

    /// Check the settings a run cannot start without
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            return Err(anyhow::anyhow!("DASHBOARD_API_KEY is not set"));
        }
        if self.src_net_id.is_empty() {
            return Err(anyhow::anyhow!("SRC_NET_ID is not set"));
        }
        if self.dst_org_id.is_empty() {
            return Err(anyhow::anyhow!("DST_ORG_ID (or SRC_ORG_ID) is not set"));
        }
        Ok(())
    }

    /// Read only CONSOLE_LOGGING, so logging can be set up before the full load
    pub fn console_logging_from_env() -> bool {
        get_bool(&|key: &str| env::var(key).ok(), "CONSOLE_LOGGING", Self::default().console_logging)
    }

    pub fn module_enabled(&self, name: &str) -> bool {
        self.modules.iter().any(|m| m == name)
    }
}

fn parse_modules(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim())
        .filter(|m| !m.is_empty())
        .filter(|m| {
            let known = module::ALL.contains(m);
            if !known {
                tracing::warn!("Ignoring unknown sync module '{}'", m);
            }
            known
        })
        .map(|m| m.to_string())
        .collect()
}

fn get_bool<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        _ => {
            tracing::warn!("Invalid boolean for {}: '{}', using {}", key, raw, default);
            default
        }
    }
}

fn get_num<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid number for {}: '{}', using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
