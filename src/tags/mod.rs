use thiserror::Error;

use crate::models::tag_prefix;

/// Fewest and most wireless profiles a camera can be assigned
pub const MIN_WIRELESS_PROFILES: usize = 2;
pub const MAX_WIRELESS_PROFILES: usize = 3;

/// Why a camera's tags could not be turned into an assignment
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("ambiguous quality tag: a camera may only carry a single qp- tag, found {0:?}")]
    AmbiguousQualityTag(Vec<String>),

    #[error("ambiguous wireless tag: a camera may only carry a single wp- tag, found {0:?}")]
    AmbiguousWirelessTag(Vec<String>),

    #[error("malformed wireless tag '{0}': expected dash-separated digits after wp, like wp-2-1-3")]
    MalformedWirelessTag(String),

    #[error("insufficient wireless profiles in '{tag}': found {found}, need at least 2")]
    InsufficientWirelessProfiles { tag: String, found: usize },

    #[error("too many wireless profiles in '{tag}': found {found}, at most 3 are allowed")]
    TooManyWirelessProfiles { tag: String, found: usize },
}

/// Ordered profile numbers from a `wp-<a>-<b>[-<c>]` tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirelessOrder(Vec<String>);

impl WirelessOrder {
    /// Digits in tag order: primary, secondary, then optional backup
    pub fn digits(&self) -> &[String] {
        &self.0
    }
}

/// What a single tag asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagIntent {
    None,
    Rtsp,
    Quality(String),
    Wireless(WirelessOrder),
    Invalid(TagError),
}

/// Interpret one tag on its own, without the per-camera cardinality rules
pub fn classify_tag(tag: &str, rtsp_tag: &str) -> TagIntent {
    if tag == rtsp_tag {
        TagIntent::Rtsp
    } else if tag.contains(tag_prefix::WIRELESS) {
        match parse_wireless_tag(tag) {
            Ok(order) => TagIntent::Wireless(order),
            Err(e) => TagIntent::Invalid(e),
        }
    } else if tag.contains(tag_prefix::QUALITY) {
        TagIntent::Quality(tag.to_string())
    } else {
        TagIntent::None
    }
}

/// Parse the structure of a single wp- tag
pub fn parse_wireless_tag(tag: &str) -> Result<WirelessOrder, TagError> {
    let digits: Vec<&str> = tag.split('-').skip(1).collect();

    let all_digits = digits
        .iter()
        .all(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()));
    if !all_digits {
        return Err(TagError::MalformedWirelessTag(tag.to_string()));
    }

    if digits.len() < MIN_WIRELESS_PROFILES {
        return Err(TagError::InsufficientWirelessProfiles {
            tag: tag.to_string(),
            found: digits.len(),
        });
    }
    if digits.len() > MAX_WIRELESS_PROFILES {
        return Err(TagError::TooManyWirelessProfiles {
            tag: tag.to_string(),
            found: digits.len(),
        });
    }

    Ok(WirelessOrder(digits.into_iter().map(|d| d.to_string()).collect()))
}

/// Per-camera intents derived from its full tag set
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceIntent {
    /// Raw qp- tag to be matched against profile names
    pub quality: Option<Result<String, TagError>>,
    pub wireless: Option<Result<WirelessOrder, TagError>>,
    pub rtsp: bool,
}

/// Parse a camera's tags into quality, wireless and RTSP intents.
///
/// A tag counts towards a category when it contains the category marker
/// (`qp-` or `wp-`). Zero matching tags means no intent, one is parsed, and
/// more than one is ambiguous. RTSP requires an exact match on `rtsp_tag`.
pub fn parse_device_tags(tags: &[String], rtsp_tag: &str) -> DeviceIntent {
    let quality_tags: Vec<&String> = tags
        .iter()
        .filter(|t| t.contains(tag_prefix::QUALITY))
        .collect();
    let wireless_tags: Vec<&String> = tags
        .iter()
        .filter(|t| t.contains(tag_prefix::WIRELESS))
        .collect();

    let quality = match quality_tags.as_slice() {
        [] => None,
        [tag] => Some(Ok((*tag).clone())),
        many => Some(Err(TagError::AmbiguousQualityTag(
            many.iter().map(|t| t.to_string()).collect(),
        ))),
    };

    let wireless = match wireless_tags.as_slice() {
        [] => None,
        [tag] => Some(parse_wireless_tag(tag)),
        many => Some(Err(TagError::AmbiguousWirelessTag(
            many.iter().map(|t| t.to_string()).collect(),
        ))),
    };

    DeviceIntent {
        quality,
        wireless,
        rtsp: tags.iter().any(|t| t == rtsp_tag),
    }
}
