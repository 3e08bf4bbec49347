use std::collections::HashMap;

use crate::config::DuplicateMatch;
use crate::models::Profile;

/// Template profiles split by whether the target network already has them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDiff {
    pub to_create: Vec<Profile>,
    /// Template settings carrying the target network's profile ID
    pub to_update: Vec<Profile>,
}

impl ProfileDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty()
    }
}

/// Collapse profiles sharing a name to one entry, keeping first-seen order
pub fn dedupe_by_name(profiles: &[Profile], policy: DuplicateMatch) -> Vec<Profile> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&Profile>> = HashMap::new();

    for profile in profiles {
        let group = groups.entry(profile.name.as_str()).or_default();
        if group.is_empty() {
            order.push(profile.name.as_str());
        }
        group.push(profile);
    }

    order
        .into_iter()
        .filter_map(|name| {
            let group = groups.remove(name)?;
            if group.len() > 1 {
                tracing::warn!(
                    "Profile name '{}' appears {} times, keeping the {:?} one",
                    name,
                    group.len(),
                    policy
                );
            }
            policy.pick(group).cloned()
        })
        .collect()
}

/// Partition template profiles into create and update sets by exact name.
///
/// Every template name lands in exactly one of the two sets. Updates take
/// the template's settings with the target profile's `id` attached.
pub fn diff_profiles(template: &[Profile], target: &[Profile], policy: DuplicateMatch) -> ProfileDiff {
    let existing: HashMap<String, Option<String>> = dedupe_by_name(target, policy)
        .into_iter()
        .map(|p| (p.name, p.id))
        .collect();

    let mut diff = ProfileDiff::default();
    for profile in dedupe_by_name(template, policy) {
        match existing.get(&profile.name) {
            Some(id) => {
                let mut update = profile;
                update.id = id.clone();
                diff.to_update.push(update);
            }
            None => {
                let mut create = profile;
                create.id = None;
                diff.to_create.push(create);
            }
        }
    }
    diff
}
