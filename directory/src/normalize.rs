//! Eligibility rules and the mapping from provider entries to upsert rows.

use std::collections::HashMap;

use crate::provider::DirectoryEntry;

/// The fields a sync is allowed to write.
///
/// `department` and `is_manager` are owned by the local store and must never
/// appear in the upsert's overwrite set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmployeeCandidate {
    pub external_id: String,
    pub name: String,
    pub role: Option<String>,
}

/// Result of filtering one run's entries.
#[derive(Clone, Debug, Default)]
pub struct Normalized {
    pub candidates: Vec<EmployeeCandidate>,
    /// Entries dropped as ineligible or as repeats of an earlier id.
    pub skipped: usize,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

/// Map an entry to a candidate, or `None` when it may not exist locally.
///
/// Deactivated members, bot accounts, blank ids and members without a usable
/// display name are ineligible.
pub fn to_candidate(entry: DirectoryEntry) -> Option<EmployeeCandidate> {
    if entry.deactivated || entry.bot {
        return None;
    }
    let external_id = entry.id.trim().to_string();
    if external_id.is_empty() {
        return None;
    }
    let name = non_blank(entry.display_name)?;
    Some(EmployeeCandidate {
        external_id,
        name,
        role: non_blank(entry.title),
    })
}

/// Filter and map a full run's entries.
///
/// A provider may repeat a member across pages while its listing shifts.
/// The last occurrence wins but keeps the position of the first.
pub fn normalize(entries: Vec<DirectoryEntry>) -> Normalized {
    let total = entries.len();
    let mut candidates: Vec<EmployeeCandidate> = Vec::with_capacity(total);
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(total);

    for candidate in entries.into_iter().filter_map(to_candidate) {
        match positions.get(&candidate.external_id) {
            Some(&index) => candidates[index] = candidate,
            None => {
                positions.insert(candidate.external_id.clone(), candidates.len());
                candidates.push(candidate);
            }
        }
    }

    Normalized {
        skipped: total - candidates.len(),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: Option<&str>) -> DirectoryEntry {
        DirectoryEntry {
            id: id.to_string(),
            display_name: name.map(str::to_string),
            ..DirectoryEntry::default()
        }
    }

    #[test]
    fn deleted_members_are_dropped() {
        let mut bob = entry("U2", Some("Bob"));
        bob.deactivated = true;
        let out = normalize(vec![entry("U1", Some("Ann")), bob]);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].external_id, "U1");
        assert_eq!(out.skipped, 1);
    }

    #[test]
    fn bots_and_nameless_members_are_dropped() {
        let mut bot = entry("B1", Some("Deploy Bot"));
        bot.bot = true;
        let out = normalize(vec![
            bot,
            entry("U3", None),
            entry("U4", Some("   ")),
            entry("  ", Some("No Id")),
        ]);
        assert!(out.candidates.is_empty());
        assert_eq!(out.skipped, 4);
    }

    #[test]
    fn title_maps_to_role_and_blank_title_is_absent() {
        let mut ann = entry("U1", Some(" Ann Lee "));
        ann.title = Some("Engineer".into());
        let mut bob = entry("U2", Some("Bob"));
        bob.title = Some("  ".into());

        let out = normalize(vec![ann, bob]);
        assert_eq!(
            out.candidates,
            vec![
                EmployeeCandidate {
                    external_id: "U1".into(),
                    name: "Ann Lee".into(),
                    role: Some("Engineer".into()),
                },
                EmployeeCandidate {
                    external_id: "U2".into(),
                    name: "Bob".into(),
                    role: None,
                },
            ]
        );
    }

    #[test]
    fn repeated_ids_collapse_to_last_occurrence() {
        let out = normalize(vec![
            entry("U1", Some("Ann")),
            entry("U2", Some("Bob")),
            entry("U1", Some("Ann Lee")),
        ]);
        let names: Vec<_> = out.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Ann Lee", "Bob"]);
        assert_eq!(out.skipped, 1);
    }
}
