//! Merging the local prompt set with a remote listing.
//!
//! The policy is remote-wins-wholesale: whenever the remote listing is
//! available it becomes the prompt set. [`merge`] makes that policy explicit
//! and reports what the overwrite throws away, without resolving anything.

use crate::models::Prompt;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// A local prompt that the remote listing overwrites or drops.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conflict {
    /// Present locally, absent from the remote listing.
    LocalOnly { id: String },
    /// The local copy was updated after the remote copy replacing it.
    LocalNewer {
        id: String,
        local_updated_at: DateTime<Utc>,
        remote_updated_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    /// The prompt set to adopt, most recently updated first.
    pub merged: Vec<Prompt>,
    /// Sorted by prompt id so repeated merges log identically.
    pub conflicts: Vec<Conflict>,
}

pub fn merge(local: &[Prompt], remote: Vec<Prompt>) -> Merge {
    let remote_by_id: HashMap<&str, &Prompt> = remote.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut conflicts: Vec<Conflict> = local
        .iter()
        .filter_map(|mine| match remote_by_id.get(mine.id.as_str()) {
            None => Some(Conflict::LocalOnly { id: mine.id.clone() }),
            Some(theirs) if mine.updated_at > theirs.updated_at => Some(Conflict::LocalNewer {
                id: mine.id.clone(),
                local_updated_at: mine.updated_at,
                remote_updated_at: theirs.updated_at,
            }),
            Some(_) => None,
        })
        .collect();
    conflicts.sort_by(|a, b| conflict_id(a).cmp(conflict_id(b)));

    let mut merged = remote;
    merged.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));

    Merge { merged, conflicts }
}

fn conflict_id(conflict: &Conflict) -> &str {
    match conflict {
        Conflict::LocalOnly { id } | Conflict::LocalNewer { id, .. } => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::next_timestamp;

    fn prompt(id: &str, title: &str) -> Prompt {
        let mut p = Prompt::new("u1".into(), title.into(), "".into(), None);
        p.id = id.into();
        p
    }

    #[test]
    fn remote_replaces_local_wholesale() {
        let local = vec![prompt("a", "local a")];
        let mut remote_a = prompt("a", "remote a");
        remote_a.updated_at = next_timestamp(local[0].updated_at);
        let remote = vec![remote_a.clone(), prompt("b", "remote b")];

        let result = merge(&local, remote);
        assert_eq!(result.merged.len(), 2);
        assert!(result.merged.iter().any(|p| p == &remote_a));
        assert!(result.conflicts.is_empty());
    }

    #[test]
    fn reports_local_only_and_local_newer() {
        let stale_remote = prompt("a", "remote");
        let mut newer_local = stale_remote.clone();
        newer_local.title = "edited offline".into();
        newer_local.updated_at = next_timestamp(stale_remote.updated_at);
        let local = vec![prompt("z", "never synced"), newer_local.clone()];

        let result = merge(&local, vec![stale_remote.clone()]);

        assert_eq!(result.merged, vec![stale_remote.clone()]);
        assert_eq!(
            result.conflicts,
            vec![
                Conflict::LocalNewer {
                    id: "a".into(),
                    local_updated_at: newer_local.updated_at,
                    remote_updated_at: stale_remote.updated_at,
                },
                Conflict::LocalOnly { id: "z".into() },
            ]
        );
    }

    #[test]
    fn merged_is_sorted_newest_first() {
        let older = prompt("a", "older");
        let mut newer = prompt("b", "newer");
        newer.updated_at = next_timestamp(older.updated_at);

        let result = merge(&[], vec![older.clone(), newer.clone()]);
        assert_eq!(result.merged, vec![newer, older]);
    }
}
