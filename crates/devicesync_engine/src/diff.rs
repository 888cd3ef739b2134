//! Partitioning of edge and local records into a sync plan.
//!
//! Records are correlated by edge name, compared case-insensitively since
//! local names are always lowercase. The plan is a pure function of its
//! inputs so it can be checked exhaustively in isolation.

use devicesync_api::{edge_name, Resource};
use std::collections::BTreeMap;

/// What one sync round should do.
#[derive(Debug, Clone)]
pub struct SyncPlan<R> {
    /// Edge records with no local counterpart, to be created locally.
    pub create: Vec<R>,
    /// Synced local records whose edge object is gone.
    pub delete: Vec<R>,
    /// Pairs of `(local, edge)` present on both sides.
    pub update: Vec<(R, R)>,
    /// Local records that collide with another on the same edge name.
    pub duplicates: Vec<R>,
    /// Edge records that collide with another on the same folded name.
    pub edge_duplicates: Vec<R>,
}

impl<R> Default for SyncPlan<R> {
    fn default() -> Self {
        Self {
            create: Vec::new(),
            delete: Vec::new(),
            update: Vec::new(),
            duplicates: Vec::new(),
            edge_duplicates: Vec::new(),
        }
    }
}

impl<R> SyncPlan<R> {
    /// Returns true if the round has nothing to do.
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.delete.is_empty() && self.update.is_empty()
    }
}

fn correlation_key<R: Resource>(record: &R) -> String {
    edge_name(record).to_lowercase()
}

/// Indexes records by correlation key. The first record in name order
/// wins; the rest are returned separately.
fn index<R: Resource>(records: &[R]) -> (BTreeMap<String, R>, Vec<R>) {
    let mut sorted: Vec<&R> = records.iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));

    let mut primary = BTreeMap::new();
    let mut duplicates = Vec::new();
    for record in sorted {
        let key = correlation_key(record);
        if primary.contains_key(&key) {
            duplicates.push(record.clone());
        } else {
            primary.insert(key, record.clone());
        }
    }
    (primary, duplicates)
}

/// Computes the plan for one round.
///
/// - every edge record lands in exactly one of `create` or `update`
/// - only synced local records are deleted; an unsynced one may still be
///   waiting for its first push
/// - duplicates are never deleted or updated
pub fn plan<R: Resource>(edge: &[R], local: &[R]) -> SyncPlan<R> {
    let (edge, edge_duplicates) = index(edge);
    let (mut local, duplicates) = index(local);

    let mut plan = SyncPlan {
        duplicates,
        edge_duplicates,
        ..SyncPlan::default()
    };
    for (key, remote) in edge {
        match local.remove(&key) {
            Some(existing) => plan.update.push((existing, remote)),
            None => plan.create.push(remote),
        }
    }
    plan.delete = local.into_values().filter(|r| r.is_synced()).collect();
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use devicesync_api::{Device, IsSynced, EDGE_OBJECT_NAME_LABEL};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn remote(name: &str) -> Device {
        let mut d = Device::new("default", format!("p-{}", name.to_lowercase()));
        d.metadata
            .labels
            .insert(EDGE_OBJECT_NAME_LABEL.to_string(), name.to_string());
        d.status.synced = true;
        d
    }

    fn local(name: &str, synced: bool) -> Device {
        let mut d = remote(name);
        d.status.synced = synced;
        d
    }

    #[test]
    fn partitions_by_edge_name() {
        let edge = vec![remote("Sensor-1"), remote("lamp")];
        let local = vec![local("lamp", true), local("gone", true), local("pending", false)];

        let plan = plan(&edge, &local);
        assert_eq!(plan.create.len(), 1);
        assert_eq!(edge_name(&plan.create[0]), "Sensor-1");
        assert_eq!(plan.update.len(), 1);
        assert_eq!(plan.delete.len(), 1);
        assert_eq!(edge_name(&plan.delete[0]), "gone");
    }

    #[test]
    fn local_name_without_label_correlates() {
        let edge = vec![remote("Lamp")];
        let local = vec![Device::new("default", "lamp")];

        let plan = plan(&edge, &local);
        assert!(plan.create.is_empty());
        assert_eq!(plan.update.len(), 1);
    }

    #[test]
    fn duplicates_are_excluded() {
        let mut second = Device::new("default", "z-other");
        second
            .metadata
            .labels
            .insert(EDGE_OBJECT_NAME_LABEL.to_string(), "lamp".to_string());
        second.status.synced = true;
        let local = vec![local("lamp", true), second];

        let plan = plan(&[], &local);
        assert_eq!(plan.duplicates.len(), 1);
        assert_eq!(plan.duplicates[0].metadata.name, "z-other");
        assert_eq!(plan.delete.len(), 1);
        assert_eq!(plan.delete[0].metadata.name, "p-lamp");
    }

    fn names() -> impl Strategy<Value = BTreeSet<String>> {
        prop::collection::btree_set("[a-z]{1,6}", 0..12)
    }

    proptest! {
        #[test]
        fn plan_is_a_partition(
            edge_names in names(),
            local_names in names(),
            synced in prop::collection::vec(any::<bool>(), 12),
        ) {
            let edge: Vec<Device> = edge_names.iter().map(|n| remote(n)).collect();
            let local: Vec<Device> = local_names
                .iter()
                .enumerate()
                .map(|(i, n)| local(n, synced[i]))
                .collect();

            let plan = plan(&edge, &local);

            let created: BTreeSet<String> =
                plan.create.iter().map(|r| edge_name(r).to_string()).collect();
            let updated: BTreeSet<String> =
                plan.update.iter().map(|(_, r)| edge_name(r).to_string()).collect();
            let deleted: BTreeSet<String> =
                plan.delete.iter().map(|r| edge_name(r).to_string()).collect();

            let both: BTreeSet<String> = edge_names.intersection(&local_names).cloned().collect();
            let seen: BTreeSet<String> = created.union(&updated).cloned().collect();

            prop_assert!(created.is_disjoint(&updated));
            prop_assert_eq!(&seen, &edge_names);
            prop_assert_eq!(&updated, &both);
            prop_assert!(deleted.is_disjoint(&edge_names));
            prop_assert!(plan.delete.iter().all(|r| r.is_synced()));
            for (i, n) in local_names.iter().enumerate() {
                if !edge_names.contains(n) {
                    prop_assert_eq!(deleted.contains(n), synced[i]);
                }
            }
        }
    }
}
