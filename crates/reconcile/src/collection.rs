//! Named collections and the collection reconciler.
//!
//! A [`NamedCollection`] is a keyed set of resources (all download
//! clients, all indexers, ...) with unique display names and preserved
//! document order. The reconciler matches local entries to remote
//! entries by key under the section's [`KeyRule`], then classifies each
//! as create, update, or delete.

use crate::changeset::{CreateOp, DeleteOp, PlanIssue, SectionChanges, UpdateOp};
use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::schema::{KeyRule, SectionSchema};

/// A keyed set of resources with unique names and stable order.
#[derive(Debug, Clone, Default)]
pub struct NamedCollection {
    entries: Vec<(String, Resource)>,
    key_rule: KeyRule,
}

impl NamedCollection {
    pub fn new(key_rule: KeyRule) -> Self {
        Self {
            entries: Vec::new(),
            key_rule,
        }
    }

    /// Insert an entry, rejecting keys that collide under the key rule.
    pub fn insert(&mut self, name: impl Into<String>, resource: Resource) -> Result<()> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(Error::DuplicateKey { key: name });
        }
        self.entries.push((name, resource));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.entries
            .iter()
            .find(|(k, _)| self.key_rule.matches(k, name))
            .map(|(_, r)| r)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Entries in insertion (document) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Resource)> {
        self.entries.iter().map(|(k, r)| (k.as_str(), r))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reconcile a local collection against the remote one.
///
/// Partition keys into local-only (creates), remote-only (deletes,
/// gated by `delete_unmanaged`), and both (updates where the diff is
/// non-empty). Creates keep document order, deletes keep remote order,
/// so repeated runs produce identical output.
///
/// Entries whose diff fails are skipped and recorded as issues; field
/// comparison failures inside an otherwise diffable pair likewise.
pub fn reconcile(
    schema: &SectionSchema,
    local: &NamedCollection,
    remote: &NamedCollection,
    delete_unmanaged: bool,
) -> (SectionChanges, Vec<PlanIssue>) {
    let mut changes = SectionChanges::new(schema.name);
    let mut issues = Vec::new();

    for (name, resource) in local.iter() {
        match remote.get(name) {
            None => changes.creates.push(CreateOp {
                name: name.to_string(),
                resource: resource.clone(),
            }),
            Some(remote_resource) => match resource.diff(&schema.resource, remote_resource) {
                Ok(diff) => {
                    for issue in diff.issues {
                        issues.push(PlanIssue {
                            section: schema.name.to_string(),
                            entry: Some(name.to_string()),
                            field: Some(issue.field),
                            message: issue.error.to_string(),
                        });
                    }
                    if !diff.deltas.is_empty() {
                        changes.updates.push(UpdateOp {
                            name: name.to_string(),
                            id: remote_resource.id,
                            deltas: diff.deltas,
                            base: remote_resource.clone(),
                        });
                    }
                }
                Err(error) => issues.push(PlanIssue {
                    section: schema.name.to_string(),
                    entry: Some(name.to_string()),
                    field: None,
                    message: error.to_string(),
                }),
            },
        }
    }

    for (name, resource) in remote.iter() {
        if local.contains(name) {
            continue;
        }
        if delete_unmanaged {
            changes.deletes.push(DeleteOp {
                name: name.to_string(),
                id: resource.id,
            });
        } else {
            log::debug!("{}['{}']: unmanaged, retained", schema.name, name);
        }
    }

    (changes, issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDefault, FieldKind, FieldSchema};
    use crate::schema::ResourceSchema;

    fn section() -> SectionSchema {
        SectionSchema::collection(
            "sync_profiles",
            "appprofile",
            ResourceSchema::new(
                "sync_profile",
                vec![
                    FieldSchema::new("enable_rss", "enableRss", FieldKind::Bool)
                        .with_default(FieldDefault::Bool(true)),
                    FieldSchema::new("minimum_seeders", "minimumSeeders", FieldKind::Int)
                        .with_default(FieldDefault::Int(1)),
                ],
            ),
        )
    }

    fn profile(enable_rss: bool, seeders: i64) -> Resource {
        Resource::new("sync_profile")
            .with("enable_rss", enable_rss)
            .with("minimum_seeders", seeders)
    }

    fn collection(entries: Vec<(&str, Resource)>) -> NamedCollection {
        let mut c = NamedCollection::new(KeyRule::TRIMMED);
        for (name, resource) in entries {
            c.insert(name, resource).unwrap();
        }
        c
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let mut c = NamedCollection::new(KeyRule::TRIMMED);
        c.insert("Standard", profile(true, 1)).unwrap();
        assert!(matches!(
            c.insert("Standard ", profile(true, 1)),
            Err(Error::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_partition_create_update_delete() {
        // Local {A, B} vs remote {B', C}: one create, one update, one
        // delete, in that order.
        let local = collection(vec![("A", profile(true, 1)), ("B", profile(true, 2))]);
        let remote = collection(vec![
            ("B", profile(false, 2).with_id(11)),
            ("C", profile(true, 3).with_id(12)),
        ]);

        let (changes, issues) = reconcile(&section(), &local, &remote, true);
        assert!(issues.is_empty());
        assert_eq!(changes.creates.len(), 1);
        assert_eq!(changes.creates[0].name, "A");
        assert_eq!(changes.updates.len(), 1);
        assert_eq!(changes.updates[0].name, "B");
        assert_eq!(changes.updates[0].id, Some(11));
        assert_eq!(changes.updates[0].deltas.len(), 1);
        assert_eq!(changes.updates[0].deltas[0].field, "enable_rss");
        assert_eq!(changes.deletes.len(), 1);
        assert_eq!(changes.deletes[0].name, "C");
        assert_eq!(changes.deletes[0].id, Some(12));
    }

    #[test]
    fn test_unchanged_pairs_are_dropped() {
        let local = collection(vec![("Standard", profile(true, 1))]);
        let remote = collection(vec![("Standard", profile(true, 1).with_id(1))]);
        let (changes, issues) = reconcile(&section(), &local, &remote, true);
        assert!(changes.is_empty());
        assert!(issues.is_empty());
    }

    #[test]
    fn test_delete_unmanaged_gate() {
        // With the gate off, remote-only entries are retained no matter
        // how many there are.
        let local = collection(vec![]);
        let remote = collection(vec![
            ("One", profile(true, 1).with_id(1)),
            ("Two", profile(true, 1).with_id(2)),
            ("Three", profile(true, 1).with_id(3)),
        ]);
        let (changes, _) = reconcile(&section(), &local, &remote, false);
        assert!(changes.deletes.is_empty());
        assert!(changes.is_empty());

        let (changes, _) = reconcile(&section(), &local, &remote, true);
        assert_eq!(changes.deletes.len(), 3);
    }

    #[test]
    fn test_key_rule_prevents_spurious_pairs() {
        // Same entry, surrounding whitespace differs: must match as one
        // entry, not produce a create+delete pair.
        let local = collection(vec![("Standard", profile(true, 1))]);
        let remote = collection(vec![(" Standard", profile(true, 1).with_id(1))]);
        let (changes, _) = reconcile(&section(), &local, &remote, true);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_creates_keep_document_order() {
        let local = collection(vec![
            ("Zebra", profile(true, 1)),
            ("Alpha", profile(true, 1)),
            ("Mid", profile(true, 1)),
        ]);
        let remote = collection(vec![]);
        let (changes, _) = reconcile(&section(), &local, &remote, false);
        let names: Vec<&str> = changes.creates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Zebra", "Alpha", "Mid"]);
    }

    #[test]
    fn test_scenario_single_field_update() {
        let local = collection(vec![("Standard", profile(true, 1))]);
        let remote = collection(vec![("Standard", profile(false, 1).with_id(7))]);
        let (changes, _) = reconcile(&section(), &local, &remote, false);
        assert_eq!(changes.total(), 1);
        let update = &changes.updates[0];
        assert_eq!(update.deltas.len(), 1);
        let delta = &update.deltas[0];
        assert_eq!(delta.field, "enable_rss");
        assert_eq!(delta.old, crate::value::Value::Bool(false));
        assert_eq!(delta.new, crate::value::Value::Bool(true));
    }
}
