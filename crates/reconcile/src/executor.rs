//! Changeset application and convergence verification.
//!
//! Operations are applied independently: a failure is recorded against
//! its operation and the remaining operations still run. Re-running a
//! reconciliation is always safe, so callers retry failed operations by
//! simply running again.

use crate::changeset::Changeset;
use crate::client::RemoteClient;
use crate::error::{Error, RemoteError, Result};
use crate::planner;
use crate::schema::Registry;
use crate::tree::ConfigTree;

/// Kind of a single applied operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

impl OpKind {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Outcome of one operation.
#[derive(Debug)]
pub struct OpRecord {
    pub section: String,
    pub kind: OpKind,
    pub name: String,
    /// Present when the operation failed.
    pub error: Option<RemoteError>,
}

impl OpRecord {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate result of applying a changeset.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub records: Vec<OpRecord>,
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub failed: usize,
}

impl ApplyOutcome {
    /// True only when every operation succeeded.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    fn record(&mut self, record: OpRecord) {
        match (&record.error, record.kind) {
            (Some(_), _) => self.failed += 1,
            (None, OpKind::Create) => self.created += 1,
            (None, OpKind::Update) => self.updated += 1,
            (None, OpKind::Delete) => self.deleted += 1,
        }
        self.records.push(record);
    }
}

/// Progress callback for apply operations.
pub trait ApplyProgress {
    fn on_op_start(&mut self, section: &str, kind: OpKind, name: &str);
    fn on_op_complete(&mut self, record: &OpRecord);
}

/// No-op progress callback.
pub struct NoProgress;

impl ApplyProgress for NoProgress {
    fn on_op_start(&mut self, _section: &str, _kind: OpKind, _name: &str) {}
    fn on_op_complete(&mut self, _record: &OpRecord) {}
}

/// Fetch the current remote state of every section the desired tree
/// declares, producing a fresh actual tree.
pub fn fetch_actual(
    registry: &Registry,
    desired: &ConfigTree,
    client: &dyn RemoteClient,
) -> Result<ConfigTree> {
    let mut actual = ConfigTree::new();
    for schema in registry.sections() {
        if desired.section(schema.name).is_none() {
            continue;
        }
        let state = client.fetch_section(schema)?;
        actual.insert(schema.name, state)?;
    }
    Ok(actual)
}

/// Apply a changeset against the remote.
///
/// Creates and updates walk sections in registry (dependency) order;
/// deletes run afterwards in reverse order, so resources referenced
/// across sections (tags) exist before anything points at them and
/// disappear only after nothing does.
pub fn apply(
    registry: &Registry,
    changeset: &Changeset,
    client: &dyn RemoteClient,
    progress: &mut dyn ApplyProgress,
) -> Result<ApplyOutcome> {
    let mut outcome = ApplyOutcome::default();

    for changes in &changeset.sections {
        let schema = registry
            .section(&changes.section)
            .ok_or_else(|| Error::UnknownSection(changes.section.clone()))?;

        for op in &changes.creates {
            progress.on_op_start(schema.name, OpKind::Create, &op.name);
            let result = client.create(schema, op).map(|id| {
                log::info!(
                    "{}['{}']: created{}",
                    schema.name,
                    op.name,
                    id.map(|id| format!(" (id {id})")).unwrap_or_default()
                );
            });
            let record = finish(schema.name, OpKind::Create, &op.name, result);
            progress.on_op_complete(&record);
            outcome.record(record);
        }
        for op in &changes.updates {
            progress.on_op_start(schema.name, OpKind::Update, &op.name);
            let result = client.update(schema, op).map(|()| {
                log::info!(
                    "{}['{}']: updated ({} field(s))",
                    schema.name,
                    op.name,
                    op.deltas.len()
                );
            });
            let record = finish(schema.name, OpKind::Update, &op.name, result);
            progress.on_op_complete(&record);
            outcome.record(record);
        }
    }

    for changes in changeset.sections.iter().rev() {
        let schema = registry
            .section(&changes.section)
            .ok_or_else(|| Error::UnknownSection(changes.section.clone()))?;

        for op in &changes.deletes {
            progress.on_op_start(schema.name, OpKind::Delete, &op.name);
            let result = client.delete(schema, op).map(|()| {
                log::info!("{}['{}']: deleted", schema.name, op.name);
            });
            let record = finish(schema.name, OpKind::Delete, &op.name, result);
            progress.on_op_complete(&record);
            outcome.record(record);
        }
    }

    Ok(outcome)
}

fn finish(
    section: &str,
    kind: OpKind,
    name: &str,
    result: std::result::Result<(), RemoteError>,
) -> OpRecord {
    if let Err(error) = &result {
        log::warn!("{}['{}']: {} failed: {}", section, name, kind.verb(), error);
    }
    OpRecord {
        section: section.to_string(),
        kind,
        name: name.to_string(),
        error: result.err(),
    }
}

/// Re-fetch remote state and re-plan to confirm convergence.
///
/// A non-empty residual changeset means the remote rejected or silently
/// altered a change; that is surfaced as [`Error::ConvergenceFailure`]
/// and never retried automatically.
pub fn verify(
    registry: &Registry,
    desired: &ConfigTree,
    client: &dyn RemoteClient,
) -> Result<()> {
    let actual = fetch_actual(registry, desired, client)?;
    let plan = planner::plan(registry, desired, &actual)?;
    if plan.is_empty() {
        Ok(())
    } else {
        Err(Error::ConvergenceFailure {
            remaining: plan.changeset.total_ops(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changeset::{CreateOp, DeleteOp, UpdateOp};
    use crate::collection::NamedCollection;
    use crate::field::{FieldDefault, FieldKind, FieldSchema};
    use crate::resource::Resource;
    use crate::schema::{ResourceSchema, SectionSchema};
    use crate::tree::SectionState;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    fn registry() -> Registry {
        Registry::new(vec![
            SectionSchema::collection("tags", "tag", ResourceSchema::new("tag", Vec::new())),
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
            ),
        ])
        .unwrap()
    }

    /// In-memory remote covering the fetch/create/update/delete
    /// contract, with optional per-entry rejection.
    struct FakeRemote {
        sections: RefCell<BTreeMap<String, Vec<(String, Resource)>>>,
        next_id: RefCell<i64>,
        reject_names: Vec<String>,
        op_log: RefCell<Vec<String>>,
    }

    impl FakeRemote {
        fn new(profiles: Vec<(&str, Resource)>) -> Self {
            let mut sections = BTreeMap::new();
            sections.insert("tags".to_string(), Vec::new());
            sections.insert(
                "sync_profiles".to_string(),
                profiles
                    .into_iter()
                    .enumerate()
                    .map(|(i, (name, r))| (name.to_string(), r.with_id(i as i64 + 1)))
                    .collect(),
            );
            Self {
                sections: RefCell::new(sections),
                next_id: RefCell::new(100),
                reject_names: Vec::new(),
                op_log: RefCell::new(Vec::new()),
            }
        }

        fn rejecting(mut self, name: &str) -> Self {
            self.reject_names.push(name.to_string());
            self
        }

        fn check_reject(&self, name: &str) -> std::result::Result<(), RemoteError> {
            if self.reject_names.iter().any(|n| n == name) {
                Err(RemoteError::Rejected {
                    message: format!("'{name}' failed validation"),
                    status: Some(400),
                })
            } else {
                Ok(())
            }
        }
    }

    impl RemoteClient for FakeRemote {
        fn fetch_section(
            &self,
            section: &SectionSchema,
        ) -> std::result::Result<SectionState, RemoteError> {
            let sections = self.sections.borrow();
            let entries = sections.get(section.name).cloned().unwrap_or_default();
            let mut collection = NamedCollection::new(section.key_rule);
            for (name, resource) in entries {
                collection
                    .insert(name, resource)
                    .map_err(|e| RemoteError::Rejected {
                        message: e.to_string(),
                        status: None,
                    })?;
            }
            Ok(SectionState::Collection {
                entries: collection,
                delete_unmanaged: false,
            })
        }

        fn create(
            &self,
            section: &SectionSchema,
            op: &CreateOp,
        ) -> std::result::Result<Option<i64>, RemoteError> {
            self.op_log
                .borrow_mut()
                .push(format!("create {}:{}", section.name, op.name));
            self.check_reject(&op.name)?;
            let id = {
                let mut next = self.next_id.borrow_mut();
                *next += 1;
                *next
            };
            let mut resource = op.resource.clone();
            resource.id = Some(id);
            self.sections
                .borrow_mut()
                .entry(section.name.to_string())
                .or_default()
                .push((op.name.clone(), resource));
            Ok(Some(id))
        }

        fn update(&self, section: &SectionSchema, op: &UpdateOp) -> std::result::Result<(), RemoteError> {
            self.op_log
                .borrow_mut()
                .push(format!("update {}:{}", section.name, op.name));
            self.check_reject(&op.name)?;
            let mut sections = self.sections.borrow_mut();
            let entries = sections.get_mut(section.name).unwrap();
            let entry = entries
                .iter_mut()
                .find(|(name, _)| name == &op.name)
                .ok_or_else(|| RemoteError::Rejected {
                    message: format!("no such entry '{}'", op.name),
                    status: Some(404),
                })?;
            for delta in &op.deltas {
                entry.1.set(delta.field.clone(), delta.new.clone());
            }
            Ok(())
        }

        fn delete(&self, section: &SectionSchema, op: &DeleteOp) -> std::result::Result<(), RemoteError> {
            self.op_log
                .borrow_mut()
                .push(format!("delete {}:{}", section.name, op.name));
            self.check_reject(&op.name)?;
            self.sections
                .borrow_mut()
                .get_mut(section.name)
                .unwrap()
                .retain(|(name, _)| name != &op.name);
            Ok(())
        }
    }

    fn profile(enable_rss: bool, seeders: i64) -> Resource {
        Resource::new("sync_profile")
            .with("enable_rss", enable_rss)
            .with("minimum_seeders", seeders)
    }

    fn desired(
        registry: &Registry,
        profiles: Vec<(&str, Resource)>,
        delete_unmanaged: bool,
    ) -> ConfigTree {
        let rule = registry.section("sync_profiles").unwrap().key_rule;
        let mut entries = NamedCollection::new(rule);
        for (name, resource) in profiles {
            entries.insert(name, resource).unwrap();
        }
        let mut tree = ConfigTree::new();
        tree.insert(
            "sync_profiles",
            SectionState::Collection {
                entries,
                delete_unmanaged,
            },
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_apply_then_replan_is_empty() {
        let registry = registry();
        let remote = FakeRemote::new(vec![("Standard", profile(false, 1))]);
        let desired = desired(
            &registry,
            vec![("Standard", profile(true, 1)), ("Anime", profile(true, 3))],
            true,
        );

        let actual = fetch_actual(&registry, &desired, &remote).unwrap();
        let plan = planner::plan(&registry, &desired, &actual).unwrap();
        assert_eq!(plan.changeset.total_ops(), 2);

        let outcome = apply(&registry, &plan.changeset, &remote, &mut NoProgress).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.updated, 1);

        // Idempotence: a second plan against freshly fetched state is
        // empty, and verification agrees.
        let actual = fetch_actual(&registry, &desired, &remote).unwrap();
        let replan = planner::plan(&registry, &desired, &actual).unwrap();
        assert!(replan.is_empty());
        verify(&registry, &desired, &remote).unwrap();
    }

    #[test]
    fn test_partial_failure_does_not_abort() {
        let registry = registry();
        let remote = FakeRemote::new(vec![]).rejecting("Bad");
        let desired = desired(
            &registry,
            vec![("Bad", profile(true, 1)), ("Good", profile(true, 1))],
            false,
        );

        let actual = fetch_actual(&registry, &desired, &remote).unwrap();
        let plan = planner::plan(&registry, &desired, &actual).unwrap();
        let outcome = apply(&registry, &plan.changeset, &remote, &mut NoProgress).unwrap();

        assert!(!outcome.is_success());
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.created, 1);
        let failed: Vec<&OpRecord> =
            outcome.records.iter().filter(|r| !r.is_success()).collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].name, "Bad");
        assert!(matches!(
            failed[0].error,
            Some(RemoteError::Rejected { .. })
        ));
    }

    #[test]
    fn test_deletes_run_last_in_reverse_section_order() {
        let registry = registry();
        let remote = FakeRemote::new(vec![("Old", profile(true, 1))]);
        // Also seed an unmanaged tag so both sections produce a delete.
        remote
            .sections
            .borrow_mut()
            .get_mut("tags")
            .unwrap()
            .push(("stale".to_string(), Resource::new("tag").with_id(50)));

        let rule = registry.section("tags").unwrap().key_rule;
        let mut desired = desired(&registry, vec![("New", profile(true, 1))], true);
        desired
            .insert(
                "tags",
                SectionState::Collection {
                    entries: NamedCollection::new(rule),
                    delete_unmanaged: true,
                },
            )
            .unwrap();

        let actual = fetch_actual(&registry, &desired, &remote).unwrap();
        let plan = planner::plan(&registry, &desired, &actual).unwrap();
        apply(&registry, &plan.changeset, &remote, &mut NoProgress).unwrap();

        let log = remote.op_log.borrow().clone();
        assert_eq!(
            log,
            vec![
                "create sync_profiles:New",
                "delete sync_profiles:Old",
                "delete tags:stale",
            ]
        );
    }

    #[test]
    fn test_verify_reports_convergence_failure() {
        let registry = registry();
        let remote = FakeRemote::new(vec![("Standard", profile(false, 1))]);
        let desired = desired(&registry, vec![("Standard", profile(true, 1))], false);

        // Nothing applied yet, so verification must flag the residue.
        let err = verify(&registry, &desired, &remote).unwrap_err();
        assert!(matches!(
            err,
            Error::ConvergenceFailure { remaining: 1 }
        ));
    }
}
