//! Plan computation: diff a desired tree against an actual tree.

use crate::changeset::{Plan, PlanIssue, SectionChanges, UpdateOp};
use crate::collection;
use crate::error::{Error, Result};
use crate::schema::Registry;
use crate::tree::{ConfigTree, SectionState};

/// Compute the changeset needed to move `actual` to `desired`.
///
/// Sections are walked in registry (dependency) order; sections the
/// desired tree does not declare are left unmanaged. Flat sections go
/// through the resource diff directly, collections through the
/// collection reconciler. Field- and entry-level failures land in the
/// plan report; only structural problems (a desired section missing
/// from the actual tree, mismatched section layouts) fail the plan.
pub fn plan(registry: &Registry, desired: &ConfigTree, actual: &ConfigTree) -> Result<Plan> {
    let mut plan = Plan::default();

    for schema in registry.sections() {
        let Some(local) = desired.section(schema.name) else {
            continue;
        };
        let Some(remote) = actual.section(schema.name) else {
            return Err(Error::UnknownSection(schema.name.to_string()));
        };

        match (local, remote) {
            (SectionState::Flat(local), SectionState::Flat(remote)) => {
                let mut changes = SectionChanges::new(schema.name);
                match local.diff(&schema.resource, remote) {
                    Ok(diff) => {
                        for issue in diff.issues {
                            plan.report.issues.push(PlanIssue {
                                section: schema.name.to_string(),
                                entry: None,
                                field: Some(issue.field),
                                message: issue.error.to_string(),
                            });
                        }
                        if !diff.deltas.is_empty() {
                            changes.updates.push(UpdateOp {
                                name: schema.name.to_string(),
                                id: remote.id,
                                deltas: diff.deltas,
                                base: remote.clone(),
                            });
                        }
                    }
                    Err(error) => plan.report.issues.push(PlanIssue {
                        section: schema.name.to_string(),
                        entry: None,
                        field: None,
                        message: error.to_string(),
                    }),
                }
                plan.changeset.push(changes);
            }
            (
                SectionState::Collection {
                    entries: local,
                    delete_unmanaged,
                },
                SectionState::Collection {
                    entries: remote, ..
                },
            ) => {
                let (changes, issues) =
                    collection::reconcile(schema, local, remote, *delete_unmanaged);
                plan.report.issues.extend(issues);
                plan.changeset.push(changes);
            }
            _ => {
                return Err(Error::SchemaMismatch {
                    local: schema.name.to_string(),
                    remote: schema.name.to_string(),
                });
            }
        }
    }

    Ok(plan)
}
