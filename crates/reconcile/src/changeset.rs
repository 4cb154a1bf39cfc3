//! Changesets: the ordered operations produced by planning.

use crate::resource::{FieldDelta, Resource};

/// Create a resource that exists locally but not remotely.
#[derive(Debug, Clone)]
pub struct CreateOp {
    pub name: String,
    pub resource: Resource,
}

/// Update an existing remote resource with field-level deltas.
#[derive(Debug, Clone)]
pub struct UpdateOp {
    pub name: String,
    /// Remote identity; absent only for flat sections whose endpoint
    /// carries no id.
    pub id: Option<i64>,
    pub deltas: Vec<FieldDelta>,
    /// The fetched remote resource the deltas apply on top of. Carries
    /// the retained wire document so unmanaged remote attributes
    /// survive the update untouched.
    pub base: Resource,
}

/// Delete a remote resource with no local counterpart.
#[derive(Debug, Clone)]
pub struct DeleteOp {
    pub name: String,
    pub id: Option<i64>,
}

/// All operations for one section, in apply order: creates (document
/// order), then updates, then deletes.
#[derive(Debug, Clone, Default)]
pub struct SectionChanges {
    pub section: String,
    pub creates: Vec<CreateOp>,
    pub updates: Vec<UpdateOp>,
    pub deletes: Vec<DeleteOp>,
}

impl SectionChanges {
    pub fn new(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn total(&self) -> usize {
        self.creates.len() + self.updates.len() + self.deletes.len()
    }
}

/// The full set of operations needed to move remote state to desired
/// state, grouped by section in registry (dependency) order.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    pub sections: Vec<SectionChanges>,
}

impl Changeset {
    /// Add a section's changes; empty change groups are dropped.
    pub fn push(&mut self, changes: SectionChanges) {
        if !changes.is_empty() {
            self.sections.push(changes);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(SectionChanges::is_empty)
    }

    pub fn total_ops(&self) -> usize {
        self.sections.iter().map(SectionChanges::total).sum()
    }

    pub fn section(&self, name: &str) -> Option<&SectionChanges> {
        self.sections.iter().find(|s| s.section == name)
    }
}

/// A unit of work skipped or failed during planning.
#[derive(Debug)]
pub struct PlanIssue {
    pub section: String,
    /// Collection entry name, when the issue is scoped to one.
    pub entry: Option<String>,
    /// Field name, when the issue is scoped to one.
    pub field: Option<String>,
    pub message: String,
}

/// Everything planning could not turn into operations. A non-empty
/// report means parts of the desired state were not reconciled.
#[derive(Debug, Default)]
pub struct PlanReport {
    pub issues: Vec<PlanIssue>,
}

impl PlanReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Output of planning: the changeset plus the report of skipped units.
#[derive(Debug, Default)]
pub struct Plan {
    pub changeset: Changeset,
    pub report: PlanReport,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.changeset.is_empty()
    }
}
