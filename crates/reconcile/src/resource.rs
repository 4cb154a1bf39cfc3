//! Resource model: a structured bundle of field values.
//!
//! A [`Resource`] holds the values for one configuration section or one
//! entry in a named collection. Resources fetched from the remote also
//! carry their numeric identity and the raw wire document they were
//! decoded from, so updates can merge field deltas into the remote's
//! own representation instead of synthesizing a fresh object.

use crate::error::Error;
use crate::field::FieldChange;
use crate::schema::ResourceSchema;
use crate::value::Value;
use std::collections::BTreeMap;

/// One field-level difference between a local and a remote resource.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDelta {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

/// A per-field failure encountered while diffing a resource. Collected
/// into the plan report; never silently dropped.
#[derive(Debug)]
pub struct FieldIssue {
    pub field: String,
    pub error: Error,
}

/// Result of diffing two resources of the same shape.
#[derive(Debug, Default)]
pub struct ResourceDiff {
    pub deltas: Vec<FieldDelta>,
    pub issues: Vec<FieldIssue>,
}

impl ResourceDiff {
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// A bundle of field values for one resource kind.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    /// Kind name; must match the schema this resource is diffed under.
    pub kind: String,
    values: BTreeMap<String, Value>,
    /// Remote identity, present on fetched resources.
    pub id: Option<i64>,
    /// Raw remote document this resource was decoded from, if any.
    pub wire: Option<serde_json::Value>,
}

impl Resource {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            values: BTreeMap::new(),
            id: None,
            wire: None,
        }
    }

    /// Builder-style field assignment, mainly for tests and parsing.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Value of a field; absent fields read as null.
    pub fn get(&self, name: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(name).unwrap_or(&NULL)
    }

    pub fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Materialize defaults for every schema field the resource does
    /// not carry yet, so all resources of a kind share one shape.
    pub fn fill_defaults(&mut self, schema: &ResourceSchema) {
        for field in &schema.fields {
            if !self.values.contains_key(field.name) {
                self.values
                    .insert(field.name.to_string(), field.default.materialize());
            }
        }
    }

    /// Per-field diff against a remote resource of the same shape.
    ///
    /// Walks the schema's declared field order. Fields whose comparison
    /// fails are recorded as issues and excluded from the deltas; a
    /// shape mismatch fails the whole diff with
    /// [`Error::SchemaMismatch`].
    pub fn diff(
        &self,
        schema: &ResourceSchema,
        remote: &Resource,
    ) -> Result<ResourceDiff, Error> {
        if self.kind != remote.kind {
            return Err(Error::SchemaMismatch {
                local: self.kind.clone(),
                remote: remote.kind.clone(),
            });
        }

        let mut diff = ResourceDiff::default();
        for field in &schema.fields {
            let local = self.get(field.name);
            let remote_value = remote.get(field.name);
            match field.compare(local, remote_value) {
                Ok(FieldChange::Unchanged) => {
                    log::debug!(
                        "{}.{}: {} (up to date)",
                        schema.kind,
                        field.name,
                        field.display(local)
                    );
                }
                Ok(FieldChange::Changed(new)) => {
                    log::debug!(
                        "{}.{}: {} -> {}",
                        schema.kind,
                        field.name,
                        field.display(remote_value),
                        field.display(&new)
                    );
                    diff.deltas.push(FieldDelta {
                        field: field.name.to_string(),
                        old: remote_value.clone(),
                        new,
                    });
                }
                Err(error) => diff.issues.push(FieldIssue {
                    field: field.name.to_string(),
                    error,
                }),
            }
        }
        Ok(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDefault, FieldKind, FieldSchema};

    fn profile_schema() -> ResourceSchema {
        ResourceSchema::new(
            "sync_profile",
            vec![
                FieldSchema::new("enable_rss", "enableRss", FieldKind::Bool)
                    .with_default(FieldDefault::Bool(true)),
                FieldSchema::new("minimum_seeders", "minimumSeeders", FieldKind::Int)
                    .with_default(FieldDefault::Int(1)),
            ],
        )
    }

    #[test]
    fn test_diff_reports_changed_fields_only() {
        let schema = profile_schema();
        let local = Resource::new("sync_profile")
            .with("enable_rss", true)
            .with("minimum_seeders", 1i64);
        let remote = Resource::new("sync_profile")
            .with("enable_rss", false)
            .with("minimum_seeders", 1i64);

        let diff = local.diff(&schema, &remote).unwrap();
        assert_eq!(diff.deltas.len(), 1);
        assert_eq!(diff.deltas[0].field, "enable_rss");
        assert_eq!(diff.deltas[0].old, Value::Bool(false));
        assert_eq!(diff.deltas[0].new, Value::Bool(true));
    }

    #[test]
    fn test_diff_identical_is_empty() {
        let schema = profile_schema();
        let resource = Resource::new("sync_profile")
            .with("enable_rss", true)
            .with("minimum_seeders", 4i64);
        let diff = resource.diff(&schema, &resource.clone()).unwrap();
        assert!(diff.is_empty());
        assert!(diff.issues.is_empty());
    }

    #[test]
    fn test_diff_shape_mismatch() {
        let schema = profile_schema();
        let local = Resource::new("sync_profile");
        let remote = Resource::new("indexer");
        assert!(matches!(
            local.diff(&schema, &remote),
            Err(Error::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_diff_collects_field_issues() {
        let schema = profile_schema();
        let local = Resource::new("sync_profile")
            .with("enable_rss", true)
            .with("minimum_seeders", 1i64);
        let mut remote = local.clone();
        remote.set(
            "minimum_seeders",
            Value::StringList(vec!["not a number".into()]),
        );

        let diff = local.diff(&schema, &remote).unwrap();
        assert!(diff.deltas.is_empty());
        assert_eq!(diff.issues.len(), 1);
        assert_eq!(diff.issues[0].field, "minimum_seeders");
    }

    #[test]
    fn test_fill_defaults() {
        let schema = profile_schema();
        let mut resource = Resource::new("sync_profile").with("enable_rss", false);
        resource.fill_defaults(&schema);
        assert_eq!(resource.get("enable_rss"), &Value::Bool(false));
        assert_eq!(resource.get("minimum_seeders"), &Value::Int(1));
    }
}
