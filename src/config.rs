//! Configuration documents.
//!
//! A document declares one or more target instances and, per instance,
//! the desired settings tree. Documents are YAML (JSON parses fine too,
//! being a YAML subset). Parsing validates values against the schema
//! registry so the engine only ever sees type-correct trees; the
//! inverse mapping serializes fetched state for `arrctl dump`.

use anyhow::{Context, Result, bail};
use reconcile::{
    ConfigTree, FieldSchema, NamedCollection, Registry, Resource, SectionSchema, SectionState,
    Value,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default document path (~/.config/arrctl/arrctl.yml).
pub fn default_document_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("arrctl").join("arrctl.yml"))
}

/// A parsed configuration document.
#[derive(Debug, Deserialize)]
pub struct Document {
    pub instances: BTreeMap<String, InstanceConfig>,
}

/// Connection details and desired settings for one instance.
#[derive(Debug, Deserialize)]
pub struct InstanceConfig {
    /// Instance URL, e.g. "http://localhost:9696".
    pub host_url: String,

    /// API key; probed from the instance bootstrap script when unset.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Re-fetch remote state after apply and fail on residual changes.
    #[serde(default)]
    pub verify: bool,

    /// Desired settings, validated against the schema registry.
    #[serde(default)]
    pub settings: serde_yaml::Mapping,
}

fn default_request_timeout() -> u64 {
    30
}

impl Document {
    /// Load a document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let document: Document = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid document: {}", path.display()))?;
        if document.instances.is_empty() {
            bail!("Document {} declares no instances", path.display());
        }
        Ok(document)
    }
}

impl InstanceConfig {
    /// Build the desired configuration tree from this instance's
    /// settings, validated against the registry.
    pub fn desired_tree(&self, registry: &Registry) -> Result<ConfigTree> {
        for key in self.settings.keys() {
            let name = yaml_key(key)?;
            if registry.section(name).is_none() {
                bail!("Unknown settings section '{name}'");
            }
        }

        let mut tree = ConfigTree::new();
        for schema in registry.sections() {
            let Some(raw) = self.settings.get(schema.name) else {
                continue;
            };
            let state = if schema.is_collection() {
                parse_collection(schema, raw)
                    .with_context(|| format!("In section '{}'", schema.name))?
            } else {
                let resource = parse_resource(schema, raw)
                    .with_context(|| format!("In section '{}'", schema.name))?;
                SectionState::Flat(resource)
            };
            tree.insert(schema.name, state)?;
        }
        Ok(tree)
    }
}

/// Parse a collection section: an optional `delete_unmanaged` toggle
/// plus `definitions` keyed by display name.
fn parse_collection(schema: &SectionSchema, raw: &serde_yaml::Value) -> Result<SectionState> {
    let mapping = raw
        .as_mapping()
        .with_context(|| format!("Section '{}' must be a mapping", schema.name))?;

    let mut delete_unmanaged = false;
    let mut definitions: Option<&serde_yaml::Value> = None;
    for (key, value) in mapping {
        match yaml_key(key)? {
            "delete_unmanaged" => {
                delete_unmanaged = value
                    .as_bool()
                    .context("'delete_unmanaged' must be a boolean")?;
            }
            "definitions" => definitions = Some(value),
            other => bail!("Unknown key '{other}' (expected 'delete_unmanaged' or 'definitions')"),
        }
    }

    let mut entries = NamedCollection::new(schema.key_rule);
    match definitions {
        None => {}
        // Name-only resources (tags) may be declared as a plain list.
        Some(serde_yaml::Value::Sequence(names)) if schema.resource.fields.is_empty() => {
            for name in names {
                let name = name
                    .as_str()
                    .context("Entries in a name list must be strings")?;
                entries.insert(name, Resource::new(schema.resource.kind))?;
            }
        }
        Some(serde_yaml::Value::Mapping(definitions)) => {
            for (name, raw_resource) in definitions {
                let name = yaml_key(name)?;
                let resource = parse_resource(schema, raw_resource)
                    .with_context(|| format!("In definition '{name}'"))?;
                entries.insert(name, resource)?;
            }
        }
        Some(_) => bail!("'definitions' must be a mapping of name to settings"),
    }

    Ok(SectionState::Collection {
        entries,
        delete_unmanaged,
    })
}

/// Parse one resource from a document mapping, filling defaults and
/// checking required fields.
fn parse_resource(schema: &SectionSchema, raw: &serde_yaml::Value) -> Result<Resource> {
    let mapping = raw.as_mapping().context("Expected a mapping of fields")?;

    let mut resource = Resource::new(schema.resource.kind);
    for (key, value) in mapping {
        let name = yaml_key(key)?;
        let Some(field) = schema.resource.field(name) else {
            bail!("Unknown field '{name}'");
        };
        resource.set(name.to_string(), yaml_to_value(field, value)?);
    }

    for field in &schema.resource.fields {
        if field.required && !resource.has(field.name) {
            bail!("Required field '{}' is missing", field.name);
        }
    }
    resource.fill_defaults(&schema.resource);
    Ok(resource)
}

/// Convert a document value to an engine value, validated against the
/// field's declared type.
fn yaml_to_value(field: &FieldSchema, raw: &serde_yaml::Value) -> Result<Value> {
    let value = match raw {
        // Explicit null always parses; for non-nullable fields it means
        // "leave the remote value alone", which keeps dumped documents
        // (which spell out every field) reparseable.
        serde_yaml::Value::Null => return Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Value::Bool(*b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                bail!("Field '{}' has an unrepresentable number", field.name);
            }
        }
        serde_yaml::Value::String(s) => Value::Text(s.clone()),
        serde_yaml::Value::Sequence(items) => {
            let strings: Option<Vec<String>> = items
                .iter()
                .map(|item| item.as_str().map(ToString::to_string))
                .collect();
            let strings =
                strings.with_context(|| format!("Field '{}' must list strings", field.name))?;
            Value::StringList(strings)
        }
        other => bail!(
            "Field '{}' has unsupported value type {:?}",
            field.name,
            other
        ),
    };
    // Coerce now so type errors surface against the document, not
    // against the remote during planning.
    field.coerce(&value).with_context(|| {
        format!(
            "Field '{}' is not a valid {}",
            field.name,
            field.kind.name()
        )
    })
}

// ============================================================================
// Dump
// ============================================================================

/// Serialize a fetched tree back into document settings form.
pub fn dump_settings(registry: &Registry, tree: &ConfigTree) -> serde_yaml::Mapping {
    let mut settings = serde_yaml::Mapping::new();
    for schema in registry.sections() {
        let Some(state) = tree.section(schema.name) else {
            continue;
        };
        let value = match state {
            SectionState::Flat(resource) => {
                serde_yaml::Value::Mapping(dump_resource(schema, resource))
            }
            SectionState::Collection { entries, .. } => {
                let mut section = serde_yaml::Mapping::new();
                section.insert("delete_unmanaged".into(), false.into());
                if schema.resource.fields.is_empty() {
                    let names: Vec<serde_yaml::Value> =
                        entries.iter().map(|(name, _)| name.into()).collect();
                    section.insert("definitions".into(), names.into());
                } else {
                    let mut definitions = serde_yaml::Mapping::new();
                    for (name, resource) in entries.iter() {
                        definitions.insert(
                            name.into(),
                            serde_yaml::Value::Mapping(dump_resource(schema, resource)),
                        );
                    }
                    section.insert("definitions".into(), definitions.into());
                }
                serde_yaml::Value::Mapping(section)
            }
        };
        settings.insert(schema.name.into(), value);
    }
    settings
}

/// Wrap dumped settings into a full single-instance document.
pub fn dump_document(
    instance: &str,
    host_url: &str,
    settings: serde_yaml::Mapping,
) -> serde_yaml::Value {
    let mut instance_config = serde_yaml::Mapping::new();
    instance_config.insert("host_url".into(), host_url.into());
    instance_config.insert("settings".into(), serde_yaml::Value::Mapping(settings));

    let mut instances = serde_yaml::Mapping::new();
    instances.insert(instance.into(), serde_yaml::Value::Mapping(instance_config));

    let mut document = serde_yaml::Mapping::new();
    document.insert("instances".into(), serde_yaml::Value::Mapping(instances));
    serde_yaml::Value::Mapping(document)
}

fn dump_resource(schema: &SectionSchema, resource: &Resource) -> serde_yaml::Mapping {
    let mut mapping = serde_yaml::Mapping::new();
    for field in &schema.resource.fields {
        mapping.insert(field.name.into(), value_to_yaml(resource.get(field.name)));
    }
    mapping
}

fn value_to_yaml(value: &Value) -> serde_yaml::Value {
    match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => (*b).into(),
        Value::Int(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::Text(s) => s.as_str().into(),
        Value::StringSet(items) => items
            .iter()
            .map(|s| serde_yaml::Value::from(s.as_str()))
            .collect::<Vec<_>>()
            .into(),
        Value::StringList(items) => items
            .iter()
            .map(|s| serde_yaml::Value::from(s.as_str()))
            .collect::<Vec<_>>()
            .into(),
    }
}

fn yaml_key(key: &serde_yaml::Value) -> Result<&str> {
    key.as_str().context("Keys must be strings")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;
    use reconcile::planner;
    use std::io::Write;

    const DOCUMENT: &str = r#"
instances:
  default:
    host_url: "http://localhost:9696"
    api_key: "0123456789abcdef0123456789abcdef"
    settings:
      tags:
        definitions: ["shared", "anime"]
      sync_profiles:
        delete_unmanaged: true
        definitions:
          Standard:
            enable_rss: true
            minimum_seeders: 1
      ui:
        theme: "dark"
"#;

    #[test]
    fn test_load_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCUMENT.as_bytes()).unwrap();

        let document = Document::load(file.path()).unwrap();
        let instance = &document.instances["default"];
        assert_eq!(instance.host_url, "http://localhost:9696");
        assert_eq!(instance.request_timeout, 30);
        assert!(!instance.verify);
    }

    #[test]
    fn test_load_rejects_empty_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"instances: {}\n").unwrap();
        assert!(Document::load(file.path()).is_err());
    }

    #[test]
    fn test_desired_tree_construction() {
        let document: Document = serde_yaml::from_str(DOCUMENT).unwrap();
        let tree = document.instances["default"]
            .desired_tree(schema::registry())
            .unwrap();

        let tags = tree.section("tags").unwrap().as_collection().unwrap();
        assert_eq!(tags.len(), 2);
        assert!(tags.contains("anime"));

        let profiles = tree
            .section("sync_profiles")
            .unwrap()
            .as_collection()
            .unwrap();
        let standard = profiles.get("Standard").unwrap();
        assert_eq!(standard.get("enable_rss"), &Value::Bool(true));
        // Defaults materialize for omitted fields.
        assert_eq!(
            standard.get("enable_interactive_search"),
            &Value::Bool(true)
        );

        let ui = tree.section("ui").unwrap().as_flat().unwrap();
        assert_eq!(ui.get("theme"), &Value::Text("dark".into()));
        assert_eq!(ui.get("first_day_of_week"), &Value::Int(0));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let yaml = r#"
instances:
  default:
    host_url: "http://localhost:9696"
    settings:
      quality_profiles: {}
"#;
        let document: Document = serde_yaml::from_str(yaml).unwrap();
        let err = document.instances["default"]
            .desired_tree(schema::registry())
            .unwrap_err();
        assert!(err.to_string().contains("quality_profiles"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = r#"
instances:
  default:
    host_url: "http://localhost:9696"
    settings:
      sync_profiles:
        definitions:
          Standard:
            enable_rssss: true
"#;
        let document: Document = serde_yaml::from_str(yaml).unwrap();
        assert!(
            document.instances["default"]
                .desired_tree(schema::registry())
                .is_err()
        );
    }

    #[test]
    fn test_wrongly_typed_field_rejected() {
        let yaml = r#"
instances:
  default:
    host_url: "http://localhost:9696"
    settings:
      sync_profiles:
        definitions:
          Standard:
            minimum_seeders: ["not", "a", "number"]
"#;
        let document: Document = serde_yaml::from_str(yaml).unwrap();
        assert!(
            document.instances["default"]
                .desired_tree(schema::registry())
                .is_err()
        );
    }

    #[test]
    fn test_duplicate_definitions_rejected() {
        // Same name modulo whitespace collides under the key rule.
        let yaml = r#"
instances:
  default:
    host_url: "http://localhost:9696"
    settings:
      sync_profiles:
        definitions:
          Standard:
            minimum_seeders: 1
          "Standard ":
            minimum_seeders: 2
"#;
        let document: Document = serde_yaml::from_str(yaml).unwrap();
        assert!(
            document.instances["default"]
                .desired_tree(schema::registry())
                .is_err()
        );
    }

    #[test]
    fn test_required_field_enforced() {
        let yaml = r#"
instances:
  default:
    host_url: "http://localhost:9696"
    settings:
      download_clients:
        definitions:
          Transmission:
            host: "transmission"
"#;
        let document: Document = serde_yaml::from_str(yaml).unwrap();
        let err = document.instances["default"]
            .desired_tree(schema::registry())
            .unwrap_err();
        assert!(format!("{err:#}").contains("type"));
    }

    #[test]
    fn test_dump_round_trip_plans_empty() {
        // Dump a (fetched-shaped) tree, parse it back as a document,
        // and plan against the original: no changes.
        let registry = schema::registry();
        let document: Document = serde_yaml::from_str(DOCUMENT).unwrap();
        let actual = document.instances["default"]
            .desired_tree(registry)
            .unwrap();

        let settings = dump_settings(registry, &actual);
        let dumped = dump_document("default", "http://localhost:9696", settings);
        let text = serde_yaml::to_string(&dumped).unwrap();

        let reparsed: Document = serde_yaml::from_str(&text).unwrap();
        let desired = reparsed.instances["default"]
            .desired_tree(registry)
            .unwrap();

        let plan = planner::plan(registry, &desired, &actual).unwrap();
        assert!(plan.is_empty(), "round-trip produced {:?}", plan.changeset);
    }
}
