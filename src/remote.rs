//! Production `RemoteClient` over the instance HTTP API.
//!
//! Translates between engine resources and the remote's JSON:
//! top-level camelCase attributes, the per-resource `fields` array,
//! tag labels to numeric ids, and sync-profile names to profile ids.
//! Typed resources (proxies, download clients, indexers, applications,
//! notifications) are created by seeding the remote's per-implementation
//! schema template and substituting managed values into it; updates
//! merge field deltas into the resource's retained wire document so
//! unmanaged remote attributes survive untouched.

use reconcile::{
    CreateOp, DeleteOp, FieldSchema, NamedCollection, RemoteClient, RemoteError, Resource,
    SectionSchema, SectionState, UpdateOp, Value,
};
use serde_json::{Value as Json, json};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

const API_PREFIX: &str = "api/v1";

/// Client session for one instance, exclusively owned by a single
/// reconciliation run.
pub struct InstanceClient {
    api: arrkit::ArrClient,
    /// Tag label -> id, fetched lazily and refreshed after tag writes.
    tags: RefCell<Option<HashMap<String, i64>>>,
    /// Sync profile name -> id.
    profiles: RefCell<Option<HashMap<String, i64>>>,
    /// Schema templates per endpoint.
    templates: RefCell<HashMap<String, Vec<Json>>>,
}

impl InstanceClient {
    pub fn new(host_url: &str, api_key: &str, timeout: Duration) -> Self {
        Self {
            api: arrkit::ArrClient::with_timeout(host_url, api_key, timeout),
            tags: RefCell::new(None),
            profiles: RefCell::new(None),
            templates: RefCell::new(HashMap::new()),
        }
    }

    fn endpoint(section: &SectionSchema) -> String {
        format!("{API_PREFIX}/{}", section.endpoint)
    }

    fn item_endpoint(section: &SectionSchema, id: i64) -> String {
        format!("{API_PREFIX}/{}/{id}", section.endpoint)
    }

    // ------------------------------------------------------------------
    // Reference tables
    // ------------------------------------------------------------------

    fn fetch_ref_map(&self, path: &str, label_attr: &str) -> Result<HashMap<String, i64>, RemoteError> {
        let body = self.api.get_json(path).map_err(to_remote)?;
        let items = body.as_array().cloned().unwrap_or_default();
        let mut map = HashMap::new();
        for item in items {
            if let (Some(label), Some(id)) = (
                item.get(label_attr).and_then(Json::as_str),
                item.get("id").and_then(Json::as_i64),
            ) {
                map.insert(label.to_string(), id);
            }
        }
        Ok(map)
    }

    fn tag_ids(&self) -> Result<HashMap<String, i64>, RemoteError> {
        if self.tags.borrow().is_none() {
            let map = self.fetch_ref_map(&format!("{API_PREFIX}/tag"), "label")?;
            *self.tags.borrow_mut() = Some(map);
        }
        Ok(self.tags.borrow().clone().unwrap_or_default())
    }

    fn profile_ids(&self) -> Result<HashMap<String, i64>, RemoteError> {
        if self.profiles.borrow().is_none() {
            let map = self.fetch_ref_map(&format!("{API_PREFIX}/appprofile"), "name")?;
            *self.profiles.borrow_mut() = Some(map);
        }
        Ok(self.profiles.borrow().clone().unwrap_or_default())
    }

    /// Encode tag labels to remote ids. The tag cache is refreshed once
    /// on a miss, since earlier operations in the same run may have
    /// created the tag.
    fn encode_tags(&self, labels: &BTreeSet<String>) -> Result<Json, RemoteError> {
        let mut map = self.tag_ids()?;
        if labels.iter().any(|label| !map.contains_key(label)) {
            *self.tags.borrow_mut() = None;
            map = self.tag_ids()?;
        }
        let mut ids = Vec::with_capacity(labels.len());
        for label in labels {
            match map.get(label) {
                Some(id) => ids.push(*id),
                None => {
                    return Err(RemoteError::Rejected {
                        message: format!("tag '{label}' does not exist on the remote"),
                        status: None,
                    });
                }
            }
        }
        ids.sort_unstable();
        Ok(json!(ids))
    }

    fn decode_tags(&self, raw: &Json) -> Result<Value, RemoteError> {
        let ids: Vec<i64> = raw
            .as_array()
            .map(|items| items.iter().filter_map(Json::as_i64).collect())
            .unwrap_or_default();
        if ids.is_empty() {
            return Ok(Value::StringSet(BTreeSet::new()));
        }
        let map = self.tag_ids()?;
        let labels: BTreeSet<String> = map
            .iter()
            .filter(|(_, id)| ids.contains(id))
            .map(|(label, _)| label.clone())
            .collect();
        Ok(Value::StringSet(labels))
    }

    fn encode_profile(&self, name: &str) -> Result<Json, RemoteError> {
        let mut map = self.profile_ids()?;
        if !map.contains_key(name) {
            *self.profiles.borrow_mut() = None;
            map = self.profile_ids()?;
        }
        map.get(name).map(|id| json!(id)).ok_or_else(|| {
            RemoteError::Rejected {
                message: format!("sync profile '{name}' does not exist on the remote"),
                status: None,
            }
        })
    }

    fn decode_profile(&self, raw: &Json) -> Result<Value, RemoteError> {
        let Some(id) = raw.as_i64() else {
            return Ok(Value::Null);
        };
        let map = self.profile_ids()?;
        Ok(map
            .iter()
            .find(|(_, profile_id)| **profile_id == id)
            .map(|(name, _)| Value::Text(name.clone()))
            .unwrap_or(Value::Null))
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Resource template for the local `type` value, from the section's
    /// schema endpoint. Identity (`id`, `name`, `added`) is stripped.
    fn template(&self, section: &SectionSchema, kind: &str) -> Result<Json, RemoteError> {
        let endpoint = section.template_endpoint.ok_or_else(|| {
            RemoteError::Rejected {
                message: format!("section '{}' has no schema templates", section.name),
                status: None,
            }
        })?;

        let mut cache = self.templates.borrow_mut();
        if !cache.contains_key(endpoint) {
            let body = self
                .api
                .get_json(&format!("{API_PREFIX}/{endpoint}"))
                .map_err(to_remote)?;
            cache.insert(endpoint.to_string(), body.as_array().cloned().unwrap_or_default());
        }

        let type_attr = section
            .resource
            .field("type")
            .map(|f| f.wire)
            .unwrap_or("implementation");
        let template = cache
            .get(endpoint)
            .and_then(|templates| {
                templates.iter().find(|t| {
                    t.get(type_attr)
                        .and_then(Json::as_str)
                        .is_some_and(|v| v.eq_ignore_ascii_case(kind))
                })
            })
            .cloned()
            .ok_or_else(|| RemoteError::Rejected {
                message: format!("unknown {} type '{kind}'", section.name),
                status: None,
            })?;

        let mut template = template;
        if let Some(obj) = template.as_object_mut() {
            obj.remove("id");
            obj.remove("name");
            obj.remove("added");
        }
        Ok(template)
    }

    // ------------------------------------------------------------------
    // Resource decoding
    // ------------------------------------------------------------------

    fn decode_resource(
        &self,
        section: &SectionSchema,
        wire: &Json,
    ) -> Result<Resource, RemoteError> {
        let mut resource = Resource::new(section.resource.kind);
        resource.id = wire.get("id").and_then(Json::as_i64);

        for field in &section.resource.fields {
            let raw = if field.wire_field {
                wire_field_value(wire, field.wire)
            } else {
                wire.get(field.wire).cloned()
            };
            let value = match raw {
                None | Some(Json::Null) => Value::Null,
                Some(raw) => match field.wire {
                    "tags" => self.decode_tags(&raw)?,
                    "appProfileId" => self.decode_profile(&raw)?,
                    _ => json_to_value(&raw),
                },
            };
            resource.set(field.name.to_string(), value);
        }

        resource.wire = Some(wire.clone());
        Ok(resource)
    }

    /// Write one field value into a wire payload, honoring the
    /// `fields` array placement and reference encoding.
    fn set_wire_value(
        &self,
        payload: &mut Json,
        field: &FieldSchema,
        value: &Value,
    ) -> Result<(), RemoteError> {
        let encoded = match (field.wire, value) {
            ("tags", Value::StringSet(labels)) => self.encode_tags(labels)?,
            ("appProfileId", Value::Text(name)) => self.encode_profile(name)?,
            (_, value) => value_to_json(value),
        };

        let Some(obj) = payload.as_object_mut() else {
            return Err(RemoteError::Rejected {
                message: "malformed wire document".to_string(),
                status: None,
            });
        };

        if field.wire_field {
            let fields = obj
                .entry("fields")
                .or_insert_with(|| json!([]));
            if let Some(entries) = fields.as_array_mut() {
                if let Some(entry) = entries.iter_mut().find(|e| {
                    e.get("name").and_then(Json::as_str) == Some(field.wire)
                }) {
                    if let Some(entry) = entry.as_object_mut() {
                        entry.insert("value".to_string(), encoded);
                    }
                } else {
                    entries.push(json!({ "name": field.wire, "value": encoded }));
                }
            }
        } else {
            obj.insert(field.wire.to_string(), encoded);
        }
        Ok(())
    }
}

impl RemoteClient for InstanceClient {
    fn fetch_section(&self, section: &SectionSchema) -> Result<SectionState, RemoteError> {
        let body = self
            .api
            .get_json(&Self::endpoint(section))
            .map_err(to_remote)?;

        if !section.is_collection() {
            let resource = self.decode_resource(section, &body)?;
            return Ok(SectionState::Flat(resource));
        }

        let key_attr = key_attr(section);
        let mut entries = NamedCollection::new(section.key_rule);
        for item in body.as_array().cloned().unwrap_or_default() {
            let Some(name) = item.get(key_attr).and_then(Json::as_str) else {
                log::debug!("{}: skipping entry without '{key_attr}'", section.name);
                continue;
            };
            let resource = self.decode_resource(section, &item)?;
            entries
                .insert(name, resource)
                .map_err(|e| RemoteError::Rejected {
                    message: format!("remote returned colliding names: {e}"),
                    status: None,
                })?;
        }
        Ok(SectionState::Collection {
            entries,
            delete_unmanaged: false,
        })
    }

    fn create(&self, section: &SectionSchema, op: &CreateOp) -> Result<Option<i64>, RemoteError> {
        // Tags are label-only; their create payload is trivial.
        if section.endpoint == "tag" {
            let body = self
                .api
                .post_json(&Self::endpoint(section), &json!({ "label": op.name }))
                .map_err(to_remote)?;
            let id = body.get("id").and_then(Json::as_i64);
            if let (Some(id), Some(map)) = (id, self.tags.borrow_mut().as_mut()) {
                map.insert(op.name.clone(), id);
            }
            return Ok(id);
        }

        let mut payload = match section.template_endpoint {
            Some(_) => {
                let kind = op
                    .resource
                    .get("type")
                    .as_text()
                    .ok_or_else(|| RemoteError::Rejected {
                        message: format!("'{}' has no type", op.name),
                        status: None,
                    })?;
                self.template(section, &kind)?
            }
            None => json!({}),
        };

        for field in &section.resource.fields {
            let value = op.resource.get(field.name);
            if value.is_null() {
                continue;
            }
            self.set_wire_value(&mut payload, field, value)?;
        }
        if let Some(obj) = payload.as_object_mut() {
            obj.insert("name".to_string(), json!(op.name));
        }

        let body = self
            .api
            .post_json(&Self::endpoint(section), &payload)
            .map_err(to_remote)?;
        Ok(body.get("id").and_then(Json::as_i64))
    }

    fn update(&self, section: &SectionSchema, op: &UpdateOp) -> Result<(), RemoteError> {
        // Start from the resource's own wire document so unmanaged
        // remote attributes round-trip unchanged.
        let mut payload = op.base.wire.clone().unwrap_or_else(|| json!({}));
        if let Some(obj) = payload.as_object_mut() {
            if let Some(id) = op.id {
                obj.insert("id".to_string(), json!(id));
            }
            if section.is_collection() {
                obj.insert("name".to_string(), json!(op.name));
            }
        }

        for delta in &op.deltas {
            let Some(field) = section.resource.field(&delta.field) else {
                continue;
            };
            self.set_wire_value(&mut payload, field, &delta.new)?;
        }

        let path = match op.id {
            Some(id) => Self::item_endpoint(section, id),
            None => Self::endpoint(section),
        };
        self.api.put_json(&path, &payload).map_err(to_remote)?;
        Ok(())
    }

    fn delete(&self, section: &SectionSchema, op: &DeleteOp) -> Result<(), RemoteError> {
        let id = op.id.ok_or_else(|| RemoteError::Rejected {
            message: format!("'{}' has no remote id", op.name),
            status: None,
        })?;
        self.api
            .delete(&Self::item_endpoint(section, id))
            .map_err(to_remote)?;
        if section.endpoint == "tag"
            && let Some(map) = self.tags.borrow_mut().as_mut()
        {
            map.remove(&op.name);
        }
        Ok(())
    }
}

/// Attribute carrying a collection entry's display name.
fn key_attr(section: &SectionSchema) -> &'static str {
    if section.endpoint == "tag" {
        "label"
    } else {
        "name"
    }
}

/// Value of an entry in the wire `fields` array.
fn wire_field_value(wire: &Json, name: &str) -> Option<Json> {
    wire.get("fields")?
        .as_array()?
        .iter()
        .find(|entry| entry.get("name").and_then(Json::as_str) == Some(name))?
        .get("value")
        .cloned()
}

fn json_to_value(raw: &Json) -> Value {
    match raw {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or_default())
            }
        }
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::StringList(
            items
                .iter()
                .filter_map(|item| match item {
                    Json::String(s) => Some(s.clone()),
                    Json::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .collect(),
        ),
        Json::Object(_) => Value::Null,
    }
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::Float(f) => json!(f),
        Value::Text(s) => json!(s),
        Value::StringSet(items) => json!(items.iter().collect::<Vec<_>>()),
        Value::StringList(items) => json!(items),
    }
}

/// Map transport errors onto the engine's remote taxonomy.
fn to_remote(error: arrkit::Error) -> RemoteError {
    if error.is_transient() {
        RemoteError::Unavailable {
            message: error.to_string(),
        }
    } else {
        let status = match &error {
            arrkit::Error::Auth { status }
            | arrkit::Error::Rejected { status, .. }
            | arrkit::Error::Server { status, .. } => Some(*status),
            _ => None,
        };
        RemoteError::Rejected {
            message: error.to_string(),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn client() -> InstanceClient {
        let client = InstanceClient::new("http://localhost:9696", "key", Duration::from_secs(5));
        // Prefill reference caches so codec tests stay offline.
        *client.tags.borrow_mut() = Some(HashMap::from([
            ("anime".to_string(), 1),
            ("shared".to_string(), 2),
        ]));
        *client.profiles.borrow_mut() = Some(HashMap::from([("Standard".to_string(), 1)]));
        client
    }

    #[test]
    fn test_decode_flat_resource() {
        let section = schema::registry().section("ui").unwrap();
        let wire = json!({
            "id": 1,
            "theme": "dark",
            "firstDayOfWeek": 1,
            "showRelativeDates": true,
        });
        let resource = client().decode_resource(section, &wire).unwrap();
        assert_eq!(resource.id, Some(1));
        assert_eq!(resource.get("theme"), &Value::Text("dark".into()));
        assert_eq!(resource.get("first_day_of_week"), &Value::Int(1));
        // Attributes the remote omitted read as null.
        assert_eq!(resource.get("time_format"), &Value::Null);
        assert!(resource.wire.is_some());
    }

    #[test]
    fn test_decode_fields_array_and_tags() {
        let section = schema::registry().section("download_clients").unwrap();
        let wire = json!({
            "id": 4,
            "name": "Transmission",
            "implementation": "Transmission",
            "enable": true,
            "priority": 1,
            "tags": [1, 2],
            "fields": [
                { "name": "host", "value": "transmission" },
                { "name": "port", "value": 9091 },
                { "name": "useSsl", "value": false }
            ],
        });
        let resource = client().decode_resource(section, &wire).unwrap();
        assert_eq!(resource.get("host"), &Value::Text("transmission".into()));
        assert_eq!(resource.get("port"), &Value::Int(9091));
        let Value::StringSet(tags) = resource.get("tags") else {
            panic!("tags should decode to a set");
        };
        assert!(tags.contains("anime") && tags.contains("shared"));
    }

    #[test]
    fn test_decode_profile_reference() {
        let section = schema::registry().section("indexers").unwrap();
        let wire = json!({
            "id": 9,
            "name": "Nyaa",
            "definitionName": "nyaa",
            "enable": true,
            "priority": 25,
            "appProfileId": 1,
            "fields": [],
        });
        let resource = client().decode_resource(section, &wire).unwrap();
        assert_eq!(resource.get("app_profile"), &Value::Text("Standard".into()));
    }

    #[test]
    fn test_set_wire_value_top_level_and_fields() {
        let client = client();
        let section = schema::registry().section("download_clients").unwrap();
        let mut payload = json!({
            "enable": false,
            "fields": [{ "name": "host", "value": "old-host" }],
        });

        let enable = section.resource.field("enable").unwrap();
        client
            .set_wire_value(&mut payload, enable, &Value::Bool(true))
            .unwrap();
        let host = section.resource.field("host").unwrap();
        client
            .set_wire_value(&mut payload, host, &Value::Text("new-host".into()))
            .unwrap();

        assert_eq!(payload["enable"], json!(true));
        assert_eq!(payload["fields"][0]["value"], json!("new-host"));
    }

    #[test]
    fn test_encode_tags_sorted_ids() {
        let client = client();
        let labels: BTreeSet<String> =
            ["shared", "anime"].iter().map(ToString::to_string).collect();
        assert_eq!(client.encode_tags(&labels).unwrap(), json!([1, 2]));
    }

    #[test]
    fn test_encode_unknown_tag_rejected() {
        // A miss triggers one cache refresh against the remote; point
        // the client at a dead address so the refresh fails fast and
        // the overall encode still errors.
        let client =
            InstanceClient::new("http://127.0.0.1:9", "key", Duration::from_millis(200));
        *client.tags.borrow_mut() = Some(HashMap::new());
        let labels: BTreeSet<String> = ["missing".to_string()].into_iter().collect();
        assert!(client.encode_tags(&labels).is_err());
    }
}
