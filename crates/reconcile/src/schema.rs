//! Section and resource schema descriptors.
//!
//! Every resource kind is described by a static structural descriptor:
//! an ordered list of field schemas. Section schemas bind a resource
//! schema to a position in the configuration tree (flat section or
//! named collection) and to its remote endpoint. Schemas are gathered
//! into a [`Registry`] once at process startup and never mutated during
//! reconciliation.

use crate::error::{Error, Result};
use crate::field::FieldSchema;

/// Identity-matching rule for collection keys.
///
/// How display names compare is a property of the remote system, not of
/// the reconciler; getting it wrong produces spurious create+delete
/// pairs for what is actually one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRule {
    /// Strip surrounding whitespace before comparing.
    pub trim: bool,
    /// Fold keys to lowercase before comparing.
    pub case_insensitive: bool,
}

impl KeyRule {
    /// Exact byte-for-byte matching.
    pub const EXACT: Self = Self {
        trim: false,
        case_insensitive: false,
    };

    /// Whitespace-insensitive, case-sensitive matching (the *arr
    /// family's display-name semantics).
    pub const TRIMMED: Self = Self {
        trim: true,
        case_insensitive: false,
    };

    /// Canonical form of a key under this rule.
    pub fn canonical(&self, key: &str) -> String {
        let key = if self.trim { key.trim() } else { key };
        if self.case_insensitive {
            key.to_lowercase()
        } else {
            key.to_string()
        }
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.canonical(a) == self.canonical(b)
    }
}

impl Default for KeyRule {
    fn default() -> Self {
        Self::EXACT
    }
}

/// Structural descriptor for one resource kind: an ordered field set.
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    /// Kind name, e.g. "sync_profile".
    pub kind: &'static str,
    pub fields: Vec<FieldSchema>,
}

impl ResourceSchema {
    pub fn new(kind: &'static str, fields: Vec<FieldSchema>) -> Self {
        Self { kind, fields }
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_by_wire(&self, wire: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.wire == wire)
    }
}

/// How a section sits in the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionLayout {
    /// A single resource, e.g. UI settings.
    Flat,
    /// A named, keyed collection of resources, e.g. indexers.
    Collection,
}

/// Schema for one configuration section.
#[derive(Debug, Clone)]
pub struct SectionSchema {
    /// Section name in the document, e.g. "sync_profiles".
    pub name: &'static str,
    /// Remote API endpoint path fragment, e.g. "appprofile".
    pub endpoint: &'static str,
    /// Endpoint serving per-implementation resource templates, when the
    /// remote requires create payloads seeded from one.
    pub template_endpoint: Option<&'static str>,
    pub layout: SectionLayout,
    pub resource: ResourceSchema,
    pub key_rule: KeyRule,
}

impl SectionSchema {
    pub fn flat(
        name: &'static str,
        endpoint: &'static str,
        resource: ResourceSchema,
    ) -> Self {
        Self {
            name,
            endpoint,
            template_endpoint: None,
            layout: SectionLayout::Flat,
            resource,
            key_rule: KeyRule::EXACT,
        }
    }

    pub fn collection(
        name: &'static str,
        endpoint: &'static str,
        resource: ResourceSchema,
    ) -> Self {
        Self {
            name,
            endpoint,
            template_endpoint: None,
            layout: SectionLayout::Collection,
            resource,
            key_rule: KeyRule::TRIMMED,
        }
    }

    pub fn with_template(mut self, endpoint: &'static str) -> Self {
        self.template_endpoint = Some(endpoint);
        self
    }

    pub fn with_key_rule(mut self, rule: KeyRule) -> Self {
        self.key_rule = rule;
        self
    }

    pub fn is_collection(&self) -> bool {
        self.layout == SectionLayout::Collection
    }
}

/// Process-wide immutable registry of section schemas.
///
/// Section order is significant: it is the dependency order used when
/// applying changes (creates/updates walk it forward, deletes walk it
/// backward), and it keeps plan output deterministic.
#[derive(Debug)]
pub struct Registry {
    sections: Vec<SectionSchema>,
}

impl Registry {
    /// Build a registry from schemas in declared (dependency) order.
    /// Section names must be unique.
    pub fn new(sections: Vec<SectionSchema>) -> Result<Self> {
        for (i, section) in sections.iter().enumerate() {
            if sections[..i].iter().any(|s| s.name == section.name) {
                return Err(Error::DuplicateKey {
                    key: section.name.to_string(),
                });
            }
        }
        Ok(Self { sections })
    }

    pub fn sections(&self) -> impl Iterator<Item = &SectionSchema> {
        self.sections.iter()
    }

    pub fn sections_rev(&self) -> impl Iterator<Item = &SectionSchema> {
        self.sections.iter().rev()
    }

    pub fn section(&self, name: &str) -> Option<&SectionSchema> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}
