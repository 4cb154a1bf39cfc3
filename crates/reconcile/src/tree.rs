//! Configuration trees.
//!
//! A [`ConfigTree`] is one full desired-or-actual state: an ordered
//! mapping from section name to either a single resource (flat
//! section) or a named collection. Trees are built fresh per
//! reconciliation run and never mutated in place; convergence is
//! verified by fetching a new tree and diffing again.

use crate::collection::NamedCollection;
use crate::error::{Error, Result};
use crate::resource::Resource;

/// State of one section within a tree.
#[derive(Debug, Clone)]
pub enum SectionState {
    Flat(Resource),
    Collection {
        entries: NamedCollection,
        /// Delete remote entries absent from the desired document.
        /// Policy toggle carried on desired trees; always false on
        /// fetched trees.
        delete_unmanaged: bool,
    },
}

impl SectionState {
    pub fn as_flat(&self) -> Option<&Resource> {
        match self {
            Self::Flat(resource) => Some(resource),
            Self::Collection { .. } => None,
        }
    }

    pub fn as_collection(&self) -> Option<&NamedCollection> {
        match self {
            Self::Flat(_) => None,
            Self::Collection { entries, .. } => Some(entries),
        }
    }
}

/// A full desired-or-actual configuration state.
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    sections: Vec<(String, SectionState)>,
}

impl ConfigTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section. Section names are unique within a tree.
    pub fn insert(&mut self, name: impl Into<String>, state: SectionState) -> Result<()> {
        let name = name.into();
        if self.section(&name).is_some() {
            return Err(Error::DuplicateKey { key: name });
        }
        self.sections.push((name, state));
        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&SectionState> {
        self.sections
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, s)| s)
    }

    /// Sections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SectionState)> {
        self.sections.iter().map(|(k, s)| (k.as_str(), s))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::KeyRule;

    #[test]
    fn test_duplicate_sections_rejected() {
        let mut tree = ConfigTree::new();
        tree.insert("ui", SectionState::Flat(Resource::new("ui")))
            .unwrap();
        assert!(
            tree.insert("ui", SectionState::Flat(Resource::new("ui")))
                .is_err()
        );
    }

    #[test]
    fn test_section_lookup() {
        let mut tree = ConfigTree::new();
        tree.insert(
            "tags",
            SectionState::Collection {
                entries: NamedCollection::new(KeyRule::TRIMMED),
                delete_unmanaged: false,
            },
        )
        .unwrap();

        assert!(tree.section("tags").is_some());
        assert!(tree.section("tags").unwrap().as_collection().is_some());
        assert!(tree.section("tags").unwrap().as_flat().is_none());
        assert!(tree.section("ui").is_none());
    }
}
