//! Alias → original identity mappings.
//!
//! Both dictionaries come from one bulk decrypt and are replaced together.
//! There is no API for merging entries into an existing dictionary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::MappingKind;

/// One dictionary from anonymized alias to real name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityMapping(HashMap<String, String>);

impl IdentityMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// The real name behind `alias`, if known.
    pub fn original(&self, alias: &str) -> Option<&str> {
        self.0.get(alias).map(String::as_str)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.0.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(a, o)| (a.as_str(), o.as_str()))
    }
}

impl From<HashMap<String, String>> for IdentityMapping {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl<A, O> FromIterator<(A, O)> for IdentityMapping
where
    A: Into<String>,
    O: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (A, O)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(a, o)| (a.into(), o.into()))
                .collect(),
        )
    }
}

/// The result of one successful bulk decrypt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMappings {
    pub participants: IdentityMapping,
    pub items: IdentityMapping,
}

impl IdentityMappings {
    pub fn new(participants: IdentityMapping, items: IdentityMapping) -> Self {
        Self {
            participants,
            items,
        }
    }

    pub fn get(&self, kind: MappingKind) -> &IdentityMapping {
        match kind {
            MappingKind::Participant => &self.participants,
            MappingKind::Item => &self.items,
        }
    }

    /// Resolve `alias` in the dictionary for `kind`.
    pub fn original(&self, kind: MappingKind, alias: &str) -> Option<&str> {
        self.get(kind).original(alias)
    }

    /// Total number of aliases across both dictionaries.
    pub fn len(&self) -> usize {
        self.participants.len() + self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty() && self.items.is_empty()
    }
}
