//! Proptest generators for property-based testing.

use proptest::prelude::*;

use brambler_core::{EntityId, IdentityMapping, IdentityMappings, MappingKind};

/// Generate a key that is not blank: printable ASCII with at least one
/// visible character, possibly padded with spaces.
pub fn master_key() -> impl Strategy<Value = String> {
    "[ -~]{0,12}[!-~][ -~]{0,12}"
}

/// Generate a key made only of whitespace, including the empty string.
pub fn blank_key() -> impl Strategy<Value = String> {
    "[ \t\r\n]{0,8}"
}

/// Generate a MappingKind.
pub fn mapping_kind() -> impl Strategy<Value = MappingKind> {
    prop_oneof![Just(MappingKind::Participant), Just(MappingKind::Item)]
}

/// Generate an EntityId.
pub fn entity_id() -> impl Strategy<Value = EntityId> {
    (mapping_kind(), "[0-9]{1,4}").prop_map(|(kind, id)| EntityId::new(kind, id))
}

/// Generate one alias dictionary with up to `max_len` entries.
pub fn identity_mapping(max_len: usize) -> impl Strategy<Value = IdentityMapping> {
    prop::collection::hash_map("[A-Z][a-z]{2,6} [A-Z][a-z]{2,6}", "[A-Z][a-z]{2,8}", 0..=max_len)
        .prop_map(IdentityMapping::from)
}

/// Generate both dictionaries.
pub fn identity_mappings(max_len: usize) -> impl Strategy<Value = IdentityMappings> {
    (identity_mapping(max_len), identity_mapping(max_len))
        .prop_map(|(participants, items)| IdentityMappings::new(participants, items))
}
