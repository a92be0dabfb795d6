//! Domain invariants that JSON Schema cannot express
//!
//! Every registry must have unique keys in strictly ascending (byte-wise
//! lexicographic) order. The same routine serves all registry kinds; only
//! the key extraction differs.

use std::collections::HashSet;
use thiserror::Error;

use crate::registry::{Entry, Registry};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("{type_name} registry key {key} is duplicated")]
    Duplicated { type_name: String, key: String },

    #[error("{type_name} sort order {key} is duplicated")]
    DuplicatedOrder { type_name: String, key: String },

    #[error("{type_name} sort order {key} is not sorted")]
    NotSorted { type_name: String, key: String },

    #[error("{type_name} entry {index} has no string '{field}' key")]
    MissingKey {
        type_name: String,
        index: usize,
        field: String,
    },
}

impl InvariantViolation {
    /// The key the violation refers to, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            InvariantViolation::Duplicated { key, .. }
            | InvariantViolation::DuplicatedOrder { key, .. }
            | InvariantViolation::NotSorted { key, .. } => Some(key),
            InvariantViolation::MissingKey { .. } => None,
        }
    }
}

/// Check uniqueness and then ordering of a registry's key field
pub fn check_invariants(registry: &Registry, type_name: &str) -> Result<(), InvariantViolation> {
    let field = registry.kind.key_field();
    let keys = collect_keys(&registry.entries, type_name, field, |e| registry.key_of(e))?;
    check_unique(&keys, type_name)?;
    check_order(&keys, type_name)
}

/// Extract every entry's key, failing on the first entry without one
pub fn collect_keys<'a, F>(
    entries: &'a [Entry],
    type_name: &str,
    field: &str,
    key_of: F,
) -> Result<Vec<&'a str>, InvariantViolation>
where
    F: Fn(&'a Entry) -> Option<&'a str>,
{
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            key_of(entry).ok_or_else(|| InvariantViolation::MissingKey {
                type_name: type_name.to_string(),
                index,
                field: field.to_string(),
            })
        })
        .collect()
}

/// Fail on the first key that has been seen before
pub fn check_unique(keys: &[&str], type_name: &str) -> Result<(), InvariantViolation> {
    let mut seen = HashSet::with_capacity(keys.len());
    for key in keys {
        if !seen.insert(*key) {
            return Err(InvariantViolation::Duplicated {
                type_name: type_name.to_string(),
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

/// Require `keys[i-1] < keys[i]` for every adjacent pair
pub fn check_order(keys: &[&str], type_name: &str) -> Result<(), InvariantViolation> {
    for pair in keys.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        if prev < next {
            continue;
        }
        let type_name = type_name.to_string();
        let key = prev.to_string();
        return Err(if prev == next {
            InvariantViolation::DuplicatedOrder { type_name, key }
        } else {
            InvariantViolation::NotSorted { type_name, key }
        });
    }
    Ok(())
}
