/*!
Partial models: witnesses recovered from oracle calls.

A partial model is a finite map from canonical variable identifiers to literal values,
optionally extended with:
- a `default` value, recording the "all other bits are this" assumption used by the
  engine, and
- the set of controlled variables of the originating oracle call (robust mode).
*/

use std::collections::{BTreeMap, BTreeSet};

/// A partial model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PartialModel {
    /// Bindings from canonical variable identifiers to literal value spellings.
    bindings: BTreeMap<String, String>,

    /// The value of every unbound bit, when the engine recorded one.
    pub default: Option<String>,

    /// Controlled variables of the originating oracle call.
    pub controlled: Option<BTreeSet<String>>,
}

impl PartialModel {
    /// A model over the given bindings.
    pub fn from_bindings(bindings: BTreeMap<String, String>) -> Self {
        PartialModel {
            bindings,
            default: None,
            controlled: None,
        }
    }

    /// Binds an identifier to a value.
    pub fn bind(&mut self, identifier: impl Into<String>, value: impl Into<String>) {
        self.bindings.insert(identifier.into(), value.into());
    }

    /// The value bound to an identifier, if any.
    pub fn value_of(&self, identifier: &str) -> Option<&str> {
        self.bindings.get(identifier).map(String::as_str)
    }

    /// Whether the identifier is bound.
    pub fn binds(&self, identifier: &str) -> bool {
        self.bindings.contains_key(identifier)
    }

    /// An iterator over the bindings.
    pub fn bindings(&self) -> impl Iterator<Item = (&String, &String)> {
        self.bindings.iter()
    }

    /// The count of bindings.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the model carries no concrete assignment and no controlled tag.
    ///
    /// Such models make every candidate appear satisfied and are skipped by the
    /// counter-example filter.
    pub fn is_vacuous(&self) -> bool {
        self.bindings.is_empty()
            && self.default.is_none()
            && self.controlled.as_ref().map_or(true, BTreeSet::is_empty)
    }
}

impl std::fmt::Display for PartialModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        let mut first = true;
        for (key, value) in &self.bindings {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{key}: {value}")?;
            first = false;
        }
        if let Some(default) = &self.default {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "default: {default}")?;
        }
        write!(f, "}}")
    }
}
