//! Merged document model and YAML rendering.
//!
//! Output has to survive strict client parsers, so rendering keeps key
//! insertion order, never folds long scalars and never emits anchors or
//! aliases. `serde_yaml` gives all three: its `Mapping` is insertion
//! ordered, its emitter runs with unlimited line width, and it has no
//! alias support on the serialize side.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Top-level key holding the aggregate proxy list.
pub const PROXIES_KEY: &str = "proxies";
/// Top-level key holding the selection groups.
pub const GROUPS_KEY: &str = "proxy-groups";

#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// The base template with the merged `proxies` and `proxy-groups` keys.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDocument {
    root: Mapping,
}

impl MergedDocument {
    pub(crate) fn new(root: Mapping) -> Self {
        Self { root }
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn into_value(self) -> Value {
        Value::Mapping(self.root)
    }

    /// Entries of the `proxies` sequence.
    pub fn proxies(&self) -> &[Value] {
        sequence(self.root.get(PROXIES_KEY))
    }

    /// Entries of the `proxy-groups` sequence.
    pub fn groups(&self) -> &[Value] {
        sequence(self.root.get(GROUPS_KEY))
    }

    pub fn proxy_names(&self) -> Vec<&str> {
        self.proxies().iter().filter_map(name_of).collect()
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups().iter().filter_map(name_of).collect()
    }

    /// Member names of the group called `name`.
    pub fn group_members(&self, name: &str) -> Option<Vec<&str>> {
        let group = self.groups().iter().find(|g| name_of(g) == Some(name))?;
        Some(
            sequence(group.get(PROXIES_KEY))
                .iter()
                .filter_map(Value::as_str)
                .collect(),
        )
    }

    pub fn to_yaml(&self) -> Result<String, SerializeError> {
        serialize(self)
    }
}

fn sequence(value: Option<&Value>) -> &[Value] {
    value
        .and_then(Value::as_sequence)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn name_of(value: &Value) -> Option<&str> {
    value.get("name").and_then(Value::as_str)
}

/// Render a merged document as YAML text.
pub fn serialize(document: &MergedDocument) -> Result<String, SerializeError> {
    Ok(serde_yaml::to_string(&document.root)?)
}

/// Parse YAML text into a value tree, expanding `<<` merge keys.
///
/// Aliases are resolved by the parser, so the result never shares nodes.
pub fn parse(text: &str) -> Result<Value, serde_yaml::Error> {
    let mut value: Value = serde_yaml::from_str(text)?;
    value.apply_merge()?;
    Ok(value)
}

/// Structural copy of a value tree. Every node of the result is freshly
/// allocated; nothing is shared with `value`.
pub fn deep_copy(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(b) => Value::Bool(*b),
        Value::Number(n) => Value::Number(n.clone()),
        Value::String(s) => Value::String(s.clone()),
        Value::Sequence(seq) => Value::Sequence(seq.iter().map(deep_copy).collect()),
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (deep_copy(k), deep_copy(v)))
                .collect(),
        ),
        Value::Tagged(tagged) => Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
            tag: tagged.tag.clone(),
            value: deep_copy(&tagged.value),
        })),
    }
}
