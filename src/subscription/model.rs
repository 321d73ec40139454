//! Proxies and selection groups.
//!
//! Proxies are kept as the raw ordered YAML mapping the provider sent, so
//! fields this crate knows nothing about survive the merge untouched. Only
//! `name` is interpreted.

use serde_yaml::{Mapping, Value};

/// One upstream proxy definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Proxy {
    name: String,
    fields: Mapping,
}

impl Proxy {
    /// Build a proxy from a parsed entry. Returns `None` unless the entry is
    /// a mapping with a string `name`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Mapping(fields) => {
                let name = fields.get("name")?.as_str()?.to_string();
                Some(Self { name, fields })
            }
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Mapping {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Mapping(self.fields)
    }
}

/// Group behaviour as understood by the downstream client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupKind {
    /// The user picks a member by hand.
    Select,
    /// The client probes `url` every `interval` seconds and uses the
    /// fastest member.
    UrlTest { url: String, interval: u64 },
}

impl GroupKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            GroupKind::Select => "select",
            GroupKind::UrlTest { .. } => "url-test",
        }
    }
}

/// A named group of proxy (or group) names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionGroup {
    pub name: String,
    pub kind: GroupKind,
    pub proxies: Vec<String>,
}

impl SelectionGroup {
    pub fn select(name: impl Into<String>, proxies: Vec<String>) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::Select,
            proxies,
        }
    }

    pub fn url_test(
        name: impl Into<String>,
        proxies: Vec<String>,
        url: impl Into<String>,
        interval: u64,
    ) -> Self {
        Self {
            name: name.into(),
            kind: GroupKind::UrlTest {
                url: url.into(),
                interval,
            },
            proxies,
        }
    }

    /// Render as a mapping with keys in client order:
    /// `name`, `type`, `proxies`, then kind-specific keys.
    pub fn to_value(&self) -> Value {
        let mut map = Mapping::new();
        map.insert("name".into(), Value::String(self.name.clone()));
        map.insert("type".into(), self.kind.type_name().into());
        map.insert(
            "proxies".into(),
            Value::Sequence(self.proxies.iter().cloned().map(Value::String).collect()),
        );
        if let GroupKind::UrlTest { url, interval } = &self.kind {
            map.insert("url".into(), Value::String(url.clone()));
            map.insert("interval".into(), Value::from(*interval));
        }
        Value::Mapping(map)
    }
}
