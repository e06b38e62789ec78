//! Communication ports as reported by discovery.

use serde::{Serialize, Serializer};

/// Ordered key/value properties attached to a port.
///
/// Keys are case-sensitive and keep insertion order. Inserting an existing
/// key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(Vec<(String, String)>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, keeping the original position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The USB vendor and product IDs, if both are present.
    pub fn usb_id(&self) -> Option<(&str, &str)> {
        Some((self.get("vid")?, self.get("pid")?))
    }
}

impl Serialize for Properties {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<K, V> FromIterator<(K, V)> for Properties
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Properties::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}

/// A discovered communication endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Port {
    /// Address used to open the port (e.g., "/dev/ttyACM0")
    pub address: String,
    /// Human-readable address
    pub label: String,
    /// Protocol tag (e.g., "serial")
    pub protocol: String,
    /// Human-readable protocol
    pub protocol_label: String,
    /// Stable hardware identifier if the device exposes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hardware_id: Option<String>,
    pub properties: Properties,
}

impl Port {
    /// Create a port whose label matches its address.
    pub fn new(address: impl Into<String>, protocol: impl Into<String>) -> Self {
        let address = address.into();
        let protocol = protocol.into();
        Self {
            label: address.clone(),
            protocol_label: protocol.clone(),
            address,
            protocol,
            hardware_id: None,
            properties: Properties::new(),
        }
    }

    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = properties;
        self
    }
}
