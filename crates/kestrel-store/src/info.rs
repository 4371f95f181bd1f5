//! Store statistics reported to the operational surface.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// One section of store statistics (`server`, `memory`, `keyspace`, ...).
pub type InfoSection = BTreeMap<String, Value>;

/// Sectioned statistics about a store backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreInfo {
    /// Backend name ("memory", "redis").
    pub backend: String,
    /// Sections keyed by lowercase section name.
    pub sections: BTreeMap<String, InfoSection>,
}

impl StoreInfo {
    /// Creates an empty report for the given backend.
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            sections: BTreeMap::new(),
        }
    }

    /// Adds a field to a section, creating the section if needed.
    pub fn insert(&mut self, section: &str, field: impl Into<String>, value: impl Into<Value>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(field.into(), value.into());
    }

    /// Returns a field of a section.
    pub fn field(&self, section: &str, field: &str) -> Option<&Value> {
        self.sections.get(section).and_then(|s| s.get(field))
    }
}

/// Parses the text returned by the Redis `INFO` command.
///
/// Lines starting with `#` open a section; `key:value` lines belong to the
/// current section. Numeric values are reported as numbers. Fields before
/// the first header land in `general`.
///
/// # Example
///
/// ```
/// use kestrel_store::info::parse_info;
///
/// let sections = parse_info("# Server\r\nredis_version:7.2.4\r\nuptime_in_seconds:42\r\n");
/// assert_eq!(sections["server"]["redis_version"], "7.2.4");
/// assert_eq!(sections["server"]["uptime_in_seconds"], 42);
/// ```
pub fn parse_info(raw: &str) -> BTreeMap<String, InfoSection> {
    let mut sections: BTreeMap<String, InfoSection> = BTreeMap::new();
    let mut current = "general".to_string();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('#') {
            current = header.trim().to_lowercase();
            sections.entry(current.clone()).or_default();
            continue;
        }

        if let Some((key, value)) = line.split_once(':') {
            sections
                .entry(current.clone())
                .or_default()
                .insert(key.to_string(), parse_value(value));
        }
    }

    sections
}

fn parse_value(value: &str) -> Value {
    if let Ok(int) = value.parse::<i64>() {
        return Value::from(int);
    }
    match value.parse::<f64>() {
        Ok(float) if float.is_finite() => Value::from(float),
        _ => Value::from(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "# Server\r\nredis_version:7.2.4\r\nredis_mode:standalone\r\n\r\n# Memory\r\nused_memory:1048576\r\nmem_fragmentation_ratio:1.25\r\n\r\n# Keyspace\r\ndb0:keys=12,expires=3,avg_ttl=1000\r\n";

    #[test]
    fn test_parse_sections() {
        let sections = parse_info(SAMPLE);

        assert_eq!(sections.len(), 3);
        assert_eq!(sections["server"]["redis_mode"], "standalone");
        assert_eq!(sections["memory"]["used_memory"], 1_048_576);
        assert_eq!(sections["memory"]["mem_fragmentation_ratio"], 1.25);
        assert_eq!(
            sections["keyspace"]["db0"],
            "keys=12,expires=3,avg_ttl=1000"
        );
    }

    #[test]
    fn test_fields_before_header_go_to_general() {
        let sections = parse_info("loose:1\r\n# Clients\r\nconnected_clients:2\r\n");
        assert_eq!(sections["general"]["loose"], 1);
        assert_eq!(sections["clients"]["connected_clients"], 2);
    }

    #[test]
    fn test_store_info_insert() {
        let mut info = StoreInfo::new("memory");
        info.insert("keyspace", "keys", 3);

        assert_eq!(info.field("keyspace", "keys"), Some(&Value::from(3)));
        assert!(info.field("server", "version").is_none());
    }
}
