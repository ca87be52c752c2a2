//! Reference document generation.
//!
//! The reference document is the published contract of a service. Consumers
//! diff it and regenerate client code from it, so the output depends only on
//! registry state: entries keep their declaration order, query names keep
//! their insertion order and every field serializes in a fixed order.

use serde::Serialize;

use crate::descriptor::ServiceDescriptor;
use crate::entry::{EndpointEntry, Output};
use crate::scopes::ScopeExpression;
use crate::stability::Stability;

/// Schema identifier of the reference document format.
pub const REFERENCE_SCHEMA: &str = "/schemas/common/api-reference-v0.json#";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceDocument {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub title: String,
    pub description: String,
    pub service_name: String,
    pub api_version: String,
    pub entries: Vec<ReferenceEntry>,
}

/// One published entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceEntry {
    #[serde(rename = "type")]
    pub kind: String,
    /// Lowercase HTTP method.
    pub method: String,
    /// Route with `<name>` placeholders.
    pub route: String,
    pub query: Vec<String>,
    /// Path parameters, in route order.
    pub args: Vec<String>,
    pub name: String,
    pub stability: Stability,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<ScopeExpression>,
}

impl ReferenceEntry {
    fn from_entry(entry: &EndpointEntry) -> Self {
        Self {
            kind: "function".to_owned(),
            method: entry.method().as_str().to_ascii_lowercase(),
            route: entry.clean_route().to_owned(),
            query: entry.query().keys().cloned().collect(),
            args: entry.route_params().to_vec(),
            name: entry.name().to_owned(),
            stability: entry.stability(),
            title: entry.title().to_owned(),
            input: entry.input().map(ToOwned::to_owned),
            output: entry.output().map(|o| Output::as_str(o).to_owned()),
            description: entry.description().to_owned(),
            category: entry.category().to_owned(),
            scopes: entry.scopes().cloned(),
        }
    }
}

/// Project the service metadata and published entries into a document.
#[must_use]
pub fn generate(descriptor: &ServiceDescriptor, entries: &[EndpointEntry]) -> ReferenceDocument {
    ReferenceDocument {
        schema: REFERENCE_SCHEMA.to_owned(),
        title: descriptor.title().to_owned(),
        description: descriptor.description().to_owned(),
        service_name: descriptor.service_name().to_owned(),
        api_version: descriptor.api_version().to_owned(),
        entries: entries
            .iter()
            .filter(|e| !e.no_publish())
            .map(ReferenceEntry::from_entry)
            .collect(),
    }
}

impl ReferenceDocument {
    /// Serialize as a JSON value.
    ///
    /// # Errors
    /// Returns an error if a scope expression cannot be serialized.
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Serialize as pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    /// Returns an error if a scope expression cannot be serialized.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }

    /// Find a published entry by name.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&ReferenceEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::Builtin;

    fn descriptor() -> ServiceDescriptor {
        ServiceDescriptor::builder()
            .title("Queue API")
            .description("Task queue")
            .service_name("queue")
            .api_version("v1")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builtins_projection() {
        let entries: Vec<_> = Builtin::ALL.into_iter().map(Builtin::entry).collect();
        let doc = generate(&descriptor(), &entries);
        let value = doc.to_value().unwrap();

        assert_eq!(value["$schema"], REFERENCE_SCHEMA);
        assert_eq!(value["serviceName"], "queue");
        assert_eq!(value["apiVersion"], "v1");
        assert_eq!(
            value["entries"][0],
            serde_json::json!({
                "type": "function",
                "method": "get",
                "route": "/ping",
                "query": [],
                "args": [],
                "name": "ping",
                "stability": "stable",
                "title": "Ping Server",
                "description": "Respond without doing anything.\nThis endpoint is used to check that the service is up.",
                "category": "Monitoring",
            })
        );
    }

    #[test]
    fn test_no_publish_filtered() {
        let mut entries: Vec<_> = Builtin::ALL.into_iter().map(Builtin::entry).collect();
        entries[1].no_publish = true;
        let doc = generate(&descriptor(), &entries);
        let names: Vec<_> = doc.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["ping", "version"]);
        assert!(doc.entry("lbheartbeat").is_none());
    }

    #[test]
    fn test_serialization_is_stable() {
        let entries: Vec<_> = Builtin::ALL.into_iter().map(Builtin::entry).collect();
        let a = generate(&descriptor(), &entries).to_json_pretty().unwrap();
        let b = generate(&descriptor(), &entries).to_json_pretty().unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("{\n  \"$schema\""));
        assert!(a.ends_with("}\n"));
    }
}
