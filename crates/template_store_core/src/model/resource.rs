//! Declarative resource shapes.
//!
//! # Responsibility
//! - Define object metadata shared by every stored resource kind.
//! - Define the `Template` resource and its list form.
//!
//! # Invariants
//! - JSON field names follow the declarative API (`apiVersion`, `metadata`,
//!   `resourceVersion`, ...) and must stay stable.
//! - Unset metadata fields are omitted from JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation carrying the legacy `Provenance` string form.
pub const PROVENANCE_ANNOTATION: &str = "provenance";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    pub api_version: String,
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub generation: i64,
    /// Unix epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// Contract every object persisted by a `Storage` implementation satisfies.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn metadata(&self) -> &ObjectMeta;

    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Returns whether user-authored content (spec) matches, ignoring
    /// storage-managed metadata such as uid or resource version.
    fn same_spec(&self, other: &Self) -> bool;

    /// Takes spec and annotations from `source`, keeping storage-managed
    /// metadata. Annotations absent from `source` are kept.
    fn adopt_content(&mut self, source: &Self);

    fn name(&self) -> &str {
        &self.metadata().name
    }
}

/// List of resources plus the store revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList<R> {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    pub items: Vec<R>,
}

impl<R> ResourceList<R> {
    pub fn new(items: Vec<R>) -> Self {
        Self {
            resource_version: String::new(),
            items,
        }
    }
}

impl<R> Default for ResourceList<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSpec {
    /// Template body.
    pub template: String,
}

/// Notification template in its declarative form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateResource {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub spec: TemplateSpec,
}

impl TemplateResource {
    /// Returns the `provenance` annotation, if present.
    pub fn provenance_annotation(&self) -> Option<&str> {
        self.metadata
            .annotations
            .get(PROVENANCE_ANNOTATION)
            .map(String::as_str)
    }
}

impl Resource for TemplateResource {
    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn same_spec(&self, other: &Self) -> bool {
        self.metadata.name == other.metadata.name && self.spec == other.spec
    }

    fn adopt_content(&mut self, source: &Self) {
        self.spec = source.spec.clone();
        for (key, value) in &source.metadata.annotations {
            self.metadata.annotations.insert(key.clone(), value.clone());
        }
    }
}

pub type TemplateList = ResourceList<TemplateResource>;

#[cfg(test)]
mod tests {
    use super::{ObjectMeta, Resource, TemplateResource, TemplateSpec, TypeMeta};
    use serde_json::json;

    fn template(name: &str, body: &str) -> TemplateResource {
        TemplateResource {
            type_meta: TypeMeta {
                api_version: "notifications.alerting.grafana.app/v0alpha1".to_string(),
                kind: "Template".to_string(),
            },
            metadata: ObjectMeta {
                name: name.to_string(),
                namespace: "default".to_string(),
                ..ObjectMeta::default()
            },
            spec: TemplateSpec {
                template: body.to_string(),
            },
        }
    }

    #[test]
    fn serializes_with_declarative_field_names() {
        let value = serde_json::to_value(template("t1", "{{ .A }}")).expect("serialize");
        assert_eq!(
            value,
            json!({
                "apiVersion": "notifications.alerting.grafana.app/v0alpha1",
                "kind": "Template",
                "metadata": {"name": "t1", "namespace": "default"},
                "spec": {"template": "{{ .A }}"}
            })
        );
    }

    #[test]
    fn same_spec_ignores_storage_metadata() {
        let left = template("t1", "body");
        let mut right = left.clone();
        right.metadata.uid = "abc".to_string();
        right.metadata.resource_version = "7".to_string();
        assert!(left.same_spec(&right));

        right.spec.template = "changed".to_string();
        assert!(!left.same_spec(&right));
    }

    #[test]
    fn adopt_content_keeps_storage_metadata() {
        let mut stored = template("t1", "old");
        stored.metadata.uid = "abc".to_string();
        stored.metadata.resource_version = "7".to_string();
        stored
            .metadata
            .annotations
            .insert("provenance".to_string(), String::new());
        stored
            .metadata
            .annotations
            .insert("note".to_string(), "kept".to_string());

        let mut source = template("t1", "new");
        source
            .metadata
            .annotations
            .insert("provenance".to_string(), "file".to_string());

        stored.adopt_content(&source);
        assert_eq!(stored.spec.template, "new");
        assert_eq!(stored.provenance_annotation(), Some("file"));
        assert_eq!(
            stored.metadata.annotations.get("note").map(String::as_str),
            Some("kept")
        );
        assert_eq!(stored.metadata.uid, "abc");
        assert_eq!(stored.metadata.resource_version, "7");
    }
}
