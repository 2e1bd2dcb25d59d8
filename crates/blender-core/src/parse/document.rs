use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::components::Components;
use super::operation::PathItem;
use super::schema::Schema;

/// Info object describing the API.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub version: String,

    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

/// Top-level OpenAPI 3.x document.
///
/// Only the parts the blender rewrites are typed; servers, tags, security
/// requirements and any other top-level keys pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    pub openapi: String,

    #[serde(default)]
    pub info: Info,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub paths: IndexMap<String, PathItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<Vec<serde_json::Value>>,

    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl OpenApiDocument {
    /// An otherwise empty document declaring the given version.
    pub fn empty(openapi: &str) -> Self {
        Self {
            openapi: openapi.to_string(),
            info: Info::default(),
            servers: Vec::new(),
            paths: IndexMap::new(),
            components: None,
            tags: Vec::new(),
            security: None,
            extra: IndexMap::new(),
        }
    }

    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.components.as_ref()?.schemas.get(name)
    }

    pub fn schemas(&self) -> Option<&IndexMap<String, Schema>> {
        self.components.as_ref().map(|c| &c.schemas)
    }

    /// Schema components, creating the components section on demand.
    pub fn schemas_mut(&mut self) -> &mut IndexMap<String, Schema> {
        &mut self.components.get_or_insert_with(Components::default).schemas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schemas_follow_components() {
        let mut doc = OpenApiDocument::empty("3.0.3");
        assert!(doc.schemas().is_none());

        doc.schemas_mut().insert("Pet".to_string(), Schema::default());
        let names: Vec<&str> = doc.schemas().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, ["Pet"]);
        assert!(doc.schema("Pet").is_some());
    }
}
