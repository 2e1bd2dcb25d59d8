use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::schema::Schema;

/// A media type object. `itemSchema` is the OpenAPI 3.2 schema of the
/// individual items of a streamed body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,

    #[serde(rename = "itemSchema", skip_serializing_if = "Option::is_none")]
    pub item_schema: Option<Schema>,

    /// Examples, encodings and vendor extensions pass through.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl MediaType {
    pub fn schemas_mut(&mut self) -> impl Iterator<Item = &mut Schema> {
        self.schema.iter_mut().chain(self.item_schema.iter_mut())
    }
}
