pub mod components;
pub mod document;
pub mod media_type;
pub mod operation;
pub mod parameter;
pub mod request_body;
pub mod response;
pub mod schema;

use crate::error::ParseError;
use document::OpenApiDocument;

/// Parse an OpenAPI document from YAML.
pub fn from_yaml(input: &str) -> Result<OpenApiDocument, ParseError> {
    let doc: OpenApiDocument = serde_yaml_ng::from_str(input)?;
    validate_version(&doc)?;
    Ok(doc)
}

/// Parse an OpenAPI document from JSON.
pub fn from_json(input: &str) -> Result<OpenApiDocument, ParseError> {
    let doc: OpenApiDocument = serde_json::from_str(input)?;
    validate_version(&doc)?;
    Ok(doc)
}

/// Parse an already-loaded document tree.
pub fn from_value(value: serde_json::Value) -> Result<OpenApiDocument, ParseError> {
    let doc: OpenApiDocument = serde_json::from_value(value)?;
    validate_version(&doc)?;
    Ok(doc)
}

pub fn to_yaml(doc: &OpenApiDocument) -> Result<String, ParseError> {
    Ok(serde_yaml_ng::to_string(doc)?)
}

pub fn to_json(doc: &OpenApiDocument) -> Result<String, ParseError> {
    Ok(serde_json::to_string_pretty(doc)?)
}

fn validate_version(doc: &OpenApiDocument) -> Result<(), ParseError> {
    if !doc.openapi.starts_with("3.") {
        return Err(ParseError::UnsupportedVersion(doc.openapi.clone()));
    }
    Ok(())
}
