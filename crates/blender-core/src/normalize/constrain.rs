use std::collections::HashSet;

use log::{info, warn};
use serde_json::Value;

use crate::parse::document::OpenApiDocument;
use crate::parse::schema::{Composition, Schema, SchemaKind, ref_name};

/// Restrict discriminator properties to the values their mapping knows.
///
/// Pre: discriminator mappings are complete.
/// Post: for every schema with a non-empty mapping, the discriminator property
/// (declared on the schema, in a composition member, or inherited through a
/// `$ref`) has `enum` equal to the mapping keys.
pub fn constrain_discriminator_values(doc: &mut OpenApiDocument) {
    let constraints: Vec<(String, String, Vec<Value>)> = doc
        .schemas()
        .into_iter()
        .flatten()
        .filter_map(|(name, schema)| {
            let discriminator = schema.discriminator.as_ref()?;
            if discriminator.mapping.is_empty() {
                warn!("{name}: discriminator {} has no mapping", discriminator.property_name);
                return None;
            }
            let values = discriminator
                .mapping
                .keys()
                .map(|k| Value::String(k.clone()))
                .collect();
            Some((name.clone(), discriminator.property_name.clone(), values))
        })
        .collect();

    for (name, property, values) in constraints {
        let mut visited = HashSet::new();
        let Some(location) = locate(doc, &name, &property, &mut visited) else {
            warn!("{name}: discriminator property {property} not found");
            continue;
        };
        let Some(target) = location.resolve_mut(doc, &property) else {
            continue;
        };
        info!("{name}: {property} limited to {} values", values.len());
        target.enum_values = values;
    }
}

/// Where a property lives: a top-level schema and the composition members
/// leading down to the schema that declares it.
struct PropertyLocation {
    schema: String,
    path: Vec<(Composition, usize)>,
}

impl PropertyLocation {
    fn resolve_mut<'d>(&self, doc: &'d mut OpenApiDocument, property: &str) -> Option<&'d mut Schema> {
        let mut schema = doc.schemas_mut().get_mut(&self.schema)?;
        for (composition, index) in &self.path {
            schema = schema.members_mut(*composition).get_mut(*index)?;
        }
        schema.properties.get_mut(property)
    }
}

fn locate(
    doc: &OpenApiDocument,
    name: &str,
    property: &str,
    visited: &mut HashSet<String>,
) -> Option<PropertyLocation> {
    if !visited.insert(name.to_string()) {
        return None;
    }
    let schema = doc.schema(name)?;
    locate_in(doc, name, schema, property, &mut Vec::new(), visited)
}

fn locate_in(
    doc: &OpenApiDocument,
    owner: &str,
    schema: &Schema,
    property: &str,
    path: &mut Vec<(Composition, usize)>,
    visited: &mut HashSet<String>,
) -> Option<PropertyLocation> {
    if schema.properties.contains_key(property) {
        return Some(PropertyLocation {
            schema: owner.to_string(),
            path: path.clone(),
        });
    }
    for composition in Composition::ALL {
        for (index, member) in schema.members(composition).iter().enumerate() {
            let found = match member.kind() {
                SchemaKind::Reference(reference) => {
                    ref_name(reference).and_then(|n| locate(doc, n, property, visited))
                }
                SchemaKind::Composed | SchemaKind::Object | SchemaKind::Array | SchemaKind::Primitive => {
                    path.push((composition, index));
                    let found = locate_in(doc, owner, member, property, path, visited);
                    path.pop();
                    found
                }
            };
            if found.is_some() {
                return found;
            }
        }
    }
    None
}
