use std::collections::HashMap;

use indexmap::IndexMap;
use log::{info, warn};
use sha2::{Digest, Sha256};

use super::names::{common_prefix, propose_name};
use super::{PropertyScope, for_each_property};
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::{Composition, Schema, SchemaKind, ref_name, schema_ref};

/// Lift composed properties into named top-level types.
///
/// Pre: properties (or their array items) may be inline compositions.
/// Post: a composition with more than one pure `$ref` member is a `$ref` to a
/// top-level type; structurally equal compositions share one type. A
/// composition wrapping exactly one pure `$ref` is collapsed to that `$ref`.
pub fn hoist_composed_properties(doc: &mut OpenApiDocument) {
    let Some(schemas) = doc.schemas() else {
        return;
    };
    let mut index = CompositionIndex::build(schemas);
    for_each_property(doc, |scope, name, property| {
        match property.kind() {
            SchemaKind::Array => {
                if let Some(items) = property.items.as_deref_mut() {
                    hoist(scope, &mut index, name, items);
                }
            }
            SchemaKind::Composed => hoist(scope, &mut index, name, property),
            SchemaKind::Reference(_) | SchemaKind::Object | SchemaKind::Primitive => {}
        }
    });
}

fn hoist(
    scope: &mut PropertyScope<'_>,
    index: &mut CompositionIndex,
    property_name: &str,
    schema: &mut Schema,
) {
    if schema.kind() != SchemaKind::Composed {
        return;
    }

    if schema.count_references() <= 1 {
        collapse_single_ref(schema);
        return;
    }

    let description = schema.description.clone();
    let type_name = match index.find_unique(schema) {
        Some(existing) => existing,
        None => {
            let type_name = candidate_name(scope, property_name, schema);
            let mut hoisted = std::mem::take(schema);
            hoisted.description.clone_from(&description);
            index.register(&type_name, &hoisted);
            info!("{}.{property_name}: composition moved to {type_name}", scope.owner);
            scope.schemas.insert(type_name.clone(), hoisted);
            type_name
        }
    };
    *schema = Schema {
        ref_path: Some(schema_ref(&type_name)),
        description,
        ..Default::default()
    };
}

/// `allOf: [$ref]` (or `oneOf`/`anyOf`) with nothing else becomes the `$ref`.
fn collapse_single_ref(schema: &mut Schema) {
    let target = {
        let mut members = schema.all_members();
        match (members.next(), members.next()) {
            (Some(only), None) if only.is_pure_ref() => only.ref_path.clone(),
            _ => return,
        }
    };
    if !schema.properties.is_empty() {
        return;
    }
    *schema = Schema {
        ref_path: target,
        description: schema.description.take(),
        extensions: std::mem::take(&mut schema.extensions),
        ..Default::default()
    };
}

/// Name for a new composed type: the common prefix of the member names when
/// there is one and it is free, otherwise derived from the property.
fn candidate_name(scope: &PropertyScope<'_>, property_name: &str, schema: &Schema) -> String {
    let prefix = [Composition::AllOf, Composition::OneOf]
        .into_iter()
        .find_map(|composition| {
            let members = schema.members(composition);
            if members.is_empty() {
                return None;
            }
            common_prefix(
                members
                    .iter()
                    .filter_map(|m| m.ref_path.as_deref().and_then(ref_name)),
            )
        });
    match prefix {
        Some(prefix) if !scope.schemas.contains_key(&prefix) => prefix,
        _ => propose_name(scope.owner, property_name, scope.schemas),
    }
}

/// Top-level types made only of pure references, keyed by a digest of their
/// composition keyword and sorted member references.
struct CompositionIndex {
    by_fingerprint: HashMap<String, Vec<String>>,
}

impl CompositionIndex {
    fn build(schemas: &IndexMap<String, Schema>) -> Self {
        let mut index = Self {
            by_fingerprint: HashMap::new(),
        };
        for (name, schema) in schemas {
            index.register(name, schema);
        }
        index
    }

    fn register(&mut self, name: &str, schema: &Schema) {
        if let Some(fingerprint) = fingerprint(schema) {
            self.by_fingerprint
                .entry(fingerprint)
                .or_default()
                .push(name.to_string());
        }
    }

    fn find_unique(&self, schema: &Schema) -> Option<String> {
        let candidates = self.by_fingerprint.get(&fingerprint(schema)?)?;
        match candidates.as_slice() {
            [only] => Some(only.clone()),
            _ => {
                warn!("several types match one composition: {}", candidates.join(", "));
                None
            }
        }
    }
}

fn fingerprint(schema: &Schema) -> Option<String> {
    let composition = schema.referencing_composition()?;
    let mut references: Vec<&str> = schema
        .members(composition)
        .iter()
        .filter_map(|m| m.ref_path.as_deref())
        .collect();
    references.sort_unstable();
    let digest = Sha256::digest(format!("{}:{}", composition.keyword(), references.join(",")));
    Some(format!("{digest:x}"))
}
