use log::info;

use super::names::propose_name;
use super::{PropertyScope, for_each_property};
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::{Schema, SchemaType, TypeSet};

/// Lift inline enums with more than one value into top-level schemas.
///
/// Pre: enums may be declared inline on properties or their array items.
/// Post: every such enum is a named schema referenced by `$ref`; single-value
/// enums stay inline so they can later become discriminator values.
pub fn externalize_enums(doc: &mut OpenApiDocument) {
    for_each_property(doc, |scope, name, property| {
        if is_externalizable(property) {
            externalize(scope, name, property);
        } else if let Some(items) = property.items.as_deref_mut() {
            if is_externalizable(items) {
                externalize(scope, name, items);
            }
        }
    });
}

fn is_externalizable(schema: &Schema) -> bool {
    schema.ref_path.is_none() && schema.enum_values.len() > 1
}

fn externalize(scope: &mut PropertyScope<'_>, property_name: &str, schema: &mut Schema) {
    let type_name = propose_name(scope.owner, property_name, scope.schemas);
    let mut enum_schema = std::mem::replace(schema, Schema::component_ref(&type_name));
    if enum_schema.schema_type.is_none() {
        enum_schema.schema_type = Some(TypeSet::Single(SchemaType::String));
    }
    info!("{}.{property_name}: enum moved to {type_name}", scope.owner);
    scope.schemas.insert(type_name, enum_schema);
}
