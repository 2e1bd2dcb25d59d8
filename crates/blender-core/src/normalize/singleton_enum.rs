use log::{debug, info, warn};
use serde_json::Value;

use super::{lookup_all, one_of_groups, shared_discriminator};
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::Schema;

/// Turn single-value enums on a `oneOf` group's shared discriminator property
/// into `x-discriminator-value` extensions.
///
/// Pre: enums with several values have been externalized.
/// Post: for every top-level `oneOf` of pure references whose members all pin
/// the shared discriminator property to one value, each member carries that
/// value as `x-discriminator-value` and the property no longer has an enum.
pub fn singleton_enum_to_discriminator_value(doc: &mut OpenApiDocument) {
    for (group, members) in one_of_groups(doc) {
        let Some(schemas) = lookup_all(doc, &members) else {
            warn!("{group}: oneOf references a missing schema");
            continue;
        };
        let Some(property) = shared_discriminator(&schemas) else {
            debug!("{group}: no shared discriminator property");
            continue;
        };
        let values: Vec<String> = schemas
            .iter()
            .filter_map(|schema| single_value(schema.properties.get(property)?))
            .collect();
        if values.len() != members.len() {
            warn!("{group}: not every member pins {property} to a single value");
            continue;
        }

        let schemas = doc.schemas_mut();
        for (member, value) in members.iter().zip(values) {
            let Some(schema) = schemas.get_mut(member) else {
                continue;
            };
            info!("{member}: discriminator value {value}");
            if let Some(pinned) = schema.properties.get_mut(property) {
                pinned.enum_values.clear();
            }
            schema.extensions.discriminator_value = Some(value);
        }
    }
}

fn single_value(property: &Schema) -> Option<String> {
    match property.enum_values.as_slice() {
        [Value::String(value)] => Some(value.clone()),
        [value] => Some(value.to_string()),
        _ => None,
    }
}
