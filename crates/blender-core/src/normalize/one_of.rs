use log::{info, warn};

use super::{lookup_all, one_of_groups, shared_discriminator};
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::{Discriminator, Schema, SchemaType, TypeSet};

/// Replace `oneOf` groups by a discriminated parent that each member extends.
///
/// Pre: members of a `oneOf` of pure references share a discriminator
/// property (one of the recognised candidates).
/// Post: the group's schema is an object with that property, a matching
/// `discriminator` and `required` entry; each member is
/// `allOf: [<group ref>, <member without the property>]`, with its title and
/// vendor extensions moved to the wrapper. Groups without a shared property,
/// or with a missing member, are left untouched.
pub fn one_of_to_all_of(doc: &mut OpenApiDocument) {
    for (group, members) in one_of_groups(doc) {
        if members.iter().any(|member| *member == group) {
            warn!("{group}: oneOf refers to itself");
            continue;
        }
        let Some(schemas) = lookup_all(doc, &members) else {
            warn!("{group}: oneOf references a missing schema");
            continue;
        };
        let Some(property) = shared_discriminator(&schemas) else {
            warn!("{group}: oneOf members share no discriminator property");
            continue;
        };
        let discriminator_property = schemas[0].properties[property].clone();

        let schemas = doc.schemas_mut();
        let Some(old) = schemas.get_mut(&group) else {
            continue;
        };
        let parent = Schema {
            schema_type: Some(TypeSet::Single(SchemaType::Object)),
            title: old.title.take(),
            description: old.description.take(),
            properties: [(property.to_string(), discriminator_property)]
                .into_iter()
                .collect(),
            required: vec![property.to_string()],
            discriminator: Some(Discriminator::new(property)),
            extensions: std::mem::take(&mut old.extensions),
            ..Default::default()
        };
        *old = parent;
        info!("{group}: oneOf replaced by discriminator {property}");

        for member in &members {
            let Some(slot) = schemas.get_mut(member) else {
                continue;
            };
            let mut body = std::mem::take(slot);
            body.properties.shift_remove(property);
            body.required.retain(|r| r != property);
            *slot = Schema {
                title: body.title.take(),
                extensions: std::mem::take(&mut body.extensions),
                all_of: vec![Schema::component_ref(&group), body],
                ..Default::default()
            };
        }
    }
}
