//! Post-merge normalization.
//!
//! [`normalize`] runs a fixed, ordered list of passes over the document. Each
//! pass is a plain function mutating the document in place; later passes rely
//! on the shape earlier ones leave behind (enums are externalized before
//! singleton enums become discriminator values, `oneOf` groups are turned into
//! inheritance before mappings are filled in, and so on).

mod cleanup;
mod constrain;
mod enums;
mod hoist;
mod mapping;
pub mod names;
mod one_of;
mod rename;
mod singleton_enum;
mod strip_types;

use indexmap::IndexMap;
use log::debug;

use crate::parse::document::OpenApiDocument;
use crate::parse::operation::Operation;
use crate::parse::parameter::ParameterOrRef;
use crate::parse::request_body::RequestBodyOrRef;
use crate::parse::response::ResponseOrRef;
use crate::parse::schema::{Schema, ref_name};

pub use cleanup::{remove_default_parameter_values, remove_transient_extensions};
pub use constrain::constrain_discriminator_values;
pub use enums::externalize_enums;
pub use hoist::hoist_composed_properties;
pub use mapping::update_discriminator_mapping;
pub use one_of::one_of_to_all_of;
pub use rename::{RenamePlan, rename_types};
pub use singleton_enum::singleton_enum_to_discriminator_value;
pub use strip_types::strip_superfluous_types;

/// Property names recognised as a discriminator shared by `oneOf` members,
/// in order of preference.
pub const DISCRIMINATOR_CANDIDATES: [&str; 4] = ["@type", "mapType", "kind", "type"];

pub type Pass = fn(&mut OpenApiDocument);

/// The normalization passes, in execution order.
pub const PIPELINE: &[(&str, Pass)] = &[
    ("strip-superfluous-types", strip_superfluous_types),
    ("rename-types", rename_types),
    ("externalize-enums", externalize_enums),
    ("hoist-composed-properties", hoist_composed_properties),
    (
        "singleton-enum-to-discriminator-value",
        singleton_enum_to_discriminator_value,
    ),
    ("one-of-to-all-of", one_of_to_all_of),
    ("update-discriminator-mapping", update_discriminator_mapping),
    ("constrain-discriminator-values", constrain_discriminator_values),
    ("remove-default-parameter-values", remove_default_parameter_values),
    ("remove-transient-extensions", remove_transient_extensions),
];

/// Run every pass of [`PIPELINE`] over `doc`.
pub fn normalize(doc: &mut OpenApiDocument) {
    for (name, pass) in PIPELINE {
        debug!("running pass {name}");
        pass(doc);
    }
}

/// Order schema components alphabetically.
pub fn sort_schemas_by_name(doc: &mut OpenApiDocument) {
    if let Some(components) = doc.components.as_mut() {
        components.schemas.sort_keys();
    }
}

/// What a property visitor sees besides the property itself: the name of the
/// top-level type being walked and the schema table, where new types can be
/// registered.
pub(crate) struct PropertyScope<'a> {
    pub owner: &'a str,
    pub schemas: &'a mut IndexMap<String, Schema>,
}

/// Visit every property of every top-level schema, including properties
/// declared inside composition members.
///
/// The schema being walked is detached from the table while its properties are
/// visited, so the visitor may insert new top-level schemas. Schemas added
/// during the walk are not visited themselves.
pub(crate) fn for_each_property<F>(doc: &mut OpenApiDocument, mut visit: F)
where
    F: FnMut(&mut PropertyScope<'_>, &str, &mut Schema),
{
    let Some(components) = doc.components.as_mut() else {
        return;
    };
    let schemas = &mut components.schemas;
    let names: Vec<String> = schemas.keys().cloned().collect();
    for name in names {
        let Some(slot) = schemas.get_mut(&name) else {
            continue;
        };
        let mut schema = std::mem::take(slot);
        let mut scope = PropertyScope {
            owner: &name,
            schemas: &mut *schemas,
        };
        visit_properties(&mut scope, &mut schema, &mut visit);
        if let Some(slot) = schemas.get_mut(&name) {
            *slot = schema;
        }
    }
}

fn visit_properties<F>(scope: &mut PropertyScope<'_>, schema: &mut Schema, visit: &mut F)
where
    F: FnMut(&mut PropertyScope<'_>, &str, &mut Schema),
{
    for (name, property) in schema.properties.iter_mut() {
        visit(scope, name, property);
    }
    for member in schema
        .all_of
        .iter_mut()
        .chain(schema.one_of.iter_mut())
        .chain(schema.any_of.iter_mut())
    {
        visit_properties(scope, member, visit);
    }
}

/// Apply `f` to every schema node reachable from the document: component
/// schemas, parameters, request bodies and responses, plus each path
/// operation's parameters, request body and responses. Subschemas are visited
/// after their parent.
pub(crate) fn for_each_schema_mut(doc: &mut OpenApiDocument, f: &mut impl FnMut(&mut Schema)) {
    if let Some(components) = doc.components.as_mut() {
        for schema in components.schemas.values_mut() {
            walk(schema, f);
        }
        for parameter in components.parameters.values_mut() {
            walk_parameter(parameter, f);
        }
        for body in components.request_bodies.values_mut() {
            walk_request_body(body, f);
        }
        for response in components.responses.values_mut() {
            walk_response(response, f);
        }
    }
    for item in doc.paths.values_mut() {
        for parameter in &mut item.parameters {
            walk_parameter(parameter, f);
        }
        for operation in item.operations_mut() {
            walk_operation(operation, f);
        }
    }
}

fn walk(schema: &mut Schema, f: &mut impl FnMut(&mut Schema)) {
    f(schema);
    for child in schema.children_mut() {
        walk(child, f);
    }
}

fn walk_operation(operation: &mut Operation, f: &mut impl FnMut(&mut Schema)) {
    for parameter in &mut operation.parameters {
        walk_parameter(parameter, f);
    }
    if let Some(body) = operation.request_body.as_mut() {
        walk_request_body(body, f);
    }
    for response in operation.responses.values_mut() {
        walk_response(response, f);
    }
}

fn walk_parameter(parameter: &mut ParameterOrRef, f: &mut impl FnMut(&mut Schema)) {
    if let ParameterOrRef::Parameter(parameter) = parameter {
        if let Some(schema) = parameter.schema.as_mut() {
            walk(schema, f);
        }
    }
}

fn walk_request_body(body: &mut RequestBodyOrRef, f: &mut impl FnMut(&mut Schema)) {
    if let RequestBodyOrRef::RequestBody(body) = body {
        for media in body.content.values_mut() {
            for schema in media.schemas_mut() {
                walk(schema, f);
            }
        }
    }
}

fn walk_response(response: &mut ResponseOrRef, f: &mut impl FnMut(&mut Schema)) {
    if let ResponseOrRef::Response(response) = response {
        for media in response.content.values_mut() {
            for schema in media.schemas_mut() {
                walk(schema, f);
            }
        }
    }
}

/// Names of the members of every top-level `oneOf` made only of pure
/// references, keyed by the owning schema. Duplicate members are dropped.
pub(crate) fn one_of_groups(doc: &OpenApiDocument) -> Vec<(String, Vec<String>)> {
    doc.schemas()
        .into_iter()
        .flatten()
        .filter(|(_, schema)| {
            !schema.one_of.is_empty() && schema.one_of.iter().all(Schema::is_pure_ref)
        })
        .map(|(name, schema)| {
            let mut members: Vec<String> = Vec::new();
            for member in &schema.one_of {
                let member_name = member.ref_path.as_deref().and_then(ref_name);
                if let Some(member_name) = member_name {
                    if !members.iter().any(|m| m == member_name) {
                        members.push(member_name.to_string());
                    }
                }
            }
            (name.clone(), members)
        })
        .collect()
}

/// Look up every named schema, or `None` if one is missing.
pub(crate) fn lookup_all<'d>(doc: &'d OpenApiDocument, names: &[String]) -> Option<Vec<&'d Schema>> {
    names.iter().map(|name| doc.schema(name)).collect()
}

/// The first discriminator candidate every schema declares as a property.
pub(crate) fn shared_discriminator(schemas: &[&Schema]) -> Option<&'static str> {
    if schemas.is_empty() {
        return None;
    }
    DISCRIMINATOR_CANDIDATES
        .into_iter()
        .find(|candidate| schemas.iter().all(|s| s.properties.contains_key(*candidate)))
}
