use log::{info, warn};

use crate::parse::document::OpenApiDocument;
use crate::parse::schema::{ref_name, schema_ref};

/// Register every child in its parent's discriminator mapping.
///
/// A child is a top-level schema whose first pure-reference `allOf` member
/// points at a schema with a discriminator. The child maps under its
/// `x-discriminator-value`, or under its own name when it has none.
pub fn update_discriminator_mapping(doc: &mut OpenApiDocument) {
    let entries: Vec<(String, String, String)> = doc
        .schemas()
        .into_iter()
        .flatten()
        .filter_map(|(name, schema)| {
            let parent = schema
                .all_of
                .iter()
                .find(|m| m.is_pure_ref())
                .and_then(|m| m.ref_path.as_deref())
                .and_then(ref_name)?;
            doc.schema(parent)?.discriminator.as_ref()?;
            let value = schema
                .extensions
                .discriminator_value
                .clone()
                .unwrap_or_else(|| name.clone());
            Some((parent.to_string(), value, name.clone()))
        })
        .collect();

    let schemas = doc.schemas_mut();
    for (parent, value, child) in entries {
        let Some(discriminator) = schemas
            .get_mut(&parent)
            .and_then(|p| p.discriminator.as_mut())
        else {
            continue;
        };
        let target = schema_ref(&child);
        if let Some(previous) = discriminator.mapping.get(&value) {
            if *previous != target {
                warn!("{parent}: mapping for {value} moves from {previous} to {target}");
            }
        }
        info!("{parent}: {value} -> {child}");
        discriminator.mapping.insert(value, target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_children_are_mapped_by_value_or_name() {
        let mut doc = parse::from_yaml(
            r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    Product:
      type: object
      discriminator:
        propertyName: "@type"
      properties:
        "@type": {type: string}
    Ovc:
      x-discriminator-value: "urn:mef:ovc"
      allOf:
        - $ref: '#/components/schemas/Product'
        - type: object
    Uni:
      allOf:
        - $ref: '#/components/schemas/Product'
    Plain:
      allOf:
        - $ref: '#/components/schemas/Other'
    Other:
      type: object
"#,
        )
        .unwrap();

        update_discriminator_mapping(&mut doc);

        let mapping = &doc.schema("Product").unwrap().discriminator.as_ref().unwrap().mapping;
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping["urn:mef:ovc"], "#/components/schemas/Ovc");
        assert_eq!(mapping["Uni"], "#/components/schemas/Uni");
        assert!(doc.schema("Other").unwrap().discriminator.is_none());
    }
}
