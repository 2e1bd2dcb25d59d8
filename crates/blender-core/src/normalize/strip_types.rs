use log::debug;

use super::for_each_property;
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::Schema;

/// Drop the `type` keyword from properties (and array items) that are
/// `$ref`s; the referenced schema already says what it is.
pub fn strip_superfluous_types(doc: &mut OpenApiDocument) {
    for_each_property(doc, |scope, name, property| {
        if strip(property) {
            debug!("{}.{name}: dropped type beside $ref", scope.owner);
        }
        if let Some(items) = property.items.as_deref_mut() {
            strip(items);
        }
    });
}

fn strip(schema: &mut Schema) -> bool {
    schema.ref_path.is_some() && schema.schema_type.take().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_strips_type_next_to_ref() {
        let mut doc = parse::from_yaml(
            r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    A:
      type: object
      properties:
        b:
          type: object
          $ref: '#/components/schemas/B'
        list:
          type: array
          items:
            type: object
            $ref: '#/components/schemas/B'
        plain:
          type: string
    B:
      type: object
"#,
        )
        .unwrap();

        strip_superfluous_types(&mut doc);

        let a = doc.schema("A").unwrap();
        assert!(a.properties["b"].schema_type.is_none());
        assert!(a.properties["list"].items.as_ref().unwrap().schema_type.is_none());
        assert!(a.properties["list"].schema_type.is_some());
        assert!(a.properties["plain"].schema_type.is_some());
        assert!(a.schema_type.is_some());
    }
}
