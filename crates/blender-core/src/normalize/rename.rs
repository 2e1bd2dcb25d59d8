use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, info, warn};

use super::for_each_schema_mut;
use crate::error::RenameError;
use crate::naming::NamingChain;
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::{Schema, schema_ref};

/// Old name to new name for every schema whose `x-try-renaming-on` hint
/// yields a different name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    substitutions: IndexMap<String, String>,
}

impl RenamePlan {
    /// Collect the renames the hints ask for. Fails when two types would get
    /// the same name or a new name is already used by a type that keeps its
    /// name.
    pub fn build(
        schemas: &IndexMap<String, Schema>,
        naming: &NamingChain,
    ) -> Result<Self, RenameError> {
        let mut substitutions = IndexMap::new();
        for (name, schema) in schemas {
            let Some(hint) = schema.extensions.rename_hint.as_deref() else {
                continue;
            };
            match naming.name_from_text(hint) {
                Some(new_name) if new_name != *name => {
                    substitutions.insert(name.clone(), new_name);
                }
                Some(_) => {}
                None => debug!("{name}: no name derivable from hint {hint}"),
            }
        }

        let mut targets = HashSet::new();
        for new_name in substitutions.values() {
            if !targets.insert(new_name) {
                return Err(RenameError::NonInjective(new_name.clone()));
            }
        }
        for (old_name, new_name) in &substitutions {
            if schemas.contains_key(new_name) && !substitutions.contains_key(new_name) {
                return Err(RenameError::Collision {
                    from: old_name.clone(),
                    to: new_name.clone(),
                });
            }
        }
        Ok(Self { substitutions })
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.substitutions.get(name).map(String::as_str)
    }

    /// Rename the schemas in place, keeping their order, and rewrite every
    /// reference to them.
    pub fn apply(&self, doc: &mut OpenApiDocument) {
        if self.is_empty() {
            return;
        }
        if let Some(components) = doc.components.as_mut() {
            let schemas = std::mem::take(&mut components.schemas);
            components.schemas = schemas
                .into_iter()
                .map(|(name, schema)| match self.substitutions.get(&name) {
                    Some(new_name) => (new_name.clone(), schema),
                    None => (name, schema),
                })
                .collect();
        }

        let references: HashMap<String, String> = self
            .substitutions
            .iter()
            .map(|(old, new)| (schema_ref(old), schema_ref(new)))
            .collect();
        let rewrite = |target: &mut String| {
            if let Some(new_target) = references.get(target.as_str()) {
                target.clone_from(new_target);
            }
        };
        for_each_schema_mut(doc, &mut |schema| {
            if let Some(target) = schema.ref_path.as_mut() {
                rewrite(target);
            }
            if let Some(discriminator) = schema.discriminator.as_mut() {
                discriminator.mapping.values_mut().for_each(rewrite);
            }
        });
    }
}

/// Apply `x-try-renaming-on` hints.
///
/// Pre: hints may appear on any top-level schema.
/// Post: either every hinted type is renamed, every `$ref` to it follows, and
/// the hints are gone; or, when the renames would be ambiguous, the document
/// is left exactly as it was.
pub fn rename_types(doc: &mut OpenApiDocument) {
    let Some(schemas) = doc.schemas() else {
        return;
    };
    let plan = match RenamePlan::build(schemas, &NamingChain::default()) {
        Ok(plan) => plan,
        Err(err) => {
            warn!("skipping type renames: {err}");
            return;
        }
    };
    for (old_name, new_name) in &plan.substitutions {
        info!("renaming {old_name} to {new_name}");
    }
    plan.apply(doc);
    for_each_schema_mut(doc, &mut |schema| schema.extensions.rename_hint = None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn doc(yaml: &str) -> OpenApiDocument {
        parse::from_yaml(yaml).unwrap()
    }

    const HINTED: &str = r#"
openapi: 3.0.1
info: {title: t, version: "1"}
paths:
  /orders:
    post:
      requestBody:
        content:
          application/json:
            schema: {$ref: '#/components/schemas/order.yaml'}
      responses:
        "201":
          description: created
          content:
            application/json:
              schema:
                type: array
                items: {$ref: '#/components/schemas/order.yaml'}
components:
  schemas:
    Root:
      type: object
      discriminator:
        propertyName: "@type"
        mapping:
          order: '#/components/schemas/order.yaml'
      properties:
        "@type": {type: string}
    order.yaml:
      x-try-renaming-on: "urn:mef:lso:spec:cantata:product-order:v1:all"
      allOf:
        - $ref: '#/components/schemas/Root'
        - properties:
            self: {$ref: '#/components/schemas/order.yaml'}
"#;

    #[test]
    fn test_renames_types_and_rewrites_refs() {
        let mut doc = doc(HINTED);
        rename_types(&mut doc);

        let names: Vec<&str> = doc.schemas().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, ["Root", "ProductOrder"]);

        let serialized = parse::to_yaml(&doc).unwrap();
        assert!(!serialized.contains("order.yaml"));
        assert!(!serialized.contains("x-try-renaming-on"));
        assert_eq!(
            doc.schema("Root").unwrap().discriminator.as_ref().unwrap().mapping["order"],
            "#/components/schemas/ProductOrder"
        );
    }

    #[test]
    fn test_non_injective_hints_leave_document_unchanged() {
        let mut doc = doc(
            r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    A:
      x-try-renaming-on: Same
      type: object
    B:
      x-try-renaming-on: Same
      type: object
"#,
        );
        let before = doc.clone();
        assert_eq!(
            RenamePlan::build(doc.schemas().unwrap(), &NamingChain::default()),
            Err(RenameError::NonInjective("Same".to_string()))
        );
        rename_types(&mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_collision_with_untouched_name_aborts() {
        let mut doc = doc(
            r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    A:
      x-try-renaming-on: B
      type: object
    B:
      type: string
"#,
        );
        let before = doc.clone();
        rename_types(&mut doc);
        assert_eq!(doc, before);
    }

    #[test]
    fn test_swapping_names_is_allowed() {
        let mut doc = doc(
            r#"
openapi: 3.0.1
info: {title: t, version: "1"}
components:
  schemas:
    A:
      x-try-renaming-on: B
      properties:
        other: {$ref: '#/components/schemas/B'}
    B:
      x-try-renaming-on: A
      type: string
"#,
        );
        rename_types(&mut doc);
        let b = doc.schema("B").unwrap();
        assert_eq!(
            b.properties["other"].ref_path.as_deref(),
            Some("#/components/schemas/A")
        );
        assert!(doc.schema("A").unwrap().properties.is_empty());
    }
}
