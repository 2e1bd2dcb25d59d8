//! Injects product schemas into a target document, making sure every target
//! they extend is polymorphic.

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::MergeError;
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::{Discriminator, Schema, SchemaKind, SchemaType, TypeSet, ref_name};

/// Discriminator property added to targets that lack one.
pub const DISCRIMINATOR_NAME: &str = "@type";

const DISCRIMINATOR_DESCRIPTION: &str =
    "Used as a discriminator to support polymorphic definitions";

/// Source label of definitions already present in the document.
pub const DOCUMENT_SOURCE: &str = "<document>";

/// How a target without discriminator support is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Add whatever is missing.
    #[default]
    Fix,
    /// Repair a target missing one of property or discriminator; fail when
    /// both are missing.
    Relaxed,
    /// Fail when either is missing.
    Strict,
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MergeMode::Fix => "fix",
            MergeMode::Relaxed => "relaxed",
            MergeMode::Strict => "strict",
        })
    }
}

/// One distinct definition of a name and the sources that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    pub schema: Schema,
    pub sources: Vec<String>,
}

/// Incoming schemas grouped by name. Structurally equal definitions from
/// different sources collapse into one variant; differing ones are kept apart
/// so a conflict can name every contributor.
#[derive(Debug, Clone, Default)]
pub struct SchemaBatch {
    entries: IndexMap<String, Vec<Variant>>,
}

impl SchemaBatch {
    pub fn insert(&mut self, source: &str, name: String, schema: Schema) {
        let variants = self.entries.entry(name).or_default();
        match variants.iter_mut().find(|v| v.schema == schema) {
            Some(variant) => variant.sources.push(source.to_string()),
            None => variants.push(Variant {
                schema,
                sources: vec![source.to_string()],
            }),
        }
    }

    pub fn add(&mut self, source: &str, schemas: IndexMap<String, Schema>) {
        for (name, schema) in schemas {
            self.insert(source, name, schema);
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn variants(&self, name: &str) -> &[Variant] {
        self.entries.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn schemas(&self) -> impl Iterator<Item = &Schema> {
        self.entries.values().flatten().map(|v| &v.schema)
    }
}

impl From<IndexMap<String, Schema>> for SchemaBatch {
    fn from(schemas: IndexMap<String, Schema>) -> Self {
        let mut batch = SchemaBatch::default();
        batch.add("<input>", schemas);
        batch
    }
}

pub struct SchemaMerger<'a> {
    default_target: Option<&'a str>,
    mode: MergeMode,
}

impl<'a> SchemaMerger<'a> {
    pub fn new(default_target: Option<&'a str>, mode: MergeMode) -> Self {
        Self {
            default_target,
            mode,
        }
    }

    /// Merge `batch` into `doc`.
    ///
    /// Targets are the `x-mef-target` values of the product schemas in the
    /// batch, plus the default target when some product schema names none.
    /// Every target must exist; it is then checked (and in FIX or RELAXED mode
    /// repaired) for a discriminator and its property before the batch is
    /// inserted. Repairs are staged on a copy, so nothing is written when any
    /// target or conflict check fails.
    pub fn execute(&self, batch: &SchemaBatch, doc: &mut OpenApiDocument) -> Result<(), MergeError> {
        if batch.is_empty() {
            debug!("nothing to merge");
            return Ok(());
        }

        let targets = self.targets(batch)?;
        for target in &targets {
            if doc.schema(target).is_none() {
                return Err(MergeError::TargetNotFound(target.clone()));
            }
        }

        let additions = plan_injection(batch, doc)?;

        let mut staged = doc.clone();
        for target in &targets {
            self.ensure_discriminator(&mut staged, target)?;
        }

        let schemas = staged.schemas_mut();
        for (name, schema) in additions {
            info!("adding schema {name}");
            schemas.insert(name, schema);
        }
        *doc = staged;
        Ok(())
    }

    fn targets(&self, batch: &SchemaBatch) -> Result<IndexSet<String>, MergeError> {
        let products: Vec<&Schema> = batch
            .schemas()
            .filter(|s| {
                s.extensions.discriminator_value.is_some() || s.extensions.target.is_some()
            })
            .collect();
        let counted = if products.is_empty() {
            batch.schemas().collect()
        } else {
            products
        };

        let mut targets = IndexSet::new();
        let mut needs_default = false;
        for schema in counted {
            match &schema.extensions.target {
                Some(target) => {
                    targets.insert(target.clone());
                }
                None => needs_default = true,
            }
        }
        if needs_default {
            match self.default_target {
                Some(target) if !target.is_empty() => {
                    targets.insert(target.to_string());
                }
                _ => return Err(MergeError::NoTarget),
            }
        }
        debug!("merge targets: {targets:?}");
        Ok(targets)
    }

    fn ensure_discriminator(&self, doc: &mut OpenApiDocument, target: &str) -> Result<(), MergeError> {
        let discriminator = find_in_ancestry(doc, target, |s| {
            s.discriminator.as_ref().map(|d| d.property_name.clone())
        })?;
        let property_name = discriminator
            .clone()
            .unwrap_or_else(|| DISCRIMINATOR_NAME.to_string());
        let has_property =
            find_in_ancestry(doc, target, |s| s.properties.contains_key(&property_name).then_some(()))?
                .is_some();
        let has_discriminator = discriminator.is_some();

        match (self.mode, has_discriminator, has_property) {
            (_, true, true) => return Ok(()),
            (MergeMode::Strict, false, _) => return Err(self.missing(target, "discriminator")),
            (MergeMode::Strict, true, false) => {
                return Err(self.missing(target, "discriminator property"));
            }
            (MergeMode::Relaxed, false, false) => {
                return Err(self.missing(target, "discriminator or discriminator property"));
            }
            (MergeMode::Relaxed, _, _) => {
                warn!("{target} is not fully polymorphic, repairing it");
            }
            (MergeMode::Fix, _, _) => {}
        }

        let Some(schema) = doc.schemas_mut().get_mut(target) else {
            return Err(MergeError::TargetNotFound(target.to_string()));
        };
        if !has_property {
            info!("adding discriminator property {property_name} to {target}");
            schema.properties.insert(
                property_name.clone(),
                Schema {
                    schema_type: Some(TypeSet::Single(SchemaType::String)),
                    description: Some(DISCRIMINATOR_DESCRIPTION.to_string()),
                    ..Default::default()
                },
            );
        }
        if !has_discriminator {
            info!("adding discriminator {property_name} to {target}");
            schema.discriminator = Some(Discriminator::new(property_name));
        }
        Ok(())
    }

    fn missing(&self, target: &str, missing: &'static str) -> MergeError {
        MergeError::Discriminator {
            target: target.to_string(),
            missing,
            mode: self.mode,
        }
    }
}

/// Merge `batch` into `doc` using `default_target` for product schemas that
/// name no target of their own.
pub fn merge(
    default_target: Option<&str>,
    mode: MergeMode,
    batch: &SchemaBatch,
    doc: &mut OpenApiDocument,
) -> Result<(), MergeError> {
    SchemaMerger::new(default_target, mode).execute(batch, doc)
}

/// New definitions to insert. Equal definitions already in the document are
/// skipped; any disagreement is a conflict.
fn plan_injection(
    batch: &SchemaBatch,
    doc: &OpenApiDocument,
) -> Result<Vec<(String, Schema)>, MergeError> {
    let mut additions = Vec::new();
    for (name, variants) in &batch.entries {
        let [variant] = variants.as_slice() else {
            return Err(MergeError::Conflict {
                name: name.clone(),
                groups: variants.iter().map(|v| v.sources.clone()).collect(),
            });
        };
        match doc.schema(name) {
            Some(existing) if *existing == variant.schema => {
                debug!("{name} is already present");
            }
            Some(_) => {
                return Err(MergeError::Conflict {
                    name: name.clone(),
                    groups: vec![vec![DOCUMENT_SOURCE.to_string()], variant.sources.clone()],
                });
            }
            None => additions.push((name.clone(), variant.schema.clone())),
        }
    }
    Ok(additions)
}

/// Depth-first search of `target` and its `allOf` ancestry, following local
/// `$ref`s once each.
fn find_in_ancestry<T>(
    doc: &OpenApiDocument,
    target: &str,
    probe: impl Fn(&Schema) -> Option<T>,
) -> Result<Option<T>, MergeError> {
    let Some(root) = doc.schema(target) else {
        return Err(MergeError::TargetNotFound(target.to_string()));
    };
    let mut visited = HashSet::from([target.to_string()]);
    let mut stack = vec![root];
    while let Some(schema) = stack.pop() {
        if let Some(found) = probe(schema) {
            return Ok(Some(found));
        }
        for member in schema.all_of.iter().rev() {
            match member.kind() {
                SchemaKind::Reference(reference) => {
                    let ancestor = ref_name(reference)
                        .and_then(|name| doc.schema(name).map(|s| (name, s)));
                    let Some((name, ancestor)) = ancestor else {
                        return Err(MergeError::UnresolvedAncestor {
                            target: target.to_string(),
                            reference: reference.to_string(),
                        });
                    };
                    if visited.insert(name.to_string()) {
                        stack.push(ancestor);
                    }
                }
                SchemaKind::Composed | SchemaKind::Object | SchemaKind::Array | SchemaKind::Primitive => {
                    stack.push(member)
                }
            }
        }
    }
    Ok(None)
}
