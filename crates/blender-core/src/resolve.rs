//! Pulls externally referenced schemas into a flat, document-local set.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::debug;
use serde_json::Value;

use crate::error::ResolveError;
use crate::loader::DocumentLoader;
use crate::location::normalize_path;
use crate::parse::schema::{Schema, schema_ref};

/// Resolves `$ref`s reachable from a root schema into document-local
/// `#/components/schemas/<name>` references.
///
/// References in the root that start with `#` address the target document and
/// are kept. Every other reference is loaded relative to the file it appears in
/// (the root's references relative to `base_dir`), given a unique local name and
/// rewritten. Each `(file, pointer)` pair is imported once, which also makes
/// cyclic references terminate.
pub struct SchemaResolver<'l, L: DocumentLoader + ?Sized> {
    loader: &'l L,
    base_dir: PathBuf,
    documents: HashMap<PathBuf, Value>,
    assigned: HashMap<String, String>,
    taken: HashSet<String>,
    resolved: IndexMap<String, Schema>,
}

impl<'l, L: DocumentLoader + ?Sized> SchemaResolver<'l, L> {
    pub fn new(loader: &'l L, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            loader,
            base_dir: base_dir.into(),
            documents: HashMap::new(),
            assigned: HashMap::new(),
            taken: HashSet::new(),
            resolved: IndexMap::new(),
        }
    }

    /// Resolve `root` and everything it transitively references. The result
    /// holds the rewritten root under `root_name` plus every imported schema.
    pub fn resolve(
        mut self,
        root_name: &str,
        root: &Schema,
    ) -> Result<IndexMap<String, Schema>, ResolveError> {
        self.taken.insert(root_name.to_string());
        let mut root = root.clone();
        self.localize(&mut root, None)?;
        self.resolved.insert(root_name.to_string(), root);
        Ok(self.resolved)
    }

    fn localize(&mut self, schema: &mut Schema, origin: Option<&Path>) -> Result<(), ResolveError> {
        if let Some(reference) = schema.ref_path.take() {
            schema.ref_path = Some(self.localize_ref(&reference, origin)?);
        }
        if let Some(discriminator) = schema.discriminator.as_mut() {
            for target in discriminator.mapping.values_mut() {
                if is_reference_like(target) {
                    *target = self.localize_ref(target, origin)?;
                }
            }
        }
        for child in schema.children_mut() {
            self.localize(child, origin)?;
        }
        Ok(())
    }

    fn localize_ref(&mut self, reference: &str, origin: Option<&Path>) -> Result<String, ResolveError> {
        let (file_part, pointer) = reference.split_once('#').unwrap_or((reference, ""));
        if file_part.contains("://") {
            return Err(ResolveError::UnsupportedRef {
                reference: reference.to_string(),
                path: origin.map_or_else(|| self.base_dir.clone(), Path::to_path_buf),
            });
        }

        let file = match (file_part.is_empty(), origin) {
            (true, None) => return Ok(reference.to_string()),
            (true, Some(current)) => current.to_path_buf(),
            (false, _) => {
                let base = origin
                    .and_then(Path::parent)
                    .unwrap_or(self.base_dir.as_path());
                normalize_path(&base.join(file_part))
            }
        };

        let key = format!("{}#{}", file.display(), pointer);
        if let Some(name) = self.assigned.get(&key) {
            return Ok(schema_ref(name));
        }

        let value = {
            let document = self.document(&file)?;
            navigate(document, pointer).cloned()
        };
        let value = value.ok_or_else(|| ResolveError::PointerNotFound {
            path: file.clone(),
            pointer: pointer.to_string(),
        })?;
        if !value.is_object() {
            return Err(ResolveError::NotASchema {
                path: file,
                pointer: pointer.to_string(),
            });
        }

        let name = self.unique_name(&proposed_name(&file, pointer));
        debug!("importing {key} as {name}");
        self.assigned.insert(key, name.clone());

        let mut schema: Schema =
            serde_json::from_value(value).map_err(|source| ResolveError::InvalidSchema {
                path: file.clone(),
                pointer: pointer.to_string(),
                source,
            })?;
        schema.strip_metadata_keywords();
        self.localize(&mut schema, Some(&file))?;
        self.resolved.insert(name.clone(), schema);
        Ok(schema_ref(&name))
    }

    fn document(&mut self, path: &Path) -> Result<&Value, ResolveError> {
        let document = match self.documents.entry(path.to_path_buf()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(self.loader.load(path)?),
        };
        Ok(document)
    }

    fn unique_name(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut counter = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{base}_{counter}");
            counter += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

/// Follow a JSON pointer (`/a/b/0`, `~1` and `~0` escapes) into a document.
pub fn navigate<'v>(document: &'v Value, pointer: &str) -> Option<&'v Value> {
    if pointer.is_empty() || pointer == "/" {
        return Some(document);
    }
    let mut current = document;
    for raw in pointer.strip_prefix('/')?.split('/') {
        let segment = raw.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Last non-empty pointer segment, or the file stem for whole-file references.
fn proposed_name(file: &Path, pointer: &str) -> String {
    if let Some(segment) = pointer.rsplit('/').find(|s| !s.is_empty()) {
        return segment.replace("~1", "/").replace("~0", "~");
    }
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Schema".to_string())
}

fn is_reference_like(target: &str) -> bool {
    target.contains('#')
        || target.contains('/')
        || matches!(
            Path::new(target).extension().and_then(|e| e.to_str()),
            Some("json" | "yaml" | "yml")
        )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::loader::MemoryLoader;

    fn root(product: &str) -> Schema {
        Schema {
            all_of: vec![
                Schema::component_ref("Target"),
                Schema::reference(product),
            ],
            ..Default::default()
        }
    }

    fn loader() -> MemoryLoader {
        MemoryLoader::new()
            .with(
                "specs/product.yaml",
                json!({
                    "$id": "urn:x",
                    "definitions": {
                        "Product": {
                            "type": "object",
                            "properties": {
                                "address": { "$ref": "common/types.yaml#/definitions/Address" },
                                "other": { "$ref": "#/definitions/Address" }
                            }
                        },
                        "Address": { "type": "string" }
                    }
                }),
            )
            .with(
                "specs/common/types.yaml",
                json!({
                    "definitions": {
                        "Address": {
                            "type": "object",
                            "$comment": "dropped",
                            "x-kept": true,
                            "properties": {
                                "parent": { "$ref": "#/definitions/Address" },
                                "geo": { "$ref": "../geo.json" }
                            }
                        }
                    }
                }),
            )
            .with("specs/geo.json", json!({ "type": "object", "title": "Geo" }))
    }

    #[test]
    fn test_resolves_transitive_refs_with_unique_names() {
        let loader = loader();
        let schema = root("product.yaml#/definitions/Product");
        let resolved = SchemaResolver::new(&loader, "specs")
            .resolve("Wrapper", &schema)
            .unwrap();

        let mut names: Vec<&str> = resolved.keys().map(String::as_str).collect();
        names.sort();
        assert_eq!(names, ["Address", "Address_1", "Product", "Wrapper", "geo"]);

        let wrapper = &resolved["Wrapper"];
        assert_eq!(
            wrapper.all_of[0].ref_path.as_deref(),
            Some("#/components/schemas/Target")
        );
        assert_eq!(
            wrapper.all_of[1].ref_path.as_deref(),
            Some("#/components/schemas/Product")
        );

        let product = &resolved["Product"];
        let address_ref = product.properties["address"].ref_path.clone().unwrap();
        let other_ref = product.properties["other"].ref_path.clone().unwrap();
        assert_ne!(address_ref, other_ref);

        let address_name = crate::parse::schema::ref_name(&address_ref).unwrap();
        let address = &resolved[address_name];
        assert_eq!(
            address.properties["parent"].ref_path.as_deref(),
            Some(address_ref.as_str())
        );
        assert_eq!(
            address.properties["geo"].ref_path.as_deref(),
            Some("#/components/schemas/geo")
        );
        assert!(address.extensions.other.contains_key("x-kept"));
        assert!(!address.extensions.other.contains_key("$comment"));
    }

    #[test]
    fn test_imported_constraints_are_kept() {
        let loader = MemoryLoader::new()
            .with(
                "specs/p.yaml",
                json!({
                    "$schema": "http://json-schema.org/draft-07/schema#",
                    "type": "object",
                    "minProperties": 1,
                    "properties": {
                        "n": { "type": "integer", "multipleOf": 5, "deprecated": true },
                        "s": { "type": "string", "not": { "$ref": "banned.yaml" } }
                    }
                }),
            )
            .with("specs/banned.yaml", json!({ "enum": ["x"] }));
        let resolved = SchemaResolver::new(&loader, "specs")
            .resolve("Wrapper", &root("p.yaml"))
            .unwrap();

        let product = serde_json::to_value(&resolved["p"]).unwrap();
        assert_eq!(
            product,
            json!({
                "type": "object",
                "properties": {
                    "n": { "type": "integer", "multipleOf": 5, "deprecated": true },
                    "s": { "type": "string", "not": { "$ref": "#/components/schemas/banned" } }
                },
                "minProperties": 1
            })
        );
        assert_eq!(resolved["banned"].enum_values, [json!("x")]);
    }

    #[test]
    fn test_root_is_not_mutated() {
        let loader = loader();
        let schema = root("product.yaml#/definitions/Product");
        let before = schema.clone();
        SchemaResolver::new(&loader, "specs")
            .resolve("Wrapper", &schema)
            .unwrap();
        assert_eq!(schema, before);
    }

    #[test]
    fn test_missing_file_is_reported_with_path() {
        let loader = loader();
        let err = SchemaResolver::new(&loader, "specs")
            .resolve("Wrapper", &root("missing.yaml#/definitions/X"))
            .unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_missing_pointer_is_reported() {
        let loader = loader();
        let err = SchemaResolver::new(&loader, "specs")
            .resolve("Wrapper", &root("product.yaml#/definitions/Nope"))
            .unwrap_err();
        match err {
            ResolveError::PointerNotFound { path, pointer } => {
                assert_eq!(path, PathBuf::from("specs/product.yaml"));
                assert_eq!(pointer, "/definitions/Nope");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_remote_refs_are_rejected() {
        let loader = loader();
        let err = SchemaResolver::new(&loader, "specs")
            .resolve("Wrapper", &root("https://example.com/a.json#/A"))
            .unwrap_err();
        assert!(matches!(err, ResolveError::UnsupportedRef { .. }));
    }

    #[test]
    fn test_navigate_unescapes_segments() {
        let doc = json!({ "paths": { "/pets": { "items": [1, { "ok": true }] } } });
        assert_eq!(
            navigate(&doc, "/paths/~1pets/items/1/ok"),
            Some(&json!(true))
        );
        assert_eq!(navigate(&doc, ""), Some(&doc));
        assert_eq!(navigate(&doc, "/missing"), None);
    }
}
