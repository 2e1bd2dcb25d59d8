//! One blending run: read fragments, merge them into the target document,
//! then normalize.

use std::path::Path;

use log::info;

use crate::error::BlendError;
use crate::loader::{DocumentLoader, load_document};
use crate::location::FragmentLocation;
use crate::merge::{self, MergeMode};
use crate::normalize;
use crate::parse::document::OpenApiDocument;
use crate::parse::schema::Schema;
use crate::reader::{ProductSpecReader, ReaderOptions};

/// Schema product specifications extend when nothing else is configured.
pub const DEFAULT_TARGET: &str = "MEFProductConfiguration";

/// OpenAPI version written into schemas-only documents.
const SCHEMAS_ONLY_VERSION: &str = "3.0.3";

#[derive(Debug, Clone)]
pub struct BlendOptions {
    pub target: String,
    pub mode: MergeMode,
    pub autodiscover: bool,
    pub sorted: bool,
}

impl Default for BlendOptions {
    fn default() -> Self {
        Self {
            target: DEFAULT_TARGET.to_string(),
            mode: MergeMode::default(),
            autodiscover: false,
            sorted: false,
        }
    }
}

pub struct Blender {
    options: BlendOptions,
}

impl Blender {
    pub fn new(options: BlendOptions) -> Self {
        Self { options }
    }

    /// Blend the fragments at `locations` into `document` and run the full
    /// normalization pipeline over the result.
    pub fn blend<L: DocumentLoader + ?Sized>(
        &self,
        loader: &L,
        mut document: OpenApiDocument,
        locations: &[FragmentLocation],
    ) -> Result<OpenApiDocument, BlendError> {
        self.merge_into(loader, &mut document, locations)?;
        normalize::normalize(&mut document);
        self.finish(&mut document);
        Ok(document)
    }

    /// Load the document at `path` and blend the fragments into it.
    pub fn blend_file<L: DocumentLoader + ?Sized>(
        &self,
        loader: &L,
        path: &Path,
        locations: &[FragmentLocation],
    ) -> Result<OpenApiDocument, BlendError> {
        let document = load_document(loader, path)?;
        self.blend(loader, document, locations)
    }

    /// Merge the fragments into a document holding nothing but an empty
    /// target schema. Only composed properties are hoisted afterwards.
    pub fn merge_schemas<L: DocumentLoader + ?Sized>(
        &self,
        loader: &L,
        locations: &[FragmentLocation],
    ) -> Result<OpenApiDocument, BlendError> {
        let mut document = schemas_only_document(&self.options.target);
        self.merge_into(loader, &mut document, locations)?;
        normalize::hoist_composed_properties(&mut document);
        self.finish(&mut document);
        Ok(document)
    }

    fn merge_into<L: DocumentLoader + ?Sized>(
        &self,
        loader: &L,
        document: &mut OpenApiDocument,
        locations: &[FragmentLocation],
    ) -> Result<(), BlendError> {
        let reader = ProductSpecReader::new(
            loader,
            ReaderOptions {
                target: self.options.target.clone(),
                autodiscover: self.options.autodiscover,
            },
        );
        let batch = reader.read_all(locations)?;
        info!(
            "merging {} schemas from {} product specifications",
            batch.len(),
            locations.len()
        );
        merge::merge(
            Some(&self.options.target),
            self.options.mode,
            &batch,
            document,
        )?;
        Ok(())
    }

    fn finish(&self, document: &mut OpenApiDocument) {
        if self.options.sorted {
            normalize::sort_schemas_by_name(document);
        }
    }
}

/// A document whose components hold only an empty `target` schema.
pub fn schemas_only_document(target: &str) -> OpenApiDocument {
    let mut document = OpenApiDocument::empty(SCHEMAS_ONLY_VERSION);
    document
        .schemas_mut()
        .insert(target.to_string(), Schema::default());
    document
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::loader::MemoryLoader;
    use crate::parse;

    const API: &str = r#"
openapi: 3.0.1
info: {title: Ordering, version: "1"}
paths: {}
components:
  schemas:
    MEFProductConfiguration:
      type: object
      properties:
        "@type": {type: string}
"#;

    fn loader() -> MemoryLoader {
        MemoryLoader::new().with(
            "products/ovc.yaml",
            json!({
                "$id": "urn:mef:lso:spec:cantata:carrier-ethernet-ovc:v1:all",
                "type": "object",
                "properties": {
                    "state": { "type": "string", "enum": ["up", "down"] }
                }
            }),
        )
    }

    fn locations() -> Vec<FragmentLocation> {
        vec![FragmentLocation::parse("products/ovc.yaml").unwrap()]
    }

    #[test]
    fn test_blend_adds_product_and_discriminator() {
        let document = parse::from_yaml(API).unwrap();
        let blended = Blender::new(BlendOptions::default())
            .blend(&loader(), document, &locations())
            .unwrap();

        let target = blended.schema(DEFAULT_TARGET).unwrap();
        let discriminator = target.discriminator.as_ref().unwrap();
        assert_eq!(discriminator.property_name, "@type");
        assert_eq!(
            discriminator.mapping["urn:mef:lso:spec:cantata:carrier-ethernet-ovc:v1:all"],
            "#/components/schemas/CarrierEthernetOvc"
        );
        assert!(blended.schema("CarrierEthernetOvc").is_some());
        assert!(blended.schema("State").is_some());
    }

    #[test]
    fn test_sorted_output() {
        let document = parse::from_yaml(API).unwrap();
        let options = BlendOptions {
            sorted: true,
            ..Default::default()
        };
        let blended = Blender::new(options)
            .blend(&loader(), document, &locations())
            .unwrap();
        let names: Vec<&str> = blended.schemas().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, ["CarrierEthernetOvc", "MEFProductConfiguration", "State"]);
    }

    #[test]
    fn test_missing_target_fails() {
        let document = parse::from_yaml(API).unwrap();
        let options = BlendOptions {
            target: "Absent".to_string(),
            ..Default::default()
        };
        let err = Blender::new(options)
            .blend(&loader(), document, &locations())
            .unwrap_err();
        assert!(matches!(err, BlendError::Merge(_)));
    }

    #[test]
    fn test_blend_file_loads_target_document() {
        let loader = loader().with(
            "api/ordering.json",
            json!({
                "openapi": "3.0.1",
                "info": { "title": "Ordering", "version": "1" },
                "components": {
                    "schemas": { "MEFProductConfiguration": { "type": "object" } }
                }
            }),
        );
        let blended = Blender::new(BlendOptions::default())
            .blend_file(&loader, Path::new("api/ordering.json"), &locations())
            .unwrap();
        assert_eq!(blended.info.title, "Ordering");
        assert!(blended.schema("CarrierEthernetOvc").is_some());

        let err = Blender::new(BlendOptions::default())
            .blend_file(&loader, Path::new("api/absent.json"), &locations())
            .unwrap_err();
        assert!(matches!(err, BlendError::Load(_)));
    }

    #[test]
    fn test_merge_schemas_starts_from_empty_target() {
        let merged = Blender::new(BlendOptions::default())
            .merge_schemas(&loader(), &locations())
            .unwrap();
        assert!(merged.paths.is_empty());
        let names: Vec<&str> = merged.schemas().unwrap().keys().map(String::as_str).collect();
        assert_eq!(names, [DEFAULT_TARGET, "CarrierEthernetOvc"]);
        assert!(
            merged
                .schema(DEFAULT_TARGET)
                .unwrap()
                .discriminator
                .is_some()
        );
    }
}
