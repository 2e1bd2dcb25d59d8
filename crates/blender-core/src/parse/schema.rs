use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Prefix of every reference into the document's schema components.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// A JSON Schema type keyword value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

/// The `type` field can be a single type or an array of types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeSet {
    Single(SchemaType),
    Multiple(Vec<SchemaType>),
}

impl TypeSet {
    pub fn contains(&self, ty: &SchemaType) -> bool {
        match self {
            TypeSet::Single(t) => t == ty,
            TypeSet::Multiple(ts) => ts.contains(ty),
        }
    }
}

/// Keywords that describe the schema document rather than the schema.
const METADATA_KEYWORDS: [&str; 5] = ["$id", "$schema", "$comment", "definitions", "$defs"];

/// Discriminator for polymorphic schemas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Discriminator {
    #[serde(rename = "propertyName")]
    pub property_name: String,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub mapping: IndexMap<String, String>,
}

impl Discriminator {
    pub fn new(property_name: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            mapping: IndexMap::new(),
        }
    }
}

/// Vendor extensions carried on a schema.
///
/// The three extensions the blender reads and writes are typed fields; every
/// other unknown keyword is kept verbatim in `other`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Extensions {
    /// Value a polymorphic parent maps to this schema.
    #[serde(
        rename = "x-discriminator-value",
        skip_serializing_if = "Option::is_none"
    )]
    pub discriminator_value: Option<String>,

    /// Preferred name for this type, applied by the rename pass.
    #[serde(rename = "x-try-renaming-on", skip_serializing_if = "Option::is_none")]
    pub rename_hint: Option<String>,

    /// Target schema this product schema extends, overriding the default one.
    #[serde(rename = "x-mef-target", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(flatten)]
    pub other: IndexMap<String, serde_json::Value>,
}

impl Extensions {
    pub fn is_empty(&self) -> bool {
        self.discriminator_value.is_none()
            && self.rename_hint.is_none()
            && self.target.is_none()
            && self.other.is_empty()
    }

    /// Drop schema-document metadata keywords, keeping vendor extensions and
    /// every validation keyword without a typed field.
    pub fn strip_metadata(&mut self) {
        self.other
            .retain(|key, _| !METADATA_KEYWORDS.contains(&key.as_str()));
    }
}

/// A JSON Schema object (OpenAPI 3.x superset).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub ref_path: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<TypeSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    // Object properties
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,

    // Array items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    // Composition
    #[serde(rename = "allOf", skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    #[serde(rename = "oneOf", skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Schema>,

    #[serde(rename = "anyOf", skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<Schema>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub not: Option<Box<Schema>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<Discriminator>,

    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    // Numeric constraints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<serde_json::Value>,
    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<serde_json::Value>,

    // String constraints
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // Array constraints
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(rename = "uniqueItems", skip_serializing_if = "Option::is_none")]
    pub unique_items: Option<bool>,

    #[serde(rename = "readOnly", skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(rename = "writeOnly", skip_serializing_if = "Option::is_none")]
    pub write_only: Option<bool>,

    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extensions: Extensions,
}

/// `additionalProperties` can be a boolean or a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<Schema>),
}

/// Closed view over the shapes a schema can take. Passes match on it
/// exhaustively instead of probing individual keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind<'a> {
    Reference(&'a str),
    Composed,
    Object,
    Array,
    Primitive,
}

/// The three composition keywords, in the order they are visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Composition {
    AllOf,
    OneOf,
    AnyOf,
}

impl Composition {
    pub const ALL: [Composition; 3] = [Composition::AllOf, Composition::OneOf, Composition::AnyOf];

    pub fn keyword(self) -> &'static str {
        match self {
            Composition::AllOf => "allOf",
            Composition::OneOf => "oneOf",
            Composition::AnyOf => "anyOf",
        }
    }
}

impl Schema {
    /// A bare `$ref` schema.
    pub fn reference(target: impl Into<String>) -> Self {
        Self {
            ref_path: Some(target.into()),
            ..Default::default()
        }
    }

    /// A `$ref` to a schema in the document's components.
    pub fn component_ref(name: &str) -> Self {
        Self::reference(schema_ref(name))
    }

    pub fn kind(&self) -> SchemaKind<'_> {
        if let Some(target) = self.ref_path.as_deref() {
            return SchemaKind::Reference(target);
        }
        if !self.all_of.is_empty() || !self.one_of.is_empty() || !self.any_of.is_empty() {
            return SchemaKind::Composed;
        }
        let has_type = |ty: SchemaType| self.schema_type.as_ref().is_some_and(|t| t.contains(&ty));
        if self.items.is_some() || has_type(SchemaType::Array) {
            return SchemaKind::Array;
        }
        if has_type(SchemaType::Object)
            || !self.properties.is_empty()
            || self.additional_properties.is_some()
            || self.discriminator.is_some()
        {
            return SchemaKind::Object;
        }
        SchemaKind::Primitive
    }

    /// A `$ref` with no properties of its own.
    pub fn is_pure_ref(&self) -> bool {
        self.ref_path.is_some() && self.properties.is_empty()
    }

    pub fn members(&self, composition: Composition) -> &Vec<Schema> {
        match composition {
            Composition::AllOf => &self.all_of,
            Composition::OneOf => &self.one_of,
            Composition::AnyOf => &self.any_of,
        }
    }

    pub fn members_mut(&mut self, composition: Composition) -> &mut Vec<Schema> {
        match composition {
            Composition::AllOf => &mut self.all_of,
            Composition::OneOf => &mut self.one_of,
            Composition::AnyOf => &mut self.any_of,
        }
    }

    /// Every composition member, `allOf` first, then `oneOf`, then `anyOf`.
    pub fn all_members(&self) -> impl Iterator<Item = &Schema> {
        self.all_of.iter().chain(&self.one_of).chain(&self.any_of)
    }

    /// The first non-empty composition whose members are all pure references.
    pub fn referencing_composition(&self) -> Option<Composition> {
        Composition::ALL.into_iter().find(|c| {
            let members = self.members(*c);
            !members.is_empty() && members.iter().all(Schema::is_pure_ref)
        })
    }

    /// Number of pure-reference members across all compositions.
    pub fn count_references(&self) -> usize {
        self.all_members().filter(|m| m.is_pure_ref()).count()
    }

    /// Direct subschemas: properties, items, composition members, `not` and
    /// `additionalProperties`.
    pub fn children(&self) -> impl Iterator<Item = &Schema> {
        let additional = match &self.additional_properties {
            Some(AdditionalProperties::Schema(s)) => Some(s.as_ref()),
            _ => None,
        };
        self.properties
            .values()
            .chain(self.items.as_deref())
            .chain(self.all_members())
            .chain(self.not.as_deref())
            .chain(additional)
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Schema> {
        let additional = match &mut self.additional_properties {
            Some(AdditionalProperties::Schema(s)) => Some(s.as_mut()),
            _ => None,
        };
        self.properties
            .values_mut()
            .chain(self.items.as_deref_mut())
            .chain(self.all_of.iter_mut())
            .chain(self.one_of.iter_mut())
            .chain(self.any_of.iter_mut())
            .chain(self.not.as_deref_mut())
            .chain(additional)
    }

    /// Apply `f` to every `$ref` in this schema and its subschemas, including
    /// discriminator mapping targets.
    pub fn visit_refs_mut(&mut self, f: &mut impl FnMut(&mut String)) {
        if let Some(target) = self.ref_path.as_mut() {
            f(target);
        }
        if let Some(discriminator) = self.discriminator.as_mut() {
            for target in discriminator.mapping.values_mut() {
                f(target);
            }
        }
        for child in self.children_mut() {
            child.visit_refs_mut(f);
        }
    }

    /// Clear `extensions.other` of document metadata keywords, recursively.
    pub fn strip_metadata_keywords(&mut self) {
        self.extensions.strip_metadata();
        for child in self.children_mut() {
            child.strip_metadata_keywords();
        }
    }
}

/// `#/components/schemas/<name>`
pub fn schema_ref(name: &str) -> String {
    format!("{SCHEMA_REF_PREFIX}{name}")
}

/// The schema name a reference points at: the last segment of its fragment.
pub fn ref_name(reference: &str) -> Option<&str> {
    let fragment = reference.rsplit_once('#').map_or(reference, |(_, f)| f);
    fragment.rsplit('/').find(|s| !s.is_empty())
}
