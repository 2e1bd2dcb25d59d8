//! Reads product schema fragments into top-level schemas extending a target.

use indexmap::IndexMap;
use log::{debug, info, warn};

use crate::error::ResolveError;
use crate::loader::DocumentLoader;
use crate::location::FragmentLocation;
use crate::merge::SchemaBatch;
use crate::naming::{NameAndDiscriminator, NamingChain};
use crate::parse::schema::{Schema, SchemaKind, ref_name, schema_ref};
use crate::resolve::SchemaResolver;

/// Name the synthetic wrapper is resolved under; never a valid schema name in
/// the output.
const WRAPPER_NAME: &str = "#blend-wrapper";

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    /// Schema every product schema extends unless it names its own target.
    pub target: String,
    /// Honour `x-mef-target` on product schemas.
    pub autodiscover: bool,
}

pub struct ProductSpecReader<'l, L: DocumentLoader + ?Sized> {
    loader: &'l L,
    options: ReaderOptions,
    naming: NamingChain,
}

impl<'l, L: DocumentLoader + ?Sized> ProductSpecReader<'l, L> {
    pub fn new(loader: &'l L, options: ReaderOptions) -> Self {
        Self {
            loader,
            options,
            naming: NamingChain::default(),
        }
    }

    /// Read one fragment. The result holds the product schema, named by the
    /// naming chain, plus every schema it pulled in.
    ///
    /// The product schema is `allOf: [<target ref>, ...fragment members]` and
    /// carries the fragment's vendor extensions, with `x-discriminator-value`
    /// defaulted from the naming chain.
    pub fn read(
        &self,
        location: &FragmentLocation,
    ) -> Result<IndexMap<String, Schema>, ResolveError> {
        let content = self.loader.load(location.path())?;
        let hint = location.file_name_with_fragment();
        let named = self
            .naming
            .resolve(&hint, Some(&content))
            .unwrap_or_else(|| NameAndDiscriminator::new(hint.clone()));
        debug!("reading {location} as {}", named.name);

        let wrapper = Schema {
            all_of: vec![
                Schema::component_ref(&self.options.target),
                Schema::reference(hint.as_str()),
            ],
            ..Default::default()
        };
        let mut resolved =
            SchemaResolver::new(self.loader, location.base_dir()).resolve(WRAPPER_NAME, &wrapper)?;

        let mut wrapper = resolved.shift_remove(WRAPPER_NAME).unwrap_or_default();
        let fragment_ref = wrapper
            .all_of
            .pop()
            .and_then(|member| member.ref_path)
            .unwrap_or_default();
        let fragment_name = ref_name(&fragment_ref).unwrap_or_default().to_string();
        let mut fragment = resolved.shift_remove(&fragment_name).unwrap_or_default();

        // Anything that pointed back at the fragment now points at the product.
        let product_ref = schema_ref(&named.name);
        for schema in resolved.values_mut() {
            schema.visit_refs_mut(&mut |target| {
                if *target == fragment_ref {
                    target.clone_from(&product_ref);
                }
            });
        }

        let mut extensions = std::mem::take(&mut fragment.extensions);
        if extensions.discriminator_value.is_none() {
            extensions.discriminator_value = Some(named.discriminator_value().to_string());
        }
        let parent = match extensions.target.clone() {
            Some(target) if self.options.autodiscover => {
                info!("{} extends {target}", named.name);
                Schema::component_ref(&target)
            }
            Some(target) => {
                debug!("ignoring x-mef-target {target} on {}", named.name);
                extensions.target = None;
                wrapper.all_of.pop().unwrap_or_default()
            }
            None => wrapper.all_of.pop().unwrap_or_default(),
        };

        fragment.title = None;
        let description = match fragment.kind() {
            SchemaKind::Composed if fragment.properties.is_empty() => fragment.description.take(),
            _ => None,
        };
        let mut all_of = vec![parent];
        all_of.extend(unpack(fragment));

        let product = Schema {
            description,
            all_of,
            extensions,
            ..Default::default()
        };
        if resolved.contains_key(&named.name) {
            warn!("{} replaces a schema pulled in by {location}", named.name);
        }
        resolved.insert(named.name, product);
        Ok(resolved)
    }

    /// Read every fragment, grouping the resulting definitions by name.
    pub fn read_all(&self, locations: &[FragmentLocation]) -> Result<SchemaBatch, ResolveError> {
        let mut batch = SchemaBatch::default();
        for location in locations {
            let schemas = self.read(location)?;
            batch.add(&location.to_string(), schemas);
        }
        Ok(batch)
    }
}

/// Members the product schema inherits from: a composed fragment's members
/// (plus its own properties as an object), anything else as-is.
fn unpack(mut fragment: Schema) -> Vec<Schema> {
    match fragment.kind() {
        SchemaKind::Composed => {
            let mut members: Vec<Schema> = std::mem::take(&mut fragment.all_of);
            members.append(&mut fragment.one_of);
            members.append(&mut fragment.any_of);
            if !fragment.properties.is_empty() {
                members.push(Schema {
                    schema_type: fragment.schema_type,
                    description: fragment.description,
                    properties: fragment.properties,
                    required: fragment.required,
                    ..Default::default()
                });
            }
            members
        }
        SchemaKind::Reference(_) | SchemaKind::Object | SchemaKind::Array | SchemaKind::Primitive => {
            vec![fragment]
        }
    }
}
