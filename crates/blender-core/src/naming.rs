//! Naming strategies deriving a type name and discriminator value for a
//! product schema from its location and content.

use serde_json::Value;

use crate::normalize::names::capitalize;

/// Number of `:`-separated segments after `urn:` in a MEF URN.
const MEF_URN_SEGMENTS: usize = 7;

/// Index of the segment holding the product name.
const MEF_URN_NAME_SEGMENT: usize = 4;

/// A derived type name and the value a polymorphic parent maps to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAndDiscriminator {
    pub name: String,
    discriminator_value: Option<String>,
}

impl NameAndDiscriminator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discriminator_value: None,
        }
    }

    pub fn with_discriminator(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            discriminator_value: Some(value.into()),
        }
    }

    /// The explicit discriminator value, or the name when there is none.
    pub fn discriminator_value(&self) -> &str {
        self.discriminator_value.as_deref().unwrap_or(&self.name)
    }
}

/// One way of naming a product schema.
pub trait NamingStrategy {
    /// Name a schema from the location it was read from (`file#fragment`) and
    /// the parsed content of that file.
    fn name_from_location(&self, location: &str, content: Option<&Value>)
    -> Option<NameAndDiscriminator>;

    /// Name a schema from a free-form identifier such as a rename hint.
    fn name_from_text(&self, text: &str) -> Option<NameAndDiscriminator>;
}

/// Names schemas whose `$id` is a `urn:mef:` URN.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrnNaming;

impl NamingStrategy for UrnNaming {
    fn name_from_location(
        &self,
        _location: &str,
        content: Option<&Value>,
    ) -> Option<NameAndDiscriminator> {
        let id = content?.get("$id")?.as_str()?;
        parse_mef_urn(id)
    }

    fn name_from_text(&self, text: &str) -> Option<NameAndDiscriminator> {
        parse_mef_urn(text)
    }
}

/// Names schemas after the last segment of the location's `#fragment`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentNaming;

impl NamingStrategy for FragmentNaming {
    fn name_from_location(
        &self,
        location: &str,
        _content: Option<&Value>,
    ) -> Option<NameAndDiscriminator> {
        self.name_from_text(location)
    }

    fn name_from_text(&self, text: &str) -> Option<NameAndDiscriminator> {
        let (_, fragment) = text.split_once('#')?;
        last_segment(fragment).map(NameAndDiscriminator::new)
    }
}

/// Names schemas after the last segment of the location's path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathNaming;

impl NamingStrategy for PathNaming {
    fn name_from_location(
        &self,
        location: &str,
        _content: Option<&Value>,
    ) -> Option<NameAndDiscriminator> {
        self.name_from_text(location)
    }

    fn name_from_text(&self, text: &str) -> Option<NameAndDiscriminator> {
        let path = text.split_once('#').map_or(text, |(p, _)| p);
        last_segment(path).map(NameAndDiscriminator::new)
    }
}

/// Ordered strategies; the first one to produce a name wins.
pub struct NamingChain {
    strategies: Vec<Box<dyn NamingStrategy>>,
}

impl Default for NamingChain {
    /// URN, then fragment, then path.
    fn default() -> Self {
        Self::new(vec![
            Box::new(UrnNaming),
            Box::new(FragmentNaming),
            Box::new(PathNaming),
        ])
    }
}

impl NamingChain {
    pub fn new(strategies: Vec<Box<dyn NamingStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, location: &str, content: Option<&Value>) -> Option<NameAndDiscriminator> {
        self.strategies
            .iter()
            .find_map(|s| s.name_from_location(location, content))
    }

    pub fn name_from_text(&self, text: &str) -> Option<String> {
        self.strategies
            .iter()
            .find_map(|s| s.name_from_text(text))
            .map(|n| n.name)
    }
}

/// Parse `urn:mef:<a>:<b>:<c>:<product-name>:<e>:<f>`. The name is the fifth
/// segment with the first letter of each hyphen-separated token upper-cased;
/// the full URN is the discriminator value.
pub fn parse_mef_urn(id: &str) -> Option<NameAndDiscriminator> {
    let (scheme, rest) = id.split_once(':')?;
    if scheme != "urn" {
        return None;
    }
    let segments: Vec<&str> = rest.split(':').collect();
    if segments.len() != MEF_URN_SEGMENTS || segments[0] != "mef" {
        return None;
    }
    let name: String = segments[MEF_URN_NAME_SEGMENT]
        .split('-')
        .filter(|token| !token.is_empty())
        .map(capitalize)
        .collect();
    if name.is_empty() {
        return None;
    }
    Some(NameAndDiscriminator::with_discriminator(name, id))
}

fn last_segment(s: &str) -> Option<&str> {
    s.rsplit('/').find(|segment| !segment.is_empty())
}
