use indexmap::IndexMap;

use crate::parse::schema::Schema;

/// Upper-case the first character, leaving the rest alone.
pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Replace characters that cannot appear in a type name.
pub fn escape(name: &str) -> String {
    name.replace('@', "_at").replace('!', "_ex")
}

/// Type name for something extracted from `property` of `owner`: the
/// capitalized property name, prefixed with the owner when that is taken, and
/// numbered when both are.
pub fn propose_name(owner: &str, property: &str, taken: &IndexMap<String, Schema>) -> String {
    let base = escape(&capitalize(property));
    if !taken.contains_key(&base) {
        return base;
    }
    unique_name(&format!("{owner}{base}"), taken)
}

/// `base`, or `base` followed by the first free number.
pub fn unique_name(base: &str, taken: &IndexMap<String, Schema>) -> String {
    if !taken.contains_key(base) {
        return base.to_string();
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{base}{counter}");
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Longest common prefix of `names`, if it is not blank.
pub fn common_prefix<'a>(names: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut names = names.into_iter();
    let first = names.next()?;
    let mut len = first.len();
    for name in names {
        len = first
            .char_indices()
            .zip(name.chars())
            .take_while(|((_, a), b)| a == b)
            .map(|((i, a), _)| i + a.len_utf8())
            .last()
            .unwrap_or(0)
            .min(len);
    }
    let prefix = first[..len].trim();
    (!prefix.is_empty()).then(|| prefix.to_string())
}
