//! Finding product specifications under a directory by their MEF URN.

use std::fs;
use std::path::Path;

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::LoadError;
use crate::loader::parse_text;
use crate::naming::{NamingStrategy, UrnNaming};

const DOCUMENT_EXTENSIONS: [&str; 3] = ["json", "yaml", "yml"];

/// Paths, relative to `root` and sorted, of every JSON or YAML document whose
/// MEF URN `$id` ends with `all` or with `function`.
///
/// Files that cannot be read or parsed are skipped.
pub fn find_product_specifications(root: &Path, function: &str) -> Result<Vec<String>, LoadError> {
    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|err| LoadError::Io {
            path: root.to_path_buf(),
            source: err.into(),
        })?;
        if !entry.file_type().is_file() || !has_document_extension(entry.path()) {
            continue;
        }
        if !matches_function(entry.path(), function) {
            info!("{} is not a MEF product specification for {function}, skipping", entry.path().display());
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        found.push(relative.to_string_lossy().replace('\\', "/"));
    }
    found.sort();
    debug!("found {} product specifications under {}", found.len(), root.display());
    Ok(found)
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| DOCUMENT_EXTENSIONS.contains(&e))
}

fn matches_function(path: &Path, function: &str) -> bool {
    let Ok(content) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(document) = parse_text(path, &content) else {
        return false;
    };
    UrnNaming
        .name_from_location("", Some(&document))
        .is_some_and(|named| {
            let value = named.discriminator_value();
            value.ends_with("all") || value.ends_with(function)
        })
}
