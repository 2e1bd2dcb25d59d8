use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
}

/// A `$ref` or fragment location that could not be dereferenced.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid fragment location '{0}': at most one '#' is allowed")]
    InvalidLocation(String),

    #[error("unsupported reference '{reference}' in {}", path.display())]
    UnsupportedRef { reference: String, path: PathBuf },

    #[error("cannot load referenced document: {0}")]
    Load(#[from] LoadError),

    #[error("pointer '{pointer}' not found in {}", path.display())]
    PointerNotFound { path: PathBuf, pointer: String },

    #[error("'{pointer}' in {} is not a schema object", path.display())]
    NotASchema { path: PathBuf, pointer: String },

    #[error("invalid schema at '{pointer}' in {}: {source}", path.display())]
    InvalidSchema {
        path: PathBuf,
        pointer: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("target schema '{0}' not found in the document")]
    TargetNotFound(String),

    #[error("schemas were supplied but no target schema could be determined")]
    NoTarget,

    #[error("target schema '{target}' has no {missing} and mode {mode} does not repair it")]
    Discriminator {
        target: String,
        missing: &'static str,
        mode: crate::merge::MergeMode,
    },

    #[error("conflicting definitions for schema '{name}': {}", format_groups(.groups))]
    Conflict {
        name: String,
        groups: Vec<Vec<String>>,
    },

    #[error("'{reference}' in the ancestry of '{target}' does not resolve to a schema")]
    UnresolvedAncestor { target: String, reference: String },
}

fn format_groups(groups: &[Vec<String>]) -> String {
    groups
        .iter()
        .map(|group| format!("[{}]", group.join(", ")))
        .collect::<Vec<_>>()
        .join(" vs ")
}

/// Raised while planning type renames. The rename pass logs it and leaves the
/// document untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenameError {
    #[error("rename hints map several types onto '{0}'")]
    NonInjective(String),

    #[error("renaming '{from}' to '{to}' collides with an existing type")]
    Collision { from: String, to: String },
}

#[derive(Debug, Error)]
pub enum BlendError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),
}
