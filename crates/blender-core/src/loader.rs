use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{LoadError, ParseError};
use crate::location::normalize_path;
use crate::parse::{self, document::OpenApiDocument};

/// Source of raw JSON/YAML documents, keyed by path.
pub trait DocumentLoader {
    fn load(&self, path: &Path) -> Result<Value, LoadError>;
}

/// Reads documents from disk. `.json` files are parsed as JSON, anything else
/// as YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl DocumentLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<Value, LoadError> {
        if !path.is_file() {
            return Err(LoadError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        parse_text(path, &content)
    }
}

/// Serves documents registered up front; useful for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    documents: HashMap<PathBuf, Value>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, document: Value) {
        self.documents
            .insert(normalize_path(path.as_ref()), document);
    }

    pub fn with(mut self, path: impl AsRef<Path>, document: Value) -> Self {
        self.insert(path, document);
        self
    }
}

impl DocumentLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<Value, LoadError> {
        self.documents
            .get(&normalize_path(path))
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_path_buf(),
            })
    }
}

/// Parse document text, choosing the format from the file extension.
pub fn parse_text(path: &Path, content: &str) -> Result<Value, LoadError> {
    let parsed = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(ParseError::from),
        _ => serde_yaml_ng::from_str(content).map_err(ParseError::from),
    };
    parsed.map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and parse a target OpenAPI document.
pub fn load_document<L: DocumentLoader + ?Sized>(
    loader: &L,
    path: &Path,
) -> Result<OpenApiDocument, LoadError> {
    let value = loader.load(path)?;
    parse::from_value(value).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
