use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::ResolveError;

/// A product schema location: a file path plus an optional `#/json/pointer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentLocation {
    path: PathBuf,
    fragment: String,
}

impl FragmentLocation {
    /// Split `dir/file.yaml#/components/schemas/X` into its path and fragment.
    pub fn parse(location: &str) -> Result<Self, ResolveError> {
        let mut parts = location.split('#');
        let path = parts.next().unwrap_or_default();
        let fragment = parts.next();
        if parts.next().is_some() {
            return Err(ResolveError::InvalidLocation(location.to_string()));
        }
        Ok(Self {
            path: PathBuf::from(path),
            fragment: fragment.map(|f| format!("#{f}")).unwrap_or_default(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `#/pointer`, or empty when the location names a whole file.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The file name with its fragment appended, used as the naming hint.
    pub fn file_name_with_fragment(&self) -> String {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{file_name}{}", self.fragment)
    }

    /// Directory the file lives in; relative references resolve against it.
    pub fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub fn with_path(&self, path: PathBuf) -> Self {
        Self {
            path,
            fragment: self.fragment.clone(),
        }
    }
}

impl fmt::Display for FragmentLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path.display(), self.fragment)
    }
}

/// Resolves product schema paths against the specification root directory.
#[derive(Debug, Clone)]
pub struct PathResolver {
    root: PathBuf,
}

impl PathResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.root.join(path))
        }
    }

    /// Parse a raw location and anchor its path at the root directory.
    pub fn locate(&self, raw: &str) -> Result<FragmentLocation, ResolveError> {
        let location = FragmentLocation::parse(raw)?;
        Ok(location.with_path(self.resolve(location.path())))
    }
}

/// Lexically collapse `.` and `..` components without touching the filesystem.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_fragment() {
        let loc = FragmentLocation::parse("specs/model.yaml#/components/schemas/X").unwrap();
        assert_eq!(loc.path(), Path::new("specs/model.yaml"));
        assert_eq!(loc.fragment(), "#/components/schemas/X");
        assert_eq!(loc.file_name_with_fragment(), "model.yaml#/components/schemas/X");
        assert_eq!(loc.base_dir(), PathBuf::from("specs"));
    }

    #[test]
    fn test_parse_without_fragment() {
        let loc = FragmentLocation::parse("model.json").unwrap();
        assert_eq!(loc.fragment(), "");
        assert_eq!(loc.file_name_with_fragment(), "model.json");
        assert_eq!(loc.to_string(), "model.json");
    }

    #[test]
    fn test_parse_rejects_multiple_hashes() {
        let err = FragmentLocation::parse("a.yaml#/x#/y").unwrap_err();
        assert!(matches!(err, ResolveError::InvalidLocation(_)));
    }

    #[test]
    fn test_path_resolver_anchors_relative_paths() {
        let resolver = PathResolver::new("/specs/root");
        let loc = resolver.locate("../shared/./a.yaml#/A").unwrap();
        assert_eq!(loc.path(), Path::new("/specs/shared/a.yaml"));
        assert_eq!(loc.fragment(), "#/A");

        let abs = resolver.locate("/elsewhere/b.yaml").unwrap();
        assert_eq!(abs.path(), Path::new("/elsewhere/b.yaml"));
    }
}
