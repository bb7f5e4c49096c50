//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for paths and identifiers.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

// ============================================================================
// Local path types
// ============================================================================

/// A path relative to the sync root, always using `/` as separator
///
/// This is the identity key for store records. It never starts with a
/// slash and never contains empty, `.` or `..` segments, e.g. `docs/a.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    /// Create a new RelativePath from its slash-separated form
    ///
    /// # Errors
    /// Returns error if the path is empty, absolute, or contains
    /// empty, `.` or `..` segments
    pub fn new(path: String) -> Result<Self, DomainError> {
        if path.is_empty() {
            return Err(DomainError::InvalidRelativePath(
                "Relative path cannot be empty".to_string(),
            ));
        }

        if path.starts_with('/') {
            return Err(DomainError::InvalidRelativePath(format!(
                "Relative path must not start with '/': {path}"
            )));
        }

        if path
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(DomainError::InvalidRelativePath(format!(
                "Relative path contains an invalid segment: {path}"
            )));
        }

        Ok(Self(path))
    }

    /// Build the relative path of `path` under `root`
    ///
    /// Separators are normalized to `/` whatever the host convention.
    ///
    /// # Errors
    /// Returns error if `path` is not under `root`, equals `root`, or has
    /// a component that is not valid UTF-8
    pub fn from_local(root: &Path, path: &Path) -> Result<Self, DomainError> {
        let stripped = path
            .strip_prefix(root)
            .map_err(|_| DomainError::PathNotInSyncRoot(path.display().to_string()))?;

        let mut segments = Vec::new();
        for component in stripped.components() {
            match component {
                Component::Normal(name) => {
                    let name = name.to_str().ok_or_else(|| {
                        DomainError::InvalidRelativePath(format!(
                            "Path is not valid UTF-8: {}",
                            path.display()
                        ))
                    })?;
                    segments.push(name);
                }
                Component::CurDir => {}
                _ => {
                    return Err(DomainError::InvalidRelativePath(format!(
                        "Unexpected path component in {}",
                        path.display()
                    )))
                }
            }
        }

        Self::new(segments.join("/"))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path segments
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments, `a/b.txt` has depth 2
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Get the parent directory, `None` for entries directly under the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.rfind('/').map(|idx| Self(self.0[..idx].to_string()))
    }

    /// Get the final segment
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl Display for RelativePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RelativePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RelativePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

// ============================================================================
// Remote path types
// ============================================================================

/// A OneDrive remote path (must start with /)
///
/// Represents paths in OneDrive format, e.g., "/Backup/docs/file.txt"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemotePath(String);

impl RemotePath {
    /// Create a new RemotePath
    ///
    /// # Errors
    /// Returns error if path doesn't start with /, contains empty segments,
    /// or contains `.`/`..` segments
    pub fn new(path: String) -> Result<Self, DomainError> {
        if !path.starts_with('/') {
            return Err(DomainError::InvalidRemotePath(format!(
                "Remote path must start with '/': {path}"
            )));
        }

        if path.len() == 1 {
            return Ok(Self(path));
        }

        for segment in path[1..].split('/') {
            if segment.is_empty() {
                return Err(DomainError::InvalidRemotePath(format!(
                    "Remote path contains invalid double slashes: {path}"
                )));
            }
            if segment == "." || segment == ".." {
                return Err(DomainError::InvalidRemotePath(format!(
                    "Remote path contains invalid traversal: {path}"
                )));
            }
        }

        Ok(Self(path))
    }

    /// Create the root path "/"
    #[must_use]
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse a user-supplied folder prefix such as `Backup`, `/Backup/` or `""`
    ///
    /// # Errors
    /// Returns error if the trimmed prefix is not a valid remote path
    pub fn from_prefix(prefix: &str) -> Result<Self, DomainError> {
        let trimmed = prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        Self::new(format!("/{trimmed}"))
    }

    /// Map a local relative path to its location under `prefix`
    ///
    /// # Errors
    /// Returns error if a segment cannot be joined
    pub fn for_file(prefix: &RemotePath, relative: &RelativePath) -> Result<Self, DomainError> {
        relative
            .segments()
            .try_fold(prefix.clone(), |path, segment| path.join(segment))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the drive root
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Iterate over the path segments (empty for the root)
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Number of segments below the root
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    /// Join a path component
    ///
    /// # Errors
    /// Returns error if component is invalid
    pub fn join(&self, component: &str) -> Result<Self, DomainError> {
        if component.is_empty()
            || component.contains('/')
            || component == "."
            || component == ".."
        {
            return Err(DomainError::InvalidRemotePath(format!(
                "Invalid path component: {component}"
            )));
        }

        let new_path = if self.is_root() {
            format!("/{component}")
        } else {
            format!("{}/{component}", self.0)
        };

        Self::new(new_path)
    }

    /// Get the parent path
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        match self.0.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
            None => None,
        }
    }

    /// All proper ancestors below the root, shallowest first
    ///
    /// `/a/b/c` yields `/a`, `/a/b`.
    #[must_use]
    pub fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            if path.is_root() {
                break;
            }
            current = path.parent();
            out.push(path);
        }
        out.reverse();
        out
    }

    /// Get the file name component
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }

        self.0.rsplit('/').next()
    }
}

impl Display for RemotePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemotePath {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemotePath {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemotePath> for String {
    fn from(path: RemotePath) -> Self {
        path.0
    }
}

// ============================================================================
// OneDrive-specific types
// ============================================================================

/// OneDrive item ID
///
/// Format: Alphanumeric string, typically like "01BYE5RZ6QN3ZWBTUFOFD3GSPGOHDJD36K"
/// or "D4648F06C91D9D3D!54927" on personal drives
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RemoteId(String);

impl RemoteId {
    /// Create a new RemoteId
    ///
    /// # Errors
    /// Returns error if the ID format is invalid
    pub fn new(id: String) -> Result<Self, DomainError> {
        if id.is_empty() {
            return Err(DomainError::InvalidRemoteId(
                "Remote ID cannot be empty".to_string(),
            ));
        }

        if !id
            .chars()
            .all(|c| c.is_alphanumeric() || c == '!' || c == '-' || c == '_')
        {
            return Err(DomainError::InvalidRemoteId(format!(
                "Remote ID contains invalid characters: {id}"
            )));
        }

        Ok(Self(id))
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RemoteId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

impl TryFrom<String> for RemoteId {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<RemoteId> for String {
    fn from(id: RemoteId) -> Self {
        id.0
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    mod relative_path_tests {
        use super::*;

        #[test]
        fn test_new_valid() {
            let path = RelativePath::new("docs/report.pdf".to_string()).unwrap();
            assert_eq!(path.as_str(), "docs/report.pdf");
            assert_eq!(path.depth(), 2);
            assert_eq!(path.file_name(), "report.pdf");
        }

        #[test]
        fn test_rejects_invalid_forms() {
            assert!(RelativePath::new(String::new()).is_err());
            assert!(RelativePath::new("/abs".to_string()).is_err());
            assert!(RelativePath::new("a//b".to_string()).is_err());
            assert!(RelativePath::new("a/../b".to_string()).is_err());
            assert!(RelativePath::new("a/./b".to_string()).is_err());
        }

        #[test]
        fn test_dots_inside_names_allowed() {
            assert!(RelativePath::new("notes..old.txt".to_string()).is_ok());
        }

        #[test]
        fn test_from_local() {
            let root = PathBuf::from("/home/user/sync");
            let file = root.join("photos").join("2024").join("a.jpg");
            let rel = RelativePath::from_local(&root, &file).unwrap();
            assert_eq!(rel.as_str(), "photos/2024/a.jpg");
        }

        #[test]
        fn test_from_local_outside_root() {
            let root = PathBuf::from("/home/user/sync");
            let result = RelativePath::from_local(&root, &PathBuf::from("/etc/passwd"));
            assert!(matches!(result, Err(DomainError::PathNotInSyncRoot(_))));
        }

        #[test]
        fn test_from_local_root_itself_fails() {
            let root = PathBuf::from("/home/user/sync");
            assert!(RelativePath::from_local(&root, &root).is_err());
        }

        #[test]
        fn test_parent() {
            let path = RelativePath::new("a/b/c.txt".to_string()).unwrap();
            assert_eq!(path.parent().unwrap().as_str(), "a/b");
            let top = RelativePath::new("c.txt".to_string()).unwrap();
            assert!(top.parent().is_none());
        }

        #[test]
        fn test_serde_roundtrip() {
            let path = RelativePath::new("a/b.txt".to_string()).unwrap();
            let json = serde_json::to_string(&path).unwrap();
            assert_eq!(json, "\"a/b.txt\"");
            let parsed: RelativePath = serde_json::from_str(&json).unwrap();
            assert_eq!(path, parsed);
        }

        #[test]
        fn test_serde_rejects_invalid() {
            let result: Result<RelativePath, _> = serde_json::from_str("\"/abs\"");
            assert!(result.is_err());
        }
    }

    mod remote_path_tests {
        use super::*;

        #[test]
        fn test_new_valid() {
            let path = RemotePath::new("/Documents/file.txt".to_string()).unwrap();
            assert_eq!(path.as_str(), "/Documents/file.txt");
        }

        #[test]
        fn test_root() {
            let root = RemotePath::root();
            assert_eq!(root.as_str(), "/");
            assert!(root.is_root());
            assert_eq!(root.depth(), 0);
        }

        #[test]
        fn test_no_leading_slash_fails() {
            let result = RemotePath::new("Documents/file.txt".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_double_slash_fails() {
            let result = RemotePath::new("/Documents//file.txt".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_traversal_fails() {
            let result = RemotePath::new("/Documents/../file.txt".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_from_prefix() {
            assert_eq!(RemotePath::from_prefix("Backup").unwrap().as_str(), "/Backup");
            assert_eq!(RemotePath::from_prefix("/Backup/").unwrap().as_str(), "/Backup");
            assert!(RemotePath::from_prefix("").unwrap().is_root());
            assert!(RemotePath::from_prefix("/").unwrap().is_root());
        }

        #[test]
        fn test_for_file() {
            let prefix = RemotePath::from_prefix("Backup").unwrap();
            let rel = RelativePath::new("a/b/c.txt".to_string()).unwrap();
            let remote = RemotePath::for_file(&prefix, &rel).unwrap();
            assert_eq!(remote.as_str(), "/Backup/a/b/c.txt");

            let remote = RemotePath::for_file(&RemotePath::root(), &rel).unwrap();
            assert_eq!(remote.as_str(), "/a/b/c.txt");
        }

        #[test]
        fn test_join() {
            let path = RemotePath::root();
            let joined = path.join("Documents").unwrap();
            assert_eq!(joined.as_str(), "/Documents");

            let joined2 = joined.join("file.txt").unwrap();
            assert_eq!(joined2.as_str(), "/Documents/file.txt");
        }

        #[test]
        fn test_join_invalid() {
            let path = RemotePath::root();
            assert!(path.join("").is_err());
            assert!(path.join("a/b").is_err());
            assert!(path.join("..").is_err());
        }

        #[test]
        fn test_parent_and_file_name() {
            let path = RemotePath::new("/Documents/file.txt".to_string()).unwrap();
            assert_eq!(path.parent().unwrap().as_str(), "/Documents");
            assert_eq!(path.file_name(), Some("file.txt"));

            let top = RemotePath::new("/Documents".to_string()).unwrap();
            assert!(top.parent().unwrap().is_root());
            assert!(RemotePath::root().parent().is_none());
            assert!(RemotePath::root().file_name().is_none());
        }

        #[test]
        fn test_ancestors() {
            let path = RemotePath::new("/a/b/c".to_string()).unwrap();
            let ancestors: Vec<String> = path.ancestors().into_iter().map(String::from).collect();
            assert_eq!(ancestors, vec!["/a", "/a/b"]);
            assert!(RemotePath::new("/a".to_string()).unwrap().ancestors().is_empty());
        }

        #[test]
        fn test_depth() {
            assert_eq!(RemotePath::new("/a/b/c".to_string()).unwrap().depth(), 3);
        }
    }

    mod remote_id_tests {
        use super::*;

        #[test]
        fn test_valid_id() {
            let id = RemoteId::new("01BYE5RZ6QN3ZWBTUFOFD3GSPGOHDJD36K".to_string()).unwrap();
            assert_eq!(id.as_str(), "01BYE5RZ6QN3ZWBTUFOFD3GSPGOHDJD36K");
        }

        #[test]
        fn test_personal_drive_id() {
            assert!(RemoteId::new("D4648F06C91D9D3D!54927".to_string()).is_ok());
        }

        #[test]
        fn test_empty_fails() {
            let result = RemoteId::new(String::new());
            assert!(result.is_err());
        }

        #[test]
        fn test_invalid_chars_fails() {
            let result = RemoteId::new("invalid@id".to_string());
            assert!(result.is_err());
        }

        #[test]
        fn test_serde_roundtrip() {
            let id = RemoteId::new("ABC123".to_string()).unwrap();
            let json = serde_json::to_string(&id).unwrap();
            let parsed: RemoteId = serde_json::from_str(&json).unwrap();
            assert_eq!(id, parsed);
        }
    }
}
