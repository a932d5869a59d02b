//! Request path and query parsing.
//!
//! Asset URLs have the shape `/{index}/{relative_path}`: the first segment
//! selects a root directory by its position in the registry, everything after
//! it is a slash-separated path inside that root.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::error::AssetError;

// =============================================================================
// AssetPath
// =============================================================================

/// Logical identifier of a servable file: root index plus relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPath {
    /// Position of the root directory in the registry
    pub directory_index: usize,

    /// Slash-separated path below the root, as received
    pub relative_path: String,
}

impl AssetPath {
    /// Create an asset path from its parts.
    pub fn new(directory_index: usize, relative_path: impl Into<String>) -> Self {
        Self {
            directory_index,
            relative_path: relative_path.into(),
        }
    }

    /// Parse a percent-encoded URI path such as `/0/holiday%202024/beach.png`.
    pub fn from_uri_path(raw: &str) -> Result<Self, AssetError> {
        let decoded = urlencoding::decode(raw).map_err(|_| AssetError::MalformedRequestPath {
            path: raw.to_string(),
            reason: "path is not valid UTF-8 after percent-decoding",
        })?;
        Self::parse(&decoded)
    }

    /// Parse an already-decoded request path.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::MalformedRequestPath`] when:
    /// - the last segment has no file extension (directory-style paths)
    /// - the path does not start with `/`
    /// - there is no second `/` after the index
    /// - the index is not made of ASCII digits only
    pub fn parse(path: &str) -> Result<Self, AssetError> {
        let malformed = |reason| AssetError::MalformedRequestPath {
            path: path.to_string(),
            reason,
        };

        if !has_file_extension(path) {
            return Err(malformed("path has no file extension"));
        }

        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| malformed("path must start with '/'"))?;

        let (index, relative_path) = rest
            .split_once('/')
            .ok_or_else(|| malformed("missing relative path after directory index"))?;

        let directory_index =
            parse_index(index).ok_or_else(|| malformed("directory index is not a non-negative integer"))?;

        Ok(Self {
            directory_index,
            relative_path: relative_path.to_string(),
        })
    }

    /// Join the relative path onto `root`, refusing to leave it.
    ///
    /// Empty and `.` segments are dropped and `..` removes the previous
    /// segment. A `..` with nothing left to remove, or a segment that is not a
    /// single plain path component, is reported as
    /// [`AssetError::PathEscapesRoot`]. No filesystem access happens here.
    pub fn resolve(&self, root: &Path) -> Result<PathBuf, AssetError> {
        let escape = || AssetError::PathEscapesRoot {
            path: self.relative_path.clone(),
        };

        let mut segments: Vec<&str> = Vec::new();
        for segment in self.relative_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop().ok_or_else(escape)?;
                }
                name => {
                    let mut components = Path::new(name).components();
                    match (components.next(), components.next()) {
                        (Some(Component::Normal(_)), None) => segments.push(name),
                        _ => return Err(escape()),
                    }
                }
            }
        }

        let mut resolved = root.to_path_buf();
        resolved.extend(segments);
        debug_assert!(resolved.starts_with(root));

        Ok(resolved)
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.directory_index, self.relative_path)
    }
}

/// Whether the final path segment has a `.`-suffix.
///
/// Mirrors the usual "extension" notion: `a.png` and `a.` qualify, `photos/`
/// and `README` do not.
pub fn has_file_extension(path: &str) -> bool {
    path.rsplit('/').next().is_some_and(|last| last.contains('.'))
}

fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

// =============================================================================
// AssetQuery
// =============================================================================

/// Decoded query parameters of an asset request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetQuery {
    params: Vec<(String, String)>,
}

impl AssetQuery {
    /// Parse a raw (still percent-encoded) query string.
    pub fn parse(raw: Option<&str>) -> Self {
        let params = raw
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        Self { params }
    }

    /// Query with only a `width` parameter.
    pub fn with_width(width: impl Into<String>) -> Self {
        Self {
            params: vec![("width".to_string(), width.into())],
        }
    }

    /// Raw value of the first `width` parameter, if present.
    pub fn width(&self) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == "width")
            .map(|(_, value)| value.as_str())
    }

    /// All parameters in request order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Whether the request carried no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl fmt::Display for AssetQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(self.params.iter());
        f.write_str(&serializer.finish())
    }
}

// =============================================================================
// Tests
// =============================================================================
