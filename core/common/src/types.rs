//! Common types used throughout driveremote.

use serde::{Deserialize, Serialize};
use std::fmt;

/// URL scheme of the Google Drive remote.
pub const GDRIVE_SCHEME: &str = "gdrive";

/// Reserved starting folders that are not addressed by an explicit ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootAlias {
    /// The user's "My Drive" folder.
    MyDrive,
    /// The hidden per-application data folder.
    AppData,
}

impl RootAlias {
    /// Recognize an alias token, ignoring case.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "root" => Some(Self::MyDrive),
            "appdatafolder" => Some(Self::AppData),
            _ => None,
        }
    }

    /// The ID the Drive API accepts for this alias.
    pub fn as_id(&self) -> &'static str {
        match self {
            Self::MyDrive => "root",
            Self::AppData => "appDataFolder",
        }
    }
}

/// A `scheme://root/relative/path` location on a remote.
///
/// The value keeps the exact text it was parsed from, so
/// `StoragePath::parse(url)?.to_string() == url` holds for every accepted
/// URL. Empty segments (leading, trailing or doubled separators) are kept in
/// the text but skipped by [`StoragePath::segments`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoragePath {
    scheme: String,
    netloc: String,
    /// Everything after the netloc, including the leading `/` when present.
    path: String,
}

impl StoragePath {
    /// Parse a URL string into a StoragePath.
    ///
    /// # Errors
    /// - Returns error if the URL has no `://` separator
    /// - Returns error if the scheme or the root is empty
    pub fn parse(url: &str) -> crate::Result<Self> {
        let (scheme, rest) = url.split_once("://").ok_or_else(|| {
            crate::Error::InvalidInput(format!("Missing scheme separator in URL: {}", url))
        })?;

        if scheme.is_empty() {
            return Err(crate::Error::InvalidInput(format!(
                "URL has an empty scheme: {}",
                url
            )));
        }

        let (netloc, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };

        if netloc.is_empty() {
            return Err(crate::Error::InvalidInput(format!(
                "URL has an empty root: {}",
                url
            )));
        }

        Ok(Self {
            scheme: scheme.to_string(),
            netloc: netloc.to_string(),
            path: path.to_string(),
        })
    }

    /// Build a path from a root and a list of segments.
    ///
    /// # Errors
    /// - Returns error if the root is empty or contains a separator
    /// - Returns error if any segment is empty or contains a separator
    pub fn from_parts(scheme: &str, netloc: &str, segments: &[&str]) -> crate::Result<Self> {
        if netloc.is_empty() || netloc.contains('/') {
            return Err(crate::Error::InvalidInput(format!(
                "Invalid root: {:?}",
                netloc
            )));
        }

        let mut path = Self {
            scheme: scheme.to_string(),
            netloc: netloc.to_string(),
            path: String::new(),
        };
        for segment in segments {
            path = path.join(segment)?;
        }
        Ok(path)
    }

    /// URL scheme, e.g. `gdrive`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The root exactly as it appeared in the URL.
    pub fn netloc(&self) -> &str {
        &self.netloc
    }

    /// The root, lower-cased.
    pub fn root(&self) -> String {
        self.netloc.to_lowercase()
    }

    /// The ID resolution starts from.
    ///
    /// Aliases are matched case-insensitively and mapped to the spelling
    /// the API expects. Explicit folder IDs are case-sensitive and returned
    /// verbatim.
    pub fn root_id(&self) -> String {
        match RootAlias::parse(&self.netloc) {
            Some(alias) => alias.as_id().to_string(),
            None => self.netloc.clone(),
        }
    }

    /// The slash-separated path below the root, without a leading slash.
    pub fn relative_path(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// Non-empty segments of the relative path, in order.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Check if this path addresses the root itself.
    pub fn is_root(&self) -> bool {
        self.segments().is_empty()
    }

    /// The last segment, or an empty string at the root.
    pub fn name(&self) -> &str {
        self.segments().last().copied().unwrap_or("")
    }

    /// Get the parent path, if any.
    ///
    /// A single-segment path has the root as its parent (a path with an
    /// empty relative part). Only the root itself has no parent.
    pub fn parent(&self) -> Option<Self> {
        let segments = self.segments();
        if segments.is_empty() {
            return None;
        }
        Some(self.prefix(segments.len() - 1))
    }

    /// The path made of the first `depth` segments.
    pub fn prefix(&self, depth: usize) -> Self {
        let segments = self.segments();
        let depth = depth.min(segments.len());
        let path = if depth == 0 {
            String::new()
        } else {
            format!("/{}", segments[..depth].join("/"))
        };
        Self {
            scheme: self.scheme.clone(),
            netloc: self.netloc.clone(),
            path,
        }
    }

    /// Join this path with a child segment.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        if child.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Child segment cannot be empty".to_string(),
            ));
        }
        if child.contains('/') {
            return Err(crate::Error::InvalidInput(format!(
                "Child segment cannot contain separators: {}",
                child
            )));
        }
        let mut path = self.path.trim_end_matches('/').to_string();
        path.push('/');
        path.push_str(child);
        Ok(Self {
            scheme: self.scheme.clone(),
            netloc: self.netloc.clone(),
            path,
        })
    }

    /// Convert back to the URL form.
    pub fn to_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.netloc, self.path)
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.scheme, self.netloc, self.path)
    }
}

impl std::str::FromStr for StoragePath {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::parse(s)
    }
}
