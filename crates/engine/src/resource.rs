//! Resource provider contract and the stock providers.
//!
//! The engine never knows where definitions live. A provider maps a
//! [`ResourceKind`] and a name onto raw bytes using the asset layout
//!
//! ```text
//! task/<name>.json
//! task/info/<name>.json
//! task/transformer/<name>
//! ```
//!
//! Transformer names carry their own extension.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ResourceError, TaskError};

/// Category of a stored definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Task,
    TaskInfo,
    Transformer,
}

impl ResourceKind {
    /// Relative asset path of the resource `name` of this kind.
    pub fn asset_path(self, name: &str) -> PathBuf {
        match self {
            ResourceKind::Task => Path::new("task").join(format!("{name}.json")),
            ResourceKind::TaskInfo => Path::new("task").join("info").join(format!("{name}.json")),
            ResourceKind::Transformer => Path::new("task").join("transformer").join(name),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Task => "task",
            ResourceKind::TaskInfo => "task-info",
            ResourceKind::Transformer => "transformer",
        };
        f.write_str(label)
    }
}

/// Source of raw definition bytes.
///
/// Implementations may be slow or remote; retry policy belongs here rather
/// than in the resolver.
pub trait ResourceProvider: Send + Sync {
    fn fetch(&self, kind: ResourceKind, name: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Reads resources from an asset directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryResourceProvider {
    root: PathBuf,
}

impl DirectoryResourceProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceProvider for DirectoryResourceProvider {
    fn fetch(&self, kind: ResourceKind, name: &str) -> Result<Vec<u8>, ResourceError> {
        let path = self.root.join(kind.asset_path(name));
        debug!(kind = %kind, path = %path.display(), "reading resource");
        fs::read(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => ResourceError::NotFound {
                kind,
                name: name.to_string(),
            },
            _ => ResourceError::Io {
                kind,
                name: name.to_string(),
                source,
            },
        })
    }
}

/// Keeps resources in memory; used for embedded definitions and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceProvider {
    resources: HashMap<(ResourceKind, String), Vec<u8>>,
}

impl InMemoryResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: ResourceKind, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.resources.insert((kind, name.into()), contents.into());
    }

    pub fn with_resource(mut self, kind: ResourceKind, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(kind, name, contents);
        self
    }
}

impl ResourceProvider for InMemoryResourceProvider {
    fn fetch(&self, kind: ResourceKind, name: &str) -> Result<Vec<u8>, ResourceError> {
        self.resources
            .get(&(kind, name.to_string()))
            .cloned()
            .ok_or_else(|| ResourceError::NotFound {
                kind,
                name: name.to_string(),
            })
    }
}

/// Decodes a fetched JSON resource, tagging failures with the resource it came from.
pub fn decode_resource<T: DeserializeOwned>(kind: ResourceKind, name: &str, bytes: &[u8]) -> Result<T, TaskError> {
    serde_json::from_slice(bytes).map_err(|source| TaskError::Parse {
        kind,
        name: name.to_string(),
        source,
    })
}
