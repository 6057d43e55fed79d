use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

/// Storage backend family a group's store belongs to.
///
/// The neuroglancer/BigDataViewer metadata dialects are only written by N5
/// tooling, so their reader refuses other families up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageFamily {
    N5,
    Zarr,
    Other(String),
}

impl StorageFamily {
    pub fn is_n5(&self) -> bool {
        matches!(self, StorageFamily::N5)
    }
}

impl std::fmt::Display for StorageFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageFamily::N5 => write!(f, "N5"),
            StorageFamily::Zarr => write!(f, "Zarr"),
            StorageFamily::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A group node in some chunked-array hierarchy.
///
/// This is the only thing the multiscale readers require of a storage
/// backend: unstructured JSON attributes, a storage family, and named
/// child arrays.
pub trait MultiscaleGroup {
    /// The group's attribute object, as stored.
    fn attributes(&self) -> &Map<String, Value>;

    /// The family of the underlying store.
    fn storage_family(&self) -> StorageFamily;

    /// Resolve a child array by key (a path relative to this group).
    fn array(&self, key: &str) -> crate::Result<Arc<dyn MultiscaleArray>>;
}

/// A chunked array held by a [MultiscaleGroup].
///
/// Shape and attributes are cheap; [retrieve](MultiscaleArray::retrieve) is
/// the only operation that reads chunk payloads.
pub trait MultiscaleArray {
    /// Array shape, fastest-varying dimension last.
    fn shape(&self) -> &[u64];

    /// The array's attribute object, as stored.
    fn attributes(&self) -> &Map<String, Value>;

    /// Read the whole array as flat element bytes.
    fn retrieve(&self) -> crate::Result<Bytes>;
}
