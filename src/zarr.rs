//! Bindings of the storage traits to [zarrs] groups and arrays.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};
use zarrs::array::{Array, ArrayBytes};
use zarrs::group::Group;
use zarrs::storage::ReadableStorageTraits;

use crate::storage::{MultiscaleArray, MultiscaleGroup, StorageFamily};

/// A [zarrs] group node exposed as a [MultiscaleGroup].
///
/// zarrs does not know which storage family its store wraps, so the family
/// is declared at construction: [open](ZarrsGroup::open) for native Zarr
/// stores, [open_n5](ZarrsGroup::open_n5) for N5 stores adapted to Zarr
/// through a metadata-translating wrapper (e.g. `zarrs_n5`).
pub struct ZarrsGroup<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    path: String,
    attributes: Map<String, Value>,
    family: StorageFamily,
}

impl<TStorage: ?Sized + ReadableStorageTraits + 'static> ZarrsGroup<TStorage> {
    pub fn open(storage: Arc<TStorage>, path: &str) -> crate::Result<Self> {
        Self::open_with_family(storage, path, StorageFamily::Zarr)
    }

    pub fn open_n5(storage: Arc<TStorage>, path: &str) -> crate::Result<Self> {
        Self::open_with_family(storage, path, StorageFamily::N5)
    }

    pub fn open_with_family(
        storage: Arc<TStorage>,
        path: &str,
        family: StorageFamily,
    ) -> crate::Result<Self> {
        let group = Group::open(storage.clone(), path).map_err(crate::Error::wrap)?;
        let attributes = group.attributes().clone();
        Ok(Self {
            storage,
            path: path.trim_end_matches('/').to_string(),
            attributes,
            family,
        })
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + 'static> MultiscaleGroup for ZarrsGroup<TStorage> {
    fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    fn storage_family(&self) -> StorageFamily {
        self.family.clone()
    }

    fn array(&self, key: &str) -> crate::Result<Arc<dyn MultiscaleArray>> {
        let path = format!("{}/{}", self.path, key.trim_start_matches('/'));
        let array = Array::open(self.storage.clone(), &path).map_err(crate::Error::wrap)?;
        Ok(Arc::new(ZarrsArray { array }))
    }
}

/// A [zarrs] array exposed as a [MultiscaleArray].
pub struct ZarrsArray<TStorage: ?Sized> {
    array: Array<TStorage>,
}

impl<TStorage: ?Sized + ReadableStorageTraits + 'static> MultiscaleArray for ZarrsArray<TStorage> {
    fn shape(&self) -> &[u64] {
        self.array.shape()
    }

    fn attributes(&self) -> &Map<String, Value> {
        self.array.attributes()
    }

    fn retrieve(&self) -> crate::Result<Bytes> {
        let bytes: ArrayBytes<'static> = self
            .array
            .retrieve_array_subset(&self.array.subset_all())
            .map_err(crate::Error::wrap)?;
        let raw = bytes.into_fixed().map_err(crate::Error::wrap)?;
        Ok(Bytes::from_owner(raw.into_owned()))
    }
}
