//! Read-only named-blob stores that migration scripts are loaded from.

use crate::error::LoadError;
use rust_embed::Embed;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// A source of migration scripts addressed by name
pub trait AssetStore {
    fn list_names(&self) -> Vec<String>;

    fn read_asset(&self, name: &str) -> Result<Cow<'_, [u8]>, LoadError>;
}

/// Migration scripts compiled into the binary from `migrations/`
#[derive(Embed)]
#[folder = "migrations/"]
struct Bundle;

/// The schema migrations shipped with this build
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedAssets;

impl AssetStore for EmbeddedAssets {
    fn list_names(&self) -> Vec<String> {
        Bundle::iter().map(|name| name.into_owned()).collect()
    }

    fn read_asset(&self, name: &str) -> Result<Cow<'_, [u8]>, LoadError> {
        Bundle::get(name)
            .map(|file| file.data)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}

/// An in-memory store, used to build catalogs by hand
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    assets: BTreeMap<String, Vec<u8>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(name, contents);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.assets.insert(name.into(), contents.into());
    }
}

impl AssetStore for MemoryAssets {
    fn list_names(&self) -> Vec<String> {
        self.assets.keys().cloned().collect()
    }

    fn read_asset(&self, name: &str) -> Result<Cow<'_, [u8]>, LoadError> {
        self.assets
            .get(name)
            .map(|bytes| Cow::Borrowed(bytes.as_slice()))
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}
