//! Asset files: serialized object graphs on disk with a checksummed manifest.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

#[cfg(feature = "persist")]
use memmap2::Mmap;

use serde::Serialize;

use crate::error::RttiError;
use crate::serialization::inspect::inspect_with_limit;
use crate::serialization::stream::StreamReader;
use crate::serialization::Serializer;
use crate::types::{Reflectable, RttiId, SharedObject};

pub mod io_utils;
pub mod manifest;

use io_utils::{checksum, classify_io_error, retry_io_operation, write_atomic};
pub use manifest::{AssetEntry, AssetManifest, MANIFEST_FILE};

/// Extension of asset files.
pub const ASSET_EXTENSION: &str = "asset";

/// Outcome of verifying one manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetStatus {
    Ok { objects: usize },
    Missing,
    ChecksumMismatch { expected: u32, actual: u32 },
    Unreadable { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetReport {
    pub name: String,
    #[serde(flatten)]
    pub status: AssetStatus,
}

/// Directory of asset files written through one serializer.
///
/// Saves and removes through one store are serialized against each other
/// and against loads. Separate stores over the same directory only share the
/// atomicity of the individual file replacements.
#[derive(Debug)]
pub struct AssetStore {
    dir: PathBuf,
    serializer: Serializer,
    /// Held exclusively while an asset file and its manifest entry change
    store_lock: RwLock<()>,
}

impl AssetStore {
    /// Creates a store rooted at the serializer's configured asset directory.
    pub fn new(serializer: Serializer) -> Self {
        let dir = serializer.config().asset_dir.clone();
        Self::with_dir(dir, serializer)
    }

    pub fn with_dir(dir: impl Into<PathBuf>, serializer: Serializer) -> Self {
        Self {
            dir: dir.into(),
            serializer,
            store_lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn asset_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, ASSET_EXTENSION))
    }

    /// Serializes `object` and stores it as `<name>.asset`.
    pub fn save(&self, name: &str, object: &dyn Reflectable) -> Result<AssetEntry, RttiError> {
        let bytes = self.serializer.serialize(object)?;
        self.store_bytes(name, &bytes)
    }

    pub fn save_shared(&self, name: &str, object: &SharedObject) -> Result<AssetEntry, RttiError> {
        let bytes = self.serializer.serialize_shared(object)?;
        self.store_bytes(name, &bytes)
    }

    /// Loads an asset, verifying its checksum against the manifest.
    pub fn load(&self, name: &str) -> Result<Box<dyn Reflectable>, RttiError> {
        validate_name(name)?;
        let _guard = self.store_lock.read().map_err(|_| RttiError::LockPoisoned)?;
        let expected = AssetManifest::load(&self.dir)?
            .assets
            .get(name)
            .map(|entry| entry.checksum);
        if expected.is_none() {
            tracing::warn!(asset = name, "Asset missing from manifest, skipping checksum");
        }

        self.with_asset_bytes(name, |bytes| {
            if let Some(expected) = expected {
                verify_checksum(name, expected, bytes)?;
            }
            self.serializer.deserialize(bytes)
        })
    }

    pub fn load_as<T: Reflectable>(&self, name: &str) -> Result<T, RttiError> {
        let object = self.load(name)?;
        let type_id = object.rtti_id();
        object
            .into_any()
            .downcast::<T>()
            .map(|concrete| *concrete)
            .map_err(|_| RttiError::DowncastFailed {
                type_id,
                expected: std::any::type_name::<T>(),
            })
    }

    /// Names of all assets in the manifest, sorted.
    pub fn list(&self) -> Result<Vec<String>, RttiError> {
        let _guard = self.store_lock.read().map_err(|_| RttiError::LockPoisoned)?;
        Ok(AssetManifest::load(&self.dir)?.assets.into_keys().collect())
    }

    pub fn entry(&self, name: &str) -> Result<Option<AssetEntry>, RttiError> {
        let _guard = self.store_lock.read().map_err(|_| RttiError::LockPoisoned)?;
        Ok(AssetManifest::load(&self.dir)?.assets.remove(name))
    }

    /// Deletes an asset file and its manifest entry. Returns false if absent.
    pub fn remove(&self, name: &str) -> Result<bool, RttiError> {
        validate_name(name)?;
        let _guard = self.store_lock.write().map_err(|_| RttiError::LockPoisoned)?;
        let mut manifest = AssetManifest::load(&self.dir)?;
        let had_entry = manifest.assets.remove(name).is_some();

        let path = self.asset_path(name);
        let had_file = path.exists();
        if had_file {
            fs::remove_file(&path).map_err(|e| classify_io_error(e, "Failed to remove asset"))?;
        }
        if had_entry {
            self.save_manifest(&manifest)?;
        }
        Ok(had_entry || had_file)
    }

    /// Checks every manifest entry against the file on disk.
    pub fn verify(&self) -> Result<Vec<AssetReport>, RttiError> {
        let _guard = self.store_lock.read().map_err(|_| RttiError::LockPoisoned)?;
        let manifest = AssetManifest::load(&self.dir)?;
        let max_depth = self.serializer.config().max_depth;

        let mut reports = Vec::with_capacity(manifest.assets.len());
        for (name, entry) in &manifest.assets {
            let status = if !self.asset_path(name).exists() {
                AssetStatus::Missing
            } else {
                let checked = self.with_asset_bytes(name, |bytes| {
                    let actual = checksum(bytes);
                    if actual != entry.checksum {
                        return Ok(AssetStatus::ChecksumMismatch {
                            expected: entry.checksum,
                            actual,
                        });
                    }
                    let objects = inspect_with_limit(bytes, max_depth)?
                        .map_or(0, |root| root.object_count());
                    Ok(AssetStatus::Ok { objects })
                });
                checked.unwrap_or_else(|e| AssetStatus::Unreadable {
                    message: e.to_string(),
                })
            };
            reports.push(AssetReport {
                name: name.clone(),
                status,
            });
        }
        Ok(reports)
    }

    fn store_bytes(&self, name: &str, bytes: &[u8]) -> Result<AssetEntry, RttiError> {
        validate_name(name)?;
        let config = self.serializer.config();
        let mut reader = StreamReader::new(bytes);
        reader.read_header()?;
        let type_id = RttiId(reader.read_u32()?);
        let type_name = self
            .serializer
            .registry()
            .resolve(type_id)
            .map(|descriptor| descriptor.name().to_string())?;
        let entry = AssetEntry {
            type_id,
            type_name,
            checksum: checksum(bytes),
            size: bytes.len() as u64,
        };

        let _guard = self.store_lock.write().map_err(|_| RttiError::LockPoisoned)?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| classify_io_error(e, "Failed to create asset directory"))?;
        let path = self.asset_path(name);
        retry_io_operation(
            || write_atomic(&path, bytes),
            config.persistence_max_retries,
            config.persistence_retry_delay_ms,
            "asset write",
        )?;

        let mut manifest = AssetManifest::load(&self.dir)?;
        manifest.assets.insert(name.to_string(), entry.clone());
        self.save_manifest(&manifest)?;

        tracing::debug!(asset = name, size = bytes.len(), "Saved asset");
        Ok(entry)
    }

    fn save_manifest(&self, manifest: &AssetManifest) -> Result<(), RttiError> {
        let config = self.serializer.config();
        retry_io_operation(
            || manifest.save(&self.dir),
            config.persistence_max_retries,
            config.persistence_retry_delay_ms,
            "manifest write",
        )
        .inspect_err(|e| tracing::error!("Failed to write asset manifest: {}", e))
    }

    /// Runs `f` over the contents of an asset file.
    #[cfg(feature = "persist")]
    fn with_asset_bytes<R>(
        &self,
        name: &str,
        f: impl FnOnce(&[u8]) -> Result<R, RttiError>,
    ) -> Result<R, RttiError> {
        let path = self.asset_path(name);
        let config = self.serializer.config();
        let file = retry_io_operation(
            || File::open(&path).map_err(|e| classify_io_error(e, "Failed to open asset")),
            config.persistence_max_retries,
            config.persistence_retry_delay_ms,
            "asset read",
        )?;
        let len = file
            .metadata()
            .map_err(|e| classify_io_error(e, "Failed to stat asset"))?
            .len();
        if len == 0 {
            return f(&[]);
        }

        // Asset files are only replaced by rename, never modified in place.
        let mmap = unsafe {
            Mmap::map(&file).map_err(|e| classify_io_error(e, "Failed to memory map asset"))?
        };
        f(&mmap)
    }

    #[cfg(not(feature = "persist"))]
    fn with_asset_bytes<R>(
        &self,
        name: &str,
        f: impl FnOnce(&[u8]) -> Result<R, RttiError>,
    ) -> Result<R, RttiError> {
        use std::io::Read;

        let path = self.asset_path(name);
        let config = self.serializer.config();
        let bytes = retry_io_operation(
            || {
                let mut file =
                    File::open(&path).map_err(|e| classify_io_error(e, "Failed to open asset"))?;
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)
                    .map_err(|e| classify_io_error(e, "Failed to read asset"))?;
                Ok(bytes)
            },
            config.persistence_max_retries,
            config.persistence_retry_delay_ms,
            "asset read",
        )?;
        f(&bytes)
    }
}

fn validate_name(name: &str) -> Result<(), RttiError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !valid {
        return Err(RttiError::IoError(format!("Invalid asset name '{}'", name)));
    }
    Ok(())
}

fn verify_checksum(name: &str, expected: u32, bytes: &[u8]) -> Result<(), RttiError> {
    let actual = checksum(bytes);
    if actual != expected {
        return Err(RttiError::DataCorruption(format!(
            "Checksum mismatch for asset '{}': expected {:08x}, got {:08x}",
            name, expected, actual
        )));
    }
    Ok(())
}
