//! Asset manifest stored next to the asset files.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::io_utils::{classify_io_error, write_atomic};
use crate::error::RttiError;
use crate::types::RttiId;

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

/// File name of the manifest inside an asset directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Index of every asset in a directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetManifest {
    pub version: u32,
    #[serde(default)]
    pub assets: BTreeMap<String, AssetEntry>,
}

/// Metadata recorded for one saved asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetEntry {
    /// Concrete type of the root object
    pub type_id: RttiId,
    pub type_name: String,
    /// CRC32 of the asset file
    pub checksum: u32,
    pub size: u64,
}

impl Default for AssetManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            assets: BTreeMap::new(),
        }
    }
}

impl AssetManifest {
    /// Loads the manifest of `dir`, or an empty one if none exists yet.
    pub fn load(dir: &Path) -> Result<Self, RttiError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(&path).map_err(|e| classify_io_error(e, "Failed to read manifest"))?;
        let manifest: AssetManifest = serde_json::from_str(&contents).map_err(|e| {
            RttiError::DataCorruption(format!("Failed to parse manifest: {}", e))
        })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(RttiError::DataCorruption(format!(
                "Unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    pub fn save(&self, dir: &Path) -> Result<(), RttiError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| RttiError::SerializationError(e.to_string()))?;
        write_atomic(&dir.join(MANIFEST_FILE), json.as_bytes())
    }
}
