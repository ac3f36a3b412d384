//! Directory-backed store.
//!
//! Layout under `root`:
//! - `<key>.json` holds the state, or a chunk manifest when the payload is large
//! - `<key>.<generation>.part-<n>` holds chunk `n` of a large payload, where
//!   `generation` is a prefix of the payload's sha256
//!
//! Every file is written to a temp path and renamed into place. Parts of a new
//! save never overwrite the parts the current manifest points at, and the
//! manifest is replaced last, so a save that fails halfway leaves the previous
//! state loadable. Parts of older generations are swept after the manifest
//! swap. Legacy `<key>.part-<n>` parts (no generation) are still read.

use std::fs;
use std::path::{Path, PathBuf};

use arbor_core::model::TreeState;
use arbor_core::store::StateStore;
use arbor_core::ArborResult;
use bytesize::ByteSize;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

/// Default split threshold for a single file.
pub const DEFAULT_CHUNK_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStoreConfig {
    pub root: PathBuf,
    pub key: String,
    /// Payloads larger than this are split into parts.
    pub chunk_bytes: ByteSize,
}

impl FileStoreConfig {
    pub fn new(root: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            key: key.into(),
            chunk_bytes: ByteSize::b(DEFAULT_CHUNK_BYTES),
        }
    }

    pub fn chunk_bytes(mut self, chunk_bytes: ByteSize) -> Self {
        self.chunk_bytes = chunk_bytes;
        self
    }
}

/// Hex digits of the payload sha256 used to name part files.
const GENERATION_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChunkManifest {
    chunked: bool,
    /// Empty for parts written before generations existed.
    #[serde(default)]
    generation: String,
    parts: usize,
    sha256: String,
    bytes: u64,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    cfg: FileStoreConfig,
}

impl FileStore {
    pub fn open(cfg: FileStoreConfig) -> StoreResult<Self> {
        validate_key(&cfg.key)?;
        if cfg.chunk_bytes.as_u64() == 0 {
            return Err(StoreError::InvalidConfig("chunk size must be greater than zero".into()));
        }
        fs::create_dir_all(&cfg.root).map_err(|e| StoreError::io(&cfg.root, e))?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &FileStoreConfig {
        &self.cfg
    }

    /// Path of the main `<key>.json` file.
    pub fn path(&self) -> PathBuf {
        self.cfg.root.join(format!("{}.json", self.cfg.key))
    }

    fn part_path(&self, generation: &str, n: usize) -> PathBuf {
        let name = if generation.is_empty() {
            format!("{}.part-{n}", self.cfg.key)
        } else {
            format!("{}.{generation}.part-{n}", self.cfg.key)
        };
        self.cfg.root.join(name)
    }

    fn read_raw(&self) -> StoreResult<Option<Value>> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let value: Value = serde_json::from_slice(&bytes)?;

        if value.get("chunked").and_then(Value::as_bool) != Some(true) {
            return Ok(Some(value));
        }
        let manifest: ChunkManifest = serde_json::from_value(value)?;
        let payload = self.read_parts(&manifest)?;
        Ok(Some(serde_json::from_slice(&payload)?))
    }

    fn read_parts(&self, manifest: &ChunkManifest) -> StoreResult<Vec<u8>> {
        let mut payload = Vec::with_capacity(manifest.bytes as usize);
        for n in 0..manifest.parts {
            let path = self.part_path(&manifest.generation, n);
            let part = fs::read(&path).map_err(|e| StoreError::io(path, e))?;
            payload.extend_from_slice(&part);
        }
        if payload.len() as u64 != manifest.bytes {
            return Err(StoreError::Corrupt(format!(
                "expected {} bytes across {} parts, found {}",
                manifest.bytes,
                manifest.parts,
                payload.len()
            )));
        }
        let digest = sha256_hex(&payload);
        if digest != manifest.sha256 {
            return Err(StoreError::Corrupt(format!(
                "checksum mismatch: manifest {}, parts {digest}",
                manifest.sha256
            )));
        }
        Ok(payload)
    }

    fn write_payload(&self, payload: &[u8]) -> StoreResult<()> {
        let limit = self.cfg.chunk_bytes.as_u64() as usize;
        let (parts, keep) = if payload.len() <= limit {
            write_atomic(&self.path(), payload)?;
            (0, None)
        } else {
            let sha256 = sha256_hex(payload);
            let generation = sha256[..GENERATION_LEN].to_string();
            let chunks: Vec<&[u8]> = payload.chunks(limit).collect();
            // Leftovers of a failed attempt are swept by the next good save.
            for (n, chunk) in chunks.iter().enumerate() {
                write_atomic(&self.part_path(&generation, n), chunk)?;
            }
            let manifest = ChunkManifest {
                chunked: true,
                generation,
                parts: chunks.len(),
                sha256,
                bytes: payload.len() as u64,
            };
            write_atomic(&self.path(), &serde_json::to_vec(&manifest)?)?;
            (chunks.len(), Some(manifest.generation))
        };

        // The manifest swap committed the save; a failed sweep only leaves garbage.
        if let Err(e) = self.sweep_parts(keep.as_deref()) {
            tracing::warn!(key = %self.cfg.key, error = %e, "could not remove stale part files");
        }

        tracing::debug!(
            key = %self.cfg.key,
            size = %ByteSize::b(payload.len() as u64),
            parts,
            "wrote state file"
        );
        Ok(())
    }

    /// Remove part files of every generation except `keep`.
    fn sweep_parts(&self, keep: Option<&str>) -> StoreResult<()> {
        let root = &self.cfg.root;
        for entry in fs::read_dir(root).map_err(|e| StoreError::io(root, e))? {
            let entry = entry.map_err(|e| StoreError::io(root, e))?;
            let name = entry.file_name();
            let Some(generation) = name.to_str().and_then(|n| part_generation(&self.cfg.key, n)) else {
                continue;
            };
            if Some(generation) == keep {
                continue;
            }
            let path = entry.path();
            fs::remove_file(&path).map_err(|e| StoreError::io(&path, e))?;
        }
        Ok(())
    }
}

impl StateStore for FileStore {
    fn load(&self) -> ArborResult<Option<Value>> {
        Ok(self.read_raw()?)
    }

    fn save(&self, state: &TreeState) -> ArborResult<()> {
        let payload = serde_json::to_vec(state).map_err(StoreError::from)?;
        self.write_payload(&payload)?;
        Ok(())
    }
}

fn validate_key(key: &str) -> StoreResult<()> {
    let ok = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_string()))
    }
}

/// Generation of a part file name belonging to `key` (`""` for legacy parts).
fn part_generation<'a>(key: &str, name: &'a str) -> Option<&'a str> {
    let rest = name.strip_prefix(key)?.strip_prefix('.')?;
    let (generation, index) = match rest.split_once(".part-") {
        Some((generation, index)) => (generation, index),
        None => ("", rest.strip_prefix("part-")?),
    };
    let generation_ok = generation.is_empty()
        || (generation.len() == GENERATION_LEN && generation.bytes().all(|b| b.is_ascii_hexdigit()));
    let index_ok = !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit());
    (generation_ok && index_ok).then_some(generation)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".tmp.{}", std::process::id()));
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).map_err(|e| StoreError::io(&tmp, e))?;
    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}
