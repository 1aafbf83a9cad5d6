//! Capture session configuration.
//!
//! Every field is validated eagerly, at construction or mutation, and invalid
//! values fail with `MeaError::Configuration` rather than being coerced. The
//! value objects here (`SourceId`, `CaptureConfig`) cannot exist in an invalid
//! state, so the rest of the pipeline never re-checks them.
//!
//! The original service measured "duration" in buffered snapshots, not
//! seconds; that count semantics is kept here under the honest name `frames`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MeaError, MeaResult};

/// Public LiveMEA service base.
pub const DEFAULT_BASE_URL: &str = "https://livemeaservice2.alpvision.com";

/// Default bounded-queue capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// Number of selectable channel sources on the service.
pub const SOURCE_COUNT: u8 = 4;

/// Selector for one of the service's channel groups, guaranteed in `[0,4)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SourceId(u8);

impl SourceId {
    /// Validates and wraps a raw source id.
    pub fn new(id: u8) -> MeaResult<Self> {
        if id >= SOURCE_COUNT {
            return Err(MeaError::Configuration(format!(
                "source id must be in the range 0-{}, got {id}",
                SOURCE_COUNT - 1
            )));
        }
        Ok(Self(id))
    }

    /// Raw id value.
    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SourceId {
    type Error = MeaError;

    fn try_from(id: u8) -> MeaResult<Self> {
        Self::new(id)
    }
}

impl From<SourceId> for u8 {
    fn from(id: SourceId) -> u8 {
        id.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What to do when the liveness probe reports the service offline.
///
/// The original client raised inside the probe but never cancelled the
/// streaming task, leaving the behavior ambiguous. Here it is an explicit
/// choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OfflinePolicy {
    /// An offline service ends the session with `ServiceUnavailable`.
    #[default]
    Abort,
    /// Log the offline report and keep streaming to the frame target.
    WarnOnly,
}

/// Output file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFormat {
    /// Hierarchical HDF5 output (`storage_hdf5` feature).
    Hdf5,
    /// Timestamp-keyed JSON output, always available.
    Json,
}

impl StorageFormat {
    /// File suffix the destination path is normalized to.
    pub fn extension(self) -> &'static str {
        match self {
            StorageFormat::Hdf5 => "h5",
            StorageFormat::Json => "json",
        }
    }

    /// Infers a format from a destination path's extension.
    ///
    /// Unknown or missing extensions default to HDF5, the service's native
    /// output format.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => StorageFormat::Json,
            _ => StorageFormat::Hdf5,
        }
    }
}

/// Validated configuration for one capture session.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    save_path: PathBuf,
    format: StorageFormat,
    frames: usize,
    source_id: SourceId,
    capacity: usize,
    base_url: String,
    offline_policy: OfflinePolicy,
}

impl CaptureConfig {
    /// Builds a validated configuration.
    ///
    /// The destination extension is normalized to the inferred format's
    /// suffix; the normalized path must not already exist (checked before any
    /// other side effect) and missing parent directories are created.
    /// `frames` is the number of buffered snapshots that ends the session and
    /// must be positive.
    pub fn new(
        save_path: impl AsRef<Path>,
        frames: usize,
        source_id: SourceId,
    ) -> MeaResult<Self> {
        if frames == 0 {
            return Err(MeaError::Configuration(
                "frame count must be greater than 0".into(),
            ));
        }

        let requested = save_path.as_ref();
        let format = StorageFormat::from_path(requested);
        let save_path = normalize_destination(requested, format)?;

        Ok(Self {
            save_path,
            format,
            frames,
            source_id,
            capacity: DEFAULT_CAPACITY,
            base_url: DEFAULT_BASE_URL.to_string(),
            offline_policy: OfflinePolicy::default(),
        })
    }

    /// Overrides the service base URL (`http`/`https` scheme).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> MeaResult<Self> {
        let base_url = base_url.into();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(MeaError::Configuration(format!(
                "base URL must use an http(s) scheme: {base_url}"
            )));
        }
        self.base_url = base_url.trim_end_matches('/').to_string();
        Ok(self)
    }

    /// Overrides the queue capacity.
    pub fn with_capacity(mut self, capacity: usize) -> MeaResult<Self> {
        if capacity == 0 {
            return Err(MeaError::Configuration(
                "queue capacity must be greater than 0".into(),
            ));
        }
        self.capacity = capacity;
        Ok(self)
    }

    /// Selects the offline liveness policy.
    pub fn with_offline_policy(mut self, policy: OfflinePolicy) -> Self {
        self.offline_policy = policy;
        self
    }

    /// Normalized destination path.
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Output format inferred from the destination.
    pub fn format(&self) -> StorageFormat {
        self.format
    }

    /// Snapshot count that ends the session.
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Configured channel source.
    pub fn source_id(&self) -> SourceId {
        self.source_id
    }

    /// Queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// HTTP base of the service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Websocket URL of the streaming endpoint, derived from the base URL.
    pub fn ws_url(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        }
    }

    /// Behavior when the probe reports the service offline.
    pub fn offline_policy(&self) -> OfflinePolicy {
        self.offline_policy
    }
}

/// Normalizes the extension, rejects pre-existing destinations, creates
/// missing parent directories.
fn normalize_destination(requested: &Path, format: StorageFormat) -> MeaResult<PathBuf> {
    let mut path = requested.to_path_buf();
    path.set_extension(format.extension());

    if path.exists() {
        return Err(MeaError::Configuration(format!(
            "{} already exists and would be overwritten by new data",
            path.display()
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn source() -> SourceId {
        SourceId::new(0).unwrap()
    }

    #[test]
    fn source_id_accepts_valid_range() {
        for id in 0..SOURCE_COUNT {
            assert!(SourceId::new(id).is_ok());
        }
    }

    #[test]
    fn source_id_rejects_out_of_range() {
        for id in [4u8, 5, 255] {
            let err = SourceId::new(id).unwrap_err();
            assert!(matches!(err, MeaError::Configuration(_)));
        }
    }

    #[test]
    fn rejects_zero_frames() {
        let dir = tempdir().unwrap();
        let err = CaptureConfig::new(dir.path().join("out.h5"), 0, source()).unwrap_err();
        assert!(matches!(err, MeaError::Configuration(_)));
    }

    #[test]
    fn normalizes_extension_to_h5() {
        let dir = tempdir().unwrap();
        let config = CaptureConfig::new(dir.path().join("capture.dat"), 5, source()).unwrap();
        assert_eq!(config.save_path().extension().unwrap(), "h5");
        assert_eq!(config.format(), StorageFormat::Hdf5);
    }

    #[test]
    fn json_extension_selects_json_backend() {
        let dir = tempdir().unwrap();
        let config = CaptureConfig::new(dir.path().join("capture.json"), 5, source()).unwrap();
        assert_eq!(config.format(), StorageFormat::Json);
    }

    #[test]
    fn rejects_pre_existing_destination() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("taken.h5");
        std::fs::write(&path, b"occupied").unwrap();
        let err = CaptureConfig::new(&path, 5, source()).unwrap_err();
        assert!(matches!(err, MeaError::Configuration(_)));
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a/b/capture.h5");
        let config = CaptureConfig::new(&path, 5, source()).unwrap();
        assert!(config.save_path().parent().unwrap().exists());
    }

    #[test]
    fn ws_url_swaps_scheme() {
        let dir = tempdir().unwrap();
        let config = CaptureConfig::new(dir.path().join("c.h5"), 1, source())
            .unwrap()
            .with_base_url("http://127.0.0.1:9000")
            .unwrap();
        assert_eq!(config.ws_url(), "ws://127.0.0.1:9000");

        let config = config.with_base_url("https://example.org/").unwrap();
        assert_eq!(config.ws_url(), "wss://example.org");
    }

    #[test]
    fn rejects_non_http_base_url() {
        let dir = tempdir().unwrap();
        let config = CaptureConfig::new(dir.path().join("c.h5"), 1, source()).unwrap();
        assert!(config.with_base_url("ftp://example.org").is_err());
    }

    #[test]
    fn rejects_zero_capacity() {
        let dir = tempdir().unwrap();
        let config = CaptureConfig::new(dir.path().join("c.h5"), 1, source()).unwrap();
        assert!(config.with_capacity(0).is_err());
    }

    #[test]
    fn defaults_match_service() {
        let dir = tempdir().unwrap();
        let config = CaptureConfig::new(dir.path().join("c.h5"), 1, source()).unwrap();
        assert_eq!(config.capacity(), DEFAULT_CAPACITY);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.offline_policy(), OfflinePolicy::Abort);
    }
}
