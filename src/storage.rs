//! Persistence backends for drained captures.
//!
//! One capture becomes one file: a group per snapshot timestamp, each holding
//! 32 named channel datasets (`electrode_0` .. `electrode_31`) of 4096 floats.
//! Two backends implement that layout: HDF5 (the service's native format,
//! behind the `storage_hdf5` feature) and JSON (always available).
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a crash
//! mid-write never leaves a partial capture at the destination.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::StorageFormat;
use crate::error::{MeaError, MeaResult};
use crate::sample::{Sample, CHANNEL_COUNT};

/// A capture read back from disk: timestamp key to per-electrode points.
pub type CaptureContents = BTreeMap<String, Vec<Vec<f32>>>;

/// Backend writing one drained capture to one file.
pub trait SnapshotWriter {
    /// Writes all samples to `path`, grouped by timestamp.
    fn write(&self, path: &Path, samples: &[Sample]) -> MeaResult<()>;
}

/// Dataset name for one electrode channel.
fn electrode_name(channel: usize) -> String {
    format!("electrode_{channel}")
}

/// Selects the backend for a format.
///
/// Requesting HDF5 without the `storage_hdf5` feature fails here, before any
/// file is touched.
pub fn writer_for(format: StorageFormat) -> MeaResult<Box<dyn SnapshotWriter>> {
    match format {
        #[cfg(feature = "storage_hdf5")]
        StorageFormat::Hdf5 => Ok(Box::new(Hdf5Writer)),
        #[cfg(not(feature = "storage_hdf5"))]
        StorageFormat::Hdf5 => Err(MeaError::FeatureNotEnabled("storage_hdf5".to_string())),
        StorageFormat::Json => Ok(Box::new(JsonWriter)),
    }
}

/// Persists a drained capture atomically.
///
/// The backend writes to `<path>.tmp`; only a fully-written temp file is
/// renamed to the destination. On failure the temp file is removed and the
/// destination is never created.
pub fn write_capture(path: &Path, format: StorageFormat, samples: &[Sample]) -> MeaResult<()> {
    let writer = writer_for(format)?;
    let tmp = temp_path(path);
    match writer.write(&tmp, samples) {
        Ok(()) => {
            std::fs::rename(&tmp, path)?;
            info!(snapshots = samples.len(), path = %path.display(), "capture saved");
            Ok(())
        }
        Err(err) => {
            let _ = std::fs::remove_file(&tmp);
            Err(err)
        }
    }
}

/// Reads a persisted capture back; counterpart of [`write_capture`].
pub fn read_capture(path: &Path, format: StorageFormat) -> MeaResult<CaptureContents> {
    match format {
        #[cfg(feature = "storage_hdf5")]
        StorageFormat::Hdf5 => read_hdf5(path),
        #[cfg(not(feature = "storage_hdf5"))]
        StorageFormat::Hdf5 => Err(MeaError::FeatureNotEnabled("storage_hdf5".to_string())),
        StorageFormat::Json => read_json(path),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// JSON backend: `{ "<timestamp>": { "electrode_0": [...], ... }, ... }`.
pub struct JsonWriter;

impl SnapshotWriter for JsonWriter {
    fn write(&self, path: &Path, samples: &[Sample]) -> MeaResult<()> {
        let mut groups = serde_json::Map::new();
        for sample in samples {
            let mut channels = serde_json::Map::new();
            for ch in 0..CHANNEL_COUNT {
                let points = sample
                    .channel(ch)
                    .iter()
                    .map(|&v| serde_json::Value::from(v))
                    .collect();
                channels.insert(electrode_name(ch), serde_json::Value::Array(points));
            }
            groups.insert(sample.timestamp_key(), serde_json::Value::Object(channels));
        }
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(file, &serde_json::Value::Object(groups))
            .map_err(|e| MeaError::Storage(e.to_string()))
    }
}

fn read_json(path: &Path) -> MeaResult<CaptureContents> {
    let body = std::fs::read_to_string(path)?;
    let root: serde_json::Value =
        serde_json::from_str(&body).map_err(|e| MeaError::Storage(e.to_string()))?;
    let groups = root
        .as_object()
        .ok_or_else(|| MeaError::Storage("capture root must be an object".into()))?;

    let mut contents = CaptureContents::new();
    for (timestamp, group) in groups {
        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        for ch in 0..CHANNEL_COUNT {
            let points = group
                .get(electrode_name(ch))
                .and_then(|v| v.as_array())
                .ok_or_else(|| {
                    MeaError::Storage(format!("missing dataset electrode_{ch} in {timestamp}"))
                })?
                .iter()
                .map(|v| v.as_f64().unwrap_or_default() as f32)
                .collect();
            channels.push(points);
        }
        contents.insert(timestamp.clone(), channels);
    }
    Ok(contents)
}

/// HDF5 backend, matching the layout `h5py` consumers expect.
#[cfg(feature = "storage_hdf5")]
pub struct Hdf5Writer;

#[cfg(feature = "storage_hdf5")]
impl SnapshotWriter for Hdf5Writer {
    fn write(&self, path: &Path, samples: &[Sample]) -> MeaResult<()> {
        let file = hdf5::File::create(path).map_err(|e| MeaError::Storage(e.to_string()))?;
        for sample in samples {
            let group = file
                .create_group(&sample.timestamp_key())
                .map_err(|e| MeaError::Storage(e.to_string()))?;
            for ch in 0..CHANNEL_COUNT {
                group
                    .new_dataset_builder()
                    .with_data(sample.channel(ch))
                    .create(electrode_name(ch).as_str())
                    .map_err(|e| MeaError::Storage(e.to_string()))?;
            }
        }
        file.close().map_err(|e| MeaError::Storage(e.to_string()))
    }
}

#[cfg(feature = "storage_hdf5")]
fn read_hdf5(path: &Path) -> MeaResult<CaptureContents> {
    let file = hdf5::File::open(path).map_err(|e| MeaError::Storage(e.to_string()))?;
    let mut contents = CaptureContents::new();
    for name in file
        .member_names()
        .map_err(|e| MeaError::Storage(e.to_string()))?
    {
        let group = file
            .group(&name)
            .map_err(|e| MeaError::Storage(e.to_string()))?;
        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        for ch in 0..CHANNEL_COUNT {
            let points = group
                .dataset(&electrode_name(ch))
                .and_then(|d| d.read_raw::<f32>())
                .map_err(|e| MeaError::Storage(e.to_string()))?;
            channels.push(points);
        }
        contents.insert(name, channels);
    }
    Ok(contents)
}
