//! Sample data model and payload decoding.
//!
//! One streaming event carries a full snapshot of the electrode array: 32
//! channels of 4096 points each, flattened row-major as little-endian f32.
//! [`decode_frame`] turns the raw payload into a [`Sample`] stamped with the
//! arrival time; anything that is not exactly one snapshot is rejected.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{MeaError, MeaResult};

/// Number of electrode channels per snapshot.
pub const CHANNEL_COUNT: usize = 32;

/// Number of points per channel per snapshot.
pub const POINTS_PER_CHANNEL: usize = 4096;

/// Exact payload length of one snapshot on the wire.
pub const FRAME_BYTES: usize = CHANNEL_COUNT * POINTS_PER_CHANNEL * 4;

/// One timestamped snapshot of the electrode array.
///
/// Immutable once constructed; channel data is stored flat, row-major
/// `[channels, points]`, matching the wire layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    timestamp: DateTime<Utc>,
    data: Vec<f32>,
}

impl Sample {
    /// Builds a sample from already-decoded channel data.
    ///
    /// Returns `Configuration` if `data` is not exactly one snapshot.
    pub fn new(timestamp: DateTime<Utc>, data: Vec<f32>) -> MeaResult<Self> {
        if data.len() != CHANNEL_COUNT * POINTS_PER_CHANNEL {
            return Err(MeaError::Configuration(format!(
                "sample must hold {} values, got {}",
                CHANNEL_COUNT * POINTS_PER_CHANNEL,
                data.len()
            )));
        }
        Ok(Self { timestamp, data })
    }

    /// Arrival timestamp (UTC).
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Timestamp formatted as the group key used in persisted output.
    ///
    /// RFC 3339 with microsecond precision; unique per session at wall-clock
    /// granularity.
    pub fn timestamp_key(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// One channel's 4096 points.
    ///
    /// # Panics
    /// Panics if `channel >= CHANNEL_COUNT`; callers iterate `0..CHANNEL_COUNT`.
    pub fn channel(&self, channel: usize) -> &[f32] {
        let start = channel * POINTS_PER_CHANNEL;
        &self.data[start..start + POINTS_PER_CHANNEL]
    }

    /// All channel data, flat row-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Decodes one raw payload into a [`Sample`] stamped `now`.
///
/// The payload must be exactly [`FRAME_BYTES`] long: 32 channels x 4096
/// points of little-endian f32, flattened `[channels, points]`. Anything else
/// is a [`MeaError::Decode`].
pub fn decode_frame(payload: &[u8]) -> MeaResult<Sample> {
    if payload.len() != FRAME_BYTES {
        return Err(MeaError::Decode {
            actual: payload.len(),
        });
    }
    let data = payload
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Sample::new(Utc::now(), data)
}
