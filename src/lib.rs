//! # LiveMEA capture library
//!
//! This crate captures a bounded run of live multi-electrode array data from
//! the LiveMEA streaming service and persists it to a structured file. One
//! session is: connect, buffer snapshots under backpressure, stop at the
//! configured frame target, drain, write.
//!
//! ## Crate structure
//!
//! - **`config`**: eagerly-validated session configuration (`CaptureConfig`,
//!   `SourceId`, `OfflinePolicy`). Values that would be invalid cannot be
//!   constructed.
//! - **`sample`**: the `Sample` data model (32 channels x 4096 points per
//!   snapshot) and wire-payload decoding.
//! - **`queue`**: the bounded drop-oldest buffer between the streaming
//!   producer and the end-of-session drain.
//! - **`client`**: the websocket streaming client feeding the queue.
//! - **`probe`**: the HTTP health probe (`/check`, `/islive`, `/defaultmea`).
//! - **`coordinator`**: the session lifecycle: concurrent client + probe,
//!   occupancy polling, teardown and cancellation, drain and persist.
//! - **`storage`**: HDF5 (feature `storage_hdf5`) and JSON persistence with
//!   atomic temp-file-then-rename writes.
//! - **`error`**: the crate-wide `MeaError` taxonomy.
//!
//! ## Example
//!
//! ```no_run
//! use livemea::config::{CaptureConfig, SourceId};
//! use livemea::coordinator::AcquisitionCoordinator;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn capture() -> livemea::error::MeaResult<()> {
//! let config = CaptureConfig::new("live_data.json", 5, SourceId::new(0)?)?;
//! let samples = AcquisitionCoordinator::new(config)
//!     .record(CancellationToken::new())
//!     .await?;
//! println!("captured {} snapshots", samples.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod probe;
pub mod queue;
pub mod sample;
pub mod storage;
