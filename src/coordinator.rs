//! Session coordinator: owns the capture lifecycle.
//!
//! One session spawns the streaming client and the health probe, then polls
//! queue occupancy on a fixed interval until the frame target is reached.
//! Teardown cancels the children, awaits the client so the close handshake is
//! guaranteed to have run, drains the queue, and persists the capture.
//!
//! Failure semantics: a streaming failure is fatal, with no retry. A probe
//! failure is fatal under [`OfflinePolicy::Abort`] and logged under
//! [`OfflinePolicy::WarnOnly`]. External cancellation is surfaced as
//! [`MeaError::Cancelled`] only after teardown has completed.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::ServiceClient;
use crate::config::{CaptureConfig, OfflinePolicy};
use crate::error::{MeaError, MeaResult};
use crate::probe::{HealthProbe, ServiceStatus};
use crate::queue::SampleQueue;
use crate::sample::Sample;
use crate::storage;

/// Interval between occupancy polls.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Runs one bounded capture session.
pub struct AcquisitionCoordinator {
    config: CaptureConfig,
    poll_interval: Duration,
}

impl AcquisitionCoordinator {
    /// Creates a coordinator for a validated configuration.
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Overrides the occupancy poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Captures to the frame target and persists the result.
    ///
    /// Returns the persisted samples, oldest first.
    pub async fn record(&self, cancel: CancellationToken) -> MeaResult<Vec<Sample>> {
        let samples = self.acquire(cancel).await?;
        storage::write_capture(self.config.save_path(), self.config.format(), &samples)?;
        Ok(samples)
    }

    /// Runs the acquisition loop and returns the drained samples.
    ///
    /// `cancel` is the external abort signal; it is re-raised as
    /// [`MeaError::Cancelled`] after every child task has resolved and the
    /// client has disconnected.
    pub async fn acquire(&self, cancel: CancellationToken) -> MeaResult<Vec<Sample>> {
        let target = self.config.frames();
        let queue = Arc::new(SampleQueue::new(self.config.capacity()));
        let children = cancel.child_token();

        let mut stream_handle = self.spawn_client(queue.clone(), children.clone());
        let mut probe_handle = self.spawn_probe(children.clone());
        let mut stream_resolved = false;
        let mut probe_resolved = false;

        let mut ticks = interval(self.poll_interval);
        let session: MeaResult<()> = loop {
            tokio::select! {
                // External cancellation wins every race.
                biased;

                () = cancel.cancelled() => break Err(MeaError::Cancelled),

                _ = ticks.tick() => {
                    let buffered = queue.len();
                    debug!(buffered, target, "capture progress");
                    if buffered >= target {
                        break Ok(());
                    }
                }

                joined = &mut stream_handle, if !stream_resolved => {
                    stream_resolved = true;
                    // The client only returns Ok when cancelled, so any
                    // resolution here ends the session.
                    break match flatten(joined) {
                        Ok(()) => Err(MeaError::ServiceUnavailable(
                            "streaming ended before the frame target was reached".into(),
                        )),
                        Err(err) => Err(err),
                    };
                }

                joined = &mut probe_handle, if !probe_resolved => {
                    probe_resolved = true;
                    if let Err(err) = self.apply_probe_outcome(flatten(joined)) {
                        break Err(err);
                    }
                }
            }
        };

        // Teardown: cancel the children and leave no task unresolved. The
        // client's close handshake has run by the time its task joins.
        children.cancel();
        if !stream_resolved {
            if let Err(err) = flatten((&mut stream_handle).await) {
                warn!(%err, "streaming task failed during teardown");
            }
        }
        if !probe_resolved {
            if let Err(err) = flatten((&mut probe_handle).await) {
                warn!(%err, "health probe unresolved at teardown");
            }
        }

        session?;

        let mut samples = queue.drain_all();
        if samples.len() > target {
            debug!(
                extra = samples.len() - target,
                "discarding snapshots past the frame target"
            );
            samples.truncate(target);
        }
        info!(snapshots = samples.len(), "capture complete");
        Ok(samples)
    }

    fn spawn_client(
        &self,
        queue: Arc<SampleQueue>,
        token: CancellationToken,
    ) -> JoinHandle<MeaResult<()>> {
        let client = ServiceClient::new(&self.config, queue);
        tokio::spawn(async move { client.run(token).await })
    }

    fn spawn_probe(&self, token: CancellationToken) -> JoinHandle<MeaResult<Option<ServiceStatus>>> {
        let probe = HealthProbe::new(&self.config);
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => Ok(None),
                status = probe.check() => status.map(Some),
            }
        })
    }

    fn apply_probe_outcome(
        &self,
        outcome: MeaResult<Option<ServiceStatus>>,
    ) -> MeaResult<()> {
        match outcome {
            Ok(Some(status)) => {
                debug!(live = status.live, "health probe resolved");
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => match self.config.offline_policy() {
                OfflinePolicy::Abort => Err(err),
                OfflinePolicy::WarnOnly => {
                    warn!(%err, "health probe failed; continuing to the frame target");
                    Ok(())
                }
            },
        }
    }
}

fn flatten<T>(joined: Result<MeaResult<T>, tokio::task::JoinError>) -> MeaResult<T> {
    match joined {
        Ok(result) => result,
        Err(join) => Err(join.into()),
    }
}
