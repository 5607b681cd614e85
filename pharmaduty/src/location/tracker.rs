//! Throttled tracking session.
//!
//! Wires the raw sample stream from a [`GeoSampler`] subscription through
//! the [`ThrottleController`] and delivers accepted locations to a single
//! downstream consumer channel. The session is one tokio task: it owns
//! the controller, the deferred-delivery timer, and the platform
//! subscription handle, so all throttle state mutation is serialized by
//! construction, with no locking, and a timer firing can never race an
//! immediate delivery.
//!
//! Device errors on the subscription are passed through to the consumer
//! (for retry prompts) and never silently swallowed.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::coord::Coordinate;
use crate::location::source::{GeoSampler, LocationError, SampleEvent, SampleStream, SessionHandle};
use crate::location::throttle::{ThrottleConfig, ThrottleController, ThrottleOutcome};

/// Update delivered to the tracking consumer.
#[derive(Debug, Clone)]
pub enum TrackingUpdate {
    /// A significant, throttle-accepted location.
    Location(Coordinate),
    /// A device-layer error surfaced for the consumer to act on.
    Error(LocationError),
}

/// Handle for a running throttled tracking session.
///
/// `stop()` is idempotent; it cancels any in-flight deferred-delivery
/// timer, resets the throttle state, and releases the platform
/// subscription. Dropping the handle stops the session the same way.
#[derive(Debug)]
pub struct TrackerHandle {
    cancel: CancellationToken,
}

impl TrackerHandle {
    /// Stop the session.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the session has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TrackerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Throttled location tracking.
pub struct ThrottledTracker;

impl ThrottledTracker {
    /// Start a tracking session.
    ///
    /// Registers a subscription on the sampler and spawns the session
    /// task. Accepted locations and passed-through errors arrive on
    /// `updates`; the session ends when the handle is stopped, the
    /// consumer is dropped, or the source closes its stream.
    ///
    /// # Errors
    ///
    /// Returns the source's error if the subscription could not be
    /// established.
    pub fn start(
        sampler: &GeoSampler,
        config: ThrottleConfig,
        updates: mpsc::Sender<TrackingUpdate>,
    ) -> Result<TrackerHandle, LocationError> {
        let (stream, session) = sampler.start_tracking()?;
        let cancel = session.token().clone();
        let controller = ThrottleController::new(config);

        tokio::spawn(run_session(stream, session, controller, updates));

        Ok(TrackerHandle { cancel })
    }
}

/// The session loop: samples in, paced deliveries out.
async fn run_session(
    mut stream: SampleStream,
    session: SessionHandle,
    mut controller: ThrottleController,
    updates: mpsc::Sender<TrackingUpdate>,
) {
    let cancel = session.token().clone();

    // Deadline of the armed deferred-delivery timer, if any.
    let mut deadline: Option<tokio::time::Instant> = None;

    loop {
        let timer_deadline = deadline;
        let timer = async move {
            match timer_deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => break,

            event = stream.next() => match event {
                Some(SampleEvent::Sample(sample)) => {
                    match controller.on_sample(sample, Instant::now()) {
                        ThrottleOutcome::Delivered(coordinate) => {
                            deadline = None;
                            debug!(%coordinate, "delivering significant location");
                            if updates.send(TrackingUpdate::Location(coordinate)).await.is_err() {
                                debug!("tracking consumer dropped, ending session");
                                break;
                            }
                        }
                        ThrottleOutcome::Suppressed => {
                            deadline = None;
                        }
                        ThrottleOutcome::Deferred(wait) => {
                            deadline = Some(tokio::time::Instant::now() + wait);
                        }
                        ThrottleOutcome::Pending | ThrottleOutcome::Inactive => {}
                    }
                }
                Some(SampleEvent::Error(error)) => {
                    warn!(%error, "location subscription error");
                    if updates.send(TrackingUpdate::Error(error)).await.is_err() {
                        break;
                    }
                }
                None => {
                    debug!("sample stream closed, ending session");
                    break;
                }
            },

            _ = timer => {
                deadline = None;
                if let Some(coordinate) = controller.on_timer_fired(Instant::now()) {
                    debug!(%coordinate, "delivering deferred location");
                    if updates.send(TrackingUpdate::Location(coordinate)).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    controller.stop();
    session.stop();
}
