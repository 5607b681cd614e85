//! Location acquisition seam.
//!
//! The platform's positioning capability (browser geolocation, GPS daemon,
//! simulator feed) sits behind the [`LocationSource`] trait. [`GeoSampler`]
//! wraps a source and adds the guarantees callers rely on: one-shot
//! lookups resolve within their timeout instead of hanging, and continuous
//! tracking is delivered over a channel with an idempotent stop handle.
//!
//! No filtering happens at this layer; raw samples flow through exactly as
//! the platform produced them. Pacing and significance gating live in
//! [`crate::location::throttle`] and [`crate::location::tracker`].
//!
//! # Cleanup
//!
//! Stopping a session cancels the underlying platform subscription. The
//! handle also cancels on drop, so owner teardown releases the
//! subscription even when `stop()` was never called explicitly.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::coord::Coordinate;

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = std::pin::Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// Default capacity of the raw sample channel.
///
/// Platforms emit at most a few samples per second; the throttle consumer
/// drains promptly, so a small buffer suffices.
pub const DEFAULT_SAMPLE_CHANNEL_CAPACITY: usize = 32;

/// Errors reported by the device location layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The user or platform denied access to location data.
    #[error("location permission denied")]
    PermissionDenied,

    /// The platform did not produce a fix within the allowed time.
    #[error("location acquisition timed out")]
    Timeout,

    /// Positioning is not available on this platform or transiently failed.
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// A raw coordinate sample with its acquisition timestamp.
///
/// Produced by a location source, consumed by the throttle, then
/// discarded; samples carry no persistent identity.
#[derive(Debug, Clone, Copy)]
pub struct LocationSample {
    /// The sampled position.
    pub coordinate: Coordinate,
    /// When the platform acquired the sample.
    pub acquired_at: Instant,
}

impl LocationSample {
    /// Create a sample acquired now.
    pub fn new(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            acquired_at: Instant::now(),
        }
    }

    /// Create a sample with an explicit acquisition timestamp.
    pub fn with_timestamp(coordinate: Coordinate, acquired_at: Instant) -> Self {
        Self {
            coordinate,
            acquired_at,
        }
    }
}

/// Event delivered on a tracking subscription.
#[derive(Debug, Clone)]
pub enum SampleEvent {
    /// A raw position sample.
    Sample(LocationSample),
    /// A device-layer error. Delivery continues unless the session is
    /// stopped; the consumer decides retry policy.
    Error(LocationError),
}

/// Platform positioning capability.
///
/// Implementations wrap whatever the host environment offers: a real GPS
/// subscription, a simulator feed, or the in-tree testing sources
/// [`StaticLocationSource`] and [`DeniedLocationSource`].
pub trait LocationSource: Send + Sync + 'static {
    /// Request a single position fix.
    ///
    /// Implementations may take arbitrarily long; callers go through
    /// [`GeoSampler::current_location`], which bounds the wait.
    fn request_location(&self, high_accuracy: bool) -> BoxFuture<'_, Result<Coordinate, LocationError>>;

    /// Begin continuous sample delivery.
    ///
    /// The implementation must deliver [`SampleEvent`]s on `events` until
    /// `cancel` fires, then release any platform subscription it holds.
    /// Returns an error if the subscription could not be established at
    /// all (e.g. permission denied up front).
    fn start_watch(
        &self,
        events: mpsc::Sender<SampleEvent>,
        cancel: CancellationToken,
    ) -> Result<(), LocationError>;
}

/// Handle for one tracking session.
///
/// `stop()` is idempotent: it always terminates delivery and releases the
/// platform subscription, no matter how often it is called or whether the
/// subscription already failed. Dropping the handle has the same effect.
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancellationToken,
}

impl SessionHandle {
    fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    /// Stop the session and release the underlying subscription.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Whether the session has been stopped.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancellation token governing this session.
    pub(crate) fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Stream of raw sample events from one tracking session.
#[derive(Debug)]
pub struct SampleStream {
    rx: mpsc::Receiver<SampleEvent>,
}

impl SampleStream {
    /// Receive the next event, or `None` once the session has ended.
    pub async fn next(&mut self) -> Option<SampleEvent> {
        self.rx.recv().await
    }
}

/// What to do when a one-shot location request fails.
///
/// Substituting a coordinate on failure is a deliberate product policy
/// (e.g. centering a map on a default city), never an implicit default;
/// callers opt in per call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallbackPolicy {
    /// Surface the error to the caller.
    Fail,
    /// Substitute this coordinate and log the substitution.
    UseCoordinate(Coordinate),
}

/// Wraps a [`LocationSource`] with timeout enforcement and subscription
/// plumbing.
pub struct GeoSampler {
    source: Arc<dyn LocationSource>,
}

impl GeoSampler {
    /// Create a sampler over the given source.
    pub fn new(source: Arc<dyn LocationSource>) -> Self {
        Self { source }
    }

    /// Acquire a single position fix, bounded by `timeout`.
    ///
    /// A single attempt: platform failures are returned as-is and a fix
    /// that does not arrive in time resolves to [`LocationError::Timeout`].
    /// This method never substitutes a default location; fallback policy
    /// belongs to the caller.
    pub async fn current_location(
        &self,
        timeout: Duration,
        high_accuracy: bool,
    ) -> Result<Coordinate, LocationError> {
        match tokio::time::timeout(timeout, self.source.request_location(high_accuracy)).await {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        }
    }

    /// Acquire a single position fix with an explicit failure policy.
    ///
    /// With [`FallbackPolicy::Fail`] this behaves exactly like
    /// [`GeoSampler::current_location`]; with a fallback coordinate, any
    /// failure resolves to that coordinate instead, logged so the
    /// substitution is visible in traces.
    pub async fn current_location_with_policy(
        &self,
        timeout: Duration,
        high_accuracy: bool,
        policy: FallbackPolicy,
    ) -> Result<Coordinate, LocationError> {
        match self.current_location(timeout, high_accuracy).await {
            Ok(coordinate) => Ok(coordinate),
            Err(error) => match policy {
                FallbackPolicy::Fail => Err(error),
                FallbackPolicy::UseCoordinate(fallback) => {
                    warn!(%error, %fallback, "location failed, using fallback coordinate");
                    Ok(fallback)
                }
            },
        }
    }

    /// Begin continuous tracking.
    ///
    /// Registers a long-lived subscription on the source and returns
    /// immediately with the raw sample stream and the session handle.
    pub fn start_tracking(&self) -> Result<(SampleStream, SessionHandle), LocationError> {
        let (tx, rx) = mpsc::channel(DEFAULT_SAMPLE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        self.source.start_watch(tx, cancel.clone())?;
        Ok((SampleStream { rx }, SessionHandle::new(cancel)))
    }
}

/// Testing source that reports a fixed coordinate.
///
/// One-shot requests resolve immediately with the coordinate; a watch
/// emits it once and then idles until cancelled.
#[derive(Debug, Clone)]
pub struct StaticLocationSource {
    coordinate: Coordinate,
}

impl StaticLocationSource {
    /// Create a source pinned to the given coordinate.
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl LocationSource for StaticLocationSource {
    fn request_location(&self, _high_accuracy: bool) -> BoxFuture<'_, Result<Coordinate, LocationError>> {
        let coordinate = self.coordinate;
        Box::pin(async move { Ok(coordinate) })
    }

    fn start_watch(
        &self,
        events: mpsc::Sender<SampleEvent>,
        cancel: CancellationToken,
    ) -> Result<(), LocationError> {
        let coordinate = self.coordinate;
        tokio::spawn(async move {
            let _ = events
                .send(SampleEvent::Sample(LocationSample::new(coordinate)))
                .await;
            cancel.cancelled().await;
        });
        Ok(())
    }
}

/// Testing source whose requests always fail with `PermissionDenied`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeniedLocationSource;

impl LocationSource for DeniedLocationSource {
    fn request_location(&self, _high_accuracy: bool) -> BoxFuture<'_, Result<Coordinate, LocationError>> {
        Box::pin(async { Err(LocationError::PermissionDenied) })
    }

    fn start_watch(
        &self,
        _events: mpsc::Sender<SampleEvent>,
        _cancel: CancellationToken,
    ) -> Result<(), LocationError> {
        Err(LocationError::PermissionDenied)
    }
}
