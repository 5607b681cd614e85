//! Device location pipeline.
//!
//! Raw samples from a platform [`LocationSource`] flow through the
//! significant-change detector and the throttle controller before a
//! single downstream consumer sees them:
//!
//! ```text
//! GeoSampler ──► raw samples ──► ThrottleController ──► TrackingUpdate
//!                                (change gate inside)    (one consumer)
//! ```
//!
//! One [`ThrottledTracker`] session owns one [`ThrottleController`];
//! sessions never share throttle state.

mod change;
mod source;
mod throttle;
mod tracker;

pub use change::{is_significant_change, DEFAULT_CHANGE_THRESHOLD_DEG};
pub use source::{
    BoxFuture, DeniedLocationSource, FallbackPolicy, GeoSampler, LocationError, LocationSample,
    LocationSource, SampleEvent, SampleStream, SessionHandle, StaticLocationSource,
    DEFAULT_SAMPLE_CHANNEL_CAPACITY,
};
pub use throttle::{
    ThrottleConfig, ThrottleController, ThrottleOutcome, DEFAULT_MIN_DELIVERY_INTERVAL,
};
pub use tracker::{ThrottledTracker, TrackerHandle, TrackingUpdate};
