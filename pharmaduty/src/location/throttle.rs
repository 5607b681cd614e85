//! Delivery pacing for location updates.
//!
//! Raw tracking streams can emit several samples per second; downstream
//! consumers (roster refresh, proximity ranking) only want one accepted
//! location per throttle window. The controller is a two-state machine:
//!
//! ```text
//! Idle --[sample within window]--> Armed (timer counting down)
//! Armed --[timer fires / window elapses]--> Idle (newest pending delivered)
//! ```
//!
//! Bursts collapse to the single most recent sample, delivery order
//! follows arrival order, and the deferred timer and the immediate path
//! are mutually exclusive for a given sample epoch: an immediate delivery
//! disarms the timer in the same call, so a late firing cannot deliver a
//! second time.
//!
//! The controller itself is pure state: callers inject `Instant`s and act
//! on the returned [`ThrottleOutcome`]. The tokio timer that drives
//! deferred deliveries lives in [`crate::location::tracker`], which keeps
//! all mutation on one task as the ownership model requires.

use std::time::{Duration, Instant};

use crate::coord::Coordinate;
use crate::location::change::{is_significant_change, DEFAULT_CHANGE_THRESHOLD_DEG};
use crate::location::source::LocationSample;

/// Default minimum interval between accepted deliveries.
pub const DEFAULT_MIN_DELIVERY_INTERVAL: Duration = Duration::from_millis(10_000);

/// Configuration for the throttle controller.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum wall-clock interval between two accepted deliveries.
    pub min_interval: Duration,

    /// Degree threshold handed to the significant-change gate.
    pub change_threshold_deg: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_DELIVERY_INTERVAL,
            change_threshold_deg: DEFAULT_CHANGE_THRESHOLD_DEG,
        }
    }
}

/// Result of feeding one sample into the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottleOutcome {
    /// The sample passed the throttle window and the significance gate;
    /// deliver it downstream. Any armed timer is now disarmed.
    Delivered(Coordinate),

    /// The throttle window was open but the change was not significant.
    /// Nothing is delivered; the window slot is consumed anyway. Any
    /// armed timer is now disarmed.
    Suppressed,

    /// The window is still closed and no timer was armed; the caller must
    /// schedule one to fire after the contained duration.
    Deferred(Duration),

    /// The window is still closed and a timer is already counting down;
    /// the pending sample was replaced with this newer one.
    Pending,

    /// The controller has been stopped; the sample was ignored.
    Inactive,
}

/// State machine pacing location deliveries.
///
/// Owned by exactly one tracking session; all methods take `&mut self`
/// and the session serializes access by construction.
#[derive(Debug)]
pub struct ThrottleController {
    config: ThrottleConfig,

    /// When the last delivery attempt consumed the window slot.
    last_delivered_at: Option<Instant>,

    /// The last coordinate actually delivered downstream.
    last_delivered: Option<Coordinate>,

    /// Most recent sample awaiting a deferred delivery.
    pending: Option<LocationSample>,

    /// Whether a deferred-delivery timer is counting down.
    timer_armed: bool,

    /// Cleared by `stop()`; a stopped controller ignores samples.
    active: bool,
}

impl ThrottleController {
    /// Create a controller with the given configuration.
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            last_delivered_at: None,
            last_delivered: None,
            pending: None,
            timer_armed: false,
            active: true,
        }
    }

    /// Create a controller with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(ThrottleConfig::default())
    }

    /// Feed one raw sample into the controller.
    ///
    /// The sample always becomes the pending candidate first, superseding
    /// any older pending sample. If the throttle window is open the
    /// pending sample is put through the significance gate immediately;
    /// otherwise a deferred delivery is requested (or, when one is
    /// already armed, nothing further happens).
    pub fn on_sample(&mut self, sample: LocationSample, now: Instant) -> ThrottleOutcome {
        if !self.active {
            return ThrottleOutcome::Inactive;
        }

        self.pending = Some(sample);

        let elapsed = self
            .last_delivered_at
            .map(|at| now.saturating_duration_since(at));

        match elapsed {
            Some(elapsed) if elapsed < self.config.min_interval => {
                if self.timer_armed {
                    ThrottleOutcome::Pending
                } else {
                    self.timer_armed = true;
                    ThrottleOutcome::Deferred(self.config.min_interval - elapsed)
                }
            }
            // First-ever sample or window already open: attempt delivery now.
            _ => self.attempt_delivery(now),
        }
    }

    /// Handle the deferred-delivery timer firing.
    ///
    /// Re-checks the pending sample (it may have been superseded since
    /// the timer was armed) and puts it through the same gate as the
    /// immediate path. Returns the delivered coordinate, if any.
    ///
    /// A firing that arrives after an immediate delivery already disarmed
    /// the timer is a no-op.
    pub fn on_timer_fired(&mut self, now: Instant) -> Option<Coordinate> {
        if !self.active || !self.timer_armed {
            return None;
        }
        self.timer_armed = false;

        if self.pending.is_none() {
            return None;
        }

        match self.attempt_delivery(now) {
            ThrottleOutcome::Delivered(coordinate) => Some(coordinate),
            _ => None,
        }
    }

    /// Stop the controller and reset its state to the initial empty form.
    ///
    /// Subsequent `on_sample` calls are no-ops; a restarted tracking
    /// session constructs a fresh controller.
    pub fn stop(&mut self) {
        self.last_delivered_at = None;
        self.last_delivered = None;
        self.pending = None;
        self.timer_armed = false;
        self.active = false;
    }

    /// Whether a deferred-delivery timer should currently be running.
    pub fn is_armed(&self) -> bool {
        self.timer_armed
    }

    /// The last coordinate delivered downstream, if any.
    pub fn last_delivered(&self) -> Option<Coordinate> {
        self.last_delivered
    }

    /// The controller configuration.
    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    /// Deliver the pending sample through the significance gate.
    ///
    /// Consumes the window slot whether or not the change turns out to be
    /// significant, and disarms any live timer in the same step.
    fn attempt_delivery(&mut self, now: Instant) -> ThrottleOutcome {
        let Some(sample) = self.pending.take() else {
            return ThrottleOutcome::Suppressed;
        };

        self.last_delivered_at = Some(now);
        self.timer_armed = false;

        if is_significant_change(
            self.last_delivered,
            sample.coordinate,
            self.config.change_threshold_deg,
        ) {
            self.last_delivered = Some(sample.coordinate);
            ThrottleOutcome::Delivered(sample.coordinate)
        } else {
            ThrottleOutcome::Suppressed
        }
    }
}
