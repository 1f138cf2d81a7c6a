//! Timing of a single tween: when it starts, how long it runs, and how its progress is eased.

use crate::easing::{Easing, EasingFunction};
use thiserror::Error;

/// Engine-wide timing used for any field a [`TimingConfiguration`] leaves unset.
///
/// Times have no inherent unit; they are in whatever unit the engine's
/// [`TimerSource`](crate::timer::TimerSource) reports, normally milliseconds.
#[derive(Clone, Debug)]
pub struct TimingDefaults {
    /// Delay between the tween request and the start of the animation.
    pub delay: f64,
    /// Duration of the animation, excluding delay.
    pub duration: f64,
    /// Easing applied to the animation's progress.
    pub ease: Easing,
}

impl Default for TimingDefaults {
    fn default() -> Self {
        Self {
            delay: 0.0,
            duration: 250.0,
            ease: Easing::default(),
        }
    }
}

/// Configuration and fluent builder interface for the [`Timing`] of a tween.
///
/// Every field is optional; unset fields take the engine's [`TimingDefaults`] when the tween is
/// started.
#[derive(Clone, Debug, Default)]
pub struct TimingConfiguration {
    delay: Option<f64>,
    duration: Option<f64>,
    ease: Option<Easing>,
}

impl TimingConfiguration {
    /// Creates a configuration that uses the engine defaults for everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the delay before the animation starts.
    ///
    /// Must be finite and not negative.
    pub fn delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Configures the animation duration, not counting [`delay`](Self::delay).
    ///
    /// Must be finite and greater than zero.
    pub fn duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Configures the easing function.
    pub fn ease(mut self, ease: Easing) -> Self {
        self.ease = Some(ease);
        self
    }

    /// Fills in unset fields from `defaults`, anchors the result at `time`, and validates it.
    pub fn resolve(
        &self,
        defaults: &TimingDefaults,
        time: f64,
    ) -> Result<Timing, InvalidTimingError> {
        let delay = self.delay.unwrap_or(defaults.delay);
        let duration = self.duration.unwrap_or(defaults.duration);
        if !delay.is_finite() || delay < 0.0 {
            return Err(InvalidTimingError::Delay(delay));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(InvalidTimingError::Duration(duration));
        }
        Ok(Timing {
            time,
            delay,
            duration,
            ease: self.ease.clone().unwrap_or_else(|| defaults.ease.clone()),
        })
    }
}

/// Error produced when a tween's timing cannot be scheduled.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum InvalidTimingError {
    /// Delay was negative, infinite or NaN.
    #[error("tween delay must be finite and non-negative, got {0}")]
    Delay(f64),
    /// Duration was zero, negative, infinite or NaN.
    #[error("tween duration must be finite and positive, got {0}")]
    Duration(f64),
}

/// The resolved timing of one tween.
#[derive(Clone, Debug)]
pub struct Timing {
    /// Instant at which the tween was requested; all elapsed times are measured from here.
    pub time: f64,
    /// Delay between [`time`](Self::time) and the start of the animation.
    pub delay: f64,
    /// Duration of the animation after the delay.
    pub duration: f64,
    /// Easing applied to progress.
    pub ease: Easing,
}

impl Timing {
    /// Converts time elapsed since the animation started (i.e. after the delay) into a position.
    ///
    /// While the animation is running, the position carries the eased progress. Once `elapsed`
    /// reaches the duration the animation is [`Complete`](TimingPosition::Complete) and the caller
    /// is expected to apply progress `1.0` exactly, rather than whatever the easing would produce.
    pub fn position(&self, elapsed: f64) -> TimingPosition {
        if elapsed < self.duration {
            TimingPosition::Active(self.ease.calc(elapsed / self.duration))
        } else {
            TimingPosition::Complete
        }
    }
}

/// Result of [`Timing::position`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimingPosition {
    /// The animation is in progress, with the given eased progress.
    Active(f64),
    /// The animation has reached or passed its duration.
    Complete,
}
