//! The tween scheduling engine.
//!
//! An [`Engine`] owns the registry of live tweens and drives each of them through its [`Status`]
//! state machine from callbacks registered with a [`TimerSource`]. At most one tween per target
//! and property name is ever running: when a tween starts, it interrupts a running sibling of the
//! same name and cancels any older sibling that has not started running yet.

use crate::easing::Easing;
use crate::registry::{Removal, TargetKey, TargetRegistry};
use crate::timer::{TimerCallback, TimerSource};
use crate::timing::{InvalidTimingError, TimingConfiguration, TimingDefaults, TimingPosition};
use crate::tween::{Callbacks, Phase, Property, Status, Tween, TweenHandle};
use crate::value::{TweenValues, Value};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;
use tracing::{debug, trace, warn};

/// Error returned when a tween request is rejected. Rejected requests are never scheduled.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TweenError {
    /// The property name was empty.
    #[error("tween property name must not be empty")]
    EmptyName,
    /// A [`TweenRequest`] was started without an end value.
    #[error("tween of `{0}` has no end value")]
    MissingValues(String),
    /// The delay or duration could not be scheduled.
    #[error(transparent)]
    InvalidTiming(#[from] InvalidTimingError),
}

type Step<T> = fn(&Rc<EngineInner<T>>, &Rc<Tween>, f64);

/// Schedules tweens of properties on targets of type `T`.
///
/// Targets are shared through [`Rc`] and identified by their allocation; the engine only keeps
/// weak references to them. Cloning an engine yields another handle to the same registry.
pub struct Engine<T: ?Sized + 'static> {
    inner: Rc<EngineInner<T>>,
}

impl<T: ?Sized + 'static> Clone for Engine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ?Sized + 'static> Engine<T> {
    /// Creates an engine driven by `timer`, using the default [`TimingDefaults`].
    pub fn new(timer: Rc<dyn TimerSource>) -> Self {
        Self::with_defaults(timer, TimingDefaults::default())
    }

    /// Creates an engine driven by `timer`, filling unset timing fields from `defaults`.
    pub fn with_defaults(timer: Rc<dyn TimerSource>, defaults: TimingDefaults) -> Self {
        Self {
            inner: Rc::new(EngineInner {
                timer,
                defaults,
                registry: RefCell::default(),
            }),
        }
    }

    /// Timing used for any field a tween leaves unset.
    pub fn defaults(&self) -> &TimingDefaults {
        &self.inner.defaults
    }

    /// Requests a tween of the property `name` on `target`.
    ///
    /// The tween is registered immediately and starts on a later pass of the engine's timer, once
    /// its delay has elapsed. Nothing is written to the property before then.
    ///
    /// Returns an error, without scheduling anything, if `name` is empty or the timing is invalid.
    pub fn start(
        &self,
        target: &Rc<T>,
        name: impl Into<String>,
        values: TweenValues,
        property: Property,
        timing: TimingConfiguration,
        callbacks: Callbacks,
    ) -> Result<TweenHandle, TweenError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TweenError::EmptyName);
        }
        let timing = timing.resolve(&self.inner.defaults, self.inner.timer.now())?;
        self.inner.prune_dropped_targets();
        let tween = Rc::new(Tween::new(
            name,
            TargetKey::of(target),
            timing,
            values,
            property,
            callbacks,
        ));
        trace!(tween = %tween.id(), name = %tween.name(), "Tween requested.");
        self.inner
            .registry
            .borrow_mut()
            .insert(target, tween.clone());
        self.inner.schedule(&tween);
        Ok(TweenHandle::new(tween))
    }

    /// Begins a fluent [`TweenRequest`] for the property `name` on `target`.
    pub fn tween(&self, target: &Rc<T>, name: impl Into<String>) -> TweenRequest<T> {
        TweenRequest {
            engine: self.clone(),
            target: target.clone(),
            name: name.into(),
            values: None,
            property: Property::default(),
            timing: TimingConfiguration::new(),
            callbacks: Callbacks::new(),
        }
    }

    /// The youngest live tween of the property `name` on `target`, if any.
    pub fn get_tween(&self, target: &Rc<T>, name: &str) -> Option<TweenHandle> {
        self.inner
            .registry
            .borrow()
            .tweens(target)
            .into_iter()
            .rev()
            .find(|tween| tween.name() == name)
            .map(TweenHandle::new)
    }

    /// All live tweens on `target`, oldest first.
    pub fn live_tweens(&self, target: &Rc<T>) -> Vec<TweenHandle> {
        self.inner
            .registry
            .borrow()
            .tweens(target)
            .into_iter()
            .map(TweenHandle::new)
            .collect()
    }

    /// Whether `target` has any live tweens.
    pub fn has_target(&self, target: &Rc<T>) -> bool {
        self.inner.registry.borrow().contains(target)
    }

    /// Number of targets with at least one live tween.
    pub fn target_count(&self) -> usize {
        self.inner.registry.borrow().len()
    }
}

struct EngineInner<T: ?Sized> {
    timer: Rc<dyn TimerSource>,
    defaults: TimingDefaults,
    registry: RefCell<TargetRegistry<T>>,
}

impl<T: ?Sized + 'static> EngineInner<T> {
    fn prune_dropped_targets(&self) {
        let dropped = self.registry.borrow_mut().take_dropped();
        for tween in dropped {
            warn!(
                tween = %tween.id(),
                name = %tween.name(),
                status = ?tween.status(),
                "Target was dropped while its tween was live; discarding tween."
            );
            tween.set_status(Status::Ended);
            if let Some(id) = tween.take_timer() {
                self.timer.stop(id);
            }
            tween.clear_callbacks();
        }
    }

    /// Wraps `step` as a timer callback for `tween`.
    ///
    /// The callback does nothing once the engine is gone. If the tween's target has been dropped,
    /// it discards that target's tweens instead of running `step`.
    fn callback(self: &Rc<Self>, tween: &Rc<Tween>, step: Step<T>) -> TimerCallback {
        let engine = Rc::downgrade(self);
        let tween = tween.clone();
        Box::new(move |elapsed| {
            let Some(engine) = engine.upgrade() else {
                return;
            };
            let target_dropped = engine.registry.borrow().is_dropped(tween.target());
            if target_dropped {
                engine.prune_dropped_targets();
            } else {
                step(&engine, &tween, elapsed);
            }
        })
    }

    fn rearm(self: &Rc<Self>, tween: &Rc<Tween>, step: Step<T>, delay: f64, origin: f64) {
        if let Some(id) = tween.timer() {
            self.timer
                .restart(id, self.callback(tween, step), delay, origin);
        }
    }

    fn defer(self: &Rc<Self>, tween: &Rc<Tween>, step: Step<T>, elapsed: f64) {
        let mut callback = self.callback(tween, step);
        self.timer.defer_once(Box::new(move || callback(elapsed)));
    }

    /// Time since `tween` became due to start, as of the current clock.
    fn elapsed_since_due(&self, tween: &Tween) -> f64 {
        let timing = tween.timing();
        (self.timer.now() - timing.time - timing.delay).max(0.0)
    }

    fn schedule(self: &Rc<Self>, tween: &Rc<Tween>) {
        let callback = self.callback(tween, Self::on_scheduled);
        let id = self.timer.repeat(callback, 0.0, tween.timing().time);
        tween.set_timer(id);
    }

    fn on_scheduled(self: &Rc<Self>, tween: &Rc<Tween>, elapsed: f64) {
        tween.set_status(Status::Scheduled);
        let (time, delay) = (tween.timing().time, tween.timing().delay);
        self.rearm(tween, Self::start_tween, delay, time);
        if delay <= elapsed {
            self.start_tween(tween, elapsed - delay);
        }
    }

    fn retry_start(self: &Rc<Self>, tween: &Rc<Tween>, _: f64) {
        let elapsed = self.elapsed_since_due(tween);
        self.start_tween(tween, elapsed);
    }

    fn start_tween(self: &Rc<Self>, tween: &Rc<Tween>, elapsed: f64) {
        match tween.status() {
            Status::Scheduled => {}
            Status::Ended => return self.stop_tween(tween),
            // A retry or a late pass of the start timer after the tween already won.
            _ => return,
        }

        let siblings = self.registry.borrow().siblings(tween);
        for sibling in siblings {
            match sibling.status() {
                Status::Ended => {}
                Status::Started => {
                    if sibling.id() < tween.id() {
                        sibling.supersede();
                    }
                    trace!(
                        tween = %tween.id(),
                        sibling = %sibling.id(),
                        name = %tween.name(),
                        "Sibling is starting; retrying at next opportunity."
                    );
                    self.defer(tween, Self::retry_start, elapsed);
                    return;
                }
                Status::Running => {
                    debug!(
                        tween = %tween.id(),
                        interrupted = %sibling.id(),
                        name = %tween.name(),
                        "Interrupting running tween."
                    );
                    sibling.fire(Phase::Interrupt);
                    self.stop_tween(&sibling);
                }
                _ if sibling.id() < tween.id() => {
                    debug!(
                        tween = %tween.id(),
                        cancelled = %sibling.id(),
                        name = %tween.name(),
                        "Cancelling older pending tween."
                    );
                    sibling.fire(Phase::Cancel);
                    self.stop_tween(&sibling);
                }
                _ => {}
            }
        }

        self.defer(tween, Self::commit, elapsed);
        tween.set_status(Status::Starting);
        tween.fire(Phase::Start);
        if tween.status() != Status::Starting {
            debug!(tween = %tween.id(), name = %tween.name(), "Tween superseded while starting.");
            return;
        }
        tween.set_status(Status::Started);
        tween.init();
    }

    fn commit(self: &Rc<Self>, tween: &Rc<Tween>, elapsed: f64) {
        if tween.status() != Status::Started {
            return;
        }
        if tween.is_superseded() {
            debug!(
                tween = %tween.id(),
                name = %tween.name(),
                "Younger tween is waiting to start; cancelling before running."
            );
            tween.fire(Phase::Cancel);
            self.stop_tween(tween);
            return;
        }
        tween.set_status(Status::Running);
        let (time, delay) = (tween.timing().time, tween.timing().delay);
        self.rearm(tween, Self::tick, delay, time);
        self.tick(tween, elapsed);
    }

    fn tick(self: &Rc<Self>, tween: &Rc<Tween>, elapsed: f64) {
        let progress = match tween.timing().position(elapsed) {
            TimingPosition::Active(progress) => progress,
            TimingPosition::Complete => {
                let now = self.timer.now();
                self.rearm(tween, |engine, tween, _| engine.stop_tween(tween), 0.0, now);
                tween.set_status(Status::Ending);
                1.0
            }
        };
        tween.update(progress);
        if tween.status() == Status::Ending {
            tween.fire(Phase::End);
            self.stop_tween(tween);
        }
    }

    /// Ends `tween` and removes it from the registry. Safe to call more than once.
    fn stop_tween(&self, tween: &Tween) {
        if tween.status() != Status::Ended {
            tween.set_status(Status::Ended);
        }
        if let Some(id) = tween.take_timer() {
            self.timer.stop(id);
        }
        tween.clear_callbacks();
        if self.registry.borrow_mut().remove(tween.target(), tween.id()) == Removal::Emptied {
            debug!(name = %tween.name(), "Last live tween of target ended; dropping target.");
        }
    }
}

impl<T: ?Sized> Drop for EngineInner<T> {
    fn drop(&mut self) {
        for tween in self.registry.get_mut().drain() {
            tween.set_status(Status::Ended);
            if let Some(id) = tween.take_timer() {
                self.timer.stop(id);
            }
            tween.clear_callbacks();
        }
    }
}

/// Fluent builder for a tween, created by [`Engine::tween`].
///
/// A request owns a handle to its engine, so it can be built ahead of time and moved into a
/// callback that starts it later.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tweenery_core::engine::Engine;
/// use tweenery_core::timer::FrameTimer;
///
/// let timer = Rc::new(FrameTimer::new());
/// let engine = Engine::new(timer.clone());
/// let target = Rc::new(Cell::new(0.0));
///
/// let setter_target = target.clone();
/// engine
///     .tween(&target, "x")
///     .from_to(0, 10)
///     .duration(100.0)
///     .setter(move |_, value| setter_target.set(value.as_number().unwrap_or_default()))
///     .start()
///     .unwrap();
///
/// timer.flush_at(0.0);
/// timer.flush_at(100.0);
/// assert_eq!(target.get(), 10.0);
/// ```
#[must_use = "a tween request does nothing until `start` is called"]
pub struct TweenRequest<T: ?Sized + 'static> {
    engine: Engine<T>,
    target: Rc<T>,
    name: String,
    values: Option<TweenValues>,
    property: Property,
    timing: TimingConfiguration,
    callbacks: Callbacks,
}

impl<T: ?Sized + 'static> TweenRequest<T> {
    /// Animates from the property's live value to `end`.
    pub fn to(self, end: impl Into<Value>) -> Self {
        self.values(TweenValues::to(end))
    }

    /// Animates from `start` to `end`.
    pub fn from_to(self, start: impl Into<Value>, end: impl Into<Value>) -> Self {
        self.values(TweenValues::from_to(start, end))
    }

    /// Keeps the property at `value` for the duration, without writing it.
    pub fn hold(self, value: impl Into<Value>) -> Self {
        self.values(TweenValues::hold(value))
    }

    /// Sets the start and end values.
    pub fn values(mut self, values: TweenValues) -> Self {
        self.values = Some(values);
        self
    }

    /// Sets the property accessor; replaces any previous setter and getter.
    pub fn property(mut self, property: Property) -> Self {
        self.property = property;
        self
    }

    /// Sets the function that writes each new value; clears any previous getter.
    pub fn setter(self, setter: impl FnMut(&str, &Value) + 'static) -> Self {
        self.property(Property::new(setter))
    }

    /// Adds a getter that reads the live value to start from.
    pub fn getter(mut self, getter: impl Fn(&str) -> Option<Value> + 'static) -> Self {
        self.property = self.property.with_getter(getter);
        self
    }

    /// Replaces the whole timing configuration.
    pub fn timing(mut self, timing: TimingConfiguration) -> Self {
        self.timing = timing;
        self
    }

    /// Sets the delay before the animation starts.
    pub fn delay(mut self, delay: f64) -> Self {
        self.timing = self.timing.delay(delay);
        self
    }

    /// Sets the animation duration, not counting the delay.
    pub fn duration(mut self, duration: f64) -> Self {
        self.timing = self.timing.duration(duration);
        self
    }

    /// Sets the easing applied to progress.
    pub fn ease(mut self, ease: Easing) -> Self {
        self.timing = self.timing.ease(ease);
        self
    }

    /// Adds a callback for [`Phase::Start`].
    pub fn on_start(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.callbacks = self.callbacks.on_start(callback);
        self
    }

    /// Adds a callback for [`Phase::Cancel`].
    pub fn on_cancel(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.callbacks = self.callbacks.on_cancel(callback);
        self
    }

    /// Adds a callback for [`Phase::Interrupt`].
    pub fn on_interrupt(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.callbacks = self.callbacks.on_interrupt(callback);
        self
    }

    /// Adds a callback for [`Phase::End`].
    pub fn on_end(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.callbacks = self.callbacks.on_end(callback);
        self
    }

    /// Submits the request to the engine. See [`Engine::start`].
    pub fn start(self) -> Result<TweenHandle, TweenError> {
        let values = self
            .values
            .ok_or_else(|| TweenError::MissingValues(self.name.clone()))?;
        self.engine.start(
            &self.target,
            self.name,
            values,
            self.property,
            self.timing,
            self.callbacks,
        )
    }
}
