//! A single scheduled animation of one named property on one target.

use crate::interpolation::Interpolator;
use crate::registry::TargetKey;
use crate::timer::TimerId;
use crate::timing::Timing;
use crate::value::{StartValue, TweenValues, Value};
use enum_map::{Enum, EnumMap};
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug, Display, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// Identifier of a tween, unique for the lifetime of the process.
///
/// Identifiers increase monotonically, so comparing two of them tells which tween was requested
/// first. This is what decides which of two not-yet-running tweens of the same property yields.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TweenId(u64);

static NEXT_TWEEN_ID: AtomicU64 = AtomicU64::new(1);

impl TweenId {
    pub(crate) fn next() -> Self {
        Self(NEXT_TWEEN_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw identifier.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for TweenId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a tween.
///
/// Tweens only move forward through these states, in declaration order, except that a tween that
/// is cancelled or interrupted jumps straight to [`Ended`](Self::Ended).
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Status {
    /// Requested, but no scheduling pass has run yet.
    Created,
    /// Waiting for its delay to elapse.
    Scheduled,
    /// Running its `start` callbacks.
    Starting,
    /// Started and initialized; becomes [`Running`](Self::Running) at the next opportunity.
    Started,
    /// Applying a new value on every pass.
    Running,
    /// Applied its final value; running its `end` callbacks.
    Ending,
    /// Finished, cancelled or interrupted, and removed from the engine.
    Ended,
}

/// Lifecycle events that tween callbacks can be attached to.
#[derive(Clone, Copy, Debug, Enum, Eq, Hash, PartialEq)]
pub enum Phase {
    /// The tween won its property and is about to start animating.
    Start,
    /// The tween was superseded by a newer tween of the same property before it started running.
    Cancel,
    /// The tween was superseded by a newer tween of the same property while running.
    Interrupt,
    /// The tween ran to completion.
    End,
}

/// A lifecycle callback. Each one runs at most once.
pub type Callback = Box<dyn FnOnce()>;

/// Lists of lifecycle callbacks for a tween, one list per [`Phase`].
///
/// Callbacks in a list run in the order they were added.
#[derive(Default)]
pub struct Callbacks {
    lists: EnumMap<Phase, Vec<Callback>>,
}

impl Callbacks {
    /// Creates an empty set of callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback for `phase`.
    pub fn on(mut self, phase: Phase, callback: impl FnOnce() + 'static) -> Self {
        self.lists[phase].push(Box::new(callback));
        self
    }

    /// Adds a callback for [`Phase::Start`].
    pub fn on_start(self, callback: impl FnOnce() + 'static) -> Self {
        self.on(Phase::Start, callback)
    }

    /// Adds a callback for [`Phase::Cancel`].
    pub fn on_cancel(self, callback: impl FnOnce() + 'static) -> Self {
        self.on(Phase::Cancel, callback)
    }

    /// Adds a callback for [`Phase::Interrupt`].
    pub fn on_interrupt(self, callback: impl FnOnce() + 'static) -> Self {
        self.on(Phase::Interrupt, callback)
    }

    /// Adds a callback for [`Phase::End`].
    pub fn on_end(self, callback: impl FnOnce() + 'static) -> Self {
        self.on(Phase::End, callback)
    }

    /// Number of callbacks registered for `phase`.
    pub fn len(&self, phase: Phase) -> usize {
        self.lists[phase].len()
    }

    /// Whether no callbacks are registered for any phase.
    pub fn is_empty(&self) -> bool {
        self.lists.values().all(Vec::is_empty)
    }
}

impl Debug for Callbacks {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.lists.iter().map(|(phase, list)| (phase, list.len())))
            .finish()
    }
}

type Setter = Box<dyn FnMut(&str, &Value)>;
type Getter = Box<dyn Fn(&str) -> Option<Value>>;

/// How a tween reads and writes the property it animates.
///
/// The setter receives the property name and the new value on every frame. The optional getter is
/// consulted once, when a tween created with [`TweenValues::to`] starts, to find the value to
/// animate from.
pub struct Property {
    setter: RefCell<Setter>,
    getter: Option<Getter>,
}

impl Default for Property {
    /// A property that ignores every value, for tweens that only drive callbacks.
    fn default() -> Self {
        Self::new(|_, _| {})
    }
}

impl Property {
    /// Creates a property from its setter.
    pub fn new(setter: impl FnMut(&str, &Value) + 'static) -> Self {
        Self {
            setter: RefCell::new(Box::new(setter)),
            getter: None,
        }
    }

    /// Adds a getter that reads the live value of the property.
    pub fn with_getter(mut self, getter: impl Fn(&str) -> Option<Value> + 'static) -> Self {
        self.getter = Some(Box::new(getter));
        self
    }

    fn get(&self, name: &str) -> Option<Value> {
        self.getter.as_ref().and_then(|getter| getter(name))
    }

    fn set(&self, name: &str, value: &Value) {
        (self.setter.borrow_mut())(name, value)
    }
}

/// Internal state of one tween. Shared between the registry, the timer callbacks that drive it and
/// any [`TweenHandle`]s.
pub(crate) struct Tween {
    id: TweenId,
    name: String,
    target: TargetKey,
    timing: Timing,
    values: TweenValues,
    property: Property,
    status: Cell<Status>,
    superseded: Cell<bool>,
    timer: Cell<Option<TimerId>>,
    callbacks: RefCell<EnumMap<Phase, Vec<Callback>>>,
    interpolator: RefCell<Option<Interpolator>>,
    current: RefCell<Option<Value>>,
}

impl Tween {
    pub(crate) fn new(
        name: String,
        target: TargetKey,
        timing: Timing,
        values: TweenValues,
        property: Property,
        callbacks: Callbacks,
    ) -> Self {
        Self {
            id: TweenId::next(),
            name,
            target,
            timing,
            values,
            property,
            status: Cell::new(Status::Created),
            superseded: Cell::new(false),
            timer: Cell::new(None),
            callbacks: RefCell::new(callbacks.lists),
            interpolator: RefCell::new(None),
            current: RefCell::new(None),
        }
    }

    pub(crate) fn id(&self) -> TweenId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn target(&self) -> TargetKey {
        self.target
    }

    pub(crate) fn timing(&self) -> &Timing {
        &self.timing
    }

    pub(crate) fn status(&self) -> Status {
        self.status.get()
    }

    pub(crate) fn set_status(&self, status: Status) {
        trace!(tween = %self.id, name = %self.name, ?status, "Tween status changed.");
        self.status.set(status);
    }

    /// Whether a younger sibling asked this tween to yield while it was [`Status::Started`].
    pub(crate) fn is_superseded(&self) -> bool {
        self.superseded.get()
    }

    pub(crate) fn supersede(&self) {
        self.superseded.set(true);
    }

    pub(crate) fn timer(&self) -> Option<TimerId> {
        self.timer.get()
    }

    pub(crate) fn set_timer(&self, timer: TimerId) {
        self.timer.set(Some(timer));
    }

    pub(crate) fn take_timer(&self) -> Option<TimerId> {
        self.timer.take()
    }

    pub(crate) fn add_callback(&self, phase: Phase, callback: Callback) {
        self.callbacks.borrow_mut()[phase].push(callback);
    }

    /// Runs and discards the callbacks for `phase`.
    ///
    /// Callbacks may re-enter the engine, so the list is detached before any of them runs.
    pub(crate) fn fire(&self, phase: Phase) {
        let callbacks = std::mem::take(&mut self.callbacks.borrow_mut()[phase]);
        for callback in callbacks {
            callback();
        }
    }

    /// Discards every callback that has not run. Called once the tween has ended, so that callbacks
    /// holding a handle to their own tween do not keep it alive.
    pub(crate) fn clear_callbacks(&self) {
        let callbacks = std::mem::take(&mut *self.callbacks.borrow_mut());
        drop(callbacks);
    }

    /// Resolves the start value and the interpolation to the end value.
    ///
    /// When the start already equals the end there is nothing to interpolate, and the tween keeps
    /// running without ever calling the setter.
    pub(crate) fn init(&self) {
        let start = match &self.values.start {
            StartValue::Explicit(value) => value.clone(),
            StartValue::Live => self
                .property
                .get(&self.name)
                .unwrap_or_else(|| self.values.end.clone()),
        };
        let interpolator = if start == self.values.end {
            trace!(tween = %self.id, name = %self.name, "Start equals end; tween will not update.");
            None
        } else {
            Some(Interpolator::resolve(&start, &self.values.end))
        };
        *self.current.borrow_mut() = Some(start);
        *self.interpolator.borrow_mut() = interpolator;
    }

    /// Applies the value at eased `progress` through the setter.
    pub(crate) fn update(&self, progress: f64) {
        let value = match self.interpolator.borrow().as_ref() {
            Some(interpolator) => interpolator.at(progress),
            None => return,
        };
        *self.current.borrow_mut() = Some(value.clone());
        self.property.set(&self.name, &value);
    }

    /// The most recently applied value, or the value the tween will start from.
    pub(crate) fn get(&self) -> Value {
        if let Some(value) = self.current.borrow().as_ref() {
            return value.clone();
        }
        match &self.values.start {
            StartValue::Explicit(value) => value.clone(),
            StartValue::Live => self
                .property
                .get(&self.name)
                .unwrap_or_else(|| self.values.end.clone()),
        }
    }
}

/// Handle to a tween returned by the engine.
///
/// The handle does not keep the animation alive or control it; it can read the tween's current
/// value and attach further callbacks. A tween is stopped only by completing or by being
/// superseded by a newer tween of the same property.
#[derive(Clone)]
pub struct TweenHandle {
    tween: Rc<Tween>,
}

impl TweenHandle {
    pub(crate) fn new(tween: Rc<Tween>) -> Self {
        Self { tween }
    }

    /// Identifier of the tween.
    pub fn id(&self) -> TweenId {
        self.tween.id()
    }

    /// Name of the property being animated.
    pub fn name(&self) -> &str {
        self.tween.name()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.tween.status()
    }

    /// Current interpolated value.
    ///
    /// Before the tween starts, this is the value it will start from: the explicit start value if
    /// one was given, otherwise the property's live value (or the end value, if it has no getter).
    pub fn get(&self) -> Value {
        self.tween.get()
    }

    /// Appends a callback for `phase`.
    ///
    /// Callbacks for a phase that has already happened never run.
    pub fn on(&self, phase: Phase, callback: impl FnOnce() + 'static) -> &Self {
        self.tween.add_callback(phase, Box::new(callback));
        self
    }

    /// Appends a callback for [`Phase::Start`].
    pub fn on_start(&self, callback: impl FnOnce() + 'static) -> &Self {
        self.on(Phase::Start, callback)
    }

    /// Appends a callback for [`Phase::Cancel`].
    pub fn on_cancel(&self, callback: impl FnOnce() + 'static) -> &Self {
        self.on(Phase::Cancel, callback)
    }

    /// Appends a callback for [`Phase::Interrupt`].
    pub fn on_interrupt(&self, callback: impl FnOnce() + 'static) -> &Self {
        self.on(Phase::Interrupt, callback)
    }

    /// Appends a callback for [`Phase::End`].
    pub fn on_end(&self, callback: impl FnOnce() + 'static) -> &Self {
        self.on(Phase::End, callback)
    }
}

impl Debug for TweenHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TweenHandle")
            .field("id", &self.tween.id())
            .field("name", &self.tween.name())
            .field("status", &self.tween.status())
            .finish()
    }
}
