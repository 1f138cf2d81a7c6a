//! The clock and callback queue that drive tweens.
//!
//! The engine never reads a clock or sleeps on its own. Everything it does happens inside
//! callbacks registered with a [`TimerSource`], which the host advances from its frame loop. The
//! bundled implementation is [`FrameTimer`].

use slotmap::{new_key_type, SlotMap};
use std::cell::RefCell;
use std::time::Instant;
use tracing::{trace, warn};

new_key_type! {
    /// Handle to a timer registered with a [`TimerSource`].
    pub struct TimerId;
}

/// Callback of a repeating timer; receives the time elapsed since the timer became due.
pub type TimerCallback = Box<dyn FnMut(f64)>;

/// Callback run once at the next scheduling opportunity.
pub type DeferredCallback = Box<dyn FnOnce()>;

/// Host capability that schedules engine callbacks.
///
/// All times are in the host's unit (normally milliseconds) on a monotonic scale with an arbitrary
/// origin.
pub trait TimerSource {
    /// Current time.
    fn now(&self) -> f64;

    /// Registers a callback that runs on every scheduling pass at or after `origin + delay`, with
    /// the time elapsed since `origin + delay`, until the timer is stopped.
    fn repeat(&self, callback: TimerCallback, delay: f64, origin: f64) -> TimerId;

    /// Replaces the callback and due time of an existing timer.
    ///
    /// May be called from within the timer's own callback, in which case the new callback takes
    /// effect from the next pass.
    fn restart(&self, id: TimerId, callback: TimerCallback, delay: f64, origin: f64);

    /// Stops a timer. Stopping a timer that is already stopped has no effect.
    fn stop(&self, id: TimerId);

    /// Runs `callback` once at the next scheduling opportunity, never synchronously.
    fn defer_once(&self, callback: DeferredCallback);
}

enum Task {
    Repeat(TimerCallback),
    Once(DeferredCallback),
}

struct TimerSlot {
    due: f64,
    /// Taken out while the task runs, so that the task can restart or stop its own timer.
    task: Option<Task>,
}

#[derive(Default)]
struct TimerQueue {
    slots: SlotMap<TimerId, TimerSlot>,
    order: Vec<TimerId>,
    clock: f64,
    flushing: bool,
    /// Whether the last pass was driven by the wall clock, which then keeps moving between passes.
    wall_clock: bool,
}

impl TimerQueue {
    fn push(&mut self, task: Task, due: f64) -> TimerId {
        let id = self.slots.insert(TimerSlot {
            due,
            task: Some(task),
        });
        self.order.push(id);
        id
    }

    fn take_due(&mut self, id: TimerId) -> Option<(Task, f64)> {
        let clock = self.clock;
        let slot = self.slots.get_mut(id)?;
        if slot.due > clock {
            return None;
        }
        let elapsed = clock - slot.due;
        slot.task.take().map(|task| (task, elapsed))
    }
}

/// A [`TimerSource`] driven explicitly by the host, typically once per rendered frame.
///
/// Each call to [`flush_at`](Self::flush_at) (or [`advance`](Self::advance) /
/// [`flush_now`](Self::flush_now)) is one scheduling pass. A pass freezes the clock and walks the
/// timer queue in registration order, running every timer that is due. Timers and deferred
/// callbacks registered during the pass are appended to the queue and run in the same pass if they
/// are already due; this is what "the next scheduling opportunity" means while a pass is running.
/// Outside a pass, the next opportunity is the next call to `flush_at`.
///
/// Because callbacks run with no internal borrow held, they are free to register, restart and stop
/// timers. They may not start a nested pass; such a request is ignored.
pub struct FrameTimer {
    queue: RefCell<TimerQueue>,
    epoch: Instant,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Creates a timer whose clock reads `0.0` until the first pass.
    pub fn new() -> Self {
        Self {
            queue: RefCell::default(),
            epoch: Instant::now(),
        }
    }

    /// Runs one scheduling pass with the clock set to `now`.
    ///
    /// The clock never moves backward; an earlier `now` runs the pass at the current time.
    ///
    /// A panic in any callback propagates to the caller. The pass is abandoned at that point, and
    /// the timer whose callback panicked is left without a callback unless it had already been
    /// restarted.
    pub fn flush_at(&self, now: f64) {
        self.flush(now, false);
    }

    fn flush(&self, now: f64, wall_clock: bool) {
        {
            let mut queue = self.queue.borrow_mut();
            if queue.flushing {
                warn!(now, "Ignoring nested timer flush.");
                return;
            }
            queue.flushing = true;
            queue.wall_clock = wall_clock;
            queue.clock = queue.clock.max(now);
        }
        let _guard = FlushGuard(&self.queue);
        let mut index = 0;
        loop {
            let next = {
                let mut queue = self.queue.borrow_mut();
                let Some(&id) = queue.order.get(index) else {
                    break;
                };
                queue.take_due(id).map(|due| (id, due))
            };
            index += 1;
            let Some((id, (task, elapsed))) = next else {
                continue;
            };
            match task {
                Task::Once(callback) => {
                    self.queue.borrow_mut().slots.remove(id);
                    callback();
                }
                Task::Repeat(mut callback) => {
                    callback(elapsed);
                    let mut queue = self.queue.borrow_mut();
                    if let Some(slot) = queue.slots.get_mut(id) {
                        if slot.task.is_none() {
                            slot.task = Some(Task::Repeat(callback));
                        }
                    }
                }
            }
        }
    }

    /// Runs one scheduling pass `delta` after the current clock time.
    pub fn advance(&self, delta: f64) {
        let now = self.now() + delta;
        self.flush_at(now);
    }

    /// Runs one scheduling pass at the wall-clock time, in milliseconds since this timer was
    /// created.
    ///
    /// Until the next [`flush_at`](Self::flush_at), [`now`](TimerSource::now) keeps following the
    /// wall clock between passes.
    pub fn flush_now(&self) {
        self.flush(self.wall_time(), true);
    }

    fn wall_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Number of timers and deferred callbacks still registered.
    pub fn pending(&self) -> usize {
        self.queue.borrow().slots.len()
    }
}

/// Ends a pass even if a callback unwinds out of it.
struct FlushGuard<'a>(&'a RefCell<TimerQueue>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        let mut queue = self.0.borrow_mut();
        let TimerQueue { slots, order, .. } = &mut *queue;
        order.retain(|id| slots.contains_key(*id));
        queue.flushing = false;
    }
}

impl TimerSource for FrameTimer {
    fn now(&self) -> f64 {
        let queue = self.queue.borrow();
        if queue.wall_clock && !queue.flushing {
            queue.clock.max(self.wall_time())
        } else {
            queue.clock
        }
    }

    fn repeat(&self, callback: TimerCallback, delay: f64, origin: f64) -> TimerId {
        self.queue
            .borrow_mut()
            .push(Task::Repeat(callback), origin + delay)
    }

    fn restart(&self, id: TimerId, callback: TimerCallback, delay: f64, origin: f64) {
        let mut queue = self.queue.borrow_mut();
        match queue.slots.get_mut(id) {
            Some(slot) => {
                slot.due = origin + delay;
                slot.task = Some(Task::Repeat(callback));
            }
            None => trace!(?id, "Ignoring restart of stopped timer."),
        }
    }

    fn stop(&self, id: TimerId) {
        self.queue.borrow_mut().slots.remove(id);
    }

    fn defer_once(&self, callback: DeferredCallback) {
        let mut queue = self.queue.borrow_mut();
        let now = queue.clock;
        queue.push(Task::Once(callback), now);
    }
}
