//! Frame scheduler
//!
//! A single-threaded tick source. Progress clocks and spring followers
//! subscribe per-frame callbacks; the host loop calls [`FrameScheduler::tick`]
//! once per animation frame (or [`FrameScheduler::tick_at`] with an explicit
//! timestamp). Time is read from a [`TimeSource`], so tests can swap the
//! wall clock for a [`ManualClock`].
//!
//! Callbacks run in subscription order. The callback list is snapshotted at
//! the start of each frame: callbacks subscribed during a frame first run on
//! the next one, and callbacks unsubscribed during a frame do not run again.

use slotmap::{new_key_type, SlotMap};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Instant;

new_key_type! {
    /// Handle to a registered frame callback
    pub struct FrameCallbackId;
}

/// Returned by frame callbacks to stay subscribed or drop out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}

/// Timing for one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInfo {
    /// Timestamp of this frame, milliseconds
    pub now_ms: f64,
    /// Time since the previous frame (0 on the first frame)
    pub dt_ms: f64,
    /// Frame counter, starting at 1
    pub frame: u64,
}

impl FrameInfo {
    pub fn dt_secs(&self) -> f32 {
        (self.dt_ms / 1000.0) as f32
    }
}

// ============================================================================
// Time sources
// ============================================================================

/// Monotonic millisecond clock
pub trait TimeSource {
    fn now_ms(&self) -> f64;
}

/// Wall clock, measured from construction
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Deterministic clock advanced by hand
///
/// Clones share the same time, so a test can keep one clone and hand the
/// other to a scheduler.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, dt_ms: f64) {
        self.now.set(self.now.get() + dt_ms);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

// ============================================================================
// Scheduler
// ============================================================================

type FrameCallback = Rc<RefCell<dyn FnMut(&FrameInfo) -> FrameControl>>;

struct CallbackEntry {
    order: u64,
    callback: FrameCallback,
}

struct SchedulerInner {
    callbacks: SlotMap<FrameCallbackId, CallbackEntry>,
    time: Box<dyn TimeSource>,
    last_frame: Option<f64>,
    frame: u64,
    next_order: u64,
}

impl SchedulerInner {
    fn insert(&mut self, callback: FrameCallback) -> FrameCallbackId {
        let order = self.next_order;
        self.next_order += 1;
        self.callbacks.insert(CallbackEntry { order, callback })
    }
}

/// Owner of the frame callback registry
///
/// Components receive a [`SchedulerHandle`]; the scheduler itself stays with
/// the host loop.
pub struct FrameScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl FrameScheduler {
    /// Scheduler reading the wall clock
    pub fn new() -> Self {
        Self::with_time_source(SystemClock::new())
    }

    pub fn with_time_source(time: impl TimeSource + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                callbacks: SlotMap::with_key(),
                time: Box::new(time),
                last_frame: None,
                frame: 0,
                next_order: 0,
            })),
        }
    }

    /// Get a handle to this scheduler for passing to components
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.inner.borrow().time.now_ms()
    }

    /// Run one frame at the time source's current time
    ///
    /// Returns true if any callbacks remain subscribed.
    pub fn tick(&self) -> bool {
        let now = self.now_ms();
        self.tick_at(now)
    }

    /// Run one frame at `now_ms`
    pub fn tick_at(&self, now_ms: f64) -> bool {
        let (info, snapshot) = {
            let mut inner = self.inner.borrow_mut();
            let dt_ms = inner
                .last_frame
                .map(|last| (now_ms - last).max(0.0))
                .unwrap_or(0.0);
            inner.last_frame = Some(now_ms);
            inner.frame += 1;

            let mut snapshot: Vec<(u64, FrameCallbackId, FrameCallback)> = inner
                .callbacks
                .iter()
                .map(|(id, entry)| (entry.order, id, Rc::clone(&entry.callback)))
                .collect();
            snapshot.sort_unstable_by_key(|(order, _, _)| *order);

            let info = FrameInfo {
                now_ms,
                dt_ms,
                frame: inner.frame,
            };
            (info, snapshot)
        };

        for (_, id, callback) in snapshot {
            if !self.inner.borrow().callbacks.contains_key(id) {
                continue;
            }
            let control = match callback.try_borrow_mut() {
                Ok(mut f) => (&mut *f)(&info),
                Err(_) => {
                    tracing::warn!("frame callback re-entered during tick, skipping");
                    FrameControl::Continue
                }
            };
            if control == FrameControl::Stop {
                self.inner.borrow_mut().callbacks.remove(id);
            }
        }

        !self.inner.borrow().callbacks.is_empty()
    }

    /// Number of subscribed frame callbacks
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().callbacks.len()
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Frames run so far
    pub fn frame_count(&self) -> u64 {
        self.inner.borrow().frame
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// A weak handle to the frame scheduler
///
/// Passed to components that need frame callbacks. It won't keep the
/// scheduler alive; once the scheduler is dropped, operations no-op.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Weak<RefCell<SchedulerInner>>,
}

impl SchedulerHandle {
    /// Register a per-frame callback
    ///
    /// Returns `None` if the scheduler has been dropped.
    pub fn subscribe<F>(&self, callback: F) -> Option<FrameSubscription>
    where
        F: FnMut(&FrameInfo) -> FrameControl + 'static,
    {
        let inner = self.inner.upgrade()?;
        let id = inner.borrow_mut().insert(Rc::new(RefCell::new(callback)));
        Some(FrameSubscription {
            inner: self.inner.clone(),
            id: Some(id),
        })
    }

    /// Current time of the scheduler's time source
    pub fn now_ms(&self) -> Option<f64> {
        self.inner.upgrade().map(|inner| inner.borrow().time.now_ms())
    }

    /// Timestamp of the frame in progress (or the last one)
    ///
    /// Falls back to the time source before the first frame.
    pub fn frame_time_ms(&self) -> Option<f64> {
        self.inner.upgrade().map(|inner| {
            let inner = inner.borrow();
            inner.last_frame.unwrap_or_else(|| inner.time.now_ms())
        })
    }

    /// Check if the scheduler is still alive
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Keeps a frame callback registered; dropping it unsubscribes
#[must_use = "dropping a FrameSubscription unsubscribes its callback"]
pub struct FrameSubscription {
    inner: Weak<RefCell<SchedulerInner>>,
    id: Option<FrameCallbackId>,
}

impl FrameSubscription {
    /// True while the callback is still registered
    pub fn is_active(&self) -> bool {
        match (self.id, self.inner.upgrade()) {
            (Some(id), Some(inner)) => inner.borrow().callbacks.contains_key(id),
            _ => false,
        }
    }

    /// Unsubscribe now
    pub fn cancel(mut self) {
        self.remove();
    }

    /// Leave the callback registered until it returns [`FrameControl::Stop`]
    pub fn detach(mut self) {
        self.id = None;
    }

    fn remove(&mut self) {
        if let (Some(id), Some(inner)) = (self.id.take(), self.inner.upgrade()) {
            inner.borrow_mut().callbacks.remove(id);
        }
    }
}

impl Drop for FrameSubscription {
    fn drop(&mut self) {
        self.remove();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_tick() {
        let clock = ManualClock::new();
        let scheduler = FrameScheduler::with_time_source(clock.clone());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let log = seen.clone();
        let _sub = scheduler.handle().subscribe(move |info| {
            log.borrow_mut().push((info.frame, info.now_ms, info.dt_ms));
            FrameControl::Continue
        });

        assert!(scheduler.tick());
        clock.advance(16.0);
        assert!(scheduler.tick());
        clock.advance(20.0);
        scheduler.tick();

        assert_eq!(
            *seen.borrow(),
            vec![(1, 0.0, 0.0), (2, 16.0, 16.0), (3, 36.0, 20.0)]
        );
    }

    #[test]
    fn test_callbacks_run_in_subscription_order() {
        let scheduler = FrameScheduler::with_time_source(ManualClock::new());
        let handle = scheduler.handle();
        let order = Rc::new(RefCell::new(Vec::new()));

        let mut subs = Vec::new();
        for name in ["a", "b", "c"] {
            let order = order.clone();
            subs.push(handle.subscribe(move |_| {
                order.borrow_mut().push(name);
                FrameControl::Continue
            }));
        }
        // Free a slot and fill it again; the newcomer still runs last
        subs.remove(0);
        let log = order.clone();
        subs.push(handle.subscribe(move |_| {
            log.borrow_mut().push("d");
            FrameControl::Continue
        }));

        scheduler.tick_at(0.0);
        assert_eq!(*order.borrow(), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_stop_unsubscribes() {
        let scheduler = FrameScheduler::with_time_source(ManualClock::new());
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let sub = scheduler.handle().subscribe(move |_| {
            counter.set(counter.get() + 1);
            if counter.get() == 2 {
                FrameControl::Stop
            } else {
                FrameControl::Continue
            }
        });

        assert!(scheduler.tick_at(0.0));
        assert!(!scheduler.tick_at(16.0));
        scheduler.tick_at(32.0);
        assert_eq!(count.get(), 2);
        assert!(!sub.as_ref().is_some_and(|sub| sub.is_active()));
    }

    #[test]
    fn test_drop_subscription_unsubscribes() {
        let scheduler = FrameScheduler::with_time_source(ManualClock::new());
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let sub = scheduler.handle().subscribe(move |_| {
            counter.set(counter.get() + 1);
            FrameControl::Continue
        });
        scheduler.tick_at(0.0);
        drop(sub);
        scheduler.tick_at(16.0);
        assert_eq!(count.get(), 1);
        assert_eq!(scheduler.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribe_during_tick_runs_next_frame() {
        let scheduler = FrameScheduler::with_time_source(ManualClock::new());
        let handle = scheduler.handle();
        let inner_runs = Rc::new(Cell::new(0));
        let late: Rc<RefCell<Option<FrameSubscription>>> = Rc::new(RefCell::new(None));

        let (h, runs, slot) = (handle.clone(), inner_runs.clone(), late.clone());
        let _outer = handle.subscribe(move |_| {
            if slot.borrow().is_none() {
                let runs = runs.clone();
                *slot.borrow_mut() = h.subscribe(move |_| {
                    runs.set(runs.get() + 1);
                    FrameControl::Continue
                });
            }
            FrameControl::Continue
        });

        scheduler.tick_at(0.0);
        assert_eq!(inner_runs.get(), 0);
        scheduler.tick_at(16.0);
        assert_eq!(inner_runs.get(), 1);
    }

    #[test]
    fn test_unsubscribe_during_tick_skips_callback() {
        let scheduler = FrameScheduler::with_time_source(ManualClock::new());
        let handle = scheduler.handle();
        let victim_runs = Rc::new(Cell::new(0));
        let victim: Rc<RefCell<Option<FrameSubscription>>> = Rc::new(RefCell::new(None));

        let slot = victim.clone();
        let _killer = handle.subscribe(move |_| {
            slot.borrow_mut().take();
            FrameControl::Continue
        });
        let runs = victim_runs.clone();
        *victim.borrow_mut() = handle.subscribe(move |_| {
            runs.set(runs.get() + 1);
            FrameControl::Continue
        });

        scheduler.tick_at(0.0);
        assert_eq!(victim_runs.get(), 0);
    }

    #[test]
    fn test_handle_weak_reference() {
        let handle = {
            let scheduler = FrameScheduler::new();
            scheduler.handle()
        };

        // Scheduler is dropped, handle should not be alive
        assert!(!handle.is_alive());
        assert!(handle.now_ms().is_none());

        // Operations should safely no-op
        assert!(handle.subscribe(|_| FrameControl::Continue).is_none());
    }

    #[test]
    fn test_frame_time_tracks_tick() {
        let clock = ManualClock::new();
        clock.set(5.0);
        let scheduler = FrameScheduler::with_time_source(clock.clone());
        let handle = scheduler.handle();
        assert_eq!(handle.frame_time_ms(), Some(5.0));

        scheduler.tick_at(40.0);
        clock.set(90.0);
        assert_eq!(handle.frame_time_ms(), Some(40.0));
        assert_eq!(handle.now_ms(), Some(90.0));
    }

    #[test]
    fn test_detach_keeps_callback() {
        let scheduler = FrameScheduler::with_time_source(ManualClock::new());
        if let Some(sub) = scheduler.handle().subscribe(|_| FrameControl::Continue) {
            sub.detach();
        }
        assert_eq!(scheduler.subscriber_count(), 1);
    }

    #[test]
    fn test_dt_never_negative() {
        let scheduler = FrameScheduler::with_time_source(ManualClock::new());
        let dts = Rc::new(RefCell::new(Vec::new()));
        let log = dts.clone();
        let _sub = scheduler.handle().subscribe(move |info| {
            log.borrow_mut().push(info.dt_ms);
            FrameControl::Continue
        });
        scheduler.tick_at(100.0);
        scheduler.tick_at(50.0);
        assert_eq!(*dts.borrow(), vec![0.0, 0.0]);
    }
}
