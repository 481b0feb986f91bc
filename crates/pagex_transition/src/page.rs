//! Page lifecycle
//!
//! Every mounted page owns a [`PageLifecycle`]. On mount it starts an
//! entrance clock; when the page is no longer the resident page it starts an
//! exit clock. Both clocks publish progress through observables and report
//! completion to the host through a [`SignalQueue`].
//!
//! Page content reaches its progress through a [`PageScope`]. A scope stays
//! valid only while its page is mounted; using it afterwards is a
//! [`TransitionError::OutsidePage`] error.

use pagex_animation::{FrameControl, FrameSubscription, KeyframeCache, SchedulerHandle, SpringConfigs};
use pagex_core::{Observable, Result, TransitionError};
use slotmap::new_key_type;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::clock::ProgressClock;

new_key_type! {
    /// Identifier for a mounted page
    pub struct PageId;
}

/// Which clock a progress value belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Enter,
    Exit,
}

/// How the host is currently rendering a page
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageRole {
    /// Running its entrance
    Entering,
    /// Fully shown
    Resident,
    /// Outgoing page kept on screen, motionless, while the next one enters
    Held,
    /// Running its exit
    Exiting,
}

impl PageRole {
    pub fn name(&self) -> &'static str {
        match self {
            PageRole::Entering => "entering",
            PageRole::Resident => "resident",
            PageRole::Held => "held",
            PageRole::Exiting => "exiting",
        }
    }
}

impl fmt::Display for PageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle notifications posted to the host
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSignal {
    /// The page's entrance clock reached 1
    EnterComplete(PageId),
    /// The page's exit clock reached 1; its resources may be torn down
    ExitComplete(PageId),
}

/// Shared mailbox of [`PageSignal`]s, drained by the host once per frame
#[derive(Clone, Default)]
pub struct SignalQueue {
    signals: Rc<RefCell<VecDeque<PageSignal>>>,
}

impl SignalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, signal: PageSignal) {
        self.signals.borrow_mut().push_back(signal);
    }

    pub fn pop(&self) -> Option<PageSignal> {
        self.signals.borrow_mut().pop_front()
    }

    pub fn len(&self) -> usize {
        self.signals.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.borrow().is_empty()
    }
}

/// Durations of a page's two clocks
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageDurations {
    pub enter_ms: f64,
    pub exit_ms: f64,
}

impl Default for PageDurations {
    fn default() -> Self {
        Self {
            enter_ms: 700.0,
            exit_ms: 700.0,
        }
    }
}

/// Services shared by every page and item under one host
pub struct PageEnvironment {
    pub scheduler: SchedulerHandle,
    pub cache: RefCell<KeyframeCache>,
    /// Spring retarget throttle window
    pub throttle_ms: f64,
    /// Base spring table; items layer their own overrides on top
    pub springs: SpringConfigs,
}

impl PageEnvironment {
    pub fn new(scheduler: SchedulerHandle) -> Self {
        Self {
            scheduler,
            cache: RefCell::new(KeyframeCache::default()),
            throttle_ms: 90.0,
            springs: SpringConfigs::default(),
        }
    }

    pub fn with_throttle_ms(mut self, throttle_ms: f64) -> Self {
        self.throttle_ms = throttle_ms;
        self
    }

    pub fn with_springs(mut self, springs: SpringConfigs) -> Self {
        self.springs = springs;
        self
    }
}

/// Capability handed to page content: the page's progress and services
#[derive(Clone)]
pub struct PageScope {
    id: PageId,
    route: Rc<str>,
    enter: Observable<f32>,
    exit: Observable<Option<f32>>,
    environment: Rc<PageEnvironment>,
    alive: Weak<()>,
}

impl PageScope {
    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    /// True while the page is mounted
    pub fn is_active(&self) -> bool {
        self.alive.strong_count() > 0
    }

    /// Fails with [`TransitionError::OutsidePage`] once the page is gone
    pub fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(TransitionError::OutsidePage)
        }
    }

    /// Entrance progress, 0 to 1
    pub fn enter_progress(&self) -> Result<Observable<f32>> {
        self.ensure_active()?;
        Ok(self.enter.clone())
    }

    /// Exit progress; `None` until the page starts exiting
    pub fn exit_progress(&self) -> Result<Observable<Option<f32>>> {
        self.ensure_active()?;
        Ok(self.exit.clone())
    }

    pub fn environment(&self) -> Result<Rc<PageEnvironment>> {
        self.ensure_active()?;
        Ok(Rc::clone(&self.environment))
    }
}

impl fmt::Debug for PageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageScope")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Clocks and progress for one mounted page
///
/// Dropping the lifecycle tears the page down: its clocks stop and its
/// scopes become inactive.
pub struct PageLifecycle {
    id: PageId,
    route: Rc<str>,
    durations: PageDurations,
    enter: Observable<f32>,
    exit: Observable<Option<f32>>,
    environment: Rc<PageEnvironment>,
    signals: SignalQueue,
    enter_clock: Option<FrameSubscription>,
    exit_clock: Option<FrameSubscription>,
    exiting: bool,
    alive: Rc<()>,
}

impl PageLifecycle {
    /// Mount a page and start its entrance clock
    pub fn mount(
        id: PageId,
        route: &str,
        durations: PageDurations,
        environment: Rc<PageEnvironment>,
        signals: SignalQueue,
    ) -> Self {
        let mut page = Self::new(id, route, durations, environment, signals, 0.0);
        page.enter_clock = page.start_clock(Phase::Enter);
        tracing::debug!("page {} mounted, entering over {}ms", route, durations.enter_ms);
        page
    }

    /// Mount a page that is already fully entered
    pub fn mount_entered(
        id: PageId,
        route: &str,
        durations: PageDurations,
        environment: Rc<PageEnvironment>,
        signals: SignalQueue,
    ) -> Self {
        tracing::debug!("page {} mounted entered", route);
        Self::new(id, route, durations, environment, signals, 1.0)
    }

    fn new(
        id: PageId,
        route: &str,
        durations: PageDurations,
        environment: Rc<PageEnvironment>,
        signals: SignalQueue,
        enter_progress: f32,
    ) -> Self {
        Self {
            id,
            route: Rc::from(route),
            durations,
            enter: Observable::new(enter_progress),
            exit: Observable::new(None),
            environment,
            signals,
            enter_clock: None,
            exit_clock: None,
            exiting: false,
            alive: Rc::new(()),
        }
    }

    pub fn id(&self) -> PageId {
        self.id
    }

    pub fn route(&self) -> &str {
        &self.route
    }

    pub fn durations(&self) -> PageDurations {
        self.durations
    }

    pub fn scope(&self) -> PageScope {
        PageScope {
            id: self.id,
            route: Rc::clone(&self.route),
            enter: self.enter.clone(),
            exit: self.exit.clone(),
            environment: Rc::clone(&self.environment),
            alive: Rc::downgrade(&self.alive),
        }
    }

    pub fn enter_progress(&self) -> f32 {
        self.enter.get()
    }

    pub fn exit_progress(&self) -> Option<f32> {
        self.exit.get()
    }

    pub fn is_entered(&self) -> bool {
        self.enter.get() >= 1.0
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    pub fn is_exited(&self) -> bool {
        self.exit.get().is_some_and(|progress| progress >= 1.0)
    }

    /// The page is no longer the resident page: start the exit clock
    ///
    /// An unfinished entrance freezes where it is. Returns false if the page
    /// was already exiting.
    pub fn begin_exit(&mut self) -> bool {
        if self.exiting {
            return false;
        }
        self.exiting = true;
        if self.enter_clock.take().is_some() && !self.is_entered() {
            tracing::debug!(
                "page {} removed mid-entrance at {:.3}",
                self.route,
                self.enter.get()
            );
        }
        self.exit.set(Some(0.0));
        self.exit_clock = self.start_clock(Phase::Exit);
        tracing::debug!("page {} exiting over {}ms", self.route, self.durations.exit_ms);
        true
    }

    fn start_clock(&self, phase: Phase) -> Option<FrameSubscription> {
        let duration = match phase {
            Phase::Enter => self.durations.enter_ms,
            Phase::Exit => self.durations.exit_ms,
        };
        let mut clock = ProgressClock::new(duration);
        let id = self.id;
        let route = Rc::clone(&self.route);
        let enter = self.enter.clone();
        let exit = self.exit.clone();
        let signals = self.signals.clone();

        let subscription = self.environment.scheduler.subscribe(move |frame| {
            let Some(sample) = clock.tick(frame.now_ms) else {
                return FrameControl::Stop;
            };
            match phase {
                Phase::Enter => {
                    enter.set_if_changed(sample.progress);
                }
                Phase::Exit => {
                    exit.set_if_changed(Some(sample.progress));
                }
            }
            if !sample.completed {
                return FrameControl::Continue;
            }

            match phase {
                Phase::Enter => {
                    tracing::debug!("page {} entered", route);
                    signals.post(PageSignal::EnterComplete(id));
                }
                Phase::Exit => {
                    tracing::debug!("page {} exited", route);
                    signals.post(PageSignal::ExitComplete(id));
                }
            }
            FrameControl::Stop
        });

        if subscription.is_none() {
            tracing::warn!("scheduler gone, page {} clock not started", self.route);
        }
        subscription
    }
}

impl Drop for PageLifecycle {
    fn drop(&mut self) {
        tracing::trace!("page {} torn down", self.route);
    }
}

impl fmt::Debug for PageLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageLifecycle")
            .field("id", &self.id)
            .field("route", &self.route)
            .field("enter", &self.enter.get())
            .field("exit", &self.exit.get())
            .finish()
    }
}
