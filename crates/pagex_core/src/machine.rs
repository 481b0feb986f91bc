//! Page transition state machine
//!
//! Models a single active page transition as a finite state machine:
//!
//! ```text
//!                 ROUTE_CHANGE (new route, resolved)
//!   stationary ─────────────────────────────────────▶ transitioning.entering
//!        ▲                                                     │
//!        │ EXIT_COMPLETE                        ENTER_COMPLETE │
//!        │ (current = next, next = none)                       ▼
//!        └─────────────────────────────────────── transitioning.exiting
//! ```
//!
//! The machine is the only writer of [`TransitionContext`]; every change goes
//! through [`TransitionMachine::send`]. Readers only ever observe a fully
//! committed state.
//!
//! `MOUNT_FAILED` drops a page that could not be rendered from whichever slot
//! holds it, so a broken route never leaves the machine waiting on a
//! completion that cannot arrive.
//!
//! A `ROUTE_CHANGE` that arrives while transitioning is handled by the
//! configured [`InterruptPolicy`]: dropped (the default), or held as the single
//! latest pending navigation and replayed when the machine settles.

use std::fmt;

use crate::events::TransitionEvent;

/// Machine states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MachineState {
    /// A resident page (or nothing) is shown and no transition is running
    #[default]
    Stationary,
    /// The next page is mounted and playing its entrance
    Entering,
    /// The current page is playing its exit while the next page is fully shown
    Exiting,
}

impl MachineState {
    /// Dotted state name (`"transitioning.entering"`)
    pub fn name(&self) -> &'static str {
        match self {
            MachineState::Stationary => "stationary",
            MachineState::Entering => "transitioning.entering",
            MachineState::Exiting => "transitioning.exiting",
        }
    }

    /// Match against a state path; a parent path matches all of its children
    ///
    /// `"transitioning"` matches both transitioning substates.
    pub fn matches(&self, path: &str) -> bool {
        let name = self.name();
        name == path
            || (name.len() > path.len()
                && name.starts_with(path)
                && name.as_bytes()[path.len()] == b'.')
    }

    pub fn is_transitioning(&self) -> bool {
        !matches!(self, MachineState::Stationary)
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A page identity: its route plus its render target
#[derive(Clone, PartialEq, Eq)]
pub struct PageRef<C> {
    pub route: String,
    pub component: C,
}

impl<C> PageRef<C> {
    pub fn new(route: impl Into<String>, component: C) -> Self {
        Self {
            route: route.into(),
            component,
        }
    }
}

impl<C> fmt::Debug for PageRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRef").field("route", &self.route).finish()
    }
}

/// The pages the machine is tracking
///
/// `next` is only ever set while transitioning.
#[derive(Clone, PartialEq, Eq)]
pub struct TransitionContext<C> {
    pub current: Option<PageRef<C>>,
    pub next: Option<PageRef<C>>,
}

impl<C> Default for TransitionContext<C> {
    fn default() -> Self {
        Self {
            current: None,
            next: None,
        }
    }
}

impl<C> TransitionContext<C> {
    pub fn current_route(&self) -> Option<&str> {
        self.current.as_ref().map(|page| page.route.as_str())
    }

    pub fn next_route(&self) -> Option<&str> {
        self.next.as_ref().map(|page| page.route.as_str())
    }
}

impl<C> fmt::Debug for TransitionContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionContext")
            .field("current", &self.current_route())
            .field("next", &self.next_route())
            .finish()
    }
}

/// What to do with a route change that arrives mid-transition
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum InterruptPolicy {
    /// Drop it
    #[default]
    Ignore,
    /// Keep only the newest one and start it once the machine is stationary
    QueueLatest,
}

/// How an event was handled
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// State and/or context changed
    Changed,
    /// The event was held for replay
    Queued,
    /// Nothing changed
    Ignored,
}

/// Result of a single [`TransitionMachine::send`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: MachineState,
    pub to: MachineState,
    pub outcome: Outcome,
    /// A queued route change was started as part of this transition
    pub replayed: bool,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.outcome == Outcome::Changed
    }
}

/// The page transition state machine
pub struct TransitionMachine<C> {
    state: MachineState,
    context: TransitionContext<C>,
    policy: InterruptPolicy,
    pending: Option<PageRef<C>>,
}

impl<C> Default for TransitionMachine<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> TransitionMachine<C> {
    /// A stationary machine with no resident page
    pub fn new() -> Self {
        Self {
            state: MachineState::Stationary,
            context: TransitionContext::default(),
            policy: InterruptPolicy::Ignore,
            pending: None,
        }
    }

    /// A stationary machine with `page` already resident
    pub fn with_resident(page: PageRef<C>) -> Self {
        Self {
            context: TransitionContext {
                current: Some(page),
                next: None,
            },
            ..Self::new()
        }
    }

    pub fn with_interrupt_policy(mut self, policy: InterruptPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn context(&self) -> &TransitionContext<C> {
        &self.context
    }

    pub fn interrupt_policy(&self) -> InterruptPolicy {
        self.policy
    }

    /// The route change held under [`InterruptPolicy::QueueLatest`], if any
    pub fn pending(&self) -> Option<&PageRef<C>> {
        self.pending.as_ref()
    }

    /// Dispatch an event
    ///
    /// This is the only mutator of state and context.
    pub fn send(&mut self, event: TransitionEvent<C>) -> Transition {
        let from = self.state;
        let name = event.name();
        let mut replayed = false;

        let outcome = match (self.state, event) {
            (
                MachineState::Stationary,
                TransitionEvent::RouteChange {
                    route: Some(route),
                    component: Some(component),
                },
            ) => self.begin(PageRef { route, component }),

            // Navigation start: the destination is not resolved yet
            (MachineState::Stationary, TransitionEvent::RouteChange { .. }) => Outcome::Ignored,

            (MachineState::Entering, TransitionEvent::EnterComplete) => {
                self.state = MachineState::Exiting;
                Outcome::Changed
            }

            (MachineState::Exiting, TransitionEvent::ExitComplete) => {
                self.context.current = self.context.next.take();
                self.state = MachineState::Stationary;

                if let Some(page) = self.pending.take() {
                    replayed = self.begin(page) == Outcome::Changed;
                }
                Outcome::Changed
            }

            (_, TransitionEvent::MountFailed(route)) => {
                let outcome = self.abandon(&route);
                if outcome == Outcome::Changed && self.state == MachineState::Stationary {
                    if let Some(page) = self.pending.take() {
                        replayed = self.begin(page) == Outcome::Changed;
                    }
                }
                outcome
            }

            (
                _,
                TransitionEvent::RouteChange {
                    route: Some(route),
                    component: Some(component),
                },
            ) if self.policy == InterruptPolicy::QueueLatest => {
                tracing::debug!("queueing {} to {} until settled", name, route);
                self.pending = Some(PageRef { route, component });
                Outcome::Queued
            }

            (state, _) => {
                tracing::debug!("{} ignored in {}", name, state);
                Outcome::Ignored
            }
        };

        if outcome == Outcome::Changed {
            tracing::debug!(
                "{}: {} -> {} (current={:?}, next={:?})",
                name,
                from,
                self.state,
                self.context.current_route(),
                self.context.next_route()
            );
        }

        Transition {
            from,
            to: self.state,
            outcome,
            replayed,
        }
    }

    fn begin(&mut self, page: PageRef<C>) -> Outcome {
        if self.context.current_route() == Some(page.route.as_str()) {
            tracing::trace!("route {} already resident", page.route);
            return Outcome::Ignored;
        }
        self.context.next = Some(page);
        self.state = MachineState::Entering;
        Outcome::Changed
    }

    /// Drop the page for `route` and return to a state that needs nothing from it
    fn abandon(&mut self, route: &str) -> Outcome {
        let holds = |page: &Option<PageRef<C>>| {
            page.as_ref().is_some_and(|page| page.route == route)
        };

        match self.state {
            MachineState::Entering | MachineState::Exiting if holds(&self.context.next) => {
                // An exit already under way can't be undone
                if self.state == MachineState::Exiting {
                    self.context.current = None;
                }
                self.context.next = None;
                self.state = MachineState::Stationary;
            }
            MachineState::Exiting if holds(&self.context.current) => {
                self.context.current = self.context.next.take();
                self.state = MachineState::Stationary;
            }
            _ if holds(&self.context.current) => {
                self.context.current = None;
            }
            _ => return Outcome::Ignored,
        }
        tracing::warn!("dropped page {} after a failed mount", route);
        Outcome::Changed
    }
}

impl<C> fmt::Debug for TransitionMachine<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionMachine")
            .field("state", &self.state)
            .field("context", &self.context)
            .field("pending", &self.pending.as_ref().map(|page| &page.route))
            .finish()
    }
}
