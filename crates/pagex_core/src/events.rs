//! Navigation and transition events
//!
//! [`NavigationEvent`] is what the host router emits. [`TransitionEvent`] is
//! what the transition machine consumes.

use std::fmt;

/// Events emitted by the external router
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Navigation to `path` has started; the destination is not resolved yet
    Start(String),
    /// Navigation to `path` has committed
    Complete(String),
    /// Navigation to `path` failed
    Error(String),
}

impl NavigationEvent {
    pub fn path(&self) -> &str {
        match self {
            NavigationEvent::Start(path)
            | NavigationEvent::Complete(path)
            | NavigationEvent::Error(path) => path,
        }
    }
}

/// Events accepted by [`TransitionMachine::send`](crate::machine::TransitionMachine::send)
#[derive(Clone, PartialEq, Eq)]
pub enum TransitionEvent<C> {
    /// The router resolved (or began resolving) a route
    ///
    /// `component` is `None` when emitted at navigation start, before the
    /// destination's render target is known.
    RouteChange {
        route: Option<String>,
        component: Option<C>,
    },
    /// The entering page's entrance clock reached 1
    EnterComplete,
    /// The exiting page's exit clock reached 1 and its element may be discarded
    ExitComplete,
    /// The page for this route could not be rendered and must be dropped
    MountFailed(String),
}

impl<C> TransitionEvent<C> {
    /// Convenience constructor for a resolved route change
    pub fn route_change(route: impl Into<String>, component: C) -> Self {
        TransitionEvent::RouteChange {
            route: Some(route.into()),
            component: Some(component),
        }
    }

    /// Event name as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            TransitionEvent::RouteChange { .. } => "ROUTE_CHANGE",
            TransitionEvent::EnterComplete => "ENTER_COMPLETE",
            TransitionEvent::ExitComplete => "EXIT_COMPLETE",
            TransitionEvent::MountFailed(_) => "MOUNT_FAILED",
        }
    }
}

impl<C> fmt::Debug for TransitionEvent<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionEvent::RouteChange { route, component } => f
                .debug_struct("RouteChange")
                .field("route", route)
                .field("resolved", &component.is_some())
                .finish(),
            TransitionEvent::EnterComplete => f.write_str("EnterComplete"),
            TransitionEvent::ExitComplete => f.write_str("ExitComplete"),
            TransitionEvent::MountFailed(route) => {
                f.debug_tuple("MountFailed").field(route).finish()
            }
        }
    }
}
