//! pagex Core
//!
//! This crate provides the foundational primitives for pagex page transitions:
//!
//! - **Routes**: Declarative route registration with most-specific matching
//! - **Events**: Navigation events from the router, transition events for the machine
//! - **Observables**: Single-threaded values with change subscribers
//! - **State Machine**: The `stationary` / `transitioning.*` page transition machine
//!
//! # Example
//!
//! ```rust
//! use pagex_core::{MachineState, TransitionEvent, TransitionMachine};
//!
//! let mut machine = TransitionMachine::new();
//! machine.send(TransitionEvent::route_change("/about", "about-page"));
//! assert_eq!(machine.state(), MachineState::Entering);
//!
//! machine.send(TransitionEvent::EnterComplete);
//! machine.send(TransitionEvent::ExitComplete);
//! assert_eq!(machine.context().current_route(), Some("/about"));
//! ```

pub mod error;
pub mod events;
pub mod machine;
pub mod observable;
pub mod route;

pub use error::{Result, TransitionError};
pub use events::{NavigationEvent, TransitionEvent};
pub use machine::{
    InterruptPolicy, MachineState, Outcome, PageRef, Transition, TransitionContext,
    TransitionMachine,
};
pub use observable::{Observable, SubscriberId, Subscription};
pub use route::{MatchedRoute, RouteDefinition, RouteMatcher, RoutePattern, RouteTable};
