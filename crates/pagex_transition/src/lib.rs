//! pagex Transitions
//!
//! Route-driven page transitions: every page runs an entrance when it
//! becomes current and an exit when it is replaced, and the items inside a
//! page follow those progress values through keyframes and springs.
//!
//! # Features
//!
//! - **Transition Host**: Navigation events in, mounted pages with roles out
//! - **Page Lifecycle**: Entrance and exit progress clocks with completion signals
//! - **Page Scope**: Read-only progress for page content, valid while mounted
//! - **Items**: Keyframed, spring-smoothed, throttled 13-channel styles
//! - **Configuration**: TOML durations, throttle window, policies and springs
//!
//! # Example
//!
//! ```rust
//! use pagex_animation::{Channel, KeyframeMap, ManualClock, StyleFrame};
//! use pagex_core::{NavigationEvent, RouteTable};
//! use pagex_transition::{component, Item, ItemKeyframes, ItemProps, TransitionConfig, TransitionHost};
//!
//! let fade_in = KeyframeMap::new()
//!     .at(0.0, StyleFrame::new().with(Channel::Opacity, 0.0))
//!     .at(1.0, StyleFrame::new().with(Channel::Opacity, 1.0));
//!
//! let mut routes = RouteTable::new();
//! routes
//!     .define(
//!         "/about",
//!         component(move |scope| {
//!             let props = ItemProps::new().keyframes(ItemKeyframes::new().enter(fade_in.clone()));
//!             Ok(vec![Item::new(scope, props)?])
//!         }),
//!     )
//!     .unwrap();
//!
//! let clock = ManualClock::new();
//! let mut host = TransitionHost::with_time_source(routes, TransitionConfig::default(), clock.clone());
//! host.navigate(NavigationEvent::Complete("/about".into())).unwrap();
//!
//! for _ in 0..200 {
//!     host.frame().unwrap();
//!     clock.advance(16.0);
//! }
//! assert!(host.state().matches("stationary"));
//! assert_eq!(host.views()[0].styles()[0].opacity(), 1.0);
//! ```

pub mod clock;
pub mod config;
pub mod host;
pub mod item;
pub mod page;
pub mod style;

pub use clock::{ClockSample, ProgressClock};
pub use config::{ConfigError, EnteringPolicy, TransitionConfig};
pub use host::{component, Component, PageComponent, PageView, TransitionHost};
pub use item::{Item, ItemKeyframes, ItemProps};
pub use page::{
    PageDurations, PageEnvironment, PageId, PageLifecycle, PageRole, PageScope, PageSignal, Phase,
    SignalQueue,
};
pub use style::ItemStyle;

pub use pagex_core::{Result, TransitionError};
