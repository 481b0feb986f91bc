//! pagex Animation System
//!
//! Keyframe curves, spring smoothing, and frame scheduling for page
//! transitions.
//!
//! # Features
//!
//! - **Keyframes**: Offset-to-style maps, static or computed from data, with unit-bearing values
//! - **Channel Animators**: Pure per-channel sampling over 13 transform/opacity channels
//! - **Keyframe Cache**: Resolution memoized on specification identity + data snapshot
//! - **Spring Physics**: Closed-form damped springs with rest thresholds
//! - **Spring Followers**: One spring per channel, retargeted from sampled curves
//! - **Throttle**: Leading + trailing rate limiting of retargets
//! - **Frame Scheduler**: Single-threaded tick source with swappable time sources
//!
//! # Example
//!
//! ```rust
//! use pagex_animation::{
//!     Channel, ChannelAnimations, KeyframeMap, KeyframeTimeline, SpringConfigs,
//!     SpringFollower, StyleFrame,
//! };
//!
//! let map = KeyframeMap::new()
//!     .at(0.0, StyleFrame::new().with(Channel::Opacity, 0.0))
//!     .at(1.0, StyleFrame::new().with(Channel::Opacity, 1.0));
//! let animations = ChannelAnimations::from_timeline(&KeyframeTimeline::from_map(&map));
//!
//! let mut follower = SpringFollower::new(&SpringConfigs::default(), &animations.sample_all(0.0));
//! follower.set_targets(&animations.sample_all(1.0));
//! while follower.step(1.0 / 60.0) {}
//! assert_eq!(follower.value(Channel::Opacity).value, 1.0);
//! ```

pub mod animator;
pub mod cache;
pub mod channel;
pub mod easing;
pub mod follower;
pub mod keyframe;
pub mod scheduler;
pub mod spring;
pub mod throttle;
pub mod values;

pub use animator::{ChannelAnimation, ChannelAnimations};
pub use cache::{KeyframeCache, KeyframeKey, KeyframeMemo};
pub use channel::{Channel, ChannelMap};
pub use easing::Easing;
pub use follower::SpringFollower;
pub use keyframe::{KeyframeMap, KeyframeTimeline, Keyframes, KeyframesContext, StyleFrame};
pub use scheduler::{
    FrameCallbackId, FrameControl, FrameInfo, FrameScheduler, FrameSubscription, ManualClock,
    SchedulerHandle, SystemClock, TimeSource,
};
pub use spring::{Spring, SpringConfig, SpringConfigs, SpringOptions, SpringOverrides};
pub use throttle::Throttle;
pub use values::{ChannelValue, Interpolate, Unit, ValueParseError};
