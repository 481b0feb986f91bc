//! Animated items
//!
//! An [`Item`] is an element inside a page whose 13 channels follow the
//! page's progress. Its enter and exit keyframes are sampled at the current
//! progress, and a spring per channel smooths the sampled targets. Progress
//! updates are throttled with leading and trailing delivery, so the first and
//! last update of a burst always reach the springs.
//!
//! ```rust
//! use pagex_animation::{Channel, ChannelValue, KeyframeMap, StyleFrame};
//! use pagex_transition::{ItemKeyframes, ItemProps};
//!
//! let props = ItemProps::new()
//!     .keyframes(
//!         ItemKeyframes::new()
//!             .enter(
//!                 KeyframeMap::new()
//!                     .at(0.0, StyleFrame::new().with(Channel::TranslateY, ChannelValue::px(40.0)))
//!                     .at(1.0, StyleFrame::new().with(Channel::TranslateY, 0.0)),
//!             )
//!             .exit(
//!                 KeyframeMap::new()
//!                     .at(0.0, StyleFrame::new().with(Channel::Opacity, 1.0))
//!                     .at(1.0, StyleFrame::new().with(Channel::Opacity, 0.0)),
//!             ),
//!     )
//!     .attribute("class", "headline");
//! # let _ = props;
//! ```

use indexmap::IndexMap;
use pagex_animation::{
    Channel, ChannelAnimations, ChannelMap, ChannelValue, FrameControl, FrameInfo,
    FrameSubscription, KeyframeMemo, Keyframes, SpringConfigs, SpringFollower, SpringOptions,
    SpringOverrides, Throttle,
};
use pagex_core::{Result, Subscription};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::page::{PageEnvironment, PageScope, Phase};
use crate::style::ItemStyle;

/// Enter and exit keyframes of an item
#[derive(Clone, Debug, Default)]
pub struct ItemKeyframes {
    pub enter: Keyframes,
    pub exit: Keyframes,
}

impl ItemKeyframes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(mut self, keyframes: impl Into<Keyframes>) -> Self {
        self.enter = keyframes.into();
        self
    }

    pub fn exit(mut self, keyframes: impl Into<Keyframes>) -> Self {
        self.exit = keyframes.into();
        self
    }

    /// Read `{ "enter": {...}, "exit": {...} }`; a missing side is empty
    pub fn from_json(value: &Value) -> Self {
        let side = |key: &str| {
            value
                .get(key)
                .map(Keyframes::from_json)
                .unwrap_or_default()
        };
        Self {
            enter: side("enter"),
            exit: side("exit"),
        }
    }
}

/// Authoring properties of an [`Item`]
#[derive(Clone, Debug, Default)]
pub struct ItemProps {
    pub keyframes: ItemKeyframes,
    /// Per-channel spring overrides; each replaces that channel's options
    pub springs: SpringOverrides,
    /// Data passed to computed keyframes
    pub data: Value,
    /// Passthrough attributes, rendered as given
    pub attributes: IndexMap<String, String>,
}

impl ItemProps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyframes(mut self, keyframes: ItemKeyframes) -> Self {
        self.keyframes = keyframes;
        self
    }

    pub fn spring(mut self, channel: Channel, options: SpringOptions) -> Self {
        self.springs.insert(channel, options);
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Delivery {
    phase: Phase,
    progress: f32,
}

struct ItemState {
    keyframes: ItemKeyframes,
    data: Value,
    enter: KeyframeMemo,
    exit: KeyframeMemo,
    follower: SpringFollower,
    throttle: Throttle<Delivery>,
    /// Last delivery applied to the springs
    last: Option<Delivery>,
    attributes: IndexMap<String, String>,
}

impl ItemState {
    fn animations(&self, phase: Phase) -> &ChannelAnimations {
        let memo = match phase {
            Phase::Enter => &self.enter,
            Phase::Exit => &self.exit,
        };
        memo.animations()
    }

    fn retarget(&mut self, delivery: Delivery) {
        let targets = self.animations(delivery.phase).sample_all(delivery.progress);
        self.follower.set_targets(&targets);
        self.last = Some(delivery);
    }

    fn offer(&mut self, now_ms: f64, delivery: Delivery) {
        if let Some(delivery) = self.throttle.push(now_ms, delivery) {
            self.retarget(delivery);
        }
    }

    fn frame(&mut self, frame: &FrameInfo) {
        if let Some(delivery) = self.throttle.poll(frame.now_ms) {
            self.retarget(delivery);
        }
        self.follower.step(frame.dt_secs());
    }
}

/// A page element animated by the page's progress
pub struct Item {
    state: Rc<RefCell<ItemState>>,
    environment: Rc<PageEnvironment>,
    _progress: [Subscription; 2],
    _frame: Option<FrameSubscription>,
}

impl Item {
    /// Create an item inside `scope`
    ///
    /// Fails with `OutsidePage` if the scope's page is no longer mounted.
    pub fn new(scope: &PageScope, props: ItemProps) -> Result<Self> {
        let environment = scope.environment()?;
        let enter_progress = scope.enter_progress()?;
        let exit_progress = scope.exit_progress()?;

        let ItemProps {
            keyframes,
            springs,
            data,
            attributes,
        } = props;

        let mut enter = KeyframeMemo::new();
        let mut exit = KeyframeMemo::new();
        {
            let mut cache = environment.cache.borrow_mut();
            enter.refresh(&keyframes.enter, &data, &mut cache);
            exit.refresh(&keyframes.exit, &data, &mut cache);
        }

        let mut spring_configs: SpringConfigs = environment.springs;
        spring_configs.apply(&springs);

        // Start from the pose the page is currently at
        let initial = match exit_progress.get() {
            Some(progress) => exit.animations().sample_all(progress),
            None => enter.animations().sample_all(enter_progress.get()),
        };

        let state = Rc::new(RefCell::new(ItemState {
            keyframes,
            data,
            enter,
            exit,
            follower: SpringFollower::new(&spring_configs, &initial),
            throttle: Throttle::new(environment.throttle_ms),
            last: None,
            attributes,
        }));

        let scheduler = environment.scheduler.clone();
        let on_enter = {
            let state = Rc::downgrade(&state);
            let scheduler = scheduler.clone();
            enter_progress.subscribe(move |progress| {
                if let Some(state) = state.upgrade() {
                    let now = scheduler.frame_time_ms().unwrap_or_default();
                    state.borrow_mut().offer(
                        now,
                        Delivery {
                            phase: Phase::Enter,
                            progress: *progress,
                        },
                    );
                }
            })
        };
        let on_exit = {
            let state = Rc::downgrade(&state);
            let scheduler = scheduler.clone();
            exit_progress.subscribe(move |progress| {
                let (Some(progress), Some(state)) = (*progress, state.upgrade()) else {
                    return;
                };
                let now = scheduler.frame_time_ms().unwrap_or_default();
                state.borrow_mut().offer(
                    now,
                    Delivery {
                        phase: Phase::Exit,
                        progress,
                    },
                );
            })
        };
        let frame = {
            let state = Rc::downgrade(&state);
            scheduler.subscribe(move |frame| match state.upgrade() {
                Some(state) => {
                    state.borrow_mut().frame(frame);
                    FrameControl::Continue
                }
                None => FrameControl::Stop,
            })
        };

        Ok(Self {
            state,
            environment,
            _progress: [on_enter, on_exit],
            _frame: frame,
        })
    }

    /// Current rendered style
    pub fn style(&self) -> ItemStyle {
        let state = self.state.borrow();
        ItemStyle::new(state.follower.values()).with_attributes(state.attributes.clone())
    }

    pub fn values(&self) -> ChannelMap<ChannelValue> {
        self.state.borrow().follower.values()
    }

    pub fn value(&self, channel: Channel) -> ChannelValue {
        self.state.borrow().follower.value(channel)
    }

    /// The value the channel's spring is heading to
    pub fn target(&self, channel: Channel) -> ChannelValue {
        self.state.borrow().follower.target(channel)
    }

    /// True when every spring is at rest on its target
    pub fn is_settled(&self) -> bool {
        let state = self.state.borrow();
        state.follower.is_settled() && !state.throttle.has_pending()
    }

    /// Replace the data passed to computed keyframes
    ///
    /// Keyframes are re-resolved only if the data differs structurally; the
    /// springs are then retargeted at the last delivered progress. Returns
    /// whether anything was re-resolved.
    pub fn set_data(&self, data: Value) -> bool {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;
        let changed = {
            let mut cache = self.environment.cache.borrow_mut();
            let enter = state.enter.refresh(&state.keyframes.enter, &data, &mut cache);
            let exit = state.exit.refresh(&state.keyframes.exit, &data, &mut cache);
            enter || exit
        };
        state.data = data;

        if changed {
            if let Some(last) = state.last {
                state.retarget(last);
            }
        }
        changed
    }

    pub fn data(&self) -> Value {
        self.state.borrow().data.clone()
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Item").field("style", &self.style()).finish()
    }
}
