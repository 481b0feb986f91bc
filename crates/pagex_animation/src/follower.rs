//! Spring followers
//!
//! A [`SpringFollower`] owns one spring per channel. Targets come from
//! sampling keyframe curves; the follower smooths jumps between targets into
//! continuous motion. Units travel with the target: the rendered value takes
//! the unit of the latest target that carried one.

use crate::channel::{Channel, ChannelMap};
use crate::spring::{Spring, SpringConfigs};
use crate::values::{ChannelValue, Unit};

/// Per-channel spring set for one animated element
#[derive(Clone, Debug)]
pub struct SpringFollower {
    springs: ChannelMap<Spring>,
    units: ChannelMap<Option<Unit>>,
}

impl SpringFollower {
    /// Create a follower resting at `initial`
    pub fn new(configs: &SpringConfigs, initial: &ChannelMap<ChannelValue>) -> Self {
        Self {
            springs: ChannelMap::from_fn(|channel| {
                Spring::new(configs.config(channel), initial[channel].value)
            }),
            units: initial.map(|_, value| value.unit),
        }
    }

    /// Create a follower resting at every channel's neutral default
    pub fn at_rest(configs: &SpringConfigs) -> Self {
        Self::new(
            configs,
            &ChannelMap::from_fn(|channel| ChannelValue::new(channel.default_value())),
        )
    }

    pub fn set_target(&mut self, channel: Channel, target: ChannelValue) {
        self.springs[channel].set_target(target.value);
        if target.unit.is_some() {
            self.units[channel] = target.unit;
        }
    }

    pub fn set_targets(&mut self, targets: &ChannelMap<ChannelValue>) {
        for (channel, target) in targets.iter() {
            self.set_target(channel, *target);
        }
    }

    /// Jump every channel to `values` with no motion
    pub fn snap(&mut self, values: &ChannelMap<ChannelValue>) {
        for (channel, value) in values.iter() {
            self.springs[channel].snap(value.value);
            self.units[channel] = value.unit;
        }
    }

    /// Swap spring parameters, keeping position, velocity and target
    pub fn reconfigure(&mut self, configs: &SpringConfigs) {
        for (channel, spring) in self.springs.iter_mut() {
            let mut next = Spring::new(configs.config(channel), spring.value());
            next.set_target(spring.target());
            if spring.velocity() != 0.0 {
                next.set_velocity(spring.velocity());
            }
            *spring = next;
        }
    }

    /// Advance every spring by `dt` seconds
    ///
    /// Returns true while any channel is still moving.
    pub fn step(&mut self, dt: f32) -> bool {
        let mut moving = false;
        for (_, spring) in self.springs.iter_mut() {
            spring.step(dt);
            moving |= !spring.is_settled();
        }
        moving
    }

    pub fn is_settled(&self) -> bool {
        self.springs.iter().all(|(_, spring)| spring.is_settled())
    }

    pub fn spring(&self, channel: Channel) -> &Spring {
        &self.springs[channel]
    }

    pub fn value(&self, channel: Channel) -> ChannelValue {
        ChannelValue {
            value: self.springs[channel].value(),
            unit: self.units[channel],
        }
    }

    pub fn values(&self) -> ChannelMap<ChannelValue> {
        ChannelMap::from_fn(|channel| self.value(channel))
    }

    pub fn target(&self, channel: Channel) -> ChannelValue {
        ChannelValue {
            value: self.springs[channel].target(),
            unit: self.units[channel],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(follower: &mut SpringFollower, seconds: f32) {
        let frames = (seconds * 60.0) as usize;
        for _ in 0..frames {
            follower.step(1.0 / 60.0);
        }
    }

    #[test]
    fn test_starts_at_rest() {
        let follower = SpringFollower::at_rest(&SpringConfigs::default());
        assert!(follower.is_settled());
        assert_eq!(follower.value(Channel::Opacity).value, 1.0);
        assert_eq!(follower.value(Channel::TranslateX).value, 0.0);
    }

    #[test]
    fn test_follows_target() {
        let mut follower = SpringFollower::at_rest(&SpringConfigs::default());
        follower.set_target(Channel::TranslateY, ChannelValue::px(120.0));
        follower.set_target(Channel::Opacity, ChannelValue::new(0.0));
        assert!(!follower.is_settled());

        follower.step(1.0 / 60.0);
        let partway = follower.value(Channel::TranslateY).value;
        assert!(partway > 0.0 && partway < 120.0);

        run(&mut follower, 3.0);
        assert!(follower.is_settled());
        assert_eq!(follower.value(Channel::TranslateY), ChannelValue::px(120.0));
        assert_eq!(follower.value(Channel::Opacity).value, 0.0);
    }

    #[test]
    fn test_unitless_target_keeps_unit() {
        let mut initial = ChannelMap::from_fn(|channel| ChannelValue::new(channel.default_value()));
        initial[Channel::RotateZ] = ChannelValue::deg(-30.0);
        let mut follower = SpringFollower::new(&SpringConfigs::default(), &initial);
        follower.set_target(Channel::RotateZ, ChannelValue::new(0.0));
        assert_eq!(follower.target(Channel::RotateZ), ChannelValue::deg(0.0));
    }

    #[test]
    fn test_snap_stops_motion() {
        let mut follower = SpringFollower::at_rest(&SpringConfigs::default());
        follower.set_target(Channel::SkewX, ChannelValue::deg(10.0));
        follower.step(1.0 / 60.0);

        let values = ChannelMap::from_fn(|channel| ChannelValue::new(channel.default_value()));
        follower.snap(&values);
        assert!(follower.is_settled());
        assert_eq!(follower.value(Channel::SkewX).value, 0.0);
    }

    #[test]
    fn test_reconfigure_keeps_motion() {
        let mut follower = SpringFollower::at_rest(&SpringConfigs::default());
        follower.set_target(Channel::TranslateX, ChannelValue::new(50.0));
        follower.step(1.0 / 60.0);
        let before = follower.spring(Channel::TranslateX).value();
        let velocity = follower.spring(Channel::TranslateX).velocity();

        let mut configs = SpringConfigs::default();
        configs.set(Channel::TranslateX, crate::spring::SpringOptions::new().stiffness(300.0));
        follower.reconfigure(&configs);

        let spring = follower.spring(Channel::TranslateX);
        assert_eq!(spring.value(), before);
        assert_eq!(spring.velocity(), velocity);
        assert_eq!(spring.target(), 50.0);
        assert_eq!(spring.config().stiffness, 300.0);
    }
}
