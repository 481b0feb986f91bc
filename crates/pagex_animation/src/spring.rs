//! Damped springs
//!
//! Damped harmonic oscillator springs for smooth, natural motion toward a
//! moving target. Steps use the closed-form solution of the oscillator, so
//! they stay stable for any frame time, including the very light,
//! heavily damped springs used by the default channel table.
//!
//! [`SpringOptions`] is the partially-specified form authors and config files
//! use; [`SpringConfigs`] holds one set of options per channel.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::channel::{Channel, ChannelMap};

const DEFAULT_STIFFNESS: f32 = 100.0;
const DEFAULT_DAMPING: f32 = 10.0;
const DEFAULT_MASS: f32 = 1.0;
const DEFAULT_REST_DELTA: f32 = 0.01;
const DEFAULT_REST_SPEED: f32 = 0.01;
const MIN_MASS: f32 = 1e-6;

/// Physical parameters and rest thresholds of one spring
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfig {
    pub stiffness: f32,
    pub damping: f32,
    pub mass: f32,
    /// Settled once within this distance of the target...
    pub rest_delta: f32,
    /// ...and moving slower than this
    pub rest_speed: f32,
}

impl SpringConfig {
    pub fn new(stiffness: f32, damping: f32, mass: f32) -> Self {
        Self {
            stiffness,
            damping,
            mass,
            rest_delta: DEFAULT_REST_DELTA,
            rest_speed: DEFAULT_REST_SPEED,
        }
    }

    /// Override the rest thresholds
    pub fn with_rest(mut self, rest_delta: f32, rest_speed: f32) -> Self {
        self.rest_delta = rest_delta;
        self.rest_speed = rest_speed;
        self
    }

    /// Clamp parameters into a range the solver accepts
    fn sanitized(&self) -> Self {
        Self {
            stiffness: self.stiffness.max(0.0),
            damping: self.damping.max(0.0),
            mass: self.mass.max(MIN_MASS),
            rest_delta: self.rest_delta.abs(),
            rest_speed: self.rest_speed.abs(),
        }
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self::new(DEFAULT_STIFFNESS, DEFAULT_DAMPING, DEFAULT_MASS)
    }
}

/// A spring pulling one scalar toward its target
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f32,
    velocity: f32,
    target: f32,
}

impl Spring {
    pub fn new(config: SpringConfig, initial: f32) -> Self {
        Self {
            config: config.sanitized(),
            value: initial,
            velocity: 0.0,
            target: initial,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn config(&self) -> &SpringConfig {
        &self.config
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    pub fn set_velocity(&mut self, velocity: f32) {
        self.velocity = velocity;
    }

    /// Jump to `value` with no motion
    pub fn snap(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
    }

    /// Check if the spring has settled (within rest thresholds of target)
    pub fn is_settled(&self) -> bool {
        (self.value - self.target).abs() <= self.config.rest_delta
            && self.velocity.abs() <= self.config.rest_speed
    }

    /// Advance the simulation by `dt` seconds
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
            return;
        }

        let (offset, velocity) = solve(
            &self.config,
            (self.value - self.target) as f64,
            self.velocity as f64,
            dt as f64,
        );
        self.value = self.target + offset as f32;
        self.velocity = velocity as f32;

        if self.is_settled() {
            self.value = self.target;
            self.velocity = 0.0;
        }
    }
}

/// Displacement and velocity after `t` seconds, starting from `(x0, v0)`
/// relative to the rest position
fn solve(config: &SpringConfig, x0: f64, v0: f64, t: f64) -> (f64, f64) {
    let k = config.stiffness as f64;
    let c = config.damping as f64;
    let m = config.mass as f64;

    if k <= 0.0 {
        if c <= 0.0 {
            return (x0 + v0 * t, v0);
        }
        // Pure drag: no restoring force
        let decay = (-c / m * t).exp();
        return (x0 + v0 * m / c * (1.0 - decay), v0 * decay);
    }

    let alpha = c / (2.0 * m);
    let omega0_sq = k / m;
    let discriminant = alpha * alpha - omega0_sq;

    if discriminant < -1e-9 {
        // Underdamped
        let omega_d = (-discriminant).sqrt();
        let envelope = (-alpha * t).exp();
        let (sin, cos) = (omega_d * t).sin_cos();
        let b = (v0 + alpha * x0) / omega_d;
        let x = envelope * (x0 * cos + b * sin);
        let v = envelope * (v0 * cos - (alpha * v0 + omega0_sq * x0) / omega_d * sin);
        (x, v)
    } else if discriminant > 1e-9 {
        // Overdamped
        let root = discriminant.sqrt();
        let r1 = -alpha + root;
        let r2 = -alpha - root;
        let a = (v0 - r2 * x0) / (r1 - r2);
        let b = x0 - a;
        let (e1, e2) = ((r1 * t).exp(), (r2 * t).exp());
        (a * e1 + b * e2, r1 * a * e1 + r2 * b * e2)
    } else {
        // Critically damped
        let r = -alpha;
        let envelope = (r * t).exp();
        let b = v0 - r * x0;
        let x = (x0 + b * t) * envelope;
        let v = (b + r * (x0 + b * t)) * envelope;
        (x, v)
    }
}

// =============================================================================
// Per-channel options
// =============================================================================

/// Partially specified spring parameters
///
/// Unset fields fall back to stiffness 100, damping 10, mass 1 and rest
/// thresholds of 0.01.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpringOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "restDelta")]
    pub rest_delta: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "restSpeed")]
    pub rest_speed: Option<f32>,
}

impl SpringOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn damping(mut self, damping: f32) -> Self {
        self.damping = Some(damping);
        self
    }

    pub fn stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = Some(stiffness);
        self
    }

    pub fn rest(mut self, rest_delta: f32, rest_speed: f32) -> Self {
        self.rest_delta = Some(rest_delta);
        self.rest_speed = Some(rest_speed);
        self
    }

    /// Fill unset fields with defaults
    pub fn resolve(&self) -> SpringConfig {
        SpringConfig {
            stiffness: self.stiffness.unwrap_or(DEFAULT_STIFFNESS),
            damping: self.damping.unwrap_or(DEFAULT_DAMPING),
            mass: self.mass.unwrap_or(DEFAULT_MASS),
            rest_delta: self.rest_delta.unwrap_or(DEFAULT_REST_DELTA),
            rest_speed: self.rest_speed.unwrap_or(DEFAULT_REST_SPEED),
        }
    }
}

impl From<SpringConfig> for SpringOptions {
    fn from(config: SpringConfig) -> Self {
        Self {
            mass: Some(config.mass),
            damping: Some(config.damping),
            stiffness: Some(config.stiffness),
            rest_delta: Some(config.rest_delta),
            rest_speed: Some(config.rest_speed),
        }
    }
}

/// Channel -> options overrides, as authored
pub type SpringOverrides = BTreeMap<Channel, SpringOptions>;

/// Spring options for every channel
///
/// The defaults make translate and rotate responsive (light and snappy)
/// while skew and opacity move more softly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringConfigs {
    channels: ChannelMap<SpringOptions>,
}

impl Default for SpringConfigs {
    fn default() -> Self {
        let responsive = SpringOptions::new().mass(0.05).damping(7.5).stiffness(100.0);
        let scale = SpringOptions::new().mass(0.05).damping(20.0).rest(1e-9, 1e-9);
        let soft = SpringOptions::new().mass(0.1).damping(20.0);

        Self {
            channels: ChannelMap::from_fn(|channel| match channel {
                Channel::TranslateX
                | Channel::TranslateY
                | Channel::TranslateZ
                | Channel::RotateX
                | Channel::RotateY
                | Channel::RotateZ => responsive,
                Channel::Scale | Channel::ScaleX | Channel::ScaleY | Channel::ScaleZ => scale,
                Channel::SkewX | Channel::SkewY | Channel::Opacity => soft,
            }),
        }
    }
}

impl SpringConfigs {
    /// Defaults with `overrides` replacing whole channels
    pub fn with_overrides(overrides: &SpringOverrides) -> Self {
        let mut configs = Self::default();
        configs.apply(overrides);
        configs
    }

    /// Replace the options of every channel named in `overrides`
    pub fn apply(&mut self, overrides: &SpringOverrides) {
        for (channel, options) in overrides {
            self.channels[*channel] = *options;
        }
    }

    pub fn set(&mut self, channel: Channel, options: SpringOptions) {
        self.channels[channel] = options;
    }

    pub fn options(&self, channel: Channel) -> SpringOptions {
        self.channels[channel]
    }

    /// Resolved configuration for `channel`
    pub fn config(&self, channel: Channel) -> SpringConfig {
        self.channels[channel].resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_settles_to_target() {
        let mut spring = Spring::new(SpringConfig::new(300.0, 28.0, 1.0), 0.0);
        spring.set_target(100.0);

        // 2s of 60fps frames
        for _ in 0..120 {
            spring.step(1.0 / 60.0);
        }

        assert!(spring.is_settled());
        assert!((spring.value() - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_spring_inherits_velocity() {
        let mut spring = Spring::new(SpringConfig::new(170.0, 8.0, 1.0), 0.0);
        spring.set_target(100.0);

        // Build up speed
        for _ in 0..10 {
            spring.step(1.0 / 60.0);
        }

        let velocity = spring.velocity();
        assert!(velocity > 0.0);

        // Retarget while moving; velocity carries over
        spring.set_target(50.0);
        assert_eq!(spring.velocity(), velocity);
    }

    #[test]
    fn test_spring_large_step_stability() {
        let mut spring = Spring::new(SpringConfig::new(300.0, 28.0, 1.0), 0.0);
        spring.set_target(1000.0);

        for _ in 0..100 {
            spring.step(0.1);
            assert!(spring.value() < 2000.0);
            assert!(spring.value() > -500.0);
        }
        assert!(spring.is_settled());
    }

    #[test]
    fn test_spring_different_mass() {
        // Heavier mass - should still settle, just slower
        let config = SpringConfig::new(400.0, 25.0, 2.0);
        let mut spring = Spring::new(config, 0.0);
        spring.set_target(100.0);

        for _ in 0..240 {
            spring.step(1.0 / 60.0);
        }

        assert!(spring.value().is_finite());
        assert!(spring.is_settled());
    }

    #[test]
    fn test_light_heavily_damped_channels_stay_stable() {
        let configs = SpringConfigs::default();
        for channel in [Channel::TranslateX, Channel::Scale, Channel::Opacity, Channel::SkewY] {
            let mut spring = Spring::new(configs.config(channel), 0.0);
            spring.set_target(1.0);
            let mut previous = 0.0;
            for _ in 0..600 {
                spring.step(1.0 / 60.0);
                // Overdamped: monotonic approach, never past the target
                assert!(spring.value() >= previous - 1e-6);
                assert!(spring.value() <= 1.0 + 1e-6);
                previous = spring.value();
            }
            assert!((spring.value() - 1.0).abs() < 1e-3, "{} did not converge", channel);
        }
    }

    #[test]
    fn test_critically_damped_no_overshoot() {
        let config = SpringConfig::new(100.0, 20.0, 1.0);
        let mut spring = Spring::new(config, 0.0);
        spring.set_target(10.0);
        for _ in 0..300 {
            spring.step(1.0 / 60.0);
            assert!(spring.value() <= 10.0 + 1e-4);
        }
        assert!(spring.is_settled());
    }

    #[test]
    fn test_zero_stiffness_coasts() {
        let mut spring = Spring::new(SpringConfig::new(0.0, 0.0, 1.0), 0.0);
        spring.set_target(5.0);
        spring.step(1.0);
        assert_eq!(spring.value(), 0.0);
    }

    #[test]
    fn test_options_resolve_defaults() {
        let config = SpringOptions::new().mass(0.1).resolve();
        assert_eq!(config.mass, 0.1);
        assert_eq!(config.stiffness, 100.0);
        assert_eq!(config.damping, 10.0);
        assert_eq!(config.rest_delta, 0.01);
    }

    #[test]
    fn test_default_table() {
        let configs = SpringConfigs::default();
        let translate = configs.config(Channel::TranslateY);
        assert_eq!((translate.mass, translate.damping, translate.stiffness), (0.05, 7.5, 100.0));
        let scale = configs.config(Channel::ScaleX);
        assert_eq!((scale.mass, scale.damping), (0.05, 20.0));
        assert_eq!(scale.rest_delta, 1e-9);
        let opacity = configs.config(Channel::Opacity);
        assert_eq!((opacity.mass, opacity.damping, opacity.stiffness), (0.1, 20.0, 100.0));
    }

    #[test]
    fn test_overrides_replace_whole_channel() {
        let mut overrides = SpringOverrides::new();
        overrides.insert(Channel::TranslateX, SpringOptions::new().damping(30.0));
        let configs = SpringConfigs::with_overrides(&overrides);

        let translate_x = configs.config(Channel::TranslateX);
        assert_eq!(translate_x.damping, 30.0);
        // Not merged with the channel default's mass
        assert_eq!(translate_x.mass, 1.0);
        assert_eq!(configs.config(Channel::TranslateY).mass, 0.05);
    }

    #[test]
    fn test_options_deserialize_aliases() {
        let options: SpringOptions =
            serde_json::from_str(r#"{ "mass": 0.2, "restDelta": 0.001 }"#).unwrap();
        assert_eq!(options.mass, Some(0.2));
        assert_eq!(options.rest_delta, Some(0.001));
        assert!(serde_json::from_str::<SpringOptions>(r#"{ "bounce": 1 }"#).is_err());
    }
}
