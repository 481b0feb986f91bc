//! Keyframe resolution
//!
//! Keyframes are authored as a mapping from offset (0.0 to 1.0 of the
//! transition) to a partial style, either statically or as a function of
//! contextual data:
//!
//! ```rust
//! use pagex_animation::{Channel, ChannelValue, KeyframeMap, Keyframes, StyleFrame};
//!
//! // Static keyframes
//! let fade = Keyframes::from(
//!     KeyframeMap::new()
//!         .at(0.0, StyleFrame::new().with(Channel::Opacity, 0.0))
//!         .at(1.0, StyleFrame::new().with(Channel::Opacity, 1.0)),
//! );
//!
//! // Keyframes computed from item data
//! let slide = Keyframes::computed(|ctx| {
//!     let distance = ctx.data["distance"].as_f64().unwrap_or(40.0) as f32;
//!     KeyframeMap::new()
//!         .at(0.0, StyleFrame::new().with(Channel::TranslateY, ChannelValue::px(distance)))
//!         .at(1.0, StyleFrame::new().with(Channel::TranslateY, 0.0))
//! });
//!
//! let timeline = slide.resolve(&serde_json::json!({ "distance": 80 }));
//! assert_eq!(timeline.len(), 2);
//! # let _ = fade;
//! ```
//!
//! Resolution sorts offsets ascending and collapses duplicate offsets, the
//! later entry winning. Non-finite offsets are dropped.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::channel::{Channel, ChannelMap};
use crate::easing::Easing;
use crate::values::ChannelValue;

// ============================================================================
// StyleFrame
// ============================================================================

/// A partial style: the channels constrained at one keyframe
#[derive(Clone, Copy, Default, PartialEq)]
pub struct StyleFrame {
    values: ChannelMap<Option<ChannelValue>>,
}

impl StyleFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a channel (builder pattern)
    pub fn with(mut self, channel: Channel, value: impl Into<ChannelValue>) -> Self {
        self.values[channel] = Some(value.into());
        self
    }

    pub fn set(&mut self, channel: Channel, value: impl Into<ChannelValue>) {
        self.values[channel] = Some(value.into());
    }

    pub fn get(&self, channel: Channel) -> Option<ChannelValue> {
        self.values[channel]
    }

    pub fn is_empty(&self) -> bool {
        self.values.iter().all(|(_, value)| value.is_none())
    }

    /// Channels present in this frame
    pub fn channels(&self) -> impl Iterator<Item = (Channel, ChannelValue)> + '_ {
        self.values
            .iter()
            .filter_map(|(channel, value)| value.map(|value| (channel, value)))
    }

    /// Build from a JSON object of `channelName -> number | "unit string"`
    ///
    /// Unknown channels and unparseable values are skipped.
    pub fn from_json(value: &Value) -> Self {
        let mut frame = Self::new();
        let Some(object) = value.as_object() else {
            tracing::warn!("keyframe style is not an object: {}", value);
            return frame;
        };

        for (name, raw) in object {
            let Some(channel) = Channel::from_name(name) else {
                tracing::warn!("ignoring unknown keyframe channel `{}`", name);
                continue;
            };
            match serde_json::from_value::<ChannelValue>(raw.clone()) {
                Ok(parsed) => frame.set(channel, parsed),
                Err(err) => tracing::warn!("ignoring {} keyframe value: {}", channel, err),
            }
        }
        frame
    }
}

impl fmt::Debug for StyleFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.channels().map(|(channel, value)| (channel.name(), value)))
            .finish()
    }
}

// ============================================================================
// KeyframeMap
// ============================================================================

/// Authored offset -> partial style pairs, in authoring order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyframeMap {
    entries: Vec<(f32, StyleFrame)>,
    easing: Easing,
}

impl KeyframeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a keyframe at `offset` (builder pattern)
    pub fn at(mut self, offset: f32, frame: StyleFrame) -> Self {
        self.entries.push((offset, frame));
        self
    }

    pub fn insert(&mut self, offset: f32, frame: StyleFrame) {
        self.entries.push((offset, frame));
    }

    /// Easing applied between every pair of adjacent keyframes
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build from a JSON object whose keys are numeric offsets
    ///
    /// ```rust
    /// use pagex_animation::KeyframeMap;
    ///
    /// let map = KeyframeMap::from_json(&serde_json::json!({
    ///     "0": { "opacity": 0, "translateY": "24px" },
    ///     "1": { "opacity": 1, "translateY": 0 }
    /// }));
    /// assert_eq!(map.len(), 2);
    /// ```
    pub fn from_json(value: &Value) -> Self {
        let mut map = Self::new();
        let Some(object) = value.as_object() else {
            if !value.is_null() {
                tracing::warn!("keyframes are not an object: {}", value);
            }
            return map;
        };

        for (key, style) in object {
            match key.trim().parse::<f32>() {
                Ok(offset) if offset.is_finite() => map.insert(offset, StyleFrame::from_json(style)),
                _ => tracing::warn!("dropping keyframe with non-numeric offset `{}`", key),
            }
        }
        map
    }
}

// ============================================================================
// Keyframes specification
// ============================================================================

/// Context handed to computed keyframes
#[derive(Clone, Copy, Debug)]
pub struct KeyframesContext<'a> {
    pub data: &'a Value,
}

type KeyframesFn = dyn Fn(&KeyframesContext<'_>) -> KeyframeMap + Send + Sync;

/// A keyframes specification: static, or computed from contextual data
///
/// Cloning shares the underlying specification; [`Keyframes::identity`] is
/// stable across clones and distinct between separately created specs.
#[derive(Clone)]
pub enum Keyframes {
    Static(Arc<KeyframeMap>),
    Computed(Arc<KeyframesFn>),
}

impl Keyframes {
    /// An empty specification (no channel constraints)
    pub fn empty() -> Self {
        Keyframes::Static(Arc::new(KeyframeMap::new()))
    }

    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(&KeyframesContext<'_>) -> KeyframeMap + Send + Sync + 'static,
    {
        Keyframes::Computed(Arc::new(f))
    }

    pub fn from_json(value: &Value) -> Self {
        Keyframes::from(KeyframeMap::from_json(value))
    }

    /// Reference identity of the specification
    pub fn identity(&self) -> usize {
        match self {
            Keyframes::Static(map) => Arc::as_ptr(map) as *const () as usize,
            Keyframes::Computed(f) => Arc::as_ptr(f) as *const () as usize,
        }
    }

    pub fn same_spec(&self, other: &Keyframes) -> bool {
        self.identity() == other.identity()
    }

    /// Evaluate against `data` and build a sorted timeline
    pub fn resolve(&self, data: &Value) -> KeyframeTimeline {
        match self {
            Keyframes::Static(map) => KeyframeTimeline::from_map(map),
            Keyframes::Computed(f) => KeyframeTimeline::from_map(&f(&KeyframesContext { data })),
        }
    }
}

impl Default for Keyframes {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<KeyframeMap> for Keyframes {
    fn from(map: KeyframeMap) -> Self {
        Keyframes::Static(Arc::new(map))
    }
}

impl fmt::Debug for Keyframes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyframes::Static(map) => f.debug_tuple("Static").field(map).finish(),
            Keyframes::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

// ============================================================================
// KeyframeTimeline
// ============================================================================

/// Keyframes sorted ascending by offset with unique offsets
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyframeTimeline {
    frames: Vec<(f32, StyleFrame)>,
    easing: Easing,
}

impl KeyframeTimeline {
    pub fn from_map(map: &KeyframeMap) -> Self {
        let mut entries: Vec<(f32, StyleFrame)> = map
            .entries
            .iter()
            .filter(|(offset, _)| {
                let finite = offset.is_finite();
                if !finite {
                    tracing::warn!("dropping keyframe with non-finite offset {}", offset);
                }
                finite
            })
            .copied()
            .collect();

        // Stable: equal offsets keep authoring order
        entries.sort_by(|(a, _), (b, _)| a.total_cmp(b));

        let mut frames: Vec<(f32, StyleFrame)> = Vec::with_capacity(entries.len());
        for (offset, frame) in entries {
            match frames.last_mut() {
                Some((last, existing)) if *last == offset => *existing = frame,
                _ => frames.push((offset, frame)),
            }
        }

        Self {
            frames,
            easing: map.easing,
        }
    }

    pub fn frames(&self) -> &[(f32, StyleFrame)] {
        &self.frames
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// `(offset, value)` pairs where `channel` is present
    pub fn channel_points(&self, channel: Channel) -> impl Iterator<Item = (f32, ChannelValue)> + '_ {
        self.frames
            .iter()
            .filter_map(move |(offset, frame)| frame.get(channel).map(|value| (*offset, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opacity(value: f32) -> StyleFrame {
        StyleFrame::new().with(Channel::Opacity, value)
    }

    #[test]
    fn test_offsets_sorted() {
        let map = KeyframeMap::new()
            .at(1.0, opacity(1.0))
            .at(0.0, opacity(0.0))
            .at(0.5, opacity(0.3));
        let timeline = KeyframeTimeline::from_map(&map);
        let offsets: Vec<f32> = timeline.frames().iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_duplicate_offsets_last_wins() {
        let map = KeyframeMap::new()
            .at(0.5, opacity(0.1))
            .at(0.0, opacity(0.0))
            .at(0.5, opacity(0.9));
        let timeline = KeyframeTimeline::from_map(&map);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.frames()[1].1.get(Channel::Opacity), Some(ChannelValue::new(0.9)));
    }

    #[test]
    fn test_non_finite_offsets_dropped() {
        let map = KeyframeMap::new().at(f32::NAN, opacity(0.1)).at(0.0, opacity(0.0));
        assert_eq!(KeyframeTimeline::from_map(&map).len(), 1);
    }

    #[test]
    fn test_empty_spec_resolves_empty() {
        assert!(Keyframes::empty().resolve(&Value::Null).is_empty());
        assert!(Keyframes::from_json(&Value::Null).resolve(&Value::Null).is_empty());
    }

    #[test]
    fn test_json_offsets_coerced() {
        let map = KeyframeMap::from_json(&json!({
            "1": { "opacity": 1 },
            "0.25": { "translateX": "10px", "color": "red" },
            " 0 ": { "opacity": 0 },
            "start": { "opacity": 0.5 }
        }));
        let timeline = KeyframeTimeline::from_map(&map);
        let offsets: Vec<f32> = timeline.frames().iter().map(|(offset, _)| *offset).collect();
        assert_eq!(offsets, vec![0.0, 0.25, 1.0]);
        assert_eq!(
            timeline.frames()[1].1.get(Channel::TranslateX),
            Some(ChannelValue::px(10.0))
        );
    }

    #[test]
    fn test_computed_keyframes_see_data() {
        let spec = Keyframes::computed(|ctx| {
            let start = ctx.data["from"].as_f64().unwrap_or(0.0) as f32;
            KeyframeMap::new().at(0.0, opacity(start)).at(1.0, opacity(1.0))
        });
        let timeline = spec.resolve(&json!({ "from": 0.25 }));
        assert_eq!(timeline.frames()[0].1.get(Channel::Opacity), Some(ChannelValue::new(0.25)));
    }

    #[test]
    fn test_identity_stable_across_clones() {
        let spec = Keyframes::from(KeyframeMap::new().at(0.0, opacity(0.0)));
        let clone = spec.clone();
        assert!(spec.same_spec(&clone));
        assert!(!spec.same_spec(&Keyframes::empty()));
    }

    #[test]
    fn test_channel_points_only_where_present() {
        let map = KeyframeMap::new()
            .at(0.0, opacity(0.0))
            .at(0.5, StyleFrame::new().with(Channel::ScaleX, 2.0))
            .at(1.0, opacity(1.0));
        let timeline = KeyframeTimeline::from_map(&map);
        assert_eq!(timeline.channel_points(Channel::Opacity).count(), 2);
        assert_eq!(timeline.channel_points(Channel::ScaleX).count(), 1);
        assert_eq!(timeline.channel_points(Channel::RotateZ).count(), 0);
    }
}
