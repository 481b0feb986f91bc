//! Channel animators
//!
//! Turns a [`KeyframeTimeline`] into one sampling function per channel. A
//! channel never mentioned by the timeline has no animator; consumers fall
//! back to [`Channel::default_value`]. A channel authored at a single offset
//! gets a synthetic second point one unit later with the same value so every
//! animator has a real span.
//!
//! Sampling is pure: progress before the first offset or after the last one
//! clamps to the boundary value.

use smallvec::SmallVec;

use crate::channel::{Channel, ChannelMap};
use crate::easing::Easing;
use crate::keyframe::KeyframeTimeline;
use crate::values::{ChannelValue, Interpolate};

/// Piecewise curve for a single channel
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelAnimation {
    /// `(offset, value)` sorted by strictly increasing offset, at least two
    points: SmallVec<[(f32, ChannelValue); 4]>,
    easing: Easing,
}

impl ChannelAnimation {
    /// Build the animator for `channel`, or `None` if the channel is absent
    pub fn from_timeline(channel: Channel, timeline: &KeyframeTimeline) -> Option<Self> {
        let mut points: SmallVec<[(f32, ChannelValue); 4]> =
            timeline.channel_points(channel).collect();

        match points.len() {
            0 => return None,
            1 => {
                let (offset, value) = points[0];
                points.push((offset + 1.0, value));
            }
            _ => {}
        }

        Some(Self {
            points,
            easing: timeline.easing(),
        })
    }

    pub fn points(&self) -> &[(f32, ChannelValue)] {
        &self.points
    }

    /// Value at `progress`
    pub fn sample(&self, progress: f32) -> ChannelValue {
        let (first_offset, first) = self.points[0];
        let (last_offset, last) = self.points[self.points.len() - 1];

        if progress.is_nan() || progress <= first_offset {
            return first;
        }
        if progress >= last_offset {
            return last;
        }

        // First point strictly after progress; the segment starts one before it
        let upper = self.points.partition_point(|(offset, _)| *offset <= progress);
        let (from_offset, from) = self.points[upper - 1];
        let (to_offset, to) = self.points[upper];

        let t = (progress - from_offset) / (to_offset - from_offset);
        from.lerp(&to, self.easing.apply(t))
    }
}

/// Animators for every channel, derived from one timeline
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelAnimations {
    channels: ChannelMap<Option<ChannelAnimation>>,
}

impl ChannelAnimations {
    pub fn from_timeline(timeline: &KeyframeTimeline) -> Self {
        Self {
            channels: ChannelMap::from_fn(|channel| {
                ChannelAnimation::from_timeline(channel, timeline)
            }),
        }
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelAnimation> {
        self.channels[channel].as_ref()
    }

    pub fn has(&self, channel: Channel) -> bool {
        self.channels[channel].is_some()
    }

    /// True when no channel is animated
    pub fn is_empty(&self) -> bool {
        self.channels.iter().all(|(_, animation)| animation.is_none())
    }

    pub fn sample(&self, channel: Channel, progress: f32) -> Option<ChannelValue> {
        self.get(channel).map(|animation| animation.sample(progress))
    }

    /// Sample, falling back to the channel's neutral default
    pub fn sample_or_default(&self, channel: Channel, progress: f32) -> ChannelValue {
        self.sample(channel, progress)
            .unwrap_or_else(|| ChannelValue::new(channel.default_value()))
    }

    /// Sample every channel
    pub fn sample_all(&self, progress: f32) -> ChannelMap<ChannelValue> {
        ChannelMap::from_fn(|channel| self.sample_or_default(channel, progress))
    }
}
