//! Animatable visual channels
//!
//! A channel is one independently animated visual property of an item.
//! [`ChannelMap`] stores one slot per channel with O(1) indexing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use crate::values::Unit;

/// One independently animatable visual property
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    TranslateX,
    TranslateY,
    TranslateZ,
    Scale,
    ScaleX,
    ScaleY,
    ScaleZ,
    SkewX,
    SkewY,
    RotateX,
    RotateY,
    RotateZ,
    Opacity,
}

impl Channel {
    pub const COUNT: usize = 13;

    /// All channels, in declaration order
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::TranslateX,
        Channel::TranslateY,
        Channel::TranslateZ,
        Channel::Scale,
        Channel::ScaleX,
        Channel::ScaleY,
        Channel::ScaleZ,
        Channel::SkewX,
        Channel::SkewY,
        Channel::RotateX,
        Channel::RotateY,
        Channel::RotateZ,
        Channel::Opacity,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Authoring name (`"translateX"`)
    pub fn name(self) -> &'static str {
        match self {
            Channel::TranslateX => "translateX",
            Channel::TranslateY => "translateY",
            Channel::TranslateZ => "translateZ",
            Channel::Scale => "scale",
            Channel::ScaleX => "scaleX",
            Channel::ScaleY => "scaleY",
            Channel::ScaleZ => "scaleZ",
            Channel::SkewX => "skewX",
            Channel::SkewY => "skewY",
            Channel::RotateX => "rotateX",
            Channel::RotateY => "rotateY",
            Channel::RotateZ => "rotateZ",
            Channel::Opacity => "opacity",
        }
    }

    pub fn from_name(name: &str) -> Option<Channel> {
        Channel::ALL.into_iter().find(|channel| channel.name() == name)
    }

    /// Neutral value applied when a channel has no keyframes
    ///
    /// Identity transform and full opacity.
    pub fn default_value(self) -> f32 {
        match self {
            Channel::Scale
            | Channel::ScaleX
            | Channel::ScaleY
            | Channel::ScaleZ
            | Channel::Opacity => 1.0,
            _ => 0.0,
        }
    }

    /// Unit assumed when a value is authored as a bare number
    pub fn default_unit(self) -> Option<Unit> {
        match self {
            Channel::TranslateX | Channel::TranslateY | Channel::TranslateZ => Some(Unit::Px),
            Channel::SkewX
            | Channel::SkewY
            | Channel::RotateX
            | Channel::RotateY
            | Channel::RotateZ => Some(Unit::Deg),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `T` per channel
#[derive(Clone, Copy, PartialEq)]
pub struct ChannelMap<T> {
    slots: [T; Channel::COUNT],
}

impl<T> ChannelMap<T> {
    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        Self {
            slots: std::array::from_fn(|index| f(Channel::ALL[index])),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &T)> {
        Channel::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Channel, &mut T)> {
        Channel::ALL.into_iter().zip(self.slots.iter_mut())
    }

    pub fn map<U>(&self, mut f: impl FnMut(Channel, &T) -> U) -> ChannelMap<U> {
        ChannelMap::from_fn(|channel| f(channel, &self.slots[channel.index()]))
    }
}

impl<T: Default> Default for ChannelMap<T> {
    fn default() -> Self {
        Self::from_fn(|_| T::default())
    }
}

impl<T> Index<Channel> for ChannelMap<T> {
    type Output = T;

    fn index(&self, channel: Channel) -> &T {
        &self.slots[channel.index()]
    }
}

impl<T> IndexMut<Channel> for ChannelMap<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.slots[channel.index()]
    }
}

impl<T: fmt::Debug> fmt::Debug for ChannelMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(channel, value)| (channel.name(), value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_match_order() {
        for (index, channel) in Channel::ALL.into_iter().enumerate() {
            assert_eq!(channel.index(), index);
        }
    }

    #[test]
    fn test_names_round_trip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_name(channel.name()), Some(channel));
        }
        assert_eq!(Channel::from_name("color"), None);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Channel::TranslateY.default_value(), 0.0);
        assert_eq!(Channel::RotateZ.default_value(), 0.0);
        assert_eq!(Channel::SkewX.default_value(), 0.0);
        assert_eq!(Channel::Scale.default_value(), 1.0);
        assert_eq!(Channel::ScaleZ.default_value(), 1.0);
        assert_eq!(Channel::Opacity.default_value(), 1.0);
    }

    #[test]
    fn test_serde_names() {
        let channel: Channel = serde_json::from_str(r#""rotateZ""#).unwrap();
        assert_eq!(channel, Channel::RotateZ);
        assert_eq!(serde_json::to_string(&Channel::ScaleX).unwrap(), r#""scaleX""#);
    }

    #[test]
    fn test_channel_map_indexing() {
        let mut map: ChannelMap<Option<f32>> = ChannelMap::default();
        map[Channel::Opacity] = Some(0.5);
        assert_eq!(map[Channel::Opacity], Some(0.5));
        assert_eq!(map.iter().filter(|(_, value)| value.is_some()).count(), 1);
    }
}
