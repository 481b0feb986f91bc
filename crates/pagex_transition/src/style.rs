//! Computed item style
//!
//! The rendered form of an item: the 13 channel values plus passthrough
//! attributes. Channels render to a CSS `transform` (translate, scale,
//! rotate, skew, in that order) and an `opacity`. Channels at their neutral
//! value are left out of the transform; a transform with nothing left is
//! `none`.

use indexmap::IndexMap;
use pagex_animation::{Channel, ChannelMap, ChannelValue, Interpolate};
use std::fmt;

const IDENTITY_EPSILON: f32 = 1e-4;

const TRANSFORM_ORDER: [Channel; 12] = [
    Channel::TranslateX,
    Channel::TranslateY,
    Channel::TranslateZ,
    Channel::Scale,
    Channel::ScaleX,
    Channel::ScaleY,
    Channel::ScaleZ,
    Channel::RotateX,
    Channel::RotateY,
    Channel::RotateZ,
    Channel::SkewX,
    Channel::SkewY,
];

#[derive(Clone, PartialEq)]
pub struct ItemStyle {
    values: ChannelMap<ChannelValue>,
    attributes: IndexMap<String, String>,
}

impl ItemStyle {
    pub fn new(values: ChannelMap<ChannelValue>) -> Self {
        Self {
            values,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attributes(mut self, attributes: IndexMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn get(&self, channel: Channel) -> ChannelValue {
        self.values[channel]
    }

    pub fn values(&self) -> &ChannelMap<ChannelValue> {
        &self.values
    }

    /// Passthrough attributes, in authoring order
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub fn is_identity(&self, channel: Channel) -> bool {
        self.values[channel].approx_eq(&ChannelValue::new(channel.default_value()), IDENTITY_EPSILON)
    }

    /// CSS `transform` value
    pub fn transform(&self) -> String {
        let functions: Vec<String> = TRANSFORM_ORDER
            .iter()
            .filter(|channel| !self.is_identity(**channel))
            .map(|channel| {
                format!(
                    "{}({})",
                    channel.name(),
                    self.values[*channel].to_css(channel.default_unit())
                )
            })
            .collect();

        if functions.is_empty() {
            "none".to_string()
        } else {
            functions.join(" ")
        }
    }

    /// Opacity clamped to `[0, 1]`
    pub fn opacity(&self) -> f32 {
        let opacity = self.values[Channel::Opacity].value;
        if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        }
    }

    /// Inline style declarations
    pub fn to_css(&self) -> String {
        format!(
            "transform: {}; opacity: {}",
            self.transform(),
            ChannelValue::new(self.opacity())
        )
    }
}

impl Default for ItemStyle {
    fn default() -> Self {
        Self::new(ChannelMap::from_fn(|channel| {
            ChannelValue::new(channel.default_value())
        }))
    }
}

impl fmt::Display for ItemStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

impl fmt::Debug for ItemStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemStyle")
            .field("transform", &self.transform())
            .field("opacity", &self.opacity())
            .field("attributes", &self.attributes)
            .finish()
    }
}
