//! Animatable value types
//!
//! Provides the [`Interpolate`] trait and [`ChannelValue`], a number with an
//! optional CSS unit. Keyframe values may be authored as plain numbers (`40`)
//! or unit strings (`"40px"`, `"-12deg"`, `"0.25turn"`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Trait for values that can be linearly interpolated
pub trait Interpolate: Clone {
    /// Linearly interpolate between self and other by factor t (0.0 to 1.0)
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// Check if two values are approximately equal (for settling detection)
    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool;
}

// ============================================================================
// f32 Implementation
// ============================================================================

impl Interpolate for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        (self - other).abs() < epsilon
    }
}

// ============================================================================
// Units
// ============================================================================

/// CSS unit attached to a channel value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    Px,
    Percent,
    Em,
    Rem,
    Vw,
    Vh,
    Deg,
    Rad,
    Grad,
    Turn,
}

impl Unit {
    /// Suffixes ordered so that no suffix is shadowed by a shorter one
    const SUFFIXES: [(&'static str, Unit); 10] = [
        ("turn", Unit::Turn),
        ("grad", Unit::Grad),
        ("deg", Unit::Deg),
        ("rad", Unit::Rad),
        ("rem", Unit::Rem),
        ("px", Unit::Px),
        ("em", Unit::Em),
        ("vw", Unit::Vw),
        ("vh", Unit::Vh),
        ("%", Unit::Percent),
    ];

    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Percent => "%",
            Unit::Em => "em",
            Unit::Rem => "rem",
            Unit::Vw => "vw",
            Unit::Vh => "vh",
            Unit::Deg => "deg",
            Unit::Rad => "rad",
            Unit::Grad => "grad",
            Unit::Turn => "turn",
        }
    }
}

/// Error parsing a unit-bearing value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse `{0}` as an animatable value")]
pub struct ValueParseError(pub String);

// ============================================================================
// ChannelValue
// ============================================================================

/// A number with an optional unit
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawValue", into = "RawValue")]
pub struct ChannelValue {
    pub value: f32,
    pub unit: Option<Unit>,
}

impl ChannelValue {
    pub const fn new(value: f32) -> Self {
        Self { value, unit: None }
    }

    pub const fn with_unit(value: f32, unit: Unit) -> Self {
        Self {
            value,
            unit: Some(unit),
        }
    }

    pub fn px(value: f32) -> Self {
        Self::with_unit(value, Unit::Px)
    }

    pub fn deg(value: f32) -> Self {
        Self::with_unit(value, Unit::Deg)
    }

    pub fn percent(value: f32) -> Self {
        Self::with_unit(value, Unit::Percent)
    }

    /// Render with `fallback` as the unit when none was authored
    pub fn to_css(&self, fallback: Option<Unit>) -> String {
        let unit = self.unit.or(fallback).map(|unit| unit.suffix()).unwrap_or("");
        format!("{}{}", format_number(self.value), unit)
    }
}

impl From<f32> for ChannelValue {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

impl From<f64> for ChannelValue {
    fn from(value: f64) -> Self {
        Self::new(value as f32)
    }
}

impl FromStr for ChannelValue {
    type Err = ValueParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let parse = |number: &str| {
            number
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| ValueParseError(text.to_string()))
        };

        for (suffix, unit) in Unit::SUFFIXES {
            if let Some(number) = trimmed.strip_suffix(suffix) {
                return parse(number).map(|value| Self::with_unit(value, unit));
            }
        }
        parse(trimmed).map(Self::new)
    }
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css(None))
    }
}

impl Interpolate for ChannelValue {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            value: self.value.lerp(&other.value, t),
            unit: self.unit.or(other.unit),
        }
    }

    fn approx_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.value.approx_eq(&other.value, epsilon)
    }
}

/// Authored representation: a bare number or a unit string
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

impl TryFrom<RawValue> for ChannelValue {
    type Error = ValueParseError;

    fn try_from(raw: RawValue) -> Result<Self, Self::Error> {
        match raw {
            RawValue::Number(value) if value.is_finite() => Ok(Self::new(value as f32)),
            RawValue::Number(value) => Err(ValueParseError(value.to_string())),
            RawValue::Text(text) => text.parse(),
        }
    }
}

impl From<ChannelValue> for RawValue {
    fn from(value: ChannelValue) -> Self {
        match value.unit {
            None => RawValue::Number(value.value as f64),
            Some(_) => RawValue::Text(value.to_string()),
        }
    }
}

/// Format without trailing zeros (`1`, `0.5`, `-12.25`)
fn format_number(value: f32) -> String {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        return "0".to_string();
    }
    let text = format!("{:.4}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_lerp() {
        assert_eq!(0.0f32.lerp(&10.0, 0.25), 2.5);
        assert!(1.0f32.approx_eq(&1.0005, 0.001));
    }

    #[test]
    fn test_parse_units() {
        assert_eq!("40px".parse::<ChannelValue>().unwrap(), ChannelValue::px(40.0));
        assert_eq!("-12.5deg".parse::<ChannelValue>().unwrap(), ChannelValue::deg(-12.5));
        assert_eq!(
            "0.25turn".parse::<ChannelValue>().unwrap(),
            ChannelValue::with_unit(0.25, Unit::Turn)
        );
        assert_eq!(
            "2rem".parse::<ChannelValue>().unwrap(),
            ChannelValue::with_unit(2.0, Unit::Rem)
        );
        assert_eq!(
            "1.5em".parse::<ChannelValue>().unwrap(),
            ChannelValue::with_unit(1.5, Unit::Em)
        );
        assert_eq!("50%".parse::<ChannelValue>().unwrap(), ChannelValue::percent(50.0));
        assert_eq!(" 0.5 ".parse::<ChannelValue>().unwrap(), ChannelValue::new(0.5));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("abc".parse::<ChannelValue>().is_err());
        assert!("px".parse::<ChannelValue>().is_err());
        assert!("NaN".parse::<ChannelValue>().is_err());
    }

    #[test]
    fn test_lerp_keeps_lower_unit() {
        let from = ChannelValue::px(0.0);
        let to = ChannelValue::new(100.0);
        assert_eq!(from.lerp(&to, 0.5), ChannelValue::px(50.0));
        assert_eq!(to.lerp(&from, 0.5), ChannelValue::px(50.0));
    }

    #[test]
    fn test_css_formatting() {
        assert_eq!(ChannelValue::new(1.0).to_css(None), "1");
        assert_eq!(ChannelValue::new(12.5).to_css(Some(Unit::Px)), "12.5px");
        assert_eq!(ChannelValue::deg(-45.0).to_css(Some(Unit::Px)), "-45deg");
        assert_eq!(ChannelValue::new(-0.00001).to_css(None), "0");
    }

    #[test]
    fn test_serde_number_or_string() {
        let values: Vec<ChannelValue> = serde_json::from_str(r#"[1, "20px", 0.5]"#).unwrap();
        assert_eq!(
            values,
            vec![ChannelValue::new(1.0), ChannelValue::px(20.0), ChannelValue::new(0.5)]
        );
        assert!(serde_json::from_str::<ChannelValue>(r#""wide""#).is_err());
        assert_eq!(
            serde_json::to_string(&ChannelValue::deg(90.0)).unwrap(),
            r#""90deg""#
        );
    }
}
