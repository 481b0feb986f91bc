//! Demo pages for scripted runs

use anyhow::{Context, Result};
use pagex_animation::{Channel, ChannelValue, Easing, KeyframeMap, Keyframes, StyleFrame};
use pagex_core::RouteTable;
use pagex_transition::{component, Component, Item, ItemKeyframes, ItemProps};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// Staggered slide-up entrance, shrink-and-fade exit
pub fn default_keyframes() -> ItemKeyframes {
    let enter = Keyframes::computed(|ctx| {
        let index = ctx.data["index"].as_f64().unwrap_or(0.0) as f32;
        KeyframeMap::new()
            .at(
                0.0,
                StyleFrame::new()
                    .with(Channel::TranslateY, ChannelValue::px(40.0 + 20.0 * index))
                    .with(Channel::Opacity, 0.0),
            )
            .at(
                1.0,
                StyleFrame::new()
                    .with(Channel::TranslateY, ChannelValue::px(0.0))
                    .with(Channel::Opacity, 1.0),
            )
            .with_easing(Easing::EaseOut)
    });
    let exit = KeyframeMap::new()
        .at(
            0.0,
            StyleFrame::new()
                .with(Channel::Scale, 1.0)
                .with(Channel::Opacity, 1.0),
        )
        .at(
            1.0,
            StyleFrame::new()
                .with(Channel::Scale, 0.9)
                .with(Channel::Opacity, 0.0),
        );
    ItemKeyframes::new().enter(enter).exit(exit)
}

/// Read `{ "enter": {...}, "exit": {...} }` from a JSON file
pub fn load_keyframes(path: &Path) -> Result<ItemKeyframes> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(ItemKeyframes::from_json(&value))
}

/// A page of `items` items sharing one keyframes spec
pub fn page(keyframes: ItemKeyframes, items: usize) -> Component {
    component(move |scope| {
        (0..items)
            .map(|index| {
                let props = ItemProps::new()
                    .keyframes(keyframes.clone())
                    .data(json!({ "index": index }))
                    .attribute("route", scope.route())
                    .attribute("item", index.to_string());
                Item::new(scope, props)
            })
            .collect()
    })
}

pub fn routes(patterns: &[String], keyframes: &ItemKeyframes, items: usize) -> Result<RouteTable<Component>> {
    let mut table = RouteTable::new();
    for pattern in patterns {
        table
            .define(pattern.as_str(), page(keyframes.clone(), items))
            .with_context(|| format!("Invalid route '{}'", pattern))?;
    }
    Ok(table)
}
