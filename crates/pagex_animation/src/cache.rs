//! Memoized keyframe resolution
//!
//! Resolving keyframes (evaluating computed specs, sorting offsets, building
//! per-channel animators) only needs to happen when the specification or the
//! data it was computed from changes. Cache keys combine the specification's
//! reference identity with a structural snapshot (serialized JSON) of the data.
//!
//! Cache entries hold a clone of the specification, which keeps the
//! underlying allocation alive and its identity from being reused while the
//! entry exists.

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::animator::ChannelAnimations;
use crate::keyframe::Keyframes;

const DEFAULT_CAPACITY: usize = 64;

/// Cache key: specification identity + data snapshot
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyframeKey {
    identity: usize,
    data: String,
}

impl KeyframeKey {
    pub fn new(spec: &Keyframes, data: &Value) -> Self {
        Self {
            identity: spec.identity(),
            data: snapshot(data),
        }
    }
}

/// Structural snapshot of `data`
///
/// Object keys serialize in sorted order, so structurally equal values give
/// equal snapshots.
pub fn snapshot(data: &Value) -> String {
    data.to_string()
}

struct CacheEntry {
    _spec: Keyframes,
    animations: Arc<ChannelAnimations>,
}

/// LRU cache of resolved channel animations
pub struct KeyframeCache {
    entries: LruCache<KeyframeKey, CacheEntry>,
    hits: u64,
    misses: u64,
}

impl KeyframeCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Return cached animations for `(spec, data)`, resolving on a miss
    pub fn get_or_resolve(&mut self, spec: &Keyframes, data: &Value) -> Arc<ChannelAnimations> {
        self.resolve_key(KeyframeKey::new(spec, data), spec, data)
    }

    fn resolve_key(
        &mut self,
        key: KeyframeKey,
        spec: &Keyframes,
        data: &Value,
    ) -> Arc<ChannelAnimations> {
        if let Some(entry) = self.entries.get(&key) {
            self.hits += 1;
            return Arc::clone(&entry.animations);
        }

        self.misses += 1;
        tracing::trace!("keyframe cache miss (spec {:#x})", key.identity);
        let animations = Arc::new(ChannelAnimations::from_timeline(&spec.resolve(data)));
        self.entries.put(
            key,
            CacheEntry {
                _spec: spec.clone(),
                animations: Arc::clone(&animations),
            },
        );
        animations
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for KeyframeCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Single-slot memo for one consumer
///
/// Re-derives only when the specification identity or the data snapshot
/// changes.
#[derive(Clone, Default)]
pub struct KeyframeMemo {
    key: Option<KeyframeKey>,
    animations: Arc<ChannelAnimations>,
}

impl KeyframeMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh against `(spec, data)`, returning whether the animations changed
    pub fn refresh(&mut self, spec: &Keyframes, data: &Value, cache: &mut KeyframeCache) -> bool {
        let key = KeyframeKey::new(spec, data);
        if self.key.as_ref() == Some(&key) {
            return false;
        }
        self.animations = cache.resolve_key(key.clone(), spec, data);
        self.key = Some(key);
        true
    }

    pub fn animations(&self) -> &Arc<ChannelAnimations> {
        &self.animations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::keyframe::{KeyframeMap, StyleFrame};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_spec(calls: Arc<AtomicUsize>) -> Keyframes {
        Keyframes::computed(move |ctx| {
            calls.fetch_add(1, Ordering::SeqCst);
            let offset = ctx.data["x"].as_f64().unwrap_or(0.0) as f32;
            KeyframeMap::new().at(0.0, StyleFrame::new().with(Channel::TranslateX, offset))
        })
    }

    #[test]
    fn test_cache_hits_on_same_spec_and_data() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = counting_spec(calls.clone());
        let mut cache = KeyframeCache::default();

        let a = cache.get_or_resolve(&spec, &json!({ "x": 10 }));
        let b = cache.get_or_resolve(&spec.clone(), &json!({ "x": 10 }));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_structurally_equal_data_hits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = counting_spec(calls.clone());
        let mut cache = KeyframeCache::default();

        cache.get_or_resolve(&spec, &json!({ "x": 1, "y": 2 }));
        cache.get_or_resolve(&spec, &json!({ "y": 2, "x": 1 }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_data_change_resolves_again() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = counting_spec(calls.clone());
        let mut cache = KeyframeCache::default();

        let a = cache.get_or_resolve(&spec, &json!({ "x": 1 }));
        let b = cache.get_or_resolve(&spec, &json!({ "x": 2 }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(a.sample(Channel::TranslateX, 0.0).unwrap().value, 1.0);
        assert_eq!(b.sample(Channel::TranslateX, 0.0).unwrap().value, 2.0);
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let spec = Keyframes::empty();
        let mut cache = KeyframeCache::new(2);
        cache.get_or_resolve(&spec, &json!(1));
        cache.get_or_resolve(&spec, &json!(2));
        cache.get_or_resolve(&spec, &json!(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_memo_refreshes_only_on_change() {
        let calls = Arc::new(AtomicUsize::new(0));
        let spec = counting_spec(calls.clone());
        let mut cache = KeyframeCache::default();
        let mut memo = KeyframeMemo::new();

        assert!(memo.refresh(&spec, &json!({ "x": 3 }), &mut cache));
        assert!(!memo.refresh(&spec, &json!({ "x": 3 }), &mut cache));
        assert!(memo.refresh(&spec, &json!({ "x": 4 }), &mut cache));
        assert_eq!(
            memo.animations().sample(Channel::TranslateX, 0.5).unwrap().value,
            4.0
        );

        let other = counting_spec(calls.clone());
        assert!(memo.refresh(&other, &json!({ "x": 4 }), &mut cache));
    }
}
