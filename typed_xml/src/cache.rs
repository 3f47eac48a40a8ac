//! Codec cache
//!
//! Codecs are keyed by primary type only. Auxiliary types influence the first
//! construction for a type and nothing after it: once a codec for `T` is cached,
//! later lookups return it whatever auxiliary types they pass.

use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use error_stack::Report;
use tracing::{debug, info};

use crate::codec::{TypeDescriptor, XmlCodec, XmlValue};
use crate::error::{Error, Result};

type ErasedCodec = Arc<dyn Any + Send + Sync>;

/// Cache identity of a codec: the primary type
#[derive(Debug, Clone, Copy)]
pub struct CodecKey {
    type_id:   TypeId,
    type_name: &'static str,
}

impl CodecKey {
    /// Key for `T`
    pub fn of<T: 'static>() -> Self {
        Self {
            type_id:   TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified name of the primary type
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for CodecKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for CodecKey {}

impl Hash for CodecKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

/// Thread-safe store of constructed codecs
///
/// Entries are created lazily and never evicted. While caching is enabled a codec is
/// constructed at most once per primary type, including under concurrent first use:
/// construction runs while the vacant map entry is held.
pub struct CodecCache {
    codecs:  DashMap<CodecKey, ErasedCodec>,
    enabled: AtomicBool,
    built:   AtomicUsize,
}

impl Default for CodecCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CodecCache {
    /// Create an empty cache with caching enabled
    pub fn new() -> Self {
        Self::with_caching(true)
    }

    /// Create an empty cache with the given caching policy
    pub fn with_caching(enabled: bool) -> Self {
        Self {
            codecs:  DashMap::new(),
            enabled: AtomicBool::new(enabled),
            built:   AtomicUsize::new(0),
        }
    }

    /// Whether newly built codecs are stored
    pub fn caching_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Change the caching policy for future lookups
    ///
    /// Codecs already stored stay in the cache.
    pub fn set_caching_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
        info!("Codec caching {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Number of cached codecs
    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    /// Whether no codec has been cached
    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Whether a codec for `T` is cached
    pub fn contains<T: 'static>(&self) -> bool {
        self.codecs.contains_key(&CodecKey::of::<T>())
    }

    /// Total number of codecs constructed through this cache, cached or not
    pub fn codecs_built(&self) -> usize {
        self.built.load(Ordering::Relaxed)
    }

    /// Return the cached codec for `T`, or build one
    ///
    /// `auxiliary_types` are only used when a codec is built. An existing entry is
    /// returned even while caching is disabled; disabling only stops new entries.
    pub fn resolve<T: XmlValue>(
        &self,
        auxiliary_types: &[TypeDescriptor],
    ) -> Result<Arc<XmlCodec<T>>> {
        let key = CodecKey::of::<T>();

        let cached = self.codecs.get(&key).map(|entry| Arc::clone(entry.value()));
        if let Some(erased) = cached {
            debug!("Retrieving codec {} from cache", key.type_name());
            return downcast(key, erased);
        }

        if !self.caching_enabled() {
            return self.build::<T>(key, auxiliary_types).map(Arc::new);
        }

        match self.codecs.entry(key) {
            Entry::Occupied(entry) => {
                debug!("Retrieving codec {} from cache", key.type_name());
                downcast(key, Arc::clone(entry.get()))
            },
            Entry::Vacant(entry) => {
                let codec = Arc::new(self.build::<T>(key, auxiliary_types)?);
                debug!("Adding codec {} to cache", key.type_name());
                let erased: ErasedCodec = Arc::clone(&codec) as ErasedCodec;
                entry.insert(erased);
                Ok(codec)
            },
        }
    }

    fn build<T: XmlValue>(
        &self,
        key: CodecKey,
        auxiliary_types: &[TypeDescriptor],
    ) -> Result<XmlCodec<T>> {
        info!(
            "Creating codec {} with {} auxiliary type(s)",
            key.type_name(),
            auxiliary_types.len()
        );
        let codec = XmlCodec::<T>::build(auxiliary_types)?;
        self.built.fetch_add(1, Ordering::Relaxed);
        Ok(codec)
    }
}

fn downcast<T: XmlValue>(key: CodecKey, erased: ErasedCodec) -> Result<Arc<XmlCodec<T>>> {
    erased.downcast::<XmlCodec<T>>().map_err(|_| {
        Report::new(Error::InvalidState(format!(
            "cached codec for {} has a different type",
            key.type_name()
        )))
    })
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        #[serde(rename = "X")]
        x: i32,
        #[serde(rename = "Y")]
        y: i32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Circle {
        radius: f64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Square {
        side: f64,
    }

    #[test]
    fn test_key_equality_uses_type_id() {
        assert_eq!(CodecKey::of::<Point>(), CodecKey::of::<Point>());
        assert_ne!(CodecKey::of::<Point>(), CodecKey::of::<Circle>());
        assert!(CodecKey::of::<Point>().type_name().ends_with("Point"));
    }

    #[test]
    fn test_cached_codec_is_shared() {
        let cache = CodecCache::new();
        let first = cache.resolve::<Point>(&[]).expect("first");
        let second = cache.resolve::<Point>(&[]).expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.codecs_built(), 1);
    }

    #[test]
    fn test_auxiliary_types_only_affect_first_construction() {
        let cache = CodecCache::new();
        let first = cache
            .resolve::<Point>(&[TypeDescriptor::of::<Circle>()])
            .expect("first");
        let second = cache
            .resolve::<Point>(&[TypeDescriptor::of::<Square>()])
            .expect("second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            second.auxiliary_types(),
            vec![TypeDescriptor::of::<Circle>()]
        );
    }

    #[test]
    fn test_disabled_cache_builds_fresh_codecs() {
        let cache = CodecCache::with_caching(false);
        let first = cache.resolve::<Point>(&[]).expect("first");
        let second = cache.resolve::<Point>(&[]).expect("second");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.is_empty());
        assert_eq!(cache.codecs_built(), 2);
    }

    #[test]
    fn test_disable_then_enable() {
        let cache = CodecCache::new();
        cache.set_caching_enabled(false);
        let first = cache.resolve::<Point>(&[]).expect("first");
        let second = cache.resolve::<Point>(&[]).expect("second");
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(!cache.contains::<Point>());

        cache.set_caching_enabled(true);
        let third = cache.resolve::<Point>(&[]).expect("third");
        assert!(cache.contains::<Point>());
        assert!(!Arc::ptr_eq(&third, &first));
        assert!(!Arc::ptr_eq(&third, &second));
        assert!(Arc::ptr_eq(
            &third,
            &cache.resolve::<Point>(&[]).expect("fourth")
        ));
    }

    #[test]
    fn test_disabling_keeps_existing_entries() {
        let cache = CodecCache::new();
        let cached = cache.resolve::<Point>(&[]).expect("cached");
        cache.set_caching_enabled(false);
        assert!(cache.contains::<Point>());
        let again = cache.resolve::<Point>(&[]).expect("again");
        assert!(Arc::ptr_eq(&cached, &again));
    }

    #[test]
    fn test_construction_failure_is_not_cached() {
        let cache = CodecCache::new();
        let report = cache.resolve::<i32>(&[]).expect_err("primitive root");
        assert!(report.current_context().is_construction());
        assert!(!cache.contains::<i32>());
        assert_eq!(cache.codecs_built(), 0);
    }

    #[test]
    fn test_concurrent_first_use_builds_once() {
        let cache = CodecCache::new();
        let codecs: Vec<Arc<XmlCodec<Point>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| cache.resolve::<Point>(&[]).expect("resolve")))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("join"))
                .collect()
        });
        assert_eq!(cache.codecs_built(), 1);
        assert!(codecs.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }
}
