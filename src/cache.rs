// SPDX: CC0-1.0

//! Memoizes compiled expressions by their raw text.
//!
//! Entries expire after a time-to-live and are evicted lazily by the lookup
//! that finds them stale; there is no background sweep.

use crate::classify::Curve;
use chrono::{DateTime, Duration, Utc};
use core::fmt;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::debug;

pub fn default_ttl() -> Duration {
    Duration::minutes(5)
}

pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Debug)]
pub struct Entry {
    pub curve: Curve,
    pub created: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CompileCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl Default for CompileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: default_ttl(),
            clock,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // entries are replaced whole, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, text: &str) -> Option<Entry> {
        let now = self.clock.now();
        let mut entries = self.entries();
        let entry = entries.get(text)?;
        if now - entry.created > self.ttl {
            debug!(text, "evicting expired compile cache entry");
            entries.remove(text);
            return None;
        }
        Some(entry.clone())
    }

    /// Stores `curve` under `text`, replacing any entry and its age.
    pub fn put(&self, text: &str, curve: Curve) {
        let created = self.clock.now();
        self.entries()
            .insert(text.to_string(), Entry { curve, created });
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classify::classify,
        eval::{ParamValues, Scope},
        stdlib::X,
    };

    fn cache() -> (Arc<ManualClock>, CompileCache) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let cache = CompileCache::with_clock(Arc::clone(&clock) as Arc<dyn Clock>);
        (clock, cache)
    }

    fn value_at_two(entry: &Entry) -> f64 {
        match &entry.curve {
            Curve::Function(f) => f
                .evaluate(&Scope::new(&[(X, 2.0)], &ParamValues::new()))
                .unwrap(),
            other => panic!("unexpected kind {:?}", other.kind()),
        }
    }

    #[test]
    fn repeated_lookups_agree() {
        let (_, cache) = cache();
        cache.put("x^2", classify("x^2").unwrap());
        let first = cache.get("x^2").unwrap();
        let second = cache.get("x^2").unwrap();
        assert_eq!(first.created, second.created);
        assert_eq!(value_at_two(&first), value_at_two(&second));
    }

    #[test]
    fn entries_expire_lazily() {
        let (clock, cache) = cache();
        cache.put("x^2", classify("x^2").unwrap());
        clock.advance(Duration::minutes(5));
        assert!(cache.get("x^2").is_some(), "exactly the ttl is still fresh");
        clock.advance(Duration::seconds(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("x^2").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn put_resets_age() {
        let (clock, cache) = cache();
        cache.put("x", classify("x").unwrap());
        clock.advance(Duration::minutes(4));
        cache.put("x", classify("x").unwrap());
        clock.advance(Duration::minutes(4));
        assert!(cache.get("x").is_some());
    }

    #[test]
    fn keys_are_exact_text() {
        let (_, cache) = cache();
        cache.put("x ^ 2", classify("x ^ 2").unwrap());
        assert!(cache.get("x^2").is_none());
        assert!(cache.get("x ^ 2").is_some());
        cache.clear();
        assert!(cache.get("x ^ 2").is_none());
    }
}
