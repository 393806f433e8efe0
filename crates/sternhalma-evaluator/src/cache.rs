use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use crate::genome::Genome;

#[derive(Debug, Clone, Copy)]
struct Entry {
    genome: Genome,
    loaded_at: Instant,
}

/// Holds the latest evolved genome for a limited time.
///
/// Owned by the caller and handed to whoever builds `Evolved` engines. Time
/// is passed in explicitly so expiry can be tested without sleeping.
///
/// # Example
///
/// ```
/// use std::time::{Duration, Instant};
///
/// use sternhalma_evaluator::{cache::EvolvedGenomeCache, genome::Genome};
///
/// let cache = EvolvedGenomeCache::new(Duration::from_secs(60));
/// let now = Instant::now();
/// cache.insert(Genome::default(), now);
/// assert!(cache.get(now + Duration::from_secs(30)).is_some());
/// assert!(cache.get(now + Duration::from_secs(90)).is_none());
/// ```
#[derive(Debug)]
pub struct EvolvedGenomeCache {
    ttl: Duration,
    entry: Mutex<Option<Entry>>,
}

impl Default for EvolvedGenomeCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl EvolvedGenomeCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: Mutex::new(None),
        }
    }

    /// The cached genome, unless it is missing or older than the TTL.
    #[must_use]
    pub fn get(&self, now: Instant) -> Option<Genome> {
        let entry = *self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        entry
            .filter(|e| now.saturating_duration_since(e.loaded_at) < self.ttl)
            .map(|e| e.genome)
    }

    /// Returns the cached genome, calling `load` on a miss and caching what
    /// it returns.
    pub fn get_or_load<F, E>(&self, now: Instant, load: F) -> Result<Option<Genome>, E>
    where
        F: FnOnce() -> Result<Option<Genome>, E>,
    {
        if let Some(genome) = self.get(now) {
            return Ok(Some(genome));
        }
        let loaded = load()?;
        match loaded {
            Some(genome) => self.insert(genome, now),
            None => self.invalidate(),
        }
        Ok(loaded)
    }

    pub fn insert(&self, genome: Genome, now: Instant) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = Some(Entry {
            genome,
            loaded_at: now,
        });
    }

    pub fn invalidate(&self) {
        *self.entry.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn test_get_or_load_only_loads_on_miss() {
        let cache = EvolvedGenomeCache::new(Duration::from_secs(10));
        let now = Instant::now();
        let mut loads = 0;
        for _ in 0..3 {
            let got = cache
                .get_or_load(now, || {
                    loads += 1;
                    Ok::<_, Infallible>(Some(Genome::default()))
                })
                .unwrap();
            assert_eq!(got, Some(Genome::default()));
        }
        assert_eq!(loads, 1);

        let later = now + Duration::from_secs(11);
        let _ = cache
            .get_or_load(later, || {
                loads += 1;
                Ok::<_, Infallible>(None)
            })
            .unwrap();
        assert_eq!(loads, 2);
        assert!(cache.get(later).is_none());
    }

    #[test]
    fn test_invalidate() {
        let cache = EvolvedGenomeCache::default();
        let now = Instant::now();
        cache.insert(Genome::default(), now);
        cache.invalidate();
        assert!(cache.get(now).is_none());
    }

    #[test]
    fn test_load_error_keeps_cache_empty() {
        let cache = EvolvedGenomeCache::default();
        let result = cache.get_or_load(Instant::now(), || Err("unavailable"));
        assert_eq!(result, Err("unavailable"));
        assert!(cache.get(Instant::now()).is_none());
    }
}
