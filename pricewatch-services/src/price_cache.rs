//! Price Cache
//!
//! In-memory store of the last resolved reading per (asset, currency).
//! Expiry is checked lazily on read; there is no background sweep. Expired
//! entries are kept so the resolver can still report a last known price
//! when every upstream source is down.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pricewatch_core::PriceReading;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Default freshness window, matching the scheduler interval (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// Cached reading with its expiry
#[derive(Debug, Clone)]
struct CacheEntry {
    reading: PriceReading,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Result of a cache lookup that distinguishes stale from missing
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Fresh(PriceReading),
    /// Present but past its expiry
    Stale(PriceReading),
    Absent,
}

/// TTL-bounded price cache
#[derive(Debug, Default)]
pub struct PriceCache {
    entries: RwLock<HashMap<(String, String), CacheEntry>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh reading for the pair, if any. Never triggers a fetch.
    pub fn get(&self, asset_id: &str, currency: &str) -> Option<PriceReading> {
        match self.lookup(asset_id, currency) {
            CacheLookup::Fresh(reading) => Some(reading),
            _ => None,
        }
    }

    /// Look up the pair, reporting whether the entry is fresh or stale
    pub fn lookup(&self, asset_id: &str, currency: &str) -> CacheLookup {
        self.lookup_at(asset_id, currency, Utc::now())
    }

    fn lookup_at(&self, asset_id: &str, currency: &str, now: DateTime<Utc>) -> CacheLookup {
        let read_cache = self.entries.read();
        match read_cache.get(&(asset_id.to_string(), currency.to_string())) {
            Some(entry) if entry.is_fresh_at(now) => CacheLookup::Fresh(entry.reading.clone()),
            Some(entry) => CacheLookup::Stale(entry.reading.clone()),
            None => CacheLookup::Absent,
        }
    }

    /// Last stored reading regardless of expiry
    pub fn last_known(&self, asset_id: &str, currency: &str) -> Option<PriceReading> {
        self.entries
            .read()
            .get(&(asset_id.to_string(), currency.to_string()))
            .map(|entry| entry.reading.clone())
    }

    /// Store a reading, replacing any previous entry for its pair
    pub fn put(&self, reading: PriceReading, ttl: Duration) {
        self.put_at(reading, ttl, Utc::now());
    }

    fn put_at(&self, reading: PriceReading, ttl: Duration, now: DateTime<Utc>) {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let key = (reading.asset_id().to_string(), reading.currency().to_string());
        self.entries
            .write()
            .insert(key, CacheEntry { reading, expires_at });
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let read_cache = self.entries.read();

        let total = read_cache.len();
        let fresh = read_cache.values().filter(|e| e.is_fresh_at(now)).count();
        let oldest = read_cache.values().map(|e| e.reading.observed_at()).min();

        CacheStats {
            total,
            fresh,
            stale: total - fresh,
            oldest_reading: oldest,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total: usize,
    pub fresh: usize,
    pub stale: usize,
    pub oldest_reading: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn reading(asset: &str, price: Decimal) -> PriceReading {
        PriceReading::new(asset, "usd", price, Utc::now(), "test").unwrap()
    }

    #[test]
    fn test_get_within_ttl() {
        let cache = PriceCache::new();
        cache.put(reading("solana", dec!(140)), Duration::from_secs(300));

        let cached = cache.get("solana", "usd").unwrap();
        assert_eq!(cached.price(), dec!(140));
        assert!(cache.get("solana", "eur").is_none());
        assert!(cache.get("bitcoin", "usd").is_none());
    }

    #[test]
    fn test_expired_entry_is_stale_but_retrievable() {
        let cache = PriceCache::new();
        let now = Utc::now();
        cache.put_at(reading("solana", dec!(140)), Duration::from_secs(60), now);

        let later = now + chrono::Duration::seconds(60) + chrono::Duration::milliseconds(1);
        assert!(matches!(
            cache.lookup_at("solana", "usd", later),
            CacheLookup::Stale(_)
        ));
        assert!(matches!(
            cache.lookup_at("solana", "usd", now + chrono::Duration::seconds(59)),
            CacheLookup::Fresh(_)
        ));
        assert_eq!(cache.last_known("solana", "usd").unwrap().price(), dec!(140));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = PriceCache::new();
        cache.put(reading("cardano", dec!(0.45)), Duration::ZERO);

        assert!(cache.get("cardano", "usd").is_none());
        assert!(matches!(cache.lookup("cardano", "usd"), CacheLookup::Stale(_)));
        assert!(cache.last_known("cardano", "usd").is_some());
    }

    #[test]
    fn test_absent_entry() {
        let cache = PriceCache::new();
        assert_eq!(cache.lookup("ethereum", "usd"), CacheLookup::Absent);
        assert!(cache.last_known("ethereum", "usd").is_none());
    }

    #[test]
    fn test_put_replaces_whole_entry() {
        let cache = PriceCache::new();
        cache.put(reading("solana", dec!(140)), Duration::ZERO);
        cache.put(reading("solana", dec!(151)), Duration::from_secs(300));

        assert_eq!(cache.get("solana", "usd").unwrap().price(), dec!(151));

        let stats = cache.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.fresh, 1);
        assert_eq!(stats.stale, 0);
    }

    #[test]
    fn test_concurrent_readers_see_whole_entries() {
        let cache = Arc::new(PriceCache::new());
        cache.put(reading("bitcoin", dec!(1)), Duration::from_secs(300));

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 1..500 {
                    let price = Decimal::from(i);
                    let r = PriceReading::new("bitcoin", "usd", price, Utc::now(), format!("src-{}", i))
                        .unwrap();
                    cache.put(r, Duration::from_secs(300));
                }
            })
        };

        for _ in 0..500 {
            let r = cache.get("bitcoin", "usd").unwrap();
            // price and source are written together
            if r.price() > dec!(1) {
                assert_eq!(r.source(), format!("src-{}", r.price()));
            }
        }

        writer.join().unwrap();
    }
}
