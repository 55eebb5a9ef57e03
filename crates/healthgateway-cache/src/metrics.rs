//! Cache hit/miss counters.

use ::metrics::{counter, gauge};

pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "healthgateway_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "healthgateway_cache_misses_total";
    pub const CACHE_ENTRIES: &str = "healthgateway_cache_entries";
}

/// Record a cache hit on `tier` ("L1" or "L2").
pub fn record_cache_hit(tier: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "tier" => tier).increment(1);
}

/// Record a cache miss.
pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// Set the number of L1 entries.
pub fn set_cache_entries(count: usize) {
    gauge!(names::CACHE_ENTRIES, "tier" => "L1").set(count as f64);
}
