// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool counters.

/// Cumulative counters for a [`MemoryPool`](crate::MemoryPool).
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AllocationStats {
    /// Allocation requests, including rejected ones.
    pub total_allocations: u64,
    /// Requests served from the free list.
    pub cache_hits: u64,
    /// Requests that needed a fresh buffer.
    pub cache_misses: u64,
    /// Requests rejected by the budget.
    pub oom_count: u64,
    /// High-water mark of live bytes.
    pub peak_allocated_bytes: usize,
    /// Buffers handed back to the pool.
    pub total_deallocations: u64,
    /// Cached buffers dropped to keep live plus cached bytes in budget.
    pub free_list_evictions: u64,
}

impl AllocationStats {
    /// Fraction of successful allocations served from the free list.
    pub fn cache_hit_ratio(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64
    }

    /// Number of leases not yet returned.
    pub fn live_allocations(&self) -> u64 {
        (self.cache_hits + self.cache_misses).saturating_sub(self.total_deallocations)
    }

    pub(crate) fn record_cache_hit(&mut self) {
        self.total_allocations += 1;
        self.cache_hits += 1;
    }

    pub(crate) fn record_cache_miss(&mut self) {
        self.total_allocations += 1;
        self.cache_misses += 1;
    }

    pub(crate) fn record_oom(&mut self) {
        self.total_allocations += 1;
        self.oom_count += 1;
    }

    pub(crate) fn record_deallocation(&mut self) {
        self.total_deallocations += 1;
    }

    pub(crate) fn record_evictions(&mut self, count: u64) {
        self.free_list_evictions += count;
    }

    pub(crate) fn update_peak(&mut self, current_bytes: usize) {
        self.peak_allocated_bytes = self.peak_allocated_bytes.max(current_bytes);
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "pool: {} requests ({} reused, {} fresh, {:.0}% reuse), {} rejected, \
             peak {} bytes, {} live, {} evicted",
            self.total_allocations,
            self.cache_hits,
            self.cache_misses,
            self.cache_hit_ratio() * 100.0,
            self.oom_count,
            self.peak_allocated_bytes,
            self.live_allocations(),
            self.free_list_evictions,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = AllocationStats::default();
        assert_eq!(s.total_allocations, 0);
        assert_eq!(s.cache_hit_ratio(), 0.0);
        assert_eq!(s.live_allocations(), 0);
    }

    #[test]
    fn test_hit_ratio_and_live() {
        let mut s = AllocationStats::default();
        s.record_cache_hit();
        s.record_cache_hit();
        s.record_cache_miss();
        s.record_deallocation();
        assert!((s.cache_hit_ratio() - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(s.live_allocations(), 2);
    }

    #[test]
    fn test_oom_counts_as_request() {
        let mut s = AllocationStats::default();
        s.record_oom();
        assert_eq!(s.total_allocations, 1);
        assert_eq!(s.live_allocations(), 0);
    }

    #[test]
    fn test_peak_never_decreases() {
        let mut s = AllocationStats::default();
        s.update_peak(100);
        s.update_peak(50);
        assert_eq!(s.peak_allocated_bytes, 100);
    }

    #[test]
    fn test_summary() {
        let mut s = AllocationStats::default();
        s.record_cache_miss();
        s.record_cache_hit();
        let summary = s.summary();
        assert!(summary.contains("2 requests"));
        assert!(summary.contains("1 reused"));
        assert!(summary.contains("1 fresh"));
    }
}
