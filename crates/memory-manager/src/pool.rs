// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Budget-enforced buffer pool.
//!
//! The [`MemoryPool`] hands out zeroed buffers for tensors and tiles:
//!
//! 1. Live bytes never exceed the budget; a request that would cross it
//!    fails with [`MemoryError::OutOfMemory`].
//! 2. Returned buffers are kept on a free list keyed by exact length and
//!    re-zeroed on reuse, so regenerating the same tile grid does not touch
//!    the system allocator again. Cached bytes count against the budget
//!    too: live plus cached never exceeds it, and cached buffers are
//!    evicted to make room for a fresh allocation.
//! 3. Hit/miss/peak counters are kept in [`AllocationStats`].
//!
//! The pool is `Send + Sync`; guards carry an `Arc` to the shared state.

use crate::{AllocationStats, BufferGuard, MemoryBudget, MemoryError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// State shared by the pool and every outstanding [`BufferGuard`].
pub struct PoolInner {
    budget: MemoryBudget,
    allocated_bytes: AtomicUsize,
    free_buffers: Mutex<HashMap<usize, Vec<Vec<u8>>>>,
    free_list_bytes: AtomicUsize,
    stats: Mutex<AllocationStats>,
}

impl PoolInner {
    /// Called from `BufferGuard::drop`.
    pub(crate) fn return_buffer(&self, buffer: Vec<u8>) {
        let len = buffer.len();
        let live = self.allocated_bytes.fetch_sub(len, Ordering::AcqRel) - len;
        let mut evicted = 0;
        if let Ok(mut free) = self.free_buffers.lock() {
            let cached = self.free_list_bytes.load(Ordering::Acquire);
            if live + cached + len <= self.budget.as_bytes() {
                free.entry(len).or_default().push(buffer);
                self.free_list_bytes.fetch_add(len, Ordering::AcqRel);
            } else {
                evicted = 1;
            }
        }
        if let Ok(mut stats) = self.stats.lock() {
            stats.record_deallocation();
            stats.record_evictions(evicted);
        }
    }

    /// Drops cached buffers until at most `allowance` bytes remain cached.
    fn trim_free(&self, allowance: usize) -> u64 {
        let Ok(mut free) = self.free_buffers.lock() else {
            return 0;
        };
        let mut evicted = 0;
        while self.free_list_bytes.load(Ordering::Acquire) > allowance {
            let Some(&len) = free.keys().next() else {
                break;
            };
            if let Some(list) = free.get_mut(&len) {
                if list.pop().is_some() {
                    self.free_list_bytes.fetch_sub(len, Ordering::AcqRel);
                    evicted += 1;
                }
                if list.is_empty() {
                    free.remove(&len);
                }
            }
        }
        evicted
    }

    fn take_free(&self, size_bytes: usize) -> Option<Vec<u8>> {
        let mut free = self.free_buffers.lock().ok()?;
        let list = free.get_mut(&size_bytes)?;
        let mut buf = list.pop()?;
        if list.is_empty() {
            free.remove(&size_bytes);
        }
        self.free_list_bytes.fetch_sub(size_bytes, Ordering::AcqRel);
        buf.fill(0);
        Some(buf)
    }
}

/// Allocator for tensor and tile storage.
///
/// # Example
/// ```
/// use memory_manager::{MemoryPool, MemoryBudget};
///
/// let pool = MemoryPool::new(MemoryBudget::from_kb(4));
/// let guard = pool.allocate(1024).unwrap();
/// assert_eq!(pool.available_bytes(), 3 * 1024);
/// drop(guard);
/// assert_eq!(pool.available_bytes(), 4 * 1024);
/// ```
#[derive(Clone)]
pub struct MemoryPool {
    inner: Arc<PoolInner>,
}

impl MemoryPool {
    /// Creates a pool that never holds more than `budget` live bytes.
    pub fn new(budget: MemoryBudget) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                budget,
                allocated_bytes: AtomicUsize::new(0),
                free_buffers: Mutex::new(HashMap::new()),
                free_list_bytes: AtomicUsize::new(0),
                stats: Mutex::new(AllocationStats::default()),
            }),
        }
    }

    /// Leases a zeroed buffer of exactly `size_bytes`.
    pub fn allocate(&self, size_bytes: usize) -> Result<BufferGuard, MemoryError> {
        if size_bytes == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }

        let budget = self.inner.budget.as_bytes();
        let reserved = self
            .inner
            .allocated_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                current
                    .checked_add(size_bytes)
                    .filter(|&next| next <= budget)
            });

        let current = match reserved {
            Ok(previous) => previous + size_bytes,
            Err(current) => {
                if let Ok(mut stats) = self.inner.stats.lock() {
                    stats.record_oom();
                }
                tracing::debug!(
                    requested = size_bytes,
                    live = current,
                    budget,
                    "pool allocation rejected"
                );
                return Err(MemoryError::OutOfMemory {
                    requested_bytes: size_bytes,
                    available_bytes: budget.saturating_sub(current),
                    budget_bytes: budget,
                });
            }
        };

        let reused = self.inner.take_free(size_bytes);
        let is_hit = reused.is_some();
        let evicted = if is_hit {
            0
        } else {
            self.inner.trim_free(budget.saturating_sub(current))
        };
        let data = reused.unwrap_or_else(|| vec![0u8; size_bytes]);

        if let Ok(mut stats) = self.inner.stats.lock() {
            if is_hit {
                stats.record_cache_hit();
            } else {
                stats.record_cache_miss();
            }
            stats.record_evictions(evicted);
            stats.update_peak(current);
        }

        Ok(BufferGuard::new(data, Arc::clone(&self.inner)))
    }

    /// Live (leased, not yet returned) bytes.
    pub fn allocated_bytes(&self) -> usize {
        self.inner.allocated_bytes.load(Ordering::Acquire)
    }

    /// Bytes that may still be leased before hitting the budget.
    pub fn available_bytes(&self) -> usize {
        self.inner
            .budget
            .as_bytes()
            .saturating_sub(self.allocated_bytes())
    }

    /// The pool's budget.
    pub fn budget(&self) -> MemoryBudget {
        self.inner.budget
    }

    /// Snapshot of the allocation counters.
    pub fn stats(&self) -> AllocationStats {
        self.inner
            .stats
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Drops every cached free buffer. Live leases are unaffected.
    pub fn shrink(&self) {
        if let Ok(mut free) = self.inner.free_buffers.lock() {
            free.clear();
            self.inner.free_list_bytes.store(0, Ordering::Release);
        }
    }

    /// Bytes parked on the free list.
    pub fn free_list_bytes(&self) -> usize {
        self.inner.free_list_bytes.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for MemoryPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPool")
            .field("budget", &self.inner.budget)
            .field("allocated_bytes", &self.allocated_bytes())
            .field("free_list_bytes", &self.free_list_bytes())
            .finish()
    }
}
