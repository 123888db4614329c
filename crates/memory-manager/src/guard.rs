// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII lease on a pooled buffer.

use crate::pool::PoolInner;
use std::sync::Arc;

/// A zeroed byte buffer leased from a [`MemoryPool`](crate::MemoryPool).
///
/// The buffer is exactly as long as requested. Dropping the guard returns
/// the buffer to the pool's free list and releases its bytes from the
/// budget.
pub struct BufferGuard {
    /// `None` only after `drop` has taken the buffer back.
    data: Option<Vec<u8>>,
    pool: Arc<PoolInner>,
}

impl BufferGuard {
    pub(crate) fn new(data: Vec<u8>, pool: Arc<PoolInner>) -> Self {
        Self {
            data: Some(data),
            pool,
        }
    }

    /// Returns the leased bytes.
    pub fn as_slice(&self) -> &[u8] {
        self.data.as_deref().unwrap_or(&[])
    }

    /// Returns the leased bytes mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.data.as_deref_mut().unwrap_or(&mut [])
    }

    /// Length of the lease in bytes.
    pub fn size_bytes(&self) -> usize {
        self.as_slice().len()
    }
}

impl Drop for BufferGuard {
    fn drop(&mut self) {
        if let Some(buffer) = self.data.take() {
            self.pool.return_buffer(buffer);
        }
    }
}

impl std::fmt::Debug for BufferGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferGuard")
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}
