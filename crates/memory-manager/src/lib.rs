// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # memory-manager
//!
//! Byte budgets and a budget-enforced buffer pool for tensors and tiles.
//!
//! Two kinds of capacity show up in a tiled runtime:
//!
//! - the **scratchpad** capacity of each operand role (inputs, weights,
//!   outputs), which bounds the size of a single tile, and
//! - the **host** budget, which bounds how much tile and tensor storage may
//!   be live at once.
//!
//! Both are expressed as a [`MemoryBudget`]. The host budget is enforced by a
//! [`MemoryPool`], which leases zeroed byte buffers wrapped in a
//! [`BufferGuard`]. Dropping the guard hands the buffer back to the pool.
//!
//! # Ownership Model
//!
//! ```text
//! MemoryPool::allocate(size)
//!       │
//!       ▼
//!   BufferGuard  ◄─── owns Vec<u8>, holds Arc<PoolInner>
//!       │
//!       │  drop()
//!       ▼
//!   PoolInner::return_buffer()  ──► free list (keyed by exact size)
//! ```
//!
//! Tiles of one tensor almost always share a handful of distinct sizes, so
//! the free list is keyed by exact byte length rather than by size class.
//!
//! # Example
//! ```
//! use memory_manager::{MemoryPool, MemoryBudget};
//!
//! let pool = MemoryPool::new(MemoryBudget::parse("64K").unwrap());
//!
//! let a = pool.allocate(16 * 1024).unwrap();
//! let b = pool.allocate(8 * 1024).unwrap();
//! assert_eq!(pool.allocated_bytes(), 24 * 1024);
//!
//! drop(a);
//! assert_eq!(pool.allocated_bytes(), 8 * 1024);
//! # drop(b);
//! ```

mod budget;
mod error;
mod guard;
pub mod pool;
mod stats;

pub use budget::MemoryBudget;
pub use error::MemoryError;
pub use guard::BufferGuard;
pub use pool::MemoryPool;
pub use stats::AllocationStats;
