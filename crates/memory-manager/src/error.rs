// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for budgets and the buffer pool.

/// Errors raised while parsing budgets or leasing buffers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Leasing the buffer would push live allocations past the budget.
    #[error("out of memory: requested {requested_bytes} bytes, only {available_bytes} available (budget: {budget_bytes})")]
    OutOfMemory {
        requested_bytes: usize,
        available_bytes: usize,
        budget_bytes: usize,
    },

    /// Zero-byte buffers are never handed out.
    #[error("cannot allocate zero-sized buffer")]
    ZeroSizedAllocation,

    /// A budget string could not be parsed.
    #[error("invalid budget '{input}': {reason}")]
    InvalidBudget { input: String, reason: String },
}
