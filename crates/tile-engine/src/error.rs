// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for copying, tiling and the workspace.

use tensor_core::{DType, TensorError};

/// Errors raised by tile generation, reassembly and the workspace.
///
/// `generate_tiles` reports its configuration errors (rank, tile size,
/// step) before any tile buffer is allocated. `untile` and `flatten` check
/// their destination against tiles that already exist.
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    /// Two shapes or option vectors disagree on rank.
    #[error("rank mismatch for {what}: expected {expected}, got {actual}")]
    RankMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A tile dimension exceeds the source dimension.
    #[error("tile dimension {dim} is {tile}, larger than the source's {size}")]
    TileLargerThanSource { dim: usize, tile: usize, size: usize },

    /// A tile dimension is zero.
    #[error("tile dimension {dim} is zero")]
    EmptyTile { dim: usize },

    /// Halo and stride leave no forward progress along a dimension.
    #[error("tile step along dimension {dim} is not positive (tile {tile}, halo {halo}, stride {stride})")]
    NonPositiveStep {
        dim: usize,
        tile: usize,
        halo: usize,
        stride: usize,
    },

    /// A copy region falls outside one of its tensors.
    #[error("{which} region [{origin}, {origin}+{extent}) exceeds dimension {dim} of size {size}")]
    RegionOutOfBounds {
        which: &'static str,
        dim: usize,
        origin: usize,
        extent: usize,
        size: usize,
    },

    /// Element types of two tensors differ.
    #[error("dtype mismatch: expected {expected}, got {actual}")]
    DTypeMismatch { expected: DType, actual: DType },

    /// Concatenation inputs disagree outside the concatenation dimension.
    #[error("cannot concatenate '{name}' along dimension {dim}: shape {actual} does not match {expected}")]
    ConcatMismatch {
        name: String,
        dim: usize,
        expected: String,
        actual: String,
    },

    /// Concatenation was asked to join nothing.
    #[error("concatenation needs at least one input")]
    EmptyConcat,

    /// A linear destination is too small.
    #[error("destination holds {available} elements, {required} required")]
    DestinationTooSmall { required: usize, available: usize },

    /// A tensor name is already registered.
    #[error("tensor '{0}' already exists in the workspace")]
    DuplicateTensor(String),

    /// A tensor name is not registered.
    #[error("tensor '{0}' not found in the workspace")]
    TensorNotFound(String),

    /// Underlying tensor error (allocation, buffer size).
    #[error(transparent)]
    Tensor(#[from] TensorError),
}
