// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the tiled-execution runtime.

use crate::driver::{KernelError, OpKind};
use tensor_core::DType;

/// Errors that can occur while declaring, planning or running an operator.
///
/// Everything except [`RuntimeError::Kernel`] is raised before the first
/// kernel invocation.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The backend configuration is unusable.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// An operator's tensors are missing or inconsistent.
    #[error("invalid operator '{op}': {detail}")]
    InvalidOperator { op: String, detail: String },

    /// A tensor's element type differs from the backend's.
    #[error("tensor '{name}' is {actual}, backend expects {expected}")]
    DTypeMismatch {
        name: String,
        expected: DType,
        actual: DType,
    },

    /// Inputs and weights are split into different numbers of reduction
    /// tiles and the inputs are not stationary.
    #[error("reduction tile count mismatch: {input_tiles} input tiles, {weight_tiles} weight tiles")]
    TileCountMismatch {
        input_tiles: usize,
        weight_tiles: usize,
    },

    /// An input tile's channels are not covered by a single weight tile.
    #[error("no weight tile covers channels {start}..{end}")]
    ChannelRangeUncovered { start: usize, end: usize },

    /// A tile expected from the grid is missing.
    #[error("tile {index:?} missing from '{tensor}'")]
    MissingTile { tensor: String, index: Vec<usize> },

    /// A compute kernel reported a failure.
    #[error("{op} kernel failed: {source}")]
    Kernel {
        op: OpKind,
        #[source]
        source: KernelError,
    },

    /// Tile generation, reassembly or workspace lookup failed.
    #[error("tile error: {0}")]
    TileError(#[from] tile_engine::TileError),

    /// The tiling planner found no usable tile shapes.
    #[error("tiling error: {0}")]
    TilingError(#[from] tiling_planner::TilingError),

    /// Memory budget parsing or allocation failed.
    #[error("memory error: {0}")]
    MemoryError(#[from] memory_manager::MemoryError),

    /// A tensor operation failed.
    #[error("tensor error: {0}")]
    TensorError(#[from] tensor_core::TensorError),
}
