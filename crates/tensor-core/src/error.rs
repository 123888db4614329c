// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for tensor construction and access.

use crate::{DType, Shape};

/// Errors raised by [`crate::Tensor`] and friends.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A byte buffer does not match the shape's storage size.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch { expected: usize, actual: usize },

    /// Two shapes are incompatible for the requested operation.
    #[error("incompatible shapes for {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The operation does not support the tensor's element type.
    #[error("unsupported dtype {dtype} for {op}")]
    UnsupportedDType { op: &'static str, dtype: DType },

    /// A position lies outside the tensor's logical extent.
    #[error("position {position:?} out of bounds for shape {shape}")]
    IndexOutOfBounds { position: Vec<usize>, shape: Shape },

    /// A dtype label could not be parsed.
    #[error("unknown dtype '{0}'")]
    UnknownDType(String),

    /// Leasing storage from the pool failed.
    #[error("storage allocation for '{name}' failed: {source}")]
    Allocation {
        name: String,
        #[source]
        source: memory_manager::MemoryError,
    },
}
