// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Tensor descriptors for scratchpad tiling.
//!
//! This crate provides:
//! - [`Shape`] and [`Layout`]: logical dimensions plus innermost-dimension
//!   alignment padding.
//! - [`IndexCursor`]: a multi-dimensional cursor over a region of a tensor
//!   that reports padded storage offsets.
//! - [`Tensor`]: a named, byte-backed tensor, optionally leasing its storage
//!   from a [`memory_manager::MemoryPool`].
//! - [`DType`]: element types (f32, f16, bf16, i8).
//!
//! Nothing here interprets element values except the `f32` helpers used by
//! reference kernels and tests; copying and tiling work on bytes.

mod cursor;
mod dtype;
mod error;
mod shape;
mod tensor;

pub use cursor::IndexCursor;
pub use dtype::DType;
pub use error::TensorError;
pub use shape::{calc_padding, Layout, Shape};
pub use tensor::{Storage, Tensor};
