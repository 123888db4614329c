// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tiling-planner
//!
//! Chooses tile shapes so that every operand of an operator invocation fits
//! its scratchpad.
//!
//! A [`TilingPolicy`] receives the full input, weight and output shapes plus
//! the [`ScratchpadLimits`] of the target and returns a [`TilingConfig`]:
//! one tile shape per operand and the [`TilingDims`] strategy used for each.
//! Failure to find any fitting tile is a [`TilingError`] raised before any
//! data moves.
//!
//! # Example
//! ```
//! use memory_manager::MemoryBudget;
//! use tensor_core::Shape;
//! use tiling_planner::{ChannelWise, ScratchpadLimits, TilingDims, TilingPolicy};
//!
//! let limits = ScratchpadLimits::uniform(MemoryBudget::parse("32K").unwrap(), 2, 8, 8);
//! let inputs = Shape::nhwc(1, 16, 16, 128, 8);
//! let weights = Shape::nc(4, 128, 8);
//!
//! let config = ChannelWise::new()
//!     .compute_tile_shapes(&inputs, Some(&weights), &inputs, &limits)
//!     .unwrap();
//! assert_eq!(config.inputs.dims(), &[1, 16, 16, 64]);
//! assert_eq!(config.input_dims, TilingDims::DimNC);
//! ```

pub mod config;
mod error;
mod limits;
pub mod strategy;

pub use config::{tile_count, TilingConfig, TilingDims};
pub use error::TilingError;
pub use limits::{OperandRole, ScratchpadLimits};
pub use strategy::{ChannelWise, InnerProduct, TilingPolicy};
