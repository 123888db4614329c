// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tile-engine
//!
//! Moves tensor data between whole tensors and scratchpad-sized tiles.
//!
//! - [`copy`]: region and linear copies that issue the longest contiguous
//!   byte runs the two layouts allow.
//! - [`tiled`]: tile grid generation with halo, stride and trailing-tile
//!   padding, plus [`untile`] and [`flatten`].
//! - [`transform`]: concatenation and 2-D transposition for weight packing.
//! - [`Workspace`]: the named tensor registry every tile is allocated
//!   through.
//!
//! # Example
//! ```
//! use memory_manager::MemoryBudget;
//! use tensor_core::{DType, Shape, Tensor};
//! use tile_engine::{generate_and_fill, untile, TileOptions, Workspace};
//!
//! let ws = Workspace::new(MemoryBudget::parse("1M").unwrap());
//! let values: Vec<f32> = (0..16 * 16 * 128).map(|i| i as f32).collect();
//! let src = Tensor::from_f32("act", Shape::nhwc(1, 16, 16, 128, 8), &values).unwrap();
//!
//! let tiled = generate_and_fill(&src, &Shape::nhwc(1, 16, 16, 64, 8), &TileOptions::default(), &ws)
//!     .unwrap();
//! assert_eq!(tiled.len(), 2);
//!
//! let mut back = Tensor::zeros("back", src.shape().clone(), DType::F32);
//! untile(&tiled, &mut back).unwrap();
//! assert_eq!(back.as_bytes(), src.as_bytes());
//! ```

pub mod copy;
mod error;
pub mod tiled;
pub mod transform;
mod workspace;

pub use copy::{copy_linear, copy_region, copy_region_raw, validate_region};
pub use error::TileError;
pub use tiled::{
    flatten, generate_and_fill, generate_tiles, untile, PaddingPolicy, Tile, TileOptions,
    TiledTensor,
};
pub use transform::{concat_tensors, transpose_2d};
pub use workspace::Workspace;
