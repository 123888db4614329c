// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tile grids: cutting a tensor into scratchpad-sized pieces and putting
//! it back together.
//!
//! Along each dimension a tile of size `t` with halo `h` and stride `s`
//! advances by
//!
//! ```text
//! step = t - 2h + (s - 1)
//! ```
//!
//! so that consecutive tiles overlap by exactly the receptive field of a
//! `2h + 1` window moved by `s`. With no halo and unit stride the tiles
//! partition the dimension.

use crate::copy::{copy_linear, copy_region};
use crate::{TileError, Workspace};
use tensor_core::{DType, Shape, Tensor};

/// What happens to the trailing tile of a dimension that does not divide
/// evenly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaddingPolicy {
    /// Shrink the trailing tile to the remaining span.
    #[default]
    Clip,
    /// Keep the nominal tile size; elements past the source are zero.
    ZeroFill,
}

/// Halo, stride and padding for tile generation.
///
/// Empty `halo` or `stride` vectors mean zero halo and unit stride in
/// every dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileOptions {
    pub halo: Vec<usize>,
    pub stride: Vec<usize>,
    pub padding: PaddingPolicy,
}

impl TileOptions {
    pub fn with_halo(mut self, halo: impl Into<Vec<usize>>) -> Self {
        self.halo = halo.into();
        self
    }

    pub fn with_stride(mut self, stride: impl Into<Vec<usize>>) -> Self {
        self.stride = stride.into();
        self
    }

    pub fn with_padding(mut self, padding: PaddingPolicy) -> Self {
        self.padding = padding;
        self
    }

    fn halo(&self, dim: usize) -> usize {
        self.halo.get(dim).copied().unwrap_or(0)
    }

    fn stride(&self, dim: usize) -> usize {
        self.stride.get(dim).copied().unwrap_or(1)
    }
}

/// One tile and where it came from.
#[derive(Debug)]
pub struct Tile {
    /// Tile storage, independent of the source.
    pub tensor: Tensor,
    /// Position of element 0 of the tile in the source.
    pub origin: Vec<usize>,
    /// Halo along each dimension.
    pub halo: Vec<usize>,
    /// Part of the tile that lies inside the source.
    pub extent: Vec<usize>,
}

/// A tensor cut into a grid of tiles, stored in row-major grid order.
#[derive(Debug)]
pub struct TiledTensor {
    source_name: String,
    source_shape: Shape,
    dtype: DType,
    grid: Shape,
    tiles: Vec<Tile>,
}

impl TiledTensor {
    /// Name of the tensor the tiles were cut from.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Shape of the untiled tensor.
    pub fn source_shape(&self) -> &Shape {
        &self.source_shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Tile count per dimension.
    pub fn grid(&self) -> &Shape {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Row-major position of a grid index.
    pub fn linear_index(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.grid.rank() || index.iter().zip(self.grid.dims()).any(|(i, g)| i >= g)
        {
            return None;
        }
        Some(
            index
                .iter()
                .zip(self.grid.dims())
                .fold(0, |acc, (i, g)| acc * g + i),
        )
    }

    /// Tile at a grid index.
    pub fn tile(&self, index: &[usize]) -> Option<&Tile> {
        let i = self.linear_index(index)?;
        self.tiles.get(i)
    }

    pub fn tile_mut(&mut self, index: &[usize]) -> Option<&mut Tile> {
        let i = self.linear_index(index)?;
        self.tiles.get_mut(i)
    }

    /// Tile at a row-major position.
    pub fn get(&self, linear: usize) -> Option<&Tile> {
        self.tiles.get(linear)
    }

    pub fn get_mut(&mut self, linear: usize) -> Option<&mut Tile> {
        self.tiles.get_mut(linear)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tile> {
        self.tiles.iter()
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles
    }

    /// Combined storage of every tile, in bytes.
    pub fn size_bytes(&self) -> usize {
        self.tiles.iter().map(|t| t.tensor.size_bytes()).sum()
    }
}

/// Per-dimension step, with configuration checks.
fn tile_step(
    dim: usize,
    size: usize,
    tile: usize,
    halo: usize,
    stride: usize,
) -> Result<usize, TileError> {
    if tile == 0 {
        return Err(TileError::EmptyTile { dim });
    }
    if tile > size {
        return Err(TileError::TileLargerThanSource { dim, tile, size });
    }
    let forward = tile + stride;
    let backward = 2 * halo + 1;
    if stride == 0 || forward <= backward {
        return Err(TileError::NonPositiveStep {
            dim,
            tile,
            halo,
            stride,
        });
    }
    Ok(forward - backward)
}

/// Number of tiles along one dimension.
///
/// One tile when the dimension fits, otherwise enough steps to cover the
/// remainder. Tiles whose origin would fall past the end are never emitted.
pub fn tiles_along(size: usize, tile: usize, step: usize) -> usize {
    if size <= tile {
        return 1;
    }
    let needed = 1 + (size - tile).div_ceil(step);
    needed.min(size.div_ceil(step))
}

/// Cuts `source` into a grid of zeroed tiles leased from `workspace`.
///
/// Tile `i` (row-major) is named `"{source}/tile:{i}"`. The tile tensors
/// keep the source's layout and alignment. All configuration checks run
/// before the first allocation.
pub fn generate_tiles(
    source: &Tensor,
    tile_shape: &Shape,
    options: &TileOptions,
    workspace: &Workspace,
) -> Result<TiledTensor, TileError> {
    let shape = source.shape();
    let rank = shape.rank();
    for (what, actual) in [
        ("tile shape", tile_shape.rank()),
        ("halo", if options.halo.is_empty() { rank } else { options.halo.len() }),
        ("stride", if options.stride.is_empty() { rank } else { options.stride.len() }),
    ] {
        if actual != rank {
            return Err(TileError::RankMismatch {
                what,
                expected: rank,
                actual,
            });
        }
    }

    let mut steps = Vec::with_capacity(rank);
    let mut counts = Vec::with_capacity(rank);
    for dim in 0..rank {
        let step = tile_step(
            dim,
            shape[dim],
            tile_shape[dim],
            options.halo(dim),
            options.stride(dim),
        )?;
        counts.push(tiles_along(shape[dim], tile_shape[dim], step));
        steps.push(step);
    }
    let grid = Shape::unaligned(counts, shape.layout());

    tracing::debug!(
        source = source.name(),
        shape = %shape,
        tile = %tile_shape,
        grid = %grid,
        "generating tiles"
    );

    let halo: Vec<usize> = (0..rank).map(|d| options.halo(d)).collect();
    let mut tiles = Vec::with_capacity(grid.num_elements());
    for (linear, grid_pos) in grid_positions(&grid).enumerate() {
        let origin: Vec<usize> = grid_pos.iter().zip(&steps).map(|(k, s)| k * s).collect();
        let extent: Vec<usize> = (0..rank)
            .map(|d| tile_shape[d].min(shape[d] - origin[d]))
            .collect();
        let dims = match options.padding {
            PaddingPolicy::Clip => extent.clone(),
            PaddingPolicy::ZeroFill => tile_shape.dims().to_vec(),
        };
        let tensor = workspace.allocate(
            format!("{}/tile:{}", source.name(), linear),
            shape.with_dims(dims),
            source.dtype(),
        )?;
        tiles.push(Tile {
            tensor,
            origin,
            halo: halo.clone(),
            extent,
        });
    }

    Ok(TiledTensor {
        source_name: source.name().to_string(),
        source_shape: shape.clone(),
        dtype: source.dtype(),
        grid,
        tiles,
    })
}

/// Like [`generate_tiles`], then copies each tile's region of `source` in.
pub fn generate_and_fill(
    source: &Tensor,
    tile_shape: &Shape,
    options: &TileOptions,
    workspace: &Workspace,
) -> Result<TiledTensor, TileError> {
    let mut tiled = generate_tiles(source, tile_shape, options, workspace)?;
    for tile in &mut tiled.tiles {
        let zero = vec![0; tile.origin.len()];
        copy_region(&mut tile.tensor, source, &zero, &tile.origin, &tile.extent);
    }
    Ok(tiled)
}

/// Copies every tile's in-bounds extent back into `dest` at its origin.
pub fn untile(tiled: &TiledTensor, dest: &mut Tensor) -> Result<(), TileError> {
    if dest.dtype() != tiled.dtype {
        return Err(TileError::DTypeMismatch {
            expected: tiled.dtype,
            actual: dest.dtype(),
        });
    }
    let src_rank = tiled.source_shape.rank();
    if dest.shape().rank() != src_rank {
        return Err(TileError::RankMismatch {
            what: "untile destination",
            expected: src_rank,
            actual: dest.shape().rank(),
        });
    }
    for (dim, (&want, &have)) in tiled
        .source_shape
        .dims()
        .iter()
        .zip(dest.shape().dims())
        .enumerate()
    {
        if want > have {
            return Err(TileError::RegionOutOfBounds {
                which: "destination",
                dim,
                origin: 0,
                extent: want,
                size: have,
            });
        }
    }

    for tile in &tiled.tiles {
        let zero = vec![0; tile.origin.len()];
        copy_region(dest, &tile.tensor, &tile.origin, &zero, &tile.extent);
    }
    tracing::debug!(tiles = tiled.len(), dest = dest.name(), "untiled");
    Ok(())
}

/// Concatenates the storage of every tile, in grid order, into `dest`.
pub fn flatten(tiled: &TiledTensor, dest: &mut Tensor) -> Result<(), TileError> {
    if dest.dtype() != tiled.dtype {
        return Err(TileError::DTypeMismatch {
            expected: tiled.dtype,
            actual: dest.dtype(),
        });
    }
    let required: usize = tiled
        .tiles
        .iter()
        .map(|t| t.tensor.shape().storage_size())
        .sum();
    let available = dest.shape().storage_size();
    if required > available {
        return Err(TileError::DestinationTooSmall {
            required,
            available,
        });
    }

    let mut offset = 0;
    for tile in &tiled.tiles {
        let count = tile.tensor.shape().storage_size();
        copy_linear(dest, &tile.tensor, offset, 0, count);
        offset += count;
    }
    Ok(())
}

/// Row-major walk over every index of a grid.
fn grid_positions(grid: &Shape) -> impl Iterator<Item = Vec<usize>> + '_ {
    let mut cursor = grid.start();
    std::iter::from_fn(move || {
        if cursor.is_end() {
            return None;
        }
        let pos = cursor.position().to_vec();
        cursor.advance();
        Some(pos)
    })
}
