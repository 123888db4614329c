// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bulk copies between rectangular regions of padded tensors.
//!
//! # Run detection
//!
//! A region copy is issued as a sequence of contiguous byte runs. Scanning
//! dimensions from innermost outward, a dimension is folded into the run
//! when the region covers it completely in both tensors and both tensors
//! store it with the same padded extent. The first dimension that cannot be
//! folded still contributes its region size to the run; every dimension
//! outside it is stepped one index at a time.
//!
//! ```text
//! src  [2, 4, 6]  dest [2, 4, 6]  region [2, 2, 6] at [0, 1, 0]
//!      dim 2: full, same storage  -> run = 6
//!      dim 1: partial             -> run = 12, stop
//!      dim 0: stepped             -> 2 copies of 12 elements
//! ```
//!
//! Bounds are a caller precondition and are only checked with
//! `debug_assert!`. Call sites driven by external shapes should run
//! [`validate_region`] first.

use crate::TileError;
use tensor_core::{IndexCursor, Shape, Tensor};

/// Checks that a region lies inside both tensors.
pub fn validate_region(
    dest: &Shape,
    src: &Shape,
    dest_origin: &[usize],
    src_origin: &[usize],
    region: &[usize],
) -> Result<(), TileError> {
    let rank = region.len();
    for (what, actual) in [
        ("destination", dest.rank()),
        ("source", src.rank()),
        ("destination origin", dest_origin.len()),
        ("source origin", src_origin.len()),
    ] {
        if actual != rank {
            return Err(TileError::RankMismatch {
                what,
                expected: rank,
                actual,
            });
        }
    }
    for dim in 0..rank {
        for (which, shape, origin) in [("destination", dest, dest_origin), ("source", src, src_origin)]
        {
            if origin[dim] + region[dim] > shape[dim] {
                return Err(TileError::RegionOutOfBounds {
                    which,
                    dim,
                    origin: origin[dim],
                    extent: region[dim],
                    size: shape[dim],
                });
            }
        }
    }
    Ok(())
}

/// Length of the contiguous run (in elements) and the cursor block.
fn contiguous_run(dest: &Shape, src: &Shape, region: &[usize]) -> (usize, Vec<usize>) {
    let rank = region.len();
    let mut run = 1;
    let mut block = vec![1; rank];
    for i in (0..rank).rev() {
        block[i] = region[i];
        let mergeable = region[i] == src[i]
            && region[i] == dest[i]
            && src.storage_dim(i) == dest.storage_dim(i);
        if mergeable {
            run *= src.storage_dim(i);
        } else {
            run *= region[i];
            break;
        }
    }
    (run, block)
}

/// Copies `region` elements of `elem_size` bytes between raw buffers.
#[allow(clippy::too_many_arguments)]
pub fn copy_region_raw(
    dest: &mut [u8],
    dest_shape: &Shape,
    src: &[u8],
    src_shape: &Shape,
    dest_origin: &[usize],
    src_origin: &[usize],
    region: &[usize],
    elem_size: usize,
) {
    debug_assert!(
        validate_region(dest_shape, src_shape, dest_origin, src_origin, region).is_ok(),
        "copy region out of bounds"
    );

    let (run, block) = contiguous_run(dest_shape, src_shape, region);
    let run_bytes = run * elem_size;
    let mut d = IndexCursor::region(dest_shape, dest_origin, region);
    let mut s = IndexCursor::region(src_shape, src_origin, region);
    while !s.is_end() {
        let src_at = s.offset() * elem_size;
        let dest_at = d.offset() * elem_size;
        dest[dest_at..dest_at + run_bytes].copy_from_slice(&src[src_at..src_at + run_bytes]);
        s.advance_by(&block);
        d.advance_by(&block);
    }
}

/// Copies a region from `src` into `dest`.
///
/// Both tensors must share an element type. After the call the destination
/// region holds exactly the source region's bits; nothing else in `dest`
/// changes except padding elements of fully copied rows.
pub fn copy_region(
    dest: &mut Tensor,
    src: &Tensor,
    dest_origin: &[usize],
    src_origin: &[usize],
    region: &[usize],
) {
    debug_assert_eq!(dest.dtype(), src.dtype());
    let elem_size = src.dtype().size_bytes();
    let dest_shape = dest.shape().clone();
    copy_region_raw(
        dest.as_bytes_mut(),
        &dest_shape,
        src.as_bytes(),
        src.shape(),
        dest_origin,
        src_origin,
        region,
        elem_size,
    );
}

/// Copies `count` elements between flat storage offsets.
pub fn copy_linear_raw(
    dest: &mut [u8],
    src: &[u8],
    dest_offset: usize,
    src_offset: usize,
    count: usize,
    elem_size: usize,
) {
    let (d, s, n) = (dest_offset * elem_size, src_offset * elem_size, count * elem_size);
    dest[d..d + n].copy_from_slice(&src[s..s + n]);
}

/// Copies `count` storage elements from `src` into `dest`.
pub fn copy_linear(
    dest: &mut Tensor,
    src: &Tensor,
    dest_offset: usize,
    src_offset: usize,
    count: usize,
) {
    debug_assert_eq!(dest.dtype(), src.dtype());
    let elem_size = src.dtype().size_bytes();
    copy_linear_raw(
        dest.as_bytes_mut(),
        src.as_bytes(),
        dest_offset,
        src_offset,
        count,
        elem_size,
    );
}
