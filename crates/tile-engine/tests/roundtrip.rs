// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Property tests for region copies and tile round-trips.

use memory_manager::MemoryBudget;
use proptest::prelude::*;
use tensor_core::{DType, IndexCursor, Layout, Shape, Tensor};
use tile_engine::{
    copy_region, generate_and_fill, untile, validate_region, PaddingPolicy, TileOptions,
    Workspace,
};

fn iota(name: &str, shape: Shape) -> Tensor {
    let values: Vec<f32> = (0..shape.num_elements()).map(|i| i as f32 + 0.5).collect();
    Tensor::from_f32(name, shape, &values).unwrap()
}

/// A shape plus a tile no larger than it in any dimension.
fn shape_and_tile() -> impl Strategy<Value = (Vec<usize>, usize, Vec<usize>)> {
    (prop::collection::vec(1usize..=7, 1..=4), prop::sample::select(vec![0usize, 1, 4, 8]))
        .prop_flat_map(|(dims, alignment)| {
            let tile = dims.iter().map(|&d| 1..=d).collect::<Vec<_>>();
            (Just(dims), Just(alignment), tile)
        })
}

/// A shape plus an in-bounds region (origin, extent).
fn shape_and_region() -> impl Strategy<Value = (Vec<usize>, usize, Vec<usize>, Vec<usize>)> {
    shape_and_tile().prop_flat_map(|(dims, alignment, extent)| {
        let origin = dims
            .iter()
            .zip(&extent)
            .map(|(&d, &e)| 0..=d - e)
            .collect::<Vec<_>>();
        (Just(dims), Just(alignment), Just(extent), origin)
    })
}

proptest! {
    /// A region copied out, written back into an empty tensor and copied
    /// out again is bit-identical to the first copy, and holds exactly the
    /// source elements of the region.
    #[test]
    fn prop_region_roundtrip((dims, alignment, extent, origin) in shape_and_region()) {
        let shape = Shape::new(dims, Layout::X, alignment);
        let src = iota("src", shape.clone());
        let scratch_shape = Shape::new(extent.clone(), Layout::X, alignment);
        let zero = vec![0; extent.len()];

        prop_assert!(validate_region(&scratch_shape, &shape, &zero, &origin, &extent).is_ok());

        let mut scratch = Tensor::zeros("scratch", scratch_shape.clone(), DType::F32);
        copy_region(&mut scratch, &src, &zero, &origin, &extent);

        let src_values = src.to_f32_vec().unwrap();
        let expected: Vec<f32> = IndexCursor::region(&Shape::unaligned(shape.dims().to_vec(), Layout::X), &origin, &extent)
            .map(|offset| src_values[offset])
            .collect();
        prop_assert_eq!(scratch.to_f32_vec().unwrap(), expected);

        let mut back = Tensor::zeros("back", shape, DType::F32);
        copy_region(&mut back, &scratch, &origin, &zero, &extent);
        let mut again = Tensor::zeros("again", scratch_shape, DType::F32);
        copy_region(&mut again, &back, &zero, &origin, &extent);
        prop_assert_eq!(again.as_bytes(), scratch.as_bytes());
    }

    /// Every element inside a copied region matches; everything outside is
    /// left at its sentinel.
    #[test]
    fn prop_copy_touches_only_region((dims, alignment, extent, origin) in shape_and_region()) {
        let shape = Shape::new(dims, Layout::X, alignment);
        let src = iota("src", shape.clone());
        let mut dest = Tensor::from_f32("dest", shape.clone(), &vec![-1.0; shape.num_elements()]).unwrap();
        copy_region(&mut dest, &src, &origin, &origin, &extent);

        let mut cursor = shape.start();
        let values = dest.to_f32_vec().unwrap();
        let expected = src.to_f32_vec().unwrap();
        let mut i = 0;
        while !cursor.is_end() {
            let inside = cursor
                .position()
                .iter()
                .zip(origin.iter().zip(&extent))
                .all(|(&p, (&o, &e))| p >= o && p < o + e);
            if inside {
                prop_assert_eq!(values[i], expected[i]);
            } else {
                prop_assert_eq!(values[i], -1.0);
            }
            cursor.advance();
            i += 1;
        }
    }

    /// Tiling then untiling with zero halo reproduces the source exactly.
    #[test]
    fn prop_tile_roundtrip(
        (dims, alignment, tile) in shape_and_tile(),
        zero_fill in any::<bool>(),
    ) {
        let ws = Workspace::new(MemoryBudget::from_mb(16));
        let shape = Shape::new(dims, Layout::X, alignment);
        let src = iota("src", shape.clone());
        let padding = if zero_fill { PaddingPolicy::ZeroFill } else { PaddingPolicy::Clip };
        let options = TileOptions::default().with_padding(padding);

        let tiled = generate_and_fill(&src, &shape.with_dims(tile.clone()), &options, &ws).unwrap();
        let expected_tiles: usize = shape
            .dims()
            .iter()
            .zip(&tile)
            .map(|(&d, &t)| d.div_ceil(t))
            .product();
        prop_assert_eq!(tiled.len(), expected_tiles);

        let mut back = Tensor::zeros("back", shape, DType::F32);
        untile(&tiled, &mut back).unwrap();
        prop_assert_eq!(back.as_bytes(), src.as_bytes());
    }
}
