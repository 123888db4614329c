// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tiling policies.
//!
//! Each policy implements [`TilingPolicy`] and owns the rules for one
//! family of operators:
//!
//! | Policy | Operators | Splits |
//! |---|---|---|
//! | [`ChannelWise`] | batch norm, ReLU | batch, channel, height, width |
//! | [`InnerProduct`] | fully connected | batch, neurons (weights only), activations |

pub mod channelwise;
pub mod inner_product;

pub use channelwise::ChannelWise;
pub use inner_product::InnerProduct;

use crate::{ScratchpadLimits, TilingConfig, TilingError};
use tensor_core::Shape;

/// A rule set that picks tile shapes for an operator's operands.
pub trait TilingPolicy: Send + Sync {
    /// Human-readable name of this policy.
    fn name(&self) -> &str;

    /// Chooses tile shapes that fit the scratchpads in `limits`.
    fn compute_tile_shapes(
        &self,
        inputs: &Shape,
        weights: Option<&Shape>,
        outputs: &Shape,
        limits: &ScratchpadLimits,
    ) -> Result<TilingConfig, TilingError>;
}

/// Largest value in `[min, max]` on the `granule` grid (or `max` itself)
/// for which `fits` holds. `fits` must be monotone.
///
/// An empty range (`max == 0` or `max < min`) has no candidate.
pub(crate) fn grow(
    min: usize,
    max: usize,
    granule: usize,
    fits: impl Fn(usize) -> bool,
) -> Option<usize> {
    if max == 0 || max < min {
        return None;
    }
    if fits(max) {
        return Some(max);
    }
    let granule = granule.max(1);
    let mut v = max / granule * granule;
    if v == max {
        v -= granule;
    }
    while v > min && v > 0 {
        if fits(v) {
            return Some(v);
        }
        v -= granule;
    }
    fits(min).then_some(min)
}

/// Rounds `value` down to a multiple of `granule`, never below `granule`
/// unless `value` itself is smaller.
pub(crate) fn round_down(value: usize, granule: usize) -> usize {
    let granule = granule.max(1);
    if value < granule {
        value
    } else {
        value / granule * granule
    }
}
