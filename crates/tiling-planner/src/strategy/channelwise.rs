// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Channel-wise tiling for element-wise operators with per-channel
//! parameters (batch norm, ReLU).
//!
//! Outputs have the same shape as inputs and are tiled identically.
//! Weights, when present, are `[k, C]` and share the channel axis.
//!
//! # Strategy search
//!
//! Strategies are tried in [`TilingDims`] order and the first whose tile
//! fits both the inputs and outputs scratchpads wins. For a strategy:
//!
//! - batch is pinned to 1 unless the strategy is `DimN`;
//! - every split axis except the last is held at its minimum extent
//!   (the alignment, or the full size if smaller);
//! - the last split axis is grown to the largest extent that fits, on the
//!   alignment grid for channels and in unit steps otherwise.
//!
//! Earlier strategies are less aggressive, so the first fit is also the
//! one with the fewest, largest tiles.

use super::{grow, TilingPolicy};
use crate::config::Axis;
use crate::{OperandRole, ScratchpadLimits, TilingConfig, TilingDims, TilingError};
use tensor_core::{Layout, Shape};

const NHWC_ORDER: [TilingDims; 8] = [
    TilingDims::DimN,
    TilingDims::DimNC,
    TilingDims::DimNW,
    TilingDims::DimNCW,
    TilingDims::DimNH,
    TilingDims::DimNCH,
    TilingDims::DimNHW,
    TilingDims::DimNCHW,
];

const NC_ORDER: [TilingDims; 2] = [TilingDims::DimN, TilingDims::DimNC];

/// Channel-wise tiling policy.
#[derive(Debug, Clone, Default)]
pub struct ChannelWise;

impl ChannelWise {
    pub fn new() -> Self {
        Self
    }

    /// First strategy in priority order whose tile fits.
    fn best_activation_tiling(
        &self,
        inputs: &Shape,
        outputs: &Shape,
        limits: &ScratchpadLimits,
    ) -> Result<(Vec<usize>, TilingDims), TilingError> {
        let layout = inputs.layout();
        let order: &[TilingDims] = match layout {
            Layout::Nhwc => &NHWC_ORDER,
            _ => &NC_ORDER,
        };
        let fits = |dims: &[usize]| {
            limits.fits(OperandRole::Inputs, &inputs.with_dims(dims.to_vec()))
                && limits.fits(OperandRole::Outputs, &outputs.with_dims(dims.to_vec()))
        };

        for &strategy in order {
            if let Some(tile) = size_strategy(inputs, strategy, limits, &fits) {
                tracing::debug!(strategy = %strategy, tile = ?tile, "channel-wise strategy fits");
                return Ok((tile, strategy));
            }
            tracing::trace!(strategy = %strategy, "channel-wise strategy rejected");
        }

        let smallest = min_tile(inputs, order[order.len() - 1], limits);
        Err(TilingError::NoFeasibleTiling {
            operand: OperandRole::Inputs,
            footprint: limits.footprint(&inputs.with_dims(smallest)),
            budget: limits.inputs.as_bytes(),
        })
    }
}

fn axis_index(layout: Layout, axis: Axis) -> Option<usize> {
    match axis {
        Axis::Batch => layout.batch_dim(),
        Axis::Channel => layout.channel_dim(),
        Axis::Height => layout.height_dim(),
        Axis::Width => layout.width_dim(),
    }
}

fn min_extent(axis: Axis, size: usize, limits: &ScratchpadLimits) -> usize {
    match axis {
        Axis::Batch => 1,
        _ => size.min(limits.channel_granule()),
    }
}

/// Tile with every split axis at its minimum.
fn min_tile(shape: &Shape, strategy: TilingDims, limits: &ScratchpadLimits) -> Vec<usize> {
    let layout = shape.layout();
    let mut tile = shape.dims().to_vec();
    if let Some(n) = layout.batch_dim() {
        tile[n] = 1;
    }
    for &axis in strategy.axes() {
        if let Some(i) = axis_index(layout, axis) {
            tile[i] = min_extent(axis, shape[i], limits);
        }
    }
    tile
}

/// Sizes one strategy, or `None` if even its minimum tile does not fit.
fn size_strategy(
    shape: &Shape,
    strategy: TilingDims,
    limits: &ScratchpadLimits,
    fits: &impl Fn(&[usize]) -> bool,
) -> Option<Vec<usize>> {
    let layout = shape.layout();
    let (&grow_axis, _) = strategy.axes().split_last()?;
    let g = axis_index(layout, grow_axis)?;

    let mut tile = min_tile(shape, strategy, limits);
    if !fits(&tile) {
        return None;
    }
    let granule = match grow_axis {
        Axis::Channel => limits.channel_granule(),
        _ => 1,
    };
    let best = grow(tile[g], shape[g], granule, |v| {
        let mut candidate = tile.clone();
        candidate[g] = v;
        fits(&candidate)
    })?;
    tile[g] = best;
    Some(tile)
}

impl TilingPolicy for ChannelWise {
    fn name(&self) -> &str {
        "channel-wise"
    }

    fn compute_tile_shapes(
        &self,
        inputs: &Shape,
        weights: Option<&Shape>,
        outputs: &Shape,
        limits: &ScratchpadLimits,
    ) -> Result<TilingConfig, TilingError> {
        limits.validate()?;
        let layout = inputs.layout();
        if !matches!(layout, Layout::Nhwc | Layout::Nc) {
            return Err(TilingError::UnsupportedLayout {
                policy: "channel-wise",
                operand: OperandRole::Inputs,
                layout,
            });
        }
        let rank = layout.rank().unwrap_or(0);
        if inputs.rank() != rank {
            return Err(TilingError::RankMismatch {
                operand: OperandRole::Inputs,
                expected: rank,
                actual: inputs.rank(),
            });
        }
        if outputs.dims() != inputs.dims() {
            return Err(TilingError::ShapeMismatch(format!(
                "outputs {outputs} differ from inputs {inputs}"
            )));
        }
        let c = layout.channel_dim().unwrap_or(rank - 1);
        if let Some(w) = weights {
            if w.rank() != 2 {
                return Err(TilingError::RankMismatch {
                    operand: OperandRole::Weights,
                    expected: 2,
                    actual: w.rank(),
                });
            }
            if w[1] != inputs[c] {
                return Err(TilingError::ShapeMismatch(format!(
                    "weights {w} do not cover the {} channels of inputs {inputs}",
                    inputs[c]
                )));
            }
        }

        let activations_fit =
            limits.fits(OperandRole::Inputs, inputs) && limits.fits(OperandRole::Outputs, outputs);
        let weights_fit = weights.map_or(true, |w| limits.fits(OperandRole::Weights, w));
        if activations_fit && weights_fit {
            tracing::info!(
                policy = self.name(),
                inputs = %inputs,
                "operands fit the scratchpads, no tiling needed"
            );
            return Ok(TilingConfig::untiled(inputs, weights, outputs));
        }

        let (mut tile, mut input_dims) = if activations_fit {
            (inputs.dims().to_vec(), TilingDims::None)
        } else {
            self.best_activation_tiling(inputs, outputs, limits)?
        };

        let (weight_tile, weight_dims) = match weights {
            None => (None, TilingDims::None),
            Some(w) if weights_fit => (Some(w.clone()), TilingDims::None),
            Some(w) => {
                let min_c = w[1].min(limits.channel_granule());
                let wfits = |ch: usize| limits.fits(OperandRole::Weights, &w.with_dims(vec![w[0], ch]));
                let ch = grow(min_c, w[1], limits.channel_granule(), wfits).ok_or_else(|| {
                    TilingError::NoFeasibleTiling {
                        operand: OperandRole::Weights,
                        footprint: limits.footprint(&w.with_dims(vec![w[0], min_c])),
                        budget: limits.weights.as_bytes(),
                    }
                })?;
                (Some(w.with_dims(vec![w[0], ch])), TilingDims::DimNC)
            }
        };

        // Inputs and weights must walk the channel axis in lockstep.
        let weight_tile = match weight_tile {
            Some(wt) if weight_dims.splits_channel() => {
                let shared = if input_dims.splits_channel() {
                    tile[c].min(wt[1])
                } else {
                    input_dims = input_dims.with_channel();
                    wt[1]
                };
                tile[c] = shared;
                Some(wt.with_dims(vec![wt[0], shared]))
            }
            other => other,
        };

        let config = TilingConfig {
            inputs: inputs.with_dims(tile.clone()),
            weights: weight_tile,
            outputs: outputs.with_dims(tile),
            input_dims,
            weight_dims,
            output_dims: input_dims,
        };
        tracing::info!(policy = self.name(), config = %config.summary(), "tiling chosen");
        Ok(config)
    }
}
