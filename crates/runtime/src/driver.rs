// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tiled-execution driver: sequences kernel invocations over tile grids.
//!
//! # Inner product (N-W-A)
//!
//! ```text
//! for n in batch tiles              inputs[n, *], outputs[n, 0]
//!   for w in neuron tiles           weights[w, *]
//!     for a in reduction tiles      inputs[n, a] with weights[w, a]
//!       accumulate = a > 0
//!       flush      = last w && last a
//!     finished_neurons += rows of weights[w, 0]
//! ```
//!
//! Outputs are whole rows, so each neuron tile writes the output
//! sub-range starting at `finished_neurons`. When the inputs are not split
//! along activations but the weights are, input tile `[n, 0]` stays
//! resident and `activation_offset` walks through it instead.
//!
//! # Channel-wise
//!
//! One invocation per input tile, paired with the output tile of the same
//! index and the weight tile covering its channels. Every invocation
//! produces a final result.

use crate::{ExecutionMetrics, RuntimeError};
use std::fmt;
use std::time::{Duration, Instant};
use tensor_core::Tensor;
use tile_engine::{Tile, TiledTensor};

/// Error type kernels report failures with.
pub type KernelError = Box<dyn std::error::Error + Send + Sync>;

/// The computation a kernel is asked to perform, with its scalar
/// parameters.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub enum OpKind {
    /// `y = gamma * (x - mean) / sqrt(variance + epsilon) + beta`, with
    /// weights packed as rows `[mean, variance, gamma, beta]`.
    BatchNorm { epsilon: f32 },
    /// `y[b, k] = sum_a x[b, a] * w[k, a]`, weights neuron-major.
    InnerProduct,
    /// `y = x` for positive `x`, `slope * x` otherwise.
    Relu { slope: f32 },
}

impl OpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::BatchNorm { .. } => "batch-norm",
            OpKind::InnerProduct => "inner-product",
            OpKind::Relu { .. } => "relu",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a kernel needs for one invocation.
#[derive(Debug)]
pub struct KernelCall<'a> {
    pub op: OpKind,
    pub inputs: &'a Tensor,
    /// `None` for unary operators.
    pub weights: Option<&'a Tensor>,
    pub outputs: &'a mut Tensor,
    /// Row-major tile indices within each operand's grid.
    pub input_tile: usize,
    pub weight_tile: Option<usize>,
    pub output_tile: usize,
    /// Activation offset into a stationary input tile.
    pub activation_offset: usize,
    /// First output neuron written by this invocation.
    pub finished_neurons: usize,
    /// First weight column used by this invocation (channel-wise only).
    pub channel_offset: usize,
    /// Add to the existing output sub-range instead of overwriting it.
    pub accumulate: bool,
    /// This invocation completes the output tile.
    pub flush: bool,
}

/// A compute kernel invoked once per tile combination.
pub trait TileKernel {
    fn invoke(&mut self, call: KernelCall<'_>) -> Result<(), KernelError>;
}

fn tile<'t>(tiled: &'t TiledTensor, index: &[usize]) -> Result<&'t Tile, RuntimeError> {
    tiled.tile(index).ok_or_else(|| RuntimeError::MissingTile {
        tensor: tiled.source_name().to_string(),
        index: index.to_vec(),
    })
}

fn invalid(tiled: &TiledTensor, detail: impl Into<String>) -> RuntimeError {
    RuntimeError::InvalidOperator {
        op: tiled.source_name().to_string(),
        detail: detail.into(),
    }
}

fn invoke(
    kernel: &mut dyn TileKernel,
    call: KernelCall<'_>,
    metrics: &mut ExecutionMetrics,
    profile: bool,
) -> Result<(), RuntimeError> {
    let (op, accumulate, flush) = (call.op, call.accumulate, call.flush);
    tracing::trace!(
        %op,
        input = call.input_tile,
        weight = ?call.weight_tile,
        output = call.output_tile,
        activation_offset = call.activation_offset,
        finished_neurons = call.finished_neurons,
        channel_offset = call.channel_offset,
        accumulate,
        flush,
        "kernel invocation"
    );
    let start = profile.then(Instant::now);
    kernel
        .invoke(call)
        .map_err(|source| RuntimeError::Kernel { op, source })?;
    let elapsed = start.map(|s| s.elapsed()).unwrap_or(Duration::ZERO);
    metrics.record_invocation(accumulate, flush, elapsed);
    Ok(())
}

/// Runs an inner product over `[B, A]` inputs, `[K, A]` weights and
/// `[B, K]` outputs tile grids.
///
/// Grid consistency is checked before the first invocation.
pub fn drive_inner_product(
    inputs: &TiledTensor,
    weights: &TiledTensor,
    outputs: &mut TiledTensor,
    kernel: &mut dyn TileKernel,
    metrics: &mut ExecutionMetrics,
    profile: bool,
) -> Result<(), RuntimeError> {
    for tiled in [inputs, weights, &*outputs] {
        if tiled.grid().rank() != 2 {
            return Err(invalid(tiled, "inner-product operands must have rank 2"));
        }
    }
    let (in_grid, w_grid, out_grid) = (inputs.grid(), weights.grid(), outputs.grid());
    if out_grid[1] != 1 {
        return Err(invalid(outputs, "outputs may not be split along neurons"));
    }
    if in_grid[0] != out_grid[0] {
        return Err(invalid(
            outputs,
            format!("{} input batch tiles but {} output tiles", in_grid[0], out_grid[0]),
        ));
    }

    let (batches, neurons, reductions) = (in_grid[0], w_grid[0], w_grid[1]);
    let stationary = in_grid[1] == 1 && reductions > 1;
    if in_grid[1] != reductions && !stationary {
        return Err(RuntimeError::TileCountMismatch {
            input_tiles: in_grid[1],
            weight_tiles: reductions,
        });
    }
    tracing::debug!(batches, neurons, reductions, stationary, "driving inner product");

    let out_name = outputs.source_name().to_string();
    for n in 0..batches {
        let mut finished_neurons = 0;
        for w in 0..neurons {
            let mut activation_offset = 0;
            for a in 0..reductions {
                let input_index = [n, if stationary { 0 } else { a }];
                let input = tile(inputs, &input_index)?;
                let weight = tile(weights, &[w, a])?;
                let output = outputs.tile_mut(&[n, 0]).ok_or_else(|| RuntimeError::MissingTile {
                    tensor: out_name.clone(),
                    index: vec![n, 0],
                })?;
                let call = KernelCall {
                    op: OpKind::InnerProduct,
                    inputs: &input.tensor,
                    weights: Some(&weight.tensor),
                    outputs: &mut output.tensor,
                    input_tile: inputs.linear_index(&input_index).unwrap_or_default(),
                    weight_tile: weights.linear_index(&[w, a]),
                    output_tile: n,
                    activation_offset,
                    finished_neurons,
                    channel_offset: 0,
                    accumulate: a > 0,
                    flush: w == neurons - 1 && a == reductions - 1,
                };
                invoke(kernel, call, metrics, profile)?;
                if stationary {
                    activation_offset += weight.extent[1];
                }
            }
            finished_neurons += tile(weights, &[w, 0])?.extent[0];
        }
        tracing::debug!(batch_tile = n, finished_neurons, "output tile complete");
    }
    Ok(())
}

/// Runs a channel-wise operator: one invocation per input tile.
///
/// Every input tile's channel range must lie inside a single weight tile;
/// this is checked for all tiles before the first invocation.
pub fn drive_channel_wise(
    op: OpKind,
    inputs: &TiledTensor,
    weights: Option<&TiledTensor>,
    outputs: &mut TiledTensor,
    kernel: &mut dyn TileKernel,
    metrics: &mut ExecutionMetrics,
    profile: bool,
) -> Result<(), RuntimeError> {
    if inputs.grid() != outputs.grid() {
        return Err(invalid(
            outputs,
            format!("output grid {} differs from input grid {}", outputs.grid(), inputs.grid()),
        ));
    }
    let shape = inputs.source_shape();
    let c = shape
        .layout()
        .channel_dim()
        .unwrap_or(shape.rank().saturating_sub(1));

    let pairing = inputs
        .iter()
        .map(|t| {
            let (start, end) = (t.origin[c], t.origin[c] + t.extent[c]);
            let Some(w) = weights else {
                return Ok((None, 0));
            };
            w.iter()
                .position(|wt| wt.origin[1] <= start && end <= wt.origin[1] + wt.extent[1])
                .map(|j| (Some(j), start - w.tiles()[j].origin[1]))
                .ok_or(RuntimeError::ChannelRangeUncovered { start, end })
        })
        .collect::<Result<Vec<_>, _>>()?;
    tracing::debug!(%op, tiles = inputs.len(), "driving channel-wise operator");

    let out_name = outputs.source_name().to_string();
    for (i, (weight_tile, channel_offset)) in pairing.into_iter().enumerate() {
        let input = inputs.get(i).ok_or_else(|| RuntimeError::MissingTile {
            tensor: inputs.source_name().to_string(),
            index: vec![i],
        })?;
        let weight = weight_tile
            .and_then(|j| weights.and_then(|w| w.get(j)))
            .map(|t| &t.tensor);
        let output = outputs.get_mut(i).ok_or_else(|| RuntimeError::MissingTile {
            tensor: out_name.clone(),
            index: vec![i],
        })?;
        let call = KernelCall {
            op,
            inputs: &input.tensor,
            weights: weight,
            outputs: &mut output.tensor,
            input_tile: i,
            weight_tile,
            output_tile: i,
            activation_offset: 0,
            finished_neurons: 0,
            channel_offset,
            accumulate: false,
            flush: true,
        };
        invoke(kernel, call, metrics, profile)?;
    }
    Ok(())
}
