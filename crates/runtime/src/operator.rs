// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Operators the runtime knows how to tile.
//!
//! Each operator names its tensors in a [`Workspace`] and goes through
//! three steps:
//!
//! 1. [`Operator::declare_tensors`] creates the output tensor and packs the
//!    weights into the layout the kernels expect.
//! 2. [`Operator::compute_tiling`] asks the matching tiling policy for tile
//!    shapes.
//! 3. [`Operator::run`] cuts the operands into tiles, drives the kernel and
//!    copies the output tiles back.

use crate::driver::{drive_channel_wise, drive_inner_product, OpKind, TileKernel};
use crate::{ExecutionMetrics, RuntimeError};
use std::time::{Duration, Instant};
use tensor_core::{DType, Tensor};
use tile_engine::{
    concat_tensors, generate_and_fill, generate_tiles, transpose_2d, untile, TileOptions, Workspace,
};
use tiling_planner::{ChannelWise, ScratchpadLimits, TilingConfig, TilingPolicy};

/// Per-channel normalisation of an `NHWC` or `NC` input.
///
/// Mean, variance, gamma and beta are `[1, C]` tensors.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchNormOp {
    pub name: String,
    pub input: String,
    pub mean: String,
    pub variance: String,
    pub gamma: String,
    pub beta: String,
    pub output: String,
    pub epsilon: f32,
}

impl BatchNormOp {
    /// Parameters are expected under `"{name}.mean"`, `"{name}.variance"`,
    /// `"{name}.gamma"` and `"{name}.beta"`.
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            mean: format!("{name}.mean"),
            variance: format!("{name}.variance"),
            gamma: format!("{name}.gamma"),
            beta: format!("{name}.beta"),
            input: input.into(),
            output: output.into(),
            epsilon: 1e-5,
            name,
        }
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }
}

/// Fully connected layer: `[B, A]` inputs times `[A, K]` weights.
#[derive(Debug, Clone, PartialEq)]
pub struct InnerProductOp {
    pub name: String,
    pub input: String,
    pub weights: String,
    pub output: String,
}

impl InnerProductOp {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        weights: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            weights: weights.into(),
            output: output.into(),
        }
    }
}

/// Rectifier with an optional negative slope.
#[derive(Debug, Clone, PartialEq)]
pub struct ReluOp {
    pub name: String,
    pub input: String,
    pub output: String,
    pub slope: f32,
}

impl ReluOp {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            output: output.into(),
            slope: 0.0,
        }
    }

    pub fn with_slope(mut self, slope: f32) -> Self {
        self.slope = slope;
        self
    }
}

/// A tileable operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    BatchNorm(BatchNormOp),
    InnerProduct(InnerProductOp),
    Relu(ReluOp),
}

impl Operator {
    pub fn name(&self) -> &str {
        match self {
            Operator::BatchNorm(op) => &op.name,
            Operator::InnerProduct(op) => &op.name,
            Operator::Relu(op) => &op.name,
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            Operator::BatchNorm(op) => OpKind::BatchNorm {
                epsilon: op.epsilon,
            },
            Operator::InnerProduct(_) => OpKind::InnerProduct,
            Operator::Relu(op) => OpKind::Relu { slope: op.slope },
        }
    }

    pub fn input_name(&self) -> &str {
        match self {
            Operator::BatchNorm(op) => &op.input,
            Operator::InnerProduct(op) => &op.input,
            Operator::Relu(op) => &op.input,
        }
    }

    pub fn output_name(&self) -> &str {
        match self {
            Operator::BatchNorm(op) => &op.output,
            Operator::InnerProduct(op) => &op.output,
            Operator::Relu(op) => &op.output,
        }
    }

    /// Name of the packed weight tensor created by
    /// [`Operator::declare_tensors`], if the operator has weights.
    pub fn packed_weights_name(&self) -> Option<String> {
        match self {
            Operator::Relu(_) => None,
            _ => Some(format!("{}/weights", self.name())),
        }
    }

    fn invalid(&self, detail: impl Into<String>) -> RuntimeError {
        RuntimeError::InvalidOperator {
            op: self.name().to_string(),
            detail: detail.into(),
        }
    }

    /// Creates the output tensor and the packed weights in `workspace`.
    ///
    /// The input and any parameter tensors must already be registered
    /// with element type `dtype`.
    pub fn declare_tensors(
        &self,
        workspace: &mut Workspace,
        dtype: DType,
    ) -> Result<(), RuntimeError> {
        let input = checked(workspace.tensor(self.input_name())?, dtype)?;
        let in_shape = input.shape().clone();

        let (out_shape, packed) = match self {
            Operator::BatchNorm(op) => {
                let c = in_shape.layout().channel_dim().ok_or_else(|| {
                    self.invalid(format!("{} input has no channel axis", in_shape.layout()))
                })?;
                let channels = in_shape[c];
                let mut params = Vec::with_capacity(4);
                for name in [&op.mean, &op.variance, &op.gamma, &op.beta] {
                    let t = checked(workspace.tensor(name)?, dtype)?;
                    if t.shape().dims() != [1, channels] {
                        return Err(self.invalid(format!(
                            "parameter '{name}' is {}, expected [1, {channels}]",
                            t.shape()
                        )));
                    }
                    params.push(t);
                }
                let packed = concat_tensors(&params, 0, format!("{}/weights", op.name), workspace)?;
                (in_shape.clone(), Some(packed))
            }
            Operator::InnerProduct(op) => {
                let weights = checked(workspace.tensor(&op.weights)?, dtype)?;
                let w = weights.shape();
                if in_shape.rank() != 2 || w.rank() != 2 || w[0] != in_shape[1] {
                    return Err(self.invalid(format!(
                        "weights {w} do not match inputs {in_shape}; expected [{}, K]",
                        in_shape.dims().last().copied().unwrap_or(0)
                    )));
                }
                let out = in_shape.with_dims(vec![in_shape[0], w[1]]);
                let packed = transpose_2d(weights, format!("{}/weights", op.name), workspace)?;
                (out, Some(packed))
            }
            Operator::Relu(_) => (in_shape.clone(), None),
        };

        let packed_name = packed.as_ref().map(|t| t.name().to_string());
        if let Some(packed) = packed {
            workspace.add_tensor(packed)?;
        }
        if let Err(e) = workspace.create_tensor(self.output_name(), out_shape, dtype) {
            if let Some(name) = packed_name {
                workspace.remove(&name);
            }
            return Err(e.into());
        }
        tracing::debug!(op = self.name(), input = %in_shape, "tensors declared");
        Ok(())
    }

    /// Picks tile shapes for the declared tensors.
    pub fn compute_tiling(
        &self,
        workspace: &Workspace,
        limits: &ScratchpadLimits,
    ) -> Result<TilingConfig, RuntimeError> {
        let inputs = workspace.tensor(self.input_name())?.shape();
        let outputs = workspace.tensor(self.output_name())?.shape();
        let weights = match self.packed_weights_name() {
            Some(name) => Some(workspace.tensor(&name)?.shape()),
            None => None,
        };
        let policy: Box<dyn TilingPolicy> = match self {
            Operator::InnerProduct(_) => Box::new(tiling_planner::InnerProduct::new()),
            Operator::BatchNorm(_) | Operator::Relu(_) => Box::new(ChannelWise::new()),
        };
        Ok(policy.compute_tile_shapes(inputs, weights, outputs, limits)?)
    }

    /// Tiles the operands, drives `kernel` over them and writes the
    /// result into the output tensor.
    ///
    /// Durations are only recorded when `profile` is set.
    pub fn run(
        &self,
        workspace: &mut Workspace,
        config: &TilingConfig,
        kernel: &mut dyn TileKernel,
        profile: bool,
    ) -> Result<ExecutionMetrics, RuntimeError> {
        let mut metrics = ExecutionMetrics::new(self.name());
        let options = TileOptions::default();

        let start = Instant::now();
        let (inputs, weights, mut outputs) = {
            let ws: &Workspace = workspace;
            let inputs =
                generate_and_fill(ws.tensor(self.input_name())?, &config.inputs, &options, ws)?;
            let weights = match (self.packed_weights_name(), &config.weights) {
                (Some(name), Some(tile)) => {
                    Some(generate_and_fill(ws.tensor(&name)?, tile, &options, ws)?)
                }
                (Some(_), None) => return Err(self.invalid("tiling has no weight tile shape")),
                (None, _) => None,
            };
            let outputs =
                generate_tiles(ws.tensor(self.output_name())?, &config.outputs, &options, ws)?;
            (inputs, weights, outputs)
        };
        metrics.record_tiles(
            inputs.len(),
            weights.as_ref().map_or(0, |w| w.len()),
            outputs.len(),
        );
        metrics.tiling_duration = lap(start, profile);

        match self {
            Operator::InnerProduct(_) => {
                let weights = weights
                    .as_ref()
                    .ok_or_else(|| self.invalid("inner product has no weight tiles"))?;
                drive_inner_product(&inputs, weights, &mut outputs, kernel, &mut metrics, profile)?;
            }
            Operator::BatchNorm(_) | Operator::Relu(_) => {
                drive_channel_wise(
                    self.kind(),
                    &inputs,
                    weights.as_ref(),
                    &mut outputs,
                    kernel,
                    &mut metrics,
                    profile,
                )?;
            }
        }

        let start = Instant::now();
        untile(&outputs, workspace.tensor_mut(self.output_name())?)?;
        metrics.untile_duration = lap(start, profile);
        Ok(metrics)
    }
}

fn checked(tensor: &Tensor, dtype: DType) -> Result<&Tensor, RuntimeError> {
    if tensor.dtype() != dtype {
        return Err(RuntimeError::DTypeMismatch {
            name: tensor.name().to_string(),
            expected: dtype,
            actual: tensor.dtype(),
        });
    }
    Ok(tensor)
}

fn lap(start: Instant, profile: bool) -> Duration {
    if profile {
        start.elapsed()
    } else {
        Duration::ZERO
    }
}
