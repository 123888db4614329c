// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Inner-product (fully connected) tiling.
//!
//! Operands, with `B` the batch, `A` the activations and `K` the neurons:
//!
//! ```text
//! inputs  [B, A]
//! weights [K, A]   neuron-major
//! outputs [B, K]
//! ```
//!
//! Outputs are never split along `K`: every invocation writes whole output
//! rows, accumulating over activation tiles. Weights may be split along
//! neurons (in multiples of the PE count) and along activations. When both
//! inputs and weights split activations they share one activation tile so
//! the reduction loop walks them in lockstep.

use super::{grow, TilingPolicy};
use crate::{OperandRole, ScratchpadLimits, TilingConfig, TilingDims, TilingError};
use tensor_core::{Layout, Shape};

/// Inner-product tiling policy.
#[derive(Debug, Clone, Default)]
pub struct InnerProduct;

impl InnerProduct {
    pub fn new() -> Self {
        Self
    }
}

fn check_rank(operand: OperandRole, shape: &Shape) -> Result<(), TilingError> {
    if shape.rank() != 2 {
        return Err(TilingError::RankMismatch {
            operand,
            expected: 2,
            actual: shape.rank(),
        });
    }
    Ok(())
}

impl TilingPolicy for InnerProduct {
    fn name(&self) -> &str {
        "inner-product"
    }

    fn compute_tile_shapes(
        &self,
        inputs: &Shape,
        weights: Option<&Shape>,
        outputs: &Shape,
        limits: &ScratchpadLimits,
    ) -> Result<TilingConfig, TilingError> {
        limits.validate()?;
        let weights = weights
            .ok_or_else(|| TilingError::ShapeMismatch("inner product requires weights".into()))?;
        if inputs.layout() != Layout::Nc {
            return Err(TilingError::UnsupportedLayout {
                policy: "inner-product",
                operand: OperandRole::Inputs,
                layout: inputs.layout(),
            });
        }
        check_rank(OperandRole::Inputs, inputs)?;
        check_rank(OperandRole::Weights, weights)?;
        check_rank(OperandRole::Outputs, outputs)?;

        let (batch, acts) = (inputs[0], inputs[1]);
        let neurons = weights[0];
        if weights[1] != acts {
            return Err(TilingError::ShapeMismatch(format!(
                "weights {weights} do not match the {acts} activations of inputs {inputs}"
            )));
        }
        if outputs.dims() != [batch, neurons] {
            return Err(TilingError::ShapeMismatch(format!(
                "outputs {outputs} should be [{batch}, {neurons}]"
            )));
        }

        let granule = limits.channel_granule();
        let fits = |role: OperandRole, base: &Shape, rows: usize, cols: usize| {
            limits.fits(role, &base.with_dims(vec![rows, cols]))
        };

        // Outputs: whole rows only.
        let out_row = outputs.with_dims(vec![1, neurons]);
        if !limits.fits(OperandRole::Outputs, &out_row) {
            return Err(TilingError::UnsupportedOutputTiling {
                required: limits.footprint(&out_row),
                budget: limits.outputs.as_bytes(),
            });
        }
        let out_rows = grow(1, batch, 1, |r| fits(OperandRole::Outputs, outputs, r, neurons))
            .unwrap_or(1);

        // Inputs: as many full rows as both scratchpads allow, else split A.
        let in_rows = grow(1, batch, 1, |r| fits(OperandRole::Inputs, inputs, r, acts));
        let (batch_tile, mut input_acts, mut input_dims) = match in_rows {
            Some(rows) => {
                let b = rows.min(out_rows);
                let dims = if b == batch {
                    TilingDims::None
                } else {
                    TilingDims::DimN
                };
                (b, acts, dims)
            }
            None => {
                let min_a = acts.min(granule);
                let a = grow(min_a, acts, granule, |a| fits(OperandRole::Inputs, inputs, 1, a))
                    .ok_or_else(|| TilingError::NoFeasibleTiling {
                        operand: OperandRole::Inputs,
                        footprint: limits.footprint(&inputs.with_dims(vec![1, min_a])),
                        budget: limits.inputs.as_bytes(),
                    })?;
                (1, a, TilingDims::DimNC)
            }
        };
        let output_dims = if batch_tile == batch {
            TilingDims::None
        } else {
            TilingDims::DimN
        };

        // Weights: whole, else neuron rows in PE multiples, else PE rows
        // with split activations.
        let pes = limits.num_pes;
        let (weight_rows, mut weight_acts, mut weight_dims) =
            if limits.fits(OperandRole::Weights, weights) {
                (neurons, acts, TilingDims::None)
            } else {
                let rows = grow(1, neurons, 1, |k| fits(OperandRole::Weights, weights, k, acts))
                    .filter(|&k| k >= pes);
                match rows {
                    Some(k) => (k / pes * pes, acts, TilingDims::DimN),
                    None => {
                        let k = pes.min(neurons);
                        let min_a = acts.min(granule);
                        let a = grow(min_a, acts, granule, |a| {
                            fits(OperandRole::Weights, weights, k, a)
                        })
                        .ok_or_else(|| TilingError::NoFeasibleTiling {
                            operand: OperandRole::Weights,
                            footprint: limits.footprint(&weights.with_dims(vec![k, min_a])),
                            budget: limits.weights.as_bytes(),
                        })?;
                        (k, a, TilingDims::DimNC)
                    }
                }
            };

        match (input_dims.splits_channel(), weight_dims.splits_channel()) {
            (true, true) => {
                let shared = input_acts.min(weight_acts);
                input_acts = shared;
                weight_acts = shared;
            }
            (true, false) => {
                weight_acts = input_acts;
                weight_dims = weight_dims.with_channel();
            }
            (false, true) => {
                tracing::debug!(
                    weight_acts,
                    "inputs stay whole along activations while weights are split"
                );
            }
            (false, false) => {}
        }
        // Reconciliation may have narrowed the input activation tile.
        if input_acts < acts {
            input_dims = input_dims.with_channel();
        }

        let config = TilingConfig {
            inputs: inputs.with_dims(vec![batch_tile, input_acts]),
            weights: Some(weights.with_dims(vec![weight_rows, weight_acts])),
            outputs: outputs.with_dims(vec![batch_tile, neurons]),
            input_dims,
            weight_dims,
            output_dims,
        };
        tracing::info!(policy = self.name(), config = %config.summary(), "tiling chosen");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_count;
    use memory_manager::MemoryBudget;

    fn limits() -> ScratchpadLimits {
        ScratchpadLimits::uniform(MemoryBudget::from_kb(32), 2, 8, 8)
    }

    fn plan(
        b: usize,
        a: usize,
        k: usize,
        limits: &ScratchpadLimits,
    ) -> Result<TilingConfig, TilingError> {
        InnerProduct::new().compute_tile_shapes(
            &Shape::nc(b, a, 8),
            Some(&Shape::nc(k, a, 8)),
            &Shape::nc(b, k, 8),
            limits,
        )
    }

    #[test]
    fn test_everything_fits() {
        let cfg = plan(1, 256, 32, &limits()).unwrap();
        assert!(cfg.is_untiled());
        assert_eq!(cfg.weights.unwrap().dims(), &[32, 256]);
    }

    #[test]
    fn test_weights_split_by_neurons() {
        let cfg = plan(1, 256, 128, &limits()).unwrap();
        let w = cfg.weights.clone().unwrap();
        assert_eq!(w.dims(), &[64, 256]);
        assert_eq!(cfg.weight_dims, TilingDims::DimN);
        assert_eq!(cfg.input_dims, TilingDims::None);
        assert_eq!(tile_count(&Shape::nc(128, 256, 8), &w), 2);
    }

    #[test]
    fn test_neuron_tile_rounded_to_pes() {
        // 300 activations are stored as 304: 53 rows fit, rounded to 48.
        let cfg = plan(1, 300, 100, &limits()).unwrap();
        assert_eq!(cfg.weights.unwrap().dims(), &[48, 300]);
    }

    #[test]
    fn test_stationary_inputs() {
        let cfg = plan(1, 4096, 16, &limits()).unwrap();
        assert_eq!(cfg.inputs.dims(), &[1, 4096]);
        assert_eq!(cfg.input_dims, TilingDims::None);
        assert_eq!(cfg.weights.unwrap().dims(), &[8, 2048]);
        assert_eq!(cfg.weight_dims, TilingDims::DimNC);
        assert_eq!(cfg.outputs.dims(), &[1, 16]);
    }

    #[test]
    fn test_both_split_share_activation_tile() {
        let cfg = plan(1, 32768, 32, &limits()).unwrap();
        assert_eq!(cfg.inputs.dims(), &[1, 2048]);
        assert_eq!(cfg.weights.unwrap().dims(), &[8, 2048]);
        assert_eq!(cfg.input_dims, TilingDims::DimNC);
    }

    #[test]
    fn test_weights_follow_split_inputs() {
        let mut limits = limits();
        limits.weights = MemoryBudget::from_mb(1);
        let cfg = plan(1, 20000, 8, &limits).unwrap();
        assert_eq!(cfg.inputs.dims(), &[1, 16384]);
        assert_eq!(cfg.weights.unwrap().dims(), &[8, 16384]);
        assert_eq!(cfg.weight_dims, TilingDims::DimNC);
    }

    #[test]
    fn test_batch_split() {
        let cfg = plan(64, 1024, 512, &limits()).unwrap();
        assert_eq!(cfg.inputs.dims(), &[16, 1024]);
        assert_eq!(cfg.outputs.dims(), &[16, 512]);
        assert_eq!(cfg.input_dims, TilingDims::DimN);
        assert_eq!(cfg.output_dims, TilingDims::DimN);
        assert_eq!(cfg.weights.unwrap().dims(), &[16, 1024]);
    }

    #[test]
    fn test_output_row_too_large() {
        assert!(matches!(
            plan(1, 64, 32768, &limits()),
            Err(TilingError::UnsupportedOutputTiling { required: 65536, budget: 32768 })
        ));
    }

    #[test]
    fn test_weights_infeasible() {
        let mut limits = limits();
        limits.weights = MemoryBudget::from_bytes(64);
        assert!(matches!(
            plan(1, 64, 16, &limits),
            Err(TilingError::NoFeasibleTiling {
                operand: OperandRole::Weights,
                footprint: 128,
                budget: 64,
            })
        ));
    }

    #[test]
    fn test_shape_checks() {
        let policy = InnerProduct::new();
        let inputs = Shape::nc(1, 64, 8);
        let outputs = Shape::nc(1, 16, 8);
        assert!(matches!(
            policy.compute_tile_shapes(&inputs, None, &outputs, &limits()),
            Err(TilingError::ShapeMismatch(_))
        ));
        assert!(matches!(
            policy.compute_tile_shapes(&inputs, Some(&Shape::nc(16, 32, 8)), &outputs, &limits()),
            Err(TilingError::ShapeMismatch(_))
        ));
        let nhwc = Shape::nhwc(1, 2, 2, 16, 8);
        assert!(matches!(
            policy.compute_tile_shapes(&nhwc, Some(&Shape::nc(16, 64, 8)), &outputs, &limits()),
            Err(TilingError::UnsupportedLayout { .. })
        ));
    }
}
