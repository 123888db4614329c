// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end tiled execution.
//!
//! These tests exercise the complete flow from backend configuration →
//! declaration → planning → tiling → kernel driving → untiling with
//! reference f32 kernels, and check that tiled results equal results
//! computed directly on the whole tensors.

use proptest::prelude::*;
use runtime::{
    BackendConfig, BatchNormOp, InnerProductOp, KernelCall, KernelError, OpKind, Operator,
    ReluOp, RuntimeError, TileExecutor, TileKernel,
};
use tensor_core::{DType, Shape, Tensor};
use tiling_planner::TilingDims;

// ── Reference kernels ──────────────────────────────────────────

/// Straightforward f32 kernels reading tiles through logical positions.
struct Reference;

impl TileKernel for Reference {
    fn invoke(&mut self, call: KernelCall<'_>) -> Result<(), KernelError> {
        match call.op {
            OpKind::InnerProduct => inner_product(call),
            OpKind::BatchNorm { epsilon } => batch_norm(call, epsilon),
            OpKind::Relu { slope } => relu(call, slope),
        }
    }
}

fn inner_product(call: KernelCall<'_>) -> Result<(), KernelError> {
    let w = call.weights.ok_or("inner product without weights")?;
    let (rows, neurons, acts) = (call.inputs.shape()[0], w.shape()[0], w.shape()[1]);
    for r in 0..rows {
        for k in 0..neurons {
            let mut sum = 0.0;
            for a in 0..acts {
                let x = call.inputs.get_f32(&[r, call.activation_offset + a])?;
                sum += x * w.get_f32(&[k, a])?;
            }
            let pos = [r, call.finished_neurons + k];
            let prev = if call.accumulate {
                call.outputs.get_f32(&pos)?
            } else {
                0.0
            };
            call.outputs.set_f32(&pos, prev + sum)?;
        }
    }
    Ok(())
}

fn normalise(x: f32, mean: f32, variance: f32, gamma: f32, beta: f32, epsilon: f32) -> f32 {
    gamma * (x - mean) / (variance + epsilon).sqrt() + beta
}

fn batch_norm(call: KernelCall<'_>, epsilon: f32) -> Result<(), KernelError> {
    let p = call.weights.ok_or("batch norm without parameters")?;
    let shape = call.inputs.shape();
    let c_dim = shape.layout().channel_dim().ok_or("no channel axis")?;
    let mut cursor = shape.start();
    while !cursor.is_end() {
        let pos = cursor.position().to_vec();
        let c = call.channel_offset + pos[c_dim];
        let y = normalise(
            call.inputs.get_f32(&pos)?,
            p.get_f32(&[0, c])?,
            p.get_f32(&[1, c])?,
            p.get_f32(&[2, c])?,
            p.get_f32(&[3, c])?,
            epsilon,
        );
        call.outputs.set_f32(&pos, y)?;
        cursor.advance();
    }
    Ok(())
}

fn leaky(x: f32, slope: f32) -> f32 {
    if x > 0.0 {
        x
    } else {
        slope * x
    }
}

fn relu(call: KernelCall<'_>, slope: f32) -> Result<(), KernelError> {
    let mut cursor = call.inputs.shape().start();
    while !cursor.is_end() {
        let pos = cursor.position().to_vec();
        let y = leaky(call.inputs.get_f32(&pos)?, slope);
        call.outputs.set_f32(&pos, y)?;
        cursor.advance();
    }
    Ok(())
}

// ── Helpers ────────────────────────────────────────────────────

fn config(inputs: &str, weights: &str, outputs: &str) -> BackendConfig {
    BackendConfig {
        inputs_spad: inputs.into(),
        weights_spad: weights.into(),
        outputs_spad: outputs.into(),
        dtype: DType::F32,
        host_memory: "16M".into(),
        ..Default::default()
    }
}

/// Small integers, so tiled partial sums are exact.
fn values(n: usize, seed: usize) -> Vec<f32> {
    (0..n).map(|i| ((i * 7 + seed) % 9) as f32 - 4.0).collect()
}

fn tensor(name: &str, shape: Shape, data: &[f32]) -> Tensor {
    Tensor::from_f32(name, shape, data).unwrap()
}

fn run_inner_product(
    config: BackendConfig,
    b: usize,
    a: usize,
    k: usize,
) -> (Vec<f32>, runtime::ExecutionOutput) {
    let mut exec = TileExecutor::new(config).unwrap();
    let ws = exec.workspace_mut();
    ws.add_tensor(tensor("x", Shape::nc(b, a, 8), &values(b * a, 1))).unwrap();
    ws.add_tensor(tensor("w", Shape::nc(a, k, 8), &values(a * k, 5))).unwrap();
    let mut exec = exec
        .declare(Operator::InnerProduct(InnerProductOp::new("fc", "x", "w", "y")))
        .unwrap()
        .plan()
        .unwrap();
    let output = exec.run(&mut Reference).unwrap();
    let y = exec.workspace().tensor("y").unwrap().to_f32_vec().unwrap();
    (y, output)
}

fn inner_product_reference(b: usize, a: usize, k: usize) -> Vec<f32> {
    let (x, w) = (values(b * a, 1), values(a * k, 5));
    let mut y = vec![0.0; b * k];
    for r in 0..b {
        for j in 0..k {
            y[r * k + j] = (0..a).map(|i| x[r * a + i] * w[i * k + j]).sum();
        }
    }
    y
}

// ── Inner product ──────────────────────────────────────────────

#[test]
fn test_inner_product_split_reduction() {
    let (y, out) = run_inner_product(config("1K", "1K", "1K"), 2, 300, 40);

    assert_eq!(out.config.inputs.dims(), &[1, 32]);
    assert_eq!(out.config.weights.as_ref().unwrap().dims(), &[8, 32]);
    assert_eq!(out.config.input_dims, TilingDims::DimNC);
    assert_eq!(out.config.weight_dims, TilingDims::DimNC);

    // 2 batch tiles x 5 neuron tiles x 10 reduction tiles.
    let m = &out.metrics;
    assert_eq!(m.invocations, 100);
    assert_eq!(m.accumulate_calls, 90);
    assert_eq!(m.flush_calls, 2);
    assert_eq!((m.input_tiles, m.weight_tiles, m.output_tiles), (20, 50, 2));

    assert_eq!(y, inner_product_reference(2, 300, 40));
}

#[test]
fn test_inner_product_stationary_inputs() {
    let (y, out) = run_inner_product(config("2K", "1K", "1K"), 2, 300, 40);

    assert_eq!(out.config.inputs.dims(), &[1, 300]);
    assert_eq!(out.config.input_dims, TilingDims::DimN);
    assert_eq!(out.config.weights.as_ref().unwrap().dims(), &[8, 32]);
    assert_eq!(out.metrics.input_tiles, 2);
    assert_eq!(out.metrics.invocations, 100);

    assert_eq!(y, inner_product_reference(2, 300, 40));
}

#[test]
fn test_inner_product_tiled_equals_untiled() {
    let (untiled, big) = run_inner_product(config("512K", "512K", "512K"), 3, 100, 20);
    assert!(big.config.is_untiled());
    assert_eq!(big.metrics.invocations, 1);

    let (tiled, small) = run_inner_product(config("256", "512", "256"), 3, 100, 20);
    assert!(!small.config.is_untiled());
    assert!(small.metrics.invocations > 1);
    assert_eq!(tiled, untiled);
}

#[test]
fn test_host_budget_exhausted() {
    let mut exec = TileExecutor::new(BackendConfig {
        host_memory: "8K".into(),
        ..config("1K", "1K", "1K")
    })
    .unwrap();
    let ws = exec.workspace_mut();
    ws.add_tensor(tensor("x", Shape::nc(2, 300, 8), &values(600, 1))).unwrap();
    ws.add_tensor(tensor("w", Shape::nc(300, 40, 8), &values(12000, 5))).unwrap();
    let err = exec
        .declare(Operator::InnerProduct(InnerProductOp::new("fc", "x", "w", "y")))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::TileError(_)));
    assert!(err.to_string().contains("out of memory"));
}

#[test]
fn test_output_row_too_wide() {
    let mut exec = TileExecutor::new(config("1K", "1K", "64")).unwrap();
    let ws = exec.workspace_mut();
    ws.add_tensor(tensor("x", Shape::nc(1, 8, 8), &values(8, 1))).unwrap();
    ws.add_tensor(tensor("w", Shape::nc(8, 32, 8), &values(256, 5))).unwrap();
    let err = exec
        .declare(Operator::InnerProduct(InnerProductOp::new("fc", "x", "w", "y")))
        .unwrap()
        .plan()
        .unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::TilingError(tiling_planner::TilingError::UnsupportedOutputTiling { .. })
    ));
}

// ── Batch norm ─────────────────────────────────────────────────

fn run_batch_norm(config: BackendConfig) -> (Vec<f32>, Vec<f32>, runtime::ExecutionOutput) {
    let (h, w, c) = (8, 8, 24);
    let x = values(h * w * c, 3);
    let mut exec = TileExecutor::new(config).unwrap();
    let ws = exec.workspace_mut();
    ws.add_tensor(tensor("x", Shape::nhwc(1, h, w, c, 8), &x)).unwrap();
    let params: [(&str, Vec<f32>); 4] = [
        ("bn.mean", (0..c).map(|i| (i % 5) as f32).collect()),
        ("bn.variance", (0..c).map(|i| 1.0 + (i % 3) as f32).collect()),
        ("bn.gamma", (0..c).map(|i| 0.5 + i as f32 / 8.0).collect()),
        ("bn.beta", (0..c).map(|i| i as f32 - 10.0).collect()),
    ];
    for (name, data) in &params {
        ws.add_tensor(tensor(name, Shape::nc(1, c, 8), data)).unwrap();
    }
    let mut exec = exec
        .declare(Operator::BatchNorm(BatchNormOp::new("bn", "x", "y")))
        .unwrap()
        .plan()
        .unwrap();
    let output = exec.run(&mut Reference).unwrap();
    let y = exec.workspace().tensor("y").unwrap().to_f32_vec().unwrap();

    let expected = x
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let ch = i % c;
            let p = |j: usize| params[j].1[ch];
            normalise(v, p(0), p(1), p(2), p(3), 1e-5)
        })
        .collect();
    (y, expected, output)
}

#[test]
fn test_batch_norm_channel_tiles() {
    let (y, expected, out) = run_batch_norm(config("2K", "2K", "2K"));
    assert_eq!(out.config.inputs.dims(), &[1, 8, 8, 8]);
    assert_eq!(out.config.input_dims, TilingDims::DimNC);
    assert_eq!(out.config.weight_dims, TilingDims::None);
    assert_eq!(out.metrics.invocations, 3);
    assert_eq!(out.metrics.flush_calls, 3);
    assert_eq!(out.metrics.accumulate_calls, 0);
    assert_eq!(y, expected);
}

#[test]
fn test_batch_norm_split_parameters() {
    let (y, expected, out) = run_batch_norm(config("2K", "128", "2K"));
    assert_eq!(out.config.weights.as_ref().unwrap().dims(), &[4, 8]);
    assert_eq!(out.config.weight_dims, TilingDims::DimNC);
    assert_eq!(out.metrics.weight_tiles, 3);
    assert_eq!(y, expected);
}

#[test]
fn test_batch_norm_untiled() {
    let (y, expected, out) = run_batch_norm(config("32K", "32K", "32K"));
    assert!(out.config.is_untiled());
    assert_eq!(out.metrics.invocations, 1);
    assert_eq!(y, expected);
}

// ── ReLU ───────────────────────────────────────────────────────

fn run_relu(config: BackendConfig, shape: Shape, slope: f32) -> (Vec<f32>, Vec<f32>, usize) {
    let x: Vec<f32> = values(shape.num_elements(), 2);
    let mut exec = TileExecutor::new(config).unwrap();
    exec.workspace_mut().add_tensor(tensor("x", shape, &x)).unwrap();
    let mut exec = exec
        .declare(Operator::Relu(ReluOp::new("relu", "x", "y").with_slope(slope)))
        .unwrap()
        .plan()
        .unwrap();
    let out = exec.run(&mut Reference).unwrap();
    let y = exec.workspace().tensor("y").unwrap().to_f32_vec().unwrap();
    let expected = x.iter().map(|&v| leaky(v, slope)).collect();
    (y, expected, out.metrics.invocations)
}

#[test]
fn test_relu_batch_tiles() {
    let (y, expected, calls) = run_relu(config("256", "256", "256"), Shape::nc(3, 50, 8), 0.1);
    assert_eq!(calls, 3);
    assert_eq!(y, expected);
}

#[test]
fn test_relu_spatial_tiles() {
    // 1 x 64 x 64 x 32 f32 is 512 KiB; width tiles of 8 fit 64 KiB.
    let (y, expected, calls) =
        run_relu(config("64K", "64K", "64K"), Shape::nhwc(1, 64, 64, 32, 8), 0.0);
    assert_eq!(calls, 8);
    assert_eq!(y, expected);
}

// ── Properties ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_tiled_inner_product_matches_reference(
        b in 1usize..4,
        a in 1usize..120,
        k in 1usize..48,
        inputs in 256usize..2048,
        weights in 256usize..2048,
        outputs in 256usize..1024,
    ) {
        let cfg = config(&inputs.to_string(), &weights.to_string(), &outputs.to_string());
        let (y, out) = run_inner_product(cfg, b, a, k);
        prop_assert_eq!(y, inner_product_reference(b, a, k));
        prop_assert_eq!(out.metrics.flush_calls, out.metrics.output_tiles);
    }

    #[test]
    fn prop_tiled_relu_matches_reference(
        rows in 1usize..6,
        cols in 1usize..80,
        spad in 64usize..1024,
    ) {
        let s = spad.to_string();
        let (y, expected, _) = run_relu(config(&s, &s, &s), Shape::nc(rows, cols, 8), 0.25);
        prop_assert_eq!(y, expected);
    }
}
