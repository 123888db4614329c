// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: Watch the planner and driver tile the same operators under
//! shrinking scratchpads.
//!
//! Each row plans and runs a batch norm and an inner product with a
//! counting kernel and prints the chosen tile shapes and invocation
//! counts.
//!
//! ```bash
//! RUST_LOG=debug cargo run -p runtime --example tiling_walkthrough
//! ```

use runtime::{
    BackendConfig, BatchNormOp, InnerProductOp, KernelCall, KernelError, Operator, TileExecutor,
    TileKernel,
};
use tensor_core::{DType, Shape, Tensor};
use tracing_subscriber::EnvFilter;

/// Counts invocations without computing anything.
#[derive(Default)]
struct Counting {
    calls: usize,
}

impl TileKernel for Counting {
    fn invoke(&mut self, _call: KernelCall<'_>) -> Result<(), KernelError> {
        self.calls += 1;
        Ok(())
    }
}

fn run(
    config: &BackendConfig,
    operator: Operator,
    tensors: Vec<Tensor>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut executor = TileExecutor::new(config.clone())?;
    for t in tensors {
        executor.workspace_mut().add_tensor(t)?;
    }
    let mut executor = executor.declare(operator)?.plan()?;
    let mut kernel = Counting::default();
    let output = executor.run(&mut kernel)?;

    let cfg = &output.config;
    let weights = cfg
        .weights
        .as_ref()
        .map(|w| format!("{w} {}", cfg.weight_dims))
        .unwrap_or_default();
    println!(
        "  {:<14} {:<28} {:<24} {:>6}",
        executor.operator().name(),
        format!("{} {}", cfg.inputs, cfg.input_dims),
        weights,
        kernel.calls,
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (h, w, c) = (32, 32, 64);
    let (batch, acts, neurons) = (4, 2048, 256);

    for spad in ["256K", "64K", "16K", "4K"] {
        let config = BackendConfig {
            inputs_spad: spad.into(),
            weights_spad: spad.into(),
            outputs_spad: spad.into(),
            dtype: DType::F16,
            ..Default::default()
        };
        println!("\nScratchpads: {spad} per role");
        println!(
            "  {:<14} {:<28} {:<24} {:>6}",
            "Operator", "Input tile", "Weight tile", "Calls"
        );
        println!("  {}", "-".repeat(75));

        let mut bn_tensors = vec![Tensor::zeros("x", Shape::nhwc(1, h, w, c, 8), DType::F16)];
        for p in ["mean", "variance", "gamma", "beta"] {
            bn_tensors.push(Tensor::zeros(format!("bn.{p}"), Shape::nc(1, c, 8), DType::F16));
        }
        let bn = Operator::BatchNorm(BatchNormOp::new("bn", "x", "y"));
        if let Err(e) = run(&config, bn, bn_tensors) {
            println!("  {:<14} {e}", "bn");
        }

        let fc_tensors = vec![
            Tensor::zeros("x", Shape::nc(batch, acts, 8), DType::F16),
            Tensor::zeros("w", Shape::nc(acts, neurons, 8), DType::F16),
        ];
        let fc = Operator::InnerProduct(InnerProductOp::new("fc", "x", "w", "y"));
        if let Err(e) = run(&config, fc, fc_tensors) {
            println!("  {:<14} {e}", "fc");
        }
    }

    Ok(())
}
