// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Executes neural-network operators tile by tile on an accelerator with
//! small per-operand scratchpads.
//!
//! The runtime takes:
//! - A [`BackendConfig`] describing the scratchpads, alignment and PE count.
//! - An [`Operator`] whose tensors live in a `tile_engine::Workspace`.
//! - A [`TileKernel`] that computes one tile combination at a time.
//!
//! It asks `tiling-planner` for tile shapes, cuts the operands with
//! `tile-engine`, drives the kernel through the tile loops with the right
//! accumulate/flush flags and reassembles the output.
//!
//! # Type-State Pipeline
//! The executor enforces a type-safe pipeline:
//! ```text
//! TileExecutor<Idle> → TileExecutor<Declared> → TileExecutor<Planned>
//! ```
//! Transitions are compile-time checked.

mod config;
pub mod driver;
mod engine;
mod error;
mod metrics;
mod operator;

pub use config::BackendConfig;
pub use driver::{KernelCall, KernelError, OpKind, TileKernel};
pub use engine::{Declared, ExecutionOutput, ExecutorState, Idle, Planned, TileExecutor};
pub use error::RuntimeError;
pub use metrics::ExecutionMetrics;
pub use operator::{BatchNormOp, InnerProductOp, Operator, ReluOp};
