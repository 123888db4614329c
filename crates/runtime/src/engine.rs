// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The tile executor with a type-state–enforced pipeline.
//!
//! ```text
//! TileExecutor<Idle>
//!     │  .declare(operator)
//!     ▼
//! TileExecutor<Declared>
//!     │  .plan()
//!     ▼
//! TileExecutor<Planned>
//!     │  .run(kernel)
//!     ▼
//!   ExecutionOutput
//! ```
//!
//! Each state transition consumes the old value and returns a new one,
//! making invalid state sequences a compile error. A `Planned` executor
//! can run any number of times; inputs may be rewritten between runs
//! through [`TileExecutor::workspace_mut`].

use crate::driver::TileKernel;
use crate::{BackendConfig, ExecutionMetrics, Operator, RuntimeError};
use std::time::{Duration, Instant};
use tile_engine::Workspace;
use tiling_planner::{ScratchpadLimits, TilingConfig};

// ── Type-state markers ─────────────────────────────────────────

/// Executor is created; input tensors can be registered.
#[derive(Debug)]
pub struct Idle;

/// An operator is attached and its tensors exist.
#[derive(Debug)]
pub struct Declared;

/// Tile shapes are chosen; the executor can run.
#[derive(Debug)]
pub struct Planned;

/// Sealed trait for executor states.
pub trait ExecutorState: std::fmt::Debug {}
impl ExecutorState for Idle {}
impl ExecutorState for Declared {}
impl ExecutorState for Planned {}

// ── Execution output ───────────────────────────────────────────

/// The result of one tiled run. The output values are in the workspace
/// under the operator's output name.
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    /// Tile shapes the run used.
    pub config: TilingConfig,
    pub metrics: ExecutionMetrics,
}

// ── Executor ───────────────────────────────────────────────────

/// Runs one operator tile by tile within a backend's scratchpad limits.
///
/// # Example
/// ```
/// use runtime::{BackendConfig, KernelCall, KernelError, Operator, ReluOp, TileExecutor, TileKernel};
/// use tensor_core::{DType, Shape, Tensor};
///
/// struct Noop;
/// impl TileKernel for Noop {
///     fn invoke(&mut self, _call: KernelCall<'_>) -> Result<(), KernelError> {
///         Ok(())
///     }
/// }
///
/// # fn main() -> Result<(), runtime::RuntimeError> {
/// let config = BackendConfig {
///     inputs_spad: "1K".into(),
///     outputs_spad: "1K".into(),
///     dtype: DType::F32,
///     ..Default::default()
/// };
/// let mut executor = TileExecutor::new(config)?;
/// executor
///     .workspace_mut()
///     .add_tensor(Tensor::zeros("x", Shape::nc(8, 64, 8), DType::F32))?;
///
/// let mut executor = executor
///     .declare(Operator::Relu(ReluOp::new("relu", "x", "y")))?
///     .plan()?;
/// let output = executor.run(&mut Noop)?;
/// assert_eq!(output.metrics.invocations, 2);
/// # Ok(())
/// # }
/// ```
pub struct TileExecutor<S: ExecutorState = Idle> {
    config: BackendConfig,
    limits: ScratchpadLimits,
    workspace: Workspace,
    _state: std::marker::PhantomData<S>,
    // Fields populated as the executor transitions through states:
    operator: Option<Operator>,
    tiling: Option<TilingConfig>,
    planning_duration: Duration,
}

impl<S: ExecutorState> TileExecutor<S> {
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn limits(&self) -> &ScratchpadLimits {
        &self.limits
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    /// Consumes the executor, keeping its tensors.
    pub fn into_workspace(self) -> Workspace {
        self.workspace
    }

    fn transition<T: ExecutorState>(self) -> TileExecutor<T> {
        TileExecutor {
            config: self.config,
            limits: self.limits,
            workspace: self.workspace,
            _state: std::marker::PhantomData,
            operator: self.operator,
            tiling: self.tiling,
            planning_duration: self.planning_duration,
        }
    }
}

// ── Idle → Declared ────────────────────────────────────────────

impl TileExecutor<Idle> {
    /// Creates an executor with an empty workspace sized to the host
    /// memory budget.
    pub fn new(config: BackendConfig) -> Result<Self, RuntimeError> {
        let limits = config.scratchpad_limits()?;
        let budget = config.host_budget()?;
        tracing::info!(
            num_pes = config.num_pes,
            dtype = %config.dtype,
            inputs = %limits.inputs,
            weights = %limits.weights,
            outputs = %limits.outputs,
            host = %budget,
            "executor created"
        );
        Ok(Self {
            config,
            limits,
            workspace: Workspace::new(budget),
            _state: std::marker::PhantomData,
            operator: None,
            tiling: None,
            planning_duration: Duration::ZERO,
        })
    }

    /// Attaches `operator` and creates its output and packed weights.
    /// Transitions to the `Declared` state.
    pub fn declare(mut self, operator: Operator) -> Result<TileExecutor<Declared>, RuntimeError> {
        operator.declare_tensors(&mut self.workspace, self.config.dtype)?;
        tracing::info!(op = operator.name(), kind = %operator.kind(), "operator declared");
        self.operator = Some(operator);
        Ok(self.transition())
    }
}

// ── Declared → Planned ─────────────────────────────────────────

impl TileExecutor<Declared> {
    pub fn operator(&self) -> &Operator {
        self.operator
            .as_ref()
            .expect("operator must exist in Declared state")
    }

    /// Chooses tile shapes for the operator.
    /// Transitions to the `Planned` state.
    pub fn plan(mut self) -> Result<TileExecutor<Planned>, RuntimeError> {
        let start = Instant::now();
        let tiling = self
            .operator()
            .compute_tiling(&self.workspace, &self.limits)?;
        if self.config.enable_profiling {
            self.planning_duration = start.elapsed();
        }
        tracing::info!(op = self.operator().name(), tiling = %tiling.summary(), "operator planned");
        self.tiling = Some(tiling);
        Ok(self.transition())
    }
}

// ── Planned: run ───────────────────────────────────────────────

impl TileExecutor<Planned> {
    pub fn operator(&self) -> &Operator {
        self.operator
            .as_ref()
            .expect("operator exists in Planned state")
    }

    /// Returns the chosen tile shapes.
    pub fn tiling(&self) -> &TilingConfig {
        self.tiling.as_ref().expect("tiling exists in Planned state")
    }

    /// Runs the operator tile by tile with `kernel`.
    ///
    /// Tiles are leased from the workspace pool for the duration of the
    /// run and returned before this method completes.
    pub fn run(&mut self, kernel: &mut dyn TileKernel) -> Result<ExecutionOutput, RuntimeError> {
        let start = Instant::now();
        let profile = self.config.enable_profiling;
        let operator = self
            .operator
            .as_ref()
            .expect("operator exists in Planned state");
        let tiling = self.tiling.as_ref().expect("tiling exists in Planned state");

        let mut metrics = operator.run(&mut self.workspace, tiling, kernel, profile)?;
        metrics.planning_duration = self.planning_duration;
        if profile {
            metrics.total_duration = start.elapsed();
        }
        metrics.peak_pool_bytes = self.workspace.pool().stats().peak_allocated_bytes;
        tracing::info!("{}", metrics.summary());

        Ok(ExecutionOutput {
            config: tiling.clone(),
            metrics,
        })
    }
}

impl<S: ExecutorState> std::fmt::Debug for TileExecutor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileExecutor")
            .field("state", &std::any::type_name::<S>())
            .field("operator", &self.operator.as_ref().map(Operator::name))
            .field("tensors", &self.workspace.len())
            .field("has_tiling", &self.tiling.is_some())
            .finish()
    }
}
