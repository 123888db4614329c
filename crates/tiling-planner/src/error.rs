// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the tiling planner.

use crate::OperandRole;
use tensor_core::Layout;

/// Errors raised while choosing tile shapes.
///
/// All of these are configuration errors: they are reported before any
/// tile is generated or any kernel runs.
#[derive(Debug, thiserror::Error)]
pub enum TilingError {
    /// An operand does not have the rank its layout or operator requires.
    #[error("{operand} must have rank {expected}, got {actual}")]
    RankMismatch {
        operand: OperandRole,
        expected: usize,
        actual: usize,
    },

    /// The policy cannot tile operands in this layout.
    #[error("{policy} tiling does not support {layout} {operand}")]
    UnsupportedLayout {
        policy: &'static str,
        operand: OperandRole,
        layout: Layout,
    },

    /// Operand shapes disagree with each other.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A single output row does not fit and outputs may not be split along
    /// neurons.
    #[error("output row of {required} bytes exceeds the {budget}-byte outputs scratchpad; splitting outputs along neurons is not supported")]
    UnsupportedOutputTiling { required: usize, budget: usize },

    /// No strategy produces a tile that fits.
    #[error("no feasible tiling for {operand}: smallest tile needs {footprint} bytes, scratchpad holds {budget}")]
    NoFeasibleTiling {
        operand: OperandRole,
        footprint: usize,
        budget: usize,
    },

    /// Limits are unusable (zero element size or PE count).
    #[error("invalid scratchpad limits: {0}")]
    InvalidLimits(String),
}
