// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-role scratchpad capacities.

use crate::TilingError;
use memory_manager::MemoryBudget;
use std::fmt;
use tensor_core::Shape;

/// Which scratchpad an operand is staged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperandRole {
    Inputs,
    Weights,
    Outputs,
}

impl fmt::Display for OperandRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperandRole::Inputs => "inputs",
            OperandRole::Weights => "weights",
            OperandRole::Outputs => "outputs",
        })
    }
}

/// Capacities and granularities a tile must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ScratchpadLimits {
    pub inputs: MemoryBudget,
    pub weights: MemoryBudget,
    pub outputs: MemoryBudget,
    /// Bytes per element.
    pub element_size: usize,
    /// Channel granularity; 0 or 1 disables rounding.
    pub alignment: usize,
    /// Neuron granularity for inner-product weight tiles.
    pub num_pes: usize,
}

impl ScratchpadLimits {
    /// Limits with the same capacity for every role.
    pub fn uniform(
        capacity: MemoryBudget,
        element_size: usize,
        alignment: usize,
        num_pes: usize,
    ) -> Self {
        Self {
            inputs: capacity,
            weights: capacity,
            outputs: capacity,
            element_size,
            alignment,
            num_pes,
        }
    }

    pub fn budget(&self, role: OperandRole) -> MemoryBudget {
        match role {
            OperandRole::Inputs => self.inputs,
            OperandRole::Weights => self.weights,
            OperandRole::Outputs => self.outputs,
        }
    }

    /// Bytes a tile of `shape` occupies, padding included.
    pub fn footprint(&self, shape: &Shape) -> usize {
        shape.storage_size() * self.element_size
    }

    /// Whether a tile of `shape` fits the scratchpad of `role`.
    pub fn fits(&self, role: OperandRole, shape: &Shape) -> bool {
        self.budget(role).fits(self.footprint(shape))
    }

    /// Alignment as a usable granule (never 0).
    pub fn channel_granule(&self) -> usize {
        self.alignment.max(1)
    }

    pub(crate) fn validate(&self) -> Result<(), TilingError> {
        if self.element_size == 0 {
            return Err(TilingError::InvalidLimits("element size is zero".into()));
        }
        if self.num_pes == 0 {
            return Err(TilingError::InvalidLimits("PE count is zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_uses_storage_size() {
        let limits = ScratchpadLimits::uniform(MemoryBudget::from_bytes(64), 2, 8, 8);
        // 2 rows of 13 -> storage 2 x 16 = 32 elements = 64 bytes.
        assert!(limits.fits(OperandRole::Inputs, &Shape::nc(2, 13, 8)));
        assert!(!limits.fits(OperandRole::Inputs, &Shape::nc(2, 17, 8)));
        assert_eq!(limits.footprint(&Shape::nc(2, 17, 8)), 96);
    }

    #[test]
    fn test_roles() {
        let mut limits = ScratchpadLimits::uniform(MemoryBudget::from_kb(32), 2, 8, 8);
        limits.weights = MemoryBudget::from_kb(64);
        assert_eq!(limits.budget(OperandRole::Weights).as_kb(), 64);
        assert_eq!(limits.budget(OperandRole::Outputs).as_kb(), 32);
        assert_eq!(OperandRole::Weights.to_string(), "weights");
    }

    #[test]
    fn test_validate() {
        let limits = ScratchpadLimits::uniform(MemoryBudget::from_kb(32), 0, 8, 8);
        assert!(matches!(limits.validate(), Err(TilingError::InvalidLimits(_))));
        assert_eq!(ScratchpadLimits::uniform(MemoryBudget::from_kb(1), 2, 0, 8).channel_granule(), 1);
    }
}
