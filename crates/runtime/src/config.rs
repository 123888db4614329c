// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Backend configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! num_pes = 8
//! inputs_spad = "32K"
//! weights_spad = "32K"
//! outputs_spad = "32K"
//! alignment = 8
//! dtype = "f16"
//! host_memory = "512M"
//! enable_profiling = true
//! ```
//!
//! Missing keys take their [`Default`] values.

use crate::RuntimeError;
use memory_manager::MemoryBudget;
use std::path::Path;
use tensor_core::DType;
use tiling_planner::ScratchpadLimits;

/// Description of the accelerator the runtime tiles for.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Number of processing elements; inner-product weight tiles are sized
    /// in multiples of it.
    pub num_pes: usize,
    /// Inputs scratchpad capacity (human-readable, e.g. `"32K"`).
    pub inputs_spad: String,
    /// Weights scratchpad capacity.
    pub weights_spad: String,
    /// Outputs scratchpad capacity.
    pub outputs_spad: String,
    /// Innermost-dimension alignment in elements.
    pub alignment: usize,
    /// Element type of every operand.
    pub dtype: DType,
    /// Host memory available for tensors and tiles.
    pub host_memory: String,
    /// Whether to record phase durations.
    pub enable_profiling: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            num_pes: 8,
            inputs_spad: "32K".to_string(),
            weights_spad: "32K".to_string(),
            outputs_spad: "32K".to_string(),
            alignment: 8,
            dtype: DType::F16,
            host_memory: "512M".to_string(),
            enable_profiling: true,
        }
    }
}

impl BackendConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Parses the scratchpad capacities into planner limits.
    pub fn scratchpad_limits(&self) -> Result<ScratchpadLimits, RuntimeError> {
        if self.num_pes == 0 {
            return Err(RuntimeError::ConfigError("num_pes must be at least 1".into()));
        }
        let parse = |role: &str, s: &str| {
            MemoryBudget::parse(s).map_err(|e| {
                RuntimeError::ConfigError(format!("invalid {role} scratchpad: {e}"))
            })
        };
        Ok(ScratchpadLimits {
            inputs: parse("inputs", &self.inputs_spad)?,
            weights: parse("weights", &self.weights_spad)?,
            outputs: parse("outputs", &self.outputs_spad)?,
            element_size: self.dtype.size_bytes(),
            alignment: self.alignment,
            num_pes: self.num_pes,
        })
    }

    /// Parses the host memory budget.
    pub fn host_budget(&self) -> Result<MemoryBudget, RuntimeError> {
        MemoryBudget::parse(&self.host_memory)
            .map_err(|e| RuntimeError::ConfigError(format!("invalid host memory: {e}")))
    }
}
