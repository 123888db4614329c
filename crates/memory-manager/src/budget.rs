// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Byte budgets for scratchpads and host memory.

use crate::MemoryError;
use std::fmt;

/// Binary suffixes accepted by [`MemoryBudget::parse`], longest first so
/// that `"KB"` is matched before `"B"`.
const SUFFIXES: &[(&str, usize)] = &[
    ("GB", 1 << 30),
    ("MB", 1 << 20),
    ("KB", 1 << 10),
    ("G", 1 << 30),
    ("M", 1 << 20),
    ("K", 1 << 10),
    ("B", 1),
];

/// A hard byte ceiling.
///
/// Used both for a single scratchpad (the capacity one tile must fit in) and
/// for the host pool that backs all live tensors.
///
/// # Examples
/// ```
/// use memory_manager::MemoryBudget;
///
/// let spad = MemoryBudget::parse("32K").unwrap();
/// assert_eq!(spad.as_bytes(), 32 * 1024);
/// assert!(spad.fits(32 * 1024));
/// assert!(!spad.fits(32 * 1024 + 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MemoryBudget {
    bytes: usize,
}

impl MemoryBudget {
    /// Creates a budget from a byte count.
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    /// Creates a budget from kibibytes.
    pub fn from_kb(kb: usize) -> Self {
        Self { bytes: kb << 10 }
    }

    /// Creates a budget from mebibytes.
    pub fn from_mb(mb: usize) -> Self {
        Self { bytes: mb << 20 }
    }

    /// Returns the budget in bytes.
    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the budget in kibibytes (truncated).
    pub fn as_kb(&self) -> usize {
        self.bytes >> 10
    }

    /// Returns the budget in mebibytes (truncated).
    pub fn as_mb(&self) -> usize {
        self.bytes >> 20
    }

    /// Returns `true` if `bytes` fits within the budget.
    pub fn fits(&self, bytes: usize) -> bool {
        bytes <= self.bytes
    }

    /// Returns how many whole `unit_bytes` chunks fit in the budget.
    ///
    /// A zero `unit_bytes` is treated as "anything fits".
    pub fn capacity_in(&self, unit_bytes: usize) -> usize {
        if unit_bytes == 0 {
            usize::MAX
        } else {
            self.bytes / unit_bytes
        }
    }

    /// Parses a human-readable budget such as `"32K"`, `"512MB"` or
    /// `"1048576"`. Suffixes are binary and case-insensitive.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let trimmed = s.trim();
        let invalid = |reason: &str| MemoryError::InvalidBudget {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("empty string"));
        }

        let upper = trimmed.to_ascii_uppercase();
        let (digits, multiplier) = SUFFIXES
            .iter()
            .find(|(suffix, _)| upper.ends_with(suffix))
            .map(|(suffix, mult)| (&trimmed[..trimmed.len() - suffix.len()], *mult))
            .unwrap_or((trimmed, 1));

        let value: usize = digits
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number with an optional K/M/G suffix"))?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("value overflows usize"))?;
        if bytes == 0 {
            return Err(invalid("budget must be non-zero"));
        }
        Ok(Self { bytes })
    }
}

impl fmt::Display for MemoryBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const UNITS: &[(usize, &str)] = &[(1 << 30, "GB"), (1 << 20, "MB"), (1 << 10, "KB")];
        for &(unit, label) in UNITS {
            if self.bytes >= unit && self.bytes % unit == 0 {
                return write!(f, "{} {label}", self.bytes / unit);
            }
        }
        write!(f, "{} B", self.bytes)
    }
}
