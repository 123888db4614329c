// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tiling configuration: the output of a [`crate::TilingPolicy`].
//!
//! A configuration holds one tile shape per operand role. Each tile shape
//! has the rank of the operand it was derived from, with only the split
//! dimensions reduced. The configuration is the contract between the
//! planner and the tiled-execution driver.

use std::fmt;
use tensor_core::Shape;

/// Logical axis a strategy may split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Batch,
    Channel,
    Height,
    Width,
}

/// Which dimensions a tile shape splits.
///
/// Every strategy other than `None` tiles the batch dimension; strategies
/// naming more letters additionally split those axes. The order of the
/// variants is the order the channel-wise policy tries them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum TilingDims {
    /// Untiled.
    #[default]
    None,
    DimN,
    DimNC,
    DimNW,
    DimNCW,
    DimNH,
    DimNCH,
    DimNHW,
    DimNCHW,
}

impl TilingDims {
    /// Axes the strategy reduces, in the order they are sized. The last
    /// axis is the one grown to fill the scratchpad.
    pub fn axes(self) -> &'static [Axis] {
        use Axis::*;
        match self {
            TilingDims::None => &[],
            TilingDims::DimN => &[Batch],
            TilingDims::DimNC => &[Channel],
            TilingDims::DimNW => &[Width],
            TilingDims::DimNCW => &[Channel, Width],
            TilingDims::DimNH => &[Height],
            TilingDims::DimNCH => &[Channel, Height],
            TilingDims::DimNHW => &[Height, Width],
            TilingDims::DimNCHW => &[Channel, Height, Width],
        }
    }

    /// Whether the channel (or activation) axis is split.
    pub fn splits_channel(self) -> bool {
        self.axes().contains(&Axis::Channel)
    }

    /// The same strategy with the channel axis added.
    pub fn with_channel(self) -> Self {
        match self {
            TilingDims::None | TilingDims::DimN | TilingDims::DimNC => TilingDims::DimNC,
            TilingDims::DimNW | TilingDims::DimNCW => TilingDims::DimNCW,
            TilingDims::DimNH | TilingDims::DimNCH => TilingDims::DimNCH,
            TilingDims::DimNHW | TilingDims::DimNCHW => TilingDims::DimNCHW,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TilingDims::None => "None",
            TilingDims::DimN => "DimN",
            TilingDims::DimNC => "DimNC",
            TilingDims::DimNW => "DimNW",
            TilingDims::DimNCW => "DimNCW",
            TilingDims::DimNH => "DimNH",
            TilingDims::DimNCH => "DimNCH",
            TilingDims::DimNHW => "DimNHW",
            TilingDims::DimNCHW => "DimNCHW",
        }
    }
}

impl fmt::Display for TilingDims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tile shapes chosen for one operator invocation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TilingConfig {
    pub inputs: Shape,
    /// `None` for operators without weights.
    pub weights: Option<Shape>,
    pub outputs: Shape,
    pub input_dims: TilingDims,
    pub weight_dims: TilingDims,
    pub output_dims: TilingDims,
}

impl TilingConfig {
    /// A configuration that leaves every operand whole.
    pub fn untiled(inputs: &Shape, weights: Option<&Shape>, outputs: &Shape) -> Self {
        Self {
            inputs: inputs.clone(),
            weights: weights.cloned(),
            outputs: outputs.clone(),
            input_dims: TilingDims::None,
            weight_dims: TilingDims::None,
            output_dims: TilingDims::None,
        }
    }

    /// True if no operand is split.
    pub fn is_untiled(&self) -> bool {
        self.input_dims == TilingDims::None
            && self.weight_dims == TilingDims::None
            && self.output_dims == TilingDims::None
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        let weights = self
            .weights
            .as_ref()
            .map(|w| format!("{w} ({})", self.weight_dims))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "inputs {} ({}), weights {}, outputs {} ({})",
            self.inputs, self.input_dims, weights, self.outputs, self.output_dims
        )
    }
}

/// Number of tiles needed to cover `full` with tiles of `tile`.
///
/// # Examples
/// ```
/// use tensor_core::Shape;
/// use tiling_planner::tile_count;
///
/// let full = Shape::nhwc(1, 128, 128, 64, 8);
/// let tile = Shape::nhwc(1, 128, 16, 8, 8);
/// assert_eq!(tile_count(&full, &tile), 64);
/// ```
pub fn tile_count(full: &Shape, tile: &Shape) -> usize {
    full.dims()
        .iter()
        .zip(tile.dims())
        .map(|(&f, &t)| f.div_ceil(t.max(1)))
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_channel() {
        assert_eq!(TilingDims::None.with_channel(), TilingDims::DimNC);
        assert_eq!(TilingDims::DimNW.with_channel(), TilingDims::DimNCW);
        assert_eq!(TilingDims::DimNHW.with_channel(), TilingDims::DimNCHW);
        assert!(TilingDims::DimNCH.splits_channel());
        assert!(!TilingDims::DimNHW.splits_channel());
    }

    #[test]
    fn test_growth_axis_is_last() {
        assert_eq!(TilingDims::DimNCW.axes().last(), Some(&Axis::Width));
        assert_eq!(TilingDims::DimNCH.axes().last(), Some(&Axis::Height));
        assert!(TilingDims::None.axes().is_empty());
    }

    #[test]
    fn test_tile_count_rounds_up() {
        let full = Shape::nc(3, 100, 8);
        assert_eq!(tile_count(&full, &Shape::nc(1, 64, 8)), 6);
        assert_eq!(tile_count(&full, &full), 1);
    }

    #[test]
    fn test_untiled_and_summary() {
        let s = Shape::nc(1, 16, 8);
        let w = Shape::nc(4, 16, 8);
        let cfg = TilingConfig::untiled(&s, Some(&w), &s);
        assert!(cfg.is_untiled());
        assert_eq!(
            cfg.summary(),
            "inputs [1, 16] (None), weights [4, 16] (None), outputs [1, 16] (None)"
        );
    }

    #[test]
    fn test_serialize() {
        let s = Shape::nc(1, 16, 8);
        let cfg = TilingConfig::untiled(&s, None, &s);
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["input_dims"], "None");
        assert!(json["weights"].is_null());
    }
}
