// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shapes, layouts and alignment padding.
//!
//! A [`Shape`] separates the *logical* extent of each dimension from its
//! *storage* extent. Only the innermost dimension is ever padded, up to the
//! next multiple of the shape's alignment, so that vector loads on the
//! accelerator never straddle a row:
//!
//! ```text
//! logical  [1, 4, 4, 13]   alignment 8
//! storage  [1, 4, 4, 16]   padding  [0, 0, 0, 3]
//! ```

use crate::IndexCursor;
use std::fmt;
use std::ops::Index;

/// Ordering convention of a shape's dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Layout {
    /// Batch, channel (fully connected activations).
    Nc,
    /// Batch, height, width, channel.
    Nhwc,
    /// Batch, channel, height, width.
    Nchw,
    /// No particular convention.
    X,
}

impl Layout {
    /// Rank implied by the layout, if it fixes one.
    pub fn rank(self) -> Option<usize> {
        match self {
            Layout::Nc => Some(2),
            Layout::Nhwc | Layout::Nchw => Some(4),
            Layout::X => None,
        }
    }

    /// Index of the batch dimension.
    pub fn batch_dim(self) -> Option<usize> {
        match self {
            Layout::Nc | Layout::Nhwc | Layout::Nchw => Some(0),
            Layout::X => None,
        }
    }

    /// Index of the channel (feature) dimension.
    pub fn channel_dim(self) -> Option<usize> {
        match self {
            Layout::Nc | Layout::Nchw => Some(1),
            Layout::Nhwc => Some(3),
            Layout::X => None,
        }
    }

    /// Index of the height (row) dimension.
    pub fn height_dim(self) -> Option<usize> {
        match self {
            Layout::Nhwc => Some(1),
            Layout::Nchw => Some(2),
            Layout::Nc | Layout::X => None,
        }
    }

    /// Index of the width (column) dimension.
    pub fn width_dim(self) -> Option<usize> {
        match self {
            Layout::Nhwc => Some(2),
            Layout::Nchw => Some(3),
            Layout::Nc | Layout::X => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Nc => "NC",
            Layout::Nhwc => "NHWC",
            Layout::Nchw => "NCHW",
            Layout::X => "X",
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of padding elements needed to round `value` up to `alignment`.
///
/// An alignment of 0 or 1 never pads.
pub fn calc_padding(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        0
    } else {
        (alignment - value % alignment) % alignment
    }
}

/// Dimensions of a tensor together with its layout and alignment.
///
/// Shapes are immutable. Two shapes are equal when their dimensions,
/// layout and alignment agree.
///
/// # Examples
/// ```
/// use tensor_core::{Layout, Shape};
///
/// let s = Shape::nhwc(1, 4, 4, 13, 8);
/// assert_eq!(s.rank(), 4);
/// assert_eq!(s.num_elements(), 208);
/// assert_eq!(s.padding(3), 3);
/// assert_eq!(s.storage_dim(3), 16);
/// assert_eq!(s.storage_size(), 256);
/// assert_eq!(s.layout(), Layout::Nhwc);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
    layout: Layout,
    #[serde(default)]
    alignment: usize,
}

impl Shape {
    /// Creates a shape from outer-to-inner dimensions.
    pub fn new(dims: impl Into<Vec<usize>>, layout: Layout, alignment: usize) -> Self {
        Self {
            dims: dims.into(),
            layout,
            alignment,
        }
    }

    /// Creates a shape whose innermost dimension is never padded.
    pub fn unaligned(dims: impl Into<Vec<usize>>, layout: Layout) -> Self {
        Self::new(dims, layout, 0)
    }

    /// Creates an `NHWC` shape.
    pub fn nhwc(n: usize, h: usize, w: usize, c: usize, alignment: usize) -> Self {
        Self::new(vec![n, h, w, c], Layout::Nhwc, alignment)
    }

    /// Creates an `NC` shape.
    pub fn nc(n: usize, c: usize, alignment: usize) -> Self {
        Self::new(vec![n, c], Layout::Nc, alignment)
    }

    /// Returns a shape with the same layout and alignment but new dimensions.
    pub fn with_dims(&self, dims: impl Into<Vec<usize>>) -> Self {
        Self::new(dims, self.layout, self.alignment)
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Logical dimensions, outer to inner.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Logical size of dimension `index`, or `None` if out of range.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.dims.get(index).copied()
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Padding elements appended to dimension `index`.
    ///
    /// Non-zero only for the innermost dimension.
    pub fn padding(&self, index: usize) -> usize {
        if index + 1 == self.rank() {
            calc_padding(self.dims[index], self.alignment)
        } else {
            0
        }
    }

    /// Storage extent of dimension `index` (logical size plus padding).
    pub fn storage_dim(&self, index: usize) -> usize {
        self.dims[index] + self.padding(index)
    }

    /// Storage extents of all dimensions.
    pub fn storage_dims(&self) -> Vec<usize> {
        (0..self.rank()).map(|i| self.storage_dim(i)).collect()
    }

    /// Number of logical elements. A rank-0 shape holds one element.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Number of stored elements, padding included.
    pub fn storage_size(&self) -> usize {
        (0..self.rank()).map(|i| self.storage_dim(i)).product()
    }

    /// Storage footprint in bytes for elements of `dtype`.
    pub fn size_bytes(&self, dtype: crate::DType) -> usize {
        self.storage_size() * dtype.size_bytes()
    }

    /// Row-major strides over the storage extents, in elements.
    pub fn storage_strides(&self) -> Vec<usize> {
        let rank = self.rank();
        let mut strides = vec![1usize; rank];
        for i in (0..rank.saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.storage_dim(i + 1);
        }
        strides
    }

    /// Storage offset (in elements) of a logical position.
    pub fn storage_offset(&self, position: &[usize]) -> usize {
        debug_assert_eq!(position.len(), self.rank());
        position
            .iter()
            .zip(self.storage_strides())
            .map(|(p, s)| p * s)
            .sum()
    }

    /// Cursor at the first logical position of the whole shape.
    pub fn start(&self) -> IndexCursor {
        IndexCursor::new(self)
    }
}

impl Index<usize> for Shape {
    type Output = usize;

    fn index(&self, index: usize) -> &usize {
        &self.dims[index]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{d}")?;
        }
        write!(f, "]")
    }
}
