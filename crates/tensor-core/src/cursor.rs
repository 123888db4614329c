// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Multi-dimensional position cursor over a rectangular region.
//!
//! An [`IndexCursor`] walks the logical positions of a region inside a
//! parent tensor, innermost dimension fastest, and reports the flat
//! storage offset of each position using the parent's (padded) strides.

use crate::Shape;

/// Position within a region of a parent tensor.
///
/// The cursor remembers the region's origin and extents. [`position`]
/// is relative to the origin; [`offset`] is the flat storage offset in
/// the parent, in elements.
///
/// A region with any zero extent is empty: the cursor starts at its end.
/// A rank-0 region has exactly one position.
///
/// [`position`]: IndexCursor::position
/// [`offset`]: IndexCursor::offset
///
/// # Examples
/// ```
/// use tensor_core::{IndexCursor, Layout, Shape};
///
/// let parent = Shape::new(vec![4, 10], Layout::X, 8); // storage [4, 16]
/// let offsets: Vec<usize> = IndexCursor::region(&parent, &[1, 2], &[2, 2]).collect();
/// assert_eq!(offsets, vec![18, 19, 34, 35]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCursor {
    origin: Vec<usize>,
    extents: Vec<usize>,
    strides: Vec<usize>,
    position: Vec<usize>,
    done: bool,
}

impl IndexCursor {
    /// Cursor over every logical position of `shape`.
    pub fn new(shape: &Shape) -> Self {
        let origin = vec![0; shape.rank()];
        Self::region(shape, &origin, shape.dims())
    }

    /// Cursor over the sub-region `[origin, origin + extents)` of `parent`.
    ///
    /// `origin` and `extents` must have the parent's rank.
    pub fn region(parent: &Shape, origin: &[usize], extents: &[usize]) -> Self {
        debug_assert_eq!(origin.len(), parent.rank());
        debug_assert_eq!(extents.len(), parent.rank());
        Self {
            origin: origin.to_vec(),
            extents: extents.to_vec(),
            strides: parent.storage_strides(),
            position: vec![0; extents.len()],
            done: extents.iter().any(|&e| e == 0),
        }
    }

    /// Steps one position, innermost dimension fastest.
    pub fn advance(&mut self) {
        self.step(|_| 1);
    }

    /// Steps by a per-dimension stride.
    ///
    /// Starting from the innermost dimension, `stride[i]` is added to the
    /// position. If the result is still inside the extent the step is done;
    /// otherwise that dimension wraps to 0 and the carry moves outward.
    /// Overflowing the outermost dimension ends the walk.
    pub fn advance_by(&mut self, stride: &[usize]) {
        debug_assert_eq!(stride.len(), self.position.len());
        self.step(|i| stride[i]);
    }

    fn step(&mut self, stride: impl Fn(usize) -> usize) {
        if self.done {
            return;
        }
        for i in (0..self.position.len()).rev() {
            self.position[i] += stride(i);
            if self.position[i] < self.extents[i] {
                return;
            }
            self.position[i] = 0;
        }
        self.done = true;
    }

    /// True once the walk has passed the last position.
    pub fn is_end(&self) -> bool {
        self.done
    }

    /// Current position relative to the region origin.
    pub fn position(&self) -> &[usize] {
        &self.position
    }

    /// Current position in parent coordinates.
    pub fn absolute_position(&self) -> Vec<usize> {
        self.origin
            .iter()
            .zip(&self.position)
            .map(|(o, p)| o + p)
            .collect()
    }

    pub fn origin(&self) -> &[usize] {
        &self.origin
    }

    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Flat storage offset of the current position in the parent.
    pub fn offset(&self) -> usize {
        self.origin
            .iter()
            .zip(&self.position)
            .zip(&self.strides)
            .map(|((o, p), s)| (o + p) * s)
            .sum()
    }
}

/// Yields the storage offset of each position, then advances.
impl Iterator for IndexCursor {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        let offset = self.offset();
        self.advance();
        Some(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Layout;

    #[test]
    fn test_full_walk_is_row_major() {
        let shape = Shape::unaligned(vec![2, 3], Layout::X);
        let offsets: Vec<usize> = shape.start().collect();
        assert_eq!(offsets, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_walk_skips_padding() {
        let shape = Shape::new(vec![2, 3], Layout::X, 4);
        let offsets: Vec<usize> = shape.start().collect();
        assert_eq!(offsets, vec![0, 1, 2, 4, 5, 6]);
    }

    #[test]
    fn test_region_offsets() {
        let shape = Shape::unaligned(vec![3, 4, 5], Layout::X);
        let mut c = IndexCursor::region(&shape, &[1, 1, 2], &[1, 2, 2]);
        assert_eq!(c.offset(), 20 + 5 + 2);
        c.advance();
        assert_eq!(c.position(), &[0, 0, 1]);
        assert_eq!(c.absolute_position(), vec![1, 1, 3]);
        c.advance();
        assert_eq!(c.position(), &[0, 1, 0]);
        assert_eq!(c.offset(), 20 + 10 + 2);
        c.advance();
        c.advance();
        assert!(c.is_end());
    }

    #[test]
    fn test_advance_by_block() {
        let shape = Shape::unaligned(vec![2, 4, 6], Layout::X);
        let mut c = IndexCursor::new(&shape);
        let mut visited = Vec::new();
        while !c.is_end() {
            visited.push(c.position().to_vec());
            c.advance_by(&[1, 1, 6]);
        }
        assert_eq!(visited.len(), 8);
        assert_eq!(visited[0], vec![0, 0, 0]);
        assert_eq!(visited[1], vec![0, 1, 0]);
        assert_eq!(visited[4], vec![1, 0, 0]);
    }

    #[test]
    fn test_advance_by_whole_region_ends() {
        let shape = Shape::unaligned(vec![2, 3], Layout::X);
        let mut c = IndexCursor::new(&shape);
        c.advance_by(&[2, 3]);
        assert!(c.is_end());
    }

    #[test]
    fn test_zero_extent_is_empty() {
        let shape = Shape::unaligned(vec![3, 0, 2], Layout::X);
        let c = IndexCursor::new(&shape);
        assert!(c.is_end());
        assert_eq!(c.count(), 0);
    }

    #[test]
    fn test_rank_zero_has_one_position() {
        let shape = Shape::unaligned(Vec::new(), Layout::X);
        let offsets: Vec<usize> = shape.start().collect();
        assert_eq!(offsets, vec![0]);
    }

    #[test]
    fn test_advance_after_end_is_noop() {
        let shape = Shape::unaligned(vec![1], Layout::X);
        let mut c = shape.start();
        c.advance();
        assert!(c.is_end());
        c.advance();
        assert!(c.is_end());
        assert_eq!(c.position(), &[0]);
    }
}
