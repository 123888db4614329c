// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named, byte-backed tensors.

use crate::{DType, IndexCursor, Shape, TensorError};
use memory_manager::{BufferGuard, MemoryPool};

/// Backing bytes of a [`Tensor`].
pub enum Storage {
    /// Plain heap buffer.
    Owned(Vec<u8>),
    /// Buffer leased from a [`MemoryPool`]; returned when dropped.
    Pooled(BufferGuard),
}

impl Storage {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Owned(v) => v,
            Storage::Pooled(g) => g.as_slice(),
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Owned(v) => v,
            Storage::Pooled(g) => g.as_mut_slice(),
        }
    }
}

/// An n-dimensional tensor stored in padded row-major order.
///
/// The buffer always holds `shape.storage_size()` elements of `dtype`.
/// Padding elements at the end of each innermost row are part of the
/// buffer but not of the logical tensor.
///
/// Tensors are move-only. A tile is a tensor of its own, with storage
/// independent of the tensor it was cut from.
pub struct Tensor {
    name: String,
    shape: Shape,
    dtype: DType,
    data: Storage,
}

impl Tensor {
    /// Creates a zero-filled tensor on the heap.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{DType, Shape, Tensor};
    /// let t = Tensor::zeros("act", Shape::nc(2, 5, 8), DType::F16);
    /// assert_eq!(t.size_bytes(), 2 * 8 * 2);
    /// ```
    pub fn zeros(name: impl Into<String>, shape: Shape, dtype: DType) -> Self {
        let size = shape.size_bytes(dtype);
        Self {
            name: name.into(),
            shape,
            dtype,
            data: Storage::Owned(vec![0u8; size]),
        }
    }

    /// Creates a zero-filled tensor whose storage is leased from `pool`.
    pub fn from_pool(
        name: impl Into<String>,
        shape: Shape,
        dtype: DType,
        pool: &MemoryPool,
    ) -> Result<Self, TensorError> {
        let name = name.into();
        let size = shape.size_bytes(dtype);
        let data = if size == 0 {
            Storage::Owned(Vec::new())
        } else {
            match pool.allocate(size) {
                Ok(guard) => Storage::Pooled(guard),
                Err(source) => return Err(TensorError::Allocation { name, source }),
            }
        };
        Ok(Self {
            name,
            shape,
            dtype,
            data,
        })
    }

    /// Wraps raw storage bytes, padding included.
    pub fn from_bytes(
        name: impl Into<String>,
        shape: Shape,
        dtype: DType,
        data: Vec<u8>,
    ) -> Result<Self, TensorError> {
        let expected = shape.size_bytes(dtype);
        if data.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            name: name.into(),
            shape,
            dtype,
            data: Storage::Owned(data),
        })
    }

    /// Creates an `f32` tensor from its logical elements in row-major order.
    ///
    /// Padding elements are left zero.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::{Layout, Shape, Tensor};
    /// let s = Shape::new(vec![2, 3], Layout::X, 4);
    /// let t = Tensor::from_f32("w", s, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    /// assert_eq!(t.size_bytes(), 2 * 4 * 4);
    /// assert_eq!(t.to_f32_vec().unwrap(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    /// ```
    pub fn from_f32(
        name: impl Into<String>,
        shape: Shape,
        values: &[f32],
    ) -> Result<Self, TensorError> {
        let elem = DType::F32.size_bytes();
        let expected = shape.num_elements();
        if values.len() != expected {
            return Err(TensorError::BufferSizeMismatch {
                expected: expected * elem,
                actual: values.len() * elem,
            });
        }
        let mut t = Self::zeros(name, shape, DType::F32);
        let cursor = t.start_index();
        let bytes = t.data.as_mut_slice();
        for (offset, v) in cursor.zip(values) {
            bytes[offset * elem..(offset + 1) * elem].copy_from_slice(&v.to_ne_bytes());
        }
        Ok(t)
    }

    /// Logical elements as `f32`, padding skipped.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>, TensorError> {
        self.require_f32("to_f32_vec")?;
        let bytes = self.as_bytes();
        Ok(self
            .start_index()
            .map(|offset| read_f32(bytes, offset))
            .collect())
    }

    /// Reads the element at a logical position.
    pub fn get_f32(&self, position: &[usize]) -> Result<f32, TensorError> {
        self.require_f32("get_f32")?;
        let offset = self.checked_offset(position)?;
        Ok(read_f32(self.as_bytes(), offset))
    }

    /// Writes the element at a logical position.
    pub fn set_f32(&mut self, position: &[usize], value: f32) -> Result<(), TensorError> {
        self.require_f32("set_f32")?;
        let offset = self.checked_offset(position)?;
        let elem = DType::F32.size_bytes();
        self.data.as_mut_slice()[offset * elem..(offset + 1) * elem]
            .copy_from_slice(&value.to_ne_bytes());
        Ok(())
    }

    fn require_f32(&self, op: &'static str) -> Result<(), TensorError> {
        if self.dtype != DType::F32 {
            return Err(TensorError::UnsupportedDType {
                op,
                dtype: self.dtype,
            });
        }
        Ok(())
    }

    fn checked_offset(&self, position: &[usize]) -> Result<usize, TensorError> {
        let in_bounds = position.len() == self.shape.rank()
            && position.iter().zip(self.shape.dims()).all(|(p, d)| p < d);
        if !in_bounds {
            return Err(TensorError::IndexOutOfBounds {
                position: position.to_vec(),
                shape: self.shape.clone(),
            });
        }
        Ok(self.shape.storage_offset(position))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Raw storage bytes, padding included.
    pub fn as_bytes(&self) -> &[u8] {
        self.data.as_slice()
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        self.data.as_mut_slice()
    }

    /// Storage footprint in bytes.
    pub fn size_bytes(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the storage is leased from a pool.
    pub fn is_pooled(&self) -> bool {
        matches!(self.data, Storage::Pooled(_))
    }

    /// Cursor over every logical position of this tensor.
    pub fn start_index(&self) -> IndexCursor {
        self.shape.start()
    }

    /// Zeroes the whole buffer, padding included.
    pub fn fill_zero(&mut self) {
        self.data.as_mut_slice().fill(0);
    }
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[offset * 4..offset * 4 + 4]);
    f32::from_ne_bytes(raw)
}

impl std::fmt::Debug for Tensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tensor")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("dtype", &self.dtype)
            .field("size_bytes", &self.size_bytes())
            .field("pooled", &self.is_pooled())
            .finish()
    }
}
