// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named tensor registry backed by a budgeted pool.

use crate::TileError;
use memory_manager::{MemoryBudget, MemoryPool};
use std::collections::BTreeMap;
use tensor_core::{DType, Shape, Tensor};

/// Owns an operator's tensors and leases storage for new ones.
///
/// Allocation only needs `&self`, so tiles can be cut from a tensor that
/// is itself borrowed out of the registry.
#[derive(Debug)]
pub struct Workspace {
    pool: MemoryPool,
    tensors: BTreeMap<String, Tensor>,
}

impl Workspace {
    /// Creates an empty workspace with a fresh pool of `budget` bytes.
    pub fn new(budget: MemoryBudget) -> Self {
        Self::with_pool(MemoryPool::new(budget))
    }

    /// Creates an empty workspace drawing from an existing pool.
    pub fn with_pool(pool: MemoryPool) -> Self {
        Self {
            pool,
            tensors: BTreeMap::new(),
        }
    }

    pub fn pool(&self) -> &MemoryPool {
        &self.pool
    }

    /// Leases a zeroed tensor from the pool without registering it.
    pub fn allocate(
        &self,
        name: impl Into<String>,
        shape: Shape,
        dtype: DType,
    ) -> Result<Tensor, TileError> {
        Ok(Tensor::from_pool(name, shape, dtype, &self.pool)?)
    }

    /// Registers a tensor under its own name.
    pub fn add_tensor(&mut self, tensor: Tensor) -> Result<(), TileError> {
        if self.tensors.contains_key(tensor.name()) {
            return Err(TileError::DuplicateTensor(tensor.name().to_string()));
        }
        tracing::trace!(name = tensor.name(), shape = %tensor.shape(), "tensor registered");
        self.tensors.insert(tensor.name().to_string(), tensor);
        Ok(())
    }

    /// Leases a zeroed tensor and registers it.
    pub fn create_tensor(
        &mut self,
        name: impl Into<String>,
        shape: Shape,
        dtype: DType,
    ) -> Result<&mut Tensor, TileError> {
        let name = name.into();
        let tensor = self.allocate(name.clone(), shape, dtype)?;
        self.add_tensor(tensor)?;
        self.tensor_mut(&name)
    }

    pub fn tensor(&self, name: &str) -> Result<&Tensor, TileError> {
        self.tensors
            .get(name)
            .ok_or_else(|| TileError::TensorNotFound(name.to_string()))
    }

    pub fn tensor_mut(&mut self, name: &str) -> Result<&mut Tensor, TileError> {
        self.tensors
            .get_mut(name)
            .ok_or_else(|| TileError::TensorNotFound(name.to_string()))
    }

    /// Removes a tensor, failing if it is not registered.
    pub fn take_tensor(&mut self, name: &str) -> Result<Tensor, TileError> {
        self.tensors
            .remove(name)
            .ok_or_else(|| TileError::TensorNotFound(name.to_string()))
    }

    /// Removes a tensor if present.
    pub fn remove(&mut self, name: &str) -> Option<Tensor> {
        self.tensors.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tensor_core::Layout;

    fn ws() -> Workspace {
        Workspace::new(MemoryBudget::from_kb(64))
    }

    #[test]
    fn test_add_and_lookup() {
        let mut ws = ws();
        ws.add_tensor(Tensor::zeros("a", Shape::nc(1, 8, 8), DType::F16))
            .unwrap();
        assert!(ws.contains("a"));
        assert_eq!(ws.tensor("a").unwrap().shape(), &Shape::nc(1, 8, 8));
        assert!(matches!(ws.tensor("b"), Err(TileError::TensorNotFound(_))));
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut ws = ws();
        ws.create_tensor("a", Shape::nc(1, 8, 8), DType::F16).unwrap();
        let err = ws
            .add_tensor(Tensor::zeros("a", Shape::nc(1, 8, 8), DType::F16))
            .unwrap_err();
        assert!(matches!(err, TileError::DuplicateTensor(ref n) if n == "a"));
    }

    #[test]
    fn test_created_tensors_count_against_budget() {
        let mut ws = Workspace::new(MemoryBudget::from_bytes(256));
        ws.create_tensor("a", Shape::unaligned(vec![32], Layout::X), DType::F32)
            .unwrap();
        assert_eq!(ws.pool().allocated_bytes(), 128);
        assert!(ws
            .create_tensor("b", Shape::unaligned(vec![64], Layout::X), DType::F32)
            .is_err());
        drop(ws.take_tensor("a").unwrap());
        assert_eq!(ws.pool().allocated_bytes(), 0);
    }

    #[test]
    fn test_names_sorted() {
        let mut ws = ws();
        for n in ["c", "a", "b"] {
            ws.create_tensor(n, Shape::nc(1, 1, 0), DType::I8).unwrap();
        }
        assert_eq!(ws.names().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(ws.len(), 3);
        assert!(ws.remove("b").is_some());
        assert!(ws.remove("b").is_none());
    }
}
