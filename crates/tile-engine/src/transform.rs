// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Whole-tensor rearrangements used when preparing operator weights.

use crate::copy::copy_region;
use crate::{TileError, Workspace};
use tensor_core::Tensor;

/// Concatenates `inputs` along `dim` into a new pooled tensor.
///
/// Every input must share rank, dtype and every dimension except `dim`.
/// The result keeps the first input's layout and alignment.
pub fn concat_tensors(
    inputs: &[&Tensor],
    dim: usize,
    name: impl Into<String>,
    workspace: &Workspace,
) -> Result<Tensor, TileError> {
    let first = inputs.first().ok_or(TileError::EmptyConcat)?;
    let base = first.shape();
    if dim >= base.rank() {
        return Err(TileError::RankMismatch {
            what: "concatenation dimension",
            expected: base.rank(),
            actual: dim + 1,
        });
    }

    let mut total = 0;
    for input in inputs {
        if input.dtype() != first.dtype() {
            return Err(TileError::DTypeMismatch {
                expected: first.dtype(),
                actual: input.dtype(),
            });
        }
        let shape = input.shape();
        let compatible = shape.rank() == base.rank()
            && (0..base.rank()).all(|d| d == dim || shape[d] == base[d]);
        if !compatible {
            return Err(TileError::ConcatMismatch {
                name: input.name().to_string(),
                dim,
                expected: base.to_string(),
                actual: shape.to_string(),
            });
        }
        total += shape[dim];
    }

    let mut dims = base.dims().to_vec();
    dims[dim] = total;
    let mut out = workspace.allocate(name, base.with_dims(dims), first.dtype())?;

    let zero = vec![0; base.rank()];
    let mut origin = zero.clone();
    for input in inputs {
        copy_region(&mut out, input, &origin, &zero, input.shape().dims());
        origin[dim] += input.shape()[dim];
    }
    Ok(out)
}

/// Swaps the two axes of a rank-2 tensor into a new pooled tensor.
pub fn transpose_2d(
    tensor: &Tensor,
    name: impl Into<String>,
    workspace: &Workspace,
) -> Result<Tensor, TileError> {
    let shape = tensor.shape();
    if shape.rank() != 2 {
        return Err(TileError::RankMismatch {
            what: "transpose input",
            expected: 2,
            actual: shape.rank(),
        });
    }
    let (rows, cols) = (shape[0], shape[1]);
    let mut out = workspace.allocate(name, shape.with_dims(vec![cols, rows]), tensor.dtype())?;

    let elem = tensor.dtype().size_bytes();
    let src_row = shape.storage_dim(1);
    let dest_row = out.shape().storage_dim(1);
    let src = tensor.as_bytes();
    let dest = out.as_bytes_mut();
    for r in 0..rows {
        for c in 0..cols {
            let s = (r * src_row + c) * elem;
            let d = (c * dest_row + r) * elem;
            dest[d..d + elem].copy_from_slice(&src[s..s + elem]);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_manager::MemoryBudget;
    use tensor_core::{DType, Shape};

    fn ws() -> Workspace {
        Workspace::new(MemoryBudget::from_kb(64))
    }

    #[test]
    fn test_concat_rows() {
        let ws = ws();
        let a = Tensor::from_f32("a", Shape::nc(1, 3, 8), &[1.0, 2.0, 3.0]).unwrap();
        let b = Tensor::from_f32("b", Shape::nc(2, 3, 8), &[4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();
        let out = concat_tensors(&[&a, &b], 0, "ab", &ws).unwrap();
        assert_eq!(out.name(), "ab");
        assert_eq!(out.shape(), &Shape::nc(3, 3, 8));
        assert_eq!(
            out.to_f32_vec().unwrap(),
            (1..=9).map(|v| v as f32).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_concat_columns() {
        let ws = ws();
        let a = Tensor::from_f32("a", Shape::nc(2, 1, 0), &[1.0, 2.0]).unwrap();
        let b = Tensor::from_f32("b", Shape::nc(2, 2, 0), &[3.0, 4.0, 5.0, 6.0]).unwrap();
        let out = concat_tensors(&[&a, &b], 1, "ab", &ws).unwrap();
        assert_eq!(out.to_f32_vec().unwrap(), vec![1.0, 3.0, 4.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_concat_mismatch() {
        let ws = ws();
        let a = Tensor::zeros("a", Shape::nc(1, 3, 8), DType::F32);
        let b = Tensor::zeros("b", Shape::nc(1, 4, 8), DType::F32);
        assert!(matches!(
            concat_tensors(&[&a, &b], 0, "ab", &ws),
            Err(TileError::ConcatMismatch { ref name, .. }) if name == "b"
        ));
        assert!(matches!(
            concat_tensors(&[], 0, "none", &ws),
            Err(TileError::EmptyConcat)
        ));
    }

    #[test]
    fn test_transpose() {
        let ws = ws();
        let t = Tensor::from_f32("w", Shape::nc(2, 3, 8), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let out = transpose_2d(&t, "wt", &ws).unwrap();
        assert_eq!(out.shape(), &Shape::nc(3, 2, 8));
        assert_eq!(out.to_f32_vec().unwrap(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_transpose_rejects_rank() {
        let ws = ws();
        let t = Tensor::zeros("w", Shape::nhwc(1, 1, 2, 2, 0), DType::F32);
        assert!(matches!(
            transpose_2d(&t, "wt", &ws),
            Err(TileError::RankMismatch { expected: 2, actual: 4, .. })
        ));
    }
}
