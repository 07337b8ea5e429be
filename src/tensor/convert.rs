//! Tensor conversion utilities
//!
//! Decode integer constant tensors (reshape targets, axes) into ndarray.

use ndarray::{Array, ArrayD, IxDyn};

use crate::error::{RenameError, RenameResult};
use crate::proto::tensor_proto::DataType;
use crate::proto::TensorProto;

use super::dtype::{dtype_size, i32_to_dtype};

/// Convert TensorProto to i64 ndarray
///
/// Handles both `raw_data` (little-endian) and the typed data fields.
pub fn tensor_to_array_i64(tensor: &TensorProto) -> RenameResult<ArrayD<i64>> {
    if tensor.data_location == crate::proto::tensor_proto::DataLocation::External as i32 {
        return Err(RenameError::InvalidTensor(format!(
            "tensor '{}' stores its data externally",
            tensor.name
        )));
    }

    let dtype = i32_to_dtype(tensor.data_type)?;
    if tensor.dims.iter().any(|&d| d < 0) {
        return Err(RenameError::InvalidTensor(format!(
            "tensor '{}' has negative dims {:?}",
            tensor.name, tensor.dims
        )));
    }
    let shape: Vec<usize> = tensor.dims.iter().map(|&d| d as usize).collect();
    let expected_len: usize = shape.iter().product();

    let data: Vec<i64> = if !tensor.raw_data.is_empty() {
        decode_raw_to_i64(&tensor.raw_data, dtype, expected_len)?
    } else {
        match dtype {
            DataType::Int64 => tensor.int64_data.clone(),
            DataType::Int32 | DataType::Int16 | DataType::Int8 | DataType::Uint8 => {
                tensor.int32_data.iter().map(|&v| v as i64).collect()
            }
            DataType::Uint64 => tensor.uint64_data.iter().map(|&v| v as i64).collect(),
            _ => {
                return Err(RenameError::InvalidDataType(tensor.data_type));
            }
        }
    };

    if data.len() != expected_len {
        return Err(RenameError::InvalidTensor(format!(
            "tensor '{}' holds {} values, dims {:?} need {}",
            tensor.name,
            data.len(),
            tensor.dims,
            expected_len
        )));
    }

    let ix = IxDyn(&shape);
    Array::from_shape_vec(ix, data).map_err(|e| RenameError::Internal(e.to_string()))
}

/// Flatten an integer tensor into a plain vector
pub fn tensor_to_vec_i64(tensor: &TensorProto) -> RenameResult<Vec<i64>> {
    let array = tensor_to_array_i64(tensor)?;
    Ok(array.iter().copied().collect())
}

// ============================================================================
// Internal helpers
// ============================================================================

fn decode_raw_to_i64(raw: &[u8], dtype: DataType, expected: usize) -> RenameResult<Vec<i64>> {
    let elem_size = dtype_size(dtype)?;
    if raw.len() != expected * elem_size {
        return Err(RenameError::InvalidTensor(format!(
            "raw data size {} does not match expected {} * {}",
            raw.len(),
            expected,
            elem_size
        )));
    }

    match dtype {
        DataType::Int64 => Ok(raw
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect()),
        DataType::Int32 => Ok(raw
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
            .collect()),
        DataType::Uint64 => Ok(raw
            .chunks_exact(8)
            .map(|b| u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as i64)
            .collect()),
        DataType::Uint8 => Ok(raw.iter().map(|&b| b as i64).collect()),
        DataType::Int8 => Ok(raw.iter().map(|&b| b as i8 as i64).collect()),
        _ => Err(RenameError::InvalidDataType(dtype as i32)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int64_data() {
        let tensor = TensorProto {
            dims: vec![2, 2],
            data_type: DataType::Int64 as i32,
            int64_data: vec![1, 2, 3, 4],
            ..Default::default()
        };

        let array = tensor_to_array_i64(&tensor).unwrap();
        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array[[1, 0]], 3);
    }

    #[test]
    fn test_raw_data() {
        let raw: Vec<u8> = [1i64, -1].iter().flat_map(|v| v.to_le_bytes()).collect();
        let tensor = TensorProto {
            dims: vec![2],
            data_type: DataType::Int64 as i32,
            raw_data: raw,
            ..Default::default()
        };

        assert_eq!(tensor_to_vec_i64(&tensor).unwrap(), vec![1, -1]);
    }

    #[test]
    fn test_scalar() {
        let tensor = TensorProto {
            data_type: DataType::Int32 as i32,
            int32_data: vec![5],
            ..Default::default()
        };
        assert_eq!(tensor_to_vec_i64(&tensor).unwrap(), vec![5]);
    }

    #[test]
    fn test_length_mismatch() {
        let tensor = TensorProto {
            dims: vec![3],
            data_type: DataType::Int64 as i32,
            int64_data: vec![1, 2],
            ..Default::default()
        };
        assert!(matches!(
            tensor_to_array_i64(&tensor),
            Err(RenameError::InvalidTensor(_))
        ));
    }

    #[test]
    fn test_float_rejected() {
        let tensor = TensorProto {
            dims: vec![1],
            data_type: DataType::Float as i32,
            float_data: vec![1.0],
            ..Default::default()
        };
        assert!(matches!(
            tensor_to_array_i64(&tensor),
            Err(RenameError::InvalidDataType(1))
        ));
    }
}
