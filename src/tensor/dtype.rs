//! ONNX data type mappings

use crate::error::{RenameError, RenameResult};
use crate::proto::tensor_proto::DataType;

/// Size in bytes for each fixed-width ONNX data type
pub fn dtype_size(dtype: DataType) -> RenameResult<usize> {
    match dtype {
        DataType::Float => Ok(4),
        DataType::Uint8 => Ok(1),
        DataType::Int8 => Ok(1),
        DataType::Uint16 => Ok(2),
        DataType::Int16 => Ok(2),
        DataType::Int32 => Ok(4),
        DataType::Int64 => Ok(8),
        DataType::Bool => Ok(1),
        DataType::Float16 => Ok(2),
        DataType::Double => Ok(8),
        DataType::Uint32 => Ok(4),
        DataType::Uint64 => Ok(8),
        DataType::Bfloat16 => Ok(2),
        _ => Err(RenameError::InvalidDataType(dtype as i32)),
    }
}

/// Convert i32 to DataType enum
pub fn i32_to_dtype(value: i32) -> RenameResult<DataType> {
    DataType::try_from(value).map_err(|_| RenameError::InvalidDataType(value))
}

/// Lower-case ONNX name of an element type, for messages
pub fn dtype_name(value: i32) -> String {
    let name = match DataType::try_from(value) {
        Ok(DataType::Undefined) => "undefined",
        Ok(DataType::Float) => "float",
        Ok(DataType::Uint8) => "uint8",
        Ok(DataType::Int8) => "int8",
        Ok(DataType::Uint16) => "uint16",
        Ok(DataType::Int16) => "int16",
        Ok(DataType::Int32) => "int32",
        Ok(DataType::Int64) => "int64",
        Ok(DataType::String) => "string",
        Ok(DataType::Bool) => "bool",
        Ok(DataType::Float16) => "float16",
        Ok(DataType::Double) => "double",
        Ok(DataType::Uint32) => "uint32",
        Ok(DataType::Uint64) => "uint64",
        Ok(DataType::Complex64) => "complex64",
        Ok(DataType::Complex128) => "complex128",
        Ok(DataType::Bfloat16) => "bfloat16",
        Ok(_) => "float8/4bit",
        Err(_) => return format!("dtype({})", value),
    };
    name.to_string()
}
