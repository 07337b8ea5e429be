//! Shape utilities for ONNX tensors
//!
//! Static shape/type metadata as seen by shape inference: every dimension is a
//! known value, a symbolic parameter, or unknown.

use crate::proto::tensor_shape_proto::{dimension, Dimension};
use crate::proto::{type_proto, TensorShapeProto, TypeProto, ValueInfoProto};

/// One dimension of a tensor shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dim {
    /// Statically known extent
    Value(i64),
    /// Named symbolic extent such as `batch`
    Param(String),
    /// Nothing is known
    Unknown,
}

impl Dim {
    /// Read a dimension from its protobuf form
    pub fn from_proto(dim: &Dimension) -> Self {
        match &dim.value {
            Some(dimension::Value::DimValue(v)) => Dim::Value(*v),
            Some(dimension::Value::DimParam(p)) if !p.is_empty() => Dim::Param(p.clone()),
            _ => Dim::Unknown,
        }
    }

    /// Convert back to the protobuf form
    pub fn to_proto(&self) -> Dimension {
        let value = match self {
            Dim::Value(v) => Some(dimension::Value::DimValue(*v)),
            Dim::Param(p) => Some(dimension::Value::DimParam(p.clone())),
            Dim::Unknown => None,
        };
        Dimension {
            value,
            denotation: String::new(),
        }
    }

    /// Known extent, if any
    pub fn value(&self) -> Option<i64> {
        match self {
            Dim::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for Dim {
    fn from(v: i64) -> Self {
        Dim::Value(v)
    }
}

/// Element type plus optional shape of a tensor
///
/// `shape == None` means the rank itself is unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorType {
    /// ONNX `TensorProto.DataType` value, 0 when unknown
    pub elem_type: i32,
    /// Dimensions, `None` when unranked
    pub shape: Option<Vec<Dim>>,
}

impl TensorType {
    /// Create a ranked tensor type
    pub fn new(elem_type: i32, shape: Vec<Dim>) -> Self {
        Self {
            elem_type,
            shape: Some(shape),
        }
    }

    /// Create a tensor type of unknown rank
    pub fn unranked(elem_type: i32) -> Self {
        Self {
            elem_type,
            shape: None,
        }
    }

    /// Create a ranked type from static extents
    pub fn from_dims(elem_type: i32, dims: &[i64]) -> Self {
        Self::new(elem_type, dims.iter().map(|&d| Dim::Value(d)).collect())
    }

    /// Read the tensor type out of a TypeProto (non-tensor types yield `None`)
    pub fn from_type_proto(tp: &TypeProto) -> Option<Self> {
        match tp.value.as_ref()? {
            type_proto::Value::TensorType(t) => Some(Self {
                elem_type: t.elem_type,
                shape: t
                    .shape
                    .as_ref()
                    .map(|s| s.dim.iter().map(Dim::from_proto).collect()),
            }),
            _ => None,
        }
    }

    /// Read the tensor type declared on a ValueInfoProto
    pub fn from_value_info(vi: &ValueInfoProto) -> Option<Self> {
        vi.r#type.as_ref().and_then(Self::from_type_proto)
    }

    /// Convert to a TypeProto
    pub fn to_type_proto(&self) -> TypeProto {
        TypeProto {
            value: Some(type_proto::Value::TensorType(type_proto::Tensor {
                elem_type: self.elem_type,
                shape: self.shape.as_ref().map(|dims| TensorShapeProto {
                    dim: dims.iter().map(Dim::to_proto).collect(),
                }),
            })),
            denotation: String::new(),
        }
    }

    /// Rank, if known
    pub fn rank(&self) -> Option<usize> {
        self.shape.as_ref().map(Vec::len)
    }

    /// All extents, if every one of them is statically known
    pub fn static_dims(&self) -> Option<Vec<i64>> {
        self.shape.as_ref()?.iter().map(Dim::value).collect()
    }
}

/// Broadcast two shapes using numpy semantics
///
/// Returns `None` when two known extents are incompatible.
pub fn broadcast_dims(a: &[Dim], b: &[Dim]) -> Option<Vec<Dim>> {
    let rank = a.len().max(b.len());
    let one = Dim::Value(1);
    let mut out = Vec::with_capacity(rank);

    for i in 0..rank {
        let da = if i < rank - a.len() {
            &one
        } else {
            &a[i - (rank - a.len())]
        };
        let db = if i < rank - b.len() {
            &one
        } else {
            &b[i - (rank - b.len())]
        };

        let dim = match (da, db) {
            (Dim::Value(x), Dim::Value(y)) if x == y => Dim::Value(*x),
            (Dim::Value(1), other) | (other, Dim::Value(1)) => other.clone(),
            (Dim::Value(_), Dim::Value(_)) => return None,
            (Dim::Value(x), _) | (_, Dim::Value(x)) => Dim::Value(*x),
            (Dim::Param(p), Dim::Param(q)) if p == q => Dim::Param(p.clone()),
            _ => Dim::Unknown,
        };
        out.push(dim);
    }

    Some(out)
}

/// Calculate total number of elements, if statically known
pub fn numel(dims: &[Dim]) -> Option<i64> {
    dims.iter().map(Dim::value).product()
}

/// Normalize axis to positive index
pub fn normalize_axis(axis: i64, rank: usize) -> Option<usize> {
    let rank_i64 = rank as i64;
    let normalized = if axis < 0 { axis + rank_i64 } else { axis };

    if normalized < 0 || normalized >= rank_i64 {
        return None;
    }

    Some(normalized as usize)
}
