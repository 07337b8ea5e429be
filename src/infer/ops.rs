//! Per-operator shape rules for the default ONNX domain

use rustc_hash::FxHashMap;

use crate::proto::tensor_proto::DataType;
use crate::proto::{NodeProto, TensorProto};
use crate::tensor::{broadcast_dims, normalize_axis, numel, tensor_to_vec_i64, Dim, TensorType};

use super::ShapeInferenceError;

/// Constant tensors visible to inference, keyed by tensor name
pub type ConstantTable = FxHashMap<String, TensorProto>;

type Inferred = Vec<Option<TensorType>>;
type InferResult<T> = Result<T, ShapeInferenceError>;

const BOOL: i32 = DataType::Bool as i32;
const INT64: i32 = DataType::Int64 as i32;
const FLOAT: i32 = DataType::Float as i32;
const STRING: i32 = DataType::String as i32;

/// Operators whose first output has the type and shape of the first input
const SAME_AS_INPUT: &[&str] = &[
    "Identity",
    "Not",
    "Relu",
    "LeakyRelu",
    "PRelu",
    "Elu",
    "Selu",
    "Celu",
    "ThresholdedRelu",
    "Sigmoid",
    "HardSigmoid",
    "HardSwish",
    "Tanh",
    "Softplus",
    "Softsign",
    "Gelu",
    "Mish",
    "Exp",
    "Log",
    "Sqrt",
    "Abs",
    "Neg",
    "Reciprocal",
    "Floor",
    "Ceil",
    "Round",
    "Sign",
    "Sin",
    "Cos",
    "Tan",
    "Asin",
    "Acos",
    "Atan",
    "Sinh",
    "Cosh",
    "Asinh",
    "Acosh",
    "Atanh",
    "Erf",
    "Softmax",
    "LogSoftmax",
    "Hardmax",
    "Clip",
    "CumSum",
    "Trilu",
    "LRN",
    "BatchNormalization",
    "InstanceNormalization",
    "LayerNormalization",
    "GroupNormalization",
    "MeanVarianceNormalization",
    "LpNormalization",
];

const BROADCAST_ARITH: &[&str] = &["Add", "Sub", "Mul", "Div", "Pow", "Mod", "BitShift"];

const BROADCAST_BOOL: &[&str] = &[
    "Equal",
    "Less",
    "Greater",
    "LessOrEqual",
    "GreaterOrEqual",
    "And",
    "Or",
    "Xor",
];

const VARIADIC: &[&str] = &["Sum", "Max", "Min", "Mean"];

const REDUCE: &[&str] = &[
    "ReduceSum",
    "ReduceMean",
    "ReduceMax",
    "ReduceMin",
    "ReduceProd",
    "ReduceL1",
    "ReduceL2",
    "ReduceLogSum",
    "ReduceLogSumExp",
    "ReduceSumSquare",
];

/// Infer the output types of one node
///
/// `inputs` holds the known type of each node input in order (`None` for an
/// omitted optional input or an untyped tensor). The result has one entry per
/// node output; `None` means nothing could be inferred.
pub fn infer_node(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Inferred> {
    let n_out = node.output.len();
    if !node.is_default_domain() {
        return Ok(vec![None; n_out]);
    }

    let op = node.op_type.as_str();
    let first = input(inputs, 0);

    let mut out: Inferred = match op {
        _ if SAME_AS_INPUT.contains(&op) => vec![first.cloned()],
        "IsNaN" | "IsInf" => vec![first.map(|t| with_elem(t, BOOL))],
        "Dropout" => vec![first.cloned(), first.map(|t| with_elem(t, BOOL))],
        "Cast" => {
            let to = node.get_attribute_int("to", 0) as i32;
            vec![first.map(|t| with_elem(t, to))]
        }
        "CastLike" => {
            let elem = input(inputs, 1).map(|t| t.elem_type);
            vec![first.zip(elem).map(|(t, e)| with_elem(t, e))]
        }
        _ if BROADCAST_ARITH.contains(&op) => {
            vec![infer_broadcast(node, &inputs[..inputs.len().min(2)], None)?]
        }
        _ if BROADCAST_BOOL.contains(&op) => {
            vec![infer_broadcast(node, &inputs[..inputs.len().min(2)], Some(BOOL))?]
        }
        _ if VARIADIC.contains(&op) => vec![infer_broadcast(node, inputs, None)?],
        "Where" => {
            let elem = input(inputs, 1).map(|t| t.elem_type);
            let ty = infer_broadcast(node, inputs, elem)?;
            vec![ty]
        }
        "MatMul" => vec![infer_matmul(node, first, input(inputs, 1))?],
        "Gemm" => vec![infer_gemm(node, first, input(inputs, 1))?],
        "Conv" => vec![infer_conv(node, first, input(inputs, 1))?],
        "MaxPool" => {
            let ty = infer_pool(node, first)?;
            let indices = ty.as_ref().map(|t| with_elem(t, INT64));
            vec![ty, indices]
        }
        "AveragePool" | "LpPool" => vec![infer_pool(node, first)?],
        "GlobalAveragePool" | "GlobalMaxPool" | "GlobalLpPool" => {
            vec![infer_global_pool(node, first)?]
        }
        "Flatten" => vec![infer_flatten(node, first)?],
        "Reshape" => vec![infer_reshape(node, inputs, constants)?],
        "Transpose" => vec![infer_transpose(node, first)?],
        "Concat" => vec![infer_concat(node, inputs)?],
        "Squeeze" => vec![infer_squeeze(node, inputs, constants)?],
        "Unsqueeze" => vec![infer_unsqueeze(node, inputs, constants)?],
        "Expand" => vec![infer_expand(node, inputs, constants)?],
        "Slice" => vec![infer_slice(node, inputs, constants)?],
        "Gather" => vec![infer_gather(node, first, input(inputs, 1))?],
        "Shape" => vec![infer_shape_op(node, first)],
        "Size" => vec![Some(TensorType::new(INT64, Vec::new()))],
        "Constant" => vec![infer_constant(node)],
        "ConstantOfShape" => vec![infer_constant_of_shape(node, inputs, constants)?],
        _ if REDUCE.contains(&op) => vec![infer_reduce(node, inputs, constants)?],
        "ArgMax" | "ArgMin" => vec![infer_arg_reduce(node, first)?],
        _ => {
            tracing::trace!(op_type = op, "no shape rule");
            Vec::new()
        }
    };

    out.resize(n_out, None);
    Ok(out)
}

/// The value a `Constant` node produces, as a tensor
pub fn constant_value(node: &NodeProto) -> Option<TensorProto> {
    if !node.is_op_type("Constant") || !node.is_default_domain() {
        return None;
    }
    if let Some(t) = node.get_attribute_tensor("value") {
        return Some(t.clone());
    }
    let attr = node.get_attribute("value_ints").or_else(|| node.get_attribute("value_int"))?;
    let (dims, values) = if attr.name == "value_ints" {
        (vec![attr.ints.len() as i64], attr.ints.clone())
    } else {
        (Vec::new(), vec![attr.i])
    };
    Some(TensorProto {
        dims,
        data_type: INT64,
        int64_data: values,
        ..Default::default()
    })
}

fn input<'a>(inputs: &[Option<&'a TensorType>], index: usize) -> Option<&'a TensorType> {
    inputs.get(index).copied().flatten()
}

fn with_elem(ty: &TensorType, elem_type: i32) -> TensorType {
    TensorType {
        elem_type,
        shape: ty.shape.clone(),
    }
}

fn incompatible(node: &NodeProto, reason: impl Into<String>) -> ShapeInferenceError {
    let label = if node.name.is_empty() {
        node.op_type.clone()
    } else {
        node.name.clone()
    };
    ShapeInferenceError::IncompatibleInputs {
        node: label,
        op_type: node.op_type.clone(),
        reason: reason.into(),
    }
}

fn axis_of(node: &NodeProto, axis: i64, rank: usize) -> InferResult<usize> {
    normalize_axis(axis, rank)
        .ok_or_else(|| incompatible(node, format!("axis {} out of range for rank {}", axis, rank)))
}

/// Integer values of a constant input, if that input is a known constant
fn const_ints(
    node: &NodeProto,
    index: usize,
    constants: &ConstantTable,
) -> InferResult<Option<Vec<i64>>> {
    let Some(name) = node.input.get(index).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };
    let Some(tensor) = constants.get(name) else {
        return Ok(None);
    };
    tensor_to_vec_i64(tensor)
        .map(Some)
        .map_err(|e| ShapeInferenceError::InvalidConstant {
            name: name.clone(),
            reason: e.to_string(),
        })
}

/// Axes given either as an input (newer opsets) or as an attribute
///
/// The outer `Option` is `None` when an axes input exists but is not constant.
fn axes_operand(
    node: &NodeProto,
    index: usize,
    constants: &ConstantTable,
) -> InferResult<Option<Option<Vec<i64>>>> {
    let has_input = node.input.get(index).is_some_and(|n| !n.is_empty());
    if has_input {
        return Ok(const_ints(node, index, constants)?.map(Some));
    }
    Ok(Some(node.get_attribute_ints("axes").map(<[i64]>::to_vec)))
}

fn infer_broadcast(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    elem_override: Option<i32>,
) -> InferResult<Option<TensorType>> {
    let types: Option<Vec<&TensorType>> = inputs.iter().copied().collect();
    let Some(types) = types.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let elem = elem_override.unwrap_or(types[0].elem_type);

    let mut shape: Vec<Dim> = Vec::new();
    for ty in &types {
        let Some(dims) = &ty.shape else {
            return Ok(Some(TensorType::unranked(elem)));
        };
        shape = broadcast_dims(&shape, dims).ok_or_else(|| {
            incompatible(
                node,
                format!(
                    "cannot broadcast {} with {}",
                    super::format_shape(Some(&shape)),
                    super::format_shape(Some(dims))
                ),
            )
        })?;
    }

    Ok(Some(TensorType::new(elem, shape)))
}

fn check_same(node: &NodeProto, what: &str, a: &Dim, b: &Dim) -> InferResult<()> {
    match (a.value(), b.value()) {
        (Some(x), Some(y)) if x != y => Err(incompatible(
            node,
            format!("{} mismatch: {} vs {}", what, x, y),
        )),
        _ => Ok(()),
    }
}

fn infer_matmul(
    node: &NodeProto,
    a: Option<&TensorType>,
    b: Option<&TensorType>,
) -> InferResult<Option<TensorType>> {
    let (Some(a), Some(b)) = (a, b) else {
        return Ok(None);
    };
    let (Some(sa), Some(sb)) = (&a.shape, &b.shape) else {
        return Ok(Some(TensorType::unranked(a.elem_type)));
    };
    if sa.is_empty() || sb.is_empty() {
        return Err(incompatible(node, "MatMul operands must have rank >= 1"));
    }

    let mut sa = sa.clone();
    let mut sb = sb.clone();
    let a_vector = sa.len() == 1;
    let b_vector = sb.len() == 1;
    if a_vector {
        sa.insert(0, Dim::Value(1));
    }
    if b_vector {
        sb.push(Dim::Value(1));
    }

    let (ra, rb) = (sa.len(), sb.len());
    check_same(node, "inner dimension", &sa[ra - 1], &sb[rb - 2])?;

    let mut out = broadcast_dims(&sa[..ra - 2], &sb[..rb - 2])
        .ok_or_else(|| incompatible(node, "batch dimensions do not broadcast"))?;
    if !a_vector {
        out.push(sa[ra - 2].clone());
    }
    if !b_vector {
        out.push(sb[rb - 1].clone());
    }

    Ok(Some(TensorType::new(a.elem_type, out)))
}

fn infer_gemm(
    node: &NodeProto,
    a: Option<&TensorType>,
    b: Option<&TensorType>,
) -> InferResult<Option<TensorType>> {
    let (Some(a), Some(b)) = (a, b) else {
        return Ok(None);
    };
    let (Some(sa), Some(sb)) = (&a.shape, &b.shape) else {
        return Ok(Some(TensorType::unranked(a.elem_type)));
    };
    if sa.len() != 2 || sb.len() != 2 {
        return Err(incompatible(node, "Gemm operands must be 2-D"));
    }

    let trans_a = node.get_attribute_int("transA", 0) != 0;
    let trans_b = node.get_attribute_int("transB", 0) != 0;
    let (m, k_a) = if trans_a { (&sa[1], &sa[0]) } else { (&sa[0], &sa[1]) };
    let (k_b, n) = if trans_b { (&sb[1], &sb[0]) } else { (&sb[0], &sb[1]) };
    check_same(node, "inner dimension", k_a, k_b)?;

    Ok(Some(TensorType::new(a.elem_type, vec![m.clone(), n.clone()])))
}

/// Output extents of a sliding-window operator over the spatial axes
fn window_dims(
    node: &NodeProto,
    spatial: &[Dim],
    kernel: Option<&[i64]>,
    ceil_mode: bool,
) -> InferResult<Vec<Dim>> {
    let n = spatial.len();
    let Some(kernel) = kernel else {
        return Ok(vec![Dim::Unknown; n]);
    };
    if kernel.len() != n {
        return Err(incompatible(
            node,
            format!("kernel rank {} does not match {} spatial axes", kernel.len(), n),
        ));
    }

    let ones = vec![1; n];
    let zeros = vec![0; 2 * n];
    let strides = node.get_attribute_ints("strides").unwrap_or(&ones);
    let dilations = node.get_attribute_ints("dilations").unwrap_or(&ones);
    let pads = node.get_attribute_ints("pads").unwrap_or(&zeros);
    if strides.len() != n || dilations.len() != n || pads.len() != 2 * n {
        return Err(incompatible(node, "strides, dilations or pads have the wrong length"));
    }
    let auto_pad = node
        .get_attribute_string("auto_pad")
        .map(String::from_utf8_lossy)
        .unwrap_or_default();

    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let Some(size) = spatial[i].value() else {
            out.push(Dim::Unknown);
            continue;
        };
        let stride = strides[i];
        if stride <= 0 {
            return Err(incompatible(node, format!("non-positive stride {}", stride)));
        }
        let effective = (kernel[i] - 1) * dilations[i] + 1;

        let extent = match &*auto_pad {
            "SAME_UPPER" | "SAME_LOWER" => (size + stride - 1) / stride,
            "VALID" => {
                if size < effective {
                    return Err(incompatible(node, "kernel larger than input"));
                }
                (size - effective) / stride + 1
            }
            _ => {
                let padded = size + pads[i] + pads[i + n] - effective;
                if padded < 0 {
                    return Err(incompatible(node, "kernel larger than padded input"));
                }
                if ceil_mode {
                    let mut extent = (padded + stride - 1) / stride + 1;
                    // The last window must start inside the input or left padding.
                    if (extent - 1) * stride >= size + pads[i] {
                        extent -= 1;
                    }
                    extent
                } else {
                    padded / stride + 1
                }
            }
        };
        out.push(Dim::Value(extent));
    }
    Ok(out)
}

fn infer_conv(
    node: &NodeProto,
    x: Option<&TensorType>,
    w: Option<&TensorType>,
) -> InferResult<Option<TensorType>> {
    let Some(x) = x else {
        return Ok(None);
    };
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::unranked(x.elem_type)));
    };
    if xs.len() < 3 {
        return Err(incompatible(node, format!("input rank {} below 3", xs.len())));
    }

    let ws = w.and_then(|w| w.shape.as_ref());
    if let Some(ws) = ws {
        if ws.len() != xs.len() {
            return Err(incompatible(node, "weight rank differs from input rank"));
        }
        let group = node.get_attribute_int("group", 1);
        if let (Some(c), Some(wc)) = (xs[1].value(), ws[1].value()) {
            if c != wc * group {
                return Err(incompatible(
                    node,
                    format!("input has {} channels, weight expects {}", c, wc * group),
                ));
            }
        }
    }

    let kernel: Option<Vec<i64>> = match node.get_attribute_ints("kernel_shape") {
        Some(k) => Some(k.to_vec()),
        None => ws.and_then(|ws| ws[2..].iter().map(Dim::value).collect()),
    };

    let out_channels = ws.map(|ws| ws[0].clone()).unwrap_or(Dim::Unknown);
    let mut out = vec![xs[0].clone(), out_channels];
    out.extend(window_dims(node, &xs[2..], kernel.as_deref(), false)?);
    Ok(Some(TensorType::new(x.elem_type, out)))
}

fn infer_pool(node: &NodeProto, x: Option<&TensorType>) -> InferResult<Option<TensorType>> {
    let Some(x) = x else {
        return Ok(None);
    };
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::unranked(x.elem_type)));
    };
    if xs.len() < 3 {
        return Err(incompatible(node, format!("input rank {} below 3", xs.len())));
    }
    let kernel = node
        .get_attribute_ints("kernel_shape")
        .ok_or_else(|| incompatible(node, "missing kernel_shape"))?;
    let ceil_mode = node.get_attribute_int("ceil_mode", 0) != 0;

    let mut out = xs[..2].to_vec();
    out.extend(window_dims(node, &xs[2..], Some(kernel), ceil_mode)?);
    Ok(Some(TensorType::new(x.elem_type, out)))
}

fn infer_global_pool(node: &NodeProto, x: Option<&TensorType>) -> InferResult<Option<TensorType>> {
    let Some(x) = x else {
        return Ok(None);
    };
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::unranked(x.elem_type)));
    };
    if xs.len() < 2 {
        return Err(incompatible(node, format!("input rank {} below 2", xs.len())));
    }
    let mut out = xs[..2].to_vec();
    out.resize(xs.len(), Dim::Value(1));
    Ok(Some(TensorType::new(x.elem_type, out)))
}

fn product_dim(dims: &[Dim]) -> Dim {
    numel(dims).map(Dim::Value).unwrap_or(Dim::Unknown)
}

fn infer_flatten(node: &NodeProto, x: Option<&TensorType>) -> InferResult<Option<TensorType>> {
    let Some(x) = x else {
        return Ok(None);
    };
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::new(x.elem_type, vec![Dim::Unknown; 2])));
    };
    let rank = xs.len() as i64;
    let axis = node.get_attribute_int("axis", 1);
    let axis = if axis < 0 { axis + rank } else { axis };
    if !(0..=rank).contains(&axis) {
        return Err(incompatible(node, format!("axis out of range for rank {}", rank)));
    }
    let axis = axis as usize;
    Ok(Some(TensorType::new(
        x.elem_type,
        vec![product_dim(&xs[..axis]), product_dim(&xs[axis..])],
    )))
}

fn infer_reshape(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Option<TensorType>> {
    let Some(data) = input(inputs, 0) else {
        return Ok(None);
    };
    let elem = data.elem_type;

    let Some(target) = const_ints(node, 1, constants)? else {
        // Without the values only the output rank is known.
        let rank = input(inputs, 1)
            .and_then(TensorType::static_dims)
            .and_then(|d| d.first().copied())
            .filter(|&r| r >= 0);
        return Ok(Some(match rank {
            Some(r) => TensorType::new(elem, vec![Dim::Unknown; r as usize]),
            None => TensorType::unranked(elem),
        }));
    };

    let allow_zero = node.get_attribute_int("allowzero", 0) != 0;
    let in_dims = data.shape.as_deref();
    let mut out = Vec::with_capacity(target.len());
    let mut infer_at = None;

    for (i, &v) in target.iter().enumerate() {
        match v {
            -1 => {
                if infer_at.replace(i).is_some() {
                    return Err(incompatible(node, "more than one -1 in target shape"));
                }
                out.push(Dim::Unknown);
            }
            0 if !allow_zero => match in_dims {
                Some(dims) => out.push(
                    dims.get(i)
                        .cloned()
                        .ok_or_else(|| incompatible(node, "0 in target shape past input rank"))?,
                ),
                None => out.push(Dim::Unknown),
            },
            v if v >= 0 => out.push(Dim::Value(v)),
            v => return Err(incompatible(node, format!("invalid target dimension {}", v))),
        }
    }

    let total = in_dims.and_then(numel);
    match infer_at {
        Some(pos) => {
            let rest: Option<i64> = out
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != pos)
                .map(|(_, d)| d.value())
                .product();
            if let (Some(total), Some(rest)) = (total, rest) {
                if rest == 0 || total % rest != 0 {
                    return Err(incompatible(
                        node,
                        format!("cannot reshape {} elements into {:?}", total, target),
                    ));
                }
                out[pos] = Dim::Value(total / rest);
            }
        }
        None => {
            if let (Some(total), Some(target_total)) = (total, numel(&out)) {
                if total != target_total {
                    return Err(incompatible(
                        node,
                        format!("cannot reshape {} elements into {:?}", total, target),
                    ));
                }
            }
        }
    }

    Ok(Some(TensorType::new(elem, out)))
}

fn infer_transpose(node: &NodeProto, x: Option<&TensorType>) -> InferResult<Option<TensorType>> {
    let Some(x) = x else {
        return Ok(None);
    };
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::unranked(x.elem_type)));
    };
    let rank = xs.len();
    let perm: Vec<i64> = match node.get_attribute_ints("perm") {
        Some(p) => p.to_vec(),
        None => (0..rank as i64).rev().collect(),
    };
    if perm.len() != rank {
        return Err(incompatible(node, "perm length differs from input rank"));
    }

    let mut seen = vec![false; rank];
    let mut out = Vec::with_capacity(rank);
    for &p in &perm {
        let axis = axis_of(node, p, rank)?;
        if std::mem::replace(&mut seen[axis], true) {
            return Err(incompatible(node, format!("perm repeats axis {}", axis)));
        }
        out.push(xs[axis].clone());
    }
    Ok(Some(TensorType::new(x.elem_type, out)))
}

fn infer_concat(node: &NodeProto, inputs: &[Option<&TensorType>]) -> InferResult<Option<TensorType>> {
    let types: Option<Vec<&TensorType>> = inputs.iter().copied().collect();
    let Some(types) = types.filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let elem = types[0].elem_type;
    let shapes: Option<Vec<&Vec<Dim>>> = types.iter().map(|t| t.shape.as_ref()).collect();
    let Some(shapes) = shapes else {
        return Ok(Some(TensorType::unranked(elem)));
    };

    let rank = shapes[0].len();
    if shapes.iter().any(|s| s.len() != rank) {
        return Err(incompatible(node, "inputs have different ranks"));
    }
    let axis = axis_of(node, node.get_attribute_int("axis", 0), rank)?;

    let mut out = shapes[0].clone();
    for shape in &shapes[1..] {
        for (j, dim) in shape.iter().enumerate() {
            if j == axis {
                out[j] = match (out[j].value(), dim.value()) {
                    (Some(a), Some(b)) => Dim::Value(a + b),
                    _ => Dim::Unknown,
                };
                continue;
            }
            check_same(node, &format!("dimension {}", j), &out[j], dim)?;
            if let Dim::Value(v) = dim {
                out[j] = Dim::Value(*v);
            }
        }
    }
    Ok(Some(TensorType::new(elem, out)))
}

fn infer_squeeze(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Option<TensorType>> {
    let Some(x) = input(inputs, 0) else {
        return Ok(None);
    };
    let elem = x.elem_type;
    let (Some(xs), Some(axes)) = (&x.shape, axes_operand(node, 1, constants)?) else {
        return Ok(Some(TensorType::unranked(elem)));
    };

    let out = match axes {
        Some(axes) => {
            let mut removed = vec![false; xs.len()];
            for &a in &axes {
                let axis = axis_of(node, a, xs.len())?;
                if xs[axis].value().is_some_and(|v| v != 1) {
                    return Err(incompatible(node, format!("cannot squeeze axis {} of extent != 1", axis)));
                }
                removed[axis] = true;
            }
            xs.iter()
                .zip(removed)
                .filter(|(_, d)| !d)
                .map(|(dim, _)| dim.clone())
                .collect()
        }
        None => {
            if xs.iter().any(|d| d.value().is_none()) {
                return Ok(Some(TensorType::unranked(elem)));
            }
            xs.iter().filter(|d| d.value() != Some(1)).cloned().collect()
        }
    };
    Ok(Some(TensorType::new(elem, out)))
}

fn infer_unsqueeze(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Option<TensorType>> {
    let Some(x) = input(inputs, 0) else {
        return Ok(None);
    };
    let elem = x.elem_type;
    let (Some(xs), Some(axes)) = (&x.shape, axes_operand(node, 1, constants)?) else {
        return Ok(Some(TensorType::unranked(elem)));
    };
    let axes = axes.ok_or_else(|| incompatible(node, "missing axes"))?;

    let out_rank = xs.len() + axes.len();
    let mut inserted = vec![false; out_rank];
    for &a in &axes {
        let axis = axis_of(node, a, out_rank)?;
        if std::mem::replace(&mut inserted[axis], true) {
            return Err(incompatible(node, format!("axis {} repeated", axis)));
        }
    }

    let mut rest = xs.iter();
    let out = inserted
        .into_iter()
        .map(|ins| {
            if ins {
                Dim::Value(1)
            } else {
                rest.next().cloned().unwrap_or(Dim::Unknown)
            }
        })
        .collect();
    Ok(Some(TensorType::new(elem, out)))
}

fn infer_expand(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Option<TensorType>> {
    let Some(x) = input(inputs, 0) else {
        return Ok(None);
    };
    let (Some(xs), Some(target)) = (&x.shape, const_ints(node, 1, constants)?) else {
        return Ok(Some(TensorType::unranked(x.elem_type)));
    };
    let target: Vec<Dim> = target.into_iter().map(Dim::Value).collect();
    let out = broadcast_dims(xs, &target)
        .ok_or_else(|| incompatible(node, "input does not broadcast to target shape"))?;
    Ok(Some(TensorType::new(x.elem_type, out)))
}

fn slice_extent(size: i64, start: i64, end: i64, step: i64) -> i64 {
    let clamp = |v: i64, lo: i64, hi: i64| v.max(lo).min(hi);
    let start = if start < 0 { start + size } else { start };
    let end = if end < 0 { end + size } else { end };
    if step > 0 {
        let (s, e) = (clamp(start, 0, size), clamp(end, 0, size));
        ((e - s + step - 1) / step).max(0)
    } else {
        let (s, e) = (clamp(start, 0, size - 1), clamp(end, -1, size - 1));
        ((s - e + (-step) - 1) / (-step)).max(0)
    }
}

fn infer_slice(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Option<TensorType>> {
    let Some(x) = input(inputs, 0) else {
        return Ok(None);
    };
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::unranked(x.elem_type)));
    };
    let rank = xs.len();

    let (Some(starts), Some(ends)) = (const_ints(node, 1, constants)?, const_ints(node, 2, constants)?)
    else {
        return Ok(Some(TensorType::new(x.elem_type, vec![Dim::Unknown; rank])));
    };
    if starts.len() != ends.len() {
        return Err(incompatible(node, "starts and ends differ in length"));
    }
    let axes = const_ints(node, 3, constants)?.unwrap_or_else(|| (0..starts.len() as i64).collect());
    let steps = const_ints(node, 4, constants)?.unwrap_or_else(|| vec![1; starts.len()]);
    if axes.len() != starts.len() || steps.len() != starts.len() {
        return Err(incompatible(node, "axes or steps differ in length from starts"));
    }

    let mut out = xs.clone();
    for i in 0..starts.len() {
        let axis = axis_of(node, axes[i], rank)?;
        if steps[i] == 0 {
            return Err(incompatible(node, "slice step is 0"));
        }
        out[axis] = match xs[axis].value() {
            Some(size) => Dim::Value(slice_extent(size, starts[i], ends[i], steps[i])),
            None => Dim::Unknown,
        };
    }
    Ok(Some(TensorType::new(x.elem_type, out)))
}

fn infer_gather(
    node: &NodeProto,
    data: Option<&TensorType>,
    indices: Option<&TensorType>,
) -> InferResult<Option<TensorType>> {
    let Some(data) = data else {
        return Ok(None);
    };
    let (Some(ds), Some(is)) = (&data.shape, indices.and_then(|t| t.shape.as_ref())) else {
        return Ok(Some(TensorType::unranked(data.elem_type)));
    };
    let axis = axis_of(node, node.get_attribute_int("axis", 0), ds.len())?;

    let mut out = ds[..axis].to_vec();
    out.extend(is.iter().cloned());
    out.extend(ds[axis + 1..].iter().cloned());
    Ok(Some(TensorType::new(data.elem_type, out)))
}

fn infer_shape_op(node: &NodeProto, x: Option<&TensorType>) -> Option<TensorType> {
    let len = match x.and_then(TensorType::rank) {
        Some(rank) => {
            let rank = rank as i64;
            let clamp = |v: i64| (if v < 0 { v + rank } else { v }).clamp(0, rank);
            let start = clamp(node.get_attribute_int("start", 0));
            let end = node.get_attribute("end").map(|a| clamp(a.i)).unwrap_or(rank);
            Dim::Value((end - start).max(0))
        }
        None => Dim::Unknown,
    };
    Some(TensorType::new(INT64, vec![len]))
}

fn infer_constant(node: &NodeProto) -> Option<TensorType> {
    if let Some(t) = node.get_attribute_tensor("value") {
        return Some(TensorType::from_dims(t.data_type, &t.dims));
    }
    if let Some(sparse) = node.get_attribute("sparse_value").and_then(|a| a.sparse_tensor.as_ref()) {
        let elem = sparse.values.as_ref().map(|v| v.data_type).unwrap_or(0);
        return Some(TensorType::from_dims(elem, &sparse.dims));
    }
    let attr = node.attribute.first()?;
    let ty = match attr.name.as_str() {
        "value_float" => TensorType::from_dims(FLOAT, &[]),
        "value_floats" => TensorType::from_dims(FLOAT, &[attr.floats.len() as i64]),
        "value_int" => TensorType::from_dims(INT64, &[]),
        "value_ints" => TensorType::from_dims(INT64, &[attr.ints.len() as i64]),
        "value_string" => TensorType::from_dims(STRING, &[]),
        "value_strings" => TensorType::from_dims(STRING, &[attr.strings.len() as i64]),
        _ => return None,
    };
    Some(ty)
}

fn infer_constant_of_shape(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Option<TensorType>> {
    let elem = node
        .get_attribute_tensor("value")
        .map(|t| t.data_type)
        .unwrap_or(FLOAT);
    if let Some(dims) = const_ints(node, 0, constants)? {
        return Ok(Some(TensorType::from_dims(elem, &dims)));
    }
    let rank = input(inputs, 0)
        .and_then(TensorType::static_dims)
        .and_then(|d| d.first().copied())
        .filter(|&r| r >= 0);
    Ok(Some(match rank {
        Some(r) => TensorType::new(elem, vec![Dim::Unknown; r as usize]),
        None => TensorType::unranked(elem),
    }))
}

fn infer_reduce(
    node: &NodeProto,
    inputs: &[Option<&TensorType>],
    constants: &ConstantTable,
) -> InferResult<Option<TensorType>> {
    let Some(x) = input(inputs, 0) else {
        return Ok(None);
    };
    let elem = x.elem_type;
    let keep_dims = node.get_attribute_int("keepdims", 1) != 0;
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::unranked(elem)));
    };
    let Some(axes) = axes_operand(node, 1, constants)? else {
        return Ok(Some(if keep_dims {
            TensorType::new(elem, vec![Dim::Unknown; xs.len()])
        } else {
            TensorType::unranked(elem)
        }));
    };

    let axes = axes.unwrap_or_default();
    if axes.is_empty() && node.get_attribute_int("noop_with_empty_axes", 0) != 0 {
        return Ok(Some(x.clone()));
    }

    let mut reduced = vec![axes.is_empty(); xs.len()];
    for &a in &axes {
        reduced[axis_of(node, a, xs.len())?] = true;
    }

    let out = xs
        .iter()
        .zip(reduced)
        .filter_map(|(dim, r)| match (r, keep_dims) {
            (false, _) => Some(dim.clone()),
            (true, true) => Some(Dim::Value(1)),
            (true, false) => None,
        })
        .collect();
    Ok(Some(TensorType::new(elem, out)))
}

fn infer_arg_reduce(node: &NodeProto, x: Option<&TensorType>) -> InferResult<Option<TensorType>> {
    let Some(x) = x else {
        return Ok(None);
    };
    let Some(xs) = &x.shape else {
        return Ok(Some(TensorType::unranked(INT64)));
    };
    let axis = axis_of(node, node.get_attribute_int("axis", 0), xs.len())?;
    let keep_dims = node.get_attribute_int("keepdims", 1) != 0;

    let mut out = xs.clone();
    if keep_dims {
        out[axis] = Dim::Value(1);
    } else {
        out.remove(axis);
    }
    Ok(Some(TensorType::new(INT64, out)))
}
