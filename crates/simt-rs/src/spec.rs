use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Enumerates scalar element types supported by the lane IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum DType {
    I1,
    Si8,
    Si16,
    Si32,
    Si64,
    F16,
    Bf16,
    F32,
    F64,
}

impl DType {
    /// Returns `true` when the dtype is a signed integer.
    pub fn is_integer(self) -> bool {
        matches!(self, DType::Si8 | DType::Si16 | DType::Si32 | DType::Si64)
    }

    /// Returns `true` when the dtype is a floating-point representation.
    pub fn is_float(self) -> bool {
        matches!(self, DType::F16 | DType::Bf16 | DType::F32 | DType::F64)
    }

    /// Returns the size in bytes when storage size is well-defined.
    pub fn size_in_bytes(self) -> Option<usize> {
        match self {
            DType::I1 | DType::Si8 => Some(1),
            DType::Si16 | DType::F16 | DType::Bf16 => Some(2),
            DType::Si32 | DType::F32 => Some(4),
            DType::Si64 | DType::F64 => Some(8),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::I1 => "i1",
            DType::Si8 => "si8",
            DType::Si16 => "si16",
            DType::Si32 => "si32",
            DType::Si64 => "si64",
            DType::F16 => "f16",
            DType::Bf16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// Scalar constant payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    /// Returns the zero literal for the given dtype.
    pub fn zero(dtype: DType) -> Self {
        if dtype.is_float() {
            Literal::Float(0.0)
        } else if dtype == DType::I1 {
            Literal::Bool(false)
        } else {
            Literal::Int(0)
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Static-shaped vector type, either a whole logical vector or a lane-local
/// fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorSpec {
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl VectorSpec {
    pub fn new(dtype: DType, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Memory buffer type used as the source/destination of transfers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemRefSpec {
    pub dtype: DType,
    pub shape: Vec<usize>,
}

impl MemRefSpec {
    pub fn new(dtype: DType, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            dtype,
            shape: shape.into(),
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// Unique identifier for SSA values in a lane program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ValueId(pub u32);

/// Typing information for SSA values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueType {
    /// Lane/address arithmetic scalar.
    Index,
    /// Uniform per-lane scalar.
    Scalar(DType),
    Vector(VectorSpec),
    MemRef(MemRefSpec),
    /// Result of store-like operations; never consumed.
    Token,
}

impl ValueType {
    pub fn as_vector(&self) -> Option<&VectorSpec> {
        match self {
            ValueType::Vector(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_memref(&self) -> Option<&MemRefSpec> {
        match self {
            ValueType::MemRef(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, ValueType::Vector(_))
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Index => f.write_str("index"),
            ValueType::Scalar(dtype) => write!(f, "{dtype}"),
            ValueType::Vector(spec) => {
                f.write_str("vector<")?;
                for dim in &spec.shape {
                    write!(f, "{dim}x")?;
                }
                write!(f, "{}>", spec.dtype)
            }
            ValueType::MemRef(spec) => {
                f.write_str("memref<")?;
                for dim in &spec.shape {
                    write!(f, "{dim}x")?;
                }
                write!(f, "{}>", spec.dtype)
            }
            ValueType::Token => f.write_str("token"),
        }
    }
}

/// Payload of a `constant` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstantValue {
    Index(i64),
    Scalar(Literal),
    /// Every element holds the identical scalar.
    Splat(Literal),
    /// Row-major dense elements.
    Dense(Vec<Literal>),
}

impl ConstantValue {
    pub fn as_splat(&self) -> Option<Literal> {
        match self {
            ConstantValue::Splat(literal) => Some(*literal),
            _ => None,
        }
    }
}

/// Semantics-preserving float flags carried across distribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FastMathFlags {
    pub reassoc: bool,
    pub contract: bool,
    pub nnan: bool,
    pub ninf: bool,
}

impl FastMathFlags {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Elementwise unary ops eligible for lane-local rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementwiseUnaryOp {
    Neg,
    Abs,
    Exp,
    Rsqrt,
}

/// Elementwise binary ops eligible for lane-local rewriting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementwiseBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Maximum,
    Minimum,
}

/// Attribute payload for elementwise unary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementwiseUnarySpec {
    pub op: ElementwiseUnaryOp,
    #[serde(default)]
    pub fastmath: FastMathFlags,
}

/// Attribute payload for elementwise binary operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementwiseBinarySpec {
    pub op: ElementwiseBinaryOp,
    #[serde(default)]
    pub fastmath: FastMathFlags,
}

/// Scalar index arithmetic emitted when materializing addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexArithOp {
    Add,
    Mul,
    FloorDiv,
    Rem,
}

/// One result position of a projected permutation map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapResult {
    /// Direct reference to the given domain dimension.
    Dim(usize),
    /// Broadcast result; unsupported by permutation reduction.
    Zero,
}

/// Index-selection map of a transfer: selects and reorders a subset of its
/// domain dimensions, with a possible leading block of projected-out
/// dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectedPermutationMap {
    pub num_dims: usize,
    pub results: Vec<MapResult>,
}

impl ProjectedPermutationMap {
    pub fn new(num_dims: usize, results: impl Into<Vec<MapResult>>) -> Self {
        Self {
            num_dims,
            results: results.into(),
        }
    }

    /// Minor identity over `rank` dimensions.
    pub fn identity(rank: usize) -> Self {
        Self {
            num_dims: rank,
            results: (0..rank).map(MapResult::Dim).collect(),
        }
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    pub fn leading_projected_dims(&self) -> usize {
        self.num_dims.saturating_sub(self.results.len())
    }
}

/// Attribute payload shared by `transfer_read` and `transfer_write`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferSpec {
    pub map: ProjectedPermutationMap,
    /// Partial accesses are reserved; patterns refuse masked transfers.
    #[serde(default)]
    pub masked: bool,
}

/// Attribute payload for a hardware-width `load`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadSpec {
    pub width: usize,
}

/// Attribute payload for `insert_strided`: destination element offsets of a
/// 1-D chunk written into a lane-local accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InsertStridedSpec {
    pub offsets: Vec<usize>,
}

/// Attribute payload for `extract_slice`: source element offsets and width of
/// the 1-D chunk read out of a lane-local value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExtractSliceSpec {
    pub offsets: Vec<usize>,
    pub width: usize,
}

/// Declarative form of lane IR operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Constant(ConstantValue),
    ElementwiseUnary(ElementwiseUnarySpec),
    ElementwiseBinary(ElementwiseBinarySpec),
    IndexArith(IndexArithOp),
    /// Whole-vector read from memory; operands: memref, base indices.
    TransferRead(TransferSpec),
    /// Whole-vector write to memory; operands: vector, memref, base indices.
    TransferWrite(TransferSpec),
    /// Lane-local width-wide load; operands: memref, indices.
    Load(LoadSpec),
    /// Lane-local store of a 1-D chunk; operands: chunk, memref, indices.
    Store,
    /// Operands: chunk, accumulator.
    InsertStrided(InsertStridedSpec),
    /// Operand: lane-local vector.
    ExtractSlice(ExtractSliceSpec),
    /// Bridges a whole-vector value into its lane-local form.
    SimdToSimt,
    /// Bridges a lane-local value back to the whole-vector view.
    SimtToSimd,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Constant(_) => "constant",
            Operation::ElementwiseUnary(_) => "ew_unary",
            Operation::ElementwiseBinary(_) => "ew_binary",
            Operation::IndexArith(IndexArithOp::Add) => "index_add",
            Operation::IndexArith(IndexArithOp::Mul) => "index_mul",
            Operation::IndexArith(IndexArithOp::FloorDiv) => "index_div",
            Operation::IndexArith(IndexArithOp::Rem) => "index_rem",
            Operation::TransferRead(_) => "transfer_read",
            Operation::TransferWrite(_) => "transfer_write",
            Operation::Load(_) => "load",
            Operation::Store => "store",
            Operation::InsertStrided(_) => "insert_strided",
            Operation::ExtractSlice(_) => "extract_slice",
            Operation::SimdToSimt => "simd_to_simt",
            Operation::SimtToSimd => "simt_to_simd",
        }
    }
}

/// Single SSA instruction in a lane program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub id: ValueId,
    pub op: Operation,
    pub operands: Vec<ValueId>,
    pub output: ValueType,
}

/// Function describing one lane computation, before or after distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<ValueType>,
    pub parameter_ids: Vec<ValueId>,
    pub results: Vec<ValueType>,
    pub result_ids: Vec<ValueId>,
    pub body: Vec<Instruction>,
}

/// Errors surfaced when serializing or deserializing a function.
#[derive(Debug, Error)]
pub enum FunctionSerdeError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),
}

impl Function {
    pub fn to_json_string(&self) -> Result<String, FunctionSerdeError> {
        serde_json::to_string_pretty(self).map_err(FunctionSerdeError::from)
    }

    pub fn from_json_str(src: &str) -> Result<Self, FunctionSerdeError> {
        serde_json::from_str(src).map_err(FunctionSerdeError::from)
    }

    pub fn to_bincode_bytes(&self) -> Result<Vec<u8>, FunctionSerdeError> {
        bincode::serialize(self).map_err(FunctionSerdeError::from)
    }

    pub fn from_bincode_slice(bytes: &[u8]) -> Result<Self, FunctionSerdeError> {
        bincode::deserialize(bytes).map_err(FunctionSerdeError::from)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "func @{} {{", self.name)?;
        for (value_id, value_type) in self.parameter_ids.iter().zip(self.parameters.iter()) {
            writeln!(f, "  param %{} : {}", value_id.0, value_type)?;
        }
        for instruction in &self.body {
            fmt_instruction(instruction, f)?;
        }
        for (value_id, value_type) in self.result_ids.iter().zip(self.results.iter()) {
            writeln!(f, "  return %{} : {}", value_id.0, value_type)?;
        }
        f.write_str("}")
    }
}

fn fmt_instruction(instruction: &Instruction, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "  %{} = {}", instruction.id.0, instruction.op.name())?;
    match &instruction.op {
        Operation::Constant(ConstantValue::Index(value)) => write!(f, " {value}")?,
        Operation::Constant(ConstantValue::Scalar(literal)) => write!(f, " {literal}")?,
        Operation::Constant(ConstantValue::Splat(literal)) => write!(f, " splat {literal}")?,
        Operation::Constant(ConstantValue::Dense(elements)) => {
            write!(f, " dense[{} elements]", elements.len())?
        }
        Operation::ElementwiseUnary(spec) => write!(f, " {:?}", spec.op)?,
        Operation::ElementwiseBinary(spec) => write!(f, " {:?}", spec.op)?,
        _ => {}
    }
    let mut separator = " ";
    for operand in &instruction.operands {
        write!(f, "{separator}%{}", operand.0)?;
        separator = ", ";
    }
    writeln!(f, " -> {}", instruction.output)
}
