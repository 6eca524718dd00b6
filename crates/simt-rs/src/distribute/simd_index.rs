use crate::{
    index::{FunctionIndexError, InstId},
    layout::{iterator::IterationState, LayoutDescriptor, PerDimLayout},
    rewriter::ProgramRewriter,
    spec::{ConstantValue, IndexArithOp, Operation, ValueId, ValueType},
};

/// Integer-weighted sum of the three lane coordinates plus a constant: the
/// linear form every per-dimension address reduces to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LaneExpr {
    coeffs: [i64; 3],
    constant: i64,
}

/// Accumulates one dimension's mixed-radix address. Entries are walked
/// fastest- to slowest-changing so later entries contribute the least
/// significant part.
fn lane_expr_for_dim(dim: &PerDimLayout, state: &IterationState) -> LaneExpr {
    let mut expr = LaneExpr::default();
    let mut stride: i64 = 1;
    for (label, extent) in dim.entries().iter().rev() {
        match label.lane_axis() {
            Some(axis) => expr.coeffs[axis] += stride,
            None => {
                let position = state
                    .position(*label)
                    .expect("iterated label must have a position");
                expr.constant += stride * position as i64;
            }
        }
        stride *= *extent as i64;
    }
    expr
}

/// Emits runtime arithmetic decomposing the scalar lane identity against the
/// grid, row-major over (Z, Y, X), and returns the coordinates as (X, Y, Z).
///
/// The lane identity is only known at execution time, so the decomposition is
/// materialized as instructions rather than folded away. Panics when the grid
/// has a zero extent: such a grid cannot be decomposed against.
pub fn delinearize_lane_id(
    rewriter: &mut ProgramRewriter,
    at: InstId,
    lane_id: ValueId,
    grid: [usize; 3],
) -> Result<[ValueId; 3], FunctionIndexError> {
    assert!(
        grid.iter().all(|&extent| extent > 0),
        "failed to decompose lane id against lane grid"
    );
    let [extent_x, extent_y, _] = grid;

    let inner = index_constant(rewriter, at, (extent_y * extent_x) as i64)?;
    let coord_z = index_arith(rewriter, at, IndexArithOp::FloorDiv, lane_id, inner)?;
    let rest = index_arith(rewriter, at, IndexArithOp::Rem, lane_id, inner)?;
    let minor = index_constant(rewriter, at, extent_x as i64)?;
    let coord_y = index_arith(rewriter, at, IndexArithOp::FloorDiv, rest, minor)?;
    let coord_x = index_arith(rewriter, at, IndexArithOp::Rem, rest, minor)?;
    Ok([coord_x, coord_y, coord_z])
}

/// Emits the runtime memory offset of the current iteration state for each
/// vector dimension of `layout`, parameterized by the executing lane.
pub fn compute_simd_index(
    rewriter: &mut ProgramRewriter,
    at: InstId,
    state: &IterationState,
    layout: &LayoutDescriptor,
    lane_id: ValueId,
) -> Result<Vec<ValueId>, FunctionIndexError> {
    let coords = delinearize_lane_id(rewriter, at, lane_id, layout.lane_grid())?;
    let mut indices = Vec::with_capacity(layout.rank());
    for dim in layout.dims() {
        let expr = lane_expr_for_dim(dim, state);
        indices.push(materialize(rewriter, at, expr, coords)?);
    }
    Ok(indices)
}

/// Lowers a `LaneExpr` into the equivalent sequence of index arithmetic.
/// Zero weights emit nothing; unit weights skip the multiply.
fn materialize(
    rewriter: &mut ProgramRewriter,
    at: InstId,
    expr: LaneExpr,
    coords: [ValueId; 3],
) -> Result<ValueId, FunctionIndexError> {
    let mut acc: Option<ValueId> = None;
    for (axis, &coeff) in expr.coeffs.iter().enumerate() {
        if coeff == 0 {
            continue;
        }
        let term = if coeff == 1 {
            coords[axis]
        } else {
            let weight = index_constant(rewriter, at, coeff)?;
            index_arith(rewriter, at, IndexArithOp::Mul, coords[axis], weight)?
        };
        acc = Some(match acc {
            None => term,
            Some(sum) => index_arith(rewriter, at, IndexArithOp::Add, sum, term)?,
        });
    }
    match acc {
        None => index_constant(rewriter, at, expr.constant),
        Some(sum) if expr.constant == 0 => Ok(sum),
        Some(sum) => {
            let constant = index_constant(rewriter, at, expr.constant)?;
            index_arith(rewriter, at, IndexArithOp::Add, sum, constant)
        }
    }
}

pub(super) fn index_constant(
    rewriter: &mut ProgramRewriter,
    at: InstId,
    value: i64,
) -> Result<ValueId, FunctionIndexError> {
    rewriter
        .insert_before(
            at,
            Operation::Constant(ConstantValue::Index(value)),
            Vec::new(),
            ValueType::Index,
        )
        .map(|(_, value_id)| value_id)
}

pub(super) fn index_arith(
    rewriter: &mut ProgramRewriter,
    at: InstId,
    op: IndexArithOp,
    lhs: ValueId,
    rhs: ValueId,
) -> Result<ValueId, FunctionIndexError> {
    rewriter
        .insert_before(at, Operation::IndexArith(op), vec![lhs, rhs], ValueType::Index)
        .map(|(_, value_id)| value_id)
}
