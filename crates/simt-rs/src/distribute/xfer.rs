use std::sync::Arc;

use super::{
    get_distributed,
    permutation::reduced_permutation,
    replace_op_with_distributed_values,
    simd_index::{compute_simd_index, index_arith},
    DistributionSignature,
};
use crate::{
    index::{FunctionIndexError, InstId},
    layout::{
        iterator::{IterationState, LayoutIterator},
        DimLabel, LayoutDescriptor,
    },
    pattern::{OpRewritePattern, TransferReadOpView, TransferWriteOpView},
    rewriter::ProgramRewriter,
    spec::{
        ConstantValue, ExtractSliceSpec, IndexArithOp, InsertStridedSpec, Literal, LoadSpec,
        Operation, ValueId, ValueType, VectorSpec,
    },
};

/// Width of one contiguous memory access: the vectorized-axis extent on the
/// memory layout's fastest-changing dimension, or 1 for pure scalar access.
fn load_store_width(memory_layout: &LayoutDescriptor) -> usize {
    memory_layout
        .dims()
        .last()
        .and_then(|dim| dim.extent_of(DimLabel::VectorX))
        .unwrap_or(1)
}

/// Adds the per-lane offsets to the transfer's base indices. The memory
/// layout covers only the dimensions surviving projection, so leading
/// projected index positions pass through untouched.
fn memory_indices(
    rewriter: &mut ProgramRewriter,
    at: InstId,
    state: &IterationState,
    memory_layout: &LayoutDescriptor,
    base: &[ValueId],
    lane_id: ValueId,
) -> Result<Vec<ValueId>, FunctionIndexError> {
    let simd = compute_simd_index(rewriter, at, state, memory_layout, lane_id)?;
    assert!(
        simd.len() <= base.len(),
        "transfer carries fewer indices than the memory layout has dims"
    );
    let mut indices = base.to_vec();
    let leading = indices.len() - simd.len();
    for (position, index) in simd.into_iter().enumerate() {
        let slot = leading + position;
        indices[slot] = index_arith(rewriter, at, IndexArithOp::Add, indices[slot], index)?;
    }
    Ok(indices)
}

/// Rewrites a whole-vector read into width-wide lane-local loads accumulated
/// into a zero-initialized fragment.
///
/// Memory is addressed through the memory layout (the register layout
/// permuted by the transfer's index-selection map); the fragment is addressed
/// through the register layout. The two differ exactly when the transfer
/// transposes between storage order and register order.
pub struct DistributeTransferRead {
    signature: Arc<DistributionSignature>,
    lane_id: ValueId,
}

impl DistributeTransferRead {
    pub fn new(signature: Arc<DistributionSignature>, lane_id: ValueId) -> Self {
        Self { signature, lane_id }
    }
}

impl OpRewritePattern<TransferReadOpView> for DistributeTransferRead {
    fn match_and_rewrite(&self, view: TransferReadOpView, rewriter: &mut ProgramRewriter) -> bool {
        let Some(register_layout) = self.signature.layout_of(view.result).cloned() else {
            return false;
        };
        // Partial accesses would need masking; reserved.
        if view.spec.masked {
            return false;
        }
        let Some(vector) = view.result_type.as_vector().cloned() else {
            return false;
        };

        let permutation = reduced_permutation(&view.spec.map);
        let Ok(memory_layout) = register_layout.permute(&permutation) else {
            return false;
        };
        let width = load_store_width(&memory_layout);

        let distributed =
            ValueType::Vector(VectorSpec::new(vector.dtype, register_layout.distributed_shape()));
        let (_, zero) = rewriter
            .insert_before(
                view.root,
                Operation::Constant(ConstantValue::Splat(Literal::zero(vector.dtype))),
                Vec::new(),
                distributed.clone(),
            )
            .expect("inserting accumulator must succeed");

        let mut acc = zero;
        LayoutIterator::new(&register_layout)
            .with_step(DimLabel::VectorX, width)
            .apply(|state| {
                let indices = memory_indices(
                    rewriter,
                    view.root,
                    state,
                    &memory_layout,
                    &view.indices,
                    self.lane_id,
                )
                .expect("emitting unit access must succeed");
                let offsets = state.local_offset();

                let unit = ValueType::Vector(VectorSpec::new(vector.dtype, vec![width]));
                let mut operands = vec![view.source];
                operands.extend(indices);
                let (_, loaded) = rewriter
                    .insert_before(view.root, Operation::Load(LoadSpec { width }), operands, unit)
                    .expect("emitting unit access must succeed");
                let (_, inserted) = rewriter
                    .insert_before(
                        view.root,
                        Operation::InsertStrided(InsertStridedSpec { offsets }),
                        vec![loaded, acc],
                        distributed.clone(),
                    )
                    .expect("emitting unit access must succeed");
                acc = inserted;
            });

        replace_op_with_distributed_values(rewriter, view.root, acc);
        true
    }
}

/// Rewrites a whole-vector write into width-wide chunks extracted from the
/// already-distributed source and stored at the same addresses the matching
/// read would use.
pub struct DistributeTransferWrite {
    signature: Arc<DistributionSignature>,
    lane_id: ValueId,
}

impl DistributeTransferWrite {
    pub fn new(signature: Arc<DistributionSignature>, lane_id: ValueId) -> Self {
        Self { signature, lane_id }
    }
}

impl OpRewritePattern<TransferWriteOpView> for DistributeTransferWrite {
    fn match_and_rewrite(&self, view: TransferWriteOpView, rewriter: &mut ProgramRewriter) -> bool {
        let Some(register_layout) = self.signature.layout_of(view.vector).cloned() else {
            return false;
        };
        // Partial accesses would need masking; reserved.
        if view.spec.masked {
            return false;
        }
        let Some(vector) = rewriter
            .type_of(view.vector)
            .and_then(ValueType::as_vector)
            .cloned()
        else {
            return false;
        };

        let permutation = reduced_permutation(&view.spec.map);
        let Ok(memory_layout) = register_layout.permute(&permutation) else {
            return false;
        };
        let width = load_store_width(&memory_layout);

        let source = get_distributed(rewriter, view.root, view.vector, &register_layout);
        LayoutIterator::new(&register_layout)
            .with_step(DimLabel::VectorX, width)
            .apply(|state| {
                let indices = memory_indices(
                    rewriter,
                    view.root,
                    state,
                    &memory_layout,
                    &view.indices,
                    self.lane_id,
                )
                .expect("emitting unit access must succeed");
                let offsets = state.local_offset();

                let unit = ValueType::Vector(VectorSpec::new(vector.dtype, vec![width]));
                let (_, chunk) = rewriter
                    .insert_before(
                        view.root,
                        Operation::ExtractSlice(ExtractSliceSpec { offsets, width }),
                        vec![source],
                        unit,
                    )
                    .expect("emitting unit access must succeed");
                let mut operands = vec![chunk, view.source];
                operands.extend(indices);
                rewriter
                    .insert_before(view.root, Operation::Store, operands, ValueType::Token)
                    .expect("emitting unit access must succeed");
            });

        rewriter.erase_inst(view.root);
        true
    }
}
