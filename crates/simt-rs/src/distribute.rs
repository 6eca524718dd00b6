//! Lowers whole-vector operations into per-lane code under explicit layouts.
//!
//! Each handled operation kind gets one rewrite rule. Rules consume the
//! externally computed [`DistributionSignature`] and communicate through
//! `simd_to_simt` / `simt_to_simd` bridge casts so every rewrite is atomic:
//! a rule either produces a complete lane-local replacement or reports
//! no-match and leaves the operation untouched.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    driver::{apply_patterns_and_fold_greedily, GreedyConfig, GreedyRewriteStats},
    index::{DefId, InstId},
    layout::LayoutDescriptor,
    pattern::{
        ConstantOpView, ElementwiseOpView, PatternSet, TransferReadOpView, TransferWriteOpView,
    },
    rewriter::ProgramRewriter,
    spec::{Function, Operation, ValueId, ValueType, VectorSpec},
};

mod constants;
mod elementwise;
mod permutation;
mod simd_index;
mod xfer;

pub use constants::DistributeSplatConstant;
pub use elementwise::{DistributeElementwise, DEFAULT_BINARY_OPS, DEFAULT_UNARY_OPS};
pub use permutation::reduced_permutation;
pub use simd_index::{compute_simd_index, delinearize_lane_id};
pub use xfer::{DistributeTransferRead, DistributeTransferWrite};

/// Externally supplied assignment of a layout to each vector value.
/// Read-only within this module.
#[derive(Debug, Clone, Default)]
pub struct DistributionSignature {
    layouts: HashMap<ValueId, LayoutDescriptor>,
}

impl DistributionSignature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, value: ValueId, layout: LayoutDescriptor) {
        self.layouts.insert(value, layout);
    }

    /// Returns the layout assigned to `value`, or `None` when unassigned.
    pub fn layout_of(&self, value: ValueId) -> Option<&LayoutDescriptor> {
        self.layouts.get(&value)
    }
}

impl FromIterator<(ValueId, LayoutDescriptor)> for DistributionSignature {
    fn from_iter<I: IntoIterator<Item = (ValueId, LayoutDescriptor)>>(iter: I) -> Self {
        Self {
            layouts: iter.into_iter().collect(),
        }
    }
}

/// Returns the lane-local form of a whole-vector `value` under `layout`.
///
/// A value produced by a `simt_to_simd` bridge already has a lane-local
/// form; otherwise a `simd_to_simt` cast is materialized before `at`.
pub fn get_distributed(
    rewriter: &mut ProgramRewriter,
    at: InstId,
    value: ValueId,
    layout: &LayoutDescriptor,
) -> ValueId {
    if let Some(DefId::Inst(inst)) = rewriter.def_of(value) {
        if matches!(rewriter.op(inst), Operation::SimtToSimd) {
            return rewriter.operands(inst)[0];
        }
    }
    let spec = rewriter
        .type_of(value)
        .and_then(ValueType::as_vector)
        .expect("distributed value must be vector-typed")
        .clone();
    let distributed = ValueType::Vector(VectorSpec::new(spec.dtype, layout.distributed_shape()));
    let (_, cast) = rewriter
        .insert_before(at, Operation::SimdToSimt, vec![value], distributed)
        .expect("inserting bridge cast must succeed");
    cast
}

/// Replaces `root` with the lane-local `distributed` value. Vector results
/// turn `root` into a `simt_to_simd` bridge in place, so the result id (the
/// key consumers and the layout signature hold) survives the rewrite; other
/// results are substituted directly. The change becomes visible atomically.
pub fn replace_op_with_distributed_values(
    rewriter: &mut ProgramRewriter,
    root: InstId,
    distributed: ValueId,
) {
    let result = rewriter.value_of(root);
    let result_type = rewriter
        .type_of(result)
        .expect("replaced result must be typed")
        .clone();
    if result_type.is_vector() {
        rewriter
            .replace_inst(root, Operation::SimtToSimd, vec![distributed], result_type)
            .expect("bridge rewrite must succeed");
    } else {
        rewriter.replace_all_uses(result, distributed);
        rewriter.erase_inst(root);
    }
}

/// Registers the layout-only rules: splat constants and elementwise ops.
pub fn populate_distribution_patterns(set: &mut PatternSet, signature: &Arc<DistributionSignature>) {
    set.insert_view::<ConstantOpView, _>(DistributeSplatConstant::new(Arc::clone(signature)));
    set.insert_view::<ElementwiseOpView, _>(DistributeElementwise::new(Arc::clone(signature)));
}

/// Registers the transfer rules, which additionally need the lane identity.
pub fn populate_transfer_distribution_patterns(
    set: &mut PatternSet,
    signature: &Arc<DistributionSignature>,
    lane_id: ValueId,
) {
    set.insert_view::<TransferReadOpView, _>(DistributeTransferRead::new(
        Arc::clone(signature),
        lane_id,
    ));
    set.insert_view::<TransferWriteOpView, _>(DistributeTransferWrite::new(
        Arc::clone(signature),
        lane_id,
    ));
}

/// Runs the full distribution pattern set over `func` to fixpoint.
pub fn distribute_function(
    func: &mut Function,
    signature: Arc<DistributionSignature>,
    lane_id: ValueId,
) -> GreedyRewriteStats {
    let mut set = PatternSet::new();
    populate_distribution_patterns(&mut set, &signature);
    populate_transfer_distribution_patterns(&mut set, &signature, lane_id);
    apply_patterns_and_fold_greedily(func, &set.freeze(), &GreedyConfig::default())
}
