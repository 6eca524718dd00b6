use std::sync::Arc;

use super::{replace_op_with_distributed_values, DistributionSignature};
use crate::{
    pattern::{ConstantOpView, OpRewritePattern},
    rewriter::ProgramRewriter,
    spec::{ConstantValue, Operation, ValueType, VectorSpec},
};

/// Rewrites a vector-typed splat constant into a splat of the distributed
/// shape: every lane needs an identical private copy of the scalar.
pub struct DistributeSplatConstant {
    signature: Arc<DistributionSignature>,
}

impl DistributeSplatConstant {
    pub fn new(signature: Arc<DistributionSignature>) -> Self {
        Self { signature }
    }
}

impl OpRewritePattern<ConstantOpView> for DistributeSplatConstant {
    fn match_and_rewrite(&self, view: ConstantOpView, rewriter: &mut ProgramRewriter) -> bool {
        let Some(vector) = view.result_type.as_vector() else {
            return false;
        };
        // Only splat values are handled for now.
        let Some(scalar) = view.value.as_splat() else {
            return false;
        };
        let Some(layout) = self.signature.layout_of(view.result) else {
            return false;
        };

        let distributed =
            ValueType::Vector(VectorSpec::new(vector.dtype, layout.distributed_shape()));
        let Ok((_, replacement)) = rewriter.insert_before(
            view.root,
            Operation::Constant(ConstantValue::Splat(scalar)),
            Vec::new(),
            distributed,
        ) else {
            return false;
        };
        replace_op_with_distributed_values(rewriter, view.root, replacement);
        true
    }
}
