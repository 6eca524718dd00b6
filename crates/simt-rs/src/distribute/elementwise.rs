use std::sync::Arc;

use super::{get_distributed, replace_op_with_distributed_values, DistributionSignature};
use crate::{
    pattern::{ElementwiseKind, ElementwiseOpView, OpRewritePattern},
    rewriter::ProgramRewriter,
    spec::{
        ElementwiseBinaryOp, ElementwiseUnaryOp, Operation, ValueId, ValueType, VectorSpec,
    },
};

pub const DEFAULT_UNARY_OPS: &[ElementwiseUnaryOp] = &[
    ElementwiseUnaryOp::Neg,
    ElementwiseUnaryOp::Abs,
    ElementwiseUnaryOp::Exp,
    ElementwiseUnaryOp::Rsqrt,
];

pub const DEFAULT_BINARY_OPS: &[ElementwiseBinaryOp] = &[
    ElementwiseBinaryOp::Add,
    ElementwiseBinaryOp::Sub,
    ElementwiseBinaryOp::Mul,
    ElementwiseBinaryOp::Div,
    ElementwiseBinaryOp::Maximum,
    ElementwiseBinaryOp::Minimum,
];

/// One parameterized rule for every eligible elementwise operator: vector
/// operands are swapped for their lane-local forms, scalar operands pass
/// through, and the operation is rebuilt over the distributed types with its
/// fastmath flags intact.
pub struct DistributeElementwise {
    signature: Arc<DistributionSignature>,
    allowed_unary: &'static [ElementwiseUnaryOp],
    allowed_binary: &'static [ElementwiseBinaryOp],
}

impl DistributeElementwise {
    pub fn new(signature: Arc<DistributionSignature>) -> Self {
        Self::with_allowed(signature, DEFAULT_UNARY_OPS, DEFAULT_BINARY_OPS)
    }

    pub fn with_allowed(
        signature: Arc<DistributionSignature>,
        allowed_unary: &'static [ElementwiseUnaryOp],
        allowed_binary: &'static [ElementwiseBinaryOp],
    ) -> Self {
        Self {
            signature,
            allowed_unary,
            allowed_binary,
        }
    }
}

impl OpRewritePattern<ElementwiseOpView> for DistributeElementwise {
    fn match_and_rewrite(&self, view: ElementwiseOpView, rewriter: &mut ProgramRewriter) -> bool {
        match view.kind {
            ElementwiseKind::Unary(spec) if !self.allowed_unary.contains(&spec.op) => {
                return false;
            }
            ElementwiseKind::Binary(spec) if !self.allowed_binary.contains(&spec.op) => {
                return false;
            }
            _ => {}
        }

        // Check every layout up front: a rewrite must be all-or-nothing.
        let mut saw_vector = false;
        for operand in &view.operands {
            let Some(operand_type) = rewriter.type_of(*operand) else {
                return false;
            };
            if operand_type.is_vector() {
                saw_vector = true;
                if self.signature.layout_of(*operand).is_none() {
                    return false;
                }
            }
        }
        let result_layout = match &view.result_type {
            ValueType::Vector(_) => {
                saw_vector = true;
                match self.signature.layout_of(view.result) {
                    Some(layout) => Some(layout.clone()),
                    None => return false,
                }
            }
            _ => None,
        };
        if !saw_vector {
            return false;
        }

        let mut operands: Vec<ValueId> = Vec::with_capacity(view.operands.len());
        for operand in &view.operands {
            let operand_type = rewriter
                .type_of(*operand)
                .expect("operand type checked above")
                .clone();
            if operand_type.is_vector() {
                let layout = self
                    .signature
                    .layout_of(*operand)
                    .expect("operand layout checked above")
                    .clone();
                operands.push(get_distributed(rewriter, view.root, *operand, &layout));
            } else {
                operands.push(*operand);
            }
        }

        let result_type = match (&view.result_type, result_layout) {
            (ValueType::Vector(spec), Some(layout)) => {
                ValueType::Vector(VectorSpec::new(spec.dtype, layout.distributed_shape()))
            }
            (other, _) => other.clone(),
        };

        let op = match view.kind {
            ElementwiseKind::Unary(spec) => Operation::ElementwiseUnary(spec),
            ElementwiseKind::Binary(spec) => Operation::ElementwiseBinary(spec),
        };
        let Ok((_, replacement)) = rewriter.insert_before(view.root, op, operands, result_type)
        else {
            return false;
        };
        replace_op_with_distributed_values(rewriter, view.root, replacement);
        true
    }
}
