use super::{filters, OperationView};
use crate::{
    index::InstId,
    rewriter::ProgramRewriter,
    spec::{
        ConstantValue, ElementwiseBinarySpec, ElementwiseUnarySpec, Operation, TransferSpec,
        ValueId, ValueType,
    },
};

#[derive(Clone)]
pub struct ConstantOpView {
    pub root: InstId,
    pub value: ConstantValue,
    pub result: ValueId,
    pub result_type: ValueType,
}

impl OperationView for ConstantOpView {
    const MATCHER: super::OperationMatcher = filters::constant;

    fn extract(root: InstId, rewriter: &ProgramRewriter) -> Option<Self> {
        let result = rewriter.value_of(root);
        let result_type = rewriter.type_of(result)?.clone();
        match rewriter.op(root) {
            Operation::Constant(value) => Some(Self {
                root,
                value: value.clone(),
                result,
                result_type,
            }),
            _ => None,
        }
    }
}

/// Unary or binary elementwise payload captured by one view.
#[derive(Clone, Copy)]
pub enum ElementwiseKind {
    Unary(ElementwiseUnarySpec),
    Binary(ElementwiseBinarySpec),
}

#[derive(Clone)]
pub struct ElementwiseOpView {
    pub root: InstId,
    pub kind: ElementwiseKind,
    pub operands: Vec<ValueId>,
    pub result: ValueId,
    pub result_type: ValueType,
}

impl OperationView for ElementwiseOpView {
    const MATCHER: super::OperationMatcher = filters::elementwise;

    fn extract(root: InstId, rewriter: &ProgramRewriter) -> Option<Self> {
        let operands = rewriter.operands(root).to_vec();
        let result = rewriter.value_of(root);
        let result_type = rewriter.type_of(result)?.clone();
        let kind = match rewriter.op(root) {
            Operation::ElementwiseUnary(spec) => ElementwiseKind::Unary(*spec),
            Operation::ElementwiseBinary(spec) => ElementwiseKind::Binary(*spec),
            _ => return None,
        };
        Some(Self {
            root,
            kind,
            operands,
            result,
            result_type,
        })
    }
}

#[derive(Clone)]
pub struct TransferReadOpView {
    pub root: InstId,
    pub spec: TransferSpec,
    pub source: ValueId,
    pub indices: Vec<ValueId>,
    pub result: ValueId,
    pub result_type: ValueType,
}

impl OperationView for TransferReadOpView {
    const MATCHER: super::OperationMatcher = filters::transfer_read;

    fn extract(root: InstId, rewriter: &ProgramRewriter) -> Option<Self> {
        let operands = rewriter.operands(root);
        let (source, indices) = operands.split_first()?;
        let result = rewriter.value_of(root);
        let result_type = rewriter.type_of(result)?.clone();
        match rewriter.op(root) {
            Operation::TransferRead(spec) => Some(Self {
                root,
                spec: spec.clone(),
                source: *source,
                indices: indices.to_vec(),
                result,
                result_type,
            }),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct TransferWriteOpView {
    pub root: InstId,
    pub spec: TransferSpec,
    pub vector: ValueId,
    pub source: ValueId,
    pub indices: Vec<ValueId>,
}

impl OperationView for TransferWriteOpView {
    const MATCHER: super::OperationMatcher = filters::transfer_write;

    fn extract(root: InstId, rewriter: &ProgramRewriter) -> Option<Self> {
        let operands = rewriter.operands(root);
        let (vector, rest) = operands.split_first()?;
        let (source, indices) = rest.split_first()?;
        match rewriter.op(root) {
            Operation::TransferWrite(spec) => Some(Self {
                root,
                spec: spec.clone(),
                vector: *vector,
                source: *source,
                indices: indices.to_vec(),
            }),
            _ => None,
        }
    }
}
