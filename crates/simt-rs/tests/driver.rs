use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use simt_rs::{
    driver::{apply_patterns_and_fold_greedily, GreedyConfig},
    index::InstId,
    ir_utils::{vector_type, FunctionBuilder},
    pattern::{filters, Pattern, PatternSet},
    rewriter::ProgramRewriter,
    spec::{
        ConstantValue, DType, ElementwiseUnaryOp, ElementwiseUnarySpec, FastMathFlags, Operation,
        ValueType,
    },
};

fn unary(op: ElementwiseUnaryOp) -> Operation {
    Operation::ElementwiseUnary(ElementwiseUnarySpec {
        op,
        fastmath: FastMathFlags::none(),
    })
}

/// Rewrites `neg` into `abs`; used to observe fixpoint behavior.
struct NegToAbs;

impl Pattern for NegToAbs {
    fn matches_operation(&self, op: &Operation) -> bool {
        matches!(
            op,
            Operation::ElementwiseUnary(ElementwiseUnarySpec {
                op: ElementwiseUnaryOp::Neg,
                ..
            })
        )
    }

    fn match_and_rewrite(&self, root: InstId, rewriter: &mut ProgramRewriter) -> bool {
        let operands = rewriter.operands(root).to_vec();
        let result = rewriter.value_of(root);
        let output = rewriter
            .type_of(result)
            .expect("result must be typed")
            .clone();
        let Ok((_, replacement)) =
            rewriter.insert_before(root, unary(ElementwiseUnaryOp::Abs), operands, output)
        else {
            return false;
        };
        rewriter.replace_all_uses(result, replacement);
        rewriter.erase_inst(root);
        true
    }
}

struct CountingNoMatch {
    calls: Arc<AtomicUsize>,
}

impl Pattern for CountingNoMatch {
    fn matches_operation(&self, op: &Operation) -> bool {
        filters::elementwise(op)
    }

    fn match_and_rewrite(&self, _root: InstId, _rewriter: &mut ProgramRewriter) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed);
        false
    }
}

#[test]
fn rewrites_until_fixpoint() {
    let mut builder = FunctionBuilder::new("chain");
    let input = builder.param(vector_type(DType::F32, &[4]));
    let first = builder.push(
        unary(ElementwiseUnaryOp::Neg),
        vec![input],
        vector_type(DType::F32, &[4]),
    );
    let second = builder.push(
        unary(ElementwiseUnaryOp::Neg),
        vec![first],
        vector_type(DType::F32, &[4]),
    );
    builder.ret(second);
    let mut func = builder.build();

    let mut set = PatternSet::new();
    set.add(NegToAbs);
    let stats = apply_patterns_and_fold_greedily(&mut func, &set.freeze(), &GreedyConfig::default());

    assert_eq!(stats.applied, 2);
    assert_eq!(func.body.len(), 2);
    assert!(func.body.iter().all(|inst| matches!(
        inst.op,
        Operation::ElementwiseUnary(ElementwiseUnarySpec {
            op: ElementwiseUnaryOp::Abs,
            ..
        })
    )));
}

#[test]
fn persistent_no_match_leaves_the_op_in_place() {
    let mut builder = FunctionBuilder::new("no_match");
    let input = builder.param(vector_type(DType::F32, &[4]));
    let result = builder.push(
        unary(ElementwiseUnaryOp::Abs),
        vec![input],
        vector_type(DType::F32, &[4]),
    );
    builder.ret(result);
    let mut func = builder.build();
    let before = func.clone();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut set = PatternSet::new();
    set.add(CountingNoMatch {
        calls: Arc::clone(&calls),
    });
    let stats = apply_patterns_and_fold_greedily(&mut func, &set.freeze(), &GreedyConfig::default());

    assert_eq!(stats.applied, 0);
    assert_eq!(func, before);
    // The unchanged instruction is attempted exactly once.
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn dce_removes_dead_pure_instructions() {
    let mut builder = FunctionBuilder::new("dead");
    let kept = builder.push(
        Operation::Constant(ConstantValue::Index(1)),
        Vec::new(),
        ValueType::Index,
    );
    builder.push(
        Operation::Constant(ConstantValue::Index(2)),
        Vec::new(),
        ValueType::Index,
    );
    builder.ret(kept);
    let mut func = builder.build();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut set = PatternSet::new();
    set.add(CountingNoMatch { calls });
    let stats = apply_patterns_and_fold_greedily(&mut func, &set.freeze(), &GreedyConfig::default());

    assert_eq!(stats.dce_removed, 1);
    assert_eq!(func.body.len(), 1);
    assert_eq!(func.body[0].id, kept);
}

#[test]
fn dce_can_be_disabled() {
    let mut builder = FunctionBuilder::new("kept");
    let kept = builder.push(
        Operation::Constant(ConstantValue::Index(1)),
        Vec::new(),
        ValueType::Index,
    );
    builder.push(
        Operation::Constant(ConstantValue::Index(2)),
        Vec::new(),
        ValueType::Index,
    );
    builder.ret(kept);
    let mut func = builder.build();

    let calls = Arc::new(AtomicUsize::new(0));
    let mut set = PatternSet::new();
    set.add(CountingNoMatch { calls });
    let cfg = GreedyConfig {
        enable_dce: false,
        ..GreedyConfig::default()
    };
    let stats = apply_patterns_and_fold_greedily(&mut func, &set.freeze(), &cfg);

    assert_eq!(stats.dce_removed, 0);
    assert_eq!(func.body.len(), 2);
}

#[test]
fn patterns_are_ordered_by_benefit() {
    struct Benefit(u16);

    impl Pattern for Benefit {
        fn matches_operation(&self, op: &Operation) -> bool {
            filters::any(op)
        }

        fn benefit(&self) -> u16 {
            self.0
        }

        fn match_and_rewrite(&self, _root: InstId, _rewriter: &mut ProgramRewriter) -> bool {
            false
        }
    }

    let mut set = PatternSet::new();
    set.add(Benefit(1));
    set.add(Benefit(5));
    set.add(Benefit(3));
    let frozen = set.freeze();

    let benefits: Vec<u16> = frozen
        .matching(&Operation::SimdToSimt)
        .map(|(_, pattern)| pattern.benefit())
        .collect();
    assert_eq!(benefits, vec![5, 3, 1]);
}
