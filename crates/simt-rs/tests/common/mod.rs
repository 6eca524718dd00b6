#![allow(dead_code)]

use std::collections::HashMap;

use simt_rs::spec::{ConstantValue, Function, IndexArithOp, Operation, ValueId};

/// Evaluates every scalar index chain in `func` under the given parameter
/// bindings and returns the resulting value table.
pub fn eval_indices(func: &Function, bindings: &[(ValueId, i64)]) -> HashMap<ValueId, i64> {
    let mut values: HashMap<ValueId, i64> = bindings.iter().copied().collect();
    for inst in &func.body {
        let computed = match &inst.op {
            Operation::Constant(ConstantValue::Index(value)) => Some(*value),
            Operation::IndexArith(op) => {
                let lhs = values.get(&inst.operands[0]).copied();
                let rhs = values.get(&inst.operands[1]).copied();
                match (lhs, rhs) {
                    (Some(lhs), Some(rhs)) => Some(match op {
                        IndexArithOp::Add => lhs + rhs,
                        IndexArithOp::Mul => lhs * rhs,
                        IndexArithOp::FloorDiv => lhs.div_euclid(rhs),
                        IndexArithOp::Rem => lhs.rem_euclid(rhs),
                    }),
                    _ => None,
                }
            }
            _ => None,
        };
        if let Some(value) = computed {
            values.insert(inst.id, value);
        }
    }
    values
}

/// Loads in body order as (index operands, width).
pub fn collect_loads(func: &Function) -> Vec<(Vec<ValueId>, usize)> {
    func.body
        .iter()
        .filter_map(|inst| match &inst.op {
            Operation::Load(spec) => Some((inst.operands[1..].to_vec(), spec.width)),
            _ => None,
        })
        .collect()
}

/// Stores in body order as (index operands, chunk value).
pub fn collect_stores(func: &Function) -> Vec<(Vec<ValueId>, ValueId)> {
    func.body
        .iter()
        .filter_map(|inst| match &inst.op {
            Operation::Store => Some((inst.operands[2..].to_vec(), inst.operands[0])),
            _ => None,
        })
        .collect()
}

/// Accumulator insertion offsets in body order.
pub fn collect_insert_offsets(func: &Function) -> Vec<Vec<usize>> {
    func.body
        .iter()
        .filter_map(|inst| match &inst.op {
            Operation::InsertStrided(spec) => Some(spec.offsets.clone()),
            _ => None,
        })
        .collect()
}

/// Chunk extraction offsets in body order.
pub fn collect_extract_offsets(func: &Function) -> Vec<Vec<usize>> {
    func.body
        .iter()
        .filter_map(|inst| match &inst.op {
            Operation::ExtractSlice(spec) => Some(spec.offsets.clone()),
            _ => None,
        })
        .collect()
}

/// Counts instructions whose operation satisfies `predicate`.
pub fn count_ops(func: &Function, predicate: impl Fn(&Operation) -> bool) -> usize {
    func.body.iter().filter(|inst| predicate(&inst.op)).count()
}
