mod common;

use simt_rs::{
    distribute::{compute_simd_index, delinearize_lane_id},
    ir_utils::FunctionBuilder,
    layout::{iterator::LayoutIterator, DimLabel, LayoutDescriptor, PerDimLayout},
    rewriter::ProgramRewriter,
    spec::{ConstantValue, Function, Operation, ValueId, ValueType},
};

fn scratch_function() -> (Function, ValueId) {
    let mut builder = FunctionBuilder::new("scratch");
    let lane = builder.param(ValueType::Index);
    let anchor = builder.push(
        Operation::Constant(ConstantValue::Index(0)),
        Vec::new(),
        ValueType::Index,
    );
    builder.ret(anchor);
    (builder.build(), lane)
}

/// Emits the per-dimension indices for every iteration state of `layout`,
/// then evaluates them for each lane id in `lanes`.
fn addresses_per_lane(
    layout: &LayoutDescriptor,
    step: Option<(DimLabel, usize)>,
    lanes: &[i64],
) -> Vec<Vec<Vec<i64>>> {
    let (mut func, lane) = scratch_function();
    let mut rewriter = ProgramRewriter::new(&mut func).expect("build rewriter");
    let anchor = rewriter.insts_in_order()[0];

    let mut states = Vec::new();
    let mut iterator = LayoutIterator::new(layout);
    if let Some((label, width)) = step {
        iterator = iterator.with_step(label, width);
    }
    iterator.apply(|state| states.push(state.clone()));

    let mut emitted: Vec<Vec<ValueId>> = Vec::new();
    for state in &states {
        let indices = compute_simd_index(&mut rewriter, anchor, state, layout, lane)
            .expect("emission must succeed");
        emitted.push(indices);
    }
    drop(rewriter);

    lanes
        .iter()
        .map(|lane_value| {
            let values = common::eval_indices(&func, &[(lane, *lane_value)]);
            emitted
                .iter()
                .map(|indices| indices.iter().map(|id| values[id]).collect())
                .collect()
        })
        .collect()
}

#[test]
fn lane_stride_equals_vector_extent() {
    // Lane grid (2, 1, 1) and one dimension [(LaneX, 2), (VectorX, 4)]:
    // stepping the vector axis by 4 yields exactly one iteration, and the
    // address is the lane position scaled by the vector extent.
    let layout = LayoutDescriptor::new(
        vec![PerDimLayout::new(vec![
            (DimLabel::LaneX, 2),
            (DimLabel::VectorX, 4),
        ])],
        [2, 1, 1],
    )
    .expect("layout must validate");

    let per_lane = addresses_per_lane(&layout, Some((DimLabel::VectorX, 4)), &[0, 1]);
    assert_eq!(per_lane[0], vec![vec![0]]);
    assert_eq!(per_lane[1], vec![vec![4]]);
}

#[test]
fn addresses_are_injective_per_lane() {
    let layout = LayoutDescriptor::new(
        vec![PerDimLayout::new(vec![
            (DimLabel::BatchX, 2),
            (DimLabel::LaneX, 2),
            (DimLabel::VectorX, 2),
        ])],
        [2, 1, 1],
    )
    .expect("layout must validate");

    for lane_addresses in addresses_per_lane(&layout, None, &[0, 1]) {
        let mut seen = lane_addresses.clone();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), lane_addresses.len(), "addresses must be distinct");
    }
}

#[test]
fn mixed_radix_addressing_across_two_dims() {
    let layout = LayoutDescriptor::new(
        vec![
            PerDimLayout::new(vec![(DimLabel::BatchX, 2), (DimLabel::LaneY, 8)]),
            PerDimLayout::new(vec![(DimLabel::LaneX, 4), (DimLabel::VectorX, 4)]),
        ],
        [4, 8, 1],
    )
    .expect("layout must validate");

    // Lane 13 decomposes against the (Z, Y, X) = (1, 8, 4) grid row-major:
    // x = 1, y = 3, z = 0.
    let per_lane = addresses_per_lane(&layout, None, &[13]);
    let states: Vec<(i64, i64)> = (0..2)
        .flat_map(|batch| (0..4).map(move |vec| (batch, vec)))
        .collect();
    for (address, (batch, vec)) in per_lane[0].iter().zip(states) {
        assert_eq!(address[0], 3 + 8 * batch);
        assert_eq!(address[1], 4 + vec);
    }
}

#[test]
fn delinearize_orders_coordinates_x_y_z() {
    let (mut func, lane) = scratch_function();
    let mut rewriter = ProgramRewriter::new(&mut func).expect("build rewriter");
    let anchor = rewriter.insts_in_order()[0];
    let coords =
        delinearize_lane_id(&mut rewriter, anchor, lane, [4, 8, 2]).expect("emission must succeed");
    drop(rewriter);

    let values = common::eval_indices(&func, &[(lane, 45)]);
    assert_eq!(values[&coords[0]], 1); // 45 % 4
    assert_eq!(values[&coords[1]], 3); // (45 % 32) / 4
    assert_eq!(values[&coords[2]], 1); // 45 / 32
}

#[test]
#[should_panic(expected = "failed to decompose lane id")]
fn delinearize_rejects_zero_grid() {
    let (mut func, lane) = scratch_function();
    let mut rewriter = ProgramRewriter::new(&mut func).expect("build rewriter");
    let anchor = rewriter.insts_in_order()[0];
    let _ = delinearize_lane_id(&mut rewriter, anchor, lane, [0, 1, 1]);
}
