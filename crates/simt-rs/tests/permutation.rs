use simt_rs::{
    distribute::reduced_permutation,
    spec::{MapResult, ProjectedPermutationMap},
};

#[test]
fn swap_reduces_to_reversed_permutation() {
    // Two results swapping two dims, no leading projected dims.
    let map = ProjectedPermutationMap::new(2, vec![MapResult::Dim(1), MapResult::Dim(0)]);
    assert_eq!(reduced_permutation(&map), vec![1, 0]);
}

#[test]
fn identity_reduces_to_identity() {
    let map = ProjectedPermutationMap::identity(3);
    assert_eq!(reduced_permutation(&map), vec![0, 1, 2]);
}

#[test]
fn leading_projected_dims_are_subtracted() {
    // Domain (d0, d1, d2), results (d2, d1): d0 is projected out.
    let map = ProjectedPermutationMap::new(3, vec![MapResult::Dim(2), MapResult::Dim(1)]);
    assert_eq!(map.leading_projected_dims(), 1);
    assert_eq!(reduced_permutation(&map), vec![1, 0]);
}

#[test]
#[should_panic(expected = "not a projected permutation")]
fn broadcast_results_are_fatal() {
    let map = ProjectedPermutationMap::new(2, vec![MapResult::Dim(1), MapResult::Zero]);
    let _ = reduced_permutation(&map);
}

#[test]
#[should_panic(expected = "invalid permutation map")]
fn references_into_the_projected_block_are_fatal() {
    // Two results over three dims leaves one leading projected dim, so a
    // reference to d0 has no reduced position.
    let map = ProjectedPermutationMap::new(3, vec![MapResult::Dim(0), MapResult::Dim(2)]);
    let _ = reduced_permutation(&map);
}
