use crate::spec::{MapResult, ProjectedPermutationMap};

/// Derives the 0-based permutation of the non-projected domain positions
/// implied by the order of `map`'s results.
///
/// Panics when the map contains a broadcast result or a result referencing a
/// projected-out dimension: such maps have no defined reduction and indicate
/// malformed input rather than an ordinary mismatch.
pub fn reduced_permutation(map: &ProjectedPermutationMap) -> Vec<usize> {
    let leading = map.leading_projected_dims();
    let mut permutation = Vec::with_capacity(map.num_results());
    for result in &map.results {
        let MapResult::Dim(pos) = result else {
            panic!("permutation map is not a projected permutation");
        };
        assert!(*pos >= leading, "invalid permutation map");
        permutation.push(pos - leading);
    }
    permutation
}
