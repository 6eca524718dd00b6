use std::collections::BTreeMap;

use super::{DimLabel, LayoutDescriptor};

/// Snapshot of the iterator's position in a layout's per-lane index space.
///
/// Holds a concrete position for every non-lane label of the layout, plus the
/// non-lane structure of each dimension so local offsets can be derived from
/// the state alone.
#[derive(Debug, Clone)]
pub struct IterationState {
    positions: BTreeMap<DimLabel, usize>,
    per_dim: Vec<Vec<(DimLabel, usize)>>,
}

impl IterationState {
    fn for_layout(layout: &LayoutDescriptor) -> Self {
        let mut positions = BTreeMap::new();
        let mut per_dim = Vec::with_capacity(layout.rank());
        for dim in layout.dims() {
            let entries: Vec<(DimLabel, usize)> = dim
                .entries()
                .iter()
                .filter(|(label, _)| !label.is_lane())
                .copied()
                .collect();
            for (label, _) in &entries {
                positions.insert(*label, 0);
            }
            per_dim.push(entries);
        }
        Self { positions, per_dim }
    }

    /// Current position of `label`; `None` for lane labels and labels absent
    /// from the iterated layout.
    pub fn position(&self, label: DimLabel) -> Option<usize> {
        self.positions.get(&label).copied()
    }

    /// Element offset into the lane-resident array, one entry per vector
    /// dimension. Lane labels contribute nothing: the local array only stores
    /// what one lane owns.
    pub fn local_offset(&self) -> Vec<usize> {
        self.per_dim
            .iter()
            .map(|entries| {
                let mut offset = 0;
                let mut stride = 1;
                for (label, extent) in entries.iter().rev() {
                    offset += stride * self.positions[label];
                    stride *= extent;
                }
                offset
            })
            .collect()
    }

    fn set(&mut self, label: DimLabel, position: usize) {
        self.positions.insert(label, position);
    }
}

/// Enumerates every combination of non-lane label positions of a layout, in a
/// canonical deterministic order: dimensions in layout order, labels within a
/// dimension slowest- to fastest-changing, the last label stepping fastest.
pub struct LayoutIterator<'a> {
    layout: &'a LayoutDescriptor,
    steps: BTreeMap<DimLabel, usize>,
}

impl<'a> LayoutIterator<'a> {
    pub fn new(layout: &'a LayoutDescriptor) -> Self {
        Self {
            layout,
            steps: BTreeMap::new(),
        }
    }

    /// Overrides the step for `label`; positions are visited in strides of
    /// `step` instead of one at a time.
    pub fn with_step(mut self, label: DimLabel, step: usize) -> Self {
        assert!(step > 0, "iteration step must be positive");
        self.steps.insert(label, step);
        self
    }

    /// Invokes `callback` once per combination with the current state.
    pub fn apply(self, mut callback: impl FnMut(&IterationState)) {
        // Flattened counter digits, slowest first; the last digit carries last.
        let digits: Vec<(DimLabel, usize, usize)> = self
            .layout
            .dims()
            .iter()
            .flat_map(|dim| dim.entries().iter())
            .filter(|(label, _)| !label.is_lane())
            .map(|(label, extent)| (*label, *extent, self.steps.get(label).copied().unwrap_or(1)))
            .collect();

        let mut state = IterationState::for_layout(self.layout);
        loop {
            callback(&state);
            if !advance(&mut state, &digits) {
                return;
            }
        }
    }
}

/// Odometer increment over the flattened digits; returns `false` on wrap.
fn advance(state: &mut IterationState, digits: &[(DimLabel, usize, usize)]) -> bool {
    for &(label, extent, step) in digits.iter().rev() {
        let position = state
            .position(label)
            .expect("iterated label must have a position");
        let next = position + step;
        if next < extent {
            state.set(label, next);
            return true;
        }
        state.set(label, 0);
    }
    false
}
