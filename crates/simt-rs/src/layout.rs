use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod iterator;

/// Role of one axis inside a per-dimension layout. Lane labels address the
/// hardware lane grid; the remaining labels describe per-lane local structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DimLabel {
    BatchX,
    BatchY,
    LaneX,
    LaneY,
    LaneZ,
    VectorX,
    VectorY,
    VectorZ,
}

impl DimLabel {
    pub fn is_lane(self) -> bool {
        matches!(self, DimLabel::LaneX | DimLabel::LaneY | DimLabel::LaneZ)
    }

    /// Maps a lane label to its grid axis (X=0, Y=1, Z=2).
    pub fn lane_axis(self) -> Option<usize> {
        match self {
            DimLabel::LaneX => Some(0),
            DimLabel::LaneY => Some(1),
            DimLabel::LaneZ => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for DimLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DimLabel::BatchX => "batchx",
            DimLabel::BatchY => "batchy",
            DimLabel::LaneX => "lanex",
            DimLabel::LaneY => "laney",
            DimLabel::LaneZ => "lanez",
            DimLabel::VectorX => "vectorx",
            DimLabel::VectorY => "vectory",
            DimLabel::VectorZ => "vectorz",
        };
        f.write_str(name)
    }
}

/// Ordered (label, extent) list for one logical vector dimension. The first
/// entry is the slowest-changing, the last the fastest-changing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerDimLayout {
    entries: Vec<(DimLabel, usize)>,
}

impl PerDimLayout {
    pub fn new(entries: impl Into<Vec<(DimLabel, usize)>>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    pub fn entries(&self) -> &[(DimLabel, usize)] {
        &self.entries
    }

    /// Returns the extent recorded for `label`, if present.
    pub fn extent_of(&self, label: DimLabel) -> Option<usize> {
        self.entries
            .iter()
            .find(|(entry, _)| *entry == label)
            .map(|(_, extent)| *extent)
    }

    /// Number of logical elements covered by this dimension.
    pub fn size(&self) -> usize {
        self.entries.iter().map(|(_, extent)| extent).product()
    }

    /// Number of elements one lane holds locally for this dimension.
    pub fn distributed_size(&self) -> usize {
        self.entries
            .iter()
            .filter(|(label, _)| !label.is_lane())
            .map(|(_, extent)| extent)
            .product()
    }
}

/// Describes how a whole vector value decomposes onto the lane grid: one
/// `PerDimLayout` per logical vector dimension plus the grid extents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutDescriptor {
    dims: Vec<PerDimLayout>,
    lane_grid: [usize; 3],
}

impl LayoutDescriptor {
    /// Validates extents and label uniqueness before accepting the layout.
    pub fn new(
        dims: impl Into<Vec<PerDimLayout>>,
        lane_grid: [usize; 3],
    ) -> Result<Self, LayoutError> {
        let dims = dims.into();
        for (axis, extent) in lane_grid.iter().enumerate() {
            if *extent == 0 {
                return Err(LayoutError::ZeroLaneGrid { axis });
            }
        }
        let mut seen: HashSet<DimLabel> = HashSet::new();
        for dim in &dims {
            for (label, extent) in dim.entries() {
                if *extent == 0 {
                    return Err(LayoutError::ZeroExtent { label: *label });
                }
                if !label.is_lane() && !seen.insert(*label) {
                    return Err(LayoutError::DuplicateLabel { label: *label });
                }
            }
        }
        Ok(Self { dims, lane_grid })
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dims(&self) -> &[PerDimLayout] {
        &self.dims
    }

    pub fn lane_grid(&self) -> [usize; 3] {
        self.lane_grid
    }

    /// Shape of the array each lane must hold locally for a value under this
    /// layout.
    pub fn distributed_shape(&self) -> Vec<usize> {
        self.dims.iter().map(PerDimLayout::distributed_size).collect()
    }

    /// Reorders the per-dimension layouts: `dims[i] = old_dims[perm[i]]`.
    pub fn permute(&self, perm: &[usize]) -> Result<LayoutDescriptor, LayoutError> {
        if perm.len() != self.dims.len() {
            return Err(LayoutError::InvalidPermutation {
                perm: perm.to_vec(),
                rank: self.rank(),
            });
        }
        let mut used = vec![false; self.dims.len()];
        for &axis in perm {
            if axis >= self.dims.len() || used[axis] {
                return Err(LayoutError::InvalidPermutation {
                    perm: perm.to_vec(),
                    rank: self.rank(),
                });
            }
            used[axis] = true;
        }
        let dims = perm.iter().map(|&axis| self.dims[axis].clone()).collect();
        Ok(LayoutDescriptor {
            dims,
            lane_grid: self.lane_grid,
        })
    }
}

/// Errors surfaced when constructing or reordering layouts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout entry {label} has zero extent")]
    ZeroExtent { label: DimLabel },
    #[error("lane grid axis {axis} has zero extent")]
    ZeroLaneGrid { axis: usize },
    #[error("label {label} appears in more than one dimension")]
    DuplicateLabel { label: DimLabel },
    #[error("{perm:?} is not a permutation of 0..{rank}")]
    InvalidPermutation { perm: Vec<usize>, rank: usize },
}
