//! Lowers whole-vector SSA operations into per-lane SIMT code, given an
//! externally supplied layout per vector value.
//!
//! The crate splits into a small lane IR with a pattern-rewrite substrate
//! ([`spec`], [`index`], [`rewriter`], [`pattern`], [`driver`]), a layout
//! model with a deterministic iterator ([`layout`]), and the distribution
//! rules themselves ([`distribute`]).

pub mod distribute;
pub mod driver;
pub mod index;
pub mod ir_utils;
pub mod layout;
pub mod pattern;
pub mod rewriter;
pub mod spec;

pub use distribute::{distribute_function, DistributionSignature};
pub use layout::{DimLabel, LayoutDescriptor, PerDimLayout};
