//! Rectangle packing over a free-space anchor graph.

pub mod anchor;
pub mod greedy;

pub use anchor::{AnchorGraph, AnchorId, AnchorSnapshot};
pub use greedy::{GreedyPacker, pack_modules};
