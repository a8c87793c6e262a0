// Pure transformation pipeline: level selection -> per-stream normalization
// -> gap synthesis -> multi-stream alignment. No I/O in this tree.

pub mod align;
pub mod gaps;
pub mod normalize;
pub mod select;
pub mod stats;
