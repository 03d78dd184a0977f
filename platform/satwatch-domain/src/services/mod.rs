pub mod gaps;
pub mod indicators;
pub mod merge;
pub mod signal;
