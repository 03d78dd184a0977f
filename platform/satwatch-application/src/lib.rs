pub mod analysis;
pub mod collector;
pub mod config;
pub mod sync;
