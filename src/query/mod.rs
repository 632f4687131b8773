pub mod neighbors;
pub mod stats;
