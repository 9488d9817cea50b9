//! Engine Health math utilities.

pub mod math;

pub use math::curve::*;
pub use math::stable::*;
pub use math::welford::*;
