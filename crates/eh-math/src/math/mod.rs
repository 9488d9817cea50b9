//! Core math modules.

pub mod curve;
pub mod stable;
pub mod welford;
