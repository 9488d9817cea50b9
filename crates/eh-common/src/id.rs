//! Vehicle identity and baseline partitioning keys.
//!
//! All learning and comparison is scoped by `(vehicle_id, gear)`; behaviour
//! is never pooled across gears or across vehicles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Gear number. Always a small positive integer.
pub type Gear = u8;

/// Vehicle identifier wrapper with display formatting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(id: impl Into<String>) -> Self {
        VehicleId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A usable id is non-empty and has no surrounding whitespace.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.trim() == self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(id: &str) -> Self {
        VehicleId(id.to_string())
    }
}

impl From<String> for VehicleId {
    fn from(id: String) -> Self {
        VehicleId(id)
    }
}

impl AsRef<str> for VehicleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Partition key for baselines: one vehicle in one gear.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BaselineKey {
    pub vehicle_id: VehicleId,
    pub gear: Gear,
}

impl BaselineKey {
    pub fn new(vehicle_id: impl Into<VehicleId>, gear: Gear) -> Self {
        BaselineKey {
            vehicle_id: vehicle_id.into(),
            gear,
        }
    }

    /// Parse the `<vehicle>/gear-<n>` display form.
    pub fn parse(s: &str) -> Option<Self> {
        let (vehicle, gear) = s.rsplit_once("/gear-")?;
        let gear: Gear = gear.parse().ok()?;
        let key = BaselineKey::new(vehicle, gear);
        if key.vehicle_id.is_valid() && gear >= 1 {
            Some(key)
        } else {
            None
        }
    }
}

impl fmt::Display for BaselineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/gear-{}", self.vehicle_id, self.gear)
    }
}
