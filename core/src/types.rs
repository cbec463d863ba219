//! Shared primitive types used across the entire pipeline.

/// A driver identifier. Drivers are provisioned reference data.
pub type UserId = i64;

/// A vehicle identifier (rowid of the vehicles table).
pub type VehicleId = i64;

/// The canonical trip identifier: a collision-resistant random string,
/// unique across simulator runs.
pub type TripId = String;
