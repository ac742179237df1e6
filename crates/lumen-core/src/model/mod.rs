// ── Domain model ──
//
// Canonical types for the lighting hierarchy. Everything here has
// already been through alias folding; consumers never see `zone`,
// `locations` or `devices` spellings.

pub mod entity_id;
pub mod hierarchy;
pub mod path;

pub use entity_id::{EntityId, MacAddress};
pub use hierarchy::{Device, Group, Hierarchy, Location, Zone};
pub use path::{DevicePath, GroupPath, LocationPath};
