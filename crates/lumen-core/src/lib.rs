//! Business logic for lumen lighting installations.
//!
//! Builds on `lumen-api` with three layers:
//!
//! - **Model** ([`model`]): the Zone → Group → Location → Device hierarchy,
//!   decoded from the backend's loosely shaped documents via [`normalize`].
//! - **Discovery** ([`discovery`]): subnet scans and committing selected
//!   devices into a Group, driven as a small state machine.
//! - **Device sync** ([`device_sync`]): optimistic per-device views with
//!   debounced color and brightness updates reconciled against reported state.

pub mod config;
pub mod debounce;
pub mod device_sync;
pub mod discovery;
pub mod error;
pub mod model;
pub mod normalize;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ClientConfig;
pub use debounce::DebouncedSender;
pub use device_sync::{DeviceStateSync, DeviceView};
pub use discovery::{
    Candidate, CommitReport, CommitRoute, DiscoveryCoordinator, DiscoveryState, EnrichmentHandle,
    ScanTarget, parse_scan_target,
};
pub use error::CoreError;
pub use session::Session;
pub use store::{DeviceUpdate, HierarchyStore, MoveTarget, NewDevice, NewLocation, Rename};

pub use model::{
    Device, DevicePath, EntityId, Group, GroupPath, Hierarchy, Location, LocationPath,
    MacAddress, Zone,
};

// Wire types consumers need without depending on lumen-api directly.
pub use lumen_api::{ProbeInfo, RequestPolicy, Rgbw};
