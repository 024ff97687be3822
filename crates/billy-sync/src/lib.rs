//! billy-sync: state synchronization for the Billy control panel
//!
//! Keeps a front-end's view of the device consistent with what the device
//! reports, with as few device round-trips as possible.
//!
//! # Main Entry Points
//!
//! - [`cache`] - Time-bounded snapshot caches with request coalescing
//! - [`reloader`] - Rate-limited, non-overlapping reloads
//! - [`poller`] - Background status diffing with echo suppression
//! - [`session`] - User, persona and profile operations plus derived view
//! - [`api`] - Device API contract and its HTTP client

pub mod api;
pub mod cache;
pub mod errors;
mod locks;
pub mod logging;
pub mod poller;
pub mod reloader;
pub mod session;
pub mod snapshot;

#[cfg(test)]
mod testing;

pub use api::{DeviceApi, HttpDeviceApi};
pub use cache::{CacheRead, SnapshotCache};
pub use errors::{ApiError, PanelError, SessionError};
pub use poller::{ChangePoller, PollOutcome, StatusChange, WatchedField, diff_status};
pub use reloader::{DebouncedReloader, ReloadOutcome};
pub use session::{
    IdentityView, Notification, NotificationLevel, PanelView, PersonaSelector, ProfileRow,
    SessionController, SessionDeps, SessionEvent, SessionOptions,
};
pub use snapshot::{ConfigSnapshot, Snapshot, StatusSnapshot};

// Re-export config and protocol types front-ends need alongside the controller
pub use billy_config::{ConfigError, PanelConfig};
pub use billy_protocol::{
    MemoryRecord, PersonaInfo, Personality, ServiceAction, ServiceState, UserProfile, UserRef,
};

// Re-export logging initialization
pub use logging::init_logging;
