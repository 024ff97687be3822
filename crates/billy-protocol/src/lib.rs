//! # billy-protocol
//!
//! Wire types of the Billy device configuration API and the normalization of
//! its loosely shaped payloads. Shared by the sync engine and the CLI.

mod messages;
mod normalize;
mod types;

pub use messages::{
    ApiMessage, CURRENT_USER_KEY, CurrentUserEnvelope, DEFAULT_USER_KEY, DeleteMemoryRequest,
    EnvConfig, PersonaList, ProfileAction, ProfileEntry, ProfileList, RawStatus,
    RenameProfileRequest, SaveSettingsRequest, ServiceAction, SetCurrentUserRequest,
    UpdateDisplayNameRequest,
};
pub use normalize::{NormalizeError, is_guest_name, normalize_current_user};
pub use types::{
    MemoryRecord, PersonaInfo, Personality, ServiceState, UserProfile, UserRef, same_id,
};
