//! Device API boundary.
//!
//! Everything that talks to the device goes through [`DeviceApi`]; the sync
//! layer and the session controller only ever hold an `Arc<dyn DeviceApi>`.

mod http;

pub use http::HttpDeviceApi;

use async_trait::async_trait;
use billy_protocol::{SaveSettingsRequest, ServiceAction};

use crate::errors::ApiError;
use crate::snapshot::{ConfigSnapshot, StatusSnapshot};

#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Profiles, personas, default user and the current user.
    async fn fetch_config(&self) -> Result<ConfigSnapshot, ApiError>;

    /// `GET /service/status`
    async fn fetch_status(&self) -> Result<StatusSnapshot, ApiError>;

    /// `POST /current-user`
    async fn set_current_user(&self, id: &str) -> Result<(), ApiError>;

    /// `DELETE /current-user` (guest mode)
    async fn clear_current_user(&self) -> Result<(), ApiError>;

    /// Store the current user's preferred persona (`PATCH /current-user`).
    async fn set_preferred_persona(&self, persona: &str) -> Result<(), ApiError>;

    /// Switch the live persona without a user (`GET /persona/<name>`).
    async fn set_live_persona(&self, persona: &str) -> Result<(), ApiError>;

    /// `POST /profiles/update-display-name`
    async fn update_display_name(&self, user: &str, display_name: &str) -> Result<(), ApiError>;

    /// `POST /profiles/delete-memory`
    async fn delete_memory(&self, user: &str, memory_date: &str) -> Result<(), ApiError>;

    /// `POST /profiles/rename`
    async fn rename_profile(&self, old_name: &str, new_name: &str) -> Result<(), ApiError>;

    /// `DELETE /profiles/<id>`
    async fn delete_profile(&self, id: &str) -> Result<(), ApiError>;

    /// `POST /save` with a partial key/value body.
    async fn save_settings(&self, settings: &SaveSettingsRequest) -> Result<(), ApiError>;

    /// `GET /service/<action>`
    async fn control_service(&self, action: ServiceAction) -> Result<(), ApiError>;
}
