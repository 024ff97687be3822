use std::time::Duration;

use async_trait::async_trait;
use billy_config::DeviceConfig;
use billy_protocol::{
    ApiMessage, CurrentUserEnvelope, DeleteMemoryRequest, EnvConfig, PersonaList, ProfileAction,
    ProfileList, RawStatus, RenameProfileRequest, SaveSettingsRequest, ServiceAction,
    SetCurrentUserRequest, UpdateDisplayNameRequest,
};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::DeviceApi;
use crate::errors::ApiError;
use crate::snapshot::{ConfigSnapshot, StatusSnapshot};

/// [`DeviceApi`] over the device's HTTP configuration server.
#[derive(Debug, Clone)]
pub struct HttpDeviceApi {
    client: Client,
    base_url: Url,
}

impl HttpDeviceApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Transport {
            message: format!("invalid device URL '{}': {}", base_url, e),
        })?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport {
                message: e.to_string(),
            })?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(device: &DeviceConfig) -> Result<Self, ApiError> {
        Self::new(device.base_url(), device.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport {
                message: format!("device URL '{}' cannot take a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        Ok(self.client.request(method, self.url(segments)?))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(
            event = "sync.api.response_received",
            url = %response.url(),
            status = status.as_u16()
        );
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ApiMessage>()
            .await
            .ok()
            .and_then(|body| body.error.or(body.message));
        if status.is_client_error() {
            Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(ApiError::Server {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let response = self.send(self.request(Method::GET, segments)?).await?;
        response.json::<T>().await.map_err(|e| ApiError::Decode {
            message: format!("/{}: {}", segments.join("/"), e),
        })
    }

    async fn execute(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.send(request).await.map(|_| ())
    }
}

fn transport_error(e: reqwest::Error) -> ApiError {
    let message = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    warn!(event = "sync.api.transport_failed", error = %message);
    ApiError::Transport { message }
}

#[async_trait]
impl DeviceApi for HttpDeviceApi {
    async fn fetch_config(&self) -> Result<ConfigSnapshot, ApiError> {
        let (env, current, profiles, personas) = tokio::try_join!(
            self.get_json::<EnvConfig>(&["config"]),
            self.get_json::<CurrentUserEnvelope>(&["current-user"]),
            self.get_json::<ProfileList>(&["profiles"]),
            self.get_json::<PersonaList>(&["personas"]),
        )?;
        Ok(ConfigSnapshot::from_parts(
            &env,
            &current.user,
            profiles.profiles,
            personas.personas,
        ))
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, ApiError> {
        let raw: RawStatus = self.get_json(&["service", "status"]).await?;
        Ok(StatusSnapshot::from_raw(raw))
    }

    async fn set_current_user(&self, id: &str) -> Result<(), ApiError> {
        let body = SetCurrentUserRequest {
            name: id.to_string(),
        };
        self.execute(self.request(Method::POST, &["current-user"])?.json(&body))
            .await
    }

    async fn clear_current_user(&self) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, &["current-user"])?)
            .await
    }

    async fn set_preferred_persona(&self, persona: &str) -> Result<(), ApiError> {
        let body = ProfileAction::SwitchPersona {
            preferred_persona: persona.to_string(),
        };
        self.execute(self.request(Method::PATCH, &["current-user"])?.json(&body))
            .await
    }

    async fn set_live_persona(&self, persona: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::GET, &["persona", persona])?)
            .await
    }

    async fn update_display_name(&self, user: &str, display_name: &str) -> Result<(), ApiError> {
        let body = UpdateDisplayNameRequest {
            user: user.to_string(),
            display_name: display_name.to_string(),
        };
        self.execute(
            self.request(Method::POST, &["profiles", "update-display-name"])?
                .json(&body),
        )
        .await
    }

    async fn delete_memory(&self, user: &str, memory_date: &str) -> Result<(), ApiError> {
        let body = DeleteMemoryRequest {
            user: user.to_string(),
            memory_date: memory_date.to_string(),
        };
        self.execute(
            self.request(Method::POST, &["profiles", "delete-memory"])?
                .json(&body),
        )
        .await
    }

    async fn rename_profile(&self, old_name: &str, new_name: &str) -> Result<(), ApiError> {
        let body = RenameProfileRequest {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        };
        self.execute(self.request(Method::POST, &["profiles", "rename"])?.json(&body))
            .await
    }

    async fn delete_profile(&self, id: &str) -> Result<(), ApiError> {
        self.execute(self.request(Method::DELETE, &["profiles", id])?)
            .await
    }

    async fn save_settings(&self, settings: &SaveSettingsRequest) -> Result<(), ApiError> {
        self.execute(self.request(Method::POST, &["save"])?.json(settings))
            .await
    }

    async fn control_service(&self, action: ServiceAction) -> Result<(), ApiError> {
        self.execute(self.request(Method::GET, &["service", action.as_str()])?)
            .await
    }
}
