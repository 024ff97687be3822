//! In-memory device for unit tests.
//!
//! Mutations update the scripted config and status the way the real device
//! would, so reconciliation after a mutation sees the new state. Fetches read
//! the device when they start, so a delayed fetch returns what the device
//! held at that moment.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use billy_protocol::{
    DEFAULT_USER_KEY, MemoryRecord, PersonaInfo, SaveSettingsRequest, ServiceAction, ServiceState,
    UserProfile, UserRef, is_guest_name, same_id,
};

use crate::api::DeviceApi;
use crate::errors::ApiError;
use crate::snapshot::{ConfigSnapshot, StatusSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ApiCall {
    FetchConfig,
    FetchStatus,
    SetCurrentUser(String),
    ClearCurrentUser,
    SetPreferredPersona(String),
    SetLivePersona(String),
    UpdateDisplayName { user: String, display_name: String },
    DeleteMemory { user: String, memory_date: String },
    RenameProfile { old_name: String, new_name: String },
    DeleteProfile(String),
    SaveSettings(SaveSettingsRequest),
    ControlService(ServiceAction),
}

impl ApiCall {
    fn name(&self) -> &'static str {
        match self {
            ApiCall::FetchConfig => "fetch_config",
            ApiCall::FetchStatus => "fetch_status",
            ApiCall::SetCurrentUser(_) => "set_current_user",
            ApiCall::ClearCurrentUser => "clear_current_user",
            ApiCall::SetPreferredPersona(_) => "set_preferred_persona",
            ApiCall::SetLivePersona(_) => "set_live_persona",
            ApiCall::UpdateDisplayName { .. } => "update_display_name",
            ApiCall::DeleteMemory { .. } => "delete_memory",
            ApiCall::RenameProfile { .. } => "rename_profile",
            ApiCall::DeleteProfile(_) => "delete_profile",
            ApiCall::SaveSettings(_) => "save_settings",
            ApiCall::ControlService(_) => "control_service",
        }
    }
}

struct Device {
    config: ConfigSnapshot,
    status: StatusSnapshot,
    failures: HashMap<&'static str, ApiError>,
    config_delay: Duration,
    status_delay: Duration,
}

pub(crate) struct ScriptedDeviceApi {
    device: Mutex<Device>,
    calls: Mutex<Vec<ApiCall>>,
}

pub(crate) fn persona(name: &str) -> PersonaInfo {
    PersonaInfo {
        name: name.to_string(),
        description: format!("{name} persona"),
    }
}

pub(crate) fn profile(id: &str, preferred_persona: Option<&str>) -> UserProfile {
    UserProfile {
        id: id.to_string(),
        display_name: None,
        preferred_persona: preferred_persona.map(str::to_string),
        memories: Vec::new(),
    }
}

pub(crate) fn memory(date: &str, text: &str) -> MemoryRecord {
    MemoryRecord {
        date: date.to_string(),
        memory: text.to_string(),
        importance: None,
        category: None,
    }
}

impl ScriptedDeviceApi {
    /// Guest device with profiles `alice` (prefers `cheerful`) and `bob`,
    /// personas `default` and `cheerful`, service active.
    pub(crate) fn new() -> Self {
        let config = ConfigSnapshot {
            current_user: UserRef::None,
            available_profiles: vec![profile("alice", Some("cheerful")), profile("bob", None)],
            available_personas: vec![persona("default"), persona("cheerful")],
            default_user: None,
        };
        let status = StatusSnapshot {
            service_state: ServiceState::Active,
            current_user: UserRef::None,
            current_persona: Some("default".to_string()),
            current_personality: None,
            available_profiles: vec!["alice".to_string(), "bob".to_string()],
            available_personas: vec!["default".to_string(), "cheerful".to_string()],
            config_version: Some("v1".to_string()),
            memory_count: 0,
        };
        Self {
            device: Mutex::new(Device {
                config,
                status,
                failures: HashMap::new(),
                config_delay: Duration::ZERO,
                status_delay: Duration::ZERO,
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn update_config(&self, f: impl FnOnce(&mut ConfigSnapshot)) {
        f(&mut self.device.lock().unwrap().config);
    }

    pub(crate) fn update_status(&self, f: impl FnOnce(&mut StatusSnapshot)) {
        f(&mut self.device.lock().unwrap().status);
    }

    /// Make `id` the device's current user, as if switched on the device itself.
    pub(crate) fn load(&self, id: &str) {
        load_user(&mut self.device.lock().unwrap(), id);
    }

    /// Make every call named `operation` fail with `error`.
    pub(crate) fn fail(&self, operation: &'static str, error: ApiError) {
        self.device
            .lock()
            .unwrap()
            .failures
            .insert(operation, error);
    }

    pub(crate) fn recover(&self, operation: &'static str) {
        self.device.lock().unwrap().failures.remove(operation);
    }

    pub(crate) fn set_config_delay(&self, delay: Duration) {
        self.device.lock().unwrap().config_delay = delay;
    }

    pub(crate) fn set_status_delay(&self, delay: Duration) {
        self.device.lock().unwrap().status_delay = delay;
    }

    pub(crate) fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, predicate: impl Fn(&ApiCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub(crate) fn mutations(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, ApiCall::FetchConfig | ApiCall::FetchStatus))
            .collect()
    }

    fn record(&self, call: ApiCall) -> Result<(), ApiError> {
        let name = call.name();
        self.calls.lock().unwrap().push(call);
        match self.device.lock().unwrap().failures.get(name) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn mutate(&self, call: ApiCall, apply: impl FnOnce(&mut Device)) -> Result<(), ApiError> {
        self.record(call)?;
        apply(&mut self.device.lock().unwrap());
        Ok(())
    }
}

fn load_user(device: &mut Device, id: &str) {
    let profile = device
        .config
        .available_profiles
        .iter()
        .find(|p| same_id(&p.id, id))
        .cloned();
    let user = match profile {
        Some(profile) => {
            if let Some(ref persona) = profile.preferred_persona {
                device.status.current_persona = Some(persona.clone());
            }
            device.status.memory_count = profile.memories.len() as u64;
            UserRef::Full { profile }
        }
        None => UserRef::IdOnly { id: id.to_string() },
    };
    device.config.current_user = user.clone();
    device.status.current_user = user;
}

fn current_profile_mut(device: &mut Device) -> Option<&mut UserProfile> {
    let id = device.config.current_user.id()?.to_string();
    device
        .config
        .available_profiles
        .iter_mut()
        .find(|p| same_id(&p.id, &id))
}

#[async_trait]
impl DeviceApi for ScriptedDeviceApi {
    async fn fetch_config(&self) -> Result<ConfigSnapshot, ApiError> {
        self.record(ApiCall::FetchConfig)?;
        let (config, delay) = {
            let device = self.device.lock().unwrap();
            (device.config.clone(), device.config_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(config)
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, ApiError> {
        self.record(ApiCall::FetchStatus)?;
        let (status, delay) = {
            let device = self.device.lock().unwrap();
            (device.status.clone(), device.status_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(status)
    }

    async fn set_current_user(&self, id: &str) -> Result<(), ApiError> {
        self.mutate(ApiCall::SetCurrentUser(id.to_string()), |device| {
            load_user(device, id)
        })
    }

    async fn clear_current_user(&self) -> Result<(), ApiError> {
        self.mutate(ApiCall::ClearCurrentUser, |device| {
            device.config.current_user = UserRef::None;
            device.status.current_user = UserRef::None;
        })
    }

    async fn set_preferred_persona(&self, persona: &str) -> Result<(), ApiError> {
        self.mutate(ApiCall::SetPreferredPersona(persona.to_string()), |device| {
            if let Some(profile) = current_profile_mut(device) {
                profile.preferred_persona = Some(persona.to_string());
                let id = profile.id.clone();
                load_user(device, &id);
            }
        })
    }

    async fn set_live_persona(&self, persona: &str) -> Result<(), ApiError> {
        self.mutate(ApiCall::SetLivePersona(persona.to_string()), |device| {
            device.status.current_persona = Some(persona.to_string());
        })
    }

    async fn update_display_name(&self, user: &str, display_name: &str) -> Result<(), ApiError> {
        let call = ApiCall::UpdateDisplayName {
            user: user.to_string(),
            display_name: display_name.to_string(),
        };
        self.mutate(call, |device| {
            if let Some(profile) = device
                .config
                .available_profiles
                .iter_mut()
                .find(|p| same_id(&p.id, user))
            {
                profile.display_name = Some(display_name.to_string());
                let id = profile.id.clone();
                load_user(device, &id);
            }
        })
    }

    async fn delete_memory(&self, user: &str, memory_date: &str) -> Result<(), ApiError> {
        let call = ApiCall::DeleteMemory {
            user: user.to_string(),
            memory_date: memory_date.to_string(),
        };
        self.mutate(call, |device| {
            if let Some(profile) = device
                .config
                .available_profiles
                .iter_mut()
                .find(|p| same_id(&p.id, user))
            {
                profile.memories.retain(|m| m.date != memory_date);
                let id = profile.id.clone();
                load_user(device, &id);
            }
        })
    }

    async fn rename_profile(&self, old_name: &str, new_name: &str) -> Result<(), ApiError> {
        let call = ApiCall::RenameProfile {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        };
        self.mutate(call, |device| {
            for profile in device.config.available_profiles.iter_mut() {
                if same_id(&profile.id, old_name) {
                    profile.id = new_name.to_string();
                }
            }
            for id in device.status.available_profiles.iter_mut() {
                if same_id(id, old_name) {
                    *id = new_name.to_string();
                }
            }
        })
    }

    async fn delete_profile(&self, id: &str) -> Result<(), ApiError> {
        self.mutate(ApiCall::DeleteProfile(id.to_string()), |device| {
            device
                .config
                .available_profiles
                .retain(|p| !same_id(&p.id, id));
            device.status.available_profiles.retain(|p| !same_id(p, id));
        })
    }

    async fn save_settings(&self, settings: &SaveSettingsRequest) -> Result<(), ApiError> {
        self.mutate(ApiCall::SaveSettings(settings.clone()), |device| {
            if let Some(value) = settings.0.get(DEFAULT_USER_KEY) {
                device.config.default_user =
                    (!is_guest_name(value)).then(|| value.trim().to_string());
            }
        })
    }

    async fn control_service(&self, action: ServiceAction) -> Result<(), ApiError> {
        self.mutate(ApiCall::ControlService(action), |device| {
            device.status.service_state = match action {
                ServiceAction::Start | ServiceAction::Restart => ServiceState::Active,
                ServiceAction::Stop => ServiceState::Inactive,
            };
        })
    }
}
