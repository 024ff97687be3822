use std::sync::Arc;

use billy_config::PanelConfig;
use billy_protocol::UserRef;
use billy_sync::{SessionController, SessionEvent, StatusChange};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::CommandResult;
use super::helpers::{load_session, print_notification};
use crate::color;

pub(crate) async fn handle_watch_command(
    controller: &Arc<SessionController>,
    config: &PanelConfig,
) -> CommandResult {
    info!(event = "cli.watch_started", device = config.device.base_url());

    let mut events = controller.subscribe_events();
    let mut notes = controller.subscribe_notifications();
    let mut changes = controller.poller().subscribe();
    load_session(controller).await?;

    let view = controller.view();
    println!(
        "{} {} as {}, {}",
        color::bold("Watching"),
        config.device.base_url(),
        color::accent(&view.identity.label),
        color::service_state(view.service_state)
    );
    println!("{}", color::muted("Press Ctrl-C to stop."));

    // Listener first, so no change published by the first tick is missed.
    let cancel = CancellationToken::new();
    let listener = controller.spawn_change_listener(cancel.clone());
    controller.poller().start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            signal = &mut ctrl_c => break signal,
            Ok(change) = changes.recv() => println!("{}", describe_change(&change)),
            Ok(event) = events.recv() => println!("{}", describe_event(&event)),
            Ok(note) = notes.recv() => print_notification(&note),
        }
    };

    controller.poller().stop();
    cancel.cancel();
    let _ = listener.await;
    info!(event = "cli.watch_completed");
    result.map_err(Into::into)
}

fn user_label(user: &UserRef) -> String {
    user.id().unwrap_or("guest").to_string()
}

fn or_none(value: Option<&str>) -> String {
    value.unwrap_or("none").to_string()
}

fn describe_change(change: &StatusChange) -> String {
    let line = match change {
        StatusChange::ServiceState { previous, current } => format!(
            "service {} -> {}",
            previous,
            color::service_state(*current)
        ),
        StatusChange::CurrentUser { previous, current } => format!(
            "user {} -> {}",
            user_label(previous),
            color::accent(&user_label(current))
        ),
        StatusChange::CurrentPersona { previous, current } => format!(
            "persona {} -> {}",
            or_none(previous.as_deref()),
            color::accent(&or_none(current.as_deref()))
        ),
        StatusChange::CurrentPersonality { .. } => "personality updated".to_string(),
        StatusChange::ProfileList { current, .. } => {
            format!("profiles now {}", current.join(", "))
        }
        StatusChange::PersonaList { current, .. } => {
            format!("personas now {}", current.join(", "))
        }
        StatusChange::ConfigVersion { current, .. } => {
            format!("config changed ({})", or_none(current.as_deref()))
        }
        StatusChange::MemoryCount { previous, current } => {
            format!("memories {} -> {}", previous, current)
        }
    };
    format!("{} {}", color::muted("device:"), line)
}

fn describe_event(event: &SessionEvent) -> String {
    let line = match event {
        SessionEvent::UserChanged { user } => format!("active user {}", user_label(user)),
        SessionEvent::PersonaChanged { persona } => {
            format!("persona {}", or_none(persona.as_deref()))
        }
        SessionEvent::ProfilesChanged { profiles } => {
            format!("profiles {}", profiles.join(", "))
        }
        SessionEvent::DefaultUserChanged { default_user } => {
            format!("default user {}", default_user.as_deref().unwrap_or("guest"))
        }
    };
    format!("{} {}", color::muted("panel:"), line)
}
