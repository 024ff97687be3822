use std::sync::Arc;

use billy_config::{ConfigError, PanelConfig};
use billy_sync::{
    HttpDeviceApi, Notification, NotificationLevel, PanelError, SessionController, SessionError,
};
use clap::ArgMatches;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::warn;

use super::CommandResult;
use crate::color;

/// Load configuration, apply `--device`, and validate.
///
/// Unreadable files fall back to defaults with a warning. An invalid final
/// configuration is an error.
pub(crate) fn load_config(matches: &ArgMatches) -> Result<PanelConfig, ConfigError> {
    let mut config = match PanelConfig::load_hierarchy() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{} Could not load config: {}. Using defaults.\n\
                 Tip: Check ~/.billy/panel.toml and ./.billy/panel.toml for syntax errors.",
                color::warning("Warning:"),
                e
            );
            warn!(
                event = "cli.config.load_failed",
                error = %e,
                "Config load failed, using defaults"
            );
            PanelConfig::default()
        }
    };

    if let Some(device) = matches.get_one::<String>("device") {
        config.device.base_url = Some(device.clone());
    }

    if let Err(e) = config.validate() {
        eprintln!("{} {}", color::error("Invalid configuration:"), e);
        return Err(e);
    }
    Ok(config)
}

pub(crate) fn connect(
    config: &PanelConfig,
) -> Result<Arc<SessionController>, Box<dyn std::error::Error>> {
    let api = HttpDeviceApi::from_config(&config.device).map_err(|e| {
        eprintln!("{} {}", color::error("Cannot reach device:"), e);
        e
    })?;
    Ok(SessionController::from_config(Arc::new(api), config))
}

/// Load the device state every command starts from.
pub(crate) async fn load_session(controller: &SessionController) -> CommandResult {
    if let Err(e) = controller.refresh(true).await {
        report_error(&e);
        return Err(e.into());
    }
    Ok(())
}

pub(crate) fn print_notification(note: &Notification) {
    let line = color::notification(note.level, &note.message);
    match note.level {
        NotificationLevel::Warning | NotificationLevel::Error => eprintln!("{}", line),
        NotificationLevel::Info | NotificationLevel::Success => println!("{}", line),
    }
}

/// Print everything queued on `notes`. Returns true if any was an error.
pub(crate) fn drain_notifications(notes: &mut Receiver<Notification>) -> bool {
    let mut saw_error = false;
    loop {
        match notes.try_recv() {
            Ok(note) => {
                saw_error |= note.level == NotificationLevel::Error;
                print_notification(&note);
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
    saw_error
}

pub(crate) fn report_error(e: &SessionError) {
    let hint = if e.is_user_error() {
        String::new()
    } else {
        format!(" {}", color::muted(&format!("[{}]", e.error_code())))
    };
    eprintln!("{} {}{}", color::error("Error:"), e, hint);
}

/// Print the operation's notifications, then turn its result into a command
/// result. Failures the controller did not already announce are printed here.
pub(crate) fn finish(
    notes: &mut Receiver<Notification>,
    result: Result<(), SessionError>,
) -> CommandResult {
    let announced = drain_notifications(notes);
    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            if !announced {
                report_error(&e);
            }
            Err(e.into())
        }
    }
}

pub(crate) fn required_arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, String> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("{} argument is required", name))
}
