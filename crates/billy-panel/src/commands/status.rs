use billy_config::PanelConfig;
use billy_sync::{PanelView, SessionController};
use chrono::{DateTime, Utc};
use clap::ArgMatches;
use serde::Serialize;
use tracing::info;

use super::CommandResult;
use super::helpers::load_session;
use crate::color;

#[derive(Serialize)]
struct StatusReport<'a> {
    device: &'a str,
    #[serde(flatten)]
    view: &'a PanelView,
    memory_count: Option<u64>,
    config_version: Option<&'a str>,
    fetched_at: Option<DateTime<Utc>>,
}

pub(crate) async fn handle_status_command(
    controller: &SessionController,
    config: &PanelConfig,
    matches: &ArgMatches,
) -> CommandResult {
    let json_output = matches.get_flag("json");
    info!(event = "cli.status_started", json_output = json_output);

    load_session(controller).await?;
    let view = controller.view();
    let status = controller.status();

    if json_output {
        let report = StatusReport {
            device: config.device.base_url(),
            view: &view,
            memory_count: status.as_ref().map(|s| s.memory_count),
            config_version: status.as_ref().and_then(|s| s.config_version.as_deref()),
            fetched_at: status.as_ref().map(|s| s.fetched_at()),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        info!(event = "cli.status_completed");
        return Ok(());
    }

    println!(
        "{} {}",
        color::bold("Billy"),
        color::muted(&format!("@ {}", config.device.base_url()))
    );
    println!("  Service:   {}", color::service_state(view.service_state));

    let mut identity = color::accent(&view.identity.label);
    if let Some(ref id) = view.identity.user_id
        && *id != view.identity.label
    {
        identity.push_str(&color::muted(&format!(" ({})", id)));
    }
    if view.identity.is_default {
        identity.push_str(&color::muted(" [default]"));
    }
    println!("  User:      {}", identity);
    println!(
        "  Persona:   {}",
        view.personas
            .selected
            .as_deref()
            .map(color::accent)
            .unwrap_or_else(|| color::muted("none"))
    );

    let profiles: Vec<String> = view
        .profiles
        .iter()
        .map(|row| {
            let mut entry = if row.is_current {
                format!("* {}", color::accent(&row.label))
            } else {
                row.label.clone()
            };
            if row.is_default {
                entry.push_str(&color::muted(" (default)"));
            }
            entry
        })
        .collect();
    println!("  Profiles:  {}", profiles.join(", "));
    println!("  Personas:  {}", view.personas.options.join(", "));

    if view.identity.user_id.is_some() {
        println!("  Memories:  {}", view.memories.len());
        for memory in &view.memories {
            println!("    {}  {}", color::muted(&memory.date), memory.memory);
        }
    }

    info!(event = "cli.status_completed");
    Ok(())
}
