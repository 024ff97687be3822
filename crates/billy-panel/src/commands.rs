use clap::ArgMatches;
use tracing::{error, info};

mod helpers;
mod refresh;
mod service;
mod session;
mod status;
mod watch;

pub(crate) type CommandResult = Result<(), Box<dyn std::error::Error>>;

pub fn run_command(matches: &ArgMatches) -> CommandResult {
    let command = matches.subcommand_name().unwrap_or_default();
    info!(event = "cli.command_started", command = command);

    let config = helpers::load_config(matches)?;
    let controller = helpers::connect(&config)?;

    // One cooperative context: the controller, poller and listener all share it.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(async {
        match matches.subcommand() {
            Some(("status", sub_matches)) => {
                status::handle_status_command(&controller, &config, sub_matches).await
            }
            Some(("watch", _)) => watch::handle_watch_command(&controller, &config).await,
            Some(("refresh", sub_matches)) => {
                refresh::handle_refresh_command(&controller, sub_matches).await
            }
            Some(("user", sub_matches)) => {
                session::handle_user_command(&controller, sub_matches).await
            }
            Some(("memory", sub_matches)) => {
                session::handle_memory_command(&controller, sub_matches).await
            }
            Some(("persona", sub_matches)) => {
                session::handle_persona_command(&controller, sub_matches).await
            }
            Some(("service", sub_matches)) => {
                service::handle_service_command(&controller, sub_matches).await
            }
            _ => {
                error!(event = "cli.command_unknown", command = command);
                Err("Unknown command".into())
            }
        }
    });

    match &result {
        Ok(()) => info!(event = "cli.command_completed", command = command),
        Err(e) => error!(event = "cli.command_failed", command = command, error = %e),
    }
    result
}
