use billy_sync::SessionController;
use clap::ArgMatches;
use tracing::info;

use super::CommandResult;
use super::helpers::{finish, load_session, required_arg};

pub(crate) async fn handle_user_command(
    controller: &SessionController,
    matches: &ArgMatches,
) -> CommandResult {
    let mut notes = controller.subscribe_notifications();
    load_session(controller).await?;

    let result = match matches.subcommand() {
        Some(("switch", m)) => controller.switch_user(required_arg(m, "id")?).await,
        Some(("guest", _)) => controller.switch_to_guest().await,
        Some(("default", m)) => controller.set_default_user(required_arg(m, "id")?).await,
        Some(("rename", m)) => {
            controller
                .update_display_name(required_arg(m, "display-name")?)
                .await
        }
        Some(("rename-profile", m)) => {
            controller
                .rename_profile(required_arg(m, "old-name")?, required_arg(m, "new-name")?)
                .await
        }
        Some(("delete", m)) => controller.delete_profile(required_arg(m, "id")?).await,
        _ => return Err("Unknown user command".into()),
    };

    info!(event = "cli.user_completed", ok = result.is_ok());
    finish(&mut notes, result)
}

pub(crate) async fn handle_memory_command(
    controller: &SessionController,
    matches: &ArgMatches,
) -> CommandResult {
    let Some(("delete", m)) = matches.subcommand() else {
        return Err("Unknown memory command".into());
    };
    let date = required_arg(m, "date")?;

    let mut notes = controller.subscribe_notifications();
    load_session(controller).await?;
    let result = controller.delete_memory(date).await;
    finish(&mut notes, result)
}

pub(crate) async fn handle_persona_command(
    controller: &SessionController,
    matches: &ArgMatches,
) -> CommandResult {
    let Some(("switch", m)) = matches.subcommand() else {
        return Err("Unknown persona command".into());
    };
    let name = required_arg(m, "name")?;

    let mut notes = controller.subscribe_notifications();
    load_session(controller).await?;
    let result = controller.switch_persona(name).await;
    finish(&mut notes, result)
}
