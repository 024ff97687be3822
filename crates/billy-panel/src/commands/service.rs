use billy_protocol::ServiceAction;
use billy_sync::SessionController;
use clap::ArgMatches;

use super::CommandResult;
use super::helpers::{finish, required_arg};

pub(crate) async fn handle_service_command(
    controller: &SessionController,
    matches: &ArgMatches,
) -> CommandResult {
    let action: ServiceAction = required_arg(matches, "action")?.parse()?;

    let mut notes = controller.subscribe_notifications();
    let result = controller.control_service(action).await;
    finish(&mut notes, result)
}
