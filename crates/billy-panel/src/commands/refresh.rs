use billy_sync::{ReloadOutcome, SessionController};
use clap::ArgMatches;

use super::CommandResult;
use super::helpers::report_error;
use crate::color;

pub(crate) async fn handle_refresh_command(
    controller: &SessionController,
    matches: &ArgMatches,
) -> CommandResult {
    let force = matches.get_flag("force");
    match controller.refresh(force).await {
        Ok(ReloadOutcome::Executed(())) => {
            let view = controller.view();
            println!(
                "{} {} profiles, {} personas",
                color::success("Refreshed:"),
                view.profiles.len(),
                view.personas.options.len()
            );
            Ok(())
        }
        Ok(ReloadOutcome::Skipped) => {
            println!("{}", color::muted("Refresh skipped (one just ran)"));
            Ok(())
        }
        Err(e) => {
            report_error(&e);
            Err(e.into())
        }
    }
}
