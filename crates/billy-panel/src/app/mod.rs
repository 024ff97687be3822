mod global;
mod session;
mod sync;


use clap::Command;

pub fn build_cli() -> Command {
    global::root_command()
        .subcommand(sync::status_command())
        .subcommand(sync::watch_command())
        .subcommand(sync::refresh_command())
        .subcommand(session::user_command())
        .subcommand(session::memory_command())
        .subcommand(session::persona_command())
        .subcommand(sync::service_command())
}
