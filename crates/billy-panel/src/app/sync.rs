use clap::{Arg, ArgAction, Command};

pub fn status_command() -> Command {
    Command::new("status")
        .about("Show the active user, persona, profiles and service state")
        .arg(
            Arg::new("json")
                .long("json")
                .help("Output in JSON format")
                .action(ArgAction::SetTrue),
        )
}

pub fn watch_command() -> Command {
    Command::new("watch").about("Follow device changes until interrupted (Ctrl-C)")
}

pub fn refresh_command() -> Command {
    Command::new("refresh")
        .about("Reload configuration and status from the device")
        .arg(
            Arg::new("force")
                .long("force")
                .help("Bypass the status cache")
                .action(ArgAction::SetTrue),
        )
}

pub fn service_command() -> Command {
    Command::new("service")
        .about("Start, stop or restart the assistant service")
        .arg(
            Arg::new("action")
                .help("Lifecycle action")
                .required(true)
                .index(1)
                .value_parser(["start", "stop", "restart"]),
        )
}
