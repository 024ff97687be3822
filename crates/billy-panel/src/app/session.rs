use clap::{Arg, Command};

fn required(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).help(help).required(true).index(1)
}

pub fn user_command() -> Command {
    Command::new("user")
        .about("Manage the active user and profiles")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("switch")
                .about("Make a profile the active user")
                .arg(required("id", "Profile name")),
        )
        .subcommand(Command::new("guest").about("Switch to guest mode"))
        .subcommand(
            Command::new("default")
                .about("Set the profile selected on boot ('guest' for none)")
                .arg(required("id", "Profile name")),
        )
        .subcommand(
            Command::new("rename")
                .about("Change the active user's display name")
                .arg(required("display-name", "New display name")),
        )
        .subcommand(
            Command::new("rename-profile")
                .about("Rename a profile, following it as active or default user")
                .arg(required("old-name", "Current profile name"))
                .arg(
                    Arg::new("new-name")
                        .help("New profile name")
                        .required(true)
                        .index(2),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a profile other than the active one")
                .arg(required("id", "Profile name")),
        )
}

pub fn memory_command() -> Command {
    Command::new("memory")
        .about("Manage the active user's memories")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("delete")
                .about("Delete one memory by its timestamp")
                .arg(required("date", "Memory timestamp as shown by 'status'")),
        )
}

pub fn persona_command() -> Command {
    Command::new("persona")
        .about("Change the persona")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("switch")
                .about("Switch persona, restarting the service when it is running")
                .arg(required("name", "Persona name")),
        )
}
