use clap::{Arg, ArgAction, Command};

pub fn root_command() -> Command {
    Command::new("billy-panel")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Control panel for the Billy device")
        .long_about("billy-panel talks to the configuration server running on a Billy device. It shows the active user, persona and service state, switches profiles and personas, and can watch the device for changes made elsewhere.")
        .arg(
            Arg::new("device")
                .long("device")
                .help("Device base URL (overrides panel.toml and BILLY_DEVICE_URL)")
                .value_name("URL")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
}
