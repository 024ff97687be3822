use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "billy=info";
const QUIET_FILTER: &str = "billy=warn";

/// Install the global JSON subscriber on stderr.
///
/// `quiet` lowers the default level to warnings so that command output on
/// stdout stays readable. `RUST_LOG` always wins. Calling this twice is a
/// no-op.
pub fn init_logging(quiet: bool) {
    let default = if quiet { QUIET_FILTER } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
