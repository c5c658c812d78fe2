use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter, e.g. `DEBTPLAN_LOG=debtplan=debug`.
pub const LOG_ENV_VAR: &str = "DEBTPLAN_LOG";
const DEFAULT_FILTER: &str = "debtplan=info";

/// Installs a stderr subscriber so stdout stays free for command output.
///
/// The filter comes from `DEBTPLAN_LOG`, then `RUST_LOG`, then defaults to info.
/// Calling this twice is harmless; the second call is ignored.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init();

    if installed.is_ok() {
        tracing::debug!("logging initialized");
    }
}
