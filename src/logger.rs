use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "STORYCASE_LOG";

/// Install the stderr subscriber. `verbose` raises the default to `debug`.
/// Safe to call twice; the second call is a no-op.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
