use std::env;

use tracing_subscriber::EnvFilter;

/// Full filter directive, e.g. `QUICKSCRIPT_LOG=quickscript=trace`
pub const LOG_ENV: &str = "QUICKSCRIPT_LOG";

/// Install the stderr subscriber. `debug` raises the default level from
/// `warn` to `debug`; `QUICKSCRIPT_LOG` wins over both.
pub fn init(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = env::var(LOG_ENV)
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .try_init();
}
