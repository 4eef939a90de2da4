//! Tracing subscriber setup for hosts that do not install their own.
//!
//! The bridge only emits `tracing` events. A host embedding it may call
//! [`try_init_from_env`] once at load time to get formatted output on stderr.
//! Both initialisers are idempotent: if a global subscriber already exists the
//! call does nothing and returns `false`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::BridgeConfig;

/// Environment variable holding the filter directive.
pub const LOG_ENV_VAR: &str = "HUDBRIDGE_LOG";

/// Filter used when neither the environment nor configuration names one.
pub const DEFAULT_FILTER: &str = "info";

/// Install a formatting subscriber with an explicit filter directive.
///
/// Falls back to [`DEFAULT_FILTER`] if `directive` does not parse.
pub fn init(directive: &str) -> bool {
    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Install a formatting subscriber filtered by `HUDBRIDGE_LOG`.
pub fn try_init_from_env() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Install a formatting subscriber for `config`.
///
/// `HUDBRIDGE_LOG` wins over the configured `log_filter`, which wins over
/// [`DEFAULT_FILTER`].
pub fn init_from_config(config: &BridgeConfig) -> bool {
    if std::env::var_os(LOG_ENV_VAR).is_some() {
        return try_init_from_env();
    }
    init(config.log_filter.as_deref().unwrap_or(DEFAULT_FILTER))
}

fn install(filter: EnvFilter) -> bool {
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_initialisation_is_a_no_op() {
        // Whichever test installs first wins; every later call must report false.
        let _ = init("hudbridge=debug");
        assert!(!try_init_from_env());
        assert!(!init("not a [valid directive"));
        assert!(!init_from_config(&BridgeConfig::default()));
    }
}
