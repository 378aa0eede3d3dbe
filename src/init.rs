//! Initialization helpers for the application startup.

use crate::config::LoggingConfig;

/// Sets up the tracing subscriber with the configured filter.
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr
/// so that subnet dumps on stdout stay clean.
pub fn setup_logging(config: &LoggingConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.level.clone();

        // Keep the HTTP stack quiet unless explicitly enabled
        for noisy in ["hyper", "hyper_util", "reqwest", "rustls"] {
            if !filter.contains(noisy) {
                filter.push_str(&format!(",{}=warn", noisy));
            }
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    // A subscriber may already be installed (tests, embedding apps).
    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        tracing::debug!("Keeping the existing tracing subscriber: {}", e);
    }
}
