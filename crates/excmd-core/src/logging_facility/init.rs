//! Subscriber installation

use std::sync::Once;
use tracing_subscriber::{util::SubscriberInitExt, EnvFilter};

/// Output profile for the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// Human-readable lines, `excmd=debug` unless `RUST_LOG` says otherwise
    Development,
    /// JSON lines, `excmd=info` unless `RUST_LOG` says otherwise
    Production,
    /// Bare registry; tests install their own layer via `init_test_capture`
    Test,
}

static INIT_ONCE: Once = Once::new();

impl Profile {
    fn default_filter(&self) -> &'static str {
        match self {
            Profile::Development => "excmd=debug",
            Profile::Production => "excmd=info",
            Profile::Test => "off",
        }
    }
}

/// Install the global tracing subscriber for the given profile
///
/// Only the first call has an effect. Embedding applications that already
/// own a subscriber should not call this at all; the engine only emits
/// `tracing` events and never requires a particular subscriber.
pub fn init(profile: Profile) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(profile.default_filter()));
        let result = match profile {
            Profile::Development => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
            Profile::Production => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init(),
            Profile::Test => tracing_subscriber::registry().try_init().map_err(Into::into),
        };
        // Another subscriber was installed first (e.g. by the host application)
        if result.is_err() {
            tracing::debug!("global tracing subscriber already set");
        }
    });
}
