//! # Telemetry
//!
//! Subscriber setup plus the `tracing`-backed error-telemetry and analytics
//! sinks used when no external service is wired in.

use std::sync::Mutex;

use tracing::{debug, info, level_filters::LevelFilter};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::services::{Analytics, ErrorTelemetry, IdentifyProperties};

/// Target used for every analytics record.
pub const ANALYTICS_TARGET: &str = "clipper::analytics";

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
///
/// Logs go to stderr so command output stays clean. A second call is a no-op.
pub fn init_tracing(log_level: &str) {
    let fallback = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::INFO);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::builder()
                .with_default_directive(fallback.into())
                .from_env_lossy()
        }))
        .try_init()
        .ok();
}

/// Crash-reporting sink that tags log output with the current identity.
#[derive(Debug, Default)]
pub struct TracingErrorTelemetry {
    identity: Mutex<Option<(String, String)>>,
}

impl TracingErrorTelemetry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(id, username)` currently attached to error reports.
    #[must_use]
    pub fn identity(&self) -> Option<(String, String)> {
        self.identity.lock().ok().and_then(|guard| guard.clone())
    }
}

impl ErrorTelemetry for TracingErrorTelemetry {
    fn set_user(&self, id: &str, username: &str) {
        if let Ok(mut guard) = self.identity.lock() {
            *guard = Some((id.to_string(), username.to_string()));
        }
        debug!(user_id = id, username, "error telemetry identity set");
    }

    fn clear_user(&self) {
        if let Ok(mut guard) = self.identity.lock() {
            *guard = None;
        }
        debug!("error telemetry identity cleared");
    }
}

/// Analytics sink that writes structured records and counts tracked events.
#[derive(Debug, Default)]
pub struct TracingAnalytics;

impl Analytics for TracingAnalytics {
    fn identify_user(&self, id: &str, properties: &IdentifyProperties) {
        let traits = serde_json::to_string(properties).unwrap_or_default();
        info!(target: ANALYTICS_TARGET, user_id = id, %traits, "identify");
    }

    fn reset_user(&self) {
        info!(target: ANALYTICS_TARGET, "reset");
    }

    fn track_event(&self, event_name: &str, properties: serde_json::Value) {
        metrics::counter!(
            "clipper_analytics_events_total",
            "event" => event_name.to_string()
        )
        .increment(1);
        info!(target: ANALYTICS_TARGET, event = event_name, %properties, "track");
    }
}
