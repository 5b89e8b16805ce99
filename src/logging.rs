// Logging seam for the request pipeline
use serde_json::Value;

/// Severity-split log sink. The request path never requires a sink: every
/// call site takes `Option<&dyn Logger>` and tolerates `None`.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str, detail: Value);
    fn info(&self, message: &str, detail: Value);
    fn error(&self, message: &str, detail: Value);
    /// Unexpected faults only; recoverable client errors stay at `error`.
    fn fatal(&self, message: &str, detail: Value);
}

/// Forwards to the `tracing` macros. Fatal maps to `error!` with a marker
/// field since `tracing` has no level above it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str, detail: Value) {
        tracing::debug!(detail = %detail, "{message}");
    }

    fn info(&self, message: &str, detail: Value) {
        tracing::info!(detail = %detail, "{message}");
    }

    fn error(&self, message: &str, detail: Value) {
        tracing::error!(detail = %detail, "{message}");
    }

    fn fatal(&self, message: &str, detail: Value) {
        tracing::error!(fatal = true, detail = %detail, "{message}");
    }
}

/// Install the global `tracing` subscriber, honoring `RUST_LOG`. Call once
/// at startup before registering handlers.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str, _detail: Value) {}
    fn info(&self, _message: &str, _detail: Value) {}
    fn error(&self, _message: &str, _detail: Value) {}
    fn fatal(&self, _message: &str, _detail: Value) {}
}
