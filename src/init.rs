use crate::trace::TraceContextLayer;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the global `tracing` subscriber installed by
/// [`init_tracing_with_config`].
///
/// **Fields**
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top of [`TraceContextLayer`] so `tracing` events are also
///   printed to the console.
#[derive(Clone, Debug, Default)]
pub struct TracingConfig {
    pub enable_stdout: bool,
}

/// Install a [`Registry`] with [`TraceContextLayer`] as the global default
/// subscriber, so that every `tracing::Span` in the process carries trace
/// and span identifiers the logger can read.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already set.
pub fn init_tracing_with_config(config: TracingConfig) -> Result<(), SetGlobalDefaultError> {
    // The two subscriber shapes have different types, so each branch
    // installs its own.
    if config.enable_stdout {
        let subscriber = Registry::default().with(TraceContextLayer::new()).with(tracing_subscriber::fmt::layer());
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(TraceContextLayer::new());
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Equivalent to [`init_tracing_with_config`] with
/// [`TracingConfig::default`].
pub fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(TracingConfig::default())
}
