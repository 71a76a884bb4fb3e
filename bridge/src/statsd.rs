use crate::config::MetricsConfig;
use metrics_exporter_statsd::StatsdBuilder;

const METRICS_PREFIX: &str = "bridge";

#[derive(thiserror::Error, Debug)]
pub enum StatsdInitError {
    #[error("could not build statsd recorder: {0}")]
    Build(#[from] metrics_exporter_statsd::StatsdError),
    #[error("a global metrics recorder is already installed")]
    AlreadyInstalled,
}

/// Sends every metric to statsd under the `bridge.` prefix.
///
/// Without this the `metrics` macros are no-ops.
pub fn init(config: &MetricsConfig) -> Result<(), StatsdInitError> {
    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(METRICS_PREFIX))?;

    metrics::set_global_recorder(recorder).map_err(|_| StatsdInitError::AlreadyInstalled)?;
    shared::metrics_defs::describe_all(forwarder::metrics_defs::ALL_METRICS);

    tracing::info!(
        host = %config.statsd_host,
        port = config.statsd_port,
        "Sending metrics to statsd"
    );
    Ok(())
}
