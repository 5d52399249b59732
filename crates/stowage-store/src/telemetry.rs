use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Default filter when `RUST_LOG` is unset. `stowage` prefixes every workspace crate.
const DEFAULT_FILTER: &str = "stowage=debug,async_nats=info";

/// Install the global tracing subscriber.
///
/// Console output uses the compact format without timestamps. Production runs add the
/// target so events can be traced back to their crate.
pub fn init_telemetry(production: bool) -> Result<(), Box<dyn std::error::Error>> {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(production)
            .without_time(),
    );

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(console_fmt)
        .try_init()?;

    tracing::debug!(production, "Tracing initialized");
    Ok(())
}
