//! Structured logging setup.
//!
//! Logs are emitted as Bunyan-formatted JSON lines. Span fields are carried
//! into every event recorded inside the span, so `user.id` and request
//! metadata appear on nested log lines too.

pub mod middleware;

use tracing::{Subscriber, subscriber::set_global_default};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Registry, fmt::MakeWriter, layer::SubscriberExt};

pub use middleware::RequestLoggingMiddleware;

/// Builds the application's subscriber.
///
/// `env_filter` is used when `RUST_LOG` is not set. `sink` receives the
/// formatted lines, e.g. `std::io::stdout` or `std::io::sink` in tests.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Installs `subscriber` globally and forwards `log` records to it.
///
/// # Errors
///
/// Fails when a global logger or subscriber was already installed.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) -> anyhow::Result<()> {
    LogTracer::init()?;
    set_global_default(subscriber)?;
    Ok(())
}
