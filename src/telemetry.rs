use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Build the structured (JSON) subscriber.
///
/// `RUST_LOG` takes precedence; `env_filter` is the fallback level.
/// Output goes to `sink` so tests can silence it.
pub fn get_subscriber<Sink>(env_filter: String, sink: Sink) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(sink)
        .json();

    Registry::default().with(env_filter).with(formatting_layer)
}

/// Install `subscriber` as the process-wide default. Call once.
pub fn init_subscriber(
    subscriber: impl Subscriber + Send + Sync,
) -> Result<(), SetGlobalDefaultError> {
    set_global_default(subscriber)
}
