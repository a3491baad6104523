use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Builds the JSON subscriber. `RUST_LOG` wins over `default_filter` when set.
pub fn get_subscriber<Sink>(
    default_filter: &str,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(sink)
        .with_target(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
}

/// Installs `subscriber` globally. Records emitted through the `log` facade
/// are forwarded as well. Returns false if a subscriber was already set.
pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync + 'static) -> bool {
    subscriber.try_init().is_ok()
}

/// JSON logs to stdout at `info` unless `RUST_LOG` says otherwise.
pub fn init_telemetry() {
    init_subscriber(get_subscriber("info", std::io::stdout));
}
