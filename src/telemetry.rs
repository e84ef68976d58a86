use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

// Initialize tracing-subscriber with an env-filtered stderr layer.
// Metrics/trace exporters are an external concern; pipeline lifecycle
// events reach observability tooling through `pipeline::UnitEvent`.
pub fn init_tracing_subscriber() {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_default_env());

    tracing_subscriber::registry().with(console_layer).init();
}
