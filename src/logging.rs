use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging on stderr so stdout carries only the report.
///
/// `RUST_LOG` overrides the default `regimen_analysis=info` filter.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("regimen_analysis=info"));

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init();
}
