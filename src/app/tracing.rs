use crate::sink::CONSOLE_TARGET;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber that also backs the Kaho console sink.
///
/// JSON lines unless `RUST_LOG_FORMAT` is set to something other than `json`.
pub fn init_tracing() {
    let use_json = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(true);

    let filter = env_filter(EnvFilter::from_default_env());

    if use_json {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(true),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .init();
    }
}

/// Process-wide filter: `info` by default, quiet sqlx, and every console
/// sink entry regardless of its severity.
pub fn env_filter(base: EnvFilter) -> EnvFilter {
    base.add_directive(Level::INFO.into())
        .add_directive("sqlx=warn".parse().unwrap_or_else(|_| Level::WARN.into()))
        .add_directive(console_directive())
}

fn console_directive() -> Directive {
    format!("{CONSOLE_TARGET}=trace")
        .parse()
        .unwrap_or_else(|_| LevelFilter::TRACE.into())
}
