mod targets;

use crate::config::{LogConfig, LogFormat, LogLevel};
use std::sync::Once;
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::FmtSubscriber;

pub use targets::*;

static INIT: Once = Once::new();

type Subscriber = Box<dyn tracing::Subscriber + Send + Sync>;

/// Installs a global `fmt` subscriber writing to stderr. Only the first call has any effect.
///
/// Nothing in this crate needs a subscriber, so embedding applications that already own the
/// global subscriber can skip this entirely.
pub fn init(config: &LogConfig) {
    INIT.call_once(|| {
        // Fails only when the host application already installed a global subscriber
        if tracing::subscriber::set_global_default(subscriber(config, std::io::stderr)).is_err() {
            tracing::warn!(target: CONFIG, "Global tracing subscriber was already set");
        }
    });
}

/// Builds the subscriber described by `config` over any writer.
pub fn subscriber<W>(config: &LogConfig, writer: W) -> Subscriber
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(config))
        .with_ansi(false)
        .with_writer(writer);

    // Any target at debug or finer switches on source locations
    let builder = if config.max_level() >= LogLevel::Debug {
        builder.with_file(true).with_line_number(true)
    } else {
        builder
    };

    match config.format {
        LogFormat::Text => Box::new(builder.finish()),
        LogFormat::Structured => Box::new(builder.json().finish()),
    }
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    let filter = EnvFilter::builder().parse_lossy(config.level.to_string());

    config
        .targets
        .iter()
        .filter_map(|(target, level)| format!("{target}={level}").parse::<Directive>().ok())
        .fold(filter, EnvFilter::add_directive)
}
