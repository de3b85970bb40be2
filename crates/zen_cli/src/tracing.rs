use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;

/// Name of the environment variable which overrides the log filter.
pub(crate) const ZEN_LOG_ENVKEY: &str = "ZEN_LOG";

/// Gets the default filter directive for the given verbosity.
fn default_directive(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub(crate) fn register_console_tracer(verbosity: u8) {
    let format = tracing_subscriber::fmt::format()
        .compact()
        .with_file(verbosity >= 2)
        .with_line_number(verbosity >= 2)
        .with_thread_ids(false)
        .with_target(false);

    let span_events = if verbosity >= 2 { FmtSpan::ACTIVE } else { FmtSpan::NONE };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_writer(std::io::stderr)
        .with_span_events(span_events);

    let filter_layer = EnvFilter::try_from_env(ZEN_LOG_ENVKEY).unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(default_directive(verbosity).into())
            .parse_lossy("")
    });

    let tracer = tracing_subscriber::registry().with(filter_layer).with(fmt_layer);

    if let Err(err) = tracing::subscriber::set_global_default(tracer) {
        zen_cli_tools::warn!("could not register tracer: {err}");
    }
}
