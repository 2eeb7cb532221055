use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Registry printing every `#[tracing::instrument]` span, with its busy/idle time, once it closes
fn span_subscriber<W>(level: Level, make_writer: W) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::from_level(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(make_writer)
                .with_span_events(FmtSpan::CLOSE),
        )
}

// Log records still go through env_logger, only spans are handled here
pub fn init_tracing_subscriber(level: Level) {
    span_subscriber(level, std::io::stderr).init();
}
