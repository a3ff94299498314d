//! Error log setup.
//!
//! Events are appended to a plain text file, one per line:
//! `2024-03-01 08:15:02 - ERROR - ODIS is not running`.

use std::{
    fmt,
    fs::OpenOptions,
    io,
    path::Path,
    sync::Mutex,
};

use chrono::Local;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, MakeWriter},
    registry::LookupSpan,
    EnvFilter,
};

pub const LOG_FILENAME: &str = "errors.log";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// `<local time> - <LEVEL> - <message and fields>`
#[derive(Debug, Default, Clone, Copy)]
pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - {} - ",
            Local::now().format(TIMESTAMP_FORMAT),
            event.metadata().level()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Maps `-v` repetitions to the default level; `RUST_LOG` still wins.
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()))
}

fn subscriber<W>(writer: W, default_level: Level) -> impl Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .event_format(LineFormat)
        .with_writer(writer)
        .with_env_filter(env_filter(default_level))
        .finish()
}

/// Installs the global subscriber writing to `path` in append mode.
pub fn init(path: &Path, default_level: Level) -> io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing::subscriber::set_global_default(subscriber(Mutex::new(file), default_level))
        .map_err(io::Error::other)
}
