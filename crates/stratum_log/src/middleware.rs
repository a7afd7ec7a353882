//! Log interception middleware.
//!
//! [`Middleware`] takes over the output of a [`SharedSink`], parses every
//! write into a [`LogRecord`] and forwards it to a [`Logger`]. The output
//! that was active at install time is put back when the middleware is
//! closed or dropped.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{LogError, LogResult};
use crate::logger::{Logger, StdLogger};
use crate::record::{split_records, LogRecord, RecordForm};
use crate::reentry::ReentryGuard;
use crate::sink::SharedSink;

/// Marker prepended to trace-level messages, which are sent as debug.
pub const TRACE_MARKER: &str = "[LEVEL 2]";
/// Annotation for labels outside the known set.
pub const UNKNOWN_LABEL_MARKER: &str = "(Unknown Log Label)";
/// Prefix for writes that matched no grammar rule.
pub const UNPARSED_PREFIX: &str = ">>";

/// How many records a single write may produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Only the first match in a write is dispatched. A write carrying
    /// several log lines is reported as one record.
    #[default]
    FirstMatch,
    /// Every timestamped line start opens a new record.
    PerRecord,
}

struct DispatchState {
    logger: Option<Arc<dyn Logger>>,
    mode: DispatchMode,
}

struct Dispatcher {
    state: Mutex<DispatchState>,
}

impl Dispatcher {
    fn write(&self, buf: &[u8]) -> usize {
        let Some(_guard) = ReentryGuard::enter(self) else {
            return buf.len();
        };
        let state = self.state.lock();
        let Some(logger) = state.logger.as_deref() else {
            return buf.len();
        };

        let text = String::from_utf8_lossy(buf);
        match state.mode {
            DispatchMode::FirstMatch => dispatch(logger, &LogRecord::parse(&text)),
            DispatchMode::PerRecord => {
                for segment in split_records(&text) {
                    dispatch(logger, &LogRecord::parse(segment));
                }
            }
        }
        buf.len()
    }
}

/// Route one record to the matching logger operation.
pub fn dispatch(logger: &dyn Logger, record: &LogRecord) {
    let message = record.message.as_str();
    match (record.form, record.label.as_deref()) {
        (RecordForm::Labeled, Some("ERROR")) => logger.error(format_args!("{message}")),
        (RecordForm::Labeled, Some("WARN")) => logger.warn(format_args!("{message}")),
        (RecordForm::Labeled, Some("INFO")) => logger.info(format_args!("{message}")),
        (RecordForm::Labeled, Some("DEBUG")) => logger.debug(format_args!("{message}")),
        (RecordForm::Labeled, Some("TRACE")) => {
            logger.debug(format_args!("{TRACE_MARKER} {message}"))
        }
        (RecordForm::Labeled, Some(label)) => {
            logger.print(format_args!("[{label}] {UNKNOWN_LABEL_MARKER} {message}"))
        }
        (RecordForm::Timestamped, _) => logger.print(format_args!("{message}")),
        (RecordForm::Labeled, None) | (RecordForm::Unparsed, _) => {
            logger.print(format_args!("{UNPARSED_PREFIX} {message}"))
        }
    }
}

/// The writer installed into the sink. Always reports the whole buffer as
/// written and never fails.
#[derive(Clone)]
pub struct MiddlewareWriter {
    dispatcher: Arc<Dispatcher>,
}

impl Write for MiddlewareWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.dispatcher.write(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Scoped takeover of a log sink.
///
/// At most one middleware may own a sink at a time; a second install fails
/// with [`LogError::AlreadyInstalled`] instead of nesting.
pub struct Middleware {
    dispatcher: Arc<Dispatcher>,
    sink: Arc<SharedSink>,
    previous: Option<Box<dyn Write + Send>>,
}

impl Middleware {
    /// Install on the process-wide sink. Without a logger, a [`StdLogger`]
    /// on stdout at the default level is used.
    ///
    /// Lines the logger itself writes into the intercepted sink while being
    /// dispatched to are dropped.
    pub fn install(logger: Option<Arc<dyn Logger>>) -> LogResult<Self> {
        Self::install_on(SharedSink::global(), logger)
    }

    /// Install on a specific sink.
    pub fn install_on(sink: Arc<SharedSink>, logger: Option<Arc<dyn Logger>>) -> LogResult<Self> {
        let logger = logger.unwrap_or_else(|| Arc::new(StdLogger::stdout()));
        let dispatcher = Arc::new(Dispatcher {
            state: Mutex::new(DispatchState {
                logger: Some(logger),
                mode: DispatchMode::default(),
            }),
        });

        let writer = MiddlewareWriter {
            dispatcher: dispatcher.clone(),
        };
        let previous = sink.intercept(Box::new(writer)).ok_or(LogError::AlreadyInstalled)?;
        debug!("Log middleware installed");

        Ok(Self {
            dispatcher,
            sink,
            previous: Some(previous),
        })
    }

    /// Swap the logger without reinstalling.
    pub fn set_logger(&self, logger: Arc<dyn Logger>) {
        let mut state = self.dispatcher.state.lock();
        if self.previous.is_some() {
            state.logger = Some(logger);
        }
    }

    pub fn set_mode(&self, mode: DispatchMode) {
        self.dispatcher.state.lock().mode = mode;
    }

    pub fn mode(&self) -> DispatchMode {
        self.dispatcher.state.lock().mode
    }

    /// Sink entry point. Consumes the entire buffer and never errors.
    pub fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.dispatcher.write(buf))
    }

    /// A writer handle dispatching through this middleware.
    pub fn writer(&self) -> MiddlewareWriter {
        MiddlewareWriter {
            dispatcher: self.dispatcher.clone(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.previous.is_some()
    }

    /// Restore the captured output and detach the logger.
    pub fn close(mut self) {
        self.restore();
    }

    fn restore(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.sink.release(previous);
            self.dispatcher.state.lock().logger = None;
            debug!("Log middleware closed");
        }
    }
}

impl Drop for Middleware {
    fn drop(&mut self) {
        self.restore();
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("active", &self.is_active())
            .field("mode", &self.mode())
            .finish()
    }
}
