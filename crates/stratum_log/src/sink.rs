//! Process-wide text log sink.
//!
//! Engine code writes diagnostic lines here through [`log_printf!`]. Each
//! line is prefixed with a `YYYY/MM/DD HH:MM:SS` timestamp and handed to the
//! current output in a single `write` call while the sink lock is held, so
//! an installed middleware always sees whole lines.
//!
//! [`log_printf!`]: crate::log_printf

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, OnceLock};

use chrono::Local;
use parking_lot::Mutex;

use crate::reentry::ReentryGuard;

/// Timestamp layout shared by the sink and the line grammar.
pub const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

static GLOBAL: OnceLock<Arc<SharedSink>> = OnceLock::new();

struct SinkState {
    output: Box<dyn Write + Send>,
    intercepted: bool,
}

/// A shared, lock-protected text log sink.
pub struct SharedSink {
    state: Mutex<SinkState>,
}

impl SharedSink {
    /// Create a private sink, independent of the process-wide one.
    pub fn new(output: impl Write + Send + 'static) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SinkState {
                output: Box::new(output),
                intercepted: false,
            }),
        })
    }

    /// The process-wide sink. Writes to stderr until redirected.
    pub fn global() -> Arc<SharedSink> {
        GLOBAL.get_or_init(|| SharedSink::new(io::stderr())).clone()
    }

    /// Replace the output, returning the one it replaces.
    pub fn set_output(&self, output: Box<dyn Write + Send>) -> Box<dyn Write + Send> {
        std::mem::replace(&mut self.state.lock().output, output)
    }

    /// Whether a middleware currently owns this sink's output.
    pub fn is_intercepted(&self) -> bool {
        self.state.lock().intercepted
    }

    /// Write one timestamped line.
    pub fn printf(&self, args: fmt::Arguments<'_>) {
        let mut line = format!("{} {}", Local::now().format(TIMESTAMP_FORMAT), args);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.write_raw(line.as_bytes());
    }

    /// Write bytes as-is, in one call to the current output.
    ///
    /// A write issued from inside this sink's own output on the same thread,
    /// such as a logger calling [`log_printf!`] while being dispatched to, is
    /// dropped.
    ///
    /// [`log_printf!`]: crate::log_printf
    pub fn write_raw(&self, bytes: &[u8]) {
        let Some(_guard) = ReentryGuard::enter(self) else {
            return;
        };
        let mut state = self.state.lock();
        // The sink contract has no error channel; a failing output loses the line.
        let _ = state.output.write_all(bytes);
        let _ = state.output.flush();
    }

    /// Swap in an intercepting output unless one is already installed.
    pub(crate) fn intercept(&self, output: Box<dyn Write + Send>) -> Option<Box<dyn Write + Send>> {
        let mut state = self.state.lock();
        if state.intercepted {
            return None;
        }
        state.intercepted = true;
        Some(std::mem::replace(&mut state.output, output))
    }

    /// Put back the output captured by [`SharedSink::intercept`].
    pub(crate) fn release(&self, previous: Box<dyn Write + Send>) {
        let mut state = self.state.lock();
        state.output = previous;
        state.intercepted = false;
    }
}

impl fmt::Debug for SharedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedSink")
            .field("intercepted", &self.is_intercepted())
            .finish()
    }
}

/// Write a timestamped line to the process-wide sink.
///
/// ```
/// stratum_log::log_printf!("[DEBUG] refreshing {}", "null_resource.a");
/// ```
#[macro_export]
macro_rules! log_printf {
    ($($arg:tt)*) => {
        $crate::sink::SharedSink::global().printf(format_args!($($arg)*))
    };
}
