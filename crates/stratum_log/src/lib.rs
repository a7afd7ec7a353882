//! # stratum_log
//!
//! Log interception for stratum.
//!
//! Engine code writes unstructured, timestamped text lines to a process-wide
//! [`SharedSink`]. A [`Middleware`] can take over that sink, parse each line
//! and re-dispatch it to any [`Logger`] implementation, then hand the sink
//! back untouched when it is closed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stratum_log::{log_printf, Middleware, TracingLogger};
//!
//! let middleware = Middleware::install(Some(Arc::new(TracingLogger))).unwrap();
//! log_printf!("[WARN] provider {} is deprecated", "null");
//! middleware.close();
//! ```

pub mod error;
pub mod filter;
pub mod logger;
pub mod middleware;
pub mod record;
mod reentry;
pub mod sink;
pub mod subscriber;
pub mod testing;

pub use error::{LogError, LogResult};
pub use filter::LevelFilter;
pub use logger::{Level, Logger, StdLogger, TracingLogger, DEFAULT_LEVEL};
pub use middleware::{dispatch, DispatchMode, Middleware, MiddlewareWriter};
pub use record::{split_records, LogRecord, RecordForm};
pub use sink::SharedSink;
pub use subscriber::init_tracing;
