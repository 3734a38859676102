//! mdlog - rotating markdown log writer for administration scripts
//!
//! Messages are appended as rows of a markdown table to one active file per
//! script. The file is archived when the calendar month changes or when it
//! grows past a size limit. Each message can also be mirrored to a
//! structured event sink. Logging is best effort: a [`Logger`] never returns
//! an error or panics from a write, it reports problems as [`Diagnostic`]s.
//!
//! ```no_run
//! use mdlog::{Level, Logger};
//!
//! let mut log = Logger::initialize("Demo", "2.0", None, None);
//! log.write("started", Level::Info);
//! log.write("done", Level::Success);
//! println!("{:?}", log.path());
//! ```

pub mod clock;
pub mod config;
pub mod console;
pub mod diagnostics;
pub mod error;
pub mod event_sink;
pub mod identity;
pub mod level;
pub mod markdown;
pub mod retention;
pub mod rotation;
pub mod writer;

pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticBuffer, DiagnosticHandler, DiagnosticKind};
pub use error::{LogError, LogResult};
pub use event_sink::{EventContext, EventEntry, EventSink, JournalSink, SinkError, TracingSink};
pub use identity::Identity;
pub use level::{Level, Severity};
pub use markdown::{read_entries, LogRow};
pub use retention::cleanup_old_archives;
pub use rotation::list_archives;
pub use writer::{Logger, LoggerBuilder, DEFAULT_MAX_SIZE_BYTES};
