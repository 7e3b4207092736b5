//! Findings, redaction and output
//!
//! ```text
//! leaked objects → redact (managedFields, last-applied) → LeakReport
//!                                                             ↓
//! sensitive paths / failures / progress ──────────────→ ReportSink
//!                                                    (console, memory)
//! ```

pub mod leak;
pub mod redact;
pub mod sink;

pub use leak::{reproduction_command, Baseline, LeakReport};
pub use redact::{redact_items, redact_object, LAST_APPLIED_ANNOTATION};
pub use sink::{ConsoleSink, Finding, MemorySink, ReportSink};
