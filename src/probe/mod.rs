//! Broken access control detection
//!
//! ```text
//! ResourceDescriptor → AccessProber ──List──────────────→ baseline N
//!                           │       ──Watch (2s)────────→ M > N ? leak
//!                           │       ──DeleteCollection──→ K > N ? leak
//!                           ↓           (dryRun=All)
//!                      ProbeOutcome (verdict, counts, unreliable verbs)
//! ```

pub mod decode;
pub mod prober;
pub mod verb;

pub use decode::{decode_list, decode_watch};
pub use prober::{AccessProber, ProbeOutcome, ProbeResult, Verdict};
pub use verb::{Verb, VerbClient, DEFAULT_API_SERVER, DEFAULT_WATCH_TIMEOUT_SECS};
