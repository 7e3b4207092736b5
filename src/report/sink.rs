//! Report sinks
//!
//! Findings from concurrent resource probes are funneled through a
//! [`ReportSink`]. Each finding is rendered and written as one unit so two
//! reports never interleave on the console.

use super::leak::LeakReport;
use serde::Serialize;
use std::io::Write;
use std::sync::Mutex;

/// A user-visible scan event
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Finding {
    /// Progress notice (`[*]`)
    Progress {
        /// Notice text
        message: String,
    },
    /// Sensitive request body fields of one resource (`[+]`)
    SensitiveFields {
        /// Create endpoint URI
        uri: String,
        /// `$`-rooted field paths
        paths: Vec<String>,
    },
    /// Broken access control (`[+]`)
    Leak(LeakReport),
    /// Resource-level failure (`[-]`)
    Failure {
        /// Resource key
        resource: String,
        /// Human-readable cause
        message: String,
    },
}

impl Finding {
    /// Console rendering with the `[*]` / `[+]` / `[-]` markers
    pub fn render(&self) -> String {
        match self {
            Finding::Progress { message } => format!("[*] {}\n", message),
            Finding::SensitiveFields { uri, paths } => paths
                .iter()
                .map(|path| format!("[+] {} sensitive field found: {}\n", uri, path))
                .collect(),
            Finding::Leak(report) => report.render(),
            Finding::Failure { resource, message } => format!("[-] {}: {}\n", resource, message),
        }
    }
}

/// Receives findings; must accept concurrent calls
pub trait ReportSink: Send + Sync {
    /// Record one finding
    fn emit(&self, finding: Finding);
}

/// Writes findings to stdout
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn emit(&self, finding: Finding) {
        let text = finding.render();
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            tracing::warn!("Failed to write finding to stdout: {}", e);
        }
    }
}

/// Keeps findings in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    findings: Mutex<Vec<Finding>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn findings(&self) -> Vec<Finding> {
        self.findings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Recorded leak reports
    pub fn leaks(&self) -> Vec<LeakReport> {
        self.findings()
            .into_iter()
            .filter_map(|f| match f {
                Finding::Leak(report) => Some(report),
                _ => None,
            })
            .collect()
    }
}

impl ReportSink for MemorySink {
    fn emit(&self, finding: Finding) {
        // Recover from poisoning; findings must not be dropped
        self.findings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(finding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::Verb;
    use std::sync::Arc;

    #[test]
    fn test_render_markers() {
        let progress = Finding::Progress {
            message: "Done".to_string(),
        };
        assert_eq!(progress.render(), "[*] Done\n");

        let failure = Finding::Failure {
            resource: "accounts.example.com".to_string(),
            message: "timed out".to_string(),
        };
        assert_eq!(failure.render(), "[-] accounts.example.com: timed out\n");

        let fields = Finding::SensitiveFields {
            uri: "/apis/example.com/v1/accounts".to_string(),
            paths: vec!["$.spec.password".to_string(), "$.spec.token".to_string()],
        };
        let text = fields.render();
        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("[+] /apis/example.com/v1/accounts sensitive field found: $.spec.password"));
    }

    #[test]
    fn test_memory_sink_concurrent() {
        let sink = Arc::new(MemorySink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    sink.emit(Finding::Failure {
                        resource: format!("r{}", i),
                        message: "x".to_string(),
                    })
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(sink.findings().len(), 8);
    }

    #[test]
    fn test_memory_sink_survives_poisoned_lock() {
        let sink = Arc::new(MemorySink::new());
        sink.emit(Finding::Progress {
            message: "before".to_string(),
        });

        let poisoner = Arc::clone(&sink);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.findings.lock().unwrap();
            panic!("worker died holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(sink.findings.is_poisoned());

        sink.emit(Finding::Failure {
            resource: "accounts.example.com".to_string(),
            message: "after".to_string(),
        });
        let findings = sink.findings();
        assert_eq!(findings.len(), 2);
        assert!(matches!(&findings[1], Finding::Failure { message, .. } if message == "after"));
    }

    #[test]
    fn test_memory_sink_leaks() {
        let sink = MemorySink::new();
        sink.emit(Finding::Progress {
            message: "start".to_string(),
        });
        sink.emit(Finding::Leak(LeakReport::new(
            "/apis/example.com/v1/accounts",
            Verb::Watch,
            Default::default(),
            vec![],
            "https://kubernetes.default",
            2,
        )));
        assert_eq!(sink.leaks().len(), 1);
    }

    #[test]
    fn test_finding_serialize() {
        let json = serde_json::to_value(Finding::Failure {
            resource: "r".to_string(),
            message: "m".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "failure");
    }
}
