//! Differential verb prober
//!
//! Compares how many objects List, Watch and a dry-run DeleteCollection
//! return for the same collection. RBAC is sometimes enforced for one verb
//! and not another; any verb that exposes more objects than the List
//! baseline is reported.
//!
//! Decision order, first match wins:
//! 1. List → baseline N (0 when denied)
//! 2. Watch → M; leak if M > N, DeleteCollection is not issued
//! 3. DeleteCollection (dry-run) → K; leak if K > N
//! 4. otherwise no leak

use super::decode::{decode_list, decode_watch};
use super::verb::{Verb, VerbClient};
use crate::error::{Error, Result};
use crate::report::{Baseline, LeakReport};
use crate::resource::ResourceDescriptor;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of one verb call
#[derive(Debug, Clone)]
pub struct ProbeResult {
    /// Verb issued
    pub verb: Verb,
    /// Returned objects, in response order
    pub items: Vec<Value>,
    /// The server denied the call (403)
    pub access_denied: bool,
    /// Transport or decode failure; the zero count is not an observation
    pub error: Option<String>,
}

impl ProbeResult {
    fn observed(verb: Verb, items: Vec<Value>) -> Self {
        Self {
            verb,
            items,
            access_denied: false,
            error: None,
        }
    }

    fn denied(verb: Verb) -> Self {
        Self {
            verb,
            items: Vec::new(),
            access_denied: true,
            error: None,
        }
    }

    fn failed(verb: Verb, error: &Error) -> Self {
        Self {
            verb,
            items: Vec::new(),
            access_denied: false,
            error: Some(error.to_string()),
        }
    }

    /// Number of returned objects
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Whether the count came from a failed call
    pub fn is_unreliable(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-resource verdict
#[derive(Debug, Clone)]
pub enum Verdict {
    /// Subresource, not probed
    Skipped,
    /// No verb exposed more than the baseline
    NoLeak,
    /// A verb exposed more than the baseline
    Leak(LeakReport),
}

/// Counts and verdict for one resource
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    /// Collection URI
    pub uri: String,
    /// Final verdict
    pub verdict: Verdict,
    /// `(verb, count)` for every verb issued, in order
    pub counts: Vec<(Verb, usize)>,
    /// Verbs whose count is unreliable, with the cause
    pub failures: Vec<(Verb, String)>,
}

impl ProbeOutcome {
    fn skipped(uri: String) -> Self {
        Self {
            uri,
            verdict: Verdict::Skipped,
            counts: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn record(&mut self, result: &ProbeResult) {
        self.counts.push((result.verb, result.item_count()));
        if let Some(error) = &result.error {
            self.failures.push((result.verb, error.clone()));
        }
    }

    /// The leak report, if the verdict fired
    pub fn leak(&self) -> Option<&LeakReport> {
        match &self.verdict {
            Verdict::Leak(report) => Some(report),
            _ => None,
        }
    }

    /// Count observed for `verb`, if it was issued
    pub fn count(&self, verb: Verb) -> Option<usize> {
        self.counts.iter().find(|(v, _)| *v == verb).map(|(_, c)| *c)
    }
}

/// Runs the List / Watch / DeleteCollection comparison
pub struct AccessProber {
    client: Arc<dyn VerbClient>,
}

impl AccessProber {
    /// Create a prober over `client`
    pub fn new(client: Arc<dyn VerbClient>) -> Self {
        Self { client }
    }

    /// Probe one resource.
    ///
    /// Only cancellation is returned as an error; denials and failures of
    /// individual verbs are folded into the outcome.
    pub async fn probe(
        &self,
        resource: &ResourceDescriptor,
        cancel: &CancellationToken,
    ) -> Result<ProbeOutcome> {
        let uri = resource.uri();
        if resource.is_subresource() {
            tracing::debug!("Skipping subresource {}", uri);
            return Ok(ProbeOutcome::skipped(uri));
        }

        let mut outcome = ProbeOutcome::skipped(uri.clone());

        let list = self.run(Verb::List, &uri, cancel).await?;
        let baseline = Baseline {
            count: list.item_count(),
            denied: list.access_denied,
            unreliable: list.is_unreliable(),
        };
        outcome.record(&list);

        for verb in [Verb::Watch, Verb::DeleteCollection] {
            let result = self.run(verb, &uri, cancel).await?;
            outcome.record(&result);

            if result.item_count() > baseline.count {
                tracing::info!(
                    "{} returned {} objects from {}, List returned {}",
                    verb,
                    result.item_count(),
                    uri,
                    baseline.count
                );
                outcome.verdict = Verdict::Leak(LeakReport::new(
                    &uri,
                    verb,
                    baseline,
                    result.items,
                    self.client.base_url(),
                    self.client.watch_timeout_secs(),
                ));
                return Ok(outcome);
            }
        }

        outcome.verdict = Verdict::NoLeak;
        Ok(outcome)
    }

    async fn run(&self, verb: Verb, uri: &str, cancel: &CancellationToken) -> Result<ProbeResult> {
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            response = self.client.call(verb, uri) => response,
        };

        let decoded = response.and_then(|bytes| match verb {
            Verb::Watch => decode_watch(&bytes),
            Verb::List | Verb::DeleteCollection => decode_list(&bytes),
        });

        let result = match decoded {
            Ok(items) => ProbeResult::observed(verb, items),
            Err(e) if e.is_forbidden() => {
                tracing::debug!("verb {} denied on {}", verb, uri);
                ProbeResult::denied(verb)
            }
            Err(e) => {
                tracing::warn!("verb {} access apiserver failed on {}: {}", verb, uri, e);
                ProbeResult::failed(verb, &e)
            }
        };

        Ok(result)
    }
}
