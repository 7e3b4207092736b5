//! Broken access control reports

use super::redact::redact_items;
use crate::probe::Verb;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What List returned for the collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Baseline {
    /// Item count, 0 when denied or failed
    pub count: usize,
    /// List was denied (403)
    pub denied: bool,
    /// List failed, so the count is not an observation
    pub unreliable: bool,
}

/// One confirmed broken access control finding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeakReport {
    /// Collection URI that leaked
    pub uri: String,
    /// Verb that exposed more objects than the List baseline
    pub verb: Verb,
    /// Baseline item count from List
    pub baseline: usize,
    /// Whether the List baseline was denied rather than observed
    pub baseline_denied: bool,
    /// Whether the List call failed; the zero baseline was assumed
    #[serde(default)]
    pub baseline_unreliable: bool,
    /// Leaked objects with operational metadata removed
    pub items: Vec<Value>,
    /// Shell command reproducing the request
    pub command: String,
}

impl LeakReport {
    /// Build a report, redacting `items` on the way in
    pub fn new(
        uri: &str,
        verb: Verb,
        baseline: Baseline,
        items: Vec<Value>,
        base_url: &str,
        watch_timeout_secs: u64,
    ) -> Self {
        Self {
            uri: uri.to_string(),
            verb,
            baseline: baseline.count,
            baseline_denied: baseline.denied,
            baseline_unreliable: baseline.unreliable,
            items: redact_items(items),
            command: reproduction_command(verb, base_url, uri, watch_timeout_secs),
        }
    }

    /// Number of leaked objects
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Console rendering: statement, command and the object dump
    pub fn render(&self) -> String {
        let dump = serde_json::to_string_pretty(&self.items).unwrap_or_else(|_| "[]".to_string());
        let qualifier = if self.baseline_unreliable {
            ", List failed"
        } else if self.baseline_denied {
            ", denied"
        } else {
            ""
        };
        let mut out = format!(
            "[+] Path: {} found broken access control by {} verb ({} objects, List returned {}{}).\n",
            self.uri,
            self.verb,
            self.item_count(),
            self.baseline,
            qualifier
        );
        out.push_str(&format!("Command example: {}\n", self.command));
        out.push_str(&format!("[+] leak objects: {}\n", dump));
        out
    }
}

/// Bearer-token curl command issuing `verb` against `uri` the way the
/// prober does
pub fn reproduction_command(verb: Verb, base_url: &str, uri: &str, watch_timeout_secs: u64) -> String {
    let method = match verb {
        Verb::DeleteCollection => " -X DELETE",
        Verb::List | Verb::Watch => "",
    };
    format!(
        "curl -k{} -H \"Authorization: Bearer $TOKEN\" \"{}{}{}\"",
        method,
        base_url.trim_end_matches('/'),
        uri,
        verb.query(watch_timeout_secs)
    )
}
