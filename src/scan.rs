//! Scan orchestration
//!
//! Every resource is one unit of work: sensitive field resolution followed by
//! the verb probe. Units run on a bounded pool; a failing unit is recorded
//! and never stops its siblings.

use crate::cluster::ResourceRegistry;
use crate::config::ScanConfig;
use crate::error::{Error, Result};
use crate::probe::{AccessProber, ProbeOutcome, Verdict, VerbClient};
use crate::report::{Finding, LeakReport, ReportSink};
use crate::resource::ResourceDescriptor;
use crate::schema::{FieldClassifier, SchemaIndex, SchemaResolver};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Knobs for one scan run
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Units in flight at once
    pub concurrency: usize,
    /// Namespace for namespaced body schema lookup
    pub namespace: String,
    /// Skip sensitive field resolution
    pub skip_sensitive_fields: bool,
}

impl ScanOptions {
    /// Options from the `[scan]` section
    pub fn from_config(config: &ScanConfig, namespace: impl Into<String>) -> Self {
        Self {
            concurrency: config.concurrency,
            namespace: namespace.into(),
            skip_sensitive_fields: config.skip_sensitive_fields,
        }
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            namespace: crate::cluster::DEFAULT_NAMESPACE.to_string(),
            skip_sensitive_fields: false,
        }
    }
}

/// A resource-level failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceFailure {
    /// Resource key
    pub resource: String,
    /// Cause
    pub message: String,
}

/// Aggregate result of a run
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    /// When the run finished
    pub generated_at: DateTime<Utc>,
    /// Resources considered, status subresources excluded
    pub resources: usize,
    /// Whether sensitive field resolution ran
    pub schema_checked: bool,
    /// Broken access control findings
    pub leaks: Vec<LeakReport>,
    /// Sensitive field paths by create endpoint URI
    pub sensitive_fields: BTreeMap<String, Vec<String>>,
    /// Resource-level failures
    pub failures: Vec<ResourceFailure>,
    /// Resources with at least one unreliable verb count
    pub unreliable: Vec<String>,
    /// Resources whose unit was cancelled
    pub cancelled: Vec<String>,
}

impl ScanSummary {
    /// One-line tally
    pub fn headline(&self) -> String {
        let fields: usize = self.sensitive_fields.values().map(Vec::len).sum();
        format!(
            "Scanned {} apis: {} leaks, {} sensitive fields, {} failures, {} cancelled",
            self.resources,
            self.leaks.len(),
            fields,
            self.failures.len(),
            self.cancelled.len()
        )
    }
}

/// What one unit produced
#[derive(Debug, Default)]
struct UnitReport {
    key: String,
    sensitive: Option<(String, Vec<String>)>,
    outcome: Option<ProbeOutcome>,
    failures: Vec<String>,
    cancelled: bool,
}

/// Runs the sensitive field and access checks over a registry
pub struct Scanner {
    client: Arc<dyn VerbClient>,
    schema: Option<Arc<SchemaIndex>>,
    classifier: Arc<dyn FieldClassifier>,
    sink: Arc<dyn ReportSink>,
    options: ScanOptions,
}

impl Scanner {
    /// Create a scanner without a schema; only the access check runs
    pub fn new(
        client: Arc<dyn VerbClient>,
        classifier: Arc<dyn FieldClassifier>,
        sink: Arc<dyn ReportSink>,
        options: ScanOptions,
    ) -> Self {
        Self {
            client,
            schema: None,
            classifier,
            sink,
            options,
        }
    }

    /// Enable sensitive field resolution against `schema`
    pub fn with_schema(mut self, schema: Arc<SchemaIndex>) -> Self {
        self.schema = Some(schema);
        self
    }

    fn schema(&self) -> Option<&SchemaIndex> {
        if self.options.skip_sensitive_fields {
            None
        } else {
            self.schema.as_deref()
        }
    }

    /// Scan every resource from `registry`.
    ///
    /// Fails only when the registry cannot be read; the cause and the
    /// completion line are still reported before returning.
    pub async fn run(
        &self,
        registry: &dyn ResourceRegistry,
        cancel: CancellationToken,
    ) -> Result<ScanSummary> {
        let discovered = match registry.resources().await {
            Ok(resources) => resources,
            Err(e) => {
                tracing::error!("Failed to fetch custom apis: {}", e);
                self.sink.emit(Finding::Failure {
                    resource: "apis".to_string(),
                    message: format!("Failed to fetch custom apis: {}", e),
                });
                self.progress("Done".to_string());
                return Err(e);
            }
        };
        let resources: Vec<ResourceDescriptor> = discovered
            .into_iter()
            .filter(|r| !r.is_status_subresource())
            .collect();

        self.progress(format!("Discovered {} custom apis", resources.len()));

        let prober = AccessProber::new(self.client.clone());
        let mut units: Vec<UnitReport> = stream::iter(&resources)
            .map(|resource| self.scan_resource(&prober, resource, &cancel))
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await;
        units.sort_by(|a, b| a.key.cmp(&b.key));

        let summary = self.summarize(resources.len(), units);
        tracing::info!("{}", summary.headline());
        self.progress(summary.headline());
        self.progress("Done".to_string());
        Ok(summary)
    }

    async fn scan_resource(
        &self,
        prober: &AccessProber,
        resource: &ResourceDescriptor,
        cancel: &CancellationToken,
    ) -> UnitReport {
        let mut unit = UnitReport {
            key: resource.key(),
            ..Default::default()
        };
        if cancel.is_cancelled() {
            unit.cancelled = true;
            return unit;
        }

        self.progress(format!(
            "Starting validation for {}, group: {}, version: {}, resource: {}",
            unit.key, resource.group, resource.version, resource.name
        ));

        if let Some(schema) = self.schema() {
            match self.sensitive_fields(schema, resource) {
                Ok(Some((uri, paths))) => {
                    self.sink.emit(Finding::SensitiveFields {
                        uri: uri.clone(),
                        paths: paths.clone(),
                    });
                    unit.sensitive = Some((uri, paths));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!("sensitive field check skipped for {}: {}", unit.key, e);
                    self.fail(&mut unit, format!("Failed to detect sensitive field: {}", e));
                }
            }
        }

        match prober.probe(resource, cancel).await {
            Ok(outcome) => {
                for (verb, cause) in &outcome.failures {
                    self.fail(
                        &mut unit,
                        format!("verb {} access apiserver failed: {}", verb, cause),
                    );
                }
                if let Verdict::Leak(report) = &outcome.verdict {
                    self.sink.emit(Finding::Leak(report.clone()));
                }
                unit.outcome = Some(outcome);
            }
            Err(Error::Cancelled) => {
                tracing::debug!("probe of {} cancelled", unit.key);
                unit.cancelled = true;
            }
            Err(e) => self.fail(&mut unit, format!("Detect err: {}", e)),
        }

        unit
    }

    /// Sensitive paths of `resource`'s create body, `None` when there are none
    fn sensitive_fields(
        &self,
        schema: &SchemaIndex,
        resource: &ResourceDescriptor,
    ) -> Result<Option<(String, Vec<String>)>> {
        let root = schema.resource_body_schema(resource, &self.options.namespace)?;
        let resolver = SchemaResolver::new(schema.definitions(), self.classifier.as_ref());
        let paths: Vec<String> = resolver.resolve(root).into_iter().collect();
        if paths.is_empty() {
            Ok(None)
        } else {
            Ok(Some((resource.uri(), paths)))
        }
    }

    fn fail(&self, unit: &mut UnitReport, message: String) {
        self.sink.emit(Finding::Failure {
            resource: unit.key.clone(),
            message: message.clone(),
        });
        unit.failures.push(message);
    }

    fn progress(&self, message: String) {
        self.sink.emit(Finding::Progress { message });
    }

    fn summarize(&self, resources: usize, units: Vec<UnitReport>) -> ScanSummary {
        let mut summary = ScanSummary {
            generated_at: Utc::now(),
            resources,
            schema_checked: self.schema().is_some(),
            leaks: Vec::new(),
            sensitive_fields: BTreeMap::new(),
            failures: Vec::new(),
            unreliable: Vec::new(),
            cancelled: Vec::new(),
        };

        for unit in units {
            if unit.cancelled {
                summary.cancelled.push(unit.key.clone());
            }
            if let Some((uri, paths)) = unit.sensitive {
                summary.sensitive_fields.insert(uri, paths);
            }
            if let Some(outcome) = unit.outcome {
                if !outcome.failures.is_empty() {
                    summary.unreliable.push(unit.key.clone());
                }
                if let Verdict::Leak(report) = outcome.verdict {
                    summary.leaks.push(report);
                }
            }
            summary
                .failures
                .extend(unit.failures.into_iter().map(|message| ResourceFailure {
                    resource: unit.key.clone(),
                    message,
                }));
        }

        summary
    }
}
