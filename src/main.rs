//! kubeapi-inspector - Kubernetes Custom API Security Inspector
//!
//! Scans the custom APIs of a cluster for sensitive request body fields and
//! for broken access control between List, Watch and DeleteCollection.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use kubeapi_inspector::{
    cluster::{ApiDiscovery, ClusterClient, Credentials},
    config::InspectorConfig,
    report::{ConsoleSink, Finding, ReportSink},
    schema::{FieldClassifier, PatternClassifier, SchemaIndex, SchemaResolver},
    ScanOptions, Scanner,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kubeapi-inspector")]
#[command(version)]
#[command(about = "Kubernetes custom API security inspector")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "KUBEAPI_INSPECTOR_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a cluster for sensitive fields and broken access control
    Scan(ScanArgs),

    /// Resolve sensitive fields of every create endpoint in a local OpenAPI document
    Fields {
        /// OpenAPI v2 document (JSON)
        #[arg(long)]
        schema_file: PathBuf,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Kubeconfig file; in-cluster credentials are used when absent
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Namespace for namespaced body schema lookup
    #[arg(short, long)]
    namespace: Option<String>,

    /// API server address
    #[arg(long)]
    server: Option<String>,

    /// Bearer token for the API server
    #[arg(long)]
    token: Option<String>,

    /// Skip sensitive field detection
    #[arg(long)]
    skip_sensitive_fields: bool,

    /// Skip TLS certificate verification
    #[arg(long)]
    insecure_skip_tls_verify: bool,

    /// Read the OpenAPI document from a file instead of the server
    #[arg(long)]
    schema_file: Option<PathBuf>,

    /// Resources probed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Write the scan summary as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Stop the scan after this many seconds
    #[arg(long)]
    deadline: Option<u64>,
}

impl ScanArgs {
    fn apply(&self, config: &mut InspectorConfig) {
        if let Some(kubeconfig) = &self.kubeconfig {
            config.cluster.kubeconfig = Some(kubeconfig.clone());
        }
        if let Some(namespace) = &self.namespace {
            config.cluster.namespace = Some(namespace.clone());
        }
        if let Some(server) = &self.server {
            config.cluster.server = Some(server.clone());
        }
        if let Some(token) = &self.token {
            config.cluster.token = Some(token.clone());
        }
        if self.insecure_skip_tls_verify {
            config.cluster.insecure_skip_tls_verify = true;
        }
        if self.skip_sensitive_fields {
            config.scan.skip_sensitive_fields = true;
        }
        if let Some(concurrency) = self.concurrency {
            config.scan.concurrency = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; findings go to stdout, diagnostics to stderr
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kubeapi_inspector={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => InspectorConfig::from_file(path)?,
        None => InspectorConfig::default(),
    };

    match cli.command {
        Commands::Scan(args) => {
            let mut config = config;
            args.apply(&mut config);
            run_scan(config, &args).await?;
        }
        Commands::Fields { schema_file } => {
            run_fields(&config, &schema_file)?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_scan(config: InspectorConfig, args: &ScanArgs) -> Result<()> {
    let sink: Arc<dyn ReportSink> = Arc::new(ConsoleSink);
    let classifier = PatternClassifier::from_config(&config.sensitive)?;
    progress(sink.as_ref(), format!("Load {} sensitive pattern", classifier.len()));

    let creds = Credentials::resolve(&config.cluster)
        .await
        .context("Failed to create kubeclient, make sure kubeconfig is valid")?;
    tracing::info!(
        "Using {} ({:?} auth)",
        creds.config.cluster_url,
        creds.auth_method()
    );
    tracing::debug!("Resolved credentials: {:?}", creds);
    let client = Arc::new(
        ClusterClient::new(&creds, &config.cluster, config.scan.watch_timeout_secs)
            .context("Failed to create kubeclient")?,
    );

    let options = ScanOptions::from_config(&config.scan, creds.namespace.clone());
    let mut scanner = Scanner::new(client.clone(), Arc::new(classifier), sink.clone(), options);

    if !config.scan.skip_sensitive_fields {
        progress(sink.as_ref(), "Starting to download openapi definition".to_string());
        match load_schema(&client, args.schema_file.as_deref()).await {
            Ok(index) => {
                progress(
                    sink.as_ref(),
                    format!("Parse openapi schema success, {} create endpoints", index.endpoint_count()),
                );
                scanner = scanner.with_schema(Arc::new(index));
            }
            Err(e) => sink.emit(Finding::Failure {
                resource: "openapi".to_string(),
                message: format!("Failed to load openapi schema: {}, will be skip sensitive field test", e),
            }),
        }
    }

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(&cancel, args.deadline);

    let registry = ApiDiscovery::new(client, &config.scan.skip_groups);
    progress(sink.as_ref(), "Starting to discovery apis".to_string());
    let summary = scanner
        .run(&registry, cancel)
        .await
        .context("Failed to fetch custom apis")?;

    if let Some(path) = &args.output {
        let json = serde_json::to_string_pretty(&summary)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Scan summary written to {}", path.display());
    }

    Ok(())
}

async fn load_schema(client: &ClusterClient, schema_file: Option<&Path>) -> kubeapi_inspector::Result<SchemaIndex> {
    let bytes = match schema_file {
        Some(path) => tokio::fs::read(path).await?,
        None => client.openapi_document().await?,
    };
    SchemaIndex::from_slice(&bytes)
}

/// Cancel on Ctrl+C, and when the deadline passes
fn spawn_cancel_triggers(cancel: &CancellationToken, deadline: Option<u64>) {
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling scan...");
            token.cancel();
        }
    });

    if let Some(secs) = deadline {
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::info!("Deadline of {}s reached, cancelling scan...", secs);
            token.cancel();
        });
    }
}

fn run_fields(config: &InspectorConfig, schema_file: &Path) -> Result<()> {
    let sink = ConsoleSink;
    let classifier = PatternClassifier::from_config(&config.sensitive)?;
    let bytes = std::fs::read(schema_file)
        .with_context(|| format!("Failed to read {}", schema_file.display()))?;
    let index = SchemaIndex::from_slice(&bytes)?;

    let resolver = SchemaResolver::new(index.definitions(), &classifier as &dyn FieldClassifier);
    let mut total = 0;
    for (uri, schema) in index.endpoints() {
        let paths: Vec<String> = resolver.resolve(schema).into_iter().collect();
        if paths.is_empty() {
            continue;
        }
        total += paths.len();
        sink.emit(Finding::SensitiveFields {
            uri: uri.to_string(),
            paths,
        });
    }

    progress(
        &sink,
        format!("{} sensitive fields in {} create endpoints", total, index.endpoint_count()),
    );
    Ok(())
}

fn progress(sink: &dyn ReportSink, message: String) {
    sink.emit(Finding::Progress { message });
}

fn show_config(config: Option<&InspectorConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
