//! The layered orchestrator: runs adapters through nine fixed, strictly
//! sequential layers, with bounded parallelism inside each layer and a
//! per-adapter timeout, adapted from a graph superstep model to a fixed
//! linear layer sequence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

use crate::adapter::{analyze_with_timeout, AnalyzeOptions, ContractTarget};
use crate::aggregator::{self, AggregationReport};
use crate::config::RunConfig;
use crate::context_bus::{ContextBus, ContextMessage, ContextType};
use crate::error::{ErrorRecord, ErrorScope, RunError};
use crate::finding::{Finding, FindingStatus, Severity};
use crate::profile::{self, Profile};
use crate::registry::AdapterRegistry;
use crate::suppression::SuppressionTable;
use crate::tool::{RunStatus, ToolStatus, ToolStatusReport};

/// A cooperative cancellation flag. Checked at layer boundaries and before
/// each adapter dispatch; an in-flight adapter still runs to completion or
/// its own timeout, since adapters do not accept mid-flight cancellation.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A per-adapter record of what happened during one layer's execution,
/// independent of whether it produced any findings.
#[derive(Debug, Clone)]
pub struct AdapterRun {
    pub adapter_name: String,
    pub layer: u8,
    pub status: ToolStatus,
    pub run_status: RunStatus,
    pub duration: std::time::Duration,
    pub error_message: Option<String>,
}

/// Counts by severity, by layer, and by tool, plus the coverage metric
/// spec.md §3/§6 require: the fraction of considered adapters that actually
/// ran to completion (`RunStatus::Success`).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
    pub by_severity: BTreeMap<Severity, u32>,
    pub by_layer: BTreeMap<u8, u32>,
    pub by_tool: BTreeMap<String, u32>,
    pub coverage: f64,
}

fn summarize(findings: &[Finding], adapter_runs: &[AdapterRun]) -> RunSummary {
    let mut by_severity: BTreeMap<Severity, u32> = BTreeMap::new();
    let mut by_layer: BTreeMap<u8, u32> = BTreeMap::new();
    let mut by_tool: BTreeMap<String, u32> = BTreeMap::new();

    for finding in findings {
        *by_severity.entry(finding.severity).or_default() += 1;
        for prov in &finding.provenance {
            *by_layer.entry(prov.layer).or_default() += 1;
            *by_tool.entry(prov.adapter.clone()).or_default() += 1;
        }
    }

    let considered = adapter_runs.len();
    let succeeded = adapter_runs
        .iter()
        .filter(|r| r.run_status == RunStatus::Success)
        .count();
    let coverage = if considered == 0 {
        0.0
    } else {
        succeeded as f64 / considered as f64
    };

    RunSummary {
        by_severity,
        by_layer,
        by_tool,
        coverage,
    }
}

/// The full outcome of one audit run: the single in-memory record spec.md
/// §6 says the core emits for the external reporter to serialize.
#[derive(Debug)]
pub struct RunResult {
    pub run_id: uuid::Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub contract_path: std::path::PathBuf,
    pub profile: Profile,
    pub layers_run: Vec<u8>,
    pub tool_status: Vec<ToolStatusReport>,
    pub findings: Vec<Finding>,
    pub rejected: Vec<ErrorRecord>,
    pub summary: RunSummary,
}

pub struct Orchestrator {
    registry: AdapterRegistry,
    bus: ContextBus,
}

impl Orchestrator {
    #[must_use]
    pub fn new(registry: AdapterRegistry, bus: ContextBus) -> Self {
        Self { registry, bus }
    }

    /// Runs a full audit against `target` under `config`, driving layers in
    /// strict sequence. Each layer is a synchronization barrier: every
    /// adapter in the layer finishes (or times out) before the next layer
    /// starts.
    ///
    /// # Errors
    /// Returns [`RunError::Configuration`] if `config`'s profile/overrides
    /// don't resolve against the registry, [`RunError::RunTimeout`] if the
    /// overall run budget elapses, or [`RunError::RunCancelled`] if `cancel`
    /// is observed between layers. In both timeout and cancellation cases,
    /// no partial [`RunResult`] is returned — aggregation is all-or-nothing
    /// for a run.
    #[instrument(skip(self, target, config, cancel), fields(contract = %target.path.display()))]
    pub async fn run_audit(
        &self,
        target: &ContractTarget,
        config: &RunConfig,
        cancel: &CancellationToken,
    ) -> Result<RunResult, RunError> {
        let run_id = uuid::Uuid::new_v4();
        let started_at = Utc::now();
        let known_adapters = self.registry.names();
        let selection = profile::select(config.profile, &config.overrides, &known_adapters)?;

        let mut layers_to_run: BTreeSet<u8> = selection.layers.clone();
        for name in &selection.allowlist {
            if let Some(adapter) = self.registry.get(name) {
                layers_to_run.insert(adapter.metadata().default_layer);
            }
        }

        let run_started = Instant::now();
        let mut raw_findings = Vec::new();
        let mut adapter_runs = Vec::new();
        let mut layers_run = Vec::new();

        for layer in layers_to_run {
            if cancel.is_cancelled() {
                return Err(RunError::RunCancelled);
            }
            if let Some(run_timeout) = config.run_timeout {
                if run_started.elapsed() >= run_timeout {
                    return Err(RunError::RunTimeout(run_timeout));
                }
            }

            let adapters: Vec<_> = self
                .registry
                .adapters_in_layer(layer)
                .into_iter()
                .filter(|a| {
                    let name = &a.metadata().name;
                    !selection.denylist.contains(name)
                        && (selection.layers.contains(&layer) || selection.allowlist.contains(name))
                })
                .collect();

            if adapters.is_empty() {
                continue;
            }

            self.bus.publish(ContextMessage::new(
                "orchestrator",
                target.path.display().to_string(),
                ContextType::LayerStarted,
                serde_json::json!({ "layer": layer, "adapter_count": adapters.len() }),
            ));

            let layer_results = self
                .run_layer(
                    layer,
                    adapters,
                    target,
                    config.adapter_timeout,
                    config.max_workers,
                    config.skip_unavailable,
                )
                .await;

            for (run, findings) in layer_results {
                adapter_runs.push(run);
                raw_findings.extend(findings);
            }
            layers_run.push(layer);

            self.bus.publish(ContextMessage::new(
                "orchestrator",
                target.path.display().to_string(),
                ContextType::LayerCompleted,
                serde_json::json!({ "layer": layer }),
            ));
        }

        let AggregationReport { mut findings, rejected } = aggregator::aggregate(raw_findings);

        let suppression = SuppressionTable::parse(&target.source);
        suppression.apply(&mut findings);
        findings.retain(|f| matches!(f.status, FindingStatus::Raw | FindingStatus::Validated));

        if let Some(min_severity) = config.min_severity {
            findings.retain(|f| f.severity >= min_severity);
        }
        if let Some(min_confidence) = config.min_confidence {
            findings.retain(|f| f.confidence.band() >= min_confidence);
        }

        findings.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
                .then(a.provenance.first().map(|p| p.layer).cmp(&b.provenance.first().map(|p| p.layer)))
                .then(
                    a.provenance
                        .first()
                        .map(|p| p.adapter.as_str())
                        .cmp(&b.provenance.first().map(|p| p.adapter.as_str())),
                )
        });

        let summary = summarize(&findings, &adapter_runs);
        let tool_status = adapter_runs
            .iter()
            .map(|run| ToolStatusReport {
                tool: run.adapter_name.clone(),
                status: run.status,
                reason: run.error_message.clone(),
                install_hint: None,
                run_status: run.run_status,
            })
            .collect();

        Ok(RunResult {
            run_id,
            started_at,
            duration_ms: u64::try_from(run_started.elapsed().as_millis()).unwrap_or(u64::MAX),
            contract_path: target.path.clone(),
            profile: config.profile,
            layers_run,
            tool_status,
            findings,
            rejected,
            summary,
        })
    }

    /// Runs every adapter in `adapters` concurrently, bounded by
    /// `max_workers`, and returns each adapter's run record paired with
    /// whatever findings it normalized to. A single adapter failing or
    /// timing out never aborts the layer for the others.
    async fn run_layer(
        &self,
        layer: u8,
        adapters: Vec<Arc<dyn crate::adapter::Adapter>>,
        target: &ContractTarget,
        adapter_timeout: std::time::Duration,
        max_workers: usize,
        skip_unavailable: bool,
    ) -> Vec<(AdapterRun, Vec<Finding>)> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(max_workers.max(1)));
        let options = AnalyzeOptions::default();
        let mut tasks = Vec::with_capacity(adapters.len());

        for adapter in adapters {
            let semaphore = Arc::clone(&semaphore);
            let contract_path = target.path.clone();
            let options = options.clone();
            let bus = self.bus.clone();
            let contract_label = target.path.display().to_string();

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let name = adapter.metadata().name.clone();

                bus.publish(ContextMessage::new(
                    "orchestrator",
                    contract_label.clone(),
                    ContextType::AdapterStarted,
                    serde_json::json!({ "adapter": name, "layer": layer }),
                ));

                let status = adapter.status().await;
                if !status.is_runnable() {
                    let run_status = if skip_unavailable {
                        RunStatus::Skipped
                    } else {
                        RunStatus::Unavailable
                    };
                    info!(adapter = %name, %status, %run_status, "adapter not runnable");

                    return (
                        AdapterRun {
                            adapter_name: name,
                            layer,
                            status,
                            run_status,
                            duration: std::time::Duration::ZERO,
                            error_message: None,
                        },
                        Vec::new(),
                    );
                }

                // Per-adapter timeout is the tighter of the adapter's own
                // documented budget and the run-level default (spec.md §4.5
                // item 3), so a fast built-in that hangs doesn't run for the
                // full run-level budget.
                let effective_timeout = std::cmp::min(
                    std::time::Duration::from_secs(adapter.metadata().default_timeout_seconds),
                    adapter_timeout,
                );
                let result =
                    analyze_with_timeout(adapter.as_ref(), &contract_path, &options, effective_timeout)
                        .await;

                let run_status = match result.status {
                    crate::adapter::AnalysisStatus::Ok => RunStatus::Success,
                    crate::adapter::AnalysisStatus::Error => RunStatus::Error,
                    crate::adapter::AnalysisStatus::Timeout => RunStatus::Timeout,
                };

                let findings = if result.status == crate::adapter::AnalysisStatus::Ok {
                    adapter.normalize(&result.raw_output).unwrap_or_else(|err| {
                        warn!(adapter = %name, %err, "normalization failed");
                        Vec::new()
                    })
                } else {
                    Vec::new()
                };

                bus.publish(ContextMessage::new(
                    "orchestrator",
                    contract_label,
                    ContextType::AdapterCompleted,
                    serde_json::json!({
                        "adapter": name,
                        "layer": layer,
                        "finding_count": findings.len(),
                    }),
                ));

                (
                    AdapterRun {
                        adapter_name: name,
                        layer,
                        status,
                        run_status,
                        duration: result.duration,
                        error_message: result.error_message,
                    },
                    findings,
                )
            }));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(pair) => results.push(pair),
                Err(join_err) => {
                    warn!(%join_err, "adapter task panicked");
                }
            }
        }
        results
    }
}

impl From<ErrorRecord> for ContextMessage {
    fn from(record: ErrorRecord) -> Self {
        ContextMessage::new(
            "orchestrator",
            "unknown",
            match record.scope {
                ErrorScope::Adapter | ErrorScope::Orchestrator => ContextType::Error,
                ErrorScope::Aggregator | ErrorScope::Rag | ErrorScope::Llm => ContextType::Diagnostic,
            },
            serde_json::json!({ "message": record.message, "tags": record.tags }),
        )
    }
}
