//! # miesc-core: tool adapter plane, layered orchestrator, and aggregator
//!
//! `miesc-core` is the foundation of MIESC, a pre-audit triage system for
//! Ethereum/EVM smart contracts. It defines:
//!
//! - [`adapter`] — the uniform [`adapter::Adapter`] trait every wrapped
//!   static analyzer, linter, or heuristic scanner implements.
//! - [`registry`] — the [`registry::AdapterRegistry`] adapters are looked
//!   up through.
//! - [`profile`] — pure profile/override resolution (`quick`, `standard`,
//!   `thorough`, `paranoid`).
//! - [`orchestrator`] — the nine-layer sequential [`orchestrator::Orchestrator`]
//!   that drives adapters with bounded intra-layer parallelism.
//! - [`aggregator`] — deduplication and noisy-OR confidence fusion over
//!   the findings adapters produce.
//! - [`finding`] — the common [`finding::Finding`] data model.
//! - [`taxonomy`] — static SWC/CWE/OWASP lookup tables.
//! - [`suppression`] — inline `// miesc-ignore` comment handling.
//! - [`context_bus`] — the telemetry-only broadcast bus between subsystems.
//! - [`config`] — [`config::RunConfig`] and its validating builder.
//! - [`error`] — the crate's error taxonomy.
//! - [`builtin`] — adapters that ship with this crate and need no external
//!   tool.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use miesc_core::adapter::ContractTarget;
//! use miesc_core::builtin::PatternStaticAdapter;
//! use miesc_core::config::RunConfig;
//! use miesc_core::context_bus::ContextBus;
//! use miesc_core::orchestrator::{CancellationToken, Orchestrator};
//! use miesc_core::registry::AdapterRegistry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = AdapterRegistry::new();
//! registry.register(Arc::new(PatternStaticAdapter::new()));
//!
//! let orchestrator = Orchestrator::new(registry, ContextBus::default());
//! let target = ContractTarget::from_path("Vault.sol")?;
//! let outcome = orchestrator
//!     .run_audit(&target, &RunConfig::default(), &CancellationToken::new())
//!     .await?;
//! println!("{} findings", outcome.findings.len());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod aggregator;
pub mod builtin;
pub mod config;
pub mod context_bus;
pub mod error;
pub mod finding;
pub mod orchestrator;
pub mod profile;
pub mod registry;
pub mod suppression;
pub mod tool;
pub mod taxonomy;

/// Sets up a global `tracing` subscriber reading `RUST_LOG` (defaulting to
/// `info`), matching the logging conventions used throughout this
/// workspace. Call once, near process start; calling it more than once is
/// a no-op after the first.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}
