//! AmbiTrack Synthetic-Event Harness
//!
//! Generates detector events with known truth and runs them through the
//! disambiguation engine, checking its output against what was injected.
//!
//! # Core Principle
//!
//! All randomness is derived from a single 64-bit seed, so a failing
//! `(scenario, seed)` pair can always be replayed exactly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  segments, candidates   ┌──────────────────┐
//! │ TruthOracle  │────────────────────────►│  Disambiguator   │
//! │ (ChaCha8Rng) │  truth deposits          │ (ambitrack_core) │
//! └──────┬───────┘                          └────────┬─────────┘
//!        │ injected ghosts / duplicates              │ EventOutput
//!        ▼                                           ▼
//!   ┌─────────────────────────────────────────────────────┐
//!   │ ScenarioRunner: per-event checks + ValidationSummary │
//!   └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ambitrack_sim::{ScenarioId, ScenarioRunner};
//!
//! let result = ScenarioRunner::new(42).with_events(20).run(ScenarioId::GhostStorm)?;
//! assert!(result.passed);
//! ```

pub mod error;
pub mod exporter;
pub mod oracle;
pub mod runner;
pub mod scenarios;

pub use error::SimError;
pub use exporter::{EventRecord, SimExport};
pub use oracle::{EventSpec, SimEvent, TruthOracle, TruthParticle};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
