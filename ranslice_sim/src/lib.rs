//! RanSlice Simulation Harness
//!
//! This crate provides the control loop around the allocation engine and the
//! drivers that run it, either against a deterministic virtual world or
//! against real radios.
//!
//! # Core Principle: Determinism
//!
//! All sources of non-determinism are intercepted and controlled:
//! - **Time**: a virtual clock advances by one control interval per step
//! - **Randomness**: user placement, velocity redraws, task sizes and the
//!   driving policy all draw from streams of a single 64-bit seed
//! - **Throughput**: the PRB regression stands in for the radios
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    EpisodeRunner                      │
//! │   random policy ──► SimWorld::step(action, source)    │
//! │                        │                              │
//! │   ┌────────────────────▼─────────────────────────┐    │
//! │   │ ActionSpace ► Translator ► Regression ► Reward│    │
//! │   └────────────────────┬─────────────────────────┘    │
//! │                        ▼                              │
//! │        UserPopulation (mobility + task draws)         │
//! └───────────────────────────────────────────────────────┘
//!              LiveDriver: same loop, Measured source
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use ranslice_sim::{EpisodeRunner, SimConfig, scenarios::ScenarioId};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     episode_len: 100,
//!     ..Default::default()
//! };
//!
//! let (results, _) = EpisodeRunner::new(config).run(ScenarioId::Reference)?;
//! ```

mod context;
mod exporter;
mod live;
mod runner;
mod world;
pub mod scenarios;

pub use context::SimContext;
pub use exporter::{EpisodeExport, StepRecord};
pub use live::LiveDriver;
pub use runner::{EpisodeMetrics, EpisodeResult, EpisodeRunner, POLICY_STREAM};
pub use world::{SimConfig, SimWorld, StepInfo, StepResult, ThroughputSource};
