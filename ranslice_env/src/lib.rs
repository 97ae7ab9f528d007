//! RanSlice Environment Abstraction Layer
//!
//! This crate provides the boundary between the allocation engine and the
//! world it runs in, so the same engine drives both **Simulation** (virtual
//! clock, seeded entropy) and **Live** (wall clock, real radios) operation.
//!
//! # What is abstracted
//!
//! - Time (`now()`): mobility integrates position over the elapsed interval
//! - Randomness (`derive_rng()`): every stochastic draw comes from a stream
//!   derived from a single 64-bit seed in simulation
//! - Radio artifacts: the allocation configuration written for the radio
//!   controller and the throughput measurements read back from it
//!
//! # Example
//!
//! ```ignore
//! use ranslice_env::{ArtifactExchange, FileExchange, RanContext, SystemContext};
//!
//! async fn live_interval(exchange: &FileExchange, records: &[AllocationRecord]) {
//!     exchange.publish_allocation(records).await?;
//!     let measurements = exchange.await_measurements().await?;
//! }
//! ```

mod context;
mod error;
mod exchange;
mod tokio_impl;
mod types;

pub use context::RanContext;
pub use error::EnvError;
pub use exchange::{write_allocation_artifact, ArtifactExchange};
pub use tokio_impl::{FileExchange, SystemContext};
pub use types::{AllocationRecord, CellId, Measurement, UserId};
