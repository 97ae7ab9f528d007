//! RanSlice Core - PRB Allocation Engine for Multi-Cell Network Slicing
//!
//! This library resolves one control interval of a shared spectrum:
//! 1. **Interference Coupling**: virtualized cells that schedule into
//!    contested PRBs shrink the anchor cell's budget
//! 2. **Ratio Translation**: PRB grants become the min/max/dedicated ratios
//!    the radio controller consumes
//! 3. **QoS Reward**: per-class shortfalls against expected performance,
//!    clipped and summed into one scalar

pub mod action_space;
pub mod allocation;
pub mod config;
pub mod error;
pub mod mobility;
pub mod observation;
pub mod regression;
pub mod reward;
pub mod traffic;
pub mod user;

// Re-export key types for convenience
pub use action_space::{ActionSpace, AllocationPlan, CellGroup};
pub use allocation::AllocationTranslator;
pub use config::{DomainConfig, HardwareClass, TaskSpec, TrafficClass};
pub use error::CoreError;
pub use mobility::{free_space_path_loss, MobilityModel};
pub use observation::{ObservationEncoder, OBSERVATION_HIGH, OBSERVATION_LOW};
pub use regression::{transfer_metrics, ThroughputModel};
pub use reward::{RewardBreakdown, RewardEngine, RewardTerm};
pub use traffic::{Demand, Task, TaskGenerator, TaskMetrics};
pub use user::{User, UserPopulation};
