//! QoS reward shaping.
//!
//! Each user contributes one term comparing expected with realized
//! performance for its class. Terms are clipped to `[-1, 0]`: meeting the
//! target earns nothing extra, missing it costs up to one point. The
//! interval reward is the sum over users, so `N` users give a reward in
//! `[-N, 0]`.
//!
//! | class              | shortfall `m`                                       |
//! |--------------------|-----------------------------------------------------|
//! | latency-critical   | `(target_ms - duration / bursts) / target_ms`       |
//! | broadband          | `(total_bytes / duration_s - rate) / rate`          |
//! | machine-type       | `(got - expected) / expected`, `got = expected * window / duration_s` |

use crate::config::{DomainConfig, TaskSpec, TrafficClass};
use crate::error::CoreError;
use crate::traffic::{Demand, Task};
use ranslice_env::UserId;
use serde::{Deserialize, Serialize};

/// Clips a shortfall into a reward term.
pub fn clip_term(m: f64) -> f64 {
    m.min(0.0).max(-1.0)
}

/// One user's contribution to the interval reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardTerm {
    pub user_id: UserId,
    pub class: TrafficClass,

    /// Unclipped relative shortfall
    pub shortfall: f64,

    /// Clipped term in `[-1, 0]`
    pub term: f64,
}

/// Per-user terms and their sum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub terms: Vec<RewardTerm>,
    pub total: f64,
}

impl RewardBreakdown {
    /// Number of users whose target was fully met.
    pub fn satisfied(&self) -> usize {
        self.terms.iter().filter(|t| t.term == 0.0).count()
    }
}

/// Computes rewards from tasks whose metrics have been filled in.
#[derive(Debug, Clone)]
pub struct RewardEngine {
    gathering_duration_secs: f64,
    latency_target_ms: Option<f64>,
}

impl RewardEngine {
    pub fn from_config(config: &DomainConfig) -> Self {
        let latency_target_ms = match config.task_specs.get(&TrafficClass::LatencyCritical) {
            Some(TaskSpec::Burst { target_interval_ms, .. }) => *target_interval_ms,
            _ => None,
        };
        Self {
            gathering_duration_secs: config.gathering_duration_secs,
            latency_target_ms,
        }
    }

    /// Computes one user's term.
    pub fn user_term(&self, task: &Task) -> Result<RewardTerm, CoreError> {
        let duration_ms = task.metrics.duration_ms;
        if !duration_ms.is_finite() || duration_ms <= 0.0 {
            return Err(CoreError::DegenerateRate { user: task.user_id, rate: task.metrics.bit_rate });
        }
        let window = self.gathering_duration_secs;
        let duration_secs = duration_ms / 1000.0;

        let shortfall = match (task.class, task.demand) {
            (TrafficClass::LatencyCritical, Demand::Burst { gen_freq, .. }) => {
                let target = self
                    .latency_target_ms
                    .ok_or_else(|| CoreError::config("URLLC has no target interval"))?;
                let bursts = gen_freq as f64 * window;
                let avg_interval_ms = duration_ms / bursts;
                (target - avg_interval_ms) / target
            }
            (TrafficClass::BroadbandHigh | TrafficClass::BroadbandLow, Demand::Streaming { bit_rate }) => {
                let target = bit_rate as f64;
                let expected_bytes = target * window;
                let actual_bandwidth = expected_bytes / duration_secs;
                (actual_bandwidth - target) / target
            }
            (TrafficClass::MachineTypeHigh | TrafficClass::MachineTypeLow, demand @ Demand::Burst { .. }) => {
                let expected_bytes = demand.total_bytes(window);
                let got_bytes = expected_bytes * (window / duration_secs);
                (got_bytes - expected_bytes) / expected_bytes
            }
            (class, demand) => {
                return Err(CoreError::InvalidClass(format!("{} cannot carry {:?}", class, demand)));
            }
        };

        Ok(RewardTerm {
            user_id: task.user_id,
            class: task.class,
            shortfall,
            term: clip_term(shortfall),
        })
    }

    /// Reduces all users' metrics to the interval reward.
    pub fn evaluate(&self, tasks: &[Task]) -> Result<RewardBreakdown, CoreError> {
        let terms = tasks
            .iter()
            .map(|task| self.user_term(task))
            .collect::<Result<Vec<_>, _>>()?;
        let total = terms.iter().map(|t| t.term).sum();
        Ok(RewardBreakdown { terms, total })
    }
}
