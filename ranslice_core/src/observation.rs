//! Flat observation vector fed to the policy.

use crate::config::{DomainConfig, TrafficClass};
use crate::error::CoreError;
use crate::traffic::Task;
use std::collections::BTreeMap;

/// Features emitted per user: class, normalized demand, normalized path loss.
pub const FEATURES_PER_USER: usize = 3;

/// Declared lower bound of every observation value.
pub const OBSERVATION_LOW: f64 = 0.0;

/// Declared upper bound of every observation value.
pub const OBSERVATION_HIGH: f64 = 10.0;

/// Encodes per-user tasks into `(class, demand / norm, path_loss / norm)`
/// triples, ordered by ascending user id.
#[derive(Debug, Clone)]
pub struct ObservationEncoder {
    demand_norms: BTreeMap<TrafficClass, f64>,
    path_loss_norm: f64,
}

impl ObservationEncoder {
    pub fn from_config(config: &DomainConfig) -> Self {
        Self {
            demand_norms: config
                .task_specs
                .iter()
                .map(|(class, spec)| (*class, spec.demand_norm()))
                .collect(),
            path_loss_norm: config.path_loss_norm,
        }
    }

    /// Length of the vector for `users` users.
    pub fn len_for(users: usize) -> usize {
        users * FEATURES_PER_USER
    }

    pub fn encode(&self, tasks: &[Task]) -> Result<Vec<f64>, CoreError> {
        let mut sorted: Vec<&Task> = tasks.iter().collect();
        sorted.sort_by_key(|t| t.user_id);

        let mut observation = Vec::with_capacity(Self::len_for(sorted.len()));
        for task in sorted {
            let norm = self
                .demand_norms
                .get(&task.class)
                .copied()
                .ok_or_else(|| CoreError::InvalidClass(task.class.name().to_string()))?;
            observation.push(f64::from(task.class.enum_value()));
            observation.push(task.demand.magnitude() / norm);
            observation.push(task.path_loss_db / self.path_loss_norm);
        }
        Ok(observation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traffic::{Demand, TaskMetrics};
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use ranslice_env::{CellId, UserId};

    fn task(user: u32, class: TrafficClass, demand: Demand, path_loss_db: f64) -> Task {
        Task {
            user_id: UserId(user),
            cell_id: CellId(1),
            class,
            demand,
            position: Vector2::zeros(),
            path_loss_db,
            generated_at_secs: 0.0,
            metrics: TaskMetrics::default(),
        }
    }

    #[test]
    fn test_sorted_by_user_id() {
        let encoder = ObservationEncoder::from_config(&DomainConfig::default());
        let tasks = vec![
            task(3, TrafficClass::MachineTypeLow, Demand::Burst { gen_freq: 4, gen_size: 25_000 }, 85.0),
            task(0, TrafficClass::BroadbandHigh, Demand::Streaming { bit_rate: 3_000_000 }, 90.0),
        ];

        let obs = encoder.encode(&tasks).unwrap();

        assert_eq!(obs.len(), 6);
        assert_eq!(obs[0], 1.0);
        assert_relative_eq!(obs[1], 1.0);
        assert_relative_eq!(obs[2], 0.9);
        assert_eq!(obs[3], 4.0);
        assert_relative_eq!(obs[4], 0.5);
        assert_relative_eq!(obs[5], 0.85);
    }

    #[test]
    fn test_unknown_class_norm() {
        let mut config = DomainConfig::default();
        config.task_specs.remove(&TrafficClass::LatencyCritical);
        let encoder = ObservationEncoder::from_config(&config);
        let tasks = vec![task(0, TrafficClass::LatencyCritical, Demand::Burst { gen_freq: 2, gen_size: 1 }, 50.0)];

        assert!(matches!(encoder.encode(&tasks), Err(CoreError::InvalidClass(_))));
    }

    #[test]
    fn test_values_within_declared_bounds() {
        let encoder = ObservationEncoder::from_config(&DomainConfig::default());
        let tasks: Vec<Task> = TrafficClass::ALL
            .iter()
            .enumerate()
            .map(|(i, class)| {
                let demand = if class.is_broadband() {
                    Demand::Streaming { bit_rate: 625_000 }
                } else {
                    Demand::Burst { gen_freq: 2, gen_size: 100_000 }
                };
                task(i as u32, *class, demand, 95.0)
            })
            .collect();

        for value in encoder.encode(&tasks).unwrap() {
            assert!((OBSERVATION_LOW..=OBSERVATION_HIGH).contains(&value));
        }
    }
}
