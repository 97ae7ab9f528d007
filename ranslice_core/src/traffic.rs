//! Per-class traffic task generation.
//!
//! Every control interval each user draws one task: a burst pattern
//! (latency-critical and machine-type classes) or a streaming target
//! (broadband classes), together with a snapshot of its channel.

use crate::config::{DomainConfig, TaskSpec, TrafficClass};
use crate::error::CoreError;
use nalgebra::Vector2;
use rand::Rng;
use ranslice_env::{CellId, UserId};
use serde::{Deserialize, Serialize};

/// What a task asks the network to carry during one gathering window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Demand {
    /// `gen_freq` bursts per second of `gen_size` bytes each
    Burst { gen_freq: u64, gen_size: u64 },

    /// Target rate in bytes per second
    Streaming { bit_rate: u64 },
}

impl Demand {
    /// Bytes generated over a window of `secs` seconds.
    pub fn total_bytes(&self, secs: f64) -> f64 {
        match *self {
            Demand::Burst { gen_freq, gen_size } => gen_size as f64 * gen_freq as f64 * secs,
            Demand::Streaming { bit_rate } => bit_rate as f64 * secs,
        }
    }

    /// The raw demand feature: burst size or target rate.
    pub fn magnitude(&self) -> f64 {
        match *self {
            Demand::Burst { gen_size, .. } => gen_size as f64,
            Demand::Streaming { bit_rate } => bit_rate as f64,
        }
    }
}

/// Performance of a task, filled in once the interval resolves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMetrics {
    /// Time to move the window's payload (ms)
    pub duration_ms: f64,

    /// Achieved byte rate (B/s)
    pub bit_rate: f64,
}

/// One user's task for one interval. Never carried across intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub user_id: UserId,
    pub cell_id: CellId,
    pub class: TrafficClass,
    pub demand: Demand,

    /// Position at generation time (m)
    pub position: Vector2<f64>,

    /// Path loss at generation time (dB)
    pub path_loss_db: f64,

    /// Context time at generation (s)
    pub generated_at_secs: f64,

    pub metrics: TaskMetrics,
}

/// Draws tasks for one traffic class.
#[derive(Debug, Clone)]
pub struct TaskGenerator {
    class: TrafficClass,
    spec: TaskSpec,
}

impl TaskGenerator {
    /// Creates a generator for `class` from the scenario's task specs.
    ///
    /// Fails with `InvalidClass` if the class has no usable spec.
    pub fn new(class: TrafficClass, config: &DomainConfig) -> Result<Self, CoreError> {
        let spec = config.task_spec(class)?.clone();
        Ok(Self { class, spec })
    }

    pub fn class(&self) -> TrafficClass {
        self.class
    }

    /// Draws a demand from the class's inclusive ranges.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Demand {
        match &self.spec {
            TaskSpec::Burst { gen_freq, gen_bytes, .. } => Demand::Burst {
                gen_freq: gen_freq.sample(rng),
                gen_size: gen_bytes.sample(rng),
            },
            TaskSpec::Streaming { bit_rate } => Demand::Streaming {
                bit_rate: bit_rate.sample(rng),
            },
        }
    }

    /// Generates a task carrying the given channel snapshot and zeroed metrics.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        user_id: UserId,
        cell_id: CellId,
        position: Vector2<f64>,
        path_loss_db: f64,
        now_secs: f64,
    ) -> Task {
        Task {
            user_id,
            cell_id,
            class: self.class,
            demand: self.draw(rng),
            position,
            path_loss_db,
            generated_at_secs: now_secs,
            metrics: TaskMetrics::default(),
        }
    }
}
