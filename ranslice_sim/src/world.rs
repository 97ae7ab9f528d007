//! SimWorld - the Gym-style control loop around the allocation engine.
//!
//! One `step` resolves one control interval:
//!
//! ```text
//! pending tasks ─► decode action ─► translate ─► throughput ─► reward
//!                                                               │
//!        next observation ◄── generate tasks ◄── advance mobility ◄┘
//! ```
//!
//! Everything up to and including the mobility plan is computed into locals;
//! state is only committed once every fallible stage has succeeded, so an
//! error leaves the world on the same interval.

use ranslice_core::{
    transfer_metrics, ActionSpace, AllocationPlan, AllocationTranslator, CoreError, DomainConfig,
    ObservationEncoder, RewardBreakdown, RewardEngine, Task, UserPopulation, OBSERVATION_HIGH,
    OBSERVATION_LOW,
};
use ranslice_env::{AllocationRecord, Measurement, RanContext, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Virtual time between two control intervals (seconds)
    pub interval_secs: f64,

    /// Steps per episode
    pub episode_len: u64,

    /// Number of episodes to run
    pub episodes: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            interval_secs: 1.0,
            episode_len: 100,
            episodes: 1,
        }
    }
}

/// Where an interval's throughput comes from.
#[derive(Debug, Clone, Copy)]
pub enum ThroughputSource<'a> {
    /// Expected rate from the PRB regression (offline pre-training)
    Regression,

    /// Rates measured on the radios for this interval
    Measured(&'a [Measurement]),
}

/// Diagnostics of one resolved interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepInfo {
    pub plan: AllocationPlan,
    pub records: Vec<AllocationRecord>,

    /// The interval's tasks with their metrics filled in
    pub tasks: Vec<Task>,

    pub reward: RewardBreakdown,
}

impl StepInfo {
    pub fn anchor_prbs(&self) -> u32 {
        self.plan.anchor_prbs
    }
}

/// Result of one `step`. `done` is always false: episode bounds belong to the driver.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub observation: Vec<f64>,
    pub reward: f64,
    pub done: bool,
    pub info: StepInfo,
}

/// The SimWorld - scenario state plus the engine components that act on it.
pub struct SimWorld<C: RanContext> {
    config: DomainConfig,
    context: Arc<C>,
    action_space: ActionSpace,
    translator: AllocationTranslator,
    rewards: RewardEngine,
    encoder: ObservationEncoder,
    population: UserPopulation,

    /// Tasks generated for the interval about to be resolved
    pending: Vec<Task>,

    /// Resolved tasks since the last reset
    history: Vec<Task>,

    /// Number of resets so far
    epoch: u64,

    step_count: u64,
}

impl<C: RanContext> SimWorld<C> {
    /// Creates a world and generates the first pending tasks.
    pub fn new(config: DomainConfig, context: Arc<C>) -> Result<Self, CoreError> {
        config.validate()?;

        let action_space = ActionSpace::from_config(&config)?;
        let mut population = UserPopulation::spawn(&config, context.as_ref(), 0)?;
        let pending = population.generate_tasks(context.now());

        info!(
            "World ready: {} users, {} actions (seed={})",
            population.len(),
            action_space.len(),
            context.seed()
        );

        Ok(Self {
            translator: AllocationTranslator::from_config(&config),
            rewards: RewardEngine::from_config(&config),
            encoder: ObservationEncoder::from_config(&config),
            action_space,
            population,
            pending,
            history: Vec::new(),
            epoch: 0,
            step_count: 0,
            config,
            context,
        })
    }

    /// Places all users afresh, generates their first tasks and returns the observation.
    pub fn reset(&mut self) -> Result<Vec<f64>, CoreError> {
        let epoch = self.epoch + 1;
        let mut population = UserPopulation::spawn(&self.config, self.context.as_ref(), epoch)?;
        let pending = population.generate_tasks(self.context.now());
        let observation = self.encoder.encode(&pending)?;

        self.population = population;
        self.pending = pending;
        self.history.clear();
        self.epoch = epoch;
        self.step_count = 0;

        debug!("Reset to epoch {}", epoch);
        Ok(observation)
    }

    /// Observation of the pending tasks.
    pub fn observe(&self) -> Result<Vec<f64>, CoreError> {
        self.encoder.encode(&self.pending)
    }

    /// Decodes an action and builds its allocation records without resolving it.
    pub fn plan(&self, action: usize) -> Result<(AllocationPlan, Vec<AllocationRecord>), CoreError> {
        let plan = self.action_space.decode(action)?;
        let path_loss: BTreeMap<UserId, f64> = self.pending.iter().map(|t| (t.user_id, t.path_loss_db)).collect();
        let records = self.translator.translate(&plan, &path_loss)?;
        Ok((plan, records))
    }

    /// Resolves the pending interval under `action`.
    pub fn step(&mut self, action: usize, source: ThroughputSource<'_>) -> Result<StepResult, CoreError> {
        let (plan, records) = self.plan(action)?;

        let mut tasks = self.pending.clone();
        for task in &mut tasks {
            let byte_rate = self.byte_rate(task, &records, source)?;
            task.metrics = transfer_metrics(task.user_id, &task.demand, byte_rate, self.config.gathering_duration_secs)?;
        }
        let reward = self.rewards.evaluate(&tasks)?;

        let now = self.context.now();
        let moves = self.population.plan_moves(now)?;

        // Commit
        self.population.apply_moves(moves);
        self.history.extend(tasks.iter().cloned());
        self.pending = self.population.generate_tasks(now);
        self.step_count += 1;
        let observation = self.encoder.encode(&self.pending)?;

        debug!(
            "Step {}: action={} anchor={} PRBs reward={:.4}",
            self.step_count, action, plan.anchor_prbs, reward.total
        );

        Ok(StepResult {
            observation,
            reward: reward.total,
            done: false,
            info: StepInfo { plan, records, tasks, reward },
        })
    }

    fn byte_rate(&self, task: &Task, records: &[AllocationRecord], source: ThroughputSource<'_>) -> Result<f64, CoreError> {
        match source {
            ThroughputSource::Regression => {
                let record = records
                    .iter()
                    .find(|r| r.id == task.user_id)
                    .ok_or(CoreError::UnknownUser(task.user_id))?;
                let total = self
                    .translator
                    .cell_total(task.cell_id)
                    .ok_or_else(|| CoreError::config(format!("unknown {}", task.cell_id)))?;
                let hardware = self
                    .population
                    .get(task.user_id)
                    .ok_or(CoreError::UnknownUser(task.user_id))?
                    .hardware();
                let prb = self.translator.effective_prbs(record, total);
                self.config.throughput.byte_rate(task.user_id, hardware, prb)
            }
            ThroughputSource::Measured(measurements) => {
                let measurement = measurements
                    .iter()
                    .find(|m| m.id == task.user_id)
                    .ok_or(CoreError::UnknownUser(task.user_id))?;
                Ok(measurement.bytes_per_sec())
            }
        }
    }

    /// Length of the observation vector (3 per user).
    pub fn observation_len(&self) -> usize {
        ObservationEncoder::len_for(self.population.len())
    }

    /// Declared bounds of every observation value.
    pub fn observation_bounds(&self) -> (f64, f64) {
        (OBSERVATION_LOW, OBSERVATION_HIGH)
    }

    pub fn action_count(&self) -> usize {
        self.action_space.len()
    }

    pub fn action_space(&self) -> &ActionSpace {
        &self.action_space
    }

    pub fn config(&self) -> &DomainConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    pub fn population(&self) -> &UserPopulation {
        &self.population
    }

    pub fn pending(&self) -> &[Task] {
        &self.pending
    }

    pub fn history(&self) -> &[Task] {
        &self.history
    }

    /// Returns the current simulation time in seconds.
    pub fn time(&self) -> f64 {
        self.context.now().as_secs_f64()
    }

    /// Steps resolved since the last reset.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }
}
