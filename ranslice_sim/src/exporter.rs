//! JSON exporter for offline training history.
//!
//! Exports every resolved interval (tasks with metrics, allocation records,
//! reward) so a policy can be trained from logged experience.

use crate::world::StepInfo;
use ranslice_core::{RewardTerm, Task};
use ranslice_env::AllocationRecord;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// A single resolved interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub episode: u64,

    /// Simulation time in seconds
    pub time_sec: f64,

    pub action: usize,
    pub anchor_prbs: u32,
    pub floor_engaged: bool,
    pub records: Vec<AllocationRecord>,
    pub tasks: Vec<Task>,
    pub reward: f64,
    pub terms: Vec<RewardTerm>,
}

impl StepRecord {
    pub fn new(episode: u64, time_sec: f64, action: usize, info: StepInfo) -> Self {
        Self {
            episode,
            time_sec,
            action,
            anchor_prbs: info.plan.anchor_prbs,
            floor_engaged: info.plan.floor_engaged,
            records: info.records,
            tasks: info.tasks,
            reward: info.reward.total,
            terms: info.reward.terms,
        }
    }
}

/// Complete run export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All steps
    pub steps: Vec<StepRecord>,
}

impl EpisodeExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            steps: Vec::new(),
        }
    }

    /// Adds a step.
    pub fn add_step(&mut self, step: StepRecord) {
        self.duration_sec = step.time_sec;
        self.steps.push(step);
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
