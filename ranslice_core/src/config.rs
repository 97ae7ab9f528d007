//! Domain configuration - the static description of a scenario.
//!
//! A `DomainConfig` is immutable for the lifetime of a scenario. Its
//! `Default` is the reference three-cell, five-user deployment; other
//! deployments are loaded from JSON and checked with [`DomainConfig::validate`].

use crate::error::CoreError;
use crate::regression::ThroughputModel;
use nalgebra::Vector2;
use rand::Rng;
use ranslice_env::{CellId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Traffic class of a user. Fixed for the lifetime of a scenario.
///
/// Serialized with the slice names the radio side uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TrafficClass {
    /// URLLC: bursts that must each be delivered within a target interval
    LatencyCritical,

    /// eMBB (high tier): streaming at a target byte rate
    BroadbandHigh,

    /// eMBB (low tier)
    BroadbandLow,

    /// mMTC (high tier): periodic sensor bursts
    MachineTypeHigh,

    /// mMTC (low tier)
    MachineTypeLow,
}

impl TrafficClass {
    /// All classes, in enumeration order.
    pub const ALL: [TrafficClass; 5] = [
        TrafficClass::LatencyCritical,
        TrafficClass::BroadbandHigh,
        TrafficClass::BroadbandLow,
        TrafficClass::MachineTypeHigh,
        TrafficClass::MachineTypeLow,
    ];

    /// Returns the slice name.
    pub fn name(&self) -> &'static str {
        match self {
            TrafficClass::LatencyCritical => "URLLC",
            TrafficClass::BroadbandHigh => "eMBB_high",
            TrafficClass::BroadbandLow => "eMBB_low",
            TrafficClass::MachineTypeHigh => "mMTC_high",
            TrafficClass::MachineTypeLow => "mMTC_low",
        }
    }

    /// Returns the numeric value used in observations.
    pub fn enum_value(&self) -> u8 {
        match self {
            TrafficClass::LatencyCritical => 0,
            TrafficClass::BroadbandHigh => 1,
            TrafficClass::BroadbandLow => 2,
            TrafficClass::MachineTypeHigh => 3,
            TrafficClass::MachineTypeLow => 4,
        }
    }

    /// Returns true for classes that generate bursts (size x frequency).
    pub fn is_burst(&self) -> bool {
        !self.is_broadband()
    }

    /// Returns true for the streaming classes.
    pub fn is_broadband(&self) -> bool {
        matches!(self, TrafficClass::BroadbandHigh | TrafficClass::BroadbandLow)
    }
}

impl std::fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for TrafficClass {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "URLLC" | "urllc" | "latency_critical" => Ok(TrafficClass::LatencyCritical),
            "eMBB_high" | "embb_high" | "broadband_high" => Ok(TrafficClass::BroadbandHigh),
            "eMBB_low" | "embb_low" | "broadband_low" => Ok(TrafficClass::BroadbandLow),
            "mMTC_high" | "mmtc_high" | "machine_type_high" => Ok(TrafficClass::MachineTypeHigh),
            "mMTC_low" | "mmtc_low" | "machine_type_low" => Ok(TrafficClass::MachineTypeLow),
            _ => Err(CoreError::InvalidClass(s.to_string())),
        }
    }
}

impl TryFrom<String> for TrafficClass {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TrafficClass> for String {
    fn from(class: TrafficClass) -> Self {
        class.name().to_string()
    }
}

/// Hardware class of a cell, which selects its throughput regression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HardwareClass {
    /// SDR-backed gNB. The anchor: its capacity is what interference leaves.
    HardwareAttached,

    /// Software gNB whose PRB split the action decides directly
    Virtualized,
}

/// Axis-aligned rectangle, inclusive on all edges.
///
/// Used both for user areas (meters) and velocity bounds (m/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Rect {
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self { x_min, x_max, y_min, y_max }
    }

    /// Returns true if the point lies inside or on the boundary.
    pub fn contains(&self, p: &Vector2<f64>) -> bool {
        self.x_min <= p.x && p.x <= self.x_max && self.y_min <= p.y && p.y <= self.y_max
    }

    /// Draws a point uniformly from the rectangle.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vector2<f64> {
        Vector2::new(
            rng.gen_range(self.x_min..=self.x_max),
            rng.gen_range(self.y_min..=self.y_max),
        )
    }

    fn is_valid(&self) -> bool {
        [self.x_min, self.x_max, self.y_min, self.y_max].iter().all(|v| v.is_finite())
            && self.x_min <= self.x_max
            && self.y_min <= self.y_max
    }
}

/// Inclusive integer range for task generation draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub min: u64,
    pub max: u64,
}

impl IntRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Draws uniformly from `[min, max]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Half-open PRB index range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrbRange {
    pub start: u32,
    pub end: u32,
}

impl PrbRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-class task generation ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskSpec {
    /// Bursts of `gen_bytes` bytes, `gen_freq` times per second
    Burst {
        gen_freq: IntRange,
        gen_bytes: IntRange,
        /// Per-burst delivery target, required for latency-critical users
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_interval_ms: Option<f64>,
    },

    /// Continuous stream at `bit_rate` bytes per second
    Streaming { bit_rate: IntRange },
}

impl TaskSpec {
    /// Returns the divisor that normalizes this class's demand feature.
    pub fn demand_norm(&self) -> f64 {
        match self {
            TaskSpec::Burst { gen_bytes, .. } => gen_bytes.max as f64,
            TaskSpec::Streaming { bit_rate } => bit_rate.max as f64,
        }
    }

    fn matches(&self, class: TrafficClass) -> bool {
        match self {
            TaskSpec::Burst { .. } => class.is_burst(),
            TaskSpec::Streaming { .. } => class.is_broadband(),
        }
    }
}

/// A radio cell (gNB).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellConfig {
    pub id: CellId,

    /// Antenna position in meters
    pub position: Vector2<f64>,

    pub hardware: HardwareClass,

    /// Total PRB budget of the carrier
    pub total_prb: u32,

    /// Carrier bandwidth in MHz
    pub bandwidth_mhz: f64,

    /// Rectangle the cell's users move within
    pub user_area: Rect,
}

/// Binding of a user to its cell and traffic class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserScenario {
    pub user_id: UserId,
    pub cell_id: CellId,
    pub class: TrafficClass,
}

/// Static interference coupling between two cells.
///
/// If the aggressor schedules PRBs inside `aggressor_prbs`, the matching
/// PRBs in `victim_prbs` are unusable by the victim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterferencePair {
    pub aggressor: CellId,
    pub victim: CellId,
    pub aggressor_prbs: PrbRange,
    pub victim_prbs: PrbRange,
}

/// Static scenario description consumed by every engine component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub cells: Vec<CellConfig>,

    /// Bounds velocities are drawn from (m/s)
    pub velocity_bounds: Rect,

    pub users: Vec<UserScenario>,

    pub task_specs: BTreeMap<TrafficClass, TaskSpec>,

    pub interference_pairs: Vec<InterferencePair>,

    /// PRB granularity of the action space
    pub action_step: u32,

    /// Minimum PRBs any action grants a virtualized-cell user
    pub min_user_prbs: u32,

    /// Floor on the anchor cell's grant, whatever interference leaves.
    /// A connectivity policy, not a capacity guarantee.
    pub min_connection_prbs: u32,

    /// Lowest max/min PRB ratio (percent) a slice is configured with
    pub prb_ratio_floor: u32,

    /// Dedicated PRB ratio (percent) of every slice
    pub dedicated_prb_ratio: u32,

    /// Carrier-frequency term of the free-space path loss (dB)
    pub path_loss_constant_db: f64,

    /// Length of one data-gathering window (seconds)
    pub gathering_duration_secs: f64,

    /// Divisor normalizing path loss in observations
    pub path_loss_norm: f64,

    /// Velocity redraw budget of one mobility step
    pub max_velocity_redraws: u32,

    pub throughput: ThroughputModel,
}

impl Default for DomainConfig {
    fn default() -> Self {
        let cells = vec![
            CellConfig {
                id: CellId(1),
                position: Vector2::new(0.0, 0.0),
                hardware: HardwareClass::HardwareAttached,
                total_prb: 52,
                bandwidth_mhz: 10.0,
                user_area: Rect::new(75.0, 175.0, 160.0, 260.0),
            },
            CellConfig {
                id: CellId(2),
                position: Vector2::new(250.0, 433.0),
                hardware: HardwareClass::Virtualized,
                total_prb: 52,
                bandwidth_mhz: 10.0,
                user_area: Rect::new(200.0, 300.0, 100.0, 200.0),
            },
            CellConfig {
                id: CellId(3),
                position: Vector2::new(500.0, 0.0),
                hardware: HardwareClass::Virtualized,
                total_prb: 52,
                bandwidth_mhz: 10.0,
                user_area: Rect::new(200.0, 300.0, -50.0, 50.0),
            },
        ];

        let users = vec![
            UserScenario { user_id: UserId(0), cell_id: CellId(1), class: TrafficClass::BroadbandHigh },
            UserScenario { user_id: UserId(1), cell_id: CellId(2), class: TrafficClass::BroadbandLow },
            UserScenario { user_id: UserId(2), cell_id: CellId(2), class: TrafficClass::BroadbandLow },
            UserScenario { user_id: UserId(3), cell_id: CellId(3), class: TrafficClass::MachineTypeLow },
            UserScenario { user_id: UserId(4), cell_id: CellId(3), class: TrafficClass::MachineTypeLow },
        ];

        let mut task_specs = BTreeMap::new();
        task_specs.insert(
            TrafficClass::LatencyCritical,
            TaskSpec::Burst {
                gen_freq: IntRange::new(2, 2),
                gen_bytes: IntRange::new(100_000, 200_000),
                target_interval_ms: Some(500.0),
            },
        );
        // 5 Mbps - 24 Mbps
        task_specs.insert(
            TrafficClass::BroadbandHigh,
            TaskSpec::Streaming { bit_rate: IntRange::new(625_000, 3_000_000) },
        );
        // 1.5 Mbps - 8.5 Mbps
        task_specs.insert(
            TrafficClass::BroadbandLow,
            TaskSpec::Streaming { bit_rate: IntRange::new(187_500, 1_062_500) },
        );
        for class in [TrafficClass::MachineTypeHigh, TrafficClass::MachineTypeLow] {
            task_specs.insert(
                class,
                TaskSpec::Burst {
                    gen_freq: IntRange::new(4, 4),
                    gen_bytes: IntRange::new(25_000, 50_000),
                    target_interval_ms: None,
                },
            );
        }

        let interference_pairs = vec![
            InterferencePair {
                aggressor: CellId(2),
                victim: CellId(1),
                aggressor_prbs: PrbRange::new(30, 52),
                victim_prbs: PrbRange::new(0, 22),
            },
            InterferencePair {
                aggressor: CellId(3),
                victim: CellId(1),
                aggressor_prbs: PrbRange::new(30, 52),
                victim_prbs: PrbRange::new(30, 52),
            },
        ];

        Self {
            cells,
            velocity_bounds: Rect::new(-10.0, 10.0, -10.0, 10.0),
            users,
            task_specs,
            interference_pairs,
            action_step: 4,
            min_user_prbs: 8,
            min_connection_prbs: 8,
            prb_ratio_floor: 15,
            dedicated_prb_ratio: 100,
            path_loss_constant_db: 37.75,
            gathering_duration_secs: 1.0,
            path_loss_norm: 100.0,
            max_velocity_redraws: 1000,
            throughput: ThroughputModel::default(),
        }
    }
}

impl DomainConfig {
    /// Parses a configuration from JSON and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::config(format!("parse failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a configuration file and validates it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CoreError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| CoreError::config(format!("serialize failed: {}", e)))
    }

    /// Returns the cell with the given id.
    pub fn cell(&self, id: CellId) -> Option<&CellConfig> {
        self.cells.iter().find(|c| c.id == id)
    }

    /// Returns the hardware-attached (anchor) cell.
    pub fn anchor_cell(&self) -> Result<&CellConfig, CoreError> {
        let mut anchors = self.cells.iter().filter(|c| c.hardware == HardwareClass::HardwareAttached);
        match (anchors.next(), anchors.next()) {
            (Some(anchor), None) => Ok(anchor),
            (None, _) => Err(CoreError::config("no hardware-attached cell")),
            (Some(_), Some(_)) => Err(CoreError::config("more than one hardware-attached cell")),
        }
    }

    /// Returns the virtualized cells in ascending id order.
    pub fn virtualized_cells(&self) -> Vec<&CellConfig> {
        let mut cells: Vec<&CellConfig> = self
            .cells
            .iter()
            .filter(|c| c.hardware == HardwareClass::Virtualized)
            .collect();
        cells.sort_by_key(|c| c.id);
        cells
    }

    /// Returns the users bound to a cell in ascending id order.
    pub fn users_of(&self, cell: CellId) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self
            .users
            .iter()
            .filter(|u| u.cell_id == cell)
            .map(|u| u.user_id)
            .collect();
        ids.sort();
        ids
    }

    /// Returns the task spec of a class.
    ///
    /// Fails with `InvalidClass` if the class has no spec or the spec's
    /// shape does not fit the class.
    pub fn task_spec(&self, class: TrafficClass) -> Result<&TaskSpec, CoreError> {
        match self.task_specs.get(&class) {
            Some(spec) if spec.matches(class) => Ok(spec),
            Some(_) => Err(CoreError::InvalidClass(format!("{} has a mismatched task spec", class))),
            None => Err(CoreError::InvalidClass(format!("{} has no task spec", class))),
        }
    }

    /// Returns the interference thresholds toward the anchor, keyed by aggressor.
    ///
    /// The threshold is the first aggressor PRB that lands on the victim.
    pub fn anchor_interference_thresholds(&self) -> Result<BTreeMap<CellId, u32>, CoreError> {
        let anchor = self.anchor_cell()?.id;
        Ok(self
            .interference_pairs
            .iter()
            .filter(|p| p.victim == anchor)
            .map(|p| (p.aggressor, p.aggressor_prbs.start))
            .collect())
    }

    /// Checks every structural invariant the engine relies on.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.cells.is_empty() {
            return Err(CoreError::config("no cells"));
        }
        let mut cell_ids = BTreeSet::new();
        for cell in &self.cells {
            if !cell_ids.insert(cell.id) {
                return Err(CoreError::config(format!("duplicate cell {}", cell.id)));
            }
            if cell.total_prb == 0 {
                return Err(CoreError::config(format!("{} has no PRBs", cell.id)));
            }
            if !cell.user_area.is_valid() {
                return Err(CoreError::config(format!("{} has an invalid user area", cell.id)));
            }
        }
        let anchor = self.anchor_cell()?;

        if !self.velocity_bounds.is_valid() {
            return Err(CoreError::config("invalid velocity bounds"));
        }

        if self.users.is_empty() {
            return Err(CoreError::config("no users"));
        }
        let mut user_ids = BTreeSet::new();
        for user in &self.users {
            if !user_ids.insert(user.user_id) {
                return Err(CoreError::config(format!("duplicate user {}", user.user_id)));
            }
            if self.cell(user.cell_id).is_none() {
                return Err(CoreError::config(format!(
                    "{} bound to unknown cell {}",
                    user.user_id, user.cell_id
                )));
            }
            let spec = self.task_spec(user.class)?;
            if let TaskSpec::Burst { target_interval_ms, .. } = spec {
                if user.class == TrafficClass::LatencyCritical
                    && !target_interval_ms.is_some_and(|t| t > 0.0)
                {
                    return Err(CoreError::config("URLLC needs a positive target_interval_ms"));
                }
            }
        }

        for spec in self.task_specs.values() {
            let ranges = match spec {
                TaskSpec::Burst { gen_freq, gen_bytes, .. } => vec![*gen_freq, *gen_bytes],
                TaskSpec::Streaming { bit_rate } => vec![*bit_rate],
            };
            if ranges.iter().any(|r| r.min == 0 || r.min > r.max) {
                return Err(CoreError::config("task ranges need 1 <= min <= max"));
            }
            if let TaskSpec::Burst { gen_freq, gen_bytes, .. } = spec {
                if gen_freq.max.checked_mul(gen_bytes.max).is_none() {
                    return Err(CoreError::config("burst rate overflows bytes per second"));
                }
            }
        }

        if self.users_of(anchor.id).len() != 1 {
            return Err(CoreError::config(format!("{} must serve exactly one user", anchor.id)));
        }
        if self.min_connection_prbs > anchor.total_prb {
            return Err(CoreError::config("min_connection_prbs exceeds the anchor budget"));
        }

        if self.action_step == 0 {
            return Err(CoreError::config("action_step must be positive"));
        }
        let virtualized = self.virtualized_cells();
        if virtualized.is_empty() {
            return Err(CoreError::config("no virtualized cells"));
        }
        for cell in virtualized {
            if self.action_step > cell.total_prb {
                return Err(CoreError::config(format!(
                    "action_step {} exceeds the {} PRBs of {}",
                    self.action_step, cell.total_prb, cell.id
                )));
            }
            let n = self.users_of(cell.id).len();
            if n == 0 {
                return Err(CoreError::config(format!("{} serves no users", cell.id)));
            }
            let required = u32::try_from(n)
                .ok()
                .and_then(|n| n.checked_mul(self.min_user_prbs))
                .ok_or_else(|| CoreError::config(format!("{} minimum PRB demand overflows", cell.id)))?;
            if required > cell.total_prb {
                return Err(CoreError::config(format!(
                    "{} cannot grant {} PRBs to each of {} users",
                    cell.id, self.min_user_prbs, n
                )));
            }
        }

        for pair in &self.interference_pairs {
            let aggressor = self.cell(pair.aggressor).ok_or_else(|| {
                CoreError::config(format!("interference from unknown cell {}", pair.aggressor))
            })?;
            if self.cell(pair.victim).is_none() {
                return Err(CoreError::config(format!("interference on unknown cell {}", pair.victim)));
            }
            if pair.aggressor_prbs.start > pair.aggressor_prbs.end
                || pair.aggressor_prbs.end > aggressor.total_prb
            {
                return Err(CoreError::config(format!("bad aggressor range for {}", pair.aggressor)));
            }
        }

        if self.prb_ratio_floor > 100 || self.dedicated_prb_ratio > 100 {
            return Err(CoreError::config("PRB ratios are percentages"));
        }
        if !(self.gathering_duration_secs > 0.0) || !(self.path_loss_norm > 0.0) {
            return Err(CoreError::config("gathering duration and path loss norm must be positive"));
        }
        if self.max_velocity_redraws == 0 {
            return Err(CoreError::config("max_velocity_redraws must be positive"));
        }

        Ok(())
    }
}
