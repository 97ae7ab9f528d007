//! User mobility and free-space channel model.
//!
//! Users move at constant velocity inside their cell's rectangle. When a
//! step would leave the rectangle the velocity is redrawn and the step
//! retried (rejection sampling); positions are never clipped or reflected.
//! Path loss follows the free-space model
//!
//! ```text
//! PL [dB] = 20 * log10(max(d, 1.0)) + C
//! ```
//!
//! where `C` folds in the carrier frequency (37.75 dB at 1842.5 MHz with `d`
//! in meters).

use crate::config::{CellConfig, Rect};
use crate::error::CoreError;
use nalgebra::Vector2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Free-space path loss in dB, with distance floored at 1.0.
pub fn free_space_path_loss(distance: f64, constant_db: f64) -> f64 {
    20.0 * distance.max(1.0).log10() + constant_db
}

/// Outcome of a mobility step, computed before it is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MobilityStep {
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,

    /// Velocity redraws needed to stay in bounds
    pub redraws: u32,
}

/// Position, velocity and derived path loss of one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobilityModel {
    position: Vector2<f64>,
    velocity: Vector2<f64>,
    area: Rect,
    velocity_bounds: Rect,
    cell_position: Vector2<f64>,
    path_loss_constant_db: f64,
    path_loss_db: f64,
    max_redraws: u32,
}

impl MobilityModel {
    /// Places a user uniformly inside its cell's area with a random velocity.
    pub fn spawn<R: Rng + ?Sized>(
        cell: &CellConfig,
        velocity_bounds: Rect,
        path_loss_constant_db: f64,
        max_redraws: u32,
        rng: &mut R,
    ) -> Self {
        let position = cell.user_area.sample(rng);
        let velocity = velocity_bounds.sample(rng);
        Self::from_parts(cell, position, velocity, velocity_bounds, path_loss_constant_db, max_redraws)
    }

    /// Creates a model at a known state.
    ///
    /// The position must lie inside the cell's area.
    pub fn with_state(
        cell: &CellConfig,
        position: Vector2<f64>,
        velocity: Vector2<f64>,
        velocity_bounds: Rect,
        path_loss_constant_db: f64,
        max_redraws: u32,
    ) -> Result<Self, CoreError> {
        if !cell.user_area.contains(&position) {
            return Err(CoreError::config(format!(
                "position ({:.1}, {:.1}) outside the area of {}",
                position.x, position.y, cell.id
            )));
        }
        Ok(Self::from_parts(cell, position, velocity, velocity_bounds, path_loss_constant_db, max_redraws))
    }

    fn from_parts(
        cell: &CellConfig,
        position: Vector2<f64>,
        velocity: Vector2<f64>,
        velocity_bounds: Rect,
        path_loss_constant_db: f64,
        max_redraws: u32,
    ) -> Self {
        let mut model = Self {
            position,
            velocity,
            area: cell.user_area,
            velocity_bounds,
            cell_position: cell.position,
            path_loss_constant_db,
            path_loss_db: 0.0,
            max_redraws,
        };
        model.recompute_path_loss();
        model
    }

    pub fn position(&self) -> Vector2<f64> {
        self.position
    }

    pub fn velocity(&self) -> Vector2<f64> {
        self.velocity
    }

    pub fn area(&self) -> &Rect {
        &self.area
    }

    /// Current path loss (dB).
    pub fn path_loss_db(&self) -> f64 {
        self.path_loss_db
    }

    /// Distance to the serving cell (m).
    pub fn distance_to_cell(&self) -> f64 {
        (self.position - self.cell_position).norm()
    }

    /// Computes the next in-bound position without applying it.
    ///
    /// Fails with `MobilityExhausted` once the redraw budget is spent.
    pub fn plan_step<R: Rng + ?Sized>(&self, elapsed_secs: f64, rng: &mut R) -> Result<MobilityStep, CoreError> {
        let dt = elapsed_secs.max(0.0);
        let mut velocity = self.velocity;

        for redraws in 0..=self.max_redraws {
            let candidate = self.position + velocity * dt;
            if self.area.contains(&candidate) {
                return Ok(MobilityStep { position: candidate, velocity, redraws });
            }
            velocity = self.velocity_bounds.sample(rng);
        }

        Err(CoreError::MobilityExhausted { attempts: self.max_redraws })
    }

    /// Applies a planned step and recomputes path loss.
    pub fn apply(&mut self, step: MobilityStep) {
        self.position = step.position;
        self.velocity = step.velocity;
        self.recompute_path_loss();
    }

    /// Plans and applies a step. Returns the number of velocity redraws.
    pub fn advance<R: Rng + ?Sized>(&mut self, elapsed_secs: f64, rng: &mut R) -> Result<u32, CoreError> {
        let step = self.plan_step(elapsed_secs, rng)?;
        if step.redraws > 0 {
            debug!("Velocity redrawn {} times to stay inside the cell area", step.redraws);
        }
        self.apply(step);
        Ok(step.redraws)
    }

    fn recompute_path_loss(&mut self) {
        self.path_loss_db = free_space_path_loss(self.distance_to_cell(), self.path_loss_constant_db);
    }
}
