//! PRB to throughput regression and transfer-duration model.
//!
//! Two linear fits, measured on the testbed, map granted PRBs to an expected
//! downlink bit rate:
//!
//! ```text
//! hardware-attached:  rate = (0.4341 * prb + 3.4841) * 1e6   [bit/s]
//! virtualized:        rate = (0.1752 * prb - 0.0648) * 1e6   [bit/s]
//! ```
//!
//! The virtualized fit goes negative below one PRB. Such rates are rejected
//! with `DegenerateRate` instead of being floored, so a broken allocation
//! shows up as an error rather than as a plausible-looking reward.

use crate::config::HardwareClass;
use crate::error::CoreError;
use crate::traffic::{Demand, TaskMetrics};
use ranslice_env::UserId;
use serde::{Deserialize, Serialize};

/// Byte rates at or below this are treated as no throughput at all.
pub const MIN_BYTE_RATE: f64 = 1.0;

/// `rate_mbps = slope * prb + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn new(slope: f64, intercept: f64) -> Self {
        Self { slope, intercept }
    }

    /// Evaluates the fit in Mbit/s.
    pub fn eval_mbps(&self, prb: u32) -> f64 {
        self.slope * prb as f64 + self.intercept
    }
}

/// Hardware-class specific throughput regressions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputModel {
    pub hardware_attached: LinearFit,
    pub virtualized: LinearFit,
}

impl Default for ThroughputModel {
    fn default() -> Self {
        Self {
            hardware_attached: LinearFit::new(0.4341, 3.4841),
            virtualized: LinearFit::new(0.1752, -0.0648),
        }
    }
}

impl ThroughputModel {
    /// Returns the expected bit rate (bit/s). May be negative for tiny grants.
    pub fn expected_bit_rate(&self, hardware: HardwareClass, prb: u32) -> f64 {
        let fit = match hardware {
            HardwareClass::HardwareAttached => &self.hardware_attached,
            HardwareClass::Virtualized => &self.virtualized,
        };
        fit.eval_mbps(prb) * 1e6
    }

    /// Returns the expected byte rate (B/s), rejecting degenerate fits.
    pub fn byte_rate(&self, user: UserId, hardware: HardwareClass, prb: u32) -> Result<f64, CoreError> {
        let rate = self.expected_bit_rate(hardware, prb) / 8.0;
        check_rate(user, rate)?;
        Ok(rate)
    }
}

fn check_rate(user: UserId, rate: f64) -> Result<(), CoreError> {
    if !rate.is_finite() || rate <= MIN_BYTE_RATE {
        return Err(CoreError::DegenerateRate { user, rate });
    }
    Ok(())
}

/// Computes how long the task's gathering-window payload takes at `byte_rate`.
///
/// Burst classes move `gen_size * gen_freq * window` bytes, streaming classes
/// `bit_rate * window`. The returned duration is in milliseconds.
pub fn transfer_metrics(
    user: UserId,
    demand: &Demand,
    byte_rate: f64,
    gathering_duration_secs: f64,
) -> Result<TaskMetrics, CoreError> {
    check_rate(user, byte_rate)?;

    let total_bytes = demand.total_bytes(gathering_duration_secs);
    let duration_secs = total_bytes / byte_rate;

    Ok(TaskMetrics {
        duration_ms: duration_secs * 1000.0,
        bit_rate: byte_rate,
    })
}
