//! Translation of PRB grants into ratio-based slice configuration records.

use crate::action_space::AllocationPlan;
use crate::config::DomainConfig;
use crate::error::CoreError;
use ranslice_env::{AllocationRecord, CellId, UserId};
use std::collections::BTreeMap;

/// Converts PRB counts into `min/max/dedicated` PRB ratios.
///
/// `max_prb_ratio = trunc(clamp(floor, 100, prb / total * 100))`, so
/// `floor <= min_prb_ratio <= max_prb_ratio <= 100` holds for any grant,
/// including zero and grants above the cell budget.
#[derive(Debug, Clone)]
pub struct AllocationTranslator {
    cell_totals: BTreeMap<CellId, u32>,
    ratio_floor: u32,
    dedicated_ratio: u32,
}

impl AllocationTranslator {
    pub fn from_config(config: &DomainConfig) -> Self {
        Self {
            cell_totals: config.cells.iter().map(|c| (c.id, c.total_prb)).collect(),
            ratio_floor: config.prb_ratio_floor,
            dedicated_ratio: config.dedicated_prb_ratio,
        }
    }

    /// Returns the max PRB ratio for `prb` out of `total`.
    pub fn max_ratio(&self, prb: u32, total: u32) -> u32 {
        let raw = if total == 0 { 0.0 } else { prb as f64 / total as f64 * 100.0 };
        raw.clamp(self.ratio_floor as f64, 100.0) as u32
    }

    /// Returns the PRBs the radio will actually schedule for a record.
    pub fn effective_prbs(&self, record: &AllocationRecord, total: u32) -> u32 {
        (record.max_prb_ratio as f64 / 100.0 * total as f64) as u32
    }

    /// Returns the PRB budget of a cell.
    pub fn cell_total(&self, cell: CellId) -> Option<u32> {
        self.cell_totals.get(&cell).copied()
    }

    /// Builds one record per granted user, in cell then user order.
    ///
    /// Fails with `UnknownUser` if a granted user has no path-loss entry.
    pub fn translate(
        &self,
        plan: &AllocationPlan,
        path_loss: &BTreeMap<UserId, f64>,
    ) -> Result<Vec<AllocationRecord>, CoreError> {
        let mut records = Vec::new();

        for (cell, users) in &plan.grants {
            let total = self
                .cell_total(*cell)
                .ok_or_else(|| CoreError::config(format!("grant for unknown cell {}", cell)))?;

            for (user, prbs) in users {
                let loss = path_loss.get(user).copied().ok_or(CoreError::UnknownUser(*user))?;
                records.push(AllocationRecord {
                    id: *user,
                    min_prb_ratio: self.ratio_floor,
                    max_prb_ratio: self.max_ratio(*prbs, total),
                    ded_prb_ratio: self.dedicated_ratio,
                    pathloss: loss,
                });
            }
        }

        Ok(records)
    }
}
