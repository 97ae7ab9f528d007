//! Discrete PRB allocation action space and interference decoder.
//!
//! Each virtualized cell contributes a list of legal splits of its PRB budget
//! among its users; the action space is the Cartesian product of those lists,
//! first cell outermost. An action index is decoded into per-user PRB counts,
//! and every virtualized cell that schedules past its interference threshold
//! removes the excess from the anchor cell's budget.
//!
//! ```text
//! interference(c) = max(0, used(c) - threshold(c))
//! anchor          = max(min_connection, total - sum(interference))
//! ```
//!
//! Enumeration is nested ascending iteration, so indices are stable for a
//! given configuration.

use crate::config::DomainConfig;
use crate::error::CoreError;
use ranslice_env::{CellId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// One virtualized cell's block of the action space.
#[derive(Debug, Clone)]
pub struct CellGroup {
    pub cell_id: CellId,
    pub users: Vec<UserId>,

    /// First PRB that interferes with the anchor, if the cell couples to it
    pub interference_threshold: Option<u32>,

    /// Legal PRB splits, one entry per user, in enumeration order
    pub splits: Vec<Vec<u32>>,
}

/// Concrete per-cell, per-user PRB grants for one interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub action: usize,

    /// cell -> (user -> PRBs)
    pub grants: BTreeMap<CellId, BTreeMap<UserId, u32>>,

    /// PRBs granted to the anchor user
    pub anchor_prbs: u32,

    /// Anchor budget before the connection floor was applied (may be negative)
    pub anchor_available: i64,

    /// True if the connection floor overrode the computed availability
    pub floor_engaged: bool,
}

impl AllocationPlan {
    /// Returns the PRBs granted to a user.
    pub fn prbs_of(&self, user: UserId) -> Option<u32> {
        self.grants.values().find_map(|users| users.get(&user).copied())
    }

    /// Returns the total PRBs granted in a cell.
    pub fn cell_total(&self, cell: CellId) -> u32 {
        self.grants.get(&cell).map(|users| users.values().sum()).unwrap_or(0)
    }
}

/// The enumerated action space of a scenario.
#[derive(Debug, Clone)]
pub struct ActionSpace {
    groups: Vec<CellGroup>,
    anchor_cell: CellId,
    anchor_user: UserId,
    anchor_total: u32,
    min_connection_prbs: u32,
    len: usize,
}

/// Enumerates every split of at most `max` PRBs among `users` users, each
/// receiving at least `min`, in steps of `step`.
///
/// Earlier users vary slowest. For two users this is
/// `u1 in [min, max - min]`, `u2 in [min, max - u1]`.
pub fn enumerate_splits(users: usize, min: u32, max: u32, step: u32) -> Vec<Vec<u32>> {
    fn extend(prefix: &mut Vec<u32>, remaining_users: usize, budget: u32, min: u32, step: u32, out: &mut Vec<Vec<u32>>) {
        if remaining_users == 0 {
            out.push(prefix.clone());
            return;
        }
        // Reserve the minimum for everyone after this user
        let reserved = match u32::try_from(remaining_users - 1).ok().and_then(|n| min.checked_mul(n)) {
            Some(r) => r,
            None => return,
        };
        let upper = match budget.checked_sub(reserved) {
            Some(u) if u >= min => u,
            _ => return,
        };
        let mut prb = min;
        while prb <= upper {
            prefix.push(prb);
            extend(prefix, remaining_users - 1, budget - prb, min, step, out);
            prefix.pop();
            match prb.checked_add(step) {
                Some(next) => prb = next,
                None => break,
            }
        }
    }

    let mut out = Vec::new();
    if users == 0 || step == 0 {
        return out;
    }
    extend(&mut Vec::with_capacity(users), users, max, min, step, &mut out);
    out
}

impl ActionSpace {
    /// Builds the action space for a validated configuration.
    pub fn from_config(config: &DomainConfig) -> Result<Self, CoreError> {
        Self::with_step(config, config.action_step)
    }

    /// Builds the action space with an explicit step size.
    pub fn with_step(config: &DomainConfig, step: u32) -> Result<Self, CoreError> {
        if step == 0 {
            return Err(CoreError::config("action step must be positive"));
        }
        let anchor = config.anchor_cell()?;
        let anchor_user = config
            .users_of(anchor.id)
            .first()
            .copied()
            .ok_or_else(|| CoreError::config(format!("{} serves no user", anchor.id)))?;
        let thresholds = config.anchor_interference_thresholds()?;

        let mut groups = Vec::new();
        for cell in config.virtualized_cells() {
            let users = config.users_of(cell.id);
            let splits = enumerate_splits(users.len(), config.min_user_prbs, cell.total_prb, step);
            if splits.is_empty() {
                return Err(CoreError::config(format!("{} has no legal PRB split", cell.id)));
            }
            groups.push(CellGroup {
                cell_id: cell.id,
                users,
                interference_threshold: thresholds.get(&cell.id).copied(),
                splits,
            });
        }
        if groups.is_empty() {
            return Err(CoreError::config("no virtualized cells to control"));
        }

        let len = groups.iter().map(|g| g.splits.len()).product();

        Ok(Self {
            groups,
            anchor_cell: anchor.id,
            anchor_user,
            anchor_total: anchor.total_prb,
            min_connection_prbs: config.min_connection_prbs,
            len,
        })
    }

    /// Number of actions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn groups(&self) -> &[CellGroup] {
        &self.groups
    }

    pub fn anchor_cell(&self) -> CellId {
        self.anchor_cell
    }

    /// Returns the flattened PRB tuple of an action (virtualized users in
    /// group order), or `None` if the index is out of range.
    pub fn action(&self, index: usize) -> Option<Vec<u32>> {
        if index >= self.len {
            return None;
        }
        let mut out = Vec::new();
        for (group, split) in self.groups.iter().zip(self.split_indices(index)) {
            out.extend_from_slice(&group.splits[split]);
        }
        Some(out)
    }

    /// Iterates all actions in index order.
    pub fn iter(&self) -> impl Iterator<Item = Vec<u32>> + '_ {
        (0..self.len).filter_map(move |i| self.action(i))
    }

    // Mixed-radix digits, first group most significant
    fn split_indices(&self, index: usize) -> Vec<usize> {
        let mut digits = vec![0; self.groups.len()];
        let mut rest = index;
        for (slot, group) in digits.iter_mut().zip(&self.groups).rev() {
            let radix = group.splits.len();
            *slot = rest % radix;
            rest /= radix;
        }
        digits
    }

    /// Decodes an action into per-user grants, charging interference to the anchor.
    ///
    /// Fails with `ActionOutOfRange` for indices outside `[0, len)`.
    pub fn decode(&self, action: usize) -> Result<AllocationPlan, CoreError> {
        if action >= self.len {
            return Err(CoreError::ActionOutOfRange { action, len: self.len });
        }

        let mut grants = BTreeMap::new();
        let mut interference: i64 = 0;

        for (group, split) in self.groups.iter().zip(self.split_indices(action)) {
            let prbs = &group.splits[split];
            let used: u32 = prbs.iter().sum();
            if let Some(threshold) = group.interference_threshold {
                interference += i64::from(used.saturating_sub(threshold));
            }
            let users: BTreeMap<UserId, u32> = group.users.iter().copied().zip(prbs.iter().copied()).collect();
            grants.insert(group.cell_id, users);
        }

        let anchor_available = i64::from(self.anchor_total) - interference;
        let floor = i64::from(self.min_connection_prbs);
        let floor_engaged = anchor_available < floor;
        let anchor_prbs = anchor_available.max(floor).min(i64::from(self.anchor_total)) as u32;

        if floor_engaged {
            debug!("Anchor availability {} below connection floor, granting {}", anchor_available, anchor_prbs);
        }

        let mut anchor = BTreeMap::new();
        anchor.insert(self.anchor_user, anchor_prbs);
        grants.insert(self.anchor_cell, anchor);

        Ok(AllocationPlan {
            action,
            grants,
            anchor_prbs,
            anchor_available,
            floor_engaged,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_two_user_splits_match_nested_loops() {
        let splits = enumerate_splits(2, 8, 52, 4);

        let mut expected = Vec::new();
        let mut u1 = 8;
        while u1 <= 52 - 8 {
            let mut u2 = 8;
            while u2 <= 52 - u1 {
                expected.push(vec![u1, u2]);
                u2 += 4;
            }
            u1 += 4;
        }

        assert_eq!(splits, expected);
        assert_eq!(splits.len(), 55);
        assert_eq!(splits[0], vec![8, 8]);
        assert_eq!(splits[54], vec![44, 8]);
    }

    #[test]
    fn test_reference_action_space_size() {
        let space = ActionSpace::from_config(&DomainConfig::default()).unwrap();
        assert_eq!(space.len(), 55 * 55);
        assert_eq!(space.action(0), Some(vec![8, 8, 8, 8]));
        assert_eq!(space.action(1), Some(vec![8, 8, 8, 12]));
        assert_eq!(space.action(55), Some(vec![8, 12, 8, 8]));
        assert_eq!(space.action(space.len()), None);
    }

    #[test]
    fn test_enumeration_is_stable() {
        let config = DomainConfig::default();
        let a: Vec<Vec<u32>> = ActionSpace::from_config(&config).unwrap().iter().collect();
        let b: Vec<Vec<u32>> = ActionSpace::from_config(&config).unwrap().iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_without_interference() {
        let space = ActionSpace::from_config(&DomainConfig::default()).unwrap();
        let plan = space.decode(0).unwrap();

        // 16 PRBs per virtual cell, below the threshold of 30
        assert_eq!(plan.anchor_prbs, 52);
        assert!(!plan.floor_engaged);
        assert_eq!(plan.prbs_of(UserId(0)), Some(52));
        assert_eq!(plan.prbs_of(UserId(4)), Some(8));
    }

    #[test]
    fn test_decode_charges_interference() {
        let space = ActionSpace::from_config(&DomainConfig::default()).unwrap();
        let index = space
            .iter()
            .position(|a| a == vec![20, 20, 8, 8])
            .unwrap();

        let plan = space.decode(index).unwrap();

        // gNB2 uses 40 -> 10 PRBs of interference
        assert_eq!(plan.anchor_available, 42);
        assert_eq!(plan.anchor_prbs, 42);
        assert_eq!(plan.cell_total(CellId(2)), 40);
    }

    #[test]
    fn test_connection_floor_engages() {
        let space = ActionSpace::from_config(&DomainConfig::default()).unwrap();
        let index = space
            .iter()
            .position(|a| a == vec![44, 8, 44, 8])
            .unwrap();

        let plan = space.decode(index).unwrap();

        // Both cells full: 52 - 22 - 22 = 8
        assert_eq!(plan.anchor_available, 8);
        assert!(!plan.floor_engaged);
        assert_eq!(plan.anchor_prbs, 8);
    }

    #[test]
    fn test_raised_floor_overrides_availability() {
        let mut config = DomainConfig::default();
        config.min_connection_prbs = 12;
        let space = ActionSpace::from_config(&config).unwrap();
        let index = space.len() - 1;

        let plan = space.decode(index).unwrap();

        assert!(plan.anchor_available < 12);
        assert!(plan.floor_engaged);
        assert_eq!(plan.anchor_prbs, 12);
    }

    #[test]
    fn test_out_of_range_action() {
        let space = ActionSpace::from_config(&DomainConfig::default()).unwrap();
        let result = space.decode(space.len());

        assert!(matches!(result, Err(CoreError::ActionOutOfRange { action: 3025, len: 3025 })));
    }

    #[test]
    fn test_uncoupled_cell_adds_no_interference() {
        let mut config = DomainConfig::default();
        config.interference_pairs.retain(|p| p.aggressor != CellId(3));
        let space = ActionSpace::from_config(&config).unwrap();
        let index = space.iter().position(|a| a == vec![8, 8, 44, 8]).unwrap();

        assert_eq!(space.decode(index).unwrap().anchor_prbs, 52);
    }

    #[test]
    fn test_step_near_u32_max_terminates() {
        // One split per user count fits; the next increment would overflow
        assert_eq!(enumerate_splits(1, 8, u32::MAX, u32::MAX), vec![vec![8]]);
        assert_eq!(enumerate_splits(2, 8, 52, u32::MAX), vec![vec![8, 8]]);
        assert!(enumerate_splits(3, u32::MAX, u32::MAX, 1).is_empty());
    }

    #[test]
    fn test_max_step_gives_single_split_per_cell() {
        let space = ActionSpace::with_step(&DomainConfig::default(), u32::MAX).unwrap();

        assert_eq!(space.len(), 1);
        assert_eq!(space.action(0), Some(vec![8, 8, 8, 8]));
    }

    proptest! {
        #[test]
        fn prop_decode_bounds(action in 0usize..3025) {
            let config = DomainConfig::default();
            let space = ActionSpace::from_config(&config).unwrap();
            let plan = space.decode(action).unwrap();

            prop_assert!(plan.anchor_prbs >= config.min_connection_prbs);
            for cell in &config.cells {
                prop_assert!(plan.cell_total(cell.id) <= cell.total_prb);
            }
            for user in &config.users {
                let prbs = plan.prbs_of(user.user_id);
                prop_assert!(prbs.is_some());
                prop_assert!(prbs.unwrap_or(0) >= config.min_user_prbs);
            }
        }

        #[test]
        fn prop_splits_respect_budget(users in 1usize..4, min in 1u32..10, step in 1u32..6) {
            for split in enumerate_splits(users, min, 52, step) {
                prop_assert_eq!(split.len(), users);
                prop_assert!(split.iter().all(|&p| p >= min));
                prop_assert!(split.iter().sum::<u32>() <= 52);
            }
        }
    }
}
