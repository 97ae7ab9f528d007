//! User population: mobility, task generation and per-user entropy.

use crate::config::{DomainConfig, HardwareClass, TrafficClass};
use crate::error::CoreError;
use crate::mobility::{MobilityModel, MobilityStep};
use crate::traffic::{Task, TaskGenerator};
use ranslice_env::{CellId, RanContext, UserId};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;
use tracing::debug;

/// First RNG stream used for users; user `n` draws from `USER_STREAM_BASE + n`.
pub const USER_STREAM_BASE: u64 = 0x1000;

/// Returns the RNG stream of a user in a given population epoch.
pub fn user_stream(user: UserId, epoch: u64) -> u64 {
    epoch.wrapping_mul(0x9e3779b97f4a7c15) ^ (USER_STREAM_BASE + u64::from(user.0))
}

/// A simulated user equipment.
#[derive(Debug, Clone)]
pub struct User {
    id: UserId,
    cell_id: CellId,
    hardware: HardwareClass,
    mobility: MobilityModel,
    generator: TaskGenerator,
    rng: ChaCha8Rng,

    /// Context time of the last mobility update
    last_update: Duration,
}

impl User {
    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn cell_id(&self) -> CellId {
        self.cell_id
    }

    pub fn class(&self) -> TrafficClass {
        self.generator.class()
    }

    pub fn hardware(&self) -> HardwareClass {
        self.hardware
    }

    pub fn mobility(&self) -> &MobilityModel {
        &self.mobility
    }

    /// Draws this interval's task with the current channel snapshot.
    pub fn generate_task(&mut self, now: Duration) -> Task {
        self.generator.generate(
            &mut self.rng,
            self.id,
            self.cell_id,
            self.mobility.position(),
            self.mobility.path_loss_db(),
            now.as_secs_f64(),
        )
    }

    /// Plans the move covering `now - last_update` without touching any state.
    ///
    /// Redraws consume a clone of the user's RNG; [`User::apply_move`]
    /// commits the advanced RNG together with the step.
    pub fn plan_move(&self, now: Duration) -> Result<PlannedMove, CoreError> {
        let elapsed = now.saturating_sub(self.last_update).as_secs_f64();
        let mut rng = self.rng.clone();
        let step = self.mobility.plan_step(elapsed, &mut rng)?;
        Ok(PlannedMove { step, rng, at: now })
    }

    /// Commits a planned move.
    pub fn apply_move(&mut self, planned: PlannedMove) {
        if planned.step.redraws > 0 {
            debug!("{} redrew velocity {} times", self.id, planned.step.redraws);
        }
        self.mobility.apply(planned.step);
        self.rng = planned.rng;
        self.last_update = planned.at;
    }
}

/// A mobility step with the RNG state it leaves behind.
#[derive(Debug, Clone)]
pub struct PlannedMove {
    step: MobilityStep,
    rng: ChaCha8Rng,
    at: Duration,
}

impl PlannedMove {
    pub fn step(&self) -> &MobilityStep {
        &self.step
    }
}

/// All users of a scenario, ordered by user id.
#[derive(Debug, Clone)]
pub struct UserPopulation {
    users: Vec<User>,
}

impl UserPopulation {
    /// Places every user uniformly inside its cell's area.
    ///
    /// Each user's draws come from its own stream of `ctx`, so a user's
    /// trajectory depends only on the seed, the epoch and its id. Drivers
    /// bump `epoch` on every reset to get a fresh placement.
    pub fn spawn(config: &DomainConfig, ctx: &dyn RanContext, epoch: u64) -> Result<Self, CoreError> {
        let now = ctx.now();
        let mut users = Vec::with_capacity(config.users.len());

        for scenario in &config.users {
            let cell = config
                .cell(scenario.cell_id)
                .ok_or_else(|| CoreError::config(format!("{} bound to unknown {}", scenario.user_id, scenario.cell_id)))?;
            let mut rng = ctx.derive_rng(user_stream(scenario.user_id, epoch));
            let mobility = MobilityModel::spawn(
                cell,
                config.velocity_bounds,
                config.path_loss_constant_db,
                config.max_velocity_redraws,
                &mut rng,
            );
            users.push(User {
                id: scenario.user_id,
                cell_id: cell.id,
                hardware: cell.hardware,
                mobility,
                generator: TaskGenerator::new(scenario.class, config)?,
                rng,
                last_update: now,
            });
        }

        users.sort_by_key(|u| u.id);
        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Generates one task per user.
    pub fn generate_tasks(&mut self, now: Duration) -> Vec<Task> {
        self.users.iter_mut().map(|u| u.generate_task(now)).collect()
    }

    /// Plans every user's move. Fails without mutating if any user fails.
    pub fn plan_moves(&self, now: Duration) -> Result<Vec<PlannedMove>, CoreError> {
        self.users.iter().map(|u| u.plan_move(now)).collect()
    }

    /// Commits moves returned by [`UserPopulation::plan_moves`].
    pub fn apply_moves(&mut self, moves: Vec<PlannedMove>) {
        for (user, planned) in self.users.iter_mut().zip(moves) {
            user.apply_move(planned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use std::sync::Mutex;
    use std::time::SystemTime;

    struct FixedContext {
        seed: u64,
        now: Mutex<Duration>,
    }

    impl FixedContext {
        fn new(seed: u64) -> Self {
            Self { seed, now: Mutex::new(Duration::ZERO) }
        }

        fn set(&self, t: Duration) {
            *self.now.lock().unwrap() = t;
        }
    }

    impl RanContext for FixedContext {
        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        fn system_time(&self) -> SystemTime {
            SystemTime::UNIX_EPOCH
        }

        fn derive_rng(&self, stream: u64) -> ChaCha8Rng {
            ChaCha8Rng::seed_from_u64(self.seed ^ stream)
        }

        fn seed(&self) -> u64 {
            self.seed
        }
    }

    #[test]
    fn test_spawn_places_users_in_their_cells() {
        let config = DomainConfig::default();
        let population = UserPopulation::spawn(&config, &FixedContext::new(5), 0).unwrap();

        assert_eq!(population.len(), 5);
        for user in population.iter() {
            let cell = config.cell(user.cell_id()).unwrap();
            assert!(cell.user_area.contains(&user.mobility().position()));
        }
        let ids: Vec<u32> = population.iter().map(|u| u.id().0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_same_seed_same_population() {
        let config = DomainConfig::default();
        let a = UserPopulation::spawn(&config, &FixedContext::new(99), 0).unwrap();
        let b = UserPopulation::spawn(&config, &FixedContext::new(99), 0).unwrap();

        for (ua, ub) in a.iter().zip(b.iter()) {
            assert_eq!(ua.mobility().position(), ub.mobility().position());
            assert_eq!(ua.mobility().velocity(), ub.mobility().velocity());
        }
    }

    #[test]
    fn test_epochs_draw_new_placements() {
        let config = DomainConfig::default();
        let ctx = FixedContext::new(99);
        let a = UserPopulation::spawn(&config, &ctx, 0).unwrap();
        let b = UserPopulation::spawn(&config, &ctx, 1).unwrap();

        let same = a.iter().zip(b.iter()).all(|(ua, ub)| ua.mobility().position() == ub.mobility().position());
        assert!(!same);
    }

    #[test]
    fn test_planning_does_not_move_users() {
        let config = DomainConfig::default();
        let ctx = FixedContext::new(1);
        let mut population = UserPopulation::spawn(&config, &ctx, 0).unwrap();
        let before: Vec<_> = population.iter().map(|u| u.mobility().position()).collect();

        let moves = population.plan_moves(Duration::from_secs(1)).unwrap();
        let after_plan: Vec<_> = population.iter().map(|u| u.mobility().position()).collect();
        assert_eq!(before, after_plan);

        population.apply_moves(moves);
        let moved = population.iter().zip(before.iter()).any(|(u, p)| u.mobility().position() != *p);
        assert!(moved);
    }

    #[test]
    fn test_elapsed_time_drives_displacement() {
        let config = DomainConfig::default();
        let ctx = FixedContext::new(2);
        let mut population = UserPopulation::spawn(&config, &ctx, 0).unwrap();

        // No time passed: nobody moves
        let before: Vec<_> = population.iter().map(|u| u.mobility().position()).collect();
        let moves = population.plan_moves(Duration::ZERO).unwrap();
        population.apply_moves(moves);
        let after: Vec<_> = population.iter().map(|u| u.mobility().position()).collect();
        assert_eq!(before, after);

        ctx.set(Duration::from_secs(3));
        let moves = population.plan_moves(ctx.now()).unwrap();
        population.apply_moves(moves);
        for user in population.iter() {
            let cell = config.cell(user.cell_id()).unwrap();
            assert!(cell.user_area.contains(&user.mobility().position()));
        }
    }

    #[test]
    fn test_tasks_follow_user_classes() {
        let config = DomainConfig::default();
        let mut population = UserPopulation::spawn(&config, &FixedContext::new(3), 0).unwrap();

        let tasks = population.generate_tasks(Duration::from_secs(2));

        assert_eq!(tasks.len(), 5);
        assert_eq!(tasks[0].class, TrafficClass::BroadbandHigh);
        assert_eq!(tasks[3].class, TrafficClass::MachineTypeLow);
        assert!(tasks.iter().all(|t| t.generated_at_secs == 2.0));
    }
}
