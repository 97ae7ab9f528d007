//! Live driver - resolves intervals against real radios.
//!
//! Each interval publishes the chosen allocation through an
//! [`ArtifactExchange`], waits for the controller's throughput report and
//! scores the interval with the measured rates.

use crate::runner::{EpisodeMetrics, POLICY_STREAM};
use crate::world::{SimWorld, StepResult, ThroughputSource};

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use ranslice_core::CoreError;
use ranslice_env::{ArtifactExchange, RanContext};
use tracing::info;

/// Drives a world whose throughput comes from an artifact exchange.
pub struct LiveDriver<C: RanContext, E: ArtifactExchange> {
    world: SimWorld<C>,
    exchange: E,
    policy: ChaCha8Rng,
}

impl<C: RanContext, E: ArtifactExchange> LiveDriver<C, E> {
    pub fn new(world: SimWorld<C>, exchange: E) -> Self {
        let policy = world.context().derive_rng(POLICY_STREAM);
        Self { world, exchange, policy }
    }

    pub fn world(&self) -> &SimWorld<C> {
        &self.world
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Runs one interval with a policy-chosen action.
    pub async fn run_interval(&mut self) -> Result<StepResult, CoreError> {
        let action = self.policy.gen_range(0..self.world.action_count());
        self.run_action(action).await
    }

    /// Runs one interval with the given action.
    ///
    /// Exchange failures surface as `CoreError::Env` and leave the world on
    /// the same interval.
    pub async fn run_action(&mut self, action: usize) -> Result<StepResult, CoreError> {
        let (_, records) = self.world.plan(action)?;
        self.exchange.publish_allocation(&records).await?;

        let measurements = self.exchange.await_measurements().await?;
        self.world.step(action, ThroughputSource::Measured(&measurements))
    }

    /// Runs `intervals` intervals and aggregates their rewards.
    pub async fn run(&mut self, intervals: u64) -> Result<EpisodeMetrics, CoreError> {
        let mut metrics = EpisodeMetrics::default();

        for interval in 0..intervals {
            let result = self.run_interval().await?;
            info!(
                "Interval {}: anchor={} PRBs reward={:.4}",
                interval,
                result.info.anchor_prbs(),
                result.reward
            );
            metrics.record(result.reward, result.info.plan.floor_engaged, result.info.reward.satisfied());
        }

        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use async_trait::async_trait;
    use ranslice_core::DomainConfig;
    use ranslice_env::{AllocationRecord, EnvError, FileExchange, Measurement, UserId};
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedExchange {
        published: Mutex<Vec<Vec<AllocationRecord>>>,
        dl_thp: f64,
        fail: bool,
    }

    impl ScriptedExchange {
        fn new(dl_thp: f64) -> Self {
            Self { published: Mutex::new(Vec::new()), dl_thp, fail: false }
        }
    }

    #[async_trait]
    impl ArtifactExchange for ScriptedExchange {
        async fn publish_allocation(&self, records: &[AllocationRecord]) -> Result<(), EnvError> {
            self.published.lock().unwrap().push(records.to_vec());
            Ok(())
        }

        async fn await_measurements(&self) -> Result<Vec<Measurement>, EnvError> {
            if self.fail {
                return Err(EnvError::Timeout(50_000));
            }
            Ok((0..5).map(|i| Measurement { id: UserId(i), dl_thp: self.dl_thp }).collect())
        }
    }

    fn world() -> SimWorld<SimContext> {
        SimWorld::new(DomainConfig::default(), SimContext::shared(4)).unwrap()
    }

    #[tokio::test]
    async fn test_interval_publishes_then_scores() {
        let mut driver = LiveDriver::new(world(), ScriptedExchange::new(100_000.0));

        let result = driver.run_action(5).await.unwrap();

        let published = driver.exchange().published.lock().unwrap().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0], result.info.records);
        assert_eq!(result.reward, 0.0);
        assert_eq!(driver.world().step_count(), 1);
    }

    #[tokio::test]
    async fn test_exchange_failure_keeps_world() {
        let mut exchange = ScriptedExchange::new(1_000.0);
        exchange.fail = true;
        let mut driver = LiveDriver::new(world(), exchange);
        let pending = driver.world().pending().to_vec();

        let result = driver.run_interval().await;

        assert!(matches!(result, Err(CoreError::Env(EnvError::Timeout(50_000)))));
        assert_eq!(driver.world().pending(), &pending[..]);
        assert_eq!(driver.world().step_count(), 0);
    }

    #[tokio::test]
    async fn test_run_aggregates_intervals() {
        let mut driver = LiveDriver::new(world(), ScriptedExchange::new(500.0));

        let metrics = driver.run(4).await.unwrap();

        assert_eq!(metrics.steps, 4);
        assert!(metrics.total_reward <= 0.0);
        assert!(metrics.total_reward >= -20.0);
    }

    #[tokio::test]
    async fn test_file_exchange_round() {
        let dir = std::env::temp_dir();
        let allocation = dir.join(format!("ranslice_live_alloc_{}.json", std::process::id()));
        let measurement = dir.join(format!("ranslice_live_meas_{}.json", std::process::id()));
        let report: Vec<Measurement> = (0..5).map(|i| Measurement { id: UserId(i), dl_thp: 20_000.0 }).collect();
        std::fs::write(&measurement, serde_json::to_string(&report).unwrap()).unwrap();

        let exchange = FileExchange::new(&allocation, &measurement)
            .with_settle_delay(Duration::ZERO)
            .with_poll_interval(Duration::from_millis(10))
            .with_timeout(Duration::from_secs(2));
        let mut driver = LiveDriver::new(world(), exchange);

        let result = driver.run_action(0).await.unwrap();

        let written: Vec<AllocationRecord> =
            serde_json::from_str(&std::fs::read_to_string(&allocation).unwrap()).unwrap();
        assert_eq!(written, result.info.records);
        // Measurements are consumed
        assert!(std::fs::read_to_string(&measurement).unwrap().is_empty());

        let _ = std::fs::remove_file(&allocation);
        let _ = std::fs::remove_file(&measurement);
    }
}
