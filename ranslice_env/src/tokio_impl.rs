//! Live implementations: wall-clock context and tokio file exchange.

use crate::error::EnvError;
use crate::exchange::ArtifactExchange;
use crate::types::{AllocationRecord, Measurement};
use crate::RanContext;
use async_trait::async_trait;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

/// Live context backed by the system clock and OS entropy.
pub struct SystemContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl SystemContext {
    /// Creates a new SystemContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for SystemContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RanContext for SystemContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    fn derive_rng(&self, _stream: u64) -> ChaCha8Rng {
        // Live runs are not reproducible
        ChaCha8Rng::from_entropy()
    }

    fn seed(&self) -> u64 {
        0
    }
}

/// File-based artifact exchange with the radio controller.
///
/// The allocation file is replaced atomically (write + rename). The
/// measurement file is polled until it holds a non-empty JSON array, then
/// truncated so the same measurements are never consumed twice.
#[derive(Debug, Clone)]
pub struct FileExchange {
    allocation_path: PathBuf,
    measurement_path: PathBuf,

    /// Time the radio needs to apply a configuration before measuring
    settle_delay: Duration,

    /// Interval between polls of the measurement file
    poll_interval: Duration,

    /// Overall deadline for a measurement artifact
    timeout: Duration,

    /// Malformed reads tolerated before giving up
    max_parse_retries: u32,
}

impl FileExchange {
    /// Creates an exchange with the controller's default timings.
    pub fn new(allocation_path: impl Into<PathBuf>, measurement_path: impl Into<PathBuf>) -> Self {
        Self {
            allocation_path: allocation_path.into(),
            measurement_path: measurement_path.into(),
            settle_delay: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(50),
            max_parse_retries: 5,
        }
    }

    /// Sets the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Sets the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the measurement deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how many malformed reads are tolerated.
    pub fn with_max_parse_retries(mut self, retries: u32) -> Self {
        self.max_parse_retries = retries;
        self
    }

    /// Returns the allocation artifact path.
    pub fn allocation_path(&self) -> &Path {
        &self.allocation_path
    }

    /// Returns the measurement artifact path.
    pub fn measurement_path(&self) -> &Path {
        &self.measurement_path
    }

    async fn poll_measurements(&self) -> Result<Vec<Measurement>, EnvError> {
        let mut parse_failures = 0u32;

        loop {
            match tokio::fs::read_to_string(&self.measurement_path).await {
                Ok(content) if !content.trim().is_empty() => {
                    match serde_json::from_str::<Vec<Measurement>>(&content) {
                        Ok(measurements) if measurements.is_empty() => {
                            return Err(EnvError::empty(self.measurement_path.display()));
                        }
                        Ok(measurements) => {
                            tokio::fs::write(&self.measurement_path, "").await?;
                            return Ok(measurements);
                        }
                        Err(e) => {
                            // The controller may still be writing
                            parse_failures += 1;
                            if parse_failures > self.max_parse_retries {
                                return Err(e.into());
                            }
                            warn!("Malformed measurement artifact ({}/{}): {}",
                                parse_failures, self.max_parse_retries, e);
                        }
                    }
                }
                Ok(_) => debug!("Measurement artifact empty, waiting"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Measurement artifact not present yet");
                }
                Err(e) => return Err(e.into()),
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl ArtifactExchange for FileExchange {
    async fn publish_allocation(&self, records: &[AllocationRecord]) -> Result<(), EnvError> {
        let json = serde_json::to_string_pretty(records)?;
        let staging = self.allocation_path.with_extension("json.tmp");

        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.allocation_path).await?;

        info!("Published {} allocation records to {}", records.len(), self.allocation_path.display());
        Ok(())
    }

    async fn await_measurements(&self) -> Result<Vec<Measurement>, EnvError> {
        tokio::time::sleep(self.settle_delay).await;

        tokio::time::timeout(self.timeout, self.poll_measurements())
            .await
            .map_err(|_| EnvError::Timeout(self.timeout.as_millis() as u64))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ranslice_{}_{}.json", name, std::process::id()))
    }

    fn fast(exchange: FileExchange) -> FileExchange {
        exchange
            .with_settle_delay(Duration::ZERO)
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(200))
            .with_max_parse_retries(1)
    }

    #[test]
    fn test_system_context_time() {
        let ctx = SystemContext::new();
        let t1 = ctx.now();
        std::thread::sleep(Duration::from_millis(5));
        let t2 = ctx.now();

        assert!(t2 > t1);
        assert_eq!(ctx.seed(), 0);
    }

    #[tokio::test]
    async fn test_publish_then_read_back() {
        let alloc = scratch("publish_alloc");
        let exchange = FileExchange::new(&alloc, scratch("publish_meas"));

        let records = vec![AllocationRecord {
            id: UserId(0),
            min_prb_ratio: 15,
            max_prb_ratio: 57,
            ded_prb_ratio: 100,
            pathloss: 92.1,
        }];
        exchange.publish_allocation(&records).await.unwrap();

        let content = std::fs::read_to_string(&alloc).unwrap();
        let parsed: Vec<AllocationRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, records);

        let _ = std::fs::remove_file(&alloc);
    }

    #[tokio::test]
    async fn test_measurements_consumed_once() {
        let meas = scratch("consume_meas");
        std::fs::write(&meas, r#"[{"id": 1, "dl_thp": 3500.0}]"#).unwrap();
        let exchange = fast(FileExchange::new(scratch("consume_alloc"), &meas));

        let measurements = exchange.await_measurements().await.unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].id, UserId(1));

        // Truncated after the read
        assert!(std::fs::read_to_string(&meas).unwrap().is_empty());

        let _ = std::fs::remove_file(&meas);
    }

    #[tokio::test]
    async fn test_missing_measurements_time_out() {
        let exchange = fast(FileExchange::new(scratch("timeout_alloc"), scratch("never_written")));

        let result = exchange.await_measurements().await;
        assert!(matches!(result, Err(EnvError::Timeout(200))));
    }

    #[tokio::test]
    async fn test_malformed_measurements_give_up() {
        let meas = scratch("malformed_meas");
        std::fs::write(&meas, "[{\"id\": ").unwrap();
        let exchange = fast(FileExchange::new(scratch("malformed_alloc"), &meas));

        let result = exchange.await_measurements().await;
        assert!(matches!(result, Err(EnvError::Serialization(_))));

        let _ = std::fs::remove_file(&meas);
    }
}
