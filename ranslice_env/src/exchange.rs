//! Artifact exchange between the engine and the radio controller.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{AllocationRecord, Measurement};
use std::path::Path;

/// Abstraction for the file/message contract with the radio side.
///
/// # Artifact Flow
///
/// ```text
/// Engine                    Exchange                 Radio controller
///   |                           |                          |
///   |-- publish_allocation ---->|-- alloc artifact ------->|
///   |                           |                          |-- reconfigure, measure
///   |                           |<-- measurement artifact -|
///   |<- await_measurements -----|                          |
/// ```
///
/// The engine assumes nothing about the controller's timing beyond one
/// measurement artifact per published allocation.
#[async_trait]
pub trait ArtifactExchange: Send + Sync {
    /// Publishes the interval's allocation, replacing any previous one.
    async fn publish_allocation(&self, records: &[AllocationRecord]) -> Result<(), EnvError>;

    /// Waits for the measurement artifact answering the last allocation.
    ///
    /// # Returns
    /// * `Ok(measurements)` - one entry per measured user
    /// * `Err(EnvError::Timeout)` - nothing arrived within the exchange's deadline
    async fn await_measurements(&self) -> Result<Vec<Measurement>, EnvError>;
}

/// Writes an allocation artifact synchronously (full replace).
///
/// The episode runner mirrors each simulated interval's allocation through
/// this without a runtime.
pub fn write_allocation_artifact(
    path: impl AsRef<Path>,
    records: &[AllocationRecord],
) -> Result<(), EnvError> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;

    #[test]
    fn test_write_allocation_artifact_replaces_file() {
        let path = std::env::temp_dir().join(format!("ranslice_alloc_{}.json", std::process::id()));

        let first = vec![
            AllocationRecord { id: UserId(0), min_prb_ratio: 15, max_prb_ratio: 57, ded_prb_ratio: 100, pathloss: 90.0 },
            AllocationRecord { id: UserId(1), min_prb_ratio: 15, max_prb_ratio: 19, ded_prb_ratio: 100, pathloss: 80.0 },
        ];
        write_allocation_artifact(&path, &first).unwrap();

        let second = vec![first[1].clone()];
        write_allocation_artifact(&path, &second).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<AllocationRecord> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, second);

        let _ = std::fs::remove_file(&path);
    }
}
