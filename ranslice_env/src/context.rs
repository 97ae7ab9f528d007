//! Clock and entropy context shared by the engine and its drivers.

use rand_chacha::ChaCha8Rng;
use std::time::{Duration, SystemTime};

/// The engine's view of time and randomness.
///
/// # Implementations
///
/// - **Live**: `SystemContext` - monotonic wall clock, OS entropy
/// - **Simulation**: `SimContext` (ranslice_sim) - virtual clock, seeded streams
///
/// # Determinism
///
/// In simulation every random draw (initial positions, velocity redraws,
/// task sizes, the driving policy) comes from a stream returned by
/// `derive_rng`, so a whole run is reproducible from its seed.
pub trait RanContext: Send + Sync {
    /// Returns the monotonic time since context creation.
    ///
    /// Mobility uses the difference between two readings as the elapsed
    /// time of an interval.
    fn now(&self) -> Duration;

    /// Returns the wall-clock time for artifact timestamps.
    fn system_time(&self) -> SystemTime;

    /// Returns an RNG for the given stream.
    ///
    /// Stream numbers separate concerns (users, policy) so that adding a
    /// user does not shift the draws of another.
    fn derive_rng(&self, stream: u64) -> ChaCha8Rng;

    /// Returns the context's seed (for logging).
    ///
    /// Live contexts are not seeded and return 0.
    fn seed(&self) -> u64;
}
