//! Identifiers and wire artifacts shared with the radio controller.

use serde::{Deserialize, Serialize};

/// Stable identifier of a user terminal.
///
/// Serialized as a bare integer so artifacts read `"id": 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u32);

/// Identifier of a radio cell (gNB).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub u32);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ue{}", self.0)
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gnb{}", self.0)
    }
}

/// One user's slice configuration for an interval.
///
/// Ratios are integer percentages of the cell's carrier bandwidth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRecord {
    pub id: UserId,
    pub min_prb_ratio: u32,
    pub max_prb_ratio: u32,
    pub ded_prb_ratio: u32,
    /// Path loss in dB at the time the task was generated
    pub pathloss: f64,
}

/// Realized downlink throughput for one user, reported by the radio side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: UserId,
    /// Downlink throughput in kbit/s
    pub dl_thp: f64,
}

impl Measurement {
    /// Returns the throughput in bytes per second.
    pub fn bytes_per_sec(&self) -> f64 {
        self.dl_thp * 1e3 / 8.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_record_wire_shape() {
        let record = AllocationRecord {
            id: UserId(3),
            min_prb_ratio: 15,
            max_prb_ratio: 28,
            ded_prb_ratio: 100,
            pathloss: 81.5,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["min_prb_ratio"], 15);
        assert_eq!(json["max_prb_ratio"], 28);
        assert_eq!(json["ded_prb_ratio"], 100);
        assert_eq!(json["pathloss"], 81.5);
    }

    #[test]
    fn test_measurement_parses_controller_output() {
        let raw = r#"[{"id": 0, "dl_thp": 16000.0}, {"id": 4, "dl_thp": 800}]"#;
        let parsed: Vec<Measurement> = serde_json::from_str(raw).unwrap();

        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].id, UserId(4));
        assert_eq!(parsed[0].bytes_per_sec(), 2_000_000.0);
    }

    #[test]
    fn test_id_display() {
        assert_eq!(UserId(2).to_string(), "ue2");
        assert_eq!(CellId(1).to_string(), "gnb1");
    }
}
