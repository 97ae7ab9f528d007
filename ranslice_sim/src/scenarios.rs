//! Scenario presets built on the reference deployment.

use ranslice_core::{DomainConfig, TrafficClass};
use ranslice_env::UserId;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Three cells, five users: eMBB on the anchor, eMBB and mMTC on the virtualized cells
    Reference,

    /// Anchor user carries high-tier mMTC instead of eMBB
    AnchorMmtc,

    /// Both users of the first virtualized cell are latency-critical
    UrllcVirtual,

    /// Action space with a 2-PRB step
    FineGrained,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Reference,
            ScenarioId::AnchorMmtc,
            ScenarioId::UrllcVirtual,
            ScenarioId::FineGrained,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Reference => "reference",
            ScenarioId::AnchorMmtc => "anchor_mmtc",
            ScenarioId::UrllcVirtual => "urllc_virtual",
            ScenarioId::FineGrained => "fine_grained",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Reference => "3 cells, 5 users, 4-PRB steps (3025 actions)",
            ScenarioId::AnchorMmtc => "Anchor user switched to mMTC_high",
            ScenarioId::UrllcVirtual => "Users 1 and 2 switched to URLLC with a 500 ms target",
            ScenarioId::FineGrained => "2-PRB action steps on the reference deployment",
        }
    }

    /// Builds the scenario's domain configuration.
    pub fn domain_config(&self) -> DomainConfig {
        let mut config = DomainConfig::default();
        match self {
            ScenarioId::Reference => {}
            ScenarioId::AnchorMmtc => set_class(&mut config, UserId(0), TrafficClass::MachineTypeHigh),
            ScenarioId::UrllcVirtual => {
                set_class(&mut config, UserId(1), TrafficClass::LatencyCritical);
                set_class(&mut config, UserId(2), TrafficClass::LatencyCritical);
            }
            ScenarioId::FineGrained => config.action_step = 2,
        }
        config
    }
}

fn set_class(config: &mut DomainConfig, user: UserId, class: TrafficClass) {
    if let Some(scenario) = config.users.iter_mut().find(|u| u.user_id == user) {
        scenario.class = class;
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "reference" | "default" => Ok(ScenarioId::Reference),
            "anchor_mmtc" | "anchormmtc" => Ok(ScenarioId::AnchorMmtc),
            "urllc_virtual" | "urllcvirtual" => Ok(ScenarioId::UrllcVirtual),
            "fine_grained" | "finegrained" => Ok(ScenarioId::FineGrained),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
