//! Probability aggregation over incoming cascade edges
//!
//! total(H, s) = own(H, s) + Σ_edges Σ_cause_scenarios own(cause, cs) × cond(cs, s)
//!
//! Each (cause, cause scenario) pair is a separate path: different cause
//! intensities are mutually exclusive realizations estimated separately, so their
//! contributions are added without deduplication. Only the cause's own baseline
//! probability is used (one hop).

use crate::cascade::CascadeGraph;
use crate::hazard::MagnitudeIndex;
use crate::scale::DIVISOR_FLOOR;
use crate::scenario::Scenario;

/// Direct and cascade-inherited probability of one hazard at one scenario
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProbabilityProfile {
    pub direct: f64,
    pub indirect: f64,
}

impl ProbabilityProfile {
    pub fn total(&self) -> f64 {
        self.direct + self.indirect
    }

    pub fn direct_share(&self) -> f64 {
        self.direct / self.total().max(DIVISOR_FLOOR)
    }
}

/// Combines own baseline probability with contributions inherited from causes
pub struct ProbabilityAggregator<'a> {
    graph: &'a CascadeGraph,
    magnitudes: &'a MagnitudeIndex,
}

impl<'a> ProbabilityAggregator<'a> {
    pub fn new(graph: &'a CascadeGraph, magnitudes: &'a MagnitudeIndex) -> Self {
        ProbabilityAggregator { graph, magnitudes }
    }

    /// Own ("no external cause") probability; unknown hazards read as 0
    pub fn direct_probability(&self, hazard_id: &str, scenario: Scenario) -> f64 {
        self.magnitudes
            .get(hazard_id)
            .map_or(0.0, |m| *m.probability.get(scenario))
    }

    /// Sum of cause probabilities weighted by the incoming edges' conditionals
    pub fn inherited_probability(&self, hazard_id: &str, scenario: Scenario) -> f64 {
        self.graph
            .incoming(hazard_id, scenario)
            .iter()
            .map(|link| self.direct_probability(link.hazard, link.scenario) * link.conditional)
            .fold(0.0, |acc, p| acc + p)
    }

    pub fn profile(&self, hazard_id: &str, scenario: Scenario) -> ProbabilityProfile {
        ProbabilityProfile {
            direct: self.direct_probability(hazard_id, scenario),
            indirect: self.inherited_probability(hazard_id, scenario),
        }
    }

    pub fn total_probability(&self, hazard_id: &str, scenario: Scenario) -> f64 {
        self.profile(hazard_id, scenario).total()
    }
}
