//! Most Relevant Scenario (MRS) selection
//!
//! Global invariants enforced:
//! - Total risk is never negative (NaN and negative products read as 0)
//! - The selected scenario has maximal total risk; ties prefer the more intense scenario
//! - A hazard with zero risk in every scenario selects Considerable

use crate::scenario::{Scenario, ScenarioMap};

/// Risk of one scenario: total probability × total impact, clamped at 0
pub fn total_risk(probability: f64, impact: f64) -> f64 {
    let risk = probability * impact;
    if risk.is_nan() || risk <= 0.0 {
        0.0
    } else {
        risk
    }
}

/// Choose the scenario with the highest total risk
pub fn select_mrs(risks: &ScenarioMap<f64>) -> Scenario {
    let mut best = Scenario::Considerable;
    let mut best_risk = 0.0;

    // Iterating in increasing intensity with `>=` lets a later scenario win ties
    for (scenario, &risk) in risks.iter() {
        let risk = if risk.is_nan() { 0.0 } else { risk };
        if risk > 0.0 && risk >= best_risk {
            best = scenario;
            best_risk = risk;
        }
    }

    best
}
