//! Damage aggregation across indicators, categories and outgoing cascades
//!
//! Global invariants enforced:
//! - category impact = sum of its indicators
//! - total impact = sum of the four categories (each indicator counted once)
//! - indicator relative values are allocated from the total's relative value, so
//!   they add back up to it
//!
//! Cascade damage: a hazard that triggers an effect carries the effect's direct
//! damage, weighted by the conditional on the outgoing edge, summed over effect
//! scenarios. One hop only; the effect's own cascade damage is not included.

use crate::cascade::CascadeGraph;
use crate::hazard::MagnitudeIndex;
use crate::indicator::{DamageCategory, DamageIndicator, IndicatorMap};
use crate::scale::{relative_from_absolute, rescale_for_display, DIVISOR_FLOOR};
use crate::scenario::Scenario;

/// Direct and cascade-induced damage of one hazard at one scenario
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactProfile {
    pub direct: IndicatorMap<f64>,
    pub indirect: IndicatorMap<f64>,
}

impl ImpactProfile {
    /// Direct + indirect damage for one indicator
    pub fn indicator_absolute(&self, indicator: DamageIndicator) -> f64 {
        self.direct.get(indicator) + self.indirect.get(indicator)
    }

    pub fn totals(&self) -> IndicatorMap<f64> {
        IndicatorMap::from_fn(|i| self.indicator_absolute(i))
    }

    pub fn category_absolute(&self, category: DamageCategory) -> f64 {
        self.totals().category_sum(category)
    }

    pub fn total_absolute(&self) -> f64 {
        self.totals().total()
    }

    /// Share of an indicator's damage that is not cascade-induced
    pub fn direct_share(&self, indicator: DamageIndicator) -> f64 {
        self.direct.get(indicator) / self.indicator_absolute(indicator).max(DIVISOR_FLOOR)
    }

    /// Share of an indicator's damage induced through outgoing cascades
    pub fn indirect_share(&self, indicator: DamageIndicator) -> f64 {
        self.indirect.get(indicator) / self.indicator_absolute(indicator).max(DIVISOR_FLOOR)
    }

    /// Relative value of the total impact
    pub fn total_relative(&self, baseline: f64) -> f64 {
        relative_from_absolute(self.total_absolute(), baseline)
    }

    /// Indicator relative values allocated proportionally from the total
    pub fn indicator_relative(&self, baseline: f64) -> IndicatorMap<f64> {
        let totals = self.totals();
        let total_absolute = totals.total();
        let total_relative = relative_from_absolute(total_absolute, baseline);
        totals.map(|_, absolute| total_relative * absolute / total_absolute.max(DIVISOR_FLOOR))
    }

    pub fn category_relative(&self, category: DamageCategory, baseline: f64) -> f64 {
        self.indicator_relative(baseline).category_sum(category)
    }

    /// Stretched category value for visual presentation only
    pub fn category_display(&self, category: DamageCategory, baseline: f64) -> f64 {
        rescale_for_display(self.category_relative(category, baseline))
    }
}

/// Sums leaf damage into categories and totals, including cascade damage
pub struct DamageAggregator<'a> {
    graph: &'a CascadeGraph,
    magnitudes: &'a MagnitudeIndex,
}

impl<'a> DamageAggregator<'a> {
    pub fn new(graph: &'a CascadeGraph, magnitudes: &'a MagnitudeIndex) -> Self {
        DamageAggregator { graph, magnitudes }
    }

    /// Directly estimated damage; unknown hazards read as zero
    pub fn direct_damage(&self, hazard_id: &str, scenario: Scenario) -> IndicatorMap<f64> {
        self.magnitudes
            .get(hazard_id)
            .map_or_else(IndicatorMap::zeros, |m| *m.damage.get(scenario))
    }

    /// Damage induced in effect hazards through outgoing edges
    pub fn cascade_damage(&self, hazard_id: &str, scenario: Scenario) -> IndicatorMap<f64> {
        let mut induced = IndicatorMap::zeros();
        for link in self.graph.outgoing(hazard_id, scenario) {
            let effect_damage = self.direct_damage(link.hazard, link.scenario);
            for (indicator, value) in effect_damage.iter() {
                *induced.get_mut(indicator) += value * link.conditional;
            }
        }
        induced
    }

    pub fn profile(&self, hazard_id: &str, scenario: Scenario) -> ImpactProfile {
        ImpactProfile {
            direct: self.direct_damage(hazard_id, scenario),
            indirect: self.cascade_damage(hazard_id, scenario),
        }
    }

    pub fn category_impact_absolute(
        &self,
        hazard_id: &str,
        category: DamageCategory,
        scenario: Scenario,
    ) -> f64 {
        self.profile(hazard_id, scenario).category_absolute(category)
    }

    pub fn total_impact_absolute(&self, hazard_id: &str, scenario: Scenario) -> f64 {
        self.profile(hazard_id, scenario).total_absolute()
    }
}
