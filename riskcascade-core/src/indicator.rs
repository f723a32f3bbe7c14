//! Damage indicators and their four categories
//!
//! Every indicator belongs to exactly one category, so summing categories never
//! counts an indicator twice.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Damage category (dimension of impact)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageCategory {
    Human,
    Societal,
    Environmental,
    Financial,
}

impl DamageCategory {
    pub const ALL: [DamageCategory; 4] = [
        DamageCategory::Human,
        DamageCategory::Societal,
        DamageCategory::Environmental,
        DamageCategory::Financial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DamageCategory::Human => "human",
            DamageCategory::Societal => "societal",
            DamageCategory::Environmental => "environmental",
            DamageCategory::Financial => "financial",
        }
    }

    /// Indicators making up this category
    pub fn indicators(self) -> &'static [DamageIndicator] {
        use DamageIndicator::*;
        match self {
            DamageCategory::Human => &[Ha, Hb, Hc],
            DamageCategory::Societal => &[Sa, Sb, Sc, Sd],
            DamageCategory::Environmental => &[Ea],
            DamageCategory::Financial => &[Fa, Fb],
        }
    }
}

impl fmt::Display for DamageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Leaf damage measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DamageIndicator {
    Ha,
    Hb,
    Hc,
    Sa,
    Sb,
    Sc,
    Sd,
    Ea,
    Fa,
    Fb,
}

impl DamageIndicator {
    pub const ALL: [DamageIndicator; 10] = [
        DamageIndicator::Ha,
        DamageIndicator::Hb,
        DamageIndicator::Hc,
        DamageIndicator::Sa,
        DamageIndicator::Sb,
        DamageIndicator::Sc,
        DamageIndicator::Sd,
        DamageIndicator::Ea,
        DamageIndicator::Fa,
        DamageIndicator::Fb,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn category(self) -> DamageCategory {
        use DamageIndicator::*;
        match self {
            Ha | Hb | Hc => DamageCategory::Human,
            Sa | Sb | Sc | Sd => DamageCategory::Societal,
            Ea => DamageCategory::Environmental,
            Fa | Fb => DamageCategory::Financial,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use DamageIndicator::*;
        match self {
            Ha => "Ha",
            Hb => "Hb",
            Hc => "Hc",
            Sa => "Sa",
            Sb => "Sb",
            Sc => "Sc",
            Sd => "Sd",
            Ea => "Ea",
            Fa => "Fa",
            Fb => "Fb",
        }
    }

    /// Parse an indicator code (case-insensitive)
    pub fn parse(code: &str) -> Option<DamageIndicator> {
        let code = code.trim();
        DamageIndicator::ALL
            .into_iter()
            .find(|i| i.as_str().eq_ignore_ascii_case(code))
    }

    /// Human-readable description used in reports
    pub fn description(&self) -> &'static str {
        use DamageIndicator::*;
        match self {
            Ha => "fatalities",
            Hb => "injured or ill persons",
            Hc => "persons in need of assistance",
            Sa => "supply shortfalls",
            Sb => "disruption of public order and security",
            Sc => "damage to reputation",
            Sd => "loss of trust in the state",
            Ea => "damaged ecosystems",
            Fa => "asset losses and coping costs",
            Fb => "reduction of economic performance",
        }
    }
}

impl fmt::Display for DamageIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one value per damage indicator
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndicatorMap<T> {
    values: [T; 10],
}

impl<T> IndicatorMap<T> {
    pub fn from_fn(mut f: impl FnMut(DamageIndicator) -> T) -> Self {
        IndicatorMap {
            values: DamageIndicator::ALL.map(&mut f),
        }
    }

    pub fn get(&self, indicator: DamageIndicator) -> &T {
        &self.values[indicator.index()]
    }

    pub fn get_mut(&mut self, indicator: DamageIndicator) -> &mut T {
        &mut self.values[indicator.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (DamageIndicator, &T)> {
        DamageIndicator::ALL.into_iter().zip(self.values.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(DamageIndicator, &T) -> U) -> IndicatorMap<U> {
        IndicatorMap::from_fn(|i| f(i, self.get(i)))
    }
}

impl IndicatorMap<f64> {
    pub fn zeros() -> Self {
        IndicatorMap { values: [0.0; 10] }
    }

    /// Sum of the category's indicators
    pub fn category_sum(&self, category: DamageCategory) -> f64 {
        category.indicators().iter().map(|i| *self.get(*i)).sum()
    }

    /// Sum over the four categories
    pub fn total(&self) -> f64 {
        DamageCategory::ALL
            .iter()
            .map(|c| self.category_sum(*c))
            .sum()
    }
}
