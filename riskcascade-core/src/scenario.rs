//! Assessment scenarios and scenario-indexed containers
//!
//! Global invariants enforced:
//! - Scenario order is fixed: Considerable < Major < Extreme
//! - Conditional matrices are dense 3×3 grids; an absent cell is `None`, never an invalid key

use serde::{Deserialize, Serialize};
use std::fmt;

/// Intensity scenario of a hazard, ordered by increasing intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Considerable,
    Major,
    Extreme,
}

impl Scenario {
    /// All scenarios in increasing intensity
    pub const ALL: [Scenario; 3] = [Scenario::Considerable, Scenario::Major, Scenario::Extreme];

    pub fn index(self) -> usize {
        match self {
            Scenario::Considerable => 0,
            Scenario::Major => 1,
            Scenario::Extreme => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Considerable => "considerable",
            Scenario::Major => "major",
            Scenario::Extreme => "extreme",
        }
    }

    /// Parse a scenario name (case-insensitive)
    pub fn parse(name: &str) -> Option<Scenario> {
        match name.trim().to_ascii_lowercase().as_str() {
            "considerable" => Some(Scenario::Considerable),
            "major" => Some(Scenario::Major),
            "extreme" => Some(Scenario::Extreme),
            _ => None,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one value per scenario
///
/// Missing scenario keys deserialize to `T::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub struct ScenarioMap<T> {
    #[serde(default)]
    pub considerable: T,
    #[serde(default)]
    pub major: T,
    #[serde(default)]
    pub extreme: T,
}

impl<T> ScenarioMap<T> {
    /// Build a map by evaluating `f` for every scenario in order
    pub fn from_fn(mut f: impl FnMut(Scenario) -> T) -> Self {
        ScenarioMap {
            considerable: f(Scenario::Considerable),
            major: f(Scenario::Major),
            extreme: f(Scenario::Extreme),
        }
    }

    pub fn get(&self, scenario: Scenario) -> &T {
        match scenario {
            Scenario::Considerable => &self.considerable,
            Scenario::Major => &self.major,
            Scenario::Extreme => &self.extreme,
        }
    }

    pub fn get_mut(&mut self, scenario: Scenario) -> &mut T {
        match scenario {
            Scenario::Considerable => &mut self.considerable,
            Scenario::Major => &mut self.major,
            Scenario::Extreme => &mut self.extreme,
        }
    }

    /// Iterate in increasing intensity
    pub fn iter(&self) -> impl Iterator<Item = (Scenario, &T)> {
        Scenario::ALL.into_iter().map(move |s| (s, self.get(s)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Scenario, &T) -> U) -> ScenarioMap<U> {
        ScenarioMap::from_fn(|s| f(s, self.get(s)))
    }
}

/// Conditional values indexed by (cause scenario, effect scenario)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScenarioMatrix {
    cells: [[Option<f64>; 3]; 3],
}

impl ScenarioMatrix {
    /// Create a matrix with every cell absent
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cause: Scenario, effect: Scenario) -> Option<f64> {
        self.cells[cause.index()][effect.index()]
    }

    /// Conditional value with absent cells read as zero contribution
    pub fn value(&self, cause: Scenario, effect: Scenario) -> f64 {
        self.get(cause, effect).unwrap_or(0.0)
    }

    pub fn set(&mut self, cause: Scenario, effect: Scenario, value: Option<f64>) {
        self.cells[cause.index()][effect.index()] = value;
    }

    /// Number of populated cells (at most 9)
    pub fn populated(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Populated cells as (cause, effect, value), cause-major order
    pub fn entries(&self) -> impl Iterator<Item = (Scenario, Scenario, f64)> + '_ {
        Scenario::ALL.into_iter().flat_map(move |cause| {
            Scenario::ALL
                .into_iter()
                .filter_map(move |effect| self.get(cause, effect).map(|v| (cause, effect, v)))
        })
    }
}
