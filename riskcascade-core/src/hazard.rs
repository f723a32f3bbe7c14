//! Hazard and cascade edge input records
//!
//! Records are produced by the expert workflow and only read here. Scale labels
//! are resolved to magnitudes once per pass; unknown labels degrade to zero for
//! the affected hazard only.
//!
//! Each hazard and cascade record is parsed on its own. A hazard record with a
//! malformed field keeps its identity and degrades to zero; a malformed cascade
//! record is dropped. Both are reported as issues instead of failing the document.

use crate::indicator::{DamageIndicator, IndicatorMap};
use crate::scale::ScaleSystem;
use crate::scenario::{Scenario, ScenarioMap, ScenarioMatrix};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::warn;

/// Hazard classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardType {
    #[default]
    Standard,
    MaliciousActor,
    Emerging,
}

impl HazardType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HazardType::Standard => "standard",
            HazardType::MaliciousActor => "malicious_actor",
            HazardType::Emerging => "emerging",
        }
    }
}

/// Expert estimates for one scenario, as scale class labels
///
/// Damage keys are indicator codes ("Ha" .. "Fb"); unknown codes are reported
/// as issues of the hazard rather than rejected at parse time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioEstimate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probability: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub damage: BTreeMap<String, String>,
}

/// Hazard input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub hazard_type: HazardType,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub scenarios: ScenarioMap<ScenarioEstimate>,
    /// Problems found while reading the record itself
    #[serde(skip)]
    pub record_issues: Vec<String>,
}

impl Hazard {
    /// Parse one hazard record, keeping the identity of a malformed one
    ///
    /// Returns `Err` only when not even the id can be read.
    fn from_value(value: Value) -> std::result::Result<Self, String> {
        let error = match serde_json::from_value::<Hazard>(value.clone()) {
            Ok(hazard) => return Ok(hazard),
            Err(e) => e.to_string(),
        };

        let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_string);
        let Some(id) = text("id") else {
            return Err(error);
        };

        let issue = format!("malformed hazard record, all estimates ignored: {}", error);
        warn!(hazard = %id, "{}", issue);
        Ok(Hazard {
            id,
            name: text("name").unwrap_or_default(),
            hazard_type: value
                .get("type")
                .and_then(|v| HazardType::deserialize(v).ok())
                .unwrap_or_default(),
            category: text("category").unwrap_or_default(),
            scenarios: ScenarioMap::default(),
            record_issues: vec![issue],
        })
    }
}

/// Cascade edge input record
///
/// `conditional` is keyed by cause scenario, then effect scenario. Any of the nine
/// cells may be missing or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeEdgeRecord {
    pub cause: String,
    pub effect: String,
    #[serde(default)]
    pub conditional: BTreeMap<Scenario, BTreeMap<Scenario, Option<f64>>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub justification: String,
}

impl CascadeEdgeRecord {
    /// Structured conditional matrix; negative or non-finite cells are dropped as absent
    pub fn matrix(&self) -> ScenarioMatrix {
        let mut matrix = ScenarioMatrix::new();
        for (cause, row) in &self.conditional {
            for (effect, value) in row {
                let Some(value) = value else { continue };
                if !value.is_finite() || *value < 0.0 {
                    warn!(
                        cause = %self.cause,
                        effect = %self.effect,
                        "ignoring invalid conditional value {} for {}→{}",
                        value,
                        cause,
                        effect
                    );
                    continue;
                }
                matrix.set(*cause, *effect, Some(*value));
            }
        }
        matrix
    }
}

/// Complete input document: hazard records plus cascade edge records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAssessmentInput")]
pub struct AssessmentInput {
    pub hazards: Vec<Hazard>,
    pub cascades: Vec<CascadeEdgeRecord>,
    /// Records that could not be read at all
    #[serde(skip)]
    pub issues: Vec<String>,
}

/// Input document before per-record parsing
#[derive(Deserialize)]
struct RawAssessmentInput {
    #[serde(default)]
    hazards: Vec<Value>,
    #[serde(default)]
    cascades: Vec<Value>,
}

impl From<RawAssessmentInput> for AssessmentInput {
    fn from(raw: RawAssessmentInput) -> Self {
        let mut issues = Vec::new();

        let mut hazards = Vec::with_capacity(raw.hazards.len());
        for (index, value) in raw.hazards.into_iter().enumerate() {
            match Hazard::from_value(value) {
                Ok(hazard) => hazards.push(hazard),
                Err(e) => {
                    let issue = format!("hazard record #{} skipped: {}", index + 1, e);
                    warn!("{}", issue);
                    issues.push(issue);
                }
            }
        }

        let mut cascades = Vec::with_capacity(raw.cascades.len());
        for (index, value) in raw.cascades.into_iter().enumerate() {
            match serde_json::from_value::<CascadeEdgeRecord>(value.clone()) {
                Ok(record) => cascades.push(record),
                Err(e) => {
                    let endpoint = |field: &str| {
                        value
                            .get(field)
                            .and_then(Value::as_str)
                            .unwrap_or("?")
                            .to_string()
                    };
                    let issue = format!(
                        "cascade record #{} ({} -> {}) skipped: {}",
                        index + 1,
                        endpoint("cause"),
                        endpoint("effect"),
                        e
                    );
                    warn!("{}", issue);
                    issues.push(issue);
                }
            }
        }

        AssessmentInput {
            hazards,
            cascades,
            issues,
        }
    }
}

impl AssessmentInput {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("failed to parse assessment input")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input file: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid assessment input in: {}", path.display()))
    }

    pub fn hazard(&self, id: &str) -> Option<&Hazard> {
        self.hazards.iter().find(|h| h.id == id)
    }
}

/// Direct (non-cascade) magnitudes of one hazard
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HazardMagnitudes {
    /// Baseline annual occurrence rate per scenario
    pub probability: ScenarioMap<f64>,
    /// Monetized damage per scenario and indicator
    pub damage: ScenarioMap<IndicatorMap<f64>>,
    /// Labels that could not be resolved (degraded to zero)
    pub issues: Vec<String>,
}

/// Magnitudes of every hazard in a pass, keyed by hazard id
pub type MagnitudeIndex = HashMap<String, HazardMagnitudes>;

/// Resolve a hazard's scale labels through the given scale system
pub fn resolve_magnitudes(hazard: &Hazard, scales: &ScaleSystem) -> HazardMagnitudes {
    let mut issues = Vec::new();

    let probability = hazard.scenarios.map(|scenario, estimate| {
        let Some(label) = estimate.probability.as_deref() else {
            return 0.0;
        };
        match scales.probability.threshold_of(label) {
            Some(v) => v,
            None => {
                issues.push(format!(
                    "unknown probability class '{}' in {} scenario",
                    label, scenario
                ));
                0.0
            }
        }
    });

    let damage = hazard.scenarios.map(|scenario, estimate| {
        let mut values = IndicatorMap::zeros();
        for (key, label) in &estimate.damage {
            let Some(indicator) = DamageIndicator::parse(key) else {
                issues.push(format!(
                    "unknown damage indicator '{}' in {} scenario",
                    key, scenario
                ));
                continue;
            };
            match scales.impact.threshold_of(label) {
                Some(v) => *values.get_mut(indicator) = v,
                None => issues.push(format!(
                    "unknown {} damage class '{}' in {} scenario",
                    indicator, label, scenario
                )),
            }
        }
        values
    });

    for issue in &issues {
        warn!(hazard = %hazard.id, "{}", issue);
    }

    let mut all_issues = hazard.record_issues.clone();
    all_issues.extend(issues);

    HazardMagnitudes {
        probability,
        damage,
        issues: all_issues,
    }
}
