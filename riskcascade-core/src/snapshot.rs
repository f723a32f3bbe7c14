//! Result snapshot assembly
//!
//! Packages the aggregators' output into one immutable record per hazard.
//!
//! Global invariants enforced:
//! - Identical inputs produce byte-identical snapshots
//! - Hazards ordered by id (ASCII lexical ordering, not locale-aware)
//! - Exactly one scenario per hazard carries `is_mrs`
//! - A degraded hazard never changes the records of other hazards
//! - Incremental rebuilds equal a full build on the same inputs

use crate::aggregates::CatalogueAggregates;
use crate::cascade::CascadeGraph;
use crate::damage::{DamageAggregator, ImpactProfile};
use crate::hazard::{resolve_magnitudes, AssessmentInput, Hazard, HazardType, MagnitudeIndex};
use crate::indicator::{DamageCategory, DamageIndicator};
use crate::probability::{ProbabilityAggregator, ProbabilityProfile};
use crate::scale::{relative_from_absolute, ScaleEntry, ScaleSystem};
use crate::scenario::{Scenario, ScenarioMap};
use crate::selector::{select_mrs, total_risk};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// Schema version for result snapshots
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Probability fields of one scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ProbabilityResult {
    pub direct: f64,
    pub indirect: f64,
    pub total: f64,
    pub total_relative: f64,
    pub direct_share: f64,
}

/// Impact fields of one damage indicator
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct IndicatorResult {
    pub direct: f64,
    pub indirect: f64,
    pub absolute: f64,
    pub relative: f64,
    pub direct_share: f64,
    pub indirect_share: f64,
}

/// Impact fields of one damage category
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct CategoryResult {
    pub absolute: f64,
    pub relative: f64,
    /// Display-only stretch of `relative`
    pub display: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ImpactResult {
    pub total_absolute: f64,
    pub total_relative: f64,
    pub categories: BTreeMap<DamageCategory, CategoryResult>,
    pub indicators: BTreeMap<DamageIndicator, IndicatorResult>,
}

/// All computed fields of one scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ScenarioResult {
    pub probability: ProbabilityResult,
    pub impact: ImpactResult,
    pub total_risk: f64,
    pub is_mrs: bool,
}

/// Latest computed record of one hazard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct HazardSnapshot {
    pub hazard_id: String,
    pub name: String,
    pub hazard_type: HazardType,
    pub category: String,
    pub mrs: Scenario,
    /// The hazard sits on a cascade cycle; its cascade values are one hop only
    pub in_cascade_cycle: bool,
    pub incoming_edges: usize,
    pub outgoing_edges: usize,
    pub scenarios: ScenarioMap<ScenarioResult>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub issues: Vec<String>,
}

impl HazardSnapshot {
    pub fn mrs_result(&self) -> &ScenarioResult {
        self.scenarios.get(self.mrs)
    }

    pub fn mrs_risk(&self) -> f64 {
        self.mrs_result().total_risk
    }
}

/// Pass metadata in snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct AnalysisInfo {
    pub tool_version: String,
    pub scale_preset: String,
    pub impact_baseline: f64,
    pub probability_baseline: f64,
    /// Tables the labels were resolved through (preset or explicit)
    #[serde(default)]
    pub impact_table: Vec<ScaleEntry>,
    #[serde(default)]
    pub probability_table: Vec<ScaleEntry>,
    pub hazard_count: usize,
    pub edge_count: usize,
    pub rejected_edge_count: usize,
}

impl AnalysisInfo {
    /// Whether this pass ran under exactly the given scale system
    pub fn built_under(&self, scales: &ScaleSystem) -> bool {
        self.scale_preset == scales.preset.as_str()
            && self.impact_baseline == scales.impact_baseline
            && self.probability_baseline == scales.probability_baseline
            && self.impact_table.as_slice() == scales.impact.entries()
            && self.probability_table.as_slice() == scales.probability.entries()
    }
}

/// Complete result of one recomputation pass
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct ResultSnapshot {
    pub schema_version: u32,
    pub analysis: AnalysisInfo,
    pub hazards: Vec<HazardSnapshot>,
    /// Input problems not tied to a single hazard (unreadable records, rejected edges,
    /// duplicate ids)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub input_issues: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<CatalogueAggregates>,
}

impl ResultSnapshot {
    /// Serialize snapshot to JSON string (deterministic ordering)
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize snapshot to JSON")
    }

    /// Deserialize snapshot from JSON string
    ///
    /// Hazard records are re-sorted by id, so hand-edited or foreign files
    /// support the same lookups as built snapshots.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut snapshot: ResultSnapshot =
            serde_json::from_str(json).context("failed to deserialize snapshot from JSON")?;

        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            anyhow::bail!(
                "schema version mismatch: expected {}, got {}",
                SNAPSHOT_SCHEMA_VERSION,
                snapshot.schema_version
            );
        }

        snapshot.hazards.sort_by(|a, b| a.hazard_id.cmp(&b.hazard_id));
        Ok(snapshot)
    }

    /// Record of one hazard; records are sorted by id
    pub fn hazard(&self, hazard_id: &str) -> Option<&HazardSnapshot> {
        self.hazards
            .binary_search_by(|h| h.hazard_id.as_str().cmp(hazard_id))
            .ok()
            .map(|i| &self.hazards[i])
    }

    /// Attach catalogue rollups computed from the hazard records
    pub fn with_aggregates(mut self) -> Self {
        self.aggregates = Some(CatalogueAggregates::compute(&self.hazards));
        self
    }
}

/// Input change that triggers an incremental rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A hazard record was added, edited or removed
    Hazard(String),
    /// A cascade edge record was added, edited or removed
    Edge { cause: String, effect: String },
}

/// Everything one pass derives from the input before per-hazard assembly
struct Pass<'a> {
    hazards: Vec<&'a Hazard>,
    graph: CascadeGraph,
    magnitudes: MagnitudeIndex,
    cycle_members: BTreeSet<String>,
    input_issues: Vec<String>,
}

impl<'a> Pass<'a> {
    fn prepare(scales: &ScaleSystem, input: &'a AssessmentInput) -> Self {
        let mut input_issues = input.issues.clone();
        let mut seen = HashSet::new();
        let mut hazards = Vec::with_capacity(input.hazards.len());
        for hazard in &input.hazards {
            if seen.insert(hazard.id.as_str()) {
                hazards.push(hazard);
            } else {
                let issue = format!("duplicate hazard id '{}': later record ignored", hazard.id);
                warn!(hazard = %hazard.id, "{}", issue);
                input_issues.push(issue);
            }
        }
        hazards.sort_by(|a, b| a.id.cmp(&b.id));

        let known: Vec<Hazard> = hazards.iter().map(|h| (*h).clone()).collect();
        let graph = CascadeGraph::build(&known, &input.cascades);
        input_issues.extend(graph.rejected().iter().cloned());

        let magnitudes: MagnitudeIndex = hazards
            .par_iter()
            .map(|h| (h.id.clone(), resolve_magnitudes(h, scales)))
            .collect();
        let cycle_members = graph.cycle_members();

        Pass {
            hazards,
            graph,
            magnitudes,
            cycle_members,
            input_issues,
        }
    }

    fn hazard_snapshot(&self, scales: &ScaleSystem, hazard: &Hazard) -> HazardSnapshot {
        let probability = ProbabilityAggregator::new(&self.graph, &self.magnitudes);
        let damage = DamageAggregator::new(&self.graph, &self.magnitudes);

        let mut scenarios = ScenarioMap::from_fn(|scenario| {
            let p = probability.profile(&hazard.id, scenario);
            let i = damage.profile(&hazard.id, scenario);
            ScenarioResult {
                probability: probability_result(&p, scales.probability_baseline),
                impact: impact_result(&i, scales.impact_baseline),
                total_risk: total_risk(p.total(), i.total_absolute()),
                is_mrs: false,
            }
        });
        let mrs = select_mrs(&scenarios.map(|_, r| r.total_risk));
        scenarios.get_mut(mrs).is_mrs = true;

        HazardSnapshot {
            hazard_id: hazard.id.clone(),
            name: hazard.name.clone(),
            hazard_type: hazard.hazard_type,
            category: hazard.category.clone(),
            mrs,
            in_cascade_cycle: self.cycle_members.contains(&hazard.id),
            incoming_edges: self.graph.fan_in(&hazard.id),
            outgoing_edges: self.graph.fan_out(&hazard.id),
            scenarios,
            issues: self
                .magnitudes
                .get(&hazard.id)
                .map(|m| m.issues.clone())
                .unwrap_or_default(),
        }
    }

    fn analysis_info(&self, scales: &ScaleSystem) -> AnalysisInfo {
        AnalysisInfo {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            scale_preset: scales.preset.as_str().to_string(),
            impact_baseline: scales.impact_baseline,
            probability_baseline: scales.probability_baseline,
            impact_table: scales.impact.entries().to_vec(),
            probability_table: scales.probability.entries().to_vec(),
            hazard_count: self.hazards.len(),
            edge_count: self.graph.edge_count(),
            rejected_edge_count: self.graph.rejected().len(),
        }
    }
}

fn probability_result(profile: &ProbabilityProfile, baseline: f64) -> ProbabilityResult {
    ProbabilityResult {
        direct: profile.direct,
        indirect: profile.indirect,
        total: profile.total(),
        total_relative: relative_from_absolute(profile.total(), baseline),
        direct_share: profile.direct_share(),
    }
}

fn impact_result(profile: &ImpactProfile, baseline: f64) -> ImpactResult {
    let relatives = profile.indicator_relative(baseline);

    let indicators = DamageIndicator::ALL
        .iter()
        .map(|&indicator| {
            let result = IndicatorResult {
                direct: *profile.direct.get(indicator),
                indirect: *profile.indirect.get(indicator),
                absolute: profile.indicator_absolute(indicator),
                relative: *relatives.get(indicator),
                direct_share: profile.direct_share(indicator),
                indirect_share: profile.indirect_share(indicator),
            };
            (indicator, result)
        })
        .collect();

    let categories = DamageCategory::ALL
        .iter()
        .map(|&category| {
            let result = CategoryResult {
                absolute: profile.category_absolute(category),
                relative: relatives.category_sum(category),
                display: profile.category_display(category, baseline),
            };
            (category, result)
        })
        .collect();

    ImpactResult {
        total_absolute: profile.total_absolute(),
        total_relative: profile.total_relative(baseline),
        categories,
        indicators,
    }
}

/// Builds result snapshots under one scale system
pub struct SnapshotBuilder<'a> {
    scales: &'a ScaleSystem,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(scales: &'a ScaleSystem) -> Self {
        SnapshotBuilder { scales }
    }

    /// Full recomputation pass; hazards are evaluated in parallel
    pub fn build(&self, input: &AssessmentInput) -> ResultSnapshot {
        let pass = Pass::prepare(self.scales, input);
        let hazards: Vec<HazardSnapshot> = pass
            .hazards
            .par_iter()
            .map(|h| pass.hazard_snapshot(self.scales, h))
            .collect();

        debug!(hazards = hazards.len(), "built result snapshot");

        ResultSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            analysis: pass.analysis_info(self.scales),
            hazards,
            input_issues: pass.input_issues,
            aggregates: None, // Aggregates are computed on demand, not stored
        }
    }

    /// Recompute only the hazards touched by `changes`
    ///
    /// `input` is the complete current input; `changes` must name every hazard and
    /// edge record that differs from the input `previous` was built from. Records of
    /// untouched hazards are taken from `previous`. Falls back to a full build when
    /// `previous` was built under a different scale system.
    pub fn rebuild(
        &self,
        previous: &ResultSnapshot,
        input: &AssessmentInput,
        changes: &[Change],
    ) -> ResultSnapshot {
        if !previous.analysis.built_under(self.scales) {
            debug!("scale system changed since previous snapshot; running full build");
            return self.build(input);
        }

        let pass = Pass::prepare(self.scales, input);

        let mut affected = BTreeSet::new();
        for change in changes {
            match change {
                Change::Hazard(id) => {
                    affected.extend(pass.graph.affected_by_hazard(id));
                    // Edge records naming the hazard may have been rejected while it was missing
                    for record in &input.cascades {
                        if record.cause == *id || record.effect == *id {
                            affected.insert(record.cause.clone());
                            affected.insert(record.effect.clone());
                        }
                    }
                }
                Change::Edge { cause, effect } => {
                    affected.extend(pass.graph.affected_by_edge(cause, effect));
                }
            }
        }
        debug!(affected = affected.len(), "incremental rebuild");

        let hazards: Vec<HazardSnapshot> = pass
            .hazards
            .par_iter()
            .map(|h| match previous.hazard(&h.id) {
                Some(kept) if !affected.contains(&h.id) => {
                    let mut kept = kept.clone();
                    // Cycle membership is not local to the changed edges
                    kept.in_cascade_cycle = pass.cycle_members.contains(&h.id);
                    kept
                }
                _ => pass.hazard_snapshot(self.scales, h),
            })
            .collect();

        ResultSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            analysis: pass.analysis_info(self.scales),
            hazards,
            input_issues: pass.input_issues,
            aggregates: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaleTable;
    use serde_json::json;

    fn input(value: serde_json::Value) -> AssessmentInput {
        serde_json::from_value(value).unwrap()
    }

    fn sample_input() -> AssessmentInput {
        input(json!({
            "hazards": [
                {
                    "id": "power-outage",
                    "name": "Power outage",
                    "category": "technology",
                    "scenarios": {
                        "considerable": {
                            "probability": "3",
                            "damage": { "Fa": "1", "Sa": "1.5" }
                        },
                        "major": { "probability": "2", "damage": { "Fa": "2.5", "Ha": "1" } },
                        "extreme": { "probability": "0.5", "damage": { "Fa": "4", "Ha": "3" } }
                    }
                },
                {
                    "id": "heatwave",
                    "name": "Heatwave",
                    "category": "nature",
                    "scenarios": {
                        "major": { "probability": "3", "damage": { "Ha": "2", "Ea": "1" } }
                    }
                },
                {
                    "id": "cyber-attack",
                    "name": "Cyber attack",
                    "type": "malicious_actor",
                    "category": "society",
                    "scenarios": {}
                }
            ],
            "cascades": [
                {
                    "cause": "heatwave",
                    "effect": "power-outage",
                    "conditional": { "major": { "major": 0.2, "considerable": 0.4 } }
                }
            ]
        }))
    }

    #[test]
    fn test_snapshot_structure() {
        let scales = ScaleSystem::default();
        let snapshot = SnapshotBuilder::new(&scales).build(&sample_input());

        let ids: Vec<_> = snapshot.hazards.iter().map(|h| h.hazard_id.as_str()).collect();
        assert_eq!(ids, vec!["cyber-attack", "heatwave", "power-outage"]);
        assert_eq!(snapshot.analysis.hazard_count, 3);
        assert_eq!(snapshot.analysis.edge_count, 1);

        for hazard in &snapshot.hazards {
            let flagged: Vec<_> = hazard
                .scenarios
                .iter()
                .filter(|(_, r)| r.is_mrs)
                .map(|(s, _)| s)
                .collect();
            assert_eq!(flagged, vec![hazard.mrs]);
        }

        let empty = snapshot.hazard("cyber-attack").unwrap();
        assert_eq!(empty.mrs, Scenario::Considerable);
        assert_eq!(empty.hazard_type, HazardType::MaliciousActor);
        assert_eq!(empty.mrs_risk(), 0.0);
    }

    #[test]
    fn test_cascade_fields() {
        let scales = ScaleSystem::default();
        let snapshot = SnapshotBuilder::new(&scales).build(&sample_input());

        let outage = snapshot.hazard("power-outage").unwrap();
        let heat_major = scales.probability.threshold_of("3").unwrap();
        let own_major = scales.probability.threshold_of("2").unwrap();
        let major = &outage.scenarios.major.probability;
        assert_eq!(major.direct, own_major);
        assert!((major.indirect - heat_major * 0.2).abs() < 1e-15);
        assert_eq!(outage.incoming_edges, 1);

        // The heatwave carries the outage damage it triggers
        let heat = snapshot.hazard("heatwave").unwrap();
        let fa = &heat.scenarios.major.impact.indicators[&DamageIndicator::Fa];
        assert_eq!(fa.direct, 0.0);
        let expected = 0.2 * scales.impact.threshold_of("2.5").unwrap()
            + 0.4 * scales.impact.threshold_of("1").unwrap();
        assert!((fa.indirect - expected).abs() < 1e-3);
        assert_eq!(fa.indirect_share, 1.0);
    }

    #[test]
    fn test_impact_sums_in_snapshot() {
        let scales = ScaleSystem::default();
        let snapshot = SnapshotBuilder::new(&scales).build(&sample_input());

        for hazard in &snapshot.hazards {
            for (_, result) in hazard.scenarios.iter() {
                let impact = &result.impact;
                let by_category: f64 = impact.categories.values().map(|c| c.absolute).sum();
                assert!((by_category - impact.total_absolute).abs() <= 1e-6);
                let relative: f64 = impact.categories.values().map(|c| c.relative).sum();
                assert!((relative - impact.total_relative).abs() <= 1e-9);
                assert!(result.total_risk >= 0.0);
            }
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let scales = ScaleSystem::default();
        let builder = SnapshotBuilder::new(&scales);
        let first = builder.build(&sample_input()).to_json().unwrap();
        let second = builder.build(&sample_input()).to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_json_round_trip_and_schema_check() {
        let scales = ScaleSystem::default();
        let snapshot = SnapshotBuilder::new(&scales).build(&sample_input());
        let json = snapshot.to_json().unwrap();
        assert!(json.contains("\"schema_version\": 1"));
        assert!(json.contains("\"Fa\""));

        let parsed = ResultSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed.hazards.len(), snapshot.hazards.len());

        let wrong = json.replace("\"schema_version\": 1", "\"schema_version\": 99");
        assert!(ResultSnapshot::from_json(&wrong).is_err());
    }

    #[test]
    fn test_loaded_snapshot_is_sorted_by_id() {
        let scales = ScaleSystem::default();
        let snapshot = SnapshotBuilder::new(&scales).build(&sample_input());

        let mut value = serde_json::to_value(&snapshot).unwrap();
        value["hazards"].as_array_mut().unwrap().reverse();
        let reversed = serde_json::to_string(&value).unwrap();

        let loaded = ResultSnapshot::from_json(&reversed).unwrap();
        for hazard in &snapshot.hazards {
            assert_eq!(loaded.hazard(&hazard.hazard_id).unwrap().hazard_id, hazard.hazard_id);
        }

        // Rebuilding from a loaded file keeps untouched records
        let rebuilt = SnapshotBuilder::new(&scales).rebuild(&loaded, &sample_input(), &[]);
        assert_eq!(rebuilt.hazards.len(), snapshot.hazards.len());
        for (kept, original) in rebuilt.hazards.iter().zip(&snapshot.hazards) {
            assert_eq!(kept.hazard_id, original.hazard_id);
            assert_eq!(kept.mrs, original.mrs);
        }
    }

    #[test]
    fn test_degraded_hazard_is_local() {
        let scales = ScaleSystem::default();
        let mut broken = sample_input();
        broken.hazards[2].scenarios.major.probability = Some("banana".to_string());

        let builder = SnapshotBuilder::new(&scales);
        let clean = builder.build(&sample_input());
        let degraded = builder.build(&broken);

        assert_eq!(degraded.hazard("cyber-attack").unwrap().issues.len(), 1);
        assert_eq!(degraded.hazard("power-outage"), clean.hazard("power-outage"));
        assert_eq!(degraded.hazard("heatwave"), clean.hazard("heatwave"));
    }

    #[test]
    fn test_duplicate_hazard_ids() {
        let scales = ScaleSystem::default();
        let mut doubled = sample_input();
        let mut copy = doubled.hazards[0].clone();
        copy.name = "Shadow".to_string();
        doubled.hazards.push(copy);

        let snapshot = SnapshotBuilder::new(&scales).build(&doubled);
        assert_eq!(snapshot.hazards.len(), 3);
        assert_eq!(snapshot.hazard("power-outage").unwrap().name, "Power outage");
        assert_eq!(snapshot.input_issues.len(), 1);
    }

    #[test]
    fn test_rebuild_matches_full_build() {
        let scales = ScaleSystem::default();
        let builder = SnapshotBuilder::new(&scales);
        let before = builder.build(&sample_input());

        let mut edited = sample_input();
        edited.hazards[1].scenarios.major.probability = Some("4".to_string());
        let rebuilt = builder.rebuild(&before, &edited, &[Change::Hazard("heatwave".to_string())]);
        assert_eq!(rebuilt, builder.build(&edited));
        assert_ne!(rebuilt.hazard("power-outage"), before.hazard("power-outage"));

        let mut rewired = edited.clone();
        rewired.cascades.push(serde_json::from_value(json!({
            "cause": "power-outage",
            "effect": "heatwave",
            "conditional": { "extreme": { "major": 0.1 } }
        })).unwrap());
        let rebuilt_edge = builder.rebuild(
            &rebuilt,
            &rewired,
            &[Change::Edge {
                cause: "power-outage".to_string(),
                effect: "heatwave".to_string(),
            }],
        );
        let full = builder.build(&rewired);
        assert_eq!(rebuilt_edge, full);
        assert!(full.hazard("heatwave").unwrap().in_cascade_cycle);
        assert!(!full.hazard("cyber-attack").unwrap().in_cascade_cycle);
    }

    #[test]
    fn test_rebuild_with_new_scale_runs_full_build() {
        let default_scales = ScaleSystem::default();
        let before = SnapshotBuilder::new(&default_scales).build(&sample_input());

        let decade = ScaleSystem::from_preset(crate::scale::ScalePreset::Decade, 1.0e6, 1.0e-2);
        let builder = SnapshotBuilder::new(&decade);
        let rebuilt = builder.rebuild(&before, &sample_input(), &[]);
        assert_eq!(rebuilt, builder.build(&sample_input()));
    }

    #[test]
    fn test_rebuild_with_new_custom_table_runs_full_build() {
        let table = |top: f64| {
            let entry = |label: &str, threshold: f64| ScaleEntry {
                label: label.to_string(),
                threshold,
            };
            ScaleTable::new(vec![entry("0", 0.0), entry("1", 1.0e8), entry("2", top)]).unwrap()
        };
        let custom = input(json!({
            "hazards": [
                { "id": "flood", "scenarios": {
                    "major": { "probability": "1", "damage": { "Fa": "2" } }
                } }
            ]
        }));

        let mut low = ScaleSystem::default();
        low.impact = table(1.0e9);
        let before = SnapshotBuilder::new(&low).build(&custom);

        // Same preset and baselines, different explicit impact table
        let mut high = low.clone();
        high.impact = table(5.0e9);
        let builder = SnapshotBuilder::new(&high);
        let rebuilt = builder.rebuild(&before, &custom, &[]);
        let full = builder.build(&custom);

        assert_eq!(rebuilt, full);
        let impact = |s: &ResultSnapshot| {
            s.hazard("flood")
                .unwrap()
                .scenarios
                .major
                .impact
                .total_absolute
        };
        assert_eq!(impact(&before), 1.0e9);
        assert_eq!(impact(&rebuilt), 5.0e9);
        assert!(before.analysis.built_under(&low));
        assert!(!before.analysis.built_under(&high));
    }
}
