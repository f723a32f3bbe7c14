//! riskcascade core library - hazard risk quantification and cascade aggregation

// Global invariants enforced in this crate:
// - The pipeline is a pure transformation from input records to a result snapshot
// - No global mutable state; scale tables are passed in, never read from globals
// - Per-hazard evaluation reads only the hazard's own inputs and adjacent edges
// - Missing or malformed data degrades locally to zero, never aborts a pass
// - Identical input yields byte-for-byte identical output

pub mod aggregates;
pub mod cascade;
pub mod config;
pub mod damage;
pub mod delta;
pub mod hazard;
pub mod indicator;
pub mod probability;
pub mod report;
pub mod scale;
pub mod scenario;
pub mod selector;
pub mod snapshot;

pub use cascade::CascadeGraph;
pub use config::ResolvedConfig;
pub use hazard::{AssessmentInput, CascadeEdgeRecord, Hazard};
pub use report::{format_money, render_delta_text, render_json, render_text, ReportOptions};
pub use scale::{ScaleSystem, ScaleTable};
pub use scenario::Scenario;
pub use snapshot::{ResultSnapshot, SnapshotBuilder};

use anyhow::Result;
use std::path::Path;

/// Assess an input document under the resolved configuration
pub fn assess(input: &AssessmentInput, config: &ResolvedConfig) -> ResultSnapshot {
    SnapshotBuilder::new(&config.scales).build(input)
}

/// Load and assess an input document
pub fn assess_file(path: &Path, config: &ResolvedConfig) -> Result<ResultSnapshot> {
    let input = AssessmentInput::load(path)?;
    Ok(assess(&input, config))
}
