//! Reporting and output generation
//!
//! Global invariants enforced:
//! - Deterministic output ordering
//! - Byte-for-byte identical output across runs
//! - Display rescaling and money rounding never flow back into snapshot values

use crate::delta::SnapshotDelta;
use crate::snapshot::{HazardSnapshot, ResultSnapshot};

/// Money units used by [`format_money`], largest first
const MONEY_UNITS: [(f64, &str); 4] = [
    (1.0e12, "trillion"),
    (1.0e9, "billion"),
    (1.0e6, "million"),
    (1.0e3, "thousand"),
];

/// Filters applied before rendering
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub top_n: Option<usize>,
    pub min_risk: Option<f64>,
    pub currency: String,
}

/// Format an amount of money, e.g. `CHF 1.25 billion`
pub fn format_money(amount: f64, currency: &str) -> String {
    let amount = if amount.is_finite() { amount } else { 0.0 };
    let sign = if amount < 0.0 { "-" } else { "" };
    let magnitude = amount.abs();

    for (unit, name) in MONEY_UNITS {
        if magnitude >= unit {
            return format!("{} {}{:.2} {}", currency, sign, magnitude / unit, name);
        }
    }
    format!("{} {}{:.2}", currency, sign, magnitude)
}

/// Sort hazards deterministically
pub fn sort_hazards(hazards: &[HazardSnapshot]) -> Vec<&HazardSnapshot> {
    let mut sorted: Vec<&HazardSnapshot> = hazards.iter().collect();
    sorted.sort_by(|a, b| {
        // 1. MRS risk descending
        b.mrs_risk()
            .partial_cmp(&a.mrs_risk())
            .unwrap_or(std::cmp::Ordering::Equal)
            // 2. Hazard id ascending
            .then_with(|| a.hazard_id.cmp(&b.hazard_id))
    });
    sorted
}

/// Sorted hazards after the `min_risk` and `top_n` filters
pub fn select_hazards<'a>(
    snapshot: &'a ResultSnapshot,
    options: &ReportOptions,
) -> Vec<&'a HazardSnapshot> {
    let mut hazards = sort_hazards(&snapshot.hazards);
    if let Some(min) = options.min_risk {
        hazards.retain(|h| h.mrs_risk() >= min);
    }
    if let Some(n) = options.top_n {
        hazards.truncate(n);
    }
    hazards
}

/// Render a snapshot as text output
pub fn render_text(snapshot: &ResultSnapshot, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<13} {:<6} {:<6} {:<22} {:<22} {:<24} {}\n",
        "MRS", "P", "I", "IMPACT", "RISK/YEAR", "ID", "NAME"
    ));

    for hazard in select_hazards(snapshot, options) {
        let result = hazard.mrs_result();
        // Hazards on a cascade cycle are marked; their cascade values are one hop only
        let id = if hazard.in_cascade_cycle {
            format!("{}*", hazard.hazard_id)
        } else {
            hazard.hazard_id.clone()
        };
        output.push_str(&format!(
            "{:<13} {:<6.2} {:<6.2} {:<22} {:<22} {:<24} {}\n",
            hazard.mrs.as_str(),
            result.probability.total_relative,
            result.impact.total_relative,
            format_money(result.impact.total_absolute, &options.currency),
            format_money(result.total_risk, &options.currency),
            truncate_or_pad(&id, 24),
            hazard.name,
        ));
    }

    let issues: usize = snapshot.hazards.iter().map(|h| h.issues.len()).sum::<usize>()
        + snapshot.input_issues.len();
    if issues > 0 {
        output.push_str(&format!("\n{} input issue(s):\n", issues));
        for issue in &snapshot.input_issues {
            output.push_str(&format!("  {}\n", issue));
        }
        for hazard in &snapshot.hazards {
            for issue in &hazard.issues {
                output.push_str(&format!("  {}: {}\n", hazard.hazard_id, issue));
            }
        }
    }

    output
}

/// Render a snapshot as JSON output
pub fn render_json(snapshot: &ResultSnapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
}

/// Render the changed entries of a delta as text output
pub fn render_delta_text(delta: &SnapshotDelta, currency: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "{:<10} {:<24} {:<28} {}\n",
        "STATUS", "ID", "MRS", "RISK CHANGE/YEAR"
    ));

    let mut changed = 0;
    for entry in delta.changed() {
        changed += 1;
        let mrs = match (&entry.mrs_transition, &entry.before, &entry.after) {
            (Some(t), _, _) => format!("{} -> {}", t.from, t.to),
            (None, _, Some(after)) => after.mrs.to_string(),
            (None, Some(before), None) => before.mrs.to_string(),
            (None, None, None) => "-".to_string(),
        };
        output.push_str(&format!(
            "{:<10} {:<24} {:<28} {}\n",
            entry.status.as_str(),
            truncate_or_pad(&entry.hazard_id, 24),
            mrs,
            format_money(entry.risk_delta, currency),
        ));
    }

    output.push_str(&format!(
        "\n{} changed, {} unchanged\n",
        changed,
        delta.entries.len() - changed
    ));
    output
}

/// Truncate or pad string to fixed width (in characters)
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}
