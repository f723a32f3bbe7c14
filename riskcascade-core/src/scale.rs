//! Scale conversion between absolute magnitudes and normalized class values
//!
//! Global invariants enforced:
//! - Scale table thresholds are strictly increasing; the first entry is the zero class
//! - `classify` is monotonic and never takes the logarithm of zero
//! - `relative_from_absolute` and `absolute_from_relative` are exact inverses
//! - Display rescaling never feeds back into risk arithmetic
//!
//! Relative law (continuous, extends past 5 for extreme values):
//! - below the baseline: `relative = absolute / baseline`
//! - at/above the baseline: `relative = 1 + log5(absolute / baseline)`

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Floor applied to any divisor that may be zero
pub const DIVISOR_FLOOR: f64 = 1e-8;

/// Base of the logarithmic part of the relative law
pub const LOG_BASE: f64 = 5.0;

/// Default monetized impact equivalent of relative value 1
pub const DEFAULT_IMPACT_BASELINE: f64 = 8.0e8;

/// Default annual occurrence rate equivalent of relative value 1
pub const DEFAULT_PROBABILITY_BASELINE: f64 = 1.0e-3;

/// One class of a scale table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleEntry {
    pub label: String,
    pub threshold: f64,
}

/// Immutable, strictly increasing list of class labels and absolute thresholds
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleTable {
    entries: Vec<ScaleEntry>,
}

impl ScaleTable {
    /// Validate and wrap a list of entries
    ///
    /// The first entry is the zero class and must have threshold 0.
    pub fn new(entries: Vec<ScaleEntry>) -> Result<Self> {
        let Some(first) = entries.first() else {
            anyhow::bail!("scale table must contain at least one class");
        };
        if first.threshold != 0.0 {
            anyhow::bail!(
                "first scale class '{}' must have threshold 0 (got {})",
                first.label,
                first.threshold
            );
        }

        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.label.trim().is_empty() {
                anyhow::bail!("scale class labels must not be empty");
            }
            if !seen.insert(entry.label.trim()) {
                anyhow::bail!("duplicate scale class label '{}'", entry.label);
            }
            if !entry.threshold.is_finite() {
                anyhow::bail!(
                    "scale class '{}' has a non-finite threshold",
                    entry.label
                );
            }
        }

        for pair in entries.windows(2) {
            if pair[1].threshold <= pair[0].threshold {
                anyhow::bail!(
                    "scale thresholds must be strictly increasing: '{}' ({}) follows '{}' ({})",
                    pair[1].label,
                    pair[1].threshold,
                    pair[0].label,
                    pair[0].threshold
                );
            }
        }

        Ok(ScaleTable { entries })
    }

    /// Current-generation table: half-step classes "0".."5.5" following the relative law
    pub fn half_step(baseline: f64) -> Self {
        let entries = (0..12)
            .map(|step| {
                let class = step as f64 * 0.5;
                ScaleEntry {
                    label: format_class_label(class),
                    threshold: absolute_from_relative(class, baseline),
                }
            })
            .collect();
        ScaleTable { entries }
    }

    /// Earlier-generation table: whole classes "0".."5", one decade per class
    pub fn decade(baseline: f64) -> Self {
        let entries = (0..6)
            .map(|class| {
                let threshold = if class == 0 {
                    0.0
                } else {
                    baseline * 10f64.powi(class - 1)
                };
                ScaleEntry {
                    label: class.to_string(),
                    threshold,
                }
            })
            .collect();
        ScaleTable { entries }
    }

    pub fn entries(&self) -> &[ScaleEntry] {
        &self.entries
    }

    /// Label of the designated zero class
    pub fn zero_class(&self) -> &str {
        &self.entries[0].label
    }

    /// Absolute threshold for a class label (whitespace-insensitive)
    pub fn threshold_of(&self, label: &str) -> Option<f64> {
        let label = label.trim();
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.threshold)
    }

    /// Class whose threshold's logarithm is closest to `ln(absolute)`
    ///
    /// Zero, negative and NaN values resolve to the zero class directly.
    /// Ties resolve to the lower class.
    pub fn classify(&self, absolute: f64) -> &str {
        if absolute.is_nan() || absolute <= 0.0 {
            return self.zero_class();
        }

        let target = absolute.ln();
        let mut best: Option<(&ScaleEntry, f64)> = None;
        for entry in self.entries.iter().filter(|e| e.threshold > 0.0) {
            let distance = (entry.threshold.ln() - target).abs();
            match best {
                Some((_, d)) if distance >= d => {}
                _ => best = Some((entry, distance)),
            }
        }

        best.map(|(e, _)| e.label.as_str())
            .unwrap_or_else(|| self.zero_class())
    }
}

/// Format a half-step class value as its label ("0", "0.5", "1", ...)
fn format_class_label(class: f64) -> String {
    if class.fract() == 0.0 {
        format!("{}", class as i64)
    } else {
        format!("{:.1}", class)
    }
}

/// Map an absolute magnitude onto the relative scale
pub fn relative_from_absolute(absolute: f64, baseline: f64) -> f64 {
    if absolute.is_nan() || absolute <= 0.0 {
        return 0.0;
    }
    let baseline = baseline.max(DIVISOR_FLOOR);
    if absolute < baseline {
        absolute / baseline
    } else {
        1.0 + (absolute / baseline).ln() / LOG_BASE.ln()
    }
}

/// Inverse of [`relative_from_absolute`]
pub fn absolute_from_relative(relative: f64, baseline: f64) -> f64 {
    if relative.is_nan() || relative <= 0.0 {
        return 0.0;
    }
    let baseline = baseline.max(DIVISOR_FLOOR);
    if relative < 1.0 {
        relative * baseline
    } else {
        baseline * LOG_BASE.powf(relative - 1.0)
    }
}

/// Display-only stretch of a class value
///
/// Compresses 0–1.5 onto 0–0.5 and expands 1.5–5 onto 0.5–5; the upper segment
/// continues linearly past 5.
pub fn rescale_for_display(raw: f64) -> f64 {
    if raw.is_nan() || raw <= 0.0 {
        0.0
    } else if raw <= 1.5 {
        raw / 3.0
    } else {
        0.5 + (raw - 1.5) * (4.5 / 3.5)
    }
}

/// Generation of scale definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalePreset {
    #[default]
    HalfStep,
    Decade,
}

impl ScalePreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalePreset::HalfStep => "half_step",
            ScalePreset::Decade => "decade",
        }
    }

    pub fn table(self, baseline: f64) -> ScaleTable {
        match self {
            ScalePreset::HalfStep => ScaleTable::half_step(baseline),
            ScalePreset::Decade => ScaleTable::decade(baseline),
        }
    }
}

/// Quantity a scale table measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Impact,
    Probability,
}

/// Scale tables and baselines passed into every aggregation step
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleSystem {
    pub preset: ScalePreset,
    pub impact: ScaleTable,
    pub probability: ScaleTable,
    pub impact_baseline: f64,
    pub probability_baseline: f64,
}

impl ScaleSystem {
    pub fn from_preset(
        preset: ScalePreset,
        impact_baseline: f64,
        probability_baseline: f64,
    ) -> Self {
        ScaleSystem {
            preset,
            impact: preset.table(impact_baseline),
            probability: preset.table(probability_baseline),
            impact_baseline,
            probability_baseline,
        }
    }

    pub fn table(&self, quantity: Quantity) -> &ScaleTable {
        match quantity {
            Quantity::Impact => &self.impact,
            Quantity::Probability => &self.probability,
        }
    }

    pub fn baseline(&self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Impact => self.impact_baseline,
            Quantity::Probability => self.probability_baseline,
        }
    }

    pub fn relative(&self, quantity: Quantity, absolute: f64) -> f64 {
        relative_from_absolute(absolute, self.baseline(quantity))
    }
}

impl Default for ScaleSystem {
    fn default() -> Self {
        ScaleSystem::from_preset(
            ScalePreset::HalfStep,
            DEFAULT_IMPACT_BASELINE,
            DEFAULT_PROBABILITY_BASELINE,
        )
    }
}
