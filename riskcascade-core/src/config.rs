//! Configuration file support for riskcascade
//!
//! Loads assessment configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.riskcascaderc.json` in the working directory
//! 3. `riskcascade.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::scale::{
    ScaleEntry, ScalePreset, ScaleSystem, ScaleTable, DEFAULT_IMPACT_BASELINE,
    DEFAULT_PROBABILITY_BASELINE,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default display currency
const DEFAULT_CURRENCY: &str = "CHF";

/// riskcascade configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskcascadeConfig {
    /// Scale system used to convert class labels to magnitudes
    #[serde(default)]
    pub scale: Option<ScaleConfig>,

    /// Report filters and formatting
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

/// Scale system settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleConfig {
    /// Generation of scale tables (default: half_step)
    pub preset: Option<ScalePreset>,
    /// Money equivalent of relative impact 1 (default: 8e8)
    pub impact_baseline: Option<f64>,
    /// Annual rate equivalent of relative probability 1 (default: 1e-3)
    pub probability_baseline: Option<f64>,
    /// Explicit impact table replacing the preset one
    pub impact_table: Option<Vec<ScaleEntry>>,
    /// Explicit probability table replacing the preset one
    pub probability_table: Option<Vec<ScaleEntry>>,
}

/// Report settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    /// Maximum number of hazards to show
    pub top: Option<usize>,
    /// Minimum MRS total risk to report (default: 0.0, report all)
    pub min_risk: Option<f64>,
    /// Display currency code (default: CHF)
    pub currency: Option<String>,
}

/// Resolved configuration with the scale system built
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub scales: ScaleSystem,
    /// Filters
    pub min_risk: Option<f64>,
    pub top_n: Option<usize>,
    pub currency: String,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl RiskcascadeConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        if let Some(ref scale) = self.scale {
            for (name, value) in [
                ("impact_baseline", scale.impact_baseline),
                ("probability_baseline", scale.probability_baseline),
            ] {
                if let Some(v) = value {
                    if !v.is_finite() || v <= 0.0 {
                        anyhow::bail!("scale.{} must be positive and finite (got {})", name, v);
                    }
                }
            }

            if let Some(ref entries) = scale.impact_table {
                ScaleTable::new(entries.clone()).context("invalid scale.impact_table")?;
            }
            if let Some(ref entries) = scale.probability_table {
                ScaleTable::new(entries.clone()).context("invalid scale.probability_table")?;
            }
        }

        if let Some(ref report) = self.report {
            if let Some(min) = report.min_risk {
                if !min.is_finite() || min < 0.0 {
                    anyhow::bail!("report.min_risk must be non-negative (got {})", min);
                }
            }
            if report.top == Some(0) {
                anyhow::bail!("report.top must be at least 1");
            }
            if let Some(ref currency) = report.currency {
                if currency.trim().is_empty() {
                    anyhow::bail!("report.currency must not be empty");
                }
            }
        }

        Ok(())
    }

    /// Resolve config into the immutable form passed to the pipeline
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let scale = self.scale.clone().unwrap_or_default();
        let mut scales = ScaleSystem::from_preset(
            scale.preset.unwrap_or_default(),
            scale.impact_baseline.unwrap_or(DEFAULT_IMPACT_BASELINE),
            scale
                .probability_baseline
                .unwrap_or(DEFAULT_PROBABILITY_BASELINE),
        );
        if let Some(entries) = scale.impact_table {
            scales.impact = ScaleTable::new(entries)?;
        }
        if let Some(entries) = scale.probability_table {
            scales.probability = ScaleTable::new(entries)?;
        }

        let report = self.report.clone().unwrap_or_default();

        Ok(ResolvedConfig {
            scales,
            min_risk: report.min_risk,
            top_n: report.top,
            currency: report
                .currency
                .map(|c| c.trim().to_string())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        RiskcascadeConfig::default().resolve()
    }
}

/// Discover and load a config file from the project root
///
/// Search order:
/// 1. `.riskcascaderc.json`
/// 2. `riskcascade.config.json`
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(project_root: &Path) -> Result<Option<(RiskcascadeConfig, PathBuf)>> {
    for name in [".riskcascaderc.json", "riskcascade.config.json"] {
        let path = project_root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }

    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<RiskcascadeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: RiskcascadeConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config for a project
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config from the project root.
/// Returns default config if nothing is found.
pub fn load_and_resolve(project_root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(project_root)? {
            Some((config, path)) => (config, Some(path)),
            None => (RiskcascadeConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = RiskcascadeConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert_eq!(resolved.scales, ScaleSystem::default());
        assert_eq!(resolved.currency, "CHF");
        assert!(resolved.min_risk.is_none());
        assert!(resolved.top_n.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: RiskcascadeConfig = serde_json::from_str("{}").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "scale": {
                "preset": "decade",
                "impact_baseline": 1.0e6,
                "probability_baseline": 0.01
            },
            "report": {
                "top": 20,
                "min_risk": 1000.0,
                "currency": "EUR"
            }
        }"#;
        let config: RiskcascadeConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.scales.preset, ScalePreset::Decade);
        assert_eq!(resolved.scales.impact_baseline, 1.0e6);
        assert_eq!(resolved.scales.impact.threshold_of("2"), Some(1.0e7));
        assert_eq!(resolved.scales.probability.threshold_of("1"), Some(0.01));
        assert_eq!(resolved.top_n, Some(20));
        assert_eq!(resolved.min_risk, Some(1000.0));
        assert_eq!(resolved.currency, "EUR");
    }

    #[test]
    fn test_explicit_table_replaces_preset() {
        let json = r#"{
            "scale": {
                "impact_table": [
                    { "label": "none", "threshold": 0 },
                    { "label": "low", "threshold": 1e6 },
                    { "label": "high", "threshold": 1e9 }
                ]
            }
        }"#;
        let config: RiskcascadeConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.scales.impact.threshold_of("high"), Some(1.0e9));
        assert_eq!(resolved.scales.impact.threshold_of("1"), None);
        // Probability keeps the preset table
        assert_eq!(
            resolved.scales.probability.threshold_of("1"),
            Some(DEFAULT_PROBABILITY_BASELINE)
        );
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<RiskcascadeConfig, _> =
            serde_json::from_str(r#"{"unknown_field": true}"#);
        assert!(result.is_err(), "unknown fields should be rejected");
        let result: Result<RiskcascadeConfig, _> =
            serde_json::from_str(r#"{"scale": {"base": 5}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_reject_bad_baselines() {
        for json in [
            r#"{"scale": {"impact_baseline": 0}}"#,
            r#"{"scale": {"impact_baseline": -8e8}}"#,
            r#"{"scale": {"probability_baseline": -1}}"#,
        ] {
            let config: RiskcascadeConfig = serde_json::from_str(json).unwrap();
            assert!(config.validate().is_err(), "{} should be rejected", json);
        }
    }

    #[test]
    fn test_reject_unordered_table() {
        let json = r#"{"scale": {"probability_table": [
            { "label": "0", "threshold": 0 },
            { "label": "1", "threshold": 0.1 },
            { "label": "2", "threshold": 0.01 }
        ]}}"#;
        let config: RiskcascadeConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_duplicate_table_labels() {
        let json = r#"{"scale": {"impact_table": [
            { "label": "0", "threshold": 0 },
            { "label": "1", "threshold": 10 },
            { "label": "1", "threshold": 100 }
        ]}}"#;
        let config: RiskcascadeConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_report_filters() {
        let config: RiskcascadeConfig =
            serde_json::from_str(r#"{"report": {"min_risk": -1.0}}"#).unwrap();
        assert!(config.validate().is_err());
        let config: RiskcascadeConfig = serde_json::from_str(r#"{"report": {"top": 0}}"#).unwrap();
        assert!(config.validate().is_err());
        let config: RiskcascadeConfig =
            serde_json::from_str(r#"{"report": {"currency": "  "}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_discover_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".riskcascaderc.json");
        fs::write(&config_path, r#"{"report": {"min_risk": 5.0}}"#).unwrap();

        let result = discover_config(dir.path()).unwrap();
        let (config, path) = result.unwrap();
        assert_eq!(config.report.unwrap().min_risk, Some(5.0));
        assert_eq!(path, config_path);
    }

    #[test]
    fn test_discover_config_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("riskcascade.config.json"),
            r#"{"report": {"top": 10}}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.report.unwrap().top, Some(10));
    }

    #[test]
    fn test_discover_priority_order() {
        let dir = tempfile::tempdir().unwrap();

        // Create both config files - .riskcascaderc.json should win
        fs::write(
            dir.path().join(".riskcascaderc.json"),
            r#"{"report": {"top": 1}}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("riskcascade.config.json"),
            r#"{"report": {"top": 2}}"#,
        )
        .unwrap();

        let (config, _) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(
            config.report.unwrap().top,
            Some(1),
            ".riskcascaderc.json should take priority"
        );
    }

    #[test]
    fn test_discover_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".riskcascaderc.json"), "{ not json").unwrap();
        assert!(discover_config(dir.path()).is_err());
    }

    #[test]
    fn test_no_config_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_and_resolve_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.scales.impact_baseline, DEFAULT_IMPACT_BASELINE);
    }

    #[test]
    fn test_load_and_resolve_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.json");
        fs::write(&config_path, r#"{"scale": {"impact_baseline": 2.0e9}}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&config_path)).unwrap();
        assert_eq!(resolved.scales.impact_baseline, 2.0e9);
        assert_eq!(resolved.scales.impact.threshold_of("1"), Some(2.0e9));
        assert_eq!(resolved.config_path, Some(config_path));
    }
}
