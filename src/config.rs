//! YAML configuration for generation and reporting

use crate::incompat::IncompatibilityClassification;
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CONFIG_VERSION: &str = "v1";

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generate: GenerateConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Options for descriptor generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateConfig {
    /// Package name; derived from the input file name when unset
    #[serde(default)]
    pub package: Option<String>,
    /// Load and generate documents referenced through external `$ref`s
    #[serde(default = "default_true")]
    pub resolve_symbolic_references: bool,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            package: None,
            resolve_symbolic_references: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Options for incompatibility reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub mode: ReportMode,
    /// Classifications dropped from reports and aggregates
    #[serde(default)]
    pub except_classifications: Vec<IncompatibilityClassification>,
}

/// Kind of incompatibility report to produce
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Token paths and classifications
    #[default]
    Base,
    /// Positions and hints in addition
    Detailed,
}

impl ReportMode {
    /// Mode selected by a plugin-style `name=value` parameter.
    ///
    /// Only the `report` parameter is understood; `1`/`incomp` select the base
    /// report and `2`/`detailed-incomp` the detailed one.
    pub fn from_plugin_parameter(name: &str, value: &str) -> anyhow::Result<Self> {
        if name != "report" {
            bail!("unknown parameter '{name}', expected 'report'");
        }
        match value {
            "1" | "incomp" => Ok(ReportMode::Base),
            "2" | "detailed-incomp" => Ok(ReportMode::Detailed),
            other => bail!("unknown report value '{other}', expected 1 or 2"),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config '{}'", path.display()))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        #[derive(Deserialize)]
        struct ConfigFile {
            #[serde(default)]
            version: Option<String>,
            #[serde(flatten)]
            config: Config,
        }

        let file: ConfigFile = serde_yaml::from_str(yaml).context("Invalid configuration")?;
        if let Some(version) = file.version.as_deref() {
            if version != CONFIG_VERSION {
                bail!("Unsupported configuration version '{version}', expected '{CONFIG_VERSION}'");
            }
        }
        Ok(file.config)
    }
}
