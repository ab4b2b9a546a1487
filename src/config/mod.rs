// Configuration - some fields only consumed by external drivers
#![allow(dead_code)]

use miette::{IntoDiagnostic, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::program::TargetProfile;

/// Configuration for a reachability analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Module binaries to load, resolved by the external metadata reader
    pub targets: Vec<PathBuf>,

    /// Entry-point identifiers (`M:Namespace.Type.Method(...)` strings)
    pub entry_points: Vec<String>,

    /// Platform surface the binaries target
    pub profile: TargetProfile,

    /// Report configuration
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Output format: text or json
    pub format: String,

    /// Also list reachable definitions, not only unreachable ones
    pub include_reachable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            targets: vec![],
            entry_points: vec![],
            profile: TargetProfile::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: "text".to_string(),
            include_reachable: false,
        }
    }
}

impl Config {
    /// Load configuration from a file (TOML or JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match extension {
            "json" => serde_json::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse JSON config"),
            "toml" => toml::from_str(&contents)
                .into_diagnostic()
                .wrap_err("Failed to parse TOML config"),
            _ => {
                // Try TOML first, then JSON
                if let Ok(config) = toml::from_str(&contents) {
                    Ok(config)
                } else {
                    serde_json::from_str(&contents)
                        .into_diagnostic()
                        .wrap_err("Failed to parse config file")
                }
            }
        }
    }

    /// Try to load configuration from default locations
    pub fn from_default_locations(project_root: &Path) -> Result<Self> {
        let default_names = [
            ".treeshake.toml",
            "treeshake.toml",
            ".treeshake.json",
            "treeshake.json",
        ];

        for name in &default_names {
            let path = project_root.join(name);
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // No config file found, use defaults
        Ok(Self::default())
    }
}
