//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/ttm/ttm.toml`
//! 3. Local config: `<dir>/.ttm.toml` (working directory unless given)
//! 4. Environment variables: `TTM_*` prefix, `__` between section and key

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{SearchMode, SearchOptions, DEFAULT_MAX_VISITS};

/// Search limits and mode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SolverConfig {
    /// Visit ceiling per seed before the safety guard stops the search
    pub max_visits: u64,
    /// Run independent seeds and trees on the rayon pool
    pub parallel: bool,
    pub mode: SearchMode,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_visits: DEFAULT_MAX_VISITS,
            parallel: true,
            mode: SearchMode::Single,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Write skillset lines instead of raw masks
    pub print_skillsets: bool,
}

/// Raw solver config for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSolverConfig {
    pub max_visits: Option<u64>,
    pub parallel: Option<bool>,
    pub mode: Option<SearchMode>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawOutputConfig {
    pub print_skillsets: Option<bool>,
}

/// Raw settings for intermediate parsing.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub solver: RawSolverConfig,
    pub output: RawOutputConfig,
}

/// Unified configuration for ttm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub solver: SolverConfig,
    pub output: OutputConfig,
}

/// Get the XDG config directory for ttm.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "ttm").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("ttm.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".ttm.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            solver: SolverConfig {
                max_visits: overlay.solver.max_visits.unwrap_or(self.solver.max_visits),
                parallel: overlay.solver.parallel.unwrap_or(self.solver.parallel),
                mode: overlay.solver.mode.unwrap_or(self.solver.mode),
            },
            output: OutputConfig {
                print_skillsets: overlay
                    .output
                    .print_skillsets
                    .unwrap_or(self.output.print_skillsets),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Directory holding `.ttm.toml`, defaults to the working directory
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        let local_dir = match local_dir {
            Some(dir) => Some(dir.to_path_buf()),
            None => std::env::current_dir().ok(),
        };
        if let Some(dir) = local_dir {
            let local_path = local_config_path(&dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        Self::apply_env_overrides(current)
    }

    /// Apply TTM_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TTM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get::<u64>("solver.max_visits") {
            settings.solver.max_visits = val;
        }
        if let Ok(val) = config.get_bool("solver.parallel") {
            settings.solver.parallel = val;
        }
        if let Ok(val) = config.get_string("solver.mode") {
            settings.solver.mode = match val.to_ascii_lowercase().as_str() {
                "single" => SearchMode::Single,
                "all" => SearchMode::All,
                other => {
                    return Err(ApplicationError::Config {
                        message: format!("TTM_SOLVER__MODE must be 'single' or 'all', got '{other}'"),
                    })
                }
            };
        }
        if let Ok(val) = config.get_bool("output.print_skillsets") {
            settings.output.print_skillsets = val;
        }

        Ok(settings)
    }

    /// Search options for a run with these settings.
    pub fn search_options(&self) -> SearchOptions {
        SearchOptions {
            mode: self.solver.mode,
            max_visits: self.solver.max_visits,
            parallel: self.solver.parallel,
            cancel: None,
        }
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# ttm configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/ttm/ttm.toml
#   Local:  ./.ttm.toml
#   Env:    TTM_* environment variables, e.g. TTM_SOLVER__MAX_VISITS=1000000

[solver]
# Visit ceiling per seed; the search stops and reports a partial result beyond it
# max_visits = 500000000

# Solve seeds and trees on all cores
# parallel = true

# "single": only the target point count, "all": every count up to the target
# mode = "single"

[output]
# Write skillset lines (name:p1:p2:...;) instead of raw masks
# print_skillsets = false
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_partial_overlay_when_merging_then_unspecified_keys_kept() {
        let base = Settings::default();
        let overlay = RawSettings {
            solver: RawSolverConfig {
                max_visits: Some(10),
                ..Default::default()
            },
            ..Default::default()
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.solver.max_visits, 10);
        assert!(merged.solver.parallel);
        assert_eq!(merged.solver.mode, SearchMode::Single);
        assert!(!merged.output.print_skillsets);
    }

    #[test]
    fn given_template_when_parsing_then_yields_defaults() {
        let raw: RawSettings = toml::from_str(&Settings::template()).expect("template parses");
        assert_eq!(Settings::default().merge_with(&raw), Settings::default());
    }

    #[test]
    fn given_settings_when_serializing_then_mode_is_lowercase() {
        let toml = Settings::default().to_toml().expect("serialize");
        assert!(toml.contains("mode = \"single\""));
        assert!(toml.contains("max_visits = 500000000"));
    }
}
