use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    /// Variables bound in the root environment, without the `$` sigil.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub step: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            verbose: false,
            step: false,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    variables: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    verbose: Option<bool>,
    step: Option<bool>,
    log_level: Option<String>,
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay from `path`, or from
    ///    ~/.config/pipe-runner/config.toml when no path is given (if it exists)
    ///
    /// Scalars override, variables are merged with the overlay winning.
    /// An explicit `path` that cannot be read is an error; a malformed
    /// overlay is reported and ignored.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();
        let content = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("can't read config {}", path.display()))?,
            ),
            None => Self::read_user_overlay(),
        };
        if let Some(overlay) = content.as_deref().and_then(Self::parse_overlay) {
            config.apply_overlay(overlay);
        }
        Ok(config)
    }

    fn read_user_overlay() -> Option<String> {
        let home = std::env::var_os("HOME")?;
        let path = Path::new(&home).join(".config/pipe-runner/config.toml");
        std::fs::read_to_string(path).ok()
    }

    fn parse_overlay(content: &str) -> Option<ConfigOverlay> {
        match toml::from_str(content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("pipe_runner: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.verbose {
            self.settings.verbose = v;
        }
        if let Some(v) = s.step {
            self.settings.step = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }

        self.variables.extend(overlay.variables);
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert!(!config.settings.verbose);
        assert!(!config.settings.step);
        assert_eq!(config.settings.log_level, "info");
        assert!(config.variables.is_empty());
    }

    #[test]
    fn overlay_overrides_scalars() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [settings]
            verbose = true
            log_level = "debug"
            "#,
        );
        assert!(config.settings.verbose);
        assert!(!config.settings.step);
        assert_eq!(config.settings.log_level, "debug");
    }

    #[test]
    fn overlay_merges_variables() {
        let mut config = Config::default_config();
        config.variables.insert("target".into(), "dist".into());
        config.apply_overlay_str(
            r#"
            [variables]
            target = "build"
            owner = "ops"
            "#,
        );
        assert_eq!(config.variables["target"], "build");
        assert_eq!(config.variables["owner"], "ops");
    }

    #[test]
    fn empty_overlay_changes_nothing() {
        let mut config = Config::default_config();
        config.apply_overlay_str("");
        assert_eq!(config.settings.log_level, "info");
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[settings]\nstep = true\n[variables]\nname = \"x\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(config.settings.step);
        assert_eq!(config.variables["name"], "x");
    }

    #[test]
    fn load_missing_explicit_path_errors() {
        assert!(Config::load(Some(Path::new("/definitely/missing.toml"))).is_err());
    }

    #[test]
    fn load_malformed_overlay_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[settings\nverbose = ").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert!(!config.settings.verbose);
    }
}
