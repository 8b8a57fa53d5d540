use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use super::collections::HashSet;
use crate::layout_engine::Orientation;

const MAX_WORKSPACES: usize = 32;

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap_or_default().join(".tilewm") }
pub fn restore_file() -> PathBuf { data_dir().join("layout.ron") }
pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".config").join("tilewm").join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub layout: LayoutSettings,
    /// Workspaces created on every monitor when a fresh layout is built.
    #[serde(default = "default_workspace_names")]
    pub workspace_names: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            layout: LayoutSettings::default(),
            workspace_names: default_workspace_names(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Fraction of the parent moved by one resize step.
    #[serde(default = "default_resize_percentage")]
    pub resize_percentage: f64,
    /// Floor below which a resize will not shrink any container.
    #[serde(default = "default_min_size_percentage")]
    pub min_size_percentage: f64,
    #[serde(default)]
    pub default_layout: Orientation,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            resize_percentage: default_resize_percentage(),
            min_size_percentage: default_min_size_percentage(),
            default_layout: Orientation::default(),
        }
    }
}

fn default_resize_percentage() -> f64 { 0.05 }

fn default_min_size_percentage() -> f64 { 0.05 }

fn default_workspace_names() -> Vec<String> { (1..=4).map(|i| i.to_string()).collect() }

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = self.layout.validate();

        if self.workspace_names.is_empty() {
            issues.push("workspace_names must not be empty".to_string());
        }
        if self.workspace_names.len() > MAX_WORKSPACES {
            issues.push(format!(
                "at most {MAX_WORKSPACES} workspaces are supported, got {}",
                self.workspace_names.len()
            ));
        }
        let mut seen = HashSet::default();
        for name in &self.workspace_names {
            if name.trim().is_empty() {
                issues.push("workspace names must not be blank".to_string());
            } else if !seen.insert(name.as_str()) {
                issues.push(format!("duplicate workspace name {name:?}"));
            }
        }

        issues
    }
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !(self.resize_percentage > 0.0 && self.resize_percentage <= 0.5) {
            issues.push(format!(
                "resize_percentage must be in (0, 0.5], got {}",
                self.resize_percentage
            ));
        }
        if !(0.0..0.5).contains(&self.min_size_percentage) {
            issues.push(format!(
                "min_size_percentage must be in [0, 0.5), got {}",
                self.min_size_percentage
            ));
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Reads `path` if it exists, falling back to the defaults otherwise.
    pub fn read_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() { Self::read(path) } else { Ok(Config::default()) }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(config) => Ok(config),
            Err(e) => bail!("{}", e.to_string().trim_end()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn shipped_defaults_match_builtin_defaults() {
        let cfg = Config::parse(include_str!("../../tilewm.default.toml")).unwrap();
        assert_eq!(Config::default(), cfg);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = Config::parse("").unwrap();
        assert_eq!(Config::default(), cfg);
        assert_eq!(0.05, cfg.settings.layout.resize_percentage);
        assert_eq!(Orientation::Horizontal, cfg.settings.layout.default_layout);
    }

    #[test]
    fn partial_layout_section() {
        let cfg = Config::parse(
            r#"
            [settings.layout]
            resize_percentage = 0.1
            default_layout = "vertical"
            "#,
        )
        .unwrap();
        assert_eq!(
            LayoutSettings {
                resize_percentage: 0.1,
                min_size_percentage: 0.05,
                default_layout: Orientation::Vertical,
            },
            cfg.settings.layout
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::parse("[settings.layout]\nresize = 0.1\n").unwrap_err();
        assert!(err.to_string().contains("resize"), "{err}");
        assert!(Config::parse("[settings.layout]\ndefault_layout = \"diagonal\"\n").is_err());
    }

    #[test]
    fn validate_reports_every_issue() {
        let mut cfg = Config::default();
        cfg.settings.layout.resize_percentage = 0.0;
        cfg.settings.layout.min_size_percentage = 0.7;
        cfg.settings.workspace_names = vec!["a".into(), "a".into(), " ".into()];
        let issues = cfg.validate();
        assert_eq!(4, issues.len(), "{issues:?}");
        assert!(issues.iter().any(|i| i.contains("duplicate workspace name \"a\"")));
    }

    #[test]
    fn save_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.settings.layout.default_layout = Orientation::Vertical;
        cfg.settings.workspace_names = vec!["web".into(), "code".into()];
        cfg.save(&path).unwrap();
        assert_eq!(cfg, Config::read(&path).unwrap());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert_eq!(Config::default(), Config::read_or_default(&path).unwrap());
        let err = Config::read(&path).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"), "{err:#}");
    }
}
