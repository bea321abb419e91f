use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::limiter::policy::LimitsConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Directory to write JSONL logs.
    /// Default: ./logs
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub limits: LimitsConfig,

    /// How often stale limiter entries are dropped (seconds). Default: 300
    pub sweep_interval_secs: Option<u64>,

    #[serde(default)]
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModerationConfig {
    /// YAML word lists; the built-in lists are used when unset.
    pub lists_path: Option<PathBuf>,
    pub hot_reload_secs: Option<u64>,
}

impl AppConfig {
    /// Read and parse `path`, resolving relative paths against its directory.
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        let mut cfg: AppConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parse config: {}", path.display()))?;
        cfg.resolve_paths(path.parent().unwrap_or_else(|| Path::new(".")));
        Ok(cfg)
    }

    pub fn log_dir_path(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("logs"))
    }

    pub fn sweep_interval_secs(&self) -> u64 {
        self.sweep_interval_secs.unwrap_or(300).max(1)
    }

    pub fn lists_hot_reload_secs(&self) -> u64 {
        self.moderation.hot_reload_secs.unwrap_or(3).max(1)
    }

    /// Resolve all relative paths in config based on the directory containing the config file.
    pub fn resolve_paths(&mut self, base_dir: &Path) {
        if let Some(p) = &self.log_dir {
            self.log_dir = Some(resolve_path(base_dir, p));
        }
        if let Some(p) = &self.moderation.lists_path {
            self.moderation.lists_path = Some(resolve_path(base_dir, p));
        }
    }
}

fn resolve_path(base_dir: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::policy::LimitPolicy;

    #[test]
    fn parses_and_resolves() {
        let mut cfg: AppConfig = serde_yaml::from_str(
            r#"
log_dir: out/logs
sweep_interval_secs: 60
limits:
  poll_creation:
    max_requests: 1
    window_ms: 1000
    block_duration_ms: 5000
    max_blocked_attempts: 0
moderation:
  lists_path: lists.yaml
"#,
        )
        .unwrap();
        cfg.resolve_paths(Path::new("/etc/blockvote"));

        assert_eq!(cfg.log_dir_path(), PathBuf::from("/etc/blockvote/out/logs"));
        assert_eq!(cfg.moderation.lists_path, Some(PathBuf::from("/etc/blockvote/lists.yaml")));
        assert_eq!(cfg.sweep_interval_secs(), 60);
        assert_eq!(cfg.lists_hot_reload_secs(), 3);
        assert_eq!(cfg.limits.poll_creation.max_requests, 1);
        assert_eq!(cfg.limits.voting, LimitPolicy::voting());
    }

    #[test]
    fn missing_file_means_defaults() {
        let cfg = AppConfig::load(Path::new("/nonexistent/blockvote/config.yaml")).unwrap();
        assert_eq!(cfg.log_dir_path(), PathBuf::from("logs"));
        assert_eq!(cfg.sweep_interval_secs(), 300);
        assert!(cfg.moderation.lists_path.is_none());
    }
}
