use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::display::{FitMode, Monitor};
use crate::filter::FilterConfig;
use crate::platform::keep_awake::KeepAwakePlan;
use crate::tasks::clock::DEFAULT_INTERVAL;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Root directory to scan recursively for images.
    pub photo_library_path: Option<PathBuf>,
    /// Time each photo stays on screen.
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Minimum size and orientation a photo must have to be shown.
    pub filter: FilterConfig,
    /// Crop-to-fill or letterbox.
    pub fit_mode: FitMode,
    /// Index into `monitors` of the screen to show photos on.
    pub monitor: usize,
    /// Known monitors and their working areas.
    pub monitors: Vec<Monitor>,
    /// Optional deterministic seed for random selection.
    pub selection_seed: Option<u64>,
    /// Optional commands that keep the machine awake while running.
    pub keep_awake: Option<KeepAwakePlan>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: None,
            interval: DEFAULT_INTERVAL,
            filter: FilterConfig::default(),
            fit_mode: FitMode::default(),
            monitor: 0,
            monitors: Vec::new(),
            selection_seed: None,
            keep_awake: None,
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.interval.is_zero(), "interval must be greater than zero");
        ensure!(
            self.monitors.is_empty() || self.monitor < self.monitors.len(),
            "monitor index {} is out of range ({} monitors configured)",
            self.monitor,
            self.monitors.len()
        );
        if let Some(plan) = &self.keep_awake {
            ensure!(
                plan.engage_command.is_some() || plan.release_command.is_some(),
                "keep-awake must configure engage-command or release-command"
            );
        }
        Ok(self)
    }
}
