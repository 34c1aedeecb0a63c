use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

/// Keeps the machine and display from sleeping while a slideshow runs.
pub trait KeepAwake: Send + Sync {
    fn engage(&self) -> Result<()>;
    fn release(&self) -> Result<()>;
}

/// Does nothing; the default when no keep-awake commands are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKeepAwake;

impl KeepAwake for NoKeepAwake {
    fn engage(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Shell commands run on session start and stop.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct KeepAwakePlan {
    pub engage_command: Option<String>,
    pub release_command: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommandKeepAwake {
    inner: Arc<KeepAwakePlan>,
}

impl CommandKeepAwake {
    pub fn new(plan: KeepAwakePlan) -> Result<Self> {
        if plan.engage_command.is_none() && plan.release_command.is_none() {
            return Err(anyhow!(
                "keep-awake plan must configure an engage or release command"
            ));
        }
        if let Some(cmd) = plan.engage_command.as_deref() {
            ensure_not_blank(cmd, "engage command")?;
        }
        if let Some(cmd) = plan.release_command.as_deref() {
            ensure_not_blank(cmd, "release command")?;
        }
        Ok(Self {
            inner: Arc::new(plan),
        })
    }
}

impl KeepAwake for CommandKeepAwake {
    fn engage(&self) -> Result<()> {
        match self.inner.engage_command.as_deref() {
            Some(cmd) => run_command(cmd).context("keep-awake engage failed"),
            None => Ok(()),
        }
    }

    fn release(&self) -> Result<()> {
        match self.inner.release_command.as_deref() {
            Some(cmd) => run_command(cmd).context("keep-awake release failed"),
            None => Ok(()),
        }
    }
}

fn run_command(command: &str) -> Result<()> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .with_context(|| format!("failed to spawn shell for command: {command}"))?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!(
            "command exited with status {}: {command}",
            status.code().unwrap_or(-1)
        ))
    }
}

fn ensure_not_blank(value: &str, label: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(anyhow!("{label} must not be blank"))
    } else {
        Ok(())
    }
}
