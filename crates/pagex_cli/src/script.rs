//! Navigation scripts
//!
//! A script is a list of steps, one per argument:
//!
//! - `/about` navigates once the host is idle
//! - `/about@250` navigates 250ms after the previous step
//! - `!/about` reports a failed navigation to `/about`

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Trigger {
    /// Wait for the running transition to finish
    Idle,
    /// Fire after a fixed delay
    After(f64),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub path: String,
    pub trigger: Trigger,
    pub fails: bool,
}

impl Step {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (fails, raw) = match raw.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };

        let (path, trigger) = match raw.rsplit_once('@') {
            Some((path, delay)) => {
                let delay: f64 = delay
                    .parse()
                    .with_context(|| format!("Invalid delay in step '{}'", raw))?;
                if !delay.is_finite() || delay < 0.0 {
                    bail!("Delay must be a non-negative number of milliseconds, got {}", delay);
                }
                (path, Trigger::After(delay))
            }
            None => (raw, Trigger::Idle),
        };

        if !path.starts_with('/') {
            bail!("Step path must start with '/', got '{}'", path);
        }

        Ok(Self {
            path: path.to_string(),
            trigger,
            fails,
        })
    }
}

pub fn parse(steps: &[String]) -> Result<Vec<Step>> {
    steps.iter().map(|raw| Step::parse(raw)).collect()
}
