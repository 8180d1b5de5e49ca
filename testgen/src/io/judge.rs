//! Optional external quality judge for generated test code.

use serde::Deserialize;
use tracing::{instrument, warn};

use super::config::HookConfig;
use super::hook::HookCommand;
use crate::core::types::Judgment;
use crate::error::HookError;

/// Score reported when no judge is configured or the judge failed.
pub const NEUTRAL_SCORE: f64 = 5.0;

pub trait Judge {
    fn judge(&self, test_source: &str) -> Result<Judgment, HookError>;
}

/// Passing judgment used when no judge could be consulted.
pub fn neutral_judgment(reason: &str) -> Judgment {
    Judgment {
        score: NEUTRAL_SCORE,
        passed: true,
        feedback: format!("quality judge unavailable: {reason}"),
    }
}

/// Ask `judge` for a verdict, degrading to [`neutral_judgment`] on absence or failure.
pub fn judge_or_neutral(judge: Option<&dyn Judge>, test_source: &str) -> Judgment {
    let Some(judge) = judge else {
        return neutral_judgment("not configured");
    };
    match judge.judge(test_source) {
        Ok(judgment) => judgment,
        Err(err) => {
            warn!(err = %err, "quality judge failed, using neutral judgment");
            neutral_judgment(&err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawJudgment {
    score: f64,
    passed: Option<bool>,
    #[serde(default)]
    feedback: String,
}

/// Judge that pipes test source to an external command expecting one JSON
/// object `{"score": .., "passed": .., "feedback": ..}` on stdout.
#[derive(Debug, Clone)]
pub struct CommandJudge {
    command: HookCommand,
    threshold: f64,
}

impl CommandJudge {
    pub fn new(command: HookCommand, threshold: f64) -> Self {
        Self { command, threshold }
    }

    /// `None` when the hook is disabled in config.
    pub fn from_config(cfg: &HookConfig, threshold: f64) -> Option<Self> {
        cfg.enabled().then(|| {
            Self::new(
                HookCommand::new(cfg.command.clone(), cfg.timeout()),
                threshold,
            )
        })
    }
}

impl Judge for CommandJudge {
    #[instrument(skip_all, fields(bytes = test_source.len()))]
    fn judge(&self, test_source: &str) -> Result<Judgment, HookError> {
        let stdout = self.command.run(test_source)?;
        parse_judgment(&stdout, self.threshold)
    }
}

/// Parse the first JSON object in `output`. A missing `passed` is derived
/// from `score >= threshold`.
pub fn parse_judgment(output: &str, threshold: f64) -> Result<Judgment, HookError> {
    let (Some(start), Some(end)) = (output.find('{'), output.rfind('}')) else {
        return Err(HookError::InvalidOutput(
            "no JSON object in judge output".to_string(),
        ));
    };
    if end < start {
        return Err(HookError::InvalidOutput(
            "no JSON object in judge output".to_string(),
        ));
    }
    let raw: RawJudgment = serde_json::from_str(&output[start..=end])
        .map_err(|err| HookError::InvalidOutput(format!("parse judge JSON: {err}")))?;
    if !raw.score.is_finite() {
        return Err(HookError::InvalidOutput("score is not finite".to_string()));
    }
    Ok(Judgment {
        passed: raw.passed.unwrap_or(raw.score >= threshold),
        score: raw.score,
        feedback: raw.feedback,
    })
}
