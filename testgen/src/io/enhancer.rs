//! Optional external enhancement of generated tests.
//!
//! An enhancer receives the scaffold rendered from templates plus the unit's
//! source and may return better test code. It fails closed: callers keep the
//! scaffold on any error.

use std::sync::LazyLock;

use minijinja::{Environment, context};
use regex::Regex;
use tracing::{debug, instrument};

use super::config::HookConfig;
use super::hook::HookCommand;
use crate::core::types::FunctionSignature;
use crate::error::HookError;

const ENHANCE_TEMPLATE: &str = include_str!("../templates/enhance.md");

static TEST_DEF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^def (test_[A-Za-z0-9_]*)\s*\(").expect("valid regex"));

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z]*\n(?P<body>.*?)\n?```\s*$").expect("valid regex")
});

pub trait Enhancer {
    /// Improved test code for `signature`, or an error to keep `draft`.
    fn enhance(
        &self,
        signature: &FunctionSignature,
        source_text: &str,
        draft: &str,
    ) -> Result<String, HookError>;
}

/// Names of top-level `def test_*` functions in `source`, in order.
pub fn test_function_names(source: &str) -> Vec<String> {
    TEST_DEF_RE
        .captures_iter(source)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template("enhance", ENHANCE_TEMPLATE)
            .expect("enhance template should be valid");
        Self { env }
    }

    fn render(
        &self,
        signature: &FunctionSignature,
        source_text: &str,
        draft: &str,
    ) -> Result<String, minijinja::Error> {
        let template = self.env.get_template("enhance")?;
        template.render(context! {
            name => signature.name,
            params => signature.parameters,
            return_type => signature.return_type,
            docstring => signature.docstring,
            source => source_text.trim_end(),
            draft => draft.trim_end(),
        })
    }
}

static PROMPTS: LazyLock<PromptEngine> = LazyLock::new(PromptEngine::new);

/// Render the prompt handed to an enhancer command on stdin.
pub fn render_enhance_prompt(
    signature: &FunctionSignature,
    source_text: &str,
    draft: &str,
) -> Result<String, HookError> {
    Ok(PROMPTS.render(signature, source_text, draft)?)
}

/// Enhancer that pipes a rendered prompt to an external command and reads
/// test code from its stdout.
#[derive(Debug, Clone)]
pub struct CommandEnhancer {
    command: HookCommand,
}

impl CommandEnhancer {
    pub fn new(command: HookCommand) -> Self {
        Self { command }
    }

    /// `None` when the hook is disabled in config.
    pub fn from_config(cfg: &HookConfig) -> Option<Self> {
        cfg.enabled()
            .then(|| Self::new(HookCommand::new(cfg.command.clone(), cfg.timeout())))
    }
}

impl Enhancer for CommandEnhancer {
    #[instrument(skip_all, fields(unit = %signature.name))]
    fn enhance(
        &self,
        signature: &FunctionSignature,
        source_text: &str,
        draft: &str,
    ) -> Result<String, HookError> {
        let prompt = render_enhance_prompt(signature, source_text, draft)?;
        let stdout = self.command.run(&prompt)?;
        let code = strip_fence(&stdout);
        if test_function_names(code).is_empty() {
            return Err(HookError::InvalidOutput(
                "no `def test_` function in enhancer output".to_string(),
            ));
        }
        debug!(bytes = code.len(), "enhancer produced test code");
        Ok(format!("{}\n", code.trim_end()))
    }
}

fn strip_fence(output: &str) -> &str {
    match FENCE_RE.captures(output).and_then(|caps| caps.name("body")) {
        Some(body) => body.as_str(),
        None => output.trim_matches('\n'),
    }
}
