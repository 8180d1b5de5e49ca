//! Deterministic rendering of pytest code from the structural model.
//!
//! Rendering uses fixed minijinja templates and never consults the clock or a
//! random source, so one signature always renders to the same bytes.

use std::collections::HashSet;
use std::sync::LazyLock;

use minijinja::{AutoEscape, Environment, context};
use regex::Regex;
use serde::Serialize;

use super::resolve::{TypeLabel, resolve, resolve_return};
use super::synth::synthesize;
use super::types::{FunctionSignature, GeneratedTest, ParamKind};

const BASIC_TEMPLATE: &str = include_str!("../templates/basic_test.py.j2");
const EDGE_CASE_TEMPLATE: &str = include_str!("../templates/edge_case_test.py.j2");
const FIXTURE_TEMPLATE: &str = include_str!("../templates/fixture.py.j2");
const TEST_FILE_TEMPLATE: &str = include_str!("../templates/test_file.py.j2");

static ENGINE: LazyLock<TemplateEngine> = LazyLock::new(TemplateEngine::new);

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex"));
static NON_IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("sanitize regex"));

/// Template engine wrapper around minijinja.
struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_template("basic_test.py", BASIC_TEMPLATE)
            .expect("basic test template should be valid");
        env.add_template("edge_case_test.py", EDGE_CASE_TEMPLATE)
            .expect("edge case template should be valid");
        env.add_template("fixture.py", FIXTURE_TEMPLATE)
            .expect("fixture template should be valid");
        env.add_template("test_file.py", TEST_FILE_TEMPLATE)
            .expect("test file template should be valid");
        Self { env }
    }

    fn render<S: Serialize>(&self, name: &str, ctx: S) -> String {
        self.env
            .get_template(name)
            .and_then(|template| template.render(ctx))
            .unwrap_or_else(|err| panic!("{name} template rendering should not fail: {err:#}"))
    }
}

#[derive(Debug, Serialize)]
struct Binding {
    name: String,
    value: String,
}

/// Rendering switches for [`TestCodeGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Render the second, boundary-enumerating test when parameters are annotated.
    pub include_edge_cases: bool,
    /// Render tests for underscore-prefixed functions too.
    pub include_private: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            include_edge_cases: true,
            include_private: false,
        }
    }
}

/// Renders Arrange/Act/Assert scaffold tests for function signatures.
#[derive(Debug, Clone, Default)]
pub struct TestCodeGenerator {
    options: GeneratorOptions,
}

impl TestCodeGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        Self { options }
    }

    /// Render tests for `signature`, named after the function.
    ///
    /// Returns `None` for private functions unless `include_private` is set.
    pub fn generate(&self, signature: &FunctionSignature) -> Option<GeneratedTest> {
        self.generate_as(signature, &signature.name)
    }

    /// Render tests for `signature` using `stem` in the test function names.
    pub fn generate_as(&self, signature: &FunctionSignature, stem: &str) -> Option<GeneratedTest> {
        if signature.is_private && !self.options.include_private {
            return None;
        }

        let basic_name = format!("test_{stem}_basic");
        let mut source = ENGINE.render(
            "basic_test.py",
            context! {
                test_name => basic_name,
                target => signature.name,
                summary => signature.summary(),
                bindings => bindings(signature),
                call_args => call_args(signature),
                expects_none => resolve_return(signature.return_type.as_deref()) == TypeLabel::None,
            },
        );
        let mut test_names = vec![basic_name];

        let boundaries = if self.options.include_edge_cases {
            boundary_lines(signature)
        } else {
            Vec::new()
        };
        if !boundaries.is_empty() {
            let edge_name = format!("test_{stem}_edge_cases");
            source.push('\n');
            source.push_str(&ENGINE.render(
                "edge_case_test.py",
                context! {
                    test_name => edge_name,
                    target => signature.name,
                    boundaries => boundaries,
                },
            ));
            test_names.push(edge_name);
        }

        Some(GeneratedTest {
            target: signature.name.clone(),
            test_names,
            source,
        })
    }
}

fn bindings(signature: &FunctionSignature) -> Vec<Binding> {
    signature
        .parameters
        .iter()
        .map(|param| Binding {
            name: param.name.clone(),
            value: synthesize(param),
        })
        .collect()
}

fn call_args(signature: &FunctionSignature) -> String {
    signature
        .parameters
        .iter()
        .map(|param| match param.kind {
            ParamKind::Positional => param.name.clone(),
            ParamKind::KeywordOnly => format!("{0}={0}", param.name),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// One commentary line per observed label, in order of first appearance.
fn boundary_lines(signature: &FunctionSignature) -> Vec<String> {
    let mut observed: Vec<(TypeLabel, Vec<&str>)> = Vec::new();
    for param in signature.parameters.iter().filter(|p| p.annotation.is_some()) {
        let label = resolve(param);
        match observed.iter_mut().find(|(seen, _)| *seen == label) {
            Some((_, names)) => names.push(param.name.as_str()),
            None => observed.push((label, vec![param.name.as_str()])),
        }
    }
    observed
        .into_iter()
        .filter_map(|(label, names)| {
            label
                .boundary_classes()
                .map(|classes| format!("{} ({label}): {classes}", names.join(", ")))
        })
        .collect()
}

/// Test-name stems for `names`, in order. Repeated names are suffixed with
/// the definition line so every definition gets its own test; a suffixed
/// stem that is still taken gets a counter as well.
pub fn unique_stems<'a>(names: impl IntoIterator<Item = (&'a str, usize)>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .map(|(name, line)| {
            let base = if seen.contains(name) {
                format!("{name}_line{line}")
            } else {
                name.to_string()
            };
            let mut stem = base.clone();
            let mut counter = 2;
            while !seen.insert(stem.clone()) {
                stem = format!("{base}_{counter}");
                counter += 1;
            }
            stem
        })
        .collect()
}

/// Render one `@pytest.fixture` stub per dependency name.
///
/// Names are only made syntactically usable; whether they are importable is
/// not checked.
pub fn generate_fixtures<S: AsRef<str>>(dependencies: &[S]) -> String {
    dependencies
        .iter()
        .map(|dep| {
            let dep = dep.as_ref();
            ENGINE.render(
                "fixture.py",
                context! {
                    fixture_name => format!("{}_fixture", fixture_ident(dep)),
                    dependency => dep,
                },
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn fixture_ident(dependency: &str) -> String {
    let ident = NON_IDENTIFIER_RE.replace_all(dependency.trim(), "_");
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{ident}")
    } else {
        ident.into_owned()
    }
}

/// Assemble a complete test file: shared import preamble, optional star
/// import of the module under test, optional fixtures, then each test.
///
/// The module import is omitted when `module` is not a valid identifier.
pub fn render_test_file(module: Option<&str>, fixtures: &str, tests: &[GeneratedTest]) -> String {
    let module = module.filter(|m| IDENTIFIER_RE.is_match(m));
    let blocks: Vec<&str> = std::iter::once(fixtures)
        .chain(tests.iter().map(|t| t.source.as_str()))
        .map(str::trim_end)
        .filter(|block| !block.is_empty())
        .collect();
    ENGINE.render(
        "test_file.py",
        context! {
            module => module,
            blocks => blocks,
        },
    )
}
