//! Python test scaffold generator CLI.
//!
//! Analyzes Python modules and writes pytest scaffolds to `tests/`
//! (configurable via `.testgen/config.toml`), validating them with the
//! configured runner before they are written.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;

use testgen::batch::{BatchReport, run_batch};
use testgen::core::render::generate_fixtures;
use testgen::core::target::Target;
use testgen::core::types::GenerationResult;
use testgen::exit_codes;
use testgen::io::enhancer::CommandEnhancer;
use testgen::io::init::{InitOptions, TestgenPaths, init_project};
use testgen::io::judge::CommandJudge;
use testgen::io::sandbox::{ProcessSandbox, SandboxRequest};
use testgen::io::source::analyze;
use testgen::logging;
use testgen::pipeline::{GenerationPipeline, PipelineOptions};

#[derive(Parser)]
#[command(
    name = "testgen",
    version,
    about = "Generate and validate pytest scaffolds for Python modules"
)]
struct Cli {
    /// Project root holding `.testgen/config.toml`.
    #[arg(short = 'C', long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create `.testgen/config.toml` with default settings.
    Init {
        /// Project root (defaults to `--root`).
        path: Option<PathBuf>,
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Generate tests for a file, `file::function`, or a directory of files.
    Generate {
        target: String,
        /// Output directory (defaults to the configured `test_dir`).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only generate tests for this function.
        #[arg(short = 'f', long)]
        function: Option<String>,
        /// Skip running the generated tests.
        #[arg(long)]
        no_validate: bool,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the structural model of a Python file as JSON.
    Analyze { file: PathBuf },
    /// Print pytest fixture stubs for the given dependency names.
    Fixtures {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Run the configured test runner against existing tests.
    Validate {
        /// Test file or directory (defaults to the configured `test_dir`).
        path: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { path, force } => cmd_init(path.as_deref().unwrap_or(&cli.root), force),
        Command::Generate {
            target,
            output,
            function,
            no_validate,
            json,
        } => cmd_generate(
            &cli.root,
            &GenerateArgs {
                target,
                output,
                function,
                no_validate,
                json,
            },
        ),
        Command::Analyze { file } => cmd_analyze(&file),
        Command::Fixtures { names } => {
            print!("{}", generate_fixtures(&names));
            Ok(exit_codes::OK)
        }
        Command::Validate { path } => cmd_validate(&cli.root, path),
    }
}

fn cmd_init(root: &Path, force: bool) -> Result<i32> {
    let paths = init_project(root, &InitOptions { force })?;
    println!("created {}", paths.config_path.display());
    Ok(exit_codes::OK)
}

struct GenerateArgs {
    target: String,
    output: Option<PathBuf>,
    function: Option<String>,
    no_validate: bool,
    json: bool,
}

fn cmd_generate(root: &Path, args: &GenerateArgs) -> Result<i32> {
    let paths = TestgenPaths::new(root);
    let cfg = paths.load_config()?;

    let mut target = Target::parse(&args.target);
    if let Some(function) = &args.function {
        target.unit = Some(function.clone());
    }

    let output_dir = args.output.clone().unwrap_or_else(|| paths.test_dir(&cfg));
    let mut options = PipelineOptions::from_config(&cfg, output_dir);
    if args.no_validate {
        options.validate = false;
    }

    let sandbox = ProcessSandbox::new(SandboxRequest::from(&cfg.sandbox));
    let enhancer = CommandEnhancer::from_config(&cfg.enhancer);
    let judge = CommandJudge::from_config(&cfg.judge, cfg.validation_threshold);
    let mut pipeline = GenerationPipeline::new(options).with_sandbox(&sandbox);
    if let Some(enhancer) = &enhancer {
        pipeline = pipeline.with_enhancer(enhancer);
    }
    if let Some(judge) = &judge {
        pipeline = pipeline.with_judge(judge);
    }

    if target.path.is_dir() {
        if target.unit.is_some() {
            bail!("a function filter requires a file target, got directory {}", target.path.display());
        }
        let report = run_batch(&pipeline, &target.path);
        print_batch(&report, args.json)?;
        return Ok(batch_exit_code(&report));
    }

    let result = pipeline.run(&target);
    if args.json {
        println!("{}", to_json(&result)?);
    } else {
        print_result(&target.path, &result);
    }
    Ok(result_exit_code(&result))
}

fn cmd_analyze(file: &Path) -> Result<i32> {
    let module = analyze(file)?;
    println!("{}", to_json(&module)?);
    Ok(exit_codes::OK)
}

fn cmd_validate(root: &Path, path: Option<PathBuf>) -> Result<i32> {
    let paths = TestgenPaths::new(root);
    let cfg = paths.load_config()?;
    let path = path.unwrap_or_else(|| paths.test_dir(&cfg));
    if !path.exists() {
        bail!("nothing to validate: {} does not exist", path.display());
    }

    let sandbox = ProcessSandbox::new(SandboxRequest::from(&cfg.sandbox));
    let verdict = sandbox
        .run_path(&path)
        .with_context(|| format!("run tests in {}", path.display()))?;
    print!("{}", verdict.stdout);
    eprint!("{}", verdict.stderr);
    if verdict.passed {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::VALIDATION_FAILED)
    }
}

fn result_exit_code(result: &GenerationResult) -> i32 {
    if !result.success {
        exit_codes::FAILED
    } else if result.validation_failed() {
        exit_codes::VALIDATION_FAILED
    } else {
        exit_codes::OK
    }
}

fn batch_exit_code(report: &BatchReport) -> i32 {
    if report.failed() > 0 {
        exit_codes::FAILED
    } else if report.validation_failed() > 0 {
        exit_codes::VALIDATION_FAILED
    } else {
        exit_codes::OK
    }
}

fn print_result(source: &Path, result: &GenerationResult) {
    if !result.success {
        println!("failed: {}", source.display());
    } else if let Some(file) = &result.test_file {
        println!(
            "generated {} test(s) for {} -> {}",
            result.tests.len(),
            source.display(),
            file.display()
        );
    } else {
        println!("no public functions in {}; nothing written", source.display());
    }

    match &result.verdict {
        Some(verdict) if verdict.passed => println!("  validation: passed"),
        Some(verdict) => {
            println!("  validation: failed (exit {:?})", verdict.exit_code);
            for line in verdict.stdout.lines().filter(|l| !l.trim().is_empty()) {
                println!("    {line}");
            }
        }
        None => {}
    }
    if let Some(judgment) = &result.judgment
        && !judgment.passed
    {
        println!(
            "  quality: {:.1} ({})",
            judgment.score,
            judgment.feedback.trim()
        );
    }
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
    for error in &result.errors {
        println!("  error: {error}");
    }
}

#[derive(Serialize)]
struct BatchEntry<'a> {
    source: &'a Path,
    #[serde(flatten)]
    result: &'a GenerationResult,
}

fn print_batch(report: &BatchReport, json: bool) -> Result<()> {
    if json {
        let entries: Vec<BatchEntry<'_>> = report
            .results
            .iter()
            .map(|(source, result)| BatchEntry { source, result })
            .collect();
        println!("{}", to_json(&entries)?);
        return Ok(());
    }
    for (source, result) in &report.results {
        print_result(source, result);
    }
    println!(
        "{} file(s): {} generated, {} failed, {} test(s)",
        report.results.len(),
        report.succeeded(),
        report.failed(),
        report.total_tests()
    );
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).context("serialize json")
}
