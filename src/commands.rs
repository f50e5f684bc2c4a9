//! commands.rs
//!
//! Subcommand handlers. Each one prints human-readable status and maps the
//! outcome to a process exit code; diagnostics go through `tracing`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Args;
use tracing::debug;

use crate::accelerator::Accelerator;
use crate::config::Config;
use crate::harness::coverage::{CoverageResult, ReportFormat};
use crate::harness::performance::{PerformanceAnalysis, RecommendationKind, TestRecord};
use crate::harness::report::PerformanceReport;
use crate::llm::AiGenerateOptions;
use crate::testgen::{GenerateOptions, TestType};
use crate::ui::{number_format, trim_number, truncate_left, truncate_right, Table};

const PATH_WIDTH: usize = 50;
const TEST_NAME_WIDTH: usize = 40;
const RECOMMENDED_TESTS_SHOWN: usize = 3;

/* ============================================================
   Arguments
   ============================================================ */

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(help = "File or directory to generate tests for (default: <root>/app)")]
    pub path: Option<PathBuf>,

    #[arg(short = 'a', long, default_value_t = false, help = "Use AI to generate test cases")]
    pub ai: bool,

    #[arg(
        short = 'm',
        long,
        value_name = "NAME",
        num_args = 0..=1,
        default_missing_value = "",
        help = "Generate model tests (optionally for NAME inside the given directory)"
    )]
    pub model: Option<String>,

    #[arg(
        short = 't',
        long = "type",
        value_name = "TYPE",
        help = "Test type: unit | feature | model | controller"
    )]
    pub test_type: Option<TestType>,

    #[arg(short = 'f', long, default_value_t = false, help = "Overwrite existing test files")]
    pub force: bool,

    #[arg(short = 'p', long, help = "Custom prompt for AI generation")]
    pub prompt: Option<String>,

    #[arg(
        long = "context",
        value_name = "KEY=VALUE",
        value_parser = parse_key_value,
        help = "Extra context for the AI prompt (repeatable)"
    )]
    pub context: Vec<(String, String)>,
}

#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    #[arg(short = 'r', long, default_value_t = false, help = "Generate HTML coverage report")]
    pub report: bool,

    #[arg(short = 'x', long, default_value_t = false, help = "Generate XML coverage report")]
    pub xml: bool,

    #[arg(short = 'c', long, default_value_t = false, help = "Generate Clover coverage report")]
    pub clover: bool,

    #[arg(
        short = 't',
        long,
        help = "Minimum coverage percentage to enforce (default: configured threshold)"
    )]
    pub threshold: Option<f64>,

    #[arg(short = 'o', long, help = "Output directory for reports")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct BenchmarkArgs {
    #[arg(short = 's', long, help = "Threshold for slow tests in milliseconds")]
    pub slow_threshold: Option<f64>,

    #[arg(short = 'm', long, help = "Threshold for memory usage in KB")]
    pub memory_threshold: Option<f64>,

    #[arg(short = 'r', long, default_value_t = false, help = "Write a JSON performance report")]
    pub report: bool,

    #[arg(short = 'o', long, help = "Output directory for reports")]
    pub output: Option<PathBuf>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/* ============================================================
   generate
   ============================================================ */

pub fn generate(config: &Config, root: &Path, args: GenerateArgs) -> ExitCode {
    let mut path = match &args.path {
        Some(p) => resolve(root, p),
        None => root.join("app"),
    };

    println!("🚀 Generating tests for: {}", path.display());

    let mut acc = Accelerator::new(config, root);

    let result = if args.ai {
        match generate_with_ai(&mut acc, &path, &args) {
            Some(ok) => ok,
            None => return ExitCode::FAILURE,
        }
    } else {
        println!("📝 Using basic test generation...");

        let mut opts = GenerateOptions {
            force: args.force,
            test_type: args.test_type,
        };

        match args.model.as_deref() {
            Some(name) => {
                if path.is_dir() && !name.is_empty() {
                    path = path.join(format!("{name}.{}", config.generation.extension));
                }
                debug!(path = %path.display(), "forcing model generation");

                if path.is_dir() {
                    opts.test_type = Some(TestType::Model);
                    acc.generate_tests(&path, opts)
                } else {
                    acc.generate_model_tests(&path, opts)
                }
            }
            None => acc.generate_tests(&path, opts),
        }
    };

    if !result {
        eprintln!("❌ Failed to generate tests");
        println!("💡 Try using --force to overwrite existing files");
        return ExitCode::FAILURE;
    }

    println!("✅ Tests generated successfully!");
    println!("📁 Check your tests directory for the generated files.");
    for file in acc.generated_files() {
        println!("   • {}", display_path(root, &file));
    }

    println!();
    println!("Next steps:");
    println!("• Run tests: composer test");
    println!("• Check coverage: test-accelerator coverage");
    println!("• Analyze performance: test-accelerator benchmark");

    ExitCode::SUCCESS
}

/// `None` when a precondition failed and the command should stop.
fn generate_with_ai(acc: &mut Accelerator, path: &Path, args: &GenerateArgs) -> Option<bool> {
    println!("🤖 Using AI to generate test cases...");

    let errors = acc.validate_ai_configuration();
    if !errors.is_empty() {
        for e in errors {
            eprintln!("❌ {e}");
        }
        return None;
    }

    if !acc.test_ai_connection() {
        eprintln!("❌ Failed to connect to AI service");
        return None;
    }
    println!("✅ AI connection successful");

    if !path.is_file() {
        eprintln!("❌ AI generation needs a single source file: {}", path.display());
        return None;
    }

    let opts = AiGenerateOptions {
        force: args.force,
        test_type: args.test_type,
        prompt: args.prompt.clone(),
    };

    let outcome = if args.context.is_empty() {
        acc.generate_with_ai(path, &opts)
    } else {
        acc.generate_with_ai_context(path, &args.context, &opts)
    };

    match outcome {
        Ok(ok) => Some(ok),
        Err(e) => {
            eprintln!("❌ {e}");
            None
        }
    }
}

/* ============================================================
   coverage
   ============================================================ */

pub fn coverage(config: &Config, root: &Path, args: CoverageArgs) -> ExitCode {
    println!("📊 Analyzing test coverage...");

    let acc = Accelerator::new(config, root);
    let results = acc.analyze_coverage(args.threshold);
    print_coverage(&results);

    let formats: Vec<ReportFormat> = [
        (ReportFormat::Html, args.report),
        (ReportFormat::Xml, args.xml),
        (ReportFormat::Clover, args.clover),
    ]
    .into_iter()
    .filter_map(|(f, on)| on.then_some(f))
    .collect();

    if !formats.is_empty() {
        let output = args.output.as_deref().map(|o| resolve(root, o));
        generate_coverage_reports(&acc, root, output.as_deref(), &formats);
    }

    println!();
    if !results.passed {
        eprintln!("❌ Coverage below threshold of {}%", trim_number(results.threshold));
        println!("💡 Consider adding more tests or improving existing ones");
        return ExitCode::FAILURE;
    }

    println!("✅ Coverage analysis completed successfully!");
    ExitCode::SUCCESS
}

fn print_coverage(results: &CoverageResult) {
    println!();

    if !results.files.is_empty() {
        println!("📁 File Coverage:");

        let mut table = Table::new(["File", "Coverage %", "Status"]);
        for file in &results.files {
            let status = if file.coverage >= 80.0 { "✅ Good" } else { "⚠️ Low" };
            table.row([
                truncate_left(&file.file, PATH_WIDTH),
                format!("{}%", number_format(file.coverage, 1)),
                status.to_string(),
            ]);
        }
        println!("{}", table.render());
    }

    println!();
    println!("📈 Overall Coverage: {}%", number_format(results.total, 1));
    println!("🎯 Threshold: {}%", trim_number(results.threshold));
    println!(
        "📊 Status: {}",
        if results.passed { "✅ Passed" } else { "❌ Failed" }
    );
}

fn generate_coverage_reports(
    acc: &Accelerator,
    root: &Path,
    output: Option<&Path>,
    formats: &[ReportFormat],
) {
    println!();
    println!("📄 Generating reports...");

    let dir = output.unwrap_or_else(|| acc.reports_dir()).to_path_buf();
    let mut all_ok = true;

    for &format in formats {
        println!("Generating {format} report...");
        let location = output.map(|o| format.default_location(o));

        if acc.generate_report(format, location.as_deref()) {
            println!("✅ {format} report generated");
        } else {
            eprintln!("❌ Failed to generate {format} report");
            all_ok = false;
        }
    }

    if all_ok {
        println!("📁 Reports saved to: {}", display_path(root, &dir));
    }
}

/* ============================================================
   benchmark
   ============================================================ */

pub fn benchmark(config: &Config, root: &Path, args: BenchmarkArgs) -> ExitCode {
    println!("⚡ Running performance benchmark...");

    let acc = Accelerator::new(config, root);
    let results = acc.analyze_performance(args.slow_threshold, args.memory_threshold);
    print_performance(&results);

    let mut report_failed = false;
    if args.report {
        println!();
        println!("📄 Generating performance report...");

        let dir = match &args.output {
            Some(o) => resolve(root, o),
            None => acc.reports_dir().to_path_buf(),
        };

        match PerformanceReport::from_analysis(&results).write_json(&dir) {
            Ok(path) => println!("✅ Performance report saved to: {}", display_path(root, &path)),
            Err(e) => {
                eprintln!("❌ Failed to write performance report: {e}");
                report_failed = true;
            }
        }
    }

    println!();
    println!("✅ Performance analysis completed!");

    if results.has_issues() || report_failed {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_performance(results: &PerformanceAnalysis) {
    println!();
    println!("📊 Performance Summary:");
    println!("Total Tests: {}", results.total_tests);
    println!("Average Time: {}ms", number_format(results.average_time, 2));
    println!("Total Time: {}ms", number_format(results.total_time, 2));
    println!("Slow Tests: {}", results.slow_tests.len());
    println!("Memory Issues: {}", results.memory_issues.len());

    if !results.slow_tests.is_empty() {
        println!();
        println!("🐌 Slow Tests:");
        println!(
            "{}",
            test_table(&results.slow_tests, ["Test Name", "Time (ms)", "Memory (KB)"], |t| {
                [t.time, t.memory]
            })
        );
    }

    if !results.memory_issues.is_empty() {
        println!();
        println!("💾 Memory Issues:");
        println!(
            "{}",
            test_table(&results.memory_issues, ["Test Name", "Memory (KB)", "Time (ms)"], |t| {
                [t.memory, t.time]
            })
        );
    }

    if !results.recommendations.is_empty() {
        println!();
        println!("💡 Recommendations:");

        for rec in &results.recommendations {
            let icon = if rec.kind == RecommendationKind::Success { "✅" } else { "⚠️" };
            println!("{icon} {}", rec.message);

            for test in rec.tests.iter().take(RECOMMENDED_TESTS_SHOWN) {
                println!("   • {test}");
            }
            if rec.tests.len() > RECOMMENDED_TESTS_SHOWN {
                println!("   • ... and {} more", rec.tests.len() - RECOMMENDED_TESTS_SHOWN);
            }
        }
    }
}

fn test_table(
    tests: &[TestRecord],
    headers: [&str; 3],
    columns: impl Fn(&TestRecord) -> [f64; 2],
) -> String {
    let mut table = Table::new(headers);
    for t in tests {
        let [a, b] = columns(t);
        table.row([
            truncate_right(&t.name, TEST_NAME_WIDTH),
            number_format(a, 2),
            number_format(b, 2),
        ]);
    }
    table.render()
}
