use clap::Parser;
use repo_tidy::java::{CheckstyleReport, FixRunner, FixTargets, FixerKind};
use repo_tidy::utils::{error::TidyError, logger, validation::Validate};
use repo_tidy::RulesConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "java-fix")]
#[command(about = "Apply pattern-based fixes to Checkstyle violations in a Java tree")]
struct Args {
    /// Source tree to fix
    #[arg(default_value = "backend")]
    target: PathBuf,

    /// Checkstyle output naming the files and lines to fix
    #[arg(long)]
    log: Option<PathBuf>,

    /// Fixers to apply, comma separated
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "imports,final-params,javadoc-period,trailing-whitespace"
    )]
    fix: Vec<FixerKind>,

    /// TOML rules file
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long, help = "Enable verbose output")]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    if let Err(e) = run(&args) {
        tracing::error!(
            "❌ java-fix failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
        std::process::exit(e.exit_code().max(1));
    }
}

fn run(args: &Args) -> Result<(), TidyError> {
    if !args.target.is_dir() {
        return Err(TidyError::missing_input(args.target.display().to_string()));
    }

    let rules = RulesConfig::load_optional(args.rules.as_ref())?;
    rules.validate()?;

    let runner = FixRunner::new(&args.fix, &rules.java)?.dry_run(args.dry_run);
    tracing::info!("🔧 Fixers: {}", runner.fixer_names().join(", "));

    let targets = match &args.log {
        Some(log) => FixTargets::Report(CheckstyleReport::from_file(log, &args.target)?),
        None if runner.needs_report() => {
            return Err(TidyError::MissingConfigError {
                field: "log".to_string(),
            });
        }
        None => FixTargets::Tree(args.target.clone()),
    };

    let report = runner.run(&targets);
    report.log_summary(args.dry_run);

    let verb = if args.dry_run { "would change" } else { "changed" };
    println!(
        "✅ {} of {} files {} ({} edits)",
        report.files_changed,
        report.files_scanned,
        verb,
        report.total_changes()
    );
    if report.failures > 0 {
        println!("⚠️  {} files could not be processed", report.failures);
    }
    Ok(())
}
