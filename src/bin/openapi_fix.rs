use clap::Parser;
use repo_tidy::openapi::{OpenApiFixer, OpenApiRunner};
use repo_tidy::utils::{error::TidyError, logger, validation::Validate};
use repo_tidy::RulesConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "openapi-fix")]
#[command(about = "Add missing schema titles and operationIds to OpenAPI documents")]
struct Args {
    /// OpenAPI document or directory of documents
    #[arg(default_value = "backend")]
    target: PathBuf,

    /// Add `title` to component schemas
    #[arg(long)]
    titles: bool,

    /// Add `operationId` to path operations
    #[arg(long)]
    operation_ids: bool,

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
            "❌ openapi-fix failed: {} (Category: {:?}, Severity: {:?})",
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
    let rules = RulesConfig::load_optional(args.rules.as_ref())?;
    rules.validate()?;

    let fixer = OpenApiFixer::new(args.titles, args.operation_ids);
    let runner = OpenApiRunner::new(fixer, rules.openapi.extensions).dry_run(args.dry_run);

    tracing::info!("🔍 Scanning {}", args.target.display());
    let report = runner.run(&args.target)?;
    report.log_summary(args.dry_run);

    let verb = if args.dry_run { "would change" } else { "changed" };
    println!(
        "✅ {} of {} documents {} ({} titles, {} operationIds)",
        report.files_changed,
        report.files_scanned,
        verb,
        report.titles_added,
        report.operation_ids_added
    );
    if report.failures > 0 {
        println!("⚠️  {} documents could not be processed", report.failures);
    }
    Ok(())
}
