use clap::Parser;
use repo_tidy::utils::{error::TidyError, logger, validation::Validate};
use repo_tidy::{CleanPipeline, CliConfig, EtlEngine, LocalStorage, ParsePipeline, RulesConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting repo-tidy ({:?} stage)", config.stage);
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let rules = match RulesConfig::load_optional(config.rules.as_deref()).and_then(|rules| {
        rules.validate()?;
        Ok(rules)
    }) {
        Ok(rules) => rules,
        Err(e) => fail(e),
    };

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    if config.runs_parse() {
        let input = config.input.clone().unwrap_or_default();
        let pipeline = ParsePipeline::new(input, LocalStorage::new(&config.parsed_dir));
        let engine = EtlEngine::new_with_monitoring(pipeline, config.monitor);
        match engine.run().await {
            Ok(output_path) => {
                println!("✅ Workbook parsed");
                println!("📁 Output saved to: {}", output_path);
            }
            Err(e) => fail(e),
        }
    }

    if config.runs_clean() {
        let mut pipeline = CleanPipeline::new(
            LocalStorage::new(&config.parsed_dir),
            LocalStorage::new(&config.cleaned_dir),
            rules.cleaning,
        );
        if config.archive {
            pipeline = pipeline.with_archive(config.archive_path());
        }
        let engine = EtlEngine::new_with_monitoring(pipeline, config.monitor);
        match engine.run().await {
            Ok(output_path) => {
                println!("✅ Cleaning completed");
                println!("📁 Output saved to: {}", output_path);
            }
            Err(e) => fail(e),
        }
    }

    Ok(())
}

fn fail(e: TidyError) -> ! {
    tracing::error!(
        "❌ repo-tidy failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    std::process::exit(e.exit_code().max(1));
}
