use crate::config::toml_config::JavaRules;
use crate::java::checkstyle::{CheckstyleReport, Warning};
use crate::java::fixers::{FixContext, Fixer, FixerKind};
use crate::utils::error::{Result, TidyError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories never searched for sources.
const SKIPPED_DIRS: &[&str] = &["target", "build"];

/// Files a run works on.
#[derive(Debug)]
pub enum FixTargets {
    /// Every `.java` file under a directory, no warnings.
    Tree(PathBuf),
    /// The files a Checkstyle report names, with their warnings.
    Report(CheckstyleReport),
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixReport {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub failures: usize,
    pub changes: BTreeMap<&'static str, usize>,
    pub changed_files: Vec<PathBuf>,
}

impl FixReport {
    pub fn total_changes(&self) -> usize {
        self.changes.values().sum()
    }

    pub fn log_summary(&self, dry_run: bool) {
        let verb = if dry_run { "would change" } else { "changed" };
        tracing::info!(
            "📊 Scanned {} files, {} {} ({} edits, {} failures)",
            self.files_scanned,
            verb,
            self.files_changed,
            self.total_changes(),
            self.failures
        );
        for (fixer, count) in &self.changes {
            tracing::info!("   {}: {}", fixer, count);
        }
    }
}

pub struct FixRunner {
    fixers: Vec<Box<dyn Fixer>>,
    dry_run: bool,
}

impl FixRunner {
    /// Builds the fixers for `kinds` in application order. Warning-driven
    /// fixers edit by report line, so only one of them may run at a time.
    pub fn new(kinds: &[FixerKind], rules: &JavaRules) -> Result<Self> {
        let mut kinds: Vec<FixerKind> = kinds.to_vec();
        kinds.sort();
        kinds.dedup();

        let warning_driven: Vec<&str> = kinds
            .iter()
            .filter(|k| k.requires_warnings())
            .map(|k| k.name())
            .collect();
        if warning_driven.len() > 1 {
            return Err(TidyError::InvalidConfigValueError {
                field: "fix".to_string(),
                value: warning_driven.join(","),
                reason: "Only one report-driven fixer can run per pass; rerun Checkstyle between them"
                    .to_string(),
            });
        }
        if kinds.is_empty() {
            return Err(TidyError::ConfigError {
                message: "No fixers selected".to_string(),
            });
        }

        Ok(Self {
            fixers: kinds.into_iter().map(|kind| kind.build(rules)).collect(),
            dry_run: false,
        })
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn needs_report(&self) -> bool {
        self.fixers.iter().any(|f| f.kind().requires_warnings())
    }

    pub fn fixer_names(&self) -> Vec<&'static str> {
        self.fixers.iter().map(|f| f.name()).collect()
    }

    pub fn run(&self, targets: &FixTargets) -> FixReport {
        let mut report = FixReport::default();
        let work: Vec<(PathBuf, Vec<&Warning>)> = match targets {
            FixTargets::Tree(root) => collect_java_files(root)
                .into_iter()
                .map(|path| (path, Vec::new()))
                .collect(),
            FixTargets::Report(checkstyle) => checkstyle.by_file().into_iter().collect(),
        };

        for (path, warnings) in work {
            report.files_scanned += 1;
            match self.fix_file(&path, &warnings, &mut report.changes) {
                Ok(true) => {
                    report.files_changed += 1;
                    report.changed_files.push(path);
                }
                Ok(false) => {}
                Err(e) => {
                    report.failures += 1;
                    tracing::warn!("⚠️  {}: {}", path.display(), e);
                }
            }
        }

        report
    }

    /// Applies every fixer to one file. Returns whether the content changed.
    pub fn fix_file(
        &self,
        path: &Path,
        warnings: &[&Warning],
        changes: &mut BTreeMap<&'static str, usize>,
    ) -> Result<bool> {
        if !path.is_file() {
            return Err(TidyError::missing_input(path.display().to_string()));
        }
        let original = std::fs::read_to_string(path)?;
        let ctx = FixContext::new(path, warnings);

        let mut content = original.clone();
        for fixer in &self.fixers {
            let fix = fixer.fix(&content, &ctx);
            if fix.changes > 0 {
                tracing::debug!("{} made {} edits in {}", fixer.name(), fix.changes, path.display());
                *changes.entry(fixer.name()).or_insert(0) += fix.changes;
                content = fix.content;
            }
        }

        if content == original {
            return Ok(false);
        }
        if self.dry_run {
            tracing::info!("📝 Would update {}", path.display());
        } else {
            std::fs::write(path, &content)?;
            tracing::info!("✅ Updated {}", path.display());
        }
        Ok(true)
    }
}

/// `.java` files under `root`, sorted, skipping hidden and build directories.
pub fn collect_java_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| {
            if entry.depth() == 0 || !entry.file_type().is_dir() {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !name.starts_with('.') && !SKIPPED_DIRS.iter().any(|skip| *skip == name)
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "java"))
        .collect();
    files.sort();
    files
}
