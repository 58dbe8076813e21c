//! Checkstyle plain-text report parsing.
//!
//! Lines look like `[WARN] /path/Foo.java:12:5: Message text [CheckName]`.
//! Anything that doesn't match is ignored.

use crate::utils::error::{Result, TidyError};
use indexmap::IndexMap;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static REPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*\[(WARN|WARNING|ERROR|INFO)\]\s+(.+?):(\d+)(?::(\d+))?:\s*(.*?)(?:\s+\[([A-Za-z]+)\])?\s*$",
    )
    .unwrap()
});
static LINE_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"longer than (\d+) characters \(found (\d+)\)").unwrap()
});
static PARAM_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Expected @param tag for '([^']+)'").unwrap());
static MAGIC_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)' is a magic number").unwrap());
static FINAL_PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Parameter ([\w$]+) should be final").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    LineLength { limit: usize, found: usize },
    MissingReturnTag,
    MissingParamTag { name: String },
    MagicNumber { literal: String },
    FinalParameter { name: String },
    StarImport,
    ImportOrder,
    FirstSentencePeriod,
    TrailingWhitespace,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Warning {
    pub severity: Severity,
    pub path: PathBuf,
    pub line: usize,
    pub column: Option<usize>,
    pub message: String,
    pub check: Option<String>,
    pub kind: WarningKind,
}

impl Warning {
    /// Parses one report line. Relative paths are resolved against `base`.
    pub fn parse_line(line: &str, base: &Path) -> Option<Self> {
        let caps = REPORT_LINE.captures(line)?;
        let severity = match &caps[1] {
            "ERROR" => Severity::Error,
            "INFO" => Severity::Info,
            _ => Severity::Warning,
        };

        let raw_path = PathBuf::from(caps[2].trim());
        let path = if raw_path.is_absolute() {
            raw_path
        } else {
            base.join(raw_path)
        };

        let message = caps[5].to_string();
        let check = caps.get(6).map(|m| m.as_str().to_string());
        let kind = classify(&message, check.as_deref());

        Some(Self {
            severity,
            path,
            line: caps[3].parse().ok()?,
            column: caps.get(4).and_then(|m| m.as_str().parse().ok()),
            message,
            check,
            kind,
        })
    }
}

fn classify(message: &str, check: Option<&str>) -> WarningKind {
    if let Some(caps) = LINE_LENGTH.captures(message) {
        return WarningKind::LineLength {
            limit: caps[1].parse().unwrap_or(0),
            found: caps[2].parse().unwrap_or(0),
        };
    }
    if message.contains("@return tag should be present") {
        return WarningKind::MissingReturnTag;
    }
    if let Some(caps) = PARAM_TAG.captures(message) {
        return WarningKind::MissingParamTag {
            name: caps[1].to_string(),
        };
    }
    if let Some(caps) = MAGIC_NUMBER.captures(message) {
        return WarningKind::MagicNumber {
            literal: caps[1].to_string(),
        };
    }
    if let Some(caps) = FINAL_PARAMETER.captures(message) {
        return WarningKind::FinalParameter {
            name: caps[1].to_string(),
        };
    }
    if message.contains("'.*' form of import") {
        return WarningKind::StarImport;
    }
    if check.is_some_and(|c| c.contains("ImportOrder"))
        || message.contains("lexicographical order")
        || message.contains("import group")
    {
        return WarningKind::ImportOrder;
    }
    if message.contains("First sentence") && message.contains("period") {
        return WarningKind::FirstSentencePeriod;
    }
    let lowered = message.to_lowercase();
    if lowered.contains("trailing spaces") || lowered.contains("trailing whitespace") {
        return WarningKind::TrailingWhitespace;
    }
    WarningKind::Other
}

/// All warnings of one Checkstyle run, in report order.
#[derive(Debug, Clone, Default)]
pub struct CheckstyleReport {
    warnings: Vec<Warning>,
}

impl CheckstyleReport {
    pub fn parse(content: &str, base: &Path) -> Self {
        let warnings = content
            .lines()
            .filter_map(|line| Warning::parse_line(line, base))
            .collect();
        Self { warnings }
    }

    pub fn from_file(path: &Path, base: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(TidyError::missing_input(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let report = Self::parse(&content, base);
        tracing::info!(
            "📋 Loaded {} warnings for {} files from {}",
            report.len(),
            report.files().len(),
            path.display()
        );
        Ok(report)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Warnings grouped per file, files in first-seen order.
    pub fn by_file(&self) -> IndexMap<PathBuf, Vec<&Warning>> {
        let mut grouped: IndexMap<PathBuf, Vec<&Warning>> = IndexMap::new();
        for warning in &self.warnings {
            grouped.entry(warning.path.clone()).or_default().push(warning);
        }
        grouped
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.by_file().into_keys().collect()
    }

    pub fn for_file(&self, path: &Path) -> Vec<&Warning> {
        self.warnings.iter().filter(|w| w.path == path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = "\
Starting audit...
[WARN] /repo/src/Foo.java:12:5: Line is longer than 120 characters (found 134). [LineLength]
[WARN] /repo/src/Foo.java:20: Expected @param tag for 'userId'. [JavadocMethod]
[ERROR] src/Bar.java:7:31: '100' is a magic number. [MagicNumber]
[WARN] /repo/src/Foo.java:3:1: Using the '.*' form of import should be avoided - java.util.*. [AvoidStarImport]
[WARN] /repo/src/Foo.java:30:17: Parameter name should be final. [FinalParameters]
[WARN] /repo/src/Foo.java:40: @return tag should be present and have description. [JavadocMethod]
[WARN] /repo/src/Foo.java:41: First sentence should end with a period. [JavadocStyle]
[WARN] /repo/src/Foo.java:50: Line has trailing spaces. [RegexpSingleline]
[WARN] /repo/src/Foo.java:2:1: Wrong lexicographical order for 'java.util.List' import. [CustomImportOrder]
[WARN] /repo/src/Foo.java:9: Something else entirely. [WhitespaceAround]
Audit done.
";

    #[test]
    fn parses_and_classifies_report_lines() {
        let report = CheckstyleReport::parse(REPORT, Path::new("/repo"));
        assert_eq!(report.len(), 10);

        let kinds: Vec<&WarningKind> = report.warnings().iter().map(|w| &w.kind).collect();
        assert_eq!(
            kinds,
            vec![
                &WarningKind::LineLength { limit: 120, found: 134 },
                &WarningKind::MissingParamTag { name: "userId".into() },
                &WarningKind::MagicNumber { literal: "100".into() },
                &WarningKind::StarImport,
                &WarningKind::FinalParameter { name: "name".into() },
                &WarningKind::MissingReturnTag,
                &WarningKind::FirstSentencePeriod,
                &WarningKind::TrailingWhitespace,
                &WarningKind::ImportOrder,
                &WarningKind::Other,
            ]
        );

        let first = &report.warnings()[0];
        assert_eq!(first.line, 12);
        assert_eq!(first.column, Some(5));
        assert_eq!(first.check.as_deref(), Some("LineLength"));
        assert_eq!(report.warnings()[1].column, None);
    }

    #[test]
    fn relative_paths_resolve_against_base() {
        let report = CheckstyleReport::parse(REPORT, Path::new("/repo"));
        let magic = &report.warnings()[2];
        assert_eq!(magic.path, PathBuf::from("/repo/src/Bar.java"));
        assert_eq!(magic.severity, Severity::Error);
    }

    #[test]
    fn files_keep_first_seen_order() {
        let report = CheckstyleReport::parse(REPORT, Path::new("/repo"));
        assert_eq!(
            report.files(),
            vec![
                PathBuf::from("/repo/src/Foo.java"),
                PathBuf::from("/repo/src/Bar.java")
            ]
        );
        assert_eq!(report.for_file(Path::new("/repo/src/Foo.java")).len(), 9);
    }

    #[test]
    fn missing_report_is_missing_input() {
        let err = CheckstyleReport::from_file(Path::new("/no/such.log"), Path::new("/")).unwrap_err();
        assert!(matches!(err, TidyError::MissingInputError { .. }));
    }
}
