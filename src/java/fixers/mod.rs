//! Source rewriters, one per Checkstyle rule family.
//!
//! A fixer takes the full text of a file and returns the new text with a
//! count of edits. Fixers that need a Checkstyle report only touch the lines
//! the report names.

pub mod final_params;
pub mod imports;
pub mod javadoc_period;
pub mod javadoc_tags;
pub mod long_lines;
pub mod magic_numbers;
pub mod trailing_whitespace;

use crate::config::toml_config::JavaRules;
use crate::java::checkstyle::Warning;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fix {
    pub content: String,
    pub changes: usize,
}

impl Fix {
    pub fn unchanged(source: &str) -> Self {
        Self {
            content: source.to_string(),
            changes: 0,
        }
    }
}

/// What a fixer knows about the file it rewrites.
#[derive(Debug, Clone, Copy)]
pub struct FixContext<'a> {
    pub path: &'a Path,
    pub warnings: &'a [&'a Warning],
}

impl<'a> FixContext<'a> {
    pub fn new(path: &'a Path, warnings: &'a [&'a Warning]) -> Self {
        Self { path, warnings }
    }
}

pub trait Fixer: Send + Sync {
    fn kind(&self) -> FixerKind;

    fn fix(&self, source: &str, ctx: &FixContext<'_>) -> Fix;

    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FixerKind {
    JavadocTags,
    LongLines,
    MagicNumbers,
    Imports,
    FinalParams,
    JavadocPeriod,
    TrailingWhitespace,
}

impl FixerKind {
    /// Every fixer in the order a run applies them.
    pub const ALL: [FixerKind; 7] = [
        FixerKind::JavadocTags,
        FixerKind::LongLines,
        FixerKind::MagicNumbers,
        FixerKind::Imports,
        FixerKind::FinalParams,
        FixerKind::JavadocPeriod,
        FixerKind::TrailingWhitespace,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FixerKind::JavadocTags => "javadoc-tags",
            FixerKind::LongLines => "long-lines",
            FixerKind::MagicNumbers => "magic-numbers",
            FixerKind::Imports => "imports",
            FixerKind::FinalParams => "final-params",
            FixerKind::JavadocPeriod => "javadoc-period",
            FixerKind::TrailingWhitespace => "trailing-whitespace",
        }
    }

    /// Warning-driven fixers edit by report line number.
    pub fn requires_warnings(self) -> bool {
        matches!(
            self,
            FixerKind::JavadocTags | FixerKind::LongLines | FixerKind::MagicNumbers
        )
    }

    pub fn build(self, rules: &JavaRules) -> Box<dyn Fixer> {
        match self {
            FixerKind::JavadocTags => Box::new(javadoc_tags::JavadocTagFixer::new(
                rules.javadoc.param_descriptions.clone(),
            )),
            FixerKind::LongLines => Box::new(long_lines::LongLineFixer::new(
                rules.max_line_length,
                rules.continuation_indent,
            )),
            FixerKind::MagicNumbers => Box::new(magic_numbers::MagicNumberFixer),
            FixerKind::Imports => Box::new(imports::ImportFixer::new(rules.imports.clone())),
            FixerKind::FinalParams => Box::new(final_params::FinalParamsFixer),
            FixerKind::JavadocPeriod => Box::new(javadoc_period::JavadocPeriodFixer),
            FixerKind::TrailingWhitespace => {
                Box::new(trailing_whitespace::TrailingWhitespaceFixer)
            }
        }
    }
}

impl fmt::Display for FixerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FixerKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase().replace('_', "-");
        FixerKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = FixerKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown fixer '{}', expected one of: {}", value, known.join(", "))
            })
    }
}

/// File text split into lines, remembering the line ending and whether the
/// file ended with one.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SourceLines {
    pub lines: Vec<String>,
    ending: &'static str,
    trailing_newline: bool,
}

impl SourceLines {
    pub fn parse(source: &str) -> Self {
        let ending = if source.contains("\r\n") { "\r\n" } else { "\n" };
        let trailing_newline = source.ends_with('\n');
        let body = source.strip_suffix('\n').unwrap_or(source);
        let lines = if source.is_empty() {
            Vec::new()
        } else {
            body.split('\n')
                .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
                .collect()
        };
        Self {
            lines,
            ending,
            trailing_newline,
        }
    }

    pub fn set_trailing_newline(&mut self) {
        self.trailing_newline = true;
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join(self.ending);
        if self.trailing_newline && !self.lines.is_empty() {
            out.push_str(self.ending);
        }
        out
    }
}

/// Leading spaces and tabs of `line`.
pub(crate) fn indent_of(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}
