pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::{Result, TidyError};
#[cfg(feature = "cli")]
use crate::utils::validation::{self, Validate};
#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "cli")]
use std::path::{Component, Path, PathBuf};

pub const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum Stage {
    /// Workbook to parsed_data
    Parse,
    /// parsed_data to cleaned_data
    Clean,
    /// Parse then clean
    All,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "repo-tidy")]
#[command(about = "Convert a workbook export into JSON/CSV and clean the result")]
pub struct CliConfig {
    #[arg(long, value_enum, default_value = "all")]
    pub stage: Stage,

    /// Workbook to parse (required for the parse stage)
    #[arg(long)]
    pub input: Option<String>,

    #[arg(long, default_value = "parsed_data")]
    pub parsed_dir: String,

    #[arg(long, default_value = "cleaned_data")]
    pub cleaned_dir: String,

    /// TOML rules file with the cleaning word lists
    #[arg(long)]
    pub rules: Option<String>,

    /// Also bundle the cleaned files into a zip archive
    #[arg(long)]
    pub archive: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn runs_parse(&self) -> bool {
        matches!(self.stage, Stage::Parse | Stage::All)
    }

    pub fn runs_clean(&self) -> bool {
        matches!(self.stage, Stage::Clean | Stage::All)
    }

    /// `<cleaned_dir>.zip`, next to the cleaned directory.
    pub fn archive_path(&self) -> PathBuf {
        let dir = self.cleaned_dir.trim_end_matches(['/', '\\']);
        let dir = if dir.is_empty() { self.cleaned_dir.as_str() } else { dir };
        PathBuf::from(format!("{}.zip", dir))
    }

    /// The cleaned directory is wiped before writing, so it must not hold
    /// the parsed files.
    fn cleaned_dir_holds_parsed(&self) -> bool {
        lexical(&self.parsed_dir).starts_with(lexical(&self.cleaned_dir))
    }
}

/// `path` without `.` components or trailing separators.
#[cfg(feature = "cli")]
fn lexical(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|component| *component != Component::CurDir)
        .collect()
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("parsed_dir", &self.parsed_dir)?;
        validation::validate_path("cleaned_dir", &self.cleaned_dir)?;

        if self.runs_parse() {
            let input = validation::validate_required_field("input", &self.input)?;
            validation::validate_path("input", input)?;
            validation::validate_file_extension("input", input, WORKBOOK_EXTENSIONS)?;
        }

        if self.runs_clean() && self.cleaned_dir_holds_parsed() {
            return Err(TidyError::InvalidConfigValueError {
                field: "cleaned_dir".to_string(),
                value: self.cleaned_dir.clone(),
                reason: "Output directory must not be or contain the parsed directory".to_string(),
            });
        }

        if let Some(rules) = &self.rules {
            validation::validate_path("rules", rules)?;
        }

        Ok(())
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliConfig {
        CliConfig::parse_from(std::iter::once("repo-tidy").chain(args.iter().copied()))
    }

    #[test]
    fn defaults_use_conventional_directories() {
        let config = parse(&["--stage", "clean"]);
        assert_eq!(config.parsed_dir, "parsed_data");
        assert_eq!(config.cleaned_dir, "cleaned_data");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_stage_requires_workbook() {
        let config = parse(&["--stage", "parse"]);
        assert!(config.validate().is_err());

        let config = parse(&["--input", "export.xlsx"]);
        assert!(config.runs_parse() && config.runs_clean());
        assert!(config.validate().is_ok());

        let config = parse(&["--input", "export.txt"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn clean_output_must_differ_from_input() {
        let config = parse(&["--stage", "clean", "--cleaned-dir", "parsed_data"]);
        assert!(config.validate().is_err());

        let config = parse(&["--stage", "clean", "--cleaned-dir", "./parsed_data/"]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn clean_output_must_not_contain_input() {
        let config = parse(&["--stage", "clean", "--cleaned-dir", "."]);
        assert!(matches!(
            config.validate(),
            Err(TidyError::InvalidConfigValueError { .. })
        ));

        let config = parse(&[
            "--stage",
            "clean",
            "--parsed-dir",
            "out/parsed",
            "--cleaned-dir",
            "out",
        ]);
        assert!(config.validate().is_err());

        let config = parse(&[
            "--stage",
            "clean",
            "--parsed-dir",
            "out/parsed",
            "--cleaned-dir",
            "out/cleaned",
        ]);
        assert!(config.validate().is_ok());

        let config = parse(&["--stage", "clean", "--cleaned-dir", "parsed_data_clean"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn archive_sits_next_to_cleaned_dir() {
        let config = parse(&["--stage", "clean", "--cleaned-dir", "out/"]);
        assert_eq!(config.archive_path(), PathBuf::from("out.zip"));

        let config = parse(&["--stage", "clean", "--cleaned-dir", "exports/cleaned.v2"]);
        assert_eq!(config.archive_path(), PathBuf::from("exports/cleaned.v2.zip"));

        assert_eq!(parse(&[]).archive_path(), PathBuf::from("cleaned_data.zip"));
    }
}
