use crate::utils::error::{Result, TidyError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Word lists and thresholds shared by every tool in the crate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub cleaning: CleaningRules,
    pub java: JavaRules,
    pub openapi: OpenApiRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningRules {
    /// Sheets dropped without being read.
    pub junk_sheets: Vec<String>,
    pub junk_columns: Vec<String>,
    /// Any of these characters marks a row as decoration.
    pub decorative_chars: Vec<String>,
    /// Checked against each string value when filtering records.
    pub strict_decorative_chars: Vec<String>,
    pub junk_row_keywords: Vec<String>,
    pub blocked_domains: Vec<String>,
    pub garbage_phrases: Vec<String>,
    pub key_field_profiles: Vec<KeyFieldProfile>,
    pub fallback_key_fields: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyFieldProfile {
    /// Column whose presence selects this profile.
    pub marker: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JavaRules {
    pub max_line_length: usize,
    pub continuation_indent: usize,
    pub imports: ImportRules,
    pub javadoc: JavadocRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportRules {
    pub static_first: bool,
    /// Package prefixes, one import group each, in output order.
    pub groups: Vec<String>,
    /// Class names per package used to expand star imports.
    pub known_classes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JavadocRules {
    /// Parameter-name substring to description.
    pub param_descriptions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenApiRules {
    pub extensions: Vec<String>,
}

impl Default for CleaningRules {
    fn default() -> Self {
        let decorative: Vec<String> = ["▬", "█", "▓", "▒", "░"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        let mut strict = decorative.clone();
        strict.extend(["■", "□"].iter().map(|c| c.to_string()));

        Self {
            junk_sheets: Vec::new(),
            junk_columns: vec!["Unnamed: 0".to_string()],
            decorative_chars: decorative,
            strict_decorative_chars: strict,
            junk_row_keywords: Vec::new(),
            blocked_domains: Vec::new(),
            garbage_phrases: Vec::new(),
            key_field_profiles: Vec::new(),
            fallback_key_fields: 3,
        }
    }
}

impl Default for JavaRules {
    fn default() -> Self {
        Self {
            max_line_length: 120,
            continuation_indent: 4,
            imports: ImportRules::default(),
            javadoc: JavadocRules::default(),
        }
    }
}

impl Default for ImportRules {
    fn default() -> Self {
        Self {
            static_first: true,
            groups: ["java.", "javax.", "jakarta.", "org.", "com."]
                .iter()
                .map(|g| g.to_string())
                .collect(),
            known_classes: BTreeMap::new(),
        }
    }
}

impl Default for OpenApiRules {
    fn default() -> Self {
        Self {
            extensions: vec!["yaml".to_string(), "yml".to_string()],
        }
    }
}

impl RulesConfig {
    /// Loads rules from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TidyError::missing_input(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Loads the rules file when one is given, otherwise the defaults.
    pub fn load_optional<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the environment value. Unknown variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }
}

impl Validate for RulesConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_positive_number(
            "cleaning.fallback_key_fields",
            self.cleaning.fallback_key_fields,
            1,
        )?;
        validation::validate_range("java.max_line_length", self.java.max_line_length, 40, 400)?;
        validation::validate_range(
            "java.continuation_indent",
            self.java.continuation_indent,
            1,
            16,
        )?;

        for profile in &self.cleaning.key_field_profiles {
            validation::validate_non_empty_string("cleaning.key_field_profiles.marker", &profile.marker)?;
            if profile.fields.is_empty() {
                return Err(TidyError::InvalidConfigValueError {
                    field: "cleaning.key_field_profiles.fields".to_string(),
                    value: profile.marker.clone(),
                    reason: "Profile must name at least one field".to_string(),
                });
            }
        }

        for group in &self.java.imports.groups {
            validation::validate_non_empty_string("java.imports.groups", group)?;
        }

        if self.openapi.extensions.is_empty() {
            return Err(TidyError::MissingConfigError {
                field: "openapi.extensions".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ErrorCategory;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_yields_defaults() {
        let rules = RulesConfig::from_toml_str("").unwrap();
        assert_eq!(rules.cleaning.fallback_key_fields, 3);
        assert_eq!(rules.java.max_line_length, 120);
        assert!(rules.java.imports.static_first);
        assert!(rules.cleaning.decorative_chars.contains(&"█".to_string()));
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn parses_cleaning_profiles() {
        let toml_content = r#"
[cleaning]
junk_sheets = ["-Template-"]
blocked_domains = ["example-market.com"]
fallback_key_fields = 2

[[cleaning.key_field_profiles]]
marker = "Contact"
fields = ["Contact", "Email"]

[java]
max_line_length = 100

[java.imports.known_classes]
"jakarta.persistence" = ["Entity", "Id"]
"#;

        let rules = RulesConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(rules.cleaning.junk_sheets, vec!["-Template-"]);
        assert_eq!(rules.cleaning.fallback_key_fields, 2);
        assert_eq!(rules.cleaning.key_field_profiles[0].marker, "Contact");
        assert_eq!(rules.java.max_line_length, 100);
        assert_eq!(rules.java.continuation_indent, 4);
        assert_eq!(
            rules.java.imports.known_classes["jakarta.persistence"],
            vec!["Entity", "Id"]
        );
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("REPO_TIDY_TEST_SHEET", "Archive");

        let rules =
            RulesConfig::from_toml_str("[cleaning]\njunk_sheets = [\"${REPO_TIDY_TEST_SHEET}\"]\n")
                .unwrap();
        assert_eq!(rules.cleaning.junk_sheets, vec!["Archive"]);

        std::env::remove_var("REPO_TIDY_TEST_SHEET");
    }

    #[test]
    fn unknown_env_vars_are_kept() {
        let rules =
            RulesConfig::from_toml_str("[cleaning]\njunk_sheets = [\"${REPO_TIDY_UNSET_VAR}\"]\n")
                .unwrap();
        assert_eq!(rules.cleaning.junk_sheets, vec!["${REPO_TIDY_UNSET_VAR}"]);
    }

    #[test]
    fn test_config_validation() {
        let rules = RulesConfig::from_toml_str("[java]\nmax_line_length = 10\n").unwrap();
        assert!(rules.validate().is_err());

        let rules = RulesConfig::from_toml_str(
            "[[cleaning.key_field_profiles]]\nmarker = \"A\"\nfields = []\n",
        )
        .unwrap();
        assert!(rules.validate().is_err());
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = RulesConfig::from_toml_str("[cleaning\n").unwrap_err();
        assert!(matches!(err, TidyError::TomlError(_)));
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[cleaning]\njunk_columns = [\"xxx\"]\n")
            .unwrap();

        let rules = RulesConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(rules.cleaning.junk_columns, vec!["xxx"]);

        assert!(RulesConfig::from_file("/definitely/not/here.toml").is_err());
    }

    #[test]
    fn example_rules_file_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/rules.example.toml");
        let rules = RulesConfig::from_file(path).unwrap();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.cleaning.key_field_profiles[0].fields, vec!["Name", "Contact"]);
        assert_eq!(rules.java.javadoc.param_descriptions["id"], "the identifier");
    }
}
