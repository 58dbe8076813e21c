use thiserror::Error;

#[derive(Error, Debug)]
pub enum TidyError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Workbook error: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Required input not found: {path}")]
    MissingInputError { path: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Format,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl TidyError {
    pub fn missing_input(path: impl Into<String>) -> Self {
        TidyError::MissingInputError { path: path.into() }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        TidyError::ProcessingError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TidyError::ConfigError { .. }
            | TidyError::MissingConfigError { .. }
            | TidyError::InvalidConfigValueError { .. }
            | TidyError::TomlError(_) => ErrorCategory::Configuration,
            TidyError::MissingInputError { .. } => ErrorCategory::Input,
            TidyError::CsvError(_)
            | TidyError::SerializationError(_)
            | TidyError::YamlError(_)
            | TidyError::WorkbookError(_) => ErrorCategory::Format,
            TidyError::ProcessingError { .. } | TidyError::ValidationError { .. } => {
                ErrorCategory::Processing
            }
            TidyError::IoError(_) | TidyError::ZipError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Format => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            TidyError::MissingInputError { path } => {
                format!("Check that '{}' exists and the path is spelled correctly", path)
            }
            TidyError::TomlError(_) => "Fix the syntax of the rules file".to_string(),
            TidyError::MissingConfigError { field } => {
                format!("Provide a value for '{}'", field)
            }
            TidyError::InvalidConfigValueError { field, .. } => {
                format!("Choose a different value for '{}'", field)
            }
            TidyError::ConfigError { .. } => "Review the command line options".to_string(),
            TidyError::WorkbookError(_) => {
                "Make sure the workbook is not open in another program and is a supported format"
                    .to_string()
            }
            TidyError::CsvError(_) | TidyError::SerializationError(_) => {
                "Regenerate the parsed data by running the parse stage again".to_string()
            }
            TidyError::YamlError(_) => "Validate the YAML document before fixing it".to_string(),
            TidyError::IoError(_) | TidyError::ZipError(_) => {
                "Check file permissions and available disk space".to_string()
            }
            TidyError::ProcessingError { .. } | TidyError::ValidationError { .. } => {
                "Re-run with --verbose to see which input caused the failure".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Missing input: {}", self),
            ErrorCategory::Format => format!("Could not read input data: {}", self),
            ErrorCategory::Processing => format!("Processing failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, TidyError>;
