use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Term not found: {term}")]
    TermNotFound { term: String },

    #[error("Label '{label}' matches more than one term: {}", .candidates.join(", "))]
    AmbiguousLabel {
        label: String,
        candidates: Vec<String>,
    },

    #[error("Unknown 'Related' keyword for '{term}': {token}")]
    InvalidRelationToken { term: String, token: String },

    #[error("Cyclic hierarchy detected at '{term}' (path: {})", .path.join(" -> "))]
    CyclicHierarchy { term: String, path: Vec<String> },

    #[error("Parent override '{parent}' for '{term}' is not part of the extracted module")]
    DanglingParentOverride { term: String, parent: String },

    #[error("Row for '{term}' uses source '{source_tag}' which has no configuration")]
    UnknownSourceTag { term: String, source_tag: String },

    #[error("Source '{source_tag}' does not exist in source configuration")]
    MissingSourceConfig { source_tag: String },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Extraction task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Hierarchy,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ExtractError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TermNotFound { .. }
            | Self::AmbiguousLabel { .. }
            | Self::InvalidRelationToken { .. } => ErrorCategory::Input,
            Self::CyclicHierarchy { .. } | Self::DanglingParentOverride { .. } => {
                ErrorCategory::Hierarchy
            }
            Self::UnknownSourceTag { .. }
            | Self::MissingSourceConfig { .. }
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::CsvError(_)
            | Self::IoError(_)
            | Self::SerializationError(_)
            | Self::TaskError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Hierarchy => ErrorSeverity::High,
            ErrorCategory::System => match self {
                Self::IoError(_) | Self::TaskError(_) => ErrorSeverity::Critical,
                _ => ErrorSeverity::Medium,
            },
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::TermNotFound { term } => format!(
                "Check that '{}' is spelled correctly and uses a prefix known to the ontology",
                term
            ),
            Self::AmbiguousLabel { candidates, .. } => format!(
                "Use one of the IDs instead of the label: {}",
                candidates.join(", ")
            ),
            Self::InvalidRelationToken { .. } => {
                "Use only ancestors, descendants, parents or children in the Related column"
                    .to_string()
            }
            Self::CyclicHierarchy { .. } => {
                "Remove the circular subClassOf/subPropertyOf assertion from the ontology"
                    .to_string()
            }
            Self::DanglingParentOverride { parent, .. } => format!(
                "Add '{}' to the imports so the override parent is extracted too",
                parent
            ),
            Self::UnknownSourceTag { source_tag, .. } => format!(
                "Add a row for '{}' to the source configuration or fix the Source column",
                source_tag
            ),
            Self::MissingSourceConfig { source_tag } => format!(
                "Add a row with Source '{}' to the source configuration file",
                source_tag
            ),
            Self::CsvError(_) => "Check the delimiter and header row of the input table".to_string(),
            Self::IoError(_) => "Check that the file exists and is readable".to_string(),
            Self::SerializationError(_) => "Check the output format option".to_string(),
            Self::TaskError(_) => "Re-run with --verbose to see where extraction stopped".to_string(),
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ConfigValidationError { .. } => {
                "Review the command line options or the job file".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("Could not resolve the requested terms: {}", self),
            ErrorCategory::Hierarchy => format!("The extracted module would be invalid: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("Extraction failed: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
