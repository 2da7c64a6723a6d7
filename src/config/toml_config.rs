use crate::core::ConfigProvider;
use crate::domain::model::IMPORTED_FROM;
use crate::utils::error::{ExtractError, Result};
use crate::utils::validation::{
    validate_iri, validate_non_empty_string, validate_one_of, validate_path, validate_term_ref,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub terms: TermsConfig,
    #[serde(default)]
    pub imports: ImportsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub database: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermsConfig {
    #[serde(default)]
    pub terms: Vec<String>,
    pub terms_file: Option<String>,
    #[serde(default)]
    pub predicates: Vec<String>,
    pub predicates_file: Option<String>,
    /// `[from, to]` predicate pairs.
    #[serde(default)]
    pub copy: Vec<(String, String)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportsConfig {
    pub imports_file: Option<String>,
    pub source_config: Option<String>,
    pub source: Option<String>,
    #[serde(default = "default_intermediates")]
    pub intermediates: String,
    pub imported_from: Option<String>,
    #[serde(default = "default_imported_from_property")]
    pub imported_from_property: String,
    #[serde(default)]
    pub no_hierarchy: bool,
    #[serde(default)]
    pub annotate_seeds: bool,
}

impl Default for ImportsConfig {
    fn default() -> Self {
        Self {
            imports_file: None,
            source_config: None,
            source: None,
            intermediates: default_intermediates(),
            imported_from: None,
            imported_from_property: default_imported_from_property(),
            no_hierarchy: false,
            annotate_seeds: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: String,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            format: default_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Level for this crate's log output: error, warn, info, debug or trace.
    pub log_level: Option<String>,
}

pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn default_intermediates() -> String {
    "all".to_string()
}

fn default_imported_from_property() -> String {
    IMPORTED_FROM.to_string()
}

fn default_output_path() -> String {
    "module.tsv".to_string()
}

fn default_format() -> String {
    "tsv".to_string()
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ExtractError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value. Unset variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ExtractError::config(e.to_string()))?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_path("store.database", &self.store.database)?;
        validate_path("output.path", &self.output.path)?;
        validate_one_of("output.format", &self.output.format, &["tsv", "json"])?;
        validate_one_of(
            "imports.intermediates",
            &self.imports.intermediates,
            &["all", "none"],
        )?;
        validate_term_ref(
            "imports.imported_from_property",
            &self.imports.imported_from_property,
        )?;

        if let Some(iri) = &self.imports.imported_from {
            validate_iri("imports.imported_from", iri)?;
        }
        if let Some(source) = &self.imports.source {
            validate_non_empty_string("imports.source", source)?;
        }
        for (from, to) in &self.terms.copy {
            validate_term_ref("terms.copy", from)?;
            validate_term_ref("terms.copy", to)?;
        }
        if let Some(level) = self.log_level() {
            validate_one_of("monitoring.log_level", level, &LOG_LEVELS)?;
        }

        if self.terms.terms.is_empty()
            && self.terms.terms_file.is_none()
            && self.imports.imports_file.is_none()
        {
            return Err(ExtractError::MissingConfigError {
                field: "terms.terms, terms.terms_file or imports.imports_file".to_string(),
            });
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn log_level(&self) -> Option<&str> {
        self.monitoring
            .as_ref()
            .and_then(|m| m.log_level.as_deref())
    }
}

impl ConfigProvider for TomlConfig {
    fn database(&self) -> &str {
        &self.store.database
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_format(&self) -> &str {
        &self.output.format
    }

    fn terms(&self) -> &[String] {
        &self.terms.terms
    }

    fn terms_file(&self) -> Option<&str> {
        self.terms.terms_file.as_deref()
    }

    fn imports_file(&self) -> Option<&str> {
        self.imports.imports_file.as_deref()
    }

    fn source_config_file(&self) -> Option<&str> {
        self.imports.source_config.as_deref()
    }

    fn source(&self) -> Option<&str> {
        self.imports.source.as_deref()
    }

    fn intermediates(&self) -> &str {
        &self.imports.intermediates
    }

    fn imported_from(&self) -> Option<&str> {
        self.imports.imported_from.as_deref()
    }

    fn imported_from_property(&self) -> &str {
        &self.imports.imported_from_property
    }

    fn predicates(&self) -> &[String] {
        &self.terms.predicates
    }

    fn predicates_file(&self) -> Option<&str> {
        self.terms.predicates_file.as_deref()
    }

    fn no_hierarchy(&self) -> bool {
        self.imports.no_hierarchy
    }

    fn annotate_seeds(&self) -> bool {
        self.imports.annotate_seeds
    }

    fn copy_predicates(&self) -> Vec<(String, String)> {
        self.terms.copy.clone()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
