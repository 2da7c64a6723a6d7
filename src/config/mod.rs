pub mod cli;
pub mod toml_config;

use crate::core::ConfigProvider;
use crate::domain::model::IMPORTED_FROM;
use crate::utils::error::{ExtractError, Result};
use crate::utils::validation::{
    validate_iri, validate_non_empty_string, validate_one_of, validate_path,
    validate_term_ref, Validate,
};
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ontology-extract")]
#[command(about = "Extract an import module from an ontology statement table")]
pub struct CliConfig {
    /// Statement table (subject, predicate, object, datatype)
    #[arg(long)]
    pub database: String,

    /// Term ID or label to import, with its ancestors
    #[arg(short = 't', long = "term")]
    pub terms: Vec<String>,

    /// File with one term per line
    #[arg(short = 'T', long = "terms")]
    pub terms_file: Option<String>,

    /// Import specification table (ID, Label, Parent ID, Parent Label, Related, ...)
    #[arg(short = 'i', long = "imports")]
    pub imports: Option<String>,

    /// Source configuration table (Source, IRI, Intermediates, Predicates)
    #[arg(short = 'c', long = "config")]
    pub source_config: Option<String>,

    /// Only use import rows tagged with this source
    #[arg(short = 's', long)]
    pub source: Option<String>,

    /// Default handling of intermediate ancestors: all or none
    #[arg(short = 'I', long, default_value = "all")]
    pub intermediates: String,

    /// Ontology IRI recorded on every imported term
    #[arg(short = 'm', long)]
    pub imported_from: Option<String>,

    #[arg(short = 'M', long, default_value = IMPORTED_FROM)]
    pub imported_from_property: String,

    /// Predicate to keep, may be repeated
    #[arg(short = 'p', long = "predicate")]
    pub predicates: Vec<String>,

    /// File with one predicate per line
    #[arg(short = 'P', long = "predicates")]
    pub predicates_file: Option<String>,

    /// Copy the values of one predicate to another, may be repeated
    #[arg(short = 'C', long = "copy", num_args = 2, value_names = ["FROM", "TO"])]
    pub copy: Vec<String>,

    /// Do not assert hierarchy edges other than explicit parent overrides
    #[arg(short = 'n', long)]
    pub no_hierarchy: bool,

    /// Also annotate the requested terms with the imported-from IRI
    #[arg(long)]
    pub annotate_seeds: bool,

    #[arg(short = 'o', long = "output", default_value = "module.tsv")]
    pub output_path: String,

    /// Output format: tsv or json
    #[arg(short = 'f', long = "format", default_value = "tsv")]
    pub format: String,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log time and memory use per phase")]
    pub monitor: bool,
}

impl ConfigProvider for CliConfig {
    fn database(&self) -> &str {
        &self.database
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_format(&self) -> &str {
        &self.format
    }

    fn terms(&self) -> &[String] {
        &self.terms
    }

    fn terms_file(&self) -> Option<&str> {
        self.terms_file.as_deref()
    }

    fn imports_file(&self) -> Option<&str> {
        self.imports.as_deref()
    }

    fn source_config_file(&self) -> Option<&str> {
        self.source_config.as_deref()
    }

    fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn intermediates(&self) -> &str {
        &self.intermediates
    }

    fn imported_from(&self) -> Option<&str> {
        self.imported_from.as_deref()
    }

    fn imported_from_property(&self) -> &str {
        &self.imported_from_property
    }

    fn predicates(&self) -> &[String] {
        &self.predicates
    }

    fn predicates_file(&self) -> Option<&str> {
        self.predicates_file.as_deref()
    }

    fn no_hierarchy(&self) -> bool {
        self.no_hierarchy
    }

    fn annotate_seeds(&self) -> bool {
        self.annotate_seeds
    }

    fn copy_predicates(&self) -> Vec<(String, String)> {
        self.copy
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("database", &self.database)?;
        validate_path("output", &self.output_path)?;
        validate_one_of("format", &self.format, &["tsv", "json"])?;
        validate_one_of("intermediates", &self.intermediates, &["all", "none"])?;
        validate_term_ref("imported-from-property", &self.imported_from_property)?;

        if let Some(iri) = &self.imported_from {
            validate_iri("imported-from", iri)?;
        }
        if let Some(source) = &self.source {
            validate_non_empty_string("source", source)?;
        }
        for term in &self.terms {
            validate_non_empty_string("term", term)?;
        }
        if self.copy.len() % 2 != 0 {
            return Err(ExtractError::InvalidConfigValueError {
                field: "copy".to_string(),
                value: self.copy.join(" "),
                reason: "Each --copy takes a FROM and a TO predicate".to_string(),
            });
        }
        for predicate in &self.copy {
            validate_term_ref("copy", predicate)?;
        }
        for path in [&self.terms_file, &self.imports, &self.source_config, &self.predicates_file]
            .into_iter()
            .flatten()
        {
            validate_path("input", path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let config = CliConfig::parse_from([
            "ontology-extract",
            "--database",
            "obi.tsv",
            "-t",
            "OBI:0000070",
            "--term",
            "assay",
            "-i",
            "imports.tsv",
            "-s",
            "obi",
            "-I",
            "none",
            "-p",
            "rdfs:label",
            "-n",
            "-C",
            "rdfs:label",
            "skos:prefLabel",
            "--copy",
            "IAO:0000115",
            "rdfs:comment",
            "-f",
            "json",
        ]);

        assert_eq!(config.database(), "obi.tsv");
        assert_eq!(config.terms(), ["OBI:0000070", "assay"]);
        assert_eq!(config.imports_file(), Some("imports.tsv"));
        assert_eq!(config.source(), Some("obi"));
        assert_eq!(config.intermediates(), "none");
        assert_eq!(config.predicates(), ["rdfs:label"]);
        assert!(config.no_hierarchy());
        assert_eq!(
            config.copy_predicates(),
            vec![
                ("rdfs:label".to_string(), "skos:prefLabel".to_string()),
                ("IAO:0000115".to_string(), "rdfs:comment".to_string()),
            ]
        );
        assert_eq!(config.output_format(), "json");
        assert_eq!(config.output_path(), "module.tsv");
        assert_eq!(config.imported_from_property(), "IAO:0000412");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config =
            CliConfig::parse_from(["ontology-extract", "--database", "obi.tsv", "-t", "x"]);
        assert!(config.validate().is_ok());

        config.format = "ttl".to_string();
        assert!(config.validate().is_err());

        config.format = "tsv".to_string();
        config.imported_from = Some("obi.owl".to_string());
        assert!(config.validate().is_err());

        config.imported_from = Some("http://purl.obolibrary.org/obo/obi.owl".to_string());
        config.intermediates = "some".to_string();
        assert!(config.validate().is_err());

        config.intermediates = "all".to_string();
        config.copy = vec!["rdfs:label".to_string()];
        assert!(config.validate().is_err());
    }
}
