use crate::adapters::MemoryStore;
use crate::core::extract::extract_module;
use crate::core::merger::{
    delimiter_for, read_import_rows, read_source_rows, read_term_list, ExtractionPlan,
    ImportSpecMerger, MergeOptions,
};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::ExtractedModule;
use crate::utils::error::{ExtractError, Result};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Tsv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "tsv" => Ok(Self::Tsv),
            "json" => Ok(Self::Json),
            other => Err(ExtractError::InvalidConfigValueError {
                field: "format".to_string(),
                value: other.to_string(),
                reason: "Unsupported format. Valid formats: tsv, json".to_string(),
            }),
        }
    }
}

/// Statement rows with a `subject predicate object datatype` header.
pub fn render_tsv(module: &ExtractedModule) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(Vec::new());
    for row in module.to_statement_rows() {
        writer.serialize(row)?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

pub fn render_json(module: &ExtractedModule) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(module)?)
}

/// Store and plan ready for the extraction step.
#[derive(Debug)]
pub struct PreparedExtraction {
    pub store: MemoryStore,
    pub plan: ExtractionPlan,
}

pub struct ExtractPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ExtractPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    async fn read_text(&self, path: &str) -> Result<String> {
        let data = self.storage.read_file(path).await?;
        String::from_utf8(data).map_err(|e| ExtractError::InvalidConfigValueError {
            field: "input".to_string(),
            value: path.to_string(),
            reason: format!("File is not valid UTF-8: {}", e),
        })
    }

    fn merge_options(&self, terms: Vec<String>, predicates: Vec<String>) -> Result<MergeOptions> {
        Ok(MergeOptions {
            source: self.config.source().map(str::to_string),
            intermediates: self.config.intermediates().parse()?,
            terms,
            predicates,
            imported_from: self.config.imported_from().map(str::to_string),
            imported_from_property: self.config.imported_from_property().to_string(),
            no_hierarchy: self.config.no_hierarchy(),
            annotate_seeds: self.config.annotate_seeds(),
            copy_predicates: self.config.copy_predicates(),
        })
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExtractPipeline<S, C> {
    type Input = PreparedExtraction;

    async fn extract(&self) -> Result<PreparedExtraction> {
        let database = self.config.database();
        tracing::debug!("Reading statements from: {}", database);
        let data = self.storage.read_file(database).await?;
        let store = MemoryStore::from_reader(&data, delimiter_for(database))?;

        let rows = match self.config.imports_file() {
            Some(path) => {
                let data = self.storage.read_file(path).await?;
                read_import_rows(&data, delimiter_for(path))?
            }
            None => Vec::new(),
        };

        let source_rows = match self.config.source_config_file() {
            Some(path) => {
                let data = self.storage.read_file(path).await?;
                read_source_rows(&data, delimiter_for(path))?
            }
            None => Vec::new(),
        };

        let mut terms = self.config.terms().to_vec();
        if let Some(path) = self.config.terms_file() {
            terms.extend(read_term_list(&self.read_text(path).await?));
        }

        let mut predicates = self.config.predicates().to_vec();
        if let Some(path) = self.config.predicates_file() {
            predicates.extend(read_term_list(&self.read_text(path).await?));
        }

        let options = self.merge_options(terms, predicates)?;
        let plan = ImportSpecMerger::new(&store).merge(&rows, &source_rows, &options)?;
        Ok(PreparedExtraction { store, plan })
    }

    async fn transform(&self, input: PreparedExtraction) -> Result<ExtractedModule> {
        // Closure computation is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || extract_module(&input.store, &input.plan)).await?
    }

    async fn load(&self, module: ExtractedModule) -> Result<String> {
        let output_path = self.config.output_path().to_string();
        let data = match self.config.output_format().parse::<OutputFormat>()? {
            OutputFormat::Tsv => render_tsv(&module)?,
            OutputFormat::Json => render_json(&module)?,
        };

        tracing::debug!("Writing {} bytes to {}", data.len(), output_path);
        self.storage.write_file(&output_path, &data).await?;
        Ok(output_path)
    }
}
