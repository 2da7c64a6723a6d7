pub mod adapters;
#[cfg(feature = "cli")]
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, toml_config::TomlConfig, CliConfig};

pub use adapters::MemoryStore;
pub use crate::core::{
    etl::ExtractEngine,
    extract::{build_indexes, extract_module, extract_with_indexes},
    merger::{ExtractionPlan, ImportSpecMerger, MergeOptions},
    pipeline::ExtractPipeline,
};
pub use domain::model::ExtractedModule;
pub use utils::error::{ExtractError, Result};
