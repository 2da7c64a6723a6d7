pub mod annotate;
pub mod builder;
pub mod copy;
pub mod etl;
pub mod extract;
pub mod graph;
pub mod merger;
pub mod pipeline;
pub mod policy;

pub use crate::domain::ports::{ConfigProvider, OntologyStore, Pipeline, Storage};
pub use crate::utils::error::Result;
