use crate::domain::model::{ExtractedModule, HierarchyAssertion, StatementRow};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeSet;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Read-only view of the ontology the module is extracted from.
pub trait OntologyStore: Send + Sync {
    /// Subsumption assertions with an IRI-valued object. When `predicates` is given, only
    /// assertions using one of those hierarchy predicates are returned.
    fn get_edges(&self, predicates: Option<&BTreeSet<String>>) -> Vec<HierarchyAssertion>;

    fn get_label(&self, term: &str) -> Option<String>;

    /// Resolves a CURIE or a label to a single term ID.
    fn resolve_term_ref(&self, curie_or_label: &str) -> Result<String>;

    /// Every subject known to the store, including terms without hierarchy assertions.
    fn get_terms(&self) -> BTreeSet<String>;

    /// Statements with `subject` as their subject, in load order.
    fn statements_about(&self, subject: &str) -> Vec<StatementRow>;
}

pub trait ConfigProvider: Send + Sync {
    fn database(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_format(&self) -> &str;
    fn terms(&self) -> &[String];
    fn terms_file(&self) -> Option<&str>;
    fn imports_file(&self) -> Option<&str>;
    fn source_config_file(&self) -> Option<&str>;
    fn source(&self) -> Option<&str>;
    fn intermediates(&self) -> &str;
    fn imported_from(&self) -> Option<&str>;
    fn imported_from_property(&self) -> &str;
    fn predicates(&self) -> &[String];
    fn predicates_file(&self) -> Option<&str>;
    fn no_hierarchy(&self) -> bool;
    fn annotate_seeds(&self) -> bool;
    fn copy_predicates(&self) -> Vec<(String, String)>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Input: Send;

    async fn extract(&self) -> Result<Self::Input>;
    async fn transform(&self, input: Self::Input) -> Result<ExtractedModule>;
    async fn load(&self, module: ExtractedModule) -> Result<String>;
}
